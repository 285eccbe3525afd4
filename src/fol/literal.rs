//! Literals: predicates applied to argument vectors, with a polarity bit.

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::fol::signature::{PredicateId, Signature};
use crate::fol::term::{TermId, TermStore};

/// Opaque reference to a clause owned by the surrounding prover.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ClauseId(pub u32);

/// A literal: predicate, arguments, polarity. Equality literals use the
/// builtin `=` predicate; their negations are the residual constraints the
/// abstracting unifier emits.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Literal {
    pub predicate: PredicateId,
    pub polarity: bool,
    pub args: Vec<TermId>,
}

impl Literal {
    pub fn positive(predicate: PredicateId, args: Vec<TermId>) -> Self {
        Literal {
            predicate,
            polarity: true,
            args,
        }
    }

    pub fn negative(predicate: PredicateId, args: Vec<TermId>) -> Self {
        Literal {
            predicate,
            polarity: false,
            args,
        }
    }

    /// The equality literal `lhs = rhs` (or its negation).
    pub fn equality(sig: &Signature, polarity: bool, lhs: TermId, rhs: TermId) -> Self {
        Literal {
            predicate: sig.eq_predicate(),
            polarity,
            args: vec![lhs, rhs],
        }
    }

    pub fn is_equality(&self, sig: &Signature) -> bool {
        self.predicate == sig.eq_predicate()
    }

    pub fn negate(&self) -> Self {
        Literal {
            predicate: self.predicate,
            polarity: !self.polarity,
            args: self.args.clone(),
        }
    }

    /// Render for diagnostics.
    pub fn display(&self, sig: &Signature, store: &TermStore) -> String {
        let mut out = String::new();
        if self.is_equality(sig) && self.args.len() == 2 {
            out.push_str(&store.display(sig, self.args[0]));
            out.push_str(if self.polarity { " = " } else { " != " });
            out.push_str(&store.display(sig, self.args[1]));
            return out;
        }
        if !self.polarity {
            out.push('~');
        }
        out.push_str(sig.predicate_name(self.predicate));
        if !self.args.is_empty() {
            out.push('(');
            for (i, &a) in self.args.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                out.push_str(&store.display(sig, a));
            }
            out.push(')');
        }
        out
    }
}

impl Serialize for ClauseId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.0.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for ClauseId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        u32::deserialize(deserializer).map(ClauseId)
    }
}
