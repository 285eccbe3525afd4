//! Symbol signature: functors, predicates, sorts, theory tags.
//!
//! Every symbol is interned to a typed `u32` ID (O(1) comparison and
//! hashing, `Copy` semantics). Sort constructors live in the functor
//! namespace because sorts are ordinary terms; see `fol::term`.
//!
//! The signature is passed through explicitly rather than kept in global
//! state, so several independent problems can coexist in one process.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::HashMap;
use std::fmt;

use crate::fol::term::{TermId, TermStore};

/// ID for an interned function symbol (term functors and sort constructors)
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FunctionId(pub(crate) u32);

/// ID for an interned predicate symbol
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PredicateId(pub(crate) u32);

impl FunctionId {
    /// Get the raw ID value (for debugging/serialization)
    pub fn as_u32(self) -> u32 {
        self.0
    }
}

impl PredicateId {
    /// Get the raw ID value (for debugging/serialization)
    pub fn as_u32(self) -> u32 {
        self.0
    }
}

/// Theory interpretation of a functor.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Theory {
    /// The AC symbol `+` of integer arithmetic
    Add,
    /// An integer numeral
    Numeral(i64),
}

/// How the sort of an application of this functor is obtained.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SortRule {
    /// A sort constructor: applications are sorts themselves and carry none
    SortCtor,
    /// Monomorphic: every application has this sort
    Fixed(TermId),
    /// Polymorphic: the leading `type_arity` arguments are sorts; the
    /// result sort is the template with variable `i` replaced by argument `i`
    Poly { type_arity: usize, template: TermId },
    /// The higher-order applicator: the sort is the codomain of the first
    /// argument's arrow sort
    ApCodomain,
}

#[derive(Debug, Clone)]
struct FunctionEntry {
    name: String,
    arity: usize,
    sort_rule: SortRule,
    theory: Option<Theory>,
}

#[derive(Debug, Clone)]
struct PredicateEntry {
    name: String,
    arity: usize,
    /// Companion functor used by the literal index to wrap argument vectors
    key_fn: FunctionId,
}

/// Symbol signature for the term store and the indices.
///
/// Construction declares the builtins the engine itself needs: the `Int`
/// sort, the binary `arrow` sort constructor, the AC symbol `+`, the
/// higher-order applicator `ap`, the equality predicate, and the internal
/// key-wrapping functor of the term index.
#[derive(Debug, Clone)]
pub struct Signature {
    functions: Vec<FunctionEntry>,
    fn_lookup: HashMap<String, FunctionId>,
    predicates: Vec<PredicateEntry>,
    pred_lookup: HashMap<String, PredicateId>,
    numerals: HashMap<i64, FunctionId>,

    arrow: FunctionId,
    add: FunctionId,
    ap: FunctionId,
    key_fn: FunctionId,
    eq: PredicateId,
    int_sort: TermId,
    key_sort: TermId,
}

impl Signature {
    /// Create a signature with the builtin symbols, interning the builtin
    /// sort terms into `store`.
    pub fn new(store: &mut TermStore) -> Self {
        let mut sig = Signature {
            functions: Vec::new(),
            fn_lookup: HashMap::new(),
            predicates: Vec::new(),
            pred_lookup: HashMap::new(),
            numerals: HashMap::new(),
            arrow: FunctionId(0),
            add: FunctionId(0),
            ap: FunctionId(0),
            key_fn: FunctionId(0),
            eq: PredicateId(0),
            int_sort: TermId::INVALID,
            key_sort: TermId::INVALID,
        };

        sig.arrow = sig.declare_raw("$arrow", 2, SortRule::SortCtor, None);
        let int_ctor = sig.declare_raw("$int", 0, SortRule::SortCtor, None);
        let key_ctor = sig.declare_raw("$tree", 0, SortRule::SortCtor, None);
        sig.int_sort = store.sort_const(int_ctor);
        sig.key_sort = store.sort_const(key_ctor);

        sig.add = sig.declare_raw("$sum", 2, SortRule::Fixed(sig.int_sort), Some(Theory::Add));
        sig.ap = sig.declare_raw("$ap", 2, SortRule::ApCodomain, None);
        sig.key_fn = sig.declare_raw("$key", 2, SortRule::Fixed(sig.key_sort), None);
        sig.eq = sig.declare_predicate("=", 2);
        sig
    }

    fn declare_raw(
        &mut self,
        name: &str,
        arity: usize,
        sort_rule: SortRule,
        theory: Option<Theory>,
    ) -> FunctionId {
        if let Some(&id) = self.fn_lookup.get(name) {
            return id;
        }
        let id = FunctionId(self.functions.len() as u32);
        self.functions.push(FunctionEntry {
            name: name.to_string(),
            arity,
            sort_rule,
            theory,
        });
        self.fn_lookup.insert(name.to_string(), id);
        id
    }

    // === Declarations ===

    /// Declare a sort constructor of the given arity.
    pub fn declare_sort(&mut self, name: &str, arity: usize) -> FunctionId {
        self.declare_raw(name, arity, SortRule::SortCtor, None)
    }

    /// Declare a monomorphic function symbol.
    pub fn declare_function(&mut self, name: &str, arity: usize, sort: TermId) -> FunctionId {
        self.declare_raw(name, arity, SortRule::Fixed(sort), None)
    }

    /// Declare a polymorphic function symbol. The first `type_arity`
    /// arguments of every application are sorts; `template` is the result
    /// sort with variable `i` standing for the `i`-th sort argument.
    pub fn declare_poly_function(
        &mut self,
        name: &str,
        type_arity: usize,
        arity: usize,
        template: TermId,
    ) -> FunctionId {
        debug_assert!(type_arity <= arity);
        self.declare_raw(
            name,
            arity,
            SortRule::Poly {
                type_arity,
                template,
            },
            None,
        )
    }

    /// Declare a predicate symbol. Also reserves the companion functor the
    /// literal index keys its trees with.
    pub fn declare_predicate(&mut self, name: &str, arity: usize) -> PredicateId {
        if let Some(&id) = self.pred_lookup.get(name) {
            return id;
        }
        let key_fn = self.declare_raw(
            &format!("$lit_{}", name),
            arity,
            SortRule::Fixed(self.key_sort),
            None,
        );
        let id = PredicateId(self.predicates.len() as u32);
        self.predicates.push(PredicateEntry {
            name: name.to_string(),
            arity,
            key_fn,
        });
        self.pred_lookup.insert(name.to_string(), id);
        id
    }

    /// Get-or-create the functor for an integer numeral.
    pub fn numeral(&mut self, value: i64) -> FunctionId {
        if let Some(&id) = self.numerals.get(&value) {
            return id;
        }
        let int_sort = self.int_sort;
        let id = self.declare_raw(
            &value.to_string(),
            0,
            SortRule::Fixed(int_sort),
            Some(Theory::Numeral(value)),
        );
        self.numerals.insert(value, id);
        id
    }

    // === Projections ===

    pub fn function_name(&self, id: FunctionId) -> &str {
        &self.functions[id.0 as usize].name
    }

    pub fn function_arity(&self, id: FunctionId) -> usize {
        self.functions[id.0 as usize].arity
    }

    pub fn sort_rule(&self, id: FunctionId) -> &SortRule {
        &self.functions[id.0 as usize].sort_rule
    }

    pub fn theory(&self, id: FunctionId) -> Option<Theory> {
        self.functions[id.0 as usize].theory
    }

    /// Whether the functor is interpreted by the integer theory.
    pub fn is_interpreted(&self, id: FunctionId) -> bool {
        self.theory(id).is_some()
    }

    pub fn is_numeral(&self, id: FunctionId) -> bool {
        matches!(self.theory(id), Some(Theory::Numeral(_)))
    }

    pub fn predicate_name(&self, id: PredicateId) -> &str {
        &self.predicates[id.0 as usize].name
    }

    pub fn predicate_arity(&self, id: PredicateId) -> usize {
        self.predicates[id.0 as usize].arity
    }

    /// Companion functor wrapping this predicate's argument vector as a term.
    pub fn predicate_key_fn(&self, id: PredicateId) -> FunctionId {
        self.predicates[id.0 as usize].key_fn
    }

    pub fn get_function(&self, name: &str) -> Option<FunctionId> {
        self.fn_lookup.get(name).copied()
    }

    pub fn get_predicate(&self, name: &str) -> Option<PredicateId> {
        self.pred_lookup.get(name).copied()
    }

    pub fn function_count(&self) -> usize {
        self.functions.len()
    }

    pub fn predicate_count(&self) -> usize {
        self.predicates.len()
    }

    // === Builtins ===

    pub fn arrow(&self) -> FunctionId {
        self.arrow
    }

    pub fn add(&self) -> FunctionId {
        self.add
    }

    pub fn ap(&self) -> FunctionId {
        self.ap
    }

    pub fn eq_predicate(&self) -> PredicateId {
        self.eq
    }

    /// Internal functor wrapping `(sort, term)` keys for the term index.
    pub fn key_fn(&self) -> FunctionId {
        self.key_fn
    }

    /// The `Int` sort term.
    pub fn int_sort(&self) -> TermId {
        self.int_sort
    }

    /// Sort given to internal key-wrapper applications.
    pub fn key_sort(&self) -> TermId {
        self.key_sort
    }
}

impl fmt::Display for FunctionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "F{}", self.0)
    }
}

impl fmt::Display for PredicateId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "P{}", self.0)
    }
}

// === Serde implementations ===
// IDs serialize as raw u32 for compact storage.

impl Serialize for FunctionId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.0.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for FunctionId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        u32::deserialize(deserializer).map(FunctionId)
    }
}

impl Serialize for PredicateId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.0.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for PredicateId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        u32::deserialize(deserializer).map(PredicateId)
    }
}
