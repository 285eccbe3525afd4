//! Mismatch handler: the abstraction policy consulted when the syntactic
//! unifier meets a pair it cannot (or should not) decompose.
//!
//! The handler is a closed enum over the recognised policies; all variants
//! are known statically and dispatched by tag. It classifies a subproblem
//! `s =?= t` as one of
//!
//! - `Pass`: no special treatment, decompose or fail syntactically
//! - `Never`: provably never equal under the policy, fail the whole call
//! - `Conditional`: equal if the listed subproblems unify and the listed
//!   pairs are deferred as residual disequality constraints

use crate::config::UnificationWithAbstraction;
use crate::fol::signature::Signature;
use crate::fol::term::{TermId, TermStore};
use crate::unification::substitution::{Substitution, TermSpec};

/// A residual disequality, stored unapplied as two summand lists (a
/// singleton list is a plain term). Splitting sums into their atoms keeps
/// mixed-bank residues representable without composite term specs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnificationConstraint {
    pub lhs: Vec<TermSpec>,
    pub rhs: Vec<TermSpec>,
}

impl UnificationConstraint {
    pub fn pair(lhs: TermSpec, rhs: TermSpec) -> Self {
        UnificationConstraint {
            lhs: vec![lhs],
            rhs: vec![rhs],
        }
    }
}

/// Verdict of the handler on one subproblem.
#[derive(Debug, Clone)]
pub enum Classification {
    Pass,
    Never,
    Conditional {
        unify: Vec<(TermSpec, TermSpec)>,
        defer: Vec<UnificationConstraint>,
    },
}

/// Strategy object deciding which mismatches become constraints.
#[derive(Debug, Clone, Copy)]
pub struct MismatchHandler {
    mode: UnificationWithAbstraction,
}

impl MismatchHandler {
    pub fn new(mode: UnificationWithAbstraction) -> Self {
        MismatchHandler { mode }
    }

    pub fn mode(&self) -> UnificationWithAbstraction {
        self.mode
    }

    /// Classify a dereferenced subproblem. Callers hand over pairs the
    /// plain unifier would otherwise decompose or reject, including
    /// occurs-check failures (where one side is a variable).
    pub fn classify(
        &self,
        sig: &Signature,
        store: &mut TermStore,
        subs: &Substitution,
        s: TermSpec,
        t: TermSpec,
    ) -> Classification {
        use UnificationWithAbstraction::*;
        match self.mode {
            Off => Classification::Pass,
            InterpOnly | OneInterp => self.classify_interp(store, sig, s, t),
            FuncExt => self.classify_func_ext(sig, store, subs, s, t),
            Ac1 | Ac2 => self.classify_ac(sig, store, subs, s, t),
        }
    }

    /// Re-examine a stored summand-list constraint under the current
    /// substitution (fixed-point iteration).
    pub(crate) fn refine_ac(
        &self,
        sig: &Signature,
        store: &mut TermStore,
        subs: &Substitution,
        lhs: &[TermSpec],
        rhs: &[TermSpec],
    ) -> Classification {
        let mut ls = Vec::new();
        let mut rs = Vec::new();
        for &a in lhs {
            self.flatten_sum(sig, store, subs, a, &mut ls);
        }
        for &a in rhs {
            self.flatten_sum(sig, store, subs, a, &mut rs);
        }
        self.ac_from_atoms(sig, store, subs, ls, rs)
    }

    // === Interpreted-term policies ===

    fn classify_interp(
        &self,
        store: &TermStore,
        sig: &Signature,
        s: TermSpec,
        t: TermSpec,
    ) -> Classification {
        if store.is_var(s.term) || store.is_var(t.term) {
            return Classification::Pass;
        }
        let s_interp = store.is_interpreted(s.term);
        let t_interp = store.is_interpreted(t.term);
        let both_numerals = is_numeral(sig, store, s.term) && is_numeral(sig, store, t.term);
        let applicable = match self.mode {
            UnificationWithAbstraction::OneInterp => s_interp || t_interp,
            _ => s_interp && t_interp,
        };
        if applicable && !both_numerals {
            Classification::Conditional {
                unify: Vec::new(),
                defer: vec![UnificationConstraint::pair(s, t)],
            }
        } else {
            Classification::Pass
        }
    }

    // === Function extensionality ===

    fn classify_func_ext(
        &self,
        sig: &Signature,
        store: &TermStore,
        subs: &Substitution,
        s: TermSpec,
        t: TermSpec,
    ) -> Classification {
        if store.is_var(s.term) || store.is_var(t.term) {
            return Classification::Pass;
        }
        if store.functor_of(s.term) == store.functor_of(t.term) {
            return Classification::Pass;
        }
        if self.is_arrow_sorted(sig, store, subs, s) && self.is_arrow_sorted(sig, store, subs, t) {
            Classification::Conditional {
                unify: Vec::new(),
                defer: vec![UnificationConstraint::pair(s, t)],
            }
        } else {
            Classification::Pass
        }
    }

    fn is_arrow_sorted(
        &self,
        sig: &Signature,
        store: &TermStore,
        subs: &Substitution,
        spec: TermSpec,
    ) -> bool {
        let sort = match store.sort_of(spec.term) {
            Some(s) => s,
            None => return false,
        };
        // the sort may be (or contain) a bound sort variable
        let resolved = subs.deref(store, TermSpec::new(sort, spec.bank));
        store.functor_of(resolved.term) == Some(sig.arrow())
    }

    // === AC abstraction with peeling ===

    fn classify_ac(
        &self,
        sig: &Signature,
        store: &mut TermStore,
        subs: &Substitution,
        s: TermSpec,
        t: TermSpec,
    ) -> Classification {
        let add = Some(sig.add());
        if store.functor_of(s.term) != add || store.functor_of(t.term) != add {
            return Classification::Pass;
        }
        let mut ls = Vec::new();
        let mut rs = Vec::new();
        self.flatten_sum(sig, store, subs, s, &mut ls);
        self.flatten_sum(sig, store, subs, t, &mut rs);
        self.ac_from_atoms(sig, store, subs, ls, rs)
    }

    /// Collect the dereferenced non-`+` atoms of a sum spine, left to right.
    fn flatten_sum(
        &self,
        sig: &Signature,
        store: &TermStore,
        subs: &Substitution,
        spec: TermSpec,
        out: &mut Vec<TermSpec>,
    ) {
        let d = subs.deref(store, spec);
        if store.functor_of(d.term) == Some(sig.add()) {
            let args: Vec<TermId> = store.args_of(d.term).to_vec();
            for a in args {
                self.flatten_sum(sig, store, subs, TermSpec::new(a, d.bank), out);
            }
        } else {
            out.push(d);
        }
    }

    /// Peel the common summand multiset, then decide what to do with the
    /// residues.
    fn ac_from_atoms(
        &self,
        sig: &Signature,
        store: &mut TermStore,
        subs: &Substitution,
        mut ls: Vec<TermSpec>,
        mut rs: Vec<TermSpec>,
    ) -> Classification {
        ls.sort_by_key(|a| a.content_key(store));
        rs.sort_by_key(|a| a.content_key(store));

        let mut l_res = Vec::new();
        let mut r_res = Vec::new();
        let (mut i, mut j) = (0, 0);
        while i < ls.len() && j < rs.len() {
            let (kl, kr) = (ls[i].content_key(store), rs[j].content_key(store));
            if kl == kr {
                i += 1;
                j += 1;
            } else if kl < kr {
                l_res.push(ls[i]);
                i += 1;
            } else {
                r_res.push(rs[j]);
                j += 1;
            }
        }
        l_res.extend_from_slice(&ls[i..]);
        r_res.extend_from_slice(&rs[j..]);

        if l_res.is_empty() && r_res.is_empty() {
            return Classification::Conditional {
                unify: Vec::new(),
                defer: Vec::new(),
            };
        }
        if l_res.is_empty() || r_res.is_empty() {
            return Classification::Never;
        }

        if self.mode == UnificationWithAbstraction::Ac2 {
            if let Some(pair) = self.single_var_binding(sig, store, subs, &l_res, &r_res) {
                return Classification::Conditional {
                    unify: vec![pair],
                    defer: Vec::new(),
                };
            }
            if let Some((v, sum)) = self.single_var_binding(sig, store, subs, &r_res, &l_res) {
                return Classification::Conditional {
                    unify: vec![(v, sum)],
                    defer: Vec::new(),
                };
            }
        }

        let any_var = l_res
            .iter()
            .chain(r_res.iter())
            .any(|a| store.is_var(a.term));
        if any_var {
            Classification::Conditional {
                unify: Vec::new(),
                defer: vec![UnificationConstraint {
                    lhs: l_res,
                    rhs: r_res,
                }],
            }
        } else {
            Classification::Never
        }
    }

    /// `AC2` only: a residue that is a single unbound variable not occurring
    /// in the other residue unifies against the other residue's sum.
    fn single_var_binding(
        &self,
        sig: &Signature,
        store: &mut TermStore,
        subs: &Substitution,
        single: &[TermSpec],
        other: &[TermSpec],
    ) -> Option<(TermSpec, TermSpec)> {
        if single.len() != 1 || !store.is_var(single[0].term) {
            return None;
        }
        let v = Substitution::var_spec(store, single[0])?;
        if other.iter().any(|&a| subs.occurs(store, v, a)) {
            return None;
        }
        let sum = build_sum(sig, store, other)?;
        Some((single[0], sum))
    }
}

fn is_numeral(sig: &Signature, store: &TermStore, t: TermId) -> bool {
    store
        .functor_of(t)
        .map(|f| sig.is_numeral(f))
        .unwrap_or(false)
}

/// Fold atoms into a left-associated sum spec. Fails when the non-ground
/// atoms live in different banks (no single bank could read the result).
fn build_sum(sig: &Signature, store: &mut TermStore, atoms: &[TermSpec]) -> Option<TermSpec> {
    let mut bank = None;
    for a in atoms {
        if !store.is_ground(a.term) {
            match bank {
                None => bank = Some(a.bank),
                Some(b) if b == a.bank => {}
                Some(_) => return None,
            }
        }
    }
    let bank = bank.unwrap_or(atoms.first()?.bank);
    let mut acc = atoms.first()?.term;
    let int_sort = sig.int_sort();
    for a in &atoms[1..] {
        acc = store.app_raw(sig, sig.add(), vec![acc, a.term], Some(int_sort));
    }
    Some(TermSpec::new(acc, bank))
}
