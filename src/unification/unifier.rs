//! The abstracting unifier: Robinson unification over bank-tagged terms,
//! enriched with a mismatch handler and a store of residual constraints.
//!
//! The worklist is a stack; decomposition pushes argument pairs left to
//! right, so they are solved right to left. Constraints are stored
//! unapplied and only materialised as literals on demand, which lets
//! later bindings show through.

use log::trace;

use crate::fol::literal::Literal;
use crate::fol::signature::Signature;
use crate::fol::term::{TermId, TermStore};
use crate::unification::handler::{Classification, MismatchHandler, UnificationConstraint};
use crate::unification::substitution::{
    Checkpoint, Substitution, TermSpec, VarBank,
};

/// Residual disequalities deferred by the handler, in deferral order.
#[derive(Debug, Clone, Default)]
pub struct ConstraintStore {
    cons: Vec<UnificationConstraint>,
}

impl ConstraintStore {
    pub fn new() -> Self {
        ConstraintStore::default()
    }

    pub fn push(&mut self, c: UnificationConstraint) {
        self.cons.push(c);
    }

    pub fn extend(&mut self, cs: Vec<UnificationConstraint>) {
        self.cons.extend(cs);
    }

    pub fn len(&self) -> usize {
        self.cons.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cons.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &UnificationConstraint> {
        self.cons.iter()
    }

    fn truncate(&mut self, len: usize) {
        self.cons.truncate(len);
    }

    fn drain_all(&mut self) -> Vec<UnificationConstraint> {
        std::mem::take(&mut self.cons)
    }
}

/// Joint checkpoint over the substitution and the constraint store.
#[derive(Debug, Copy, Clone)]
pub struct UnifierCheckpoint {
    subs: Checkpoint,
    constraints: usize,
}

/// Unifier maintaining a substitution and a constraint store, with a
/// pluggable mismatch handler.
#[derive(Debug, Clone)]
pub struct AbstractingUnifier {
    subs: Substitution,
    constraints: ConstraintStore,
    handler: MismatchHandler,
}

impl AbstractingUnifier {
    pub fn new(handler: MismatchHandler) -> Self {
        AbstractingUnifier {
            subs: Substitution::new(),
            constraints: ConstraintStore::new(),
            handler,
        }
    }

    /// Unify `a` (read under `a_bank`) with `b` (read under `b_bank`).
    /// Returns the unifier on success; `None` is an ordinary negative
    /// outcome.
    pub fn unify_terms(
        a: TermId,
        a_bank: VarBank,
        b: TermId,
        b_bank: VarBank,
        handler: MismatchHandler,
        fixed_point: bool,
        sig: &Signature,
        store: &mut TermStore,
    ) -> Option<AbstractingUnifier> {
        let mut au = AbstractingUnifier::new(handler);
        if !au.unify(TermSpec::new(a, a_bank), TermSpec::new(b, b_bank), sig, store) {
            return None;
        }
        if fixed_point && !au.fixed_point_iteration(sig, store) {
            return None;
        }
        Some(au)
    }

    pub fn subs(&self) -> &Substitution {
        &self.subs
    }

    pub fn subs_mut(&mut self) -> &mut Substitution {
        &mut self.subs
    }

    pub fn constraints(&self) -> &ConstraintStore {
        &self.constraints
    }

    pub fn handler(&self) -> &MismatchHandler {
        &self.handler
    }

    pub fn checkpoint(&self) -> UnifierCheckpoint {
        UnifierCheckpoint {
            subs: self.subs.checkpoint(),
            constraints: self.constraints.len(),
        }
    }

    pub fn rollback(&mut self, h: UnifierCheckpoint) {
        self.subs.rollback(h.subs);
        self.constraints.truncate(h.constraints);
    }

    /// Extend the unifier with one subproblem. On failure both the
    /// substitution and the constraint store are restored to their state
    /// at entry.
    pub fn unify(&mut self, l: TermSpec, r: TermSpec, sig: &Signature, store: &mut TermStore) -> bool {
        let h = self.checkpoint();
        if self.solve(vec![(l, r)], sig, store) {
            true
        } else {
            self.rollback(h);
            false
        }
    }

    fn solve(
        &mut self,
        mut work: Vec<(TermSpec, TermSpec)>,
        sig: &Signature,
        store: &mut TermStore,
    ) -> bool {
        while let Some((s, t)) = work.pop() {
            let s = self.subs.deref(store, s);
            let t = self.subs.deref(store, t);
            if s.same_content(t, store) {
                continue;
            }

            // unbound variables bind directly unless the occurs check trips
            let sv = Substitution::var_spec(store, s);
            let tv = Substitution::var_spec(store, t);
            if let Some(v) = sv {
                if !self.subs.occurs(store, v, t) {
                    self.subs.bind(v, t);
                    continue;
                }
            } else if let Some(v) = tv {
                if !self.subs.occurs(store, v, s) {
                    self.subs.bind(v, s);
                    continue;
                }
            }

            // top-symbol mismatch or occurs failure: consult the handler
            match self.handler.classify(sig, store, &self.subs, s, t) {
                Classification::Conditional { unify, defer } => {
                    work.extend(unify);
                    self.constraints.extend(defer);
                }
                Classification::Never => return false,
                Classification::Pass => {
                    if sv.is_some() || tv.is_some() {
                        // occurs failure the handler declined to absorb
                        return false;
                    }
                    let (f, g) = match (store.functor_of(s.term), store.functor_of(t.term)) {
                        (Some(f), Some(g)) => (f, g),
                        _ => return false,
                    };
                    if f != g {
                        return false;
                    }
                    let s_args = store.args_of(s.term).to_vec();
                    let t_args = store.args_of(t.term).to_vec();
                    debug_assert_eq!(s_args.len(), t_args.len());
                    for (&sa, &ta) in s_args.iter().zip(t_args.iter()) {
                        work.push((TermSpec::new(sa, s.bank), TermSpec::new(ta, t.bank)));
                    }
                }
            }
        }
        true
    }

    /// Close the constraint store under the current substitution: pairs
    /// that now unify syntactically are dropped and their MGU merged into
    /// the substitution, pairs that now fail abort the whole unification,
    /// the rest stay residual. Each pass either grows the substitution or
    /// is the last, so this terminates.
    pub fn fixed_point_iteration(&mut self, sig: &Signature, store: &mut TermStore) -> bool {
        loop {
            let cons = self.constraints.drain_all();
            if cons.is_empty() {
                return true;
            }
            let before = self.subs.checkpoint();
            for c in cons {
                if !self.refine(c, sig, store) {
                    trace!("fixed point iteration found a contradiction");
                    return false;
                }
            }
            if self.subs.checkpoint() == before {
                return true;
            }
        }
    }

    fn refine(&mut self, c: UnificationConstraint, sig: &Signature, store: &mut TermStore) -> bool {
        if c.lhs.len() == 1 && c.rhs.len() == 1 {
            return self.unify(c.lhs[0], c.rhs[0], sig, store);
        }
        match self.handler.refine_ac(sig, store, &self.subs, &c.lhs, &c.rhs) {
            Classification::Conditional { unify, defer } => {
                self.constraints.extend(defer);
                for (l, r) in unify {
                    if !self.unify(l, r, sig, store) {
                        return false;
                    }
                }
                true
            }
            Classification::Never => false,
            Classification::Pass => {
                // multi-summand constraints only exist under AC policies
                debug_assert!(self.handler.mode().is_ac());
                self.constraints.push(c);
                true
            }
        }
    }

    /// Materialise the residual constraints as negative equality literals
    /// under the current substitution. Pairs the substitution has closed
    /// syntactically are omitted.
    pub fn constraint_literals(&mut self, sig: &Signature, store: &mut TermStore) -> Vec<Literal> {
        let cons: Vec<UnificationConstraint> = self.constraints.iter().cloned().collect();
        let mut out = Vec::with_capacity(cons.len());
        for c in cons {
            let l = self.apply_sum(&c.lhs, sig, store);
            let r = self.apply_sum(&c.rhs, sig, store);
            match (l, r) {
                (Some(l), Some(r)) if l != r => out.push(Literal::equality(sig, false, l, r)),
                _ => {}
            }
        }
        out
    }

    /// Apply the substitution to a constraint side, one term per summand,
    /// folded back into a left-associated sum.
    fn apply_sum(
        &mut self,
        atoms: &[TermSpec],
        sig: &Signature,
        store: &mut TermStore,
    ) -> Option<TermId> {
        let applied: Vec<TermId> = atoms
            .iter()
            .map(|a| self.subs.apply(sig, store, a.term, a.bank))
            .collect();
        let (&first, rest) = applied.split_first()?;
        let int_sort = sig.int_sort();
        let mut acc = first;
        for &a in rest {
            acc = store.app_raw(sig, sig.add(), vec![acc, a], Some(int_sort));
        }
        Some(acc)
    }
}
