//! Bank-tagged variables and the journaled binding store.
//!
//! Instead of renaming variables apart before unification, each ordinary
//! variable is paired with a bank tag: the same index in different banks
//! is a different unknown. Stored entries live in `RESULT`, queries in
//! `QUERY`; tree-internal variables are a separate bankless kind.
//!
//! Bindings are recorded in a journal so that backtracking is a length
//! truncation; dereferencing walks binding chains without mutating
//! (path compression would not survive rollback).

use std::collections::HashMap;

use crate::fol::signature::Signature;
use crate::fol::term::{TermData, TermId, TermStore};

/// Tag partitioning the ordinary-variable namespace.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VarBank(pub u32);

impl VarBank {
    /// Bank of query terms.
    pub const QUERY: VarBank = VarBank(0);
    /// Bank of stored (result) terms.
    pub const RESULT: VarBank = VarBank(1);
    /// Bank `apply` renders unbound variables into. Nothing is ever bound
    /// in this bank, so dereferencing always terminates at an output
    /// variable even when its index collides with a real one.
    pub const OUTPUT: VarBank = VarBank(u32::MAX);
}

/// A variable as the binding store sees it.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum VarSpec {
    /// Ordinary variable in a bank
    Ord { var: u32, bank: VarBank },
    /// Tree-internal variable (bankless)
    Internal(u32),
}

/// A term read with its ordinary variables in the given bank.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct TermSpec {
    pub term: TermId,
    pub bank: VarBank,
}

impl TermSpec {
    pub fn new(term: TermId, bank: VarBank) -> Self {
        TermSpec { term, bank }
    }

    /// Specs are the same content if the terms coincide and either the
    /// banks agree or the term is ground (bank irrelevant).
    pub fn same_content(self, other: TermSpec, store: &TermStore) -> bool {
        self.term == other.term && (self.bank == other.bank || store.is_ground(self.term))
    }

    /// Key under which multiset cancellation compares atoms: ground atoms
    /// collapse their bank.
    pub(crate) fn content_key(self, store: &TermStore) -> (u32, u32) {
        if store.is_ground(self.term) {
            (self.term.as_u32(), 0)
        } else {
            (self.term.as_u32(), self.bank.0.saturating_add(1))
        }
    }
}

/// Journal position; `rollback` forgets everything bound after it.
pub type Checkpoint = usize;

/// A partial mapping from bank-tagged variables to term specs.
#[derive(Debug, Clone, Default)]
pub struct Substitution {
    bindings: HashMap<VarSpec, TermSpec>,
    journal: Vec<VarSpec>,
    next_output: u32,
}

impl Substitution {
    pub fn new() -> Self {
        Substitution::default()
    }

    /// View a term node as a variable, if it is one.
    pub fn var_spec(store: &TermStore, spec: TermSpec) -> Option<VarSpec> {
        match store.data(spec.term) {
            TermData::Var(i) => Some(VarSpec::Ord {
                var: *i,
                bank: spec.bank,
            }),
            TermData::SVar(i) => Some(VarSpec::Internal(*i)),
            TermData::App { .. } => None,
        }
    }

    pub fn is_bound(&self, v: VarSpec) -> bool {
        self.bindings.contains_key(&v)
    }

    /// Follow binding chains until an unbound variable or a non-variable
    /// term is reached.
    pub fn deref(&self, store: &TermStore, mut spec: TermSpec) -> TermSpec {
        loop {
            match Self::var_spec(store, spec) {
                Some(v) => match self.bindings.get(&v) {
                    Some(&next) => spec = next,
                    None => return spec,
                },
                None => return spec,
            }
        }
    }

    /// Record a binding. The variable must be unbound.
    pub fn bind(&mut self, v: VarSpec, t: TermSpec) {
        debug_assert!(!self.bindings.contains_key(&v));
        self.bindings.insert(v, t);
        self.journal.push(v);
    }

    /// Occurs check: does `v` occur in `spec` after dereferencing?
    pub fn occurs(&self, store: &TermStore, v: VarSpec, spec: TermSpec) -> bool {
        let mut stack = vec![spec];
        while let Some(s) = stack.pop() {
            let s = self.deref(store, s);
            match store.data(s.term) {
                TermData::Var(_) | TermData::SVar(_) => {
                    if Self::var_spec(store, s) == Some(v) {
                        return true;
                    }
                }
                TermData::App { args, .. } => {
                    if store.is_ground(s.term) {
                        continue;
                    }
                    for &a in args {
                        stack.push(TermSpec::new(a, s.bank));
                    }
                }
            }
        }
        false
    }

    pub fn checkpoint(&self) -> Checkpoint {
        self.journal.len()
    }

    /// Undo all bindings made since the checkpoint. The output-variable
    /// counter is deliberately not restored: fresh names stay fresh across
    /// backtracking.
    pub fn rollback(&mut self, h: Checkpoint) {
        while self.journal.len() > h {
            if let Some(v) = self.journal.pop() {
                self.bindings.remove(&v);
            }
        }
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    /// Fully dereference `term` under `bank`, rebuilding it as a bank-free
    /// term. Each unbound variable reached is rendered as a fresh plain
    /// variable, allocated in first-encounter order; the renaming is
    /// recorded through the journal so rollback forgets it.
    pub fn apply(
        &mut self,
        sig: &Signature,
        store: &mut TermStore,
        term: TermId,
        bank: VarBank,
    ) -> TermId {
        self.apply_spec(sig, store, TermSpec::new(term, bank))
    }

    fn apply_spec(&mut self, sig: &Signature, store: &mut TermStore, spec: TermSpec) -> TermId {
        let spec = self.deref(store, spec);
        match store.data(spec.term).clone() {
            TermData::Var(_) | TermData::SVar(_) => {
                // unbound after deref; an OUTPUT variable was already named
                if spec.bank == VarBank::OUTPUT {
                    return spec.term;
                }
                let v = match Self::var_spec(store, spec) {
                    Some(v) => v,
                    None => return spec.term,
                };
                let out = store.var(self.next_output);
                self.next_output += 1;
                self.bind(v, TermSpec::new(out, VarBank::OUTPUT));
                out
            }
            TermData::App { .. } if store.is_ground(spec.term) => spec.term,
            TermData::App { functor, args } => {
                let new_args: Vec<TermId> = args
                    .iter()
                    .map(|&a| self.apply_spec(sig, store, TermSpec::new(a, spec.bank)))
                    .collect();
                let sort = store.sort_of(spec.term);
                store.app_raw(sig, functor, new_args, sort)
            }
        }
    }
}
