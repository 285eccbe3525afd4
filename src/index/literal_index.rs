//! Literal index: one substitution tree per predicate and polarity.
//!
//! A literal's argument vector is the key, wrapped with the predicate's
//! companion functor. Queries select the tree of the same polarity, or of
//! the complemented polarity for resolution-style retrieval.

use indexmap::IndexMap;
use log::debug;

use crate::config::UnificationWithAbstraction;
use crate::fol::literal::{ClauseId, Literal};
use crate::fol::signature::{PredicateId, Signature};
use crate::fol::term::{TermId, TermStore, TypedTermList};
use crate::index::substitution_tree::{LeafData, SubstitutionTree, TreeQuery};
use crate::unification::handler::MismatchHandler;

/// Substitution-tree index over literals.
#[derive(Debug, Clone)]
pub struct LiteralSubstitutionTree {
    trees: IndexMap<(PredicateId, bool), SubstitutionTree>,
    /// Queries against an absent (predicate, polarity) pair iterate this.
    empty: SubstitutionTree,
}

fn wrap_literal(sig: &Signature, store: &mut TermStore, lit: &Literal) -> TermId {
    store.app_raw(
        sig,
        sig.predicate_key_fn(lit.predicate),
        lit.args.clone(),
        Some(sig.key_sort()),
    )
}

impl LiteralSubstitutionTree {
    pub fn new() -> Self {
        LiteralSubstitutionTree {
            trees: IndexMap::new(),
            empty: SubstitutionTree::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.trees.values().all(|t| t.is_empty())
    }

    fn leaf_data(sig: &Signature, key: TermId, lit: &Literal, clause: Option<ClauseId>) -> LeafData {
        LeafData {
            key: TypedTermList::new(key, sig.key_sort()),
            literal: Some(lit.clone()),
            clause,
        }
    }

    /// Insert a literal.
    pub fn insert(
        &mut self,
        sig: &Signature,
        store: &mut TermStore,
        lit: &Literal,
        clause: Option<ClauseId>,
    ) {
        let key = wrap_literal(sig, store, lit);
        debug!("literal index insert: {}", lit.display(sig, store));
        self.trees
            .entry((lit.predicate, lit.polarity))
            .or_default()
            .insert(sig, store, key, Self::leaf_data(sig, key, lit, clause));
    }

    /// Remove a previously inserted literal. Returns false when absent.
    pub fn remove(
        &mut self,
        sig: &Signature,
        store: &mut TermStore,
        lit: &Literal,
        clause: Option<ClauseId>,
    ) -> bool {
        let key = wrap_literal(sig, store, lit);
        debug!("literal index remove: {}", lit.display(sig, store));
        match self.trees.get_mut(&(lit.predicate, lit.polarity)) {
            Some(tree) => tree.remove(sig, store, key, &Self::leaf_data(sig, key, lit, clause)),
            None => false,
        }
    }

    /// Retrieve stored literals unifiable with `lit` (or with its
    /// complement when `complementary` is set), each with its abstracting
    /// unifier.
    pub fn get_uwa<'t>(
        &'t self,
        sig: &Signature,
        store: &mut TermStore,
        lit: &Literal,
        complementary: bool,
        uwa: UnificationWithAbstraction,
        fixed_point: bool,
    ) -> TreeQuery<'t> {
        let polarity = lit.polarity ^ complementary;
        let query = wrap_literal(sig, store, lit);
        let tree = self
            .trees
            .get(&(lit.predicate, polarity))
            .unwrap_or(&self.empty);
        tree.query(query, MismatchHandler::new(uwa), fixed_point)
    }
}

impl Default for LiteralSubstitutionTree {
    fn default() -> Self {
        LiteralSubstitutionTree::new()
    }
}
