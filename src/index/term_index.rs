//! Term index: substitution tree keyed by typed terms.
//!
//! Keys are wrapped as `$key(sort, term)` under the root variable, so the
//! sort participates in retrieval like any other subterm: sort variables
//! bind by ordinary unification and incompatible sorts prune whole
//! subtrees.

use log::debug;

use crate::config::UnificationWithAbstraction;
use crate::fol::literal::{ClauseId, Literal};
use crate::fol::signature::Signature;
use crate::fol::term::{TermId, TermStore, TypedTermList};
use crate::index::substitution_tree::{LeafData, SubstitutionTree, TreeQuery};
use crate::unification::handler::MismatchHandler;

/// Substitution-tree index over typed terms.
#[derive(Debug, Clone, Default)]
pub struct TermSubstitutionTree {
    tree: SubstitutionTree,
}

fn wrap_key(sig: &Signature, store: &mut TermStore, key: TypedTermList) -> TermId {
    store.app_raw(
        sig,
        sig.key_fn(),
        vec![key.sort, key.term],
        Some(sig.key_sort()),
    )
}

impl TermSubstitutionTree {
    pub fn new() -> Self {
        TermSubstitutionTree::default()
    }

    pub fn is_empty(&self) -> bool {
        self.tree.is_empty()
    }

    /// Insert an entry under its typed key.
    pub fn insert(
        &mut self,
        sig: &Signature,
        store: &mut TermStore,
        key: TypedTermList,
        literal: Option<Literal>,
        clause: Option<ClauseId>,
    ) {
        let wrapped = wrap_key(sig, store, key);
        debug!("term index insert: {}", store.display(sig, key.term));
        self.tree.insert(
            sig,
            store,
            wrapped,
            LeafData {
                key,
                literal,
                clause,
            },
        );
    }

    /// Remove a previously inserted entry. Returns false when absent.
    pub fn remove(
        &mut self,
        sig: &Signature,
        store: &mut TermStore,
        key: TypedTermList,
        literal: Option<Literal>,
        clause: Option<ClauseId>,
    ) -> bool {
        let wrapped = wrap_key(sig, store, key);
        debug!("term index remove: {}", store.display(sig, key.term));
        self.tree.remove(
            sig,
            store,
            wrapped,
            &LeafData {
                key,
                literal,
                clause,
            },
        )
    }

    /// Retrieve every stored entry together with an abstracting unifier
    /// against `query`, as a lazy pull-based sequence.
    pub fn get_uwa<'t>(
        &'t self,
        sig: &Signature,
        store: &mut TermStore,
        query: TypedTermList,
        uwa: UnificationWithAbstraction,
        fixed_point: bool,
    ) -> TreeQuery<'t> {
        let wrapped = wrap_key(sig, store, query);
        self.tree
            .query(wrapped, MismatchHandler::new(uwa), fixed_point)
    }
}
