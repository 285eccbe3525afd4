//! Property-based tests for the abstracting unifier and the substitution
//! tree using proptest.

use proptest::prelude::*;

use crate::config::UnificationWithAbstraction;
use crate::fol::signature::Signature;
use crate::fol::term::{TermId, TermStore, TypedTermList};
use crate::index::substitution_tree::LeafData;
use crate::index::term_index::TermSubstitutionTree;
use crate::unification::handler::MismatchHandler;
use crate::unification::substitution::VarBank;
use crate::unification::unifier::AbstractingUnifier;

/// Term description (before interning)
#[derive(Debug, Clone)]
enum TermDesc {
    Var(u8),         // Variable index 0-3
    Const(u8),       // Constant index 0-3
    Func(u8, Vec<TermDesc>), // Function index 0-1, with args
}

fn arb_term_desc(max_depth: u32) -> BoxedStrategy<TermDesc> {
    if max_depth == 0 {
        prop_oneof![
            (0..4u8).prop_map(TermDesc::Var),
            (0..4u8).prop_map(TermDesc::Const),
        ]
        .boxed()
    } else {
        prop_oneof![
            3 => (0..4u8).prop_map(TermDesc::Var),
            3 => (0..4u8).prop_map(TermDesc::Const),
            2 => (0..2u8, proptest::collection::vec(arb_term_desc(max_depth - 1), 1..=2))
                .prop_map(|(f, args)| TermDesc::Func(f, args)),
        ]
        .boxed()
    }
}

fn build_term(desc: &TermDesc, store: &mut TermStore, sig: &mut Signature) -> TermId {
    match desc {
        TermDesc::Var(i) => store.var(*i as u32),
        TermDesc::Const(i) => {
            let int = sig.int_sort();
            let f = sig.declare_function(&format!("c{}", i), 0, int);
            store.app(sig, f, vec![]).expect("arity 0")
        }
        TermDesc::Func(f, args) => {
            let int = sig.int_sort();
            // arity is part of the name so redeclaration stays consistent
            let id = sig.declare_function(&format!("f{}_{}", f, args.len()), args.len(), int);
            let built: Vec<TermId> = args.iter().map(|a| build_term(a, store, sig)).collect();
            store.app(sig, id, built).expect("declared arity")
        }
    }
}

fn fresh() -> (TermStore, Signature) {
    let mut store = TermStore::new();
    let sig = Signature::new(&mut store);
    (store, sig)
}

fn direct_unify(
    store: &mut TermStore,
    sig: &Signature,
    q: TermId,
    k: TermId,
) -> Option<AbstractingUnifier> {
    AbstractingUnifier::unify_terms(
        q,
        VarBank::QUERY,
        k,
        VarBank::RESULT,
        MismatchHandler::new(UnificationWithAbstraction::Off),
        false,
        sig,
        store,
    )
}

fn retrieve_keys(
    index: &TermSubstitutionTree,
    store: &mut TermStore,
    sig: &Signature,
    q: TermId,
) -> Vec<TermId> {
    let query = TypedTermList::new(q, sig.int_sort());
    let mut matches = index.get_uwa(sig, store, query, UnificationWithAbstraction::Off, false);
    let mut out = Vec::new();
    while let Some(r) = matches.next_match(sig, store) {
        out.push(r.entry.key.term);
    }
    out.sort();
    out
}

proptest! {
    /// Soundness: a successful plain unification makes both sides equal
    /// under the common substitution
    #[test]
    fn unification_soundness((d1, d2) in (arb_term_desc(3), arb_term_desc(3))) {
        let (mut store, mut sig) = fresh();
        let t1 = build_term(&d1, &mut store, &mut sig);
        let t2 = build_term(&d2, &mut store, &mut sig);
        if let Some(mut au) = direct_unify(&mut store, &sig, t1, t2) {
            let a = au.subs_mut().apply(&sig, &mut store, t1, VarBank::QUERY);
            let b = au.subs_mut().apply(&sig, &mut store, t2, VarBank::RESULT);
            prop_assert_eq!(a, b, "unifier must make terms equal");
        }
    }

    /// Symmetry: plain unification succeeds independently of argument order
    #[test]
    fn unification_symmetry((d1, d2) in (arb_term_desc(3), arb_term_desc(3))) {
        let (mut store, mut sig) = fresh();
        let t1 = build_term(&d1, &mut store, &mut sig);
        let t2 = build_term(&d2, &mut store, &mut sig);
        let r1 = direct_unify(&mut store, &sig, t1, t2).is_some();
        let r2 = direct_unify(&mut store, &sig, t2, t1).is_some();
        prop_assert_eq!(r1, r2, "unification should be symmetric");
    }

    /// Completeness of retrieval against direct unification: the tree
    /// returns exactly the stored keys the plain unifier accepts
    #[test]
    fn tree_matches_direct_unification(
        (keys, qd) in (proptest::collection::vec(arb_term_desc(2), 1..6), arb_term_desc(2))
    ) {
        let (mut store, mut sig) = fresh();
        let mut index = TermSubstitutionTree::new();
        let mut inserted = Vec::new();
        for d in &keys {
            let k = build_term(d, &mut store, &mut sig);
            let typed = TypedTermList::new(k, sig.int_sort());
            index.insert(&sig, &mut store, typed, None, None);
            inserted.push(k);
        }
        let q = build_term(&qd, &mut store, &mut sig);

        let mut expected: Vec<TermId> = inserted
            .iter()
            .copied()
            .filter(|&k| direct_unify(&mut store, &sig, q, k).is_some())
            .collect();
        expected.sort();

        let found = retrieve_keys(&index, &mut store, &sig, q);
        prop_assert_eq!(found, expected);
    }

    /// Insert-then-remove restores retrieval behavior
    #[test]
    fn insert_remove_round_trip(
        (keys, extra, qd) in (
            proptest::collection::vec(arb_term_desc(2), 1..5),
            arb_term_desc(2),
            arb_term_desc(2),
        )
    ) {
        let (mut store, mut sig) = fresh();

        let mut with_extra = TermSubstitutionTree::new();
        let mut without_extra = TermSubstitutionTree::new();
        for d in &keys {
            let k = build_term(d, &mut store, &mut sig);
            let typed = TypedTermList::new(k, sig.int_sort());
            with_extra.insert(&sig, &mut store, typed, None, None);
            without_extra.insert(&sig, &mut store, typed, None, None);
        }
        let e = build_term(&extra, &mut store, &mut sig);
        let typed_extra = TypedTermList::new(e, sig.int_sort());
        with_extra.insert(&sig, &mut store, typed_extra, None, None);
        prop_assert!(with_extra.remove(&sig, &mut store, typed_extra, None, None));

        let q = build_term(&qd, &mut store, &mut sig);
        let a = retrieve_keys(&with_extra, &mut store, &sig, q);
        let b = retrieve_keys(&without_extra, &mut store, &sig, q);
        prop_assert_eq!(a, b, "removal must restore behavioral equality");
    }

    /// Determinism: the same query yields the same result multiset
    #[test]
    fn retrieval_is_deterministic(
        (keys, qd) in (proptest::collection::vec(arb_term_desc(2), 1..6), arb_term_desc(2))
    ) {
        let (mut store, mut sig) = fresh();
        let mut index = TermSubstitutionTree::new();
        for d in &keys {
            let k = build_term(d, &mut store, &mut sig);
            let typed = TypedTermList::new(k, sig.int_sort());
            index.insert(&sig, &mut store, typed, None, None);
        }
        let q = build_term(&qd, &mut store, &mut sig);
        let a = retrieve_keys(&index, &mut store, &sig, q);
        let b = retrieve_keys(&index, &mut store, &sig, q);
        prop_assert_eq!(a, b);
    }
}

// `LeafData` is part of the public query result; keep the type exercised
// here so the payload round-trips through retrieval.
proptest! {
    #[test]
    fn leaf_payload_survives_retrieval(d in arb_term_desc(2)) {
        let (mut store, mut sig) = fresh();
        let k = build_term(&d, &mut store, &mut sig);
        let typed = TypedTermList::new(k, sig.int_sort());
        let mut index = TermSubstitutionTree::new();
        index.insert(&sig, &mut store, typed, None, Some(crate::fol::literal::ClauseId(3)));

        let found = {
            let mut matches = index.get_uwa(
                &sig,
                &mut store,
                typed,
                UnificationWithAbstraction::Off,
                false,
            );
            matches.next_match(&sig, &mut store).map(|r| r.entry.clone())
        };
        let entry = found.expect("a term always retrieves itself");
        let expected = LeafData {
            key: typed,
            literal: None,
            clause: Some(crate::fol::literal::ClauseId(3)),
        };
        prop_assert_eq!(entry, expected);
    }
}
