//! The substitution tree: a retrieval structure whose inner nodes carry
//! substitution fragments.
//!
//! Each node binds its parent's child variable to a partial term that may
//! contain further internal variables; the concatenation of fragments
//! along any root-to-leaf path reproduces the inserted key. Siblings
//! partition by top symbol, so descent is deterministic for insert and
//! remove, while retrieval explores every child the abstracting unifier
//! can extend the current substitution with.
//!
//! Nodes live in an arena addressed by `NodeId` with a free list; freed
//! slots are recycled on the next allocation. Parent links are not stored,
//! the traversal stack keeps them.

use std::collections::BTreeMap;

use log::debug;

use crate::fol::literal::{ClauseId, Literal};
use crate::fol::signature::Signature;
use crate::fol::term::{TermData, TermId, TermStore, TypedTermList};
use crate::unification::handler::MismatchHandler;
use crate::unification::substitution::{Substitution, TermSpec, VarBank, VarSpec};
use crate::unification::unifier::{AbstractingUnifier, UnifierCheckpoint};

/// Child variable of the virtual root: every key is bound to it.
const ROOT_SVAR: u32 = 0;

/// Stable handle of a node in the tree arena.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct NodeId(u32);

#[derive(Debug, Clone)]
enum NodeKind {
    Inner { cvar: u32, children: Vec<NodeId> },
    Leaf { entries: Vec<LeafData> },
}

#[derive(Debug, Clone)]
struct Node {
    /// Fragment bound to the parent's child variable
    term: TermId,
    kind: NodeKind,
}

/// What a leaf stores per inserted entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LeafData {
    pub key: TypedTermList,
    pub literal: Option<Literal>,
    pub clause: Option<ClauseId>,
}

/// One retrieval match: the stored entry plus the unifier that was built
/// along the path to it.
#[derive(Debug)]
pub struct QueryResult<'t> {
    pub entry: &'t LeafData,
    pub unifier: AbstractingUnifier,
}

/// The retrieval tree. Keys are single terms; the index front-ends wrap
/// typed terms and literal argument vectors into such keys.
#[derive(Debug, Clone)]
pub struct SubstitutionTree {
    nodes: Vec<Node>,
    free: Vec<NodeId>,
    roots: Vec<NodeId>,
    next_svar: u32,
}

impl Default for SubstitutionTree {
    fn default() -> Self {
        SubstitutionTree::new()
    }
}

impl SubstitutionTree {
    pub fn new() -> Self {
        SubstitutionTree {
            nodes: Vec::new(),
            free: Vec::new(),
            roots: Vec::new(),
            next_svar: ROOT_SVAR + 1,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.roots.is_empty()
    }

    fn alloc(&mut self, node: Node) -> NodeId {
        match self.free.pop() {
            Some(id) => {
                self.nodes[id.0 as usize] = node;
                id
            }
            None => {
                let id = NodeId(self.nodes.len() as u32);
                self.nodes.push(node);
                id
            }
        }
    }

    fn free_node(&mut self, id: NodeId) {
        self.free.push(id);
    }

    fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.0 as usize]
    }

    fn fresh_svar(&mut self) -> u32 {
        let s = self.next_svar;
        self.next_svar += 1;
        s
    }

    fn children(&self, at: Option<NodeId>) -> &[NodeId] {
        match at {
            None => &self.roots,
            Some(id) => match &self.node(id).kind {
                NodeKind::Inner { children, .. } => children,
                NodeKind::Leaf { .. } => &[],
            },
        }
    }

    fn push_child(&mut self, at: Option<NodeId>, child: NodeId) {
        match at {
            None => self.roots.push(child),
            Some(id) => {
                if let NodeKind::Inner { children, .. } = &mut self.nodes[id.0 as usize].kind {
                    children.push(child);
                }
            }
        }
    }

    fn cvar(&self, at: Option<NodeId>) -> u32 {
        match at {
            None => ROOT_SVAR,
            Some(id) => match &self.node(id).kind {
                NodeKind::Inner { cvar, .. } => *cvar,
                NodeKind::Leaf { .. } => ROOT_SVAR,
            },
        }
    }

    /// Two fragments can share a node iff their top symbols agree.
    fn top_compatible(store: &TermStore, frag: TermId, t: TermId) -> bool {
        match (store.data(frag), store.data(t)) {
            (TermData::Var(i), TermData::Var(j)) => i == j,
            (TermData::App { functor: f, .. }, TermData::App { functor: g, .. }) => f == g,
            _ => false,
        }
    }

    // === Insert ===

    /// Insert `key` with its leaf payload. The walk records pending
    /// bindings for the internal variables of matched fragments; the first
    /// structural disagreement splits the conflicting child.
    pub fn insert(&mut self, sig: &Signature, store: &mut TermStore, key: TermId, data: LeafData) {
        let mut bindings: BTreeMap<u32, TermId> = BTreeMap::new();
        bindings.insert(ROOT_SVAR, key);
        let mut at: Option<NodeId> = None;

        loop {
            let cvar = self.cvar(at);
            let t = match bindings.remove(&cvar) {
                Some(t) => t,
                None => {
                    debug_assert!(false, "inner node without a pending binding");
                    return;
                }
            };
            let found = self
                .children(at)
                .iter()
                .copied()
                .find(|&c| Self::top_compatible(store, self.node(c).term, t));

            let c = match found {
                None => {
                    let chain = self.new_chain(t, bindings, data);
                    self.push_child(at, chain);
                    return;
                }
                Some(c) => c,
            };

            let frag = self.node(c).term;
            let mut residues: Vec<(u32, TermId)> = Vec::new();
            let skeleton = self.merge_fragment(sig, store, frag, t, &mut bindings, &mut residues);

            if residues.is_empty() {
                match &mut self.nodes[c.0 as usize].kind {
                    NodeKind::Inner { .. } => {
                        at = Some(c);
                    }
                    NodeKind::Leaf { entries } => {
                        debug_assert!(bindings.is_empty(), "leaf reached with pending bindings");
                        entries.push(data);
                        return;
                    }
                }
            } else {
                self.split(c, skeleton, residues);
                at = Some(c);
            }
        }
    }

    /// Walk fragment and key in lockstep. Internal variables of the
    /// fragment capture the matching key subterm; the first position where
    /// the two structurally disagree gets a fresh internal variable, the
    /// displaced fragment subterm is collected as a residue.
    fn merge_fragment(
        &mut self,
        sig: &Signature,
        store: &mut TermStore,
        frag: TermId,
        t: TermId,
        bindings: &mut BTreeMap<u32, TermId>,
        residues: &mut Vec<(u32, TermId)>,
    ) -> TermId {
        if let TermData::SVar(s) = store.data(frag) {
            bindings.insert(*s, t);
            return frag;
        }
        if frag == t {
            return frag;
        }
        match (store.data(frag).clone(), store.data(t).clone()) {
            (
                TermData::App {
                    functor: f,
                    args: fa,
                },
                TermData::App {
                    functor: g,
                    args: ta,
                },
            ) if f == g => {
                let new_args: Vec<TermId> = fa
                    .iter()
                    .zip(ta.iter())
                    .map(|(&a, &b)| self.merge_fragment(sig, store, a, b, bindings, residues))
                    .collect();
                if new_args == fa {
                    frag
                } else {
                    let sort = store.sort_of(frag);
                    store.app_raw(sig, f, new_args, sort)
                }
            }
            _ => {
                let s = self.fresh_svar();
                residues.push((s, frag));
                bindings.insert(s, t);
                store.svar(s)
            }
        }
    }

    /// Replace the fragment of `c` by the generalization `skeleton`; the
    /// displaced subterms become a chain of fresh nodes above the original
    /// node content.
    fn split(&mut self, c: NodeId, skeleton: TermId, residues: Vec<(u32, TermId)>) {
        debug_assert!(residues.windows(2).all(|w| w[0].0 < w[1].0));
        let first_svar = residues[0].0;
        let orig = std::mem::replace(
            &mut self.nodes[c.0 as usize],
            Node {
                term: skeleton,
                kind: NodeKind::Inner {
                    cvar: first_svar,
                    children: Vec::new(),
                },
            },
        );
        let mut kind = orig.kind;
        for (i, &(svar, res_term)) in residues.iter().enumerate().rev() {
            let id = self.alloc(Node {
                term: res_term,
                kind,
            });
            kind = NodeKind::Inner {
                cvar: svar,
                children: vec![id],
            };
            if i == 0 {
                self.nodes[c.0 as usize].kind = kind;
                return;
            }
        }
    }

    /// Build a fresh chain resolving `first` and every remaining pending
    /// binding (ascending variable order), ending in a leaf.
    fn new_chain(&mut self, first: TermId, bindings: BTreeMap<u32, TermId>, data: LeafData) -> NodeId {
        let rest: Vec<(u32, TermId)> = bindings.into_iter().collect();
        let mut kind = NodeKind::Leaf {
            entries: vec![data],
        };
        for &(svar, term) in rest.iter().rev() {
            let id = self.alloc(Node { term, kind });
            kind = NodeKind::Inner {
                cvar: svar,
                children: vec![id],
            };
        }
        self.alloc(Node { term: first, kind })
    }

    // === Remove ===

    /// Remove one entry equal to `data` stored under `key`. Returns false
    /// when no such entry exists. Emptied nodes are freed and single-child
    /// chains contracted.
    pub fn remove(
        &mut self,
        sig: &Signature,
        store: &mut TermStore,
        key: TermId,
        data: &LeafData,
    ) -> bool {
        let mut bindings: BTreeMap<u32, TermId> = BTreeMap::new();
        bindings.insert(ROOT_SVAR, key);
        let mut at: Option<NodeId> = None;
        let mut path: Vec<NodeId> = Vec::new();

        loop {
            let cvar = self.cvar(at);
            let t = match bindings.remove(&cvar) {
                Some(t) => t,
                None => return false,
            };
            let mut next = None;
            for &c in self.children(at) {
                if Self::top_compatible(store, self.node(c).term, t) {
                    next = Some(c);
                    break;
                }
            }
            let c = match next {
                Some(c) => c,
                None => return false,
            };
            if !Self::match_exact(store, self.node(c).term, t, &mut bindings) {
                return false;
            }
            path.push(c);
            match &mut self.nodes[c.0 as usize].kind {
                NodeKind::Inner { .. } => {
                    at = Some(c);
                }
                NodeKind::Leaf { entries } => {
                    let pos = match entries.iter().position(|e| e == data) {
                        Some(p) => p,
                        None => return false,
                    };
                    entries.remove(pos);
                    break;
                }
            }
        }

        self.cleanup_path(sig, store, &path);
        true
    }

    /// Exact structural match of a fragment against a key, recording the
    /// subterms captured by internal variables.
    fn match_exact(
        store: &TermStore,
        frag: TermId,
        t: TermId,
        bindings: &mut BTreeMap<u32, TermId>,
    ) -> bool {
        if let TermData::SVar(s) = store.data(frag) {
            bindings.insert(*s, t);
            return true;
        }
        if frag == t {
            return true;
        }
        match (store.data(frag), store.data(t)) {
            (
                TermData::App {
                    functor: f,
                    args: fa,
                },
                TermData::App {
                    functor: g,
                    args: ta,
                },
            ) if f == g => {
                let pairs: Vec<(TermId, TermId)> =
                    fa.iter().copied().zip(ta.iter().copied()).collect();
                pairs
                    .into_iter()
                    .all(|(a, b)| Self::match_exact(store, a, b, bindings))
            }
            _ => false,
        }
    }

    /// Free emptied nodes along the path and contract chains that are down
    /// to a single child.
    fn cleanup_path(&mut self, sig: &Signature, store: &mut TermStore, path: &[NodeId]) {
        let mut dead: Option<NodeId> = None;
        for &id in path.iter().rev() {
            if let Some(d) = dead.take() {
                if let NodeKind::Inner { children, .. } = &mut self.nodes[id.0 as usize].kind {
                    children.retain(|&c| c != d);
                }
            }
            let (now_empty, single_child) = match &self.node(id).kind {
                NodeKind::Leaf { entries } => (entries.is_empty(), false),
                NodeKind::Inner { children, .. } => (children.is_empty(), children.len() == 1),
            };
            if now_empty {
                self.free_node(id);
                dead = Some(id);
            } else if single_child {
                self.contract(sig, store, id);
            }
        }
        if let Some(d) = dead {
            self.roots.retain(|&c| c != d);
        }
    }

    /// Merge a single-child inner node with its child: the child fragment
    /// is substituted into the parent fragment and the child slot freed.
    fn contract(&mut self, sig: &Signature, store: &mut TermStore, id: NodeId) {
        let (cvar, child) = match &self.node(id).kind {
            NodeKind::Inner { cvar, children } if children.len() == 1 => (*cvar, children[0]),
            _ => return,
        };
        let child_node = self.node(child).clone();
        let merged = store.replace_svar(sig, self.node(id).term, cvar, child_node.term);
        if merged == self.node(id).term {
            // the child variable is bound by an ancestor fragment, not by
            // this node's term; the chain must stay
            return;
        }
        self.nodes[id.0 as usize] = Node {
            term: merged,
            kind: child_node.kind,
        };
        self.free_node(child);
        debug!("contracted tree node {:?} into its parent", child);
    }

    // === Retrieval ===

    /// Start a retrieval for `query` (already wrapped as a key). The
    /// returned cursor borrows the tree: mutating the index while a query
    /// is outstanding is rejected by the borrow checker.
    pub fn query<'t>(
        &'t self,
        query: TermId,
        handler: MismatchHandler,
        fixed_point: bool,
    ) -> TreeQuery<'t> {
        let mut unifier = AbstractingUnifier::new(handler);
        unifier.subs_mut().bind(
            VarSpec::Internal(ROOT_SVAR),
            TermSpec::new(query, VarBank::QUERY),
        );
        let mut steps = Vec::new();
        for &c in self.roots.iter().rev() {
            steps.push(Step::Enter {
                node: c,
                cvar: ROOT_SVAR,
            });
        }
        TreeQuery {
            tree: self,
            unifier,
            fixed_point,
            steps,
            leaf: None,
        }
    }
}

#[derive(Debug)]
enum Step {
    Enter { node: NodeId, cvar: u32 },
    Exit { checkpoint: UnifierCheckpoint },
}

struct LeafCursor {
    node: NodeId,
    next: usize,
}

/// Pull-based depth-first retrieval. Each call to `next_match` runs the
/// traversal to the next entry the unifier can reach, or to exhaustion.
/// The sequence is finite and non-restartable; sibling order follows
/// insertion order.
pub struct TreeQuery<'t> {
    tree: &'t SubstitutionTree,
    unifier: AbstractingUnifier,
    fixed_point: bool,
    steps: Vec<Step>,
    leaf: Option<LeafCursor>,
}

impl<'t> TreeQuery<'t> {
    /// Advance to the next match. The store is only needed for the
    /// duration of the call, so callers may use it freely between pulls.
    pub fn next_match(
        &mut self,
        sig: &Signature,
        store: &mut TermStore,
    ) -> Option<QueryResult<'t>> {
        let tree: &'t SubstitutionTree = self.tree;
        loop {
            if let Some(cur) = &mut self.leaf {
                let entries = match &tree.node(cur.node).kind {
                    NodeKind::Leaf { entries } => entries,
                    NodeKind::Inner { .. } => {
                        debug_assert!(false, "leaf cursor on inner node");
                        self.leaf = None;
                        continue;
                    }
                };
                if cur.next < entries.len() {
                    let idx = cur.next;
                    cur.next += 1;
                    let mut unifier = self.unifier.clone();
                    if self.fixed_point && !unifier.fixed_point_iteration(sig, store) {
                        continue;
                    }
                    return Some(QueryResult {
                        entry: &entries[idx],
                        unifier,
                    });
                }
                self.leaf = None;
            }

            match self.steps.pop() {
                None => return None,
                Some(Step::Exit { checkpoint }) => self.unifier.rollback(checkpoint),
                Some(Step::Enter { node, cvar }) => {
                    let checkpoint = self.unifier.checkpoint();
                    let lhs = TermSpec::new(store.svar(cvar), VarBank::RESULT);
                    let frag = TermSpec::new(tree.node(node).term, VarBank::RESULT);
                    if self.unifier.unify(lhs, frag, sig, store) {
                        self.steps.push(Step::Exit { checkpoint });
                        match &tree.node(node).kind {
                            NodeKind::Inner { cvar: next_cvar, children } => {
                                for &c in children.iter().rev() {
                                    self.steps.push(Step::Enter {
                                        node: c,
                                        cvar: *next_cvar,
                                    });
                                }
                            }
                            NodeKind::Leaf { .. } => {
                                self.leaf = Some(LeafCursor { node, next: 0 });
                            }
                        }
                    }
                }
            }
        }
    }

    /// The substitution built so far (diagnostics).
    pub fn current_subs(&self) -> &Substitution {
        self.unifier.subs()
    }
}
