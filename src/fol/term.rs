//! Hash-consed terms.
//!
//! A `TermId` is an index into the `TermStore`; two structurally equal
//! terms always receive the same ID, so structural equality is ID
//! equality. Sorts are terms too, built from sort constructors (`$int`,
//! `$arrow`, user sorts) and sort variables, which are ordinary variables.
//!
//! Each application node caches its sort, a ground flag, an interpreted
//! flag, and its weight (node count). Tree-internal variables (`SVar`) are
//! a distinct syntactic kind so that one term can mix ordinary variables
//! (whose bank comes from context) with bankless internal ones.

use std::collections::HashMap;
use std::fmt::Write as _;

use crate::error::{Result, TermError};
use crate::fol::signature::{FunctionId, Signature, SortRule, Theory};

/// Index of a hash-consed term in the `TermStore`.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TermId(pub(crate) u32);

impl TermId {
    pub(crate) const INVALID: TermId = TermId(u32::MAX);

    pub fn as_u32(self) -> u32 {
        self.0
    }
}

/// Structure of a term node.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TermData {
    /// Ordinary variable; its bank is supplied by the context reading it
    Var(u32),
    /// Tree-internal variable, bankless
    SVar(u32),
    /// Application of a functor to arguments (possibly none)
    App { functor: FunctionId, args: Vec<TermId> },
}

#[derive(Debug, Clone)]
struct NodeInfo {
    data: TermData,
    /// Sort of the node; `None` for variables and sort terms themselves
    sort: Option<TermId>,
    ground: bool,
    interpreted: bool,
    weight: u32,
}

/// A term paired with its declared sort. All index keys are typed.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct TypedTermList {
    pub term: TermId,
    pub sort: TermId,
}

impl TypedTermList {
    pub fn new(term: TermId, sort: TermId) -> Self {
        TypedTermList { term, sort }
    }
}

/// Interning store for terms.
#[derive(Debug, Clone, Default)]
pub struct TermStore {
    nodes: Vec<NodeInfo>,
    dedup: HashMap<TermData, TermId>,
}

impl TermStore {
    pub fn new() -> Self {
        TermStore::default()
    }

    fn intern(&mut self, data: TermData, sort: Option<TermId>) -> TermId {
        if let Some(&id) = self.dedup.get(&data) {
            return id;
        }
        let (ground, weight) = match &data {
            TermData::Var(_) | TermData::SVar(_) => (false, 1),
            TermData::App { args, .. } => {
                let ground = args.iter().all(|&a| self.nodes[a.0 as usize].ground);
                let weight = 1 + args
                    .iter()
                    .map(|&a| self.nodes[a.0 as usize].weight)
                    .sum::<u32>();
                (ground, weight)
            }
        };
        let interpreted = false;
        let id = TermId(self.nodes.len() as u32);
        self.nodes.push(NodeInfo {
            data: data.clone(),
            sort,
            ground,
            interpreted,
            weight,
        });
        self.dedup.insert(data, id);
        id
    }

    // === Constructors ===

    /// Intern an ordinary variable.
    pub fn var(&mut self, index: u32) -> TermId {
        self.intern(TermData::Var(index), None)
    }

    /// Intern a tree-internal variable.
    pub fn svar(&mut self, index: u32) -> TermId {
        self.intern(TermData::SVar(index), None)
    }

    /// Intern a nullary sort constructor application.
    pub fn sort_const(&mut self, ctor: FunctionId) -> TermId {
        self.intern(
            TermData::App {
                functor: ctor,
                args: Vec::new(),
            },
            None,
        )
    }

    /// Intern an application, validating the arity against the signature
    /// and computing the node sort from the functor's sort rule.
    pub fn app(&mut self, sig: &Signature, functor: FunctionId, args: Vec<TermId>) -> Result<TermId> {
        let declared = sig.function_arity(functor);
        if args.len() != declared {
            return Err(TermError::ArityMismatch {
                functor,
                declared,
                got: args.len(),
            });
        }
        let sort = match sig.sort_rule(functor) {
            SortRule::SortCtor => None,
            SortRule::Fixed(s) => Some(*s),
            SortRule::Poly {
                type_arity,
                template,
            } => {
                let (type_arity, template) = (*type_arity, *template);
                Some(self.instantiate(template, &args[..type_arity]))
            }
            SortRule::ApCodomain => {
                let fun_sort = self.sort_of(args[0]).ok_or(TermError::NotAFunction)?;
                match self.data(fun_sort) {
                    TermData::App { functor: f, args: s } if *f == sig.arrow() => s[1],
                    _ => return Err(TermError::NotAFunction),
                }
                .into()
            }
        };
        Ok(self.intern_app(sig, functor, args, sort))
    }

    /// Intern an application with a precomputed sort, bypassing arity and
    /// sort-rule checks. Used internally where the arguments are rebuilt
    /// from already-validated terms (tree fragments, sums, applied terms).
    pub(crate) fn app_raw(
        &mut self,
        sig: &Signature,
        functor: FunctionId,
        args: Vec<TermId>,
        sort: Option<TermId>,
    ) -> TermId {
        self.intern_app(sig, functor, args, sort)
    }

    fn intern_app(
        &mut self,
        sig: &Signature,
        functor: FunctionId,
        args: Vec<TermId>,
        sort: Option<TermId>,
    ) -> TermId {
        let id = self.intern(TermData::App { functor, args }, sort);
        self.nodes[id.0 as usize].interpreted = sig.is_interpreted(functor);
        id
    }

    /// Intern an integer numeral.
    pub fn numeral(&mut self, sig: &mut Signature, value: i64) -> TermId {
        let f = sig.numeral(value);
        self.intern_app(sig, f, Vec::new(), Some(sig.int_sort()))
    }

    /// Instantiate a polymorphic sort template: variable `i` is replaced by
    /// `sort_args[i]`.
    fn instantiate(&mut self, template: TermId, sort_args: &[TermId]) -> TermId {
        match self.data(template).clone() {
            TermData::Var(i) if (i as usize) < sort_args.len() => sort_args[i as usize],
            TermData::Var(_) | TermData::SVar(_) => template,
            TermData::App { functor, args } => {
                let new_args: Vec<TermId> =
                    args.iter().map(|&a| self.instantiate(a, sort_args)).collect();
                if new_args == args {
                    template
                } else {
                    self.intern(
                        TermData::App {
                            functor,
                            args: new_args,
                        },
                        None,
                    )
                }
            }
        }
    }

    /// Replace every occurrence of the internal variable `svar` by `rep`.
    /// Used by the tree when contracting single-child chains.
    pub(crate) fn replace_svar(
        &mut self,
        sig: &Signature,
        term: TermId,
        svar: u32,
        rep: TermId,
    ) -> TermId {
        match self.data(term).clone() {
            TermData::SVar(i) if i == svar => rep,
            TermData::Var(_) | TermData::SVar(_) => term,
            TermData::App { functor, args } => {
                let new_args: Vec<TermId> = args
                    .iter()
                    .map(|&a| self.replace_svar(sig, a, svar, rep))
                    .collect();
                if new_args == args {
                    term
                } else {
                    let sort = self.sort_of(term);
                    self.intern_app(sig, functor, new_args, sort)
                }
            }
        }
    }

    // === Projections ===

    pub fn data(&self, t: TermId) -> &TermData {
        &self.nodes[t.0 as usize].data
    }

    pub fn sort_of(&self, t: TermId) -> Option<TermId> {
        self.nodes[t.0 as usize].sort
    }

    pub fn is_ground(&self, t: TermId) -> bool {
        self.nodes[t.0 as usize].ground
    }

    /// Whether the top functor is interpreted by the integer theory
    /// (cached at interning time).
    pub fn is_interpreted(&self, t: TermId) -> bool {
        self.nodes[t.0 as usize].interpreted
    }

    pub fn weight(&self, t: TermId) -> u32 {
        self.nodes[t.0 as usize].weight
    }

    pub fn is_var(&self, t: TermId) -> bool {
        matches!(self.data(t), TermData::Var(_) | TermData::SVar(_))
    }

    pub fn functor_of(&self, t: TermId) -> Option<FunctionId> {
        match self.data(t) {
            TermData::App { functor, .. } => Some(*functor),
            _ => None,
        }
    }

    pub fn args_of(&self, t: TermId) -> &[TermId] {
        match self.data(t) {
            TermData::App { args, .. } => args,
            _ => &[],
        }
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Pre-order enumeration of the positions of a term with their depths.
    pub fn flat_view(&self, t: TermId) -> FlatView<'_> {
        FlatView {
            store: self,
            stack: vec![(t, 0)],
        }
    }

    // === Display ===

    /// Render a term for diagnostics. Numerals print their value, sums
    /// print infix.
    pub fn display(&self, sig: &Signature, t: TermId) -> String {
        let mut out = String::new();
        self.display_into(sig, t, &mut out);
        out
    }

    fn display_into(&self, sig: &Signature, t: TermId, out: &mut String) {
        match self.data(t) {
            TermData::Var(i) => {
                let _ = write!(out, "X{}", i);
            }
            TermData::SVar(i) => {
                let _ = write!(out, "S{}", i);
            }
            TermData::App { functor, args } => {
                if let Some(Theory::Numeral(v)) = sig.theory(*functor) {
                    let _ = write!(out, "{}", v);
                } else if sig.theory(*functor) == Some(Theory::Add) {
                    out.push('(');
                    self.display_into(sig, args[0], out);
                    out.push_str(" + ");
                    self.display_into(sig, args[1], out);
                    out.push(')');
                } else if args.is_empty() {
                    out.push_str(sig.function_name(*functor));
                } else {
                    out.push_str(sig.function_name(*functor));
                    out.push('(');
                    for (i, &a) in args.iter().enumerate() {
                        if i > 0 {
                            out.push(',');
                        }
                        self.display_into(sig, a, out);
                    }
                    out.push(')');
                }
            }
        }
    }
}

/// Iterator over `(position, depth)` pairs of a term in pre-order.
pub struct FlatView<'a> {
    store: &'a TermStore,
    stack: Vec<(TermId, u32)>,
}

impl<'a> Iterator for FlatView<'a> {
    type Item = (TermId, u32);

    fn next(&mut self) -> Option<(TermId, u32)> {
        let (t, depth) = self.stack.pop()?;
        if let TermData::App { args, .. } = self.store.data(t) {
            for &a in args.iter().rev() {
                self.stack.push((a, depth + 1));
            }
        }
        Some((t, depth))
    }
}
