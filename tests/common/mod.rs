//! Shared test sugar: a small term builder over one store/signature pair,
//! and comparison of retrieval results modulo AC of `+` and permutation.

use termatlas::{
    AbstractingUnifier, Literal, LiteralSubstitutionTree, MismatchHandler, Signature, TermId,
    TermStore, TermSubstitutionTree, TypedTermList, UnificationWithAbstraction, VarBank,
};

pub struct Ctx {
    pub store: TermStore,
    pub sig: Signature,
}

#[allow(dead_code)]
impl Ctx {
    pub fn new() -> Self {
        let mut store = TermStore::new();
        let sig = Signature::new(&mut store);
        Ctx { store, sig }
    }

    pub fn int(&self) -> TermId {
        self.sig.int_sort()
    }

    pub fn var(&mut self, i: u32) -> TermId {
        self.store.var(i)
    }

    pub fn num(&mut self, v: i64) -> TermId {
        self.store.numeral(&mut self.sig, v)
    }

    pub fn cst(&mut self, name: &str) -> TermId {
        let int = self.sig.int_sort();
        self.cst_sorted(name, int)
    }

    pub fn cst_sorted(&mut self, name: &str, sort: TermId) -> TermId {
        let f = self.sig.declare_function(name, 0, sort);
        self.store.app(&self.sig, f, vec![]).expect("arity 0")
    }

    pub fn func(&mut self, name: &str, args: Vec<TermId>) -> TermId {
        let int = self.sig.int_sort();
        self.func_sorted(name, args, int)
    }

    pub fn func_sorted(&mut self, name: &str, args: Vec<TermId>, sort: TermId) -> TermId {
        let f = self.sig.declare_function(name, args.len(), sort);
        self.store.app(&self.sig, f, args).expect("declared arity")
    }

    pub fn poly_cst(&mut self, name: &str, sort_arg: TermId) -> TermId {
        let template = self.store.var(0);
        let f = self.sig.declare_poly_function(name, 1, 1, template);
        self.store.app(&self.sig, f, vec![sort_arg]).expect("arity 1")
    }

    pub fn sort(&mut self, name: &str) -> TermId {
        let ctor = self.sig.declare_sort(name, 0);
        self.store.sort_const(ctor)
    }

    pub fn arrow(&mut self, from: TermId, to: TermId) -> TermId {
        let arrow = self.sig.arrow();
        self.store
            .app(&self.sig, arrow, vec![from, to])
            .expect("arity 2")
    }

    pub fn ap(&mut self, f: TermId, arg: TermId) -> TermId {
        let ap = self.sig.ap();
        self.store.app(&self.sig, ap, vec![f, arg]).expect("arity 2")
    }

    /// Left-associated sum of the given summands.
    pub fn sum(&mut self, atoms: &[TermId]) -> TermId {
        let add = self.sig.add();
        let mut acc = atoms[0];
        for &a in &atoms[1..] {
            acc = self.store.app(&self.sig, add, vec![acc, a]).expect("arity 2");
        }
        acc
    }

    pub fn typed(&self, term: TermId, sort: TermId) -> TypedTermList {
        TypedTermList::new(term, sort)
    }

    pub fn typed_int(&self, term: TermId) -> TypedTermList {
        TypedTermList::new(term, self.sig.int_sort())
    }

    pub fn neq(&self, lhs: TermId, rhs: TermId) -> Literal {
        Literal::equality(&self.sig, false, lhs, rhs)
    }

    pub fn show(&self, t: TermId) -> String {
        self.store.display(&self.sig, t)
    }

    // === Comparison modulo AC of `+` ===

    pub fn eq_mod_ac(&self, a: TermId, b: TermId) -> bool {
        if a == b {
            return true;
        }
        let add = Some(self.sig.add());
        let (fa, fb) = (self.store.functor_of(a), self.store.functor_of(b));
        if fa != fb || fa.is_none() {
            return false;
        }
        if fa == add {
            let mut xs = Vec::new();
            let mut ys = Vec::new();
            self.flatten_add(a, &mut xs);
            self.flatten_add(b, &mut ys);
            return perm_eq(&xs, &ys, |&x, &y| self.eq_mod_ac(x, y));
        }
        let (xs, ys) = (self.store.args_of(a), self.store.args_of(b));
        xs.len() == ys.len()
            && xs
                .iter()
                .zip(ys.iter())
                .all(|(&x, &y)| self.eq_mod_ac(x, y))
    }

    fn flatten_add(&self, t: TermId, out: &mut Vec<TermId>) {
        if self.store.functor_of(t) == Some(self.sig.add()) {
            let args: Vec<TermId> = self.store.args_of(t).to_vec();
            for a in args {
                self.flatten_add(a, out);
            }
        } else {
            out.push(t);
        }
    }

    pub fn lit_eq_mod_ac(&self, a: &Literal, b: &Literal) -> bool {
        if a.predicate != b.predicate || a.polarity != b.polarity {
            return false;
        }
        let straight = a.args.len() == b.args.len()
            && a.args
                .iter()
                .zip(b.args.iter())
                .all(|(&x, &y)| self.eq_mod_ac(x, y));
        if straight {
            return true;
        }
        // equality is symmetric
        a.is_equality(&self.sig)
            && a.args.len() == 2
            && b.args.len() == 2
            && self.eq_mod_ac(a.args[0], b.args[1])
            && self.eq_mod_ac(a.args[1], b.args[0])
    }
}

/// Multiset equality under an equivalence.
pub fn perm_eq<T, F: Fn(&T, &T) -> bool>(xs: &[T], ys: &[T], eq: F) -> bool {
    if xs.len() != ys.len() {
        return false;
    }
    let mut used = vec![false; ys.len()];
    'outer: for x in xs {
        for (i, y) in ys.iter().enumerate() {
            if !used[i] && eq(x, y) {
                used[i] = true;
                continue 'outer;
            }
        }
        return false;
    }
    true
}

/// One retrieval or unification outcome, fully applied.
#[derive(Debug, Clone)]
pub struct UnifRes {
    pub query_sigma: TermId,
    pub result_sigma: TermId,
    pub constraints: Vec<Literal>,
}

#[allow(dead_code)]
pub fn unif_res(query_sigma: TermId, result_sigma: TermId, constraints: Vec<Literal>) -> UnifRes {
    UnifRes {
        query_sigma,
        result_sigma,
        constraints,
    }
}

#[allow(dead_code)]
impl Ctx {
    fn res_eq(&self, a: &UnifRes, b: &UnifRes) -> bool {
        self.eq_mod_ac(a.query_sigma, b.query_sigma)
            && self.eq_mod_ac(a.result_sigma, b.result_sigma)
            && perm_eq(&a.constraints, &b.constraints, |x, y| {
                self.lit_eq_mod_ac(x, y)
            })
    }

    fn show_res(&self, r: &UnifRes) -> String {
        let cons: Vec<String> = r
            .constraints
            .iter()
            .map(|c| c.display(&self.sig, &self.store))
            .collect();
        format!(
            "{{ querySigma = {}, resultSigma = {}, cons = [{}] }}",
            self.show(r.query_sigma),
            self.show(r.result_sigma),
            cons.join(", ")
        )
    }

    /// Multiset comparison of retrieval outcomes; panics with a readable
    /// diff on mismatch.
    pub fn assert_results(&self, actual: Vec<UnifRes>, expected: Vec<UnifRes>) {
        if perm_eq(&actual, &expected, |a, b| self.res_eq(a, b)) {
            return;
        }
        let is: Vec<String> = actual.iter().map(|r| self.show_res(r)).collect();
        let want: Vec<String> = expected.iter().map(|r| self.show_res(r)).collect();
        panic!(
            "result mismatch\n  is:\n    {}\n  expected:\n    {}",
            is.join("\n    "),
            want.join("\n    ")
        );
    }

    /// Drain a term-index query, applying both sides and materialising the
    /// constraint literals of every match.
    pub fn collect_term_matches(
        &mut self,
        index: &TermSubstitutionTree,
        query: TypedTermList,
        uwa: UnificationWithAbstraction,
        fixed_point: bool,
    ) -> Vec<UnifRes> {
        let mut out = Vec::new();
        let mut matches = index.get_uwa(&self.sig, &mut self.store, query, uwa, fixed_point);
        while let Some(mut r) = matches.next_match(&self.sig, &mut self.store) {
            let query_sigma =
                r.unifier
                    .subs_mut()
                    .apply(&self.sig, &mut self.store, query.term, VarBank::QUERY);
            let result_sigma = r.unifier.subs_mut().apply(
                &self.sig,
                &mut self.store,
                r.entry.key.term,
                VarBank::RESULT,
            );
            let constraints = r.unifier.constraint_literals(&self.sig, &mut self.store);
            out.push(UnifRes {
                query_sigma,
                result_sigma,
                constraints,
            });
        }
        out
    }

    /// Literal-index variant: applies the query and the stored literal.
    pub fn collect_literal_matches(
        &mut self,
        index: &LiteralSubstitutionTree,
        query: &Literal,
        complementary: bool,
        uwa: UnificationWithAbstraction,
        fixed_point: bool,
    ) -> Vec<LitRes> {
        let mut out = Vec::new();
        let mut matches = index.get_uwa(
            &self.sig,
            &mut self.store,
            query,
            complementary,
            uwa,
            fixed_point,
        );
        while let Some(mut r) = matches.next_match(&self.sig, &mut self.store) {
            let stored = r.entry.literal.clone().expect("literal index entry");
            let query_sigma = apply_literal(&mut r.unifier, &self.sig, &mut self.store, query, VarBank::QUERY);
            let result_sigma =
                apply_literal(&mut r.unifier, &self.sig, &mut self.store, &stored, VarBank::RESULT);
            let constraints = r.unifier.constraint_literals(&self.sig, &mut self.store);
            out.push(LitRes {
                query_sigma,
                result_sigma,
                constraints,
            });
        }
        out
    }

    fn lit_res_eq(&self, a: &LitRes, b: &LitRes) -> bool {
        self.lit_eq_mod_ac(&a.query_sigma, &b.query_sigma)
            && self.lit_eq_mod_ac(&a.result_sigma, &b.result_sigma)
            && perm_eq(&a.constraints, &b.constraints, |x, y| {
                self.lit_eq_mod_ac(x, y)
            })
    }

    pub fn assert_literal_results(&self, actual: Vec<LitRes>, expected: Vec<LitRes>) {
        if perm_eq(&actual, &expected, |a, b| self.lit_res_eq(a, b)) {
            return;
        }
        let show = |r: &LitRes| {
            let cons: Vec<String> = r
                .constraints
                .iter()
                .map(|c| c.display(&self.sig, &self.store))
                .collect();
            format!(
                "{{ querySigma = {}, resultSigma = {}, cons = [{}] }}",
                r.query_sigma.display(&self.sig, &self.store),
                r.result_sigma.display(&self.sig, &self.store),
                cons.join(", ")
            )
        };
        let is: Vec<String> = actual.iter().map(show).collect();
        let want: Vec<String> = expected.iter().map(show).collect();
        panic!(
            "literal result mismatch\n  is:\n    {}\n  expected:\n    {}",
            is.join("\n    "),
            want.join("\n    ")
        );
    }

    /// Direct unifier entry point in the shape the original exposes: both
    /// terms read under the same bank.
    pub fn rob_unify(
        &mut self,
        uwa: UnificationWithAbstraction,
        fixed_point: bool,
        lhs: TermId,
        rhs: TermId,
    ) -> Option<UnifRes> {
        let mut au = AbstractingUnifier::unify_terms(
            lhs,
            VarBank::QUERY,
            rhs,
            VarBank::QUERY,
            MismatchHandler::new(uwa),
            fixed_point,
            &self.sig,
            &mut self.store,
        )?;
        let query_sigma = au
            .subs_mut()
            .apply(&self.sig, &mut self.store, lhs, VarBank::QUERY);
        let result_sigma = au
            .subs_mut()
            .apply(&self.sig, &mut self.store, rhs, VarBank::QUERY);
        let constraints = au.constraint_literals(&self.sig, &mut self.store);
        Some(UnifRes {
            query_sigma,
            result_sigma,
            constraints,
        })
    }
}

/// A literal-retrieval outcome, fully applied.
#[allow(dead_code)]
#[derive(Debug, Clone)]
pub struct LitRes {
    pub query_sigma: Literal,
    pub result_sigma: Literal,
    pub constraints: Vec<Literal>,
}

#[allow(dead_code)]
pub fn lit_res(query_sigma: Literal, result_sigma: Literal, constraints: Vec<Literal>) -> LitRes {
    LitRes {
        query_sigma,
        result_sigma,
        constraints,
    }
}

#[allow(dead_code)]
fn apply_literal(
    unifier: &mut AbstractingUnifier,
    sig: &Signature,
    store: &mut TermStore,
    lit: &Literal,
    bank: VarBank,
) -> Literal {
    let args: Vec<TermId> = lit
        .args
        .iter()
        .map(|&a| unifier.subs_mut().apply(sig, store, a, bank))
        .collect();
    Literal {
        predicate: lit.predicate,
        polarity: lit.polarity,
        args,
    }
}
