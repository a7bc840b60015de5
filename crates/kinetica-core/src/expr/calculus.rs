use super::{Expr, Func, Node, add, call, mul, pow};
use crate::symbol::Symbol;

impl Expr {
    /// Partial derivative with respect to `var`.
    pub fn diff(&self, var: &Symbol) -> Expr {
        if !self.depends_on(var) {
            return Expr::zero();
        }
        match self.node() {
            Node::Number(_) => Expr::zero(),
            Node::Symbol(s) => {
                if s == var {
                    Expr::one()
                } else {
                    Expr::zero()
                }
            }
            Node::Add(terms) => add(terms.iter().map(|t| t.diff(var))),
            Node::Mul(factors) => add((0..factors.len()).map(|i| {
                let d = factors[i].diff(var);
                if d.is_zero() {
                    return d;
                }
                mul(factors
                    .iter()
                    .enumerate()
                    .map(|(j, f)| if i == j { d.clone() } else { f.clone() }))
            })),
            Node::Pow(base, exp) => {
                let db = base.diff(var);
                if !exp.depends_on(var) {
                    // e * b^(e-1) * b'
                    let lowered = pow(base.clone(), add([exp.clone(), Expr::number(-1.0)]));
                    return mul([exp.clone(), lowered, db]);
                }
                // b^e * (e' ln b + e b' / b)
                let de = exp.diff(var);
                let log_term = mul([de, call(Func::Ln, base.clone())]);
                let base_term = mul([exp.clone(), db, pow(base.clone(), Expr::number(-1.0))]);
                mul([self.clone(), add([log_term, base_term])])
            }
            Node::Call(func, arg) => {
                let du = arg.diff(var);
                mul([outer_derivative(*func, arg), du])
            }
        }
    }

    /// Total derivative `sum(de/ds * rate(s))` over the symbols of `self`.
    ///
    /// `rate` returns the time derivative of a symbol, or `None` for symbols
    /// that are constant in time.
    pub fn total_derivative<F>(&self, rate: F) -> Expr
    where
        F: Fn(&Symbol) -> Option<Expr>,
    {
        add(self.symbols().into_iter().filter_map(|s| {
            let r = rate(&s)?;
            (!r.is_zero()).then(|| mul([self.diff(&s), r]))
        }))
    }

    /// Rebuilds the tree, replacing every subtree for which `f` returns a
    /// value. Replaced subtrees are not visited again.
    pub fn replace<F>(&self, f: &mut F) -> Expr
    where
        F: FnMut(&Expr) -> Option<Expr>,
    {
        if let Some(new) = f(self) {
            return new;
        }
        match self.node() {
            Node::Number(_) | Node::Symbol(_) => self.clone(),
            Node::Add(terms) => add(terms.iter().map(|t| t.replace(f)).collect::<Vec<_>>()),
            Node::Mul(factors) => mul(factors.iter().map(|t| t.replace(f)).collect::<Vec<_>>()),
            Node::Pow(base, exp) => pow(base.replace(f), exp.replace(f)),
            Node::Call(func, arg) => call(*func, arg.replace(f)),
        }
    }

    /// Replaces every occurrence of `old` with `new`.
    pub fn subs(&self, old: &Expr, new: &Expr) -> Expr {
        self.replace(&mut |e| (e == old).then(|| new.clone()))
    }

    /// Simultaneous substitution of several pairs in one pass.
    pub fn subs_all(&self, pairs: &[(Expr, Expr)]) -> Expr {
        self.replace(&mut |e| {
            pairs
                .iter()
                .find(|(old, _)| old == e)
                .map(|(_, new)| new.clone())
        })
    }
}

fn outer_derivative(func: Func, u: &Expr) -> Expr {
    let one_minus_sq = || {
        let sq = pow(u.clone(), Expr::number(2.0));
        add([Expr::one(), mul([Expr::number(-1.0), sq])])
    };
    match func {
        Func::Sin => call(Func::Cos, u.clone()),
        Func::Cos => mul([Expr::number(-1.0), call(Func::Sin, u.clone())]),
        Func::Tan => add([Expr::one(), pow(call(Func::Tan, u.clone()), Expr::number(2.0))]),
        Func::Asin => pow(one_minus_sq(), Expr::number(-0.5)),
        Func::Acos => mul([Expr::number(-1.0), pow(one_minus_sq(), Expr::number(-0.5))]),
        Func::Atan => pow(
            add([Expr::one(), pow(u.clone(), Expr::number(2.0))]),
            Expr::number(-1.0),
        ),
        Func::Exp => call(Func::Exp, u.clone()),
        Func::Ln => pow(u.clone(), Expr::number(-1.0)),
        Func::Sqrt => mul([
            Expr::number(0.5),
            pow(call(Func::Sqrt, u.clone()), Expr::number(-1.0)),
        ]),
        Func::Abs => mul([u.clone(), pow(call(Func::Abs, u.clone()), Expr::number(-1.0))]),
    }
}

#[cfg(test)]
mod tests {
    use crate::expr::Expr;
    use crate::symbol::{Symbol, SymbolKind, SymbolRegistry, SystemId};

    fn registry() -> (SymbolRegistry, Symbol, Symbol) {
        let mut reg = SymbolRegistry::new(SystemId::next());
        let x = reg.new_symbol("x", SymbolKind::Parameter, 0.0).unwrap();
        let y = reg.new_symbol("y", SymbolKind::Parameter, 0.0).unwrap();
        (reg, x, y)
    }

    #[test]
    fn product_and_chain_rules() {
        let (_, x, y) = registry();
        let e = Expr::from(&x).sin() * &x;
        insta::assert_snapshot!(e.diff(&x).to_string(), @"sin(x) + x*cos(x)");
        assert!(e.diff(&y).is_zero());

        let p = Expr::from(&x).pow(3.0) * &y;
        assert_eq!(p.diff(&x), 3.0 * Expr::from(&x).pow(2.0) * &y);
        assert_eq!(p.diff(&y), Expr::from(&x).pow(3.0));
    }

    #[test]
    fn quotient_rule_matches_numerics() {
        let (_, x, y) = registry();
        let e = Expr::from(&x) / (Expr::from(&y) + &x);
        let d = e.diff(&x);
        let at = |s: &Symbol| Some(if *s == x { 2.0 } else { 3.0 });
        // y / (x + y)^2
        assert!((d.eval_with(&at).unwrap() - 3.0 / 25.0).abs() < 1e-12);
    }

    #[test]
    fn transcendental_derivatives_match_finite_differences() {
        let (_, x, _) = registry();
        let u = Expr::from(&x) * 0.3;
        let cases = [
            u.tan(),
            u.asin(),
            u.acos(),
            u.atan(),
            u.exp(),
            u.ln(),
            u.sqrt(),
            u.abs(),
            Expr::from(&x).pow(Expr::from(&x)),
        ];
        let x0 = 0.7;
        let h = 1e-6;
        for e in cases {
            let d = e.diff(&x).eval_with(&|_: &Symbol| Some(x0)).unwrap();
            let f = |v: f64| e.eval_with(&|_: &Symbol| Some(v)).unwrap();
            let fd = (f(x0 + h) - f(x0 - h)) / (2.0 * h);
            assert!((d - fd).abs() < 1e-5, "{e}: {d} vs {fd}");
        }
    }

    #[test]
    fn total_derivative_follows_rates() {
        let (mut reg, x, _) = registry();
        let [q, dq, ddq] = reg.new_coordinate("q", false, ().into()).unwrap();
        let e = Expr::from(&q).sin() * &x;
        let rate = |s: &Symbol| reg.derivative_of(s).map(Expr::from);
        let d = e.total_derivative(&rate);
        assert_eq!(d, Expr::from(&q).cos() * &dq * &x);
        let dd = Expr::from(&dq).total_derivative(rate);
        assert_eq!(dd, Expr::from(&ddq));
    }

    #[test]
    fn substitution() {
        let (_, x, y) = registry();
        let e = Expr::from(&x).sin() + &x * &y;
        let s = e.subs(&Expr::from(&x), &Expr::zero());
        assert!(s.is_zero());

        let swapped = e.subs_all(&[
            (Expr::from(&x), Expr::from(&y)),
            (Expr::from(&y), Expr::from(&x)),
        ]);
        assert_eq!(swapped, Expr::from(&y).sin() + &x * &y);
    }
}
