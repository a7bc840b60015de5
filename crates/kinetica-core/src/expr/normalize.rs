use super::{Expr, Func, Node};
use rustc_hash::FxHashMap;
use std::cmp::Ordering;

fn is_integer(n: f64) -> bool {
    n.is_finite() && n.fract() == 0.0
}

/// Splits `c*rest` into its numeric coefficient and the remaining factors.
fn split_coefficient(term: Expr) -> (f64, Expr) {
    if let Node::Mul(factors) = term.node()
        && let Some(c) = factors.first().and_then(Expr::as_number)
    {
        let rest = if factors.len() == 2 {
            factors[1].clone()
        } else {
            Expr::from_node(Node::Mul(factors[1..].to_vec()))
        };
        return (c, rest);
    }
    (1.0, term)
}

fn scale(rest: Expr, c: f64) -> Expr {
    if c == 1.0 {
        return rest;
    }
    let mut factors = vec![Expr::number(c)];
    match rest.node() {
        Node::Mul(inner) => factors.extend(inner.iter().cloned()),
        _ => factors.push(rest),
    }
    Expr::from_node(Node::Mul(factors))
}

pub(crate) fn add(terms: impl IntoIterator<Item = Expr>) -> Expr {
    let mut stack: Vec<Expr> = terms.into_iter().collect();
    let mut constant = 0.0;
    let mut coefficients: FxHashMap<Expr, f64> = FxHashMap::default();

    while let Some(term) = stack.pop() {
        match term.node() {
            Node::Number(n) => constant += n,
            Node::Add(inner) => stack.extend(inner.iter().cloned()),
            _ => {
                let (c, rest) = split_coefficient(term);
                *coefficients.entry(rest).or_insert(0.0) += c;
            }
        }
    }

    let mut grouped: Vec<(Expr, f64)> = coefficients
        .into_iter()
        .filter(|(_, c)| *c != 0.0)
        .collect();
    grouped.sort_by(|a, b| a.0.cmp(&b.0));

    let mut out = Vec::with_capacity(grouped.len() + 1);
    if constant != 0.0 {
        out.push(Expr::number(constant));
    }
    out.extend(grouped.into_iter().map(|(rest, c)| scale(rest, c)));

    match out.len() {
        0 => Expr::zero(),
        1 => out.swap_remove(0),
        _ => Expr::from_node(Node::Add(out)),
    }
}

fn split_power(e: &Expr) -> (&Expr, Option<&Expr>) {
    match e.node() {
        Node::Pow(base, exp) => (base, Some(exp)),
        _ => (e, None),
    }
}

// factors sort by base first so `x^2*y` reads the way it is written
fn factor_order(a: &Expr, b: &Expr) -> Ordering {
    let (base_a, exp_a) = split_power(a);
    let (base_b, exp_b) = split_power(b);
    base_a
        .cmp(base_b)
        .then_with(|| exp_a.cmp(&exp_b))
        .then_with(|| a.cmp(b))
}

pub(crate) fn mul(factors: impl IntoIterator<Item = Expr>) -> Expr {
    let mut stack: Vec<Expr> = factors.into_iter().collect();
    let mut coefficient = 1.0;
    let mut bases: Vec<Expr> = Vec::new();
    let mut exponents: FxHashMap<Expr, Vec<Expr>> = FxHashMap::default();

    while let Some(factor) = stack.pop() {
        let (base, exp) = match factor.node() {
            Node::Number(n) => {
                coefficient *= n;
                continue;
            }
            Node::Mul(inner) => {
                stack.extend(inner.iter().cloned());
                continue;
            }
            Node::Pow(base, exp) => (base.clone(), exp.clone()),
            _ => (factor.clone(), Expr::one()),
        };
        let slot = exponents.entry(base.clone()).or_insert_with(|| {
            bases.push(base);
            Vec::new()
        });
        slot.push(exp);
    }

    if coefficient == 0.0 {
        return Expr::zero();
    }

    let mut rest = Vec::with_capacity(bases.len());
    let mut expanded = false;
    for base in bases {
        let exp = add(exponents.remove(&base).unwrap_or_default());
        let power = pow(base, exp);
        match power.node() {
            Node::Number(n) => coefficient *= n,
            Node::Mul(inner) => {
                expanded = true;
                rest.extend(inner.iter().cloned());
            }
            _ => rest.push(power),
        }
    }

    // An expanded power may share bases with the other factors.
    if expanded {
        rest.push(Expr::number(coefficient));
        return mul(rest);
    }
    if coefficient == 0.0 {
        return Expr::zero();
    }
    rest.sort_by(factor_order);

    if rest.is_empty() {
        return Expr::number(coefficient);
    }
    if rest.len() == 1 {
        if coefficient == 1.0 {
            return rest.swap_remove(0);
        }
        if let Node::Add(terms) = rest[0].node() {
            let c = Expr::number(coefficient);
            return add(terms.iter().map(|t| mul([c.clone(), t.clone()])));
        }
    }
    if coefficient != 1.0 {
        rest.insert(0, Expr::number(coefficient));
    }
    Expr::from_node(Node::Mul(rest))
}

pub(crate) fn pow(base: Expr, exp: Expr) -> Expr {
    if let Some(e) = exp.as_number() {
        if e == 0.0 {
            return Expr::one();
        }
        if e == 1.0 {
            return base;
        }
        match base.node() {
            Node::Number(b) => {
                let folded = b.powf(e);
                if folded.is_finite() {
                    return Expr::number(folded);
                }
            }
            Node::Pow(inner, inner_exp) if is_integer(e) => {
                return pow(inner.clone(), mul([inner_exp.clone(), exp]));
            }
            Node::Mul(factors) if is_integer(e) => {
                return mul(factors.iter().map(|f| pow(f.clone(), exp.clone())));
            }
            // sqrt(a)^n = a^(n/2), with one sqrt(a) left over for odd n.
            Node::Call(Func::Sqrt, arg) if is_integer(e) => {
                let half = (e / 2.0).floor();
                let whole = pow(arg.clone(), Expr::number(half));
                return if half * 2.0 == e { whole } else { mul([whole, base.clone()]) };
            }
            _ => {}
        }
    }
    if base.is_one() {
        return Expr::one();
    }
    Expr::from_node(Node::Pow(base, exp))
}

pub(crate) fn call(func: Func, arg: Expr) -> Expr {
    if let Some(x) = arg.as_number() {
        let folded = func.apply(x);
        if folded.is_finite() {
            return Expr::number(folded);
        }
    }
    Expr::from_node(Node::Call(func, arg))
}
