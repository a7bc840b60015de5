// Symbolic expressions: immutable, Arc-shared trees kept in a canonical form.
//
// Every constructor goes through `normalize`, so two expressions that only
// differ by operand order, nesting or trivially foldable constants compare
// equal (and hash equal). Calculus and substitution live in `calculus`.

mod calculus;
mod normalize;

use crate::{
    error::{Error, Result},
    symbol::Symbol,
};
use rustc_hash::FxHasher;
use std::{
    cmp::Ordering,
    fmt,
    hash::{Hash, Hasher},
    sync::Arc,
};

pub(crate) use normalize::{add, call, mul, pow};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Func {
    Sin,
    Cos,
    Tan,
    Asin,
    Acos,
    Atan,
    Exp,
    Ln,
    Sqrt,
    Abs,
}

impl Func {
    pub const ALL: [Func; 10] = [
        Func::Sin,
        Func::Cos,
        Func::Tan,
        Func::Asin,
        Func::Acos,
        Func::Atan,
        Func::Exp,
        Func::Ln,
        Func::Sqrt,
        Func::Abs,
    ];

    pub const fn name(&self) -> &'static str {
        match self {
            Func::Sin => "sin",
            Func::Cos => "cos",
            Func::Tan => "tan",
            Func::Asin => "asin",
            Func::Acos => "acos",
            Func::Atan => "atan",
            Func::Exp => "exp",
            Func::Ln => "ln",
            Func::Sqrt => "sqrt",
            Func::Abs => "abs",
        }
    }

    /// Numeric value of the function. Every evaluation backend calls this.
    pub fn apply(&self, x: f64) -> f64 {
        match self {
            Func::Sin => x.sin(),
            Func::Cos => x.cos(),
            Func::Tan => x.tan(),
            Func::Asin => x.asin(),
            Func::Acos => x.acos(),
            Func::Atan => x.atan(),
            Func::Exp => x.exp(),
            Func::Ln => x.ln(),
            Func::Sqrt => x.sqrt(),
            Func::Abs => x.abs(),
        }
    }
}

impl fmt::Display for Func {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug)]
pub enum Node {
    Number(f64),
    Symbol(Symbol),
    Add(Vec<Expr>),
    Mul(Vec<Expr>),
    Pow(Expr, Expr),
    Call(Func, Expr),
}

#[derive(Debug)]
struct Inner {
    node: Node,
    hash: u64,
}

#[derive(Clone)]
pub struct Expr(Arc<Inner>);

impl Expr {
    fn from_node(node: Node) -> Self {
        let mut h = FxHasher::default();
        match &node {
            Node::Number(n) => {
                0u8.hash(&mut h);
                n.to_bits().hash(&mut h);
            }
            Node::Symbol(s) => {
                1u8.hash(&mut h);
                s.hash(&mut h);
            }
            Node::Call(func, arg) => {
                2u8.hash(&mut h);
                func.hash(&mut h);
                arg.0.hash.hash(&mut h);
            }
            Node::Pow(base, exp) => {
                3u8.hash(&mut h);
                base.0.hash.hash(&mut h);
                exp.0.hash.hash(&mut h);
            }
            Node::Mul(factors) => {
                4u8.hash(&mut h);
                factors.iter().for_each(|e| e.0.hash.hash(&mut h));
            }
            Node::Add(terms) => {
                5u8.hash(&mut h);
                terms.iter().for_each(|e| e.0.hash.hash(&mut h));
            }
        }
        let hash = h.finish();
        Self(Arc::new(Inner { node, hash }))
    }

    pub fn number(value: f64) -> Self {
        // -0.0 and 0.0 must be the same leaf
        let value = if value == 0.0 { 0.0 } else { value };
        Self::from_node(Node::Number(value))
    }

    pub fn zero() -> Self {
        Self::number(0.0)
    }

    pub fn one() -> Self {
        Self::number(1.0)
    }

    pub fn symbol(symbol: &Symbol) -> Self {
        Self::from_node(Node::Symbol(symbol.clone()))
    }

    pub fn node(&self) -> &Node {
        &self.0.node
    }

    pub fn as_number(&self) -> Option<f64> {
        match self.node() {
            Node::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_symbol(&self) -> Option<&Symbol> {
        match self.node() {
            Node::Symbol(s) => Some(s),
            _ => None,
        }
    }

    /// The single symbol this expression consists of, or `NotASymbol`.
    pub fn to_symbol(&self) -> Result<Symbol> {
        self.as_symbol().cloned().ok_or_else(|| Error::NotASymbol {
            expr: self.to_string(),
        })
    }

    pub fn is_zero(&self) -> bool {
        self.as_number() == Some(0.0)
    }

    pub fn is_one(&self) -> bool {
        self.as_number() == Some(1.0)
    }

    pub fn add_all(terms: impl IntoIterator<Item = Expr>) -> Expr {
        add(terms)
    }

    pub fn mul_all(factors: impl IntoIterator<Item = Expr>) -> Expr {
        mul(factors)
    }

    pub fn pow(&self, exp: impl Into<Expr>) -> Expr {
        pow(self.clone(), exp.into())
    }

    pub fn call(func: Func, arg: impl Into<Expr>) -> Expr {
        call(func, arg.into())
    }

    pub fn sin(&self) -> Expr {
        call(Func::Sin, self.clone())
    }

    pub fn cos(&self) -> Expr {
        call(Func::Cos, self.clone())
    }

    pub fn tan(&self) -> Expr {
        call(Func::Tan, self.clone())
    }

    pub fn asin(&self) -> Expr {
        call(Func::Asin, self.clone())
    }

    pub fn acos(&self) -> Expr {
        call(Func::Acos, self.clone())
    }

    pub fn atan(&self) -> Expr {
        call(Func::Atan, self.clone())
    }

    pub fn exp(&self) -> Expr {
        call(Func::Exp, self.clone())
    }

    pub fn ln(&self) -> Expr {
        call(Func::Ln, self.clone())
    }

    pub fn sqrt(&self) -> Expr {
        call(Func::Sqrt, self.clone())
    }

    pub fn abs(&self) -> Expr {
        call(Func::Abs, self.clone())
    }

    /// Direct children in canonical order.
    pub fn children(&self) -> Vec<&Expr> {
        match self.node() {
            Node::Number(_) | Node::Symbol(_) => Vec::new(),
            Node::Add(items) | Node::Mul(items) => items.iter().collect(),
            Node::Pow(base, exp) => vec![base, exp],
            Node::Call(_, arg) => vec![arg],
        }
    }

    /// Distinct symbols occurring in the expression, sorted by registry order.
    pub fn symbols(&self) -> Vec<Symbol> {
        let mut out = Vec::new();
        self.collect_symbols(&mut out);
        out.sort();
        out.dedup();
        out
    }

    fn collect_symbols(&self, out: &mut Vec<Symbol>) {
        match self.node() {
            Node::Symbol(s) => out.push(s.clone()),
            _ => self.children().into_iter().for_each(|c| c.collect_symbols(out)),
        }
    }

    /// True if `target` occurs as a subtree of `self`.
    pub fn has(&self, target: &Expr) -> bool {
        self == target || self.children().into_iter().any(|c| c.has(target))
    }

    pub fn depends_on(&self, symbol: &Symbol) -> bool {
        match self.node() {
            Node::Symbol(s) => s == symbol,
            _ => self.children().into_iter().any(|c| c.depends_on(symbol)),
        }
    }

    /// Evaluates with the given symbol values; fails if a symbol has none.
    pub fn eval_with<F>(&self, value_of: &F) -> Result<f64>
    where
        F: Fn(&Symbol) -> Option<f64>,
    {
        Ok(match self.node() {
            Node::Number(n) => *n,
            Node::Symbol(s) => value_of(s)
                .ok_or_else(|| Error::Evaluation(format!("symbol '{s}' has no value")))?,
            Node::Add(terms) => {
                let mut acc = 0.0;
                for t in terms {
                    acc += t.eval_with(value_of)?;
                }
                acc
            }
            Node::Mul(factors) => {
                let mut acc = 1.0;
                for f in factors {
                    acc *= f.eval_with(value_of)?;
                }
                acc
            }
            Node::Pow(base, exp) => base.eval_with(value_of)?.powf(exp.eval_with(value_of)?),
            Node::Call(func, arg) => func.apply(arg.eval_with(value_of)?),
        })
    }

    fn rank(&self) -> u8 {
        match self.node() {
            Node::Number(_) => 0,
            Node::Symbol(_) => 1,
            Node::Call(..) => 2,
            Node::Pow(..) => 3,
            Node::Mul(_) => 4,
            Node::Add(_) => 5,
        }
    }

    fn is_negative(&self) -> bool {
        match self.node() {
            Node::Number(n) => *n < 0.0,
            Node::Mul(factors) => factors.first().is_some_and(|f| f.is_negative()),
            _ => false,
        }
    }
}

impl PartialEq for Expr {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
            || (self.0.hash == other.0.hash && self.cmp(other) == Ordering::Equal)
    }
}

impl Eq for Expr {}

impl Hash for Expr {
    fn hash<H: Hasher>(&self, state: &mut H) {
        state.write_u64(self.0.hash);
    }
}

impl PartialOrd for Expr {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Canonical total order: numbers, symbols, calls, powers, products, sums.
impl Ord for Expr {
    fn cmp(&self, other: &Self) -> Ordering {
        if Arc::ptr_eq(&self.0, &other.0) {
            return Ordering::Equal;
        }
        match (self.node(), other.node()) {
            (Node::Number(a), Node::Number(b)) => a.total_cmp(b),
            (Node::Symbol(a), Node::Symbol(b)) => a.cmp(b),
            (Node::Call(f, a), Node::Call(g, b)) => f.cmp(g).then_with(|| a.cmp(b)),
            (Node::Pow(a, x), Node::Pow(b, y)) => a.cmp(b).then_with(|| x.cmp(y)),
            (Node::Mul(a), Node::Mul(b)) | (Node::Add(a), Node::Add(b)) => a.cmp(b),
            _ => self.rank().cmp(&other.rank()),
        }
    }
}

impl fmt::Debug for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Expr({self})")
    }
}

pub(crate) fn write_number(f: &mut fmt::Formatter<'_>, n: f64) -> fmt::Result {
    if n.is_finite() && n.fract() == 0.0 && n.abs() < 1e15 {
        write!(f, "{}", n as i64)
    } else if n.is_finite() {
        f.write_str(ryu::Buffer::new().format_finite(n))
    } else {
        write!(f, "{n}")
    }
}

fn write_grouped(f: &mut fmt::Formatter<'_>, e: &Expr, atomic: bool) -> fmt::Result {
    if atomic {
        write!(f, "{e}")
    } else {
        write!(f, "({e})")
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.node() {
            Node::Number(n) => write_number(f, *n),
            Node::Symbol(s) => write!(f, "{s}"),
            Node::Call(func, arg) => write!(f, "{func}({arg})"),
            Node::Pow(base, exp) => {
                let atomic = |e: &Expr| {
                    matches!(e.node(), Node::Symbol(_) | Node::Call(..))
                        || e.as_number().is_some_and(|n| n >= 0.0)
                };
                write_grouped(f, base, atomic(base))?;
                f.write_str("^")?;
                write_grouped(f, exp, atomic(exp))
            }
            Node::Mul(factors) => {
                let mut rest = factors.as_slice();
                if let Some(c) = factors.first().and_then(Expr::as_number) {
                    if c == -1.0 {
                        f.write_str("-")?;
                    } else {
                        write_number(f, c)?;
                        f.write_str("*")?;
                    }
                    rest = &factors[1..];
                }
                for (i, factor) in rest.iter().enumerate() {
                    if i > 0 {
                        f.write_str("*")?;
                    }
                    write_grouped(f, factor, !matches!(factor.node(), Node::Add(_)))?;
                }
                Ok(())
            }
            Node::Add(terms) => {
                for (i, term) in terms.iter().enumerate() {
                    if i == 0 {
                        write!(f, "{term}")?;
                    } else if term.is_negative() {
                        write!(f, " - {}", -term)?;
                    } else {
                        write!(f, " + {term}")?;
                    }
                }
                Ok(())
            }
        }
    }
}

impl From<f64> for Expr {
    fn from(value: f64) -> Self {
        Expr::number(value)
    }
}

impl From<i32> for Expr {
    fn from(value: i32) -> Self {
        Expr::number(f64::from(value))
    }
}

impl From<Symbol> for Expr {
    fn from(symbol: Symbol) -> Self {
        Expr::symbol(&symbol)
    }
}

impl From<&Symbol> for Expr {
    fn from(symbol: &Symbol) -> Self {
        Expr::symbol(symbol)
    }
}

impl From<&Expr> for Expr {
    fn from(expr: &Expr) -> Self {
        expr.clone()
    }
}

impl std::iter::Sum for Expr {
    fn sum<I: Iterator<Item = Expr>>(iter: I) -> Self {
        add(iter)
    }
}

impl std::iter::Product for Expr {
    fn product<I: Iterator<Item = Expr>>(iter: I) -> Self {
        mul(iter)
    }
}

macro_rules! scalar_ops {
    ($($lhs:ty),*) => {$(
        impl<R: Into<Expr>> std::ops::Add<R> for $lhs {
            type Output = Expr;
            fn add(self, rhs: R) -> Expr {
                add([Expr::from(self), rhs.into()])
            }
        }

        impl<R: Into<Expr>> std::ops::Sub<R> for $lhs {
            type Output = Expr;
            fn sub(self, rhs: R) -> Expr {
                let rhs: Expr = rhs.into();
                add([Expr::from(self), -rhs])
            }
        }

        impl<R: Into<Expr>> std::ops::Mul<R> for $lhs {
            type Output = Expr;
            fn mul(self, rhs: R) -> Expr {
                mul([Expr::from(self), rhs.into()])
            }
        }

        impl<R: Into<Expr>> std::ops::Div<R> for $lhs {
            type Output = Expr;
            fn div(self, rhs: R) -> Expr {
                mul([Expr::from(self), pow(rhs.into(), Expr::number(-1.0))])
            }
        }

        impl std::ops::Neg for $lhs {
            type Output = Expr;
            fn neg(self) -> Expr {
                mul([Expr::number(-1.0), Expr::from(self)])
            }
        }
    )*};
}

scalar_ops!(Expr, &Expr, Symbol, &Symbol);

macro_rules! number_lhs_ops {
    ($($rhs:ty),*) => {$(
        impl std::ops::Add<$rhs> for f64 {
            type Output = Expr;
            fn add(self, rhs: $rhs) -> Expr {
                Expr::number(self) + rhs
            }
        }

        impl std::ops::Sub<$rhs> for f64 {
            type Output = Expr;
            fn sub(self, rhs: $rhs) -> Expr {
                Expr::number(self) - rhs
            }
        }

        impl std::ops::Mul<$rhs> for f64 {
            type Output = Expr;
            fn mul(self, rhs: $rhs) -> Expr {
                Expr::number(self) * rhs
            }
        }

        impl std::ops::Div<$rhs> for f64 {
            type Output = Expr;
            fn div(self, rhs: $rhs) -> Expr {
                Expr::number(self) / rhs
            }
        }
    )*};
}

number_lhs_ops!(Expr, &Expr, Symbol, &Symbol);
