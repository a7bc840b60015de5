//! Straight-line computation lists shared by every evaluation backend.
//!
//! Each [`Op`] writes one slot and reads only earlier slots, so executing the
//! list front to back evaluates every target. With atomization on, equal
//! subexpressions (equality of the canonical form, so `a*b` and `b*a` match)
//! are lowered once and their slot is reused.

use kinetica_core::{Expr, Func, Node, Symbol};
use rustc_hash::FxHashMap;

pub type Slot = usize;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Op {
    Const(f64),
    /// Reads input `k` (see [`ComputationList::inputs`]).
    Input(usize),
    Add(Slot, Slot),
    Sub(Slot, Slot),
    Mul(Slot, Slot),
    Div(Slot, Slot),
    Pow(Slot, Slot),
    Neg(Slot),
    Sqrt(Slot),
    Call(Func, Slot),
}

/// `a^b` as computed by every backend.
pub fn powf(a: f64, b: f64) -> f64 {
    a.powf(b)
}

impl Op {
    /// Value of this op given the already computed `slots`.
    pub fn apply(&self, slots: &[f64], inputs: &[f64]) -> f64 {
        match *self {
            Op::Const(n) => n,
            Op::Input(k) => inputs[k],
            Op::Add(a, b) => slots[a] + slots[b],
            Op::Sub(a, b) => slots[a] - slots[b],
            Op::Mul(a, b) => slots[a] * slots[b],
            Op::Div(a, b) => slots[a] / slots[b],
            Op::Pow(a, b) => powf(slots[a], slots[b]),
            Op::Neg(a) => -slots[a],
            Op::Sqrt(a) => slots[a].sqrt(),
            Op::Call(func, a) => func.apply(slots[a]),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ComputationList {
    ops: Vec<Op>,
    inputs: Vec<Symbol>,
    targets: Vec<Slot>,
    shared: usize,
}

impl ComputationList {
    pub fn build(targets: &[Expr], atomize: bool) -> Self {
        let mut builder = Builder {
            ops: Vec::new(),
            inputs: Vec::new(),
            input_index: FxHashMap::default(),
            memo: atomize.then(FxHashMap::default),
            shared: 0,
        };
        let targets = targets.iter().map(|t| builder.lower(t)).collect();
        Self {
            ops: builder.ops,
            inputs: builder.inputs,
            targets,
            shared: builder.shared,
        }
    }

    pub fn ops(&self) -> &[Op] {
        &self.ops
    }

    /// Symbols read by the list, in order of first use.
    pub fn inputs(&self) -> &[Symbol] {
        &self.inputs
    }

    pub fn targets(&self) -> &[Slot] {
        &self.targets
    }

    pub fn len(&self) -> usize {
        self.ops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    /// Number of subexpression lookups answered by an existing slot.
    pub fn shared(&self) -> usize {
        self.shared
    }

    /// Rebuilds the target expressions from the slots.
    pub fn unatomize(&self) -> Vec<Expr> {
        let mut exprs: Vec<Expr> = Vec::with_capacity(self.ops.len());
        for op in &self.ops {
            let e = match *op {
                Op::Const(n) => Expr::number(n),
                Op::Input(k) => Expr::symbol(&self.inputs[k]),
                Op::Add(a, b) => &exprs[a] + &exprs[b],
                Op::Sub(a, b) => &exprs[a] - &exprs[b],
                Op::Mul(a, b) => &exprs[a] * &exprs[b],
                Op::Div(a, b) => &exprs[a] / &exprs[b],
                Op::Pow(a, b) => exprs[a].pow(&exprs[b]),
                Op::Neg(a) => -&exprs[a],
                Op::Sqrt(a) => exprs[a].sqrt(),
                Op::Call(func, a) => Expr::call(func, &exprs[a]),
            };
            exprs.push(e);
        }
        self.targets.iter().map(|t| exprs[*t].clone()).collect()
    }
}

struct Builder {
    ops: Vec<Op>,
    inputs: Vec<Symbol>,
    input_index: FxHashMap<Symbol, usize>,
    memo: Option<FxHashMap<Expr, Slot>>,
    shared: usize,
}

impl Builder {
    fn push(&mut self, op: Op) -> Slot {
        self.ops.push(op);
        self.ops.len() - 1
    }

    fn input(&mut self, symbol: &Symbol) -> usize {
        if let Some(k) = self.input_index.get(symbol) {
            return *k;
        }
        let k = self.inputs.len();
        self.inputs.push(symbol.clone());
        self.input_index.insert(symbol.clone(), k);
        k
    }

    fn lower(&mut self, e: &Expr) -> Slot {
        if let Some(memo) = &self.memo
            && let Some(slot) = memo.get(e)
        {
            self.shared += 1;
            return *slot;
        }
        let slot = self.lower_node(e);
        if let Some(memo) = &mut self.memo {
            memo.insert(e.clone(), slot);
        }
        slot
    }

    fn lower_node(&mut self, e: &Expr) -> Slot {
        match e.node() {
            Node::Number(n) => self.push(Op::Const(*n)),
            Node::Symbol(s) => {
                let k = self.input(s);
                self.push(Op::Input(k))
            }
            Node::Add(terms) => self.lower_sum(terms),
            Node::Mul(factors) => self.lower_product(factors),
            Node::Pow(base, exp) => self.lower_pow(base, exp),
            Node::Call(Func::Sqrt, arg) => {
                let a = self.lower(arg);
                self.push(Op::Sqrt(a))
            }
            Node::Call(func, arg) => {
                let a = self.lower(arg);
                self.push(Op::Call(*func, a))
            }
        }
    }

    fn lower_sum(&mut self, terms: &[Expr]) -> Slot {
        let mut acc = None;
        for term in terms {
            let (negative, magnitude) = split_sign(term);
            let slot = self.lower(&magnitude);
            acc = Some(match (acc, negative) {
                (None, false) => slot,
                (None, true) => self.push(Op::Neg(slot)),
                (Some(a), false) => self.push(Op::Add(a, slot)),
                (Some(a), true) => self.push(Op::Sub(a, slot)),
            });
        }
        match acc {
            Some(slot) => slot,
            None => self.push(Op::Const(0.0)),
        }
    }

    fn lower_product(&mut self, factors: &[Expr]) -> Slot {
        let mut negate = false;
        let mut numerator = Vec::new();
        let mut denominator = Vec::new();
        for factor in factors {
            match factor.node() {
                Node::Number(c) if *c == -1.0 => negate = true,
                Node::Pow(base, exp) => match exp.as_number() {
                    Some(k) if k < 0.0 => denominator.push(base.pow(-k)),
                    _ => numerator.push(factor.clone()),
                },
                _ => numerator.push(factor.clone()),
            }
        }

        let num = self.product_of(&numerator);
        let value = if denominator.is_empty() {
            num
        } else {
            let den = self.product_of(&denominator);
            self.push(Op::Div(num, den))
        };
        if negate {
            self.push(Op::Neg(value))
        } else {
            value
        }
    }

    fn product_of(&mut self, factors: &[Expr]) -> Slot {
        let mut acc = None;
        for factor in factors {
            let slot = self.lower(factor);
            acc = Some(match acc {
                None => slot,
                Some(a) => self.push(Op::Mul(a, slot)),
            });
        }
        match acc {
            Some(slot) => slot,
            None => self.push(Op::Const(1.0)),
        }
    }

    fn lower_pow(&mut self, base: &Expr, exp: &Expr) -> Slot {
        match exp.as_number() {
            Some(k) if k == 2.0 => {
                let b = self.lower(base);
                self.push(Op::Mul(b, b))
            }
            Some(k) if k == 0.5 => {
                let b = self.lower(base);
                self.push(Op::Sqrt(b))
            }
            Some(k) if k < 0.0 => {
                let den = self.lower(&base.pow(-k));
                let one = self.push(Op::Const(1.0));
                self.push(Op::Div(one, den))
            }
            _ => {
                let b = self.lower(base);
                let e = self.lower(exp);
                self.push(Op::Pow(b, e))
            }
        }
    }
}

/// Splits a leading negative coefficient off a sum term.
fn split_sign(term: &Expr) -> (bool, Expr) {
    match term.node() {
        Node::Number(n) if *n < 0.0 => (true, Expr::number(-n)),
        Node::Mul(factors) => match factors.first().and_then(Expr::as_number) {
            Some(c) if c < 0.0 => {
                let rest = Expr::mul_all(factors[1..].iter().cloned());
                (true, -c * rest)
            }
            _ => (false, term.clone()),
        },
        _ => (false, term.clone()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kinetica_core::System;

    fn run(list: &ComputationList, inputs: &[f64]) -> Vec<f64> {
        let mut slots = Vec::with_capacity(list.len());
        for op in list.ops() {
            let v = op.apply(&slots, inputs);
            slots.push(v);
        }
        list.targets().iter().map(|t| slots[*t]).collect()
    }

    #[test]
    fn repeated_subexpressions_share_slots() {
        let mut sys = System::new();
        let a = Expr::from(sys.new_parameter("a", 0.0).unwrap());
        let b = Expr::from(sys.new_parameter("b", 0.0).unwrap());
        let ab = &a * &b;
        let e = ab.sin() + (&b * &a).pow(2.0) + ab.cos();

        let shared = ComputationList::build(std::slice::from_ref(&e), true);
        let plain = ComputationList::build(std::slice::from_ref(&e), false);
        assert!(shared.len() < plain.len());
        assert!(shared.shared() >= 2);
        assert_eq!(plain.shared(), 0);
        assert_eq!(shared.inputs().len(), 2);

        let x = run(&shared, &[0.3, 1.7]);
        let y = run(&plain, &[0.3, 1.7]);
        assert_eq!(x, y);
    }

    #[test]
    fn negative_terms_and_powers_lower_to_sub_and_div() {
        let mut sys = System::new();
        let a = Expr::from(sys.new_parameter("a", 0.0).unwrap());
        let b = Expr::from(sys.new_parameter("b", 0.0).unwrap());
        let e = &a - 2.0 * &b / &a;
        let list = ComputationList::build(std::slice::from_ref(&e), true);
        assert!(list.ops().iter().any(|op| matches!(op, Op::Sub(..))));
        assert!(list.ops().iter().any(|op| matches!(op, Op::Div(..))));
        assert!(!list.ops().iter().any(|op| matches!(op, Op::Pow(..))));
        assert_eq!(run(&list, &[2.0, 3.0]), [2.0 - 2.0 * 3.0 / 2.0]);
    }

    #[test]
    fn unatomize_restores_the_targets() {
        let mut sys = System::new();
        let a = Expr::from(sys.new_parameter("a", 0.0).unwrap());
        let b = Expr::from(sys.new_parameter("b", 0.0).unwrap());
        let targets = [
            (&a * &b).sin() - &a,
            (&a * &b).sqrt() + 3.0,
            Expr::number(4.0),
        ];
        let list = ComputationList::build(&targets, true);
        assert_eq!(list.unatomize(), targets);
    }
}
