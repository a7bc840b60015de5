// Mixed-kind arithmetic: one tagged operand type and a dispatch table per
// operator. Anything not in the table is `Error::Unsupported`.

use crate::{
    error::{Error, Result},
    expr::Expr,
    geometry::{Tensor3D, Vector3D, Wrench3D},
    matrix::Matrix,
    symbol::Symbol,
    system::System,
};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperandKind {
    Number,
    Symbol,
    Expr,
    Matrix,
    Vector,
    Tensor,
    Wrench,
}

impl OperandKind {
    pub const fn as_str(&self) -> &'static str {
        match self {
            OperandKind::Number => "number",
            OperandKind::Symbol => "symbol",
            OperandKind::Expr => "expression",
            OperandKind::Matrix => "matrix",
            OperandKind::Vector => "vector",
            OperandKind::Tensor => "tensor",
            OperandKind::Wrench => "wrench",
        }
    }
}

impl fmt::Display for OperandKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Pow,
}

impl fmt::Display for BinaryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Pow => "^",
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    Number(f64),
    Symbol(Symbol),
    Expr(Expr),
    Matrix(Matrix),
    Vector(Vector3D),
    Tensor(Tensor3D),
    Wrench(Wrench3D),
}

impl Operand {
    pub fn kind(&self) -> OperandKind {
        match self {
            Operand::Number(_) => OperandKind::Number,
            Operand::Symbol(_) => OperandKind::Symbol,
            Operand::Expr(_) => OperandKind::Expr,
            Operand::Matrix(_) => OperandKind::Matrix,
            Operand::Vector(_) => OperandKind::Vector,
            Operand::Tensor(_) => OperandKind::Tensor,
            Operand::Wrench(_) => OperandKind::Wrench,
        }
    }

    /// Numbers, symbols and expressions as an expression.
    pub fn as_scalar(&self) -> Option<Expr> {
        match self {
            Operand::Number(n) => Some(Expr::number(*n)),
            Operand::Symbol(s) => Some(Expr::symbol(s)),
            Operand::Expr(e) => Some(e.clone()),
            _ => None,
        }
    }

    /// The numeric value of a number, or of an expression that folded to one.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Operand::Number(n) => Some(*n),
            Operand::Expr(e) => e.as_number(),
            _ => None,
        }
    }

    fn mismatch(&self, context: &'static str, expected: &'static str) -> Error {
        Error::TypeMismatch {
            context,
            expected,
            found: self.kind().as_str(),
        }
    }

    pub fn into_expr(self) -> Result<Expr> {
        self.as_scalar()
            .ok_or_else(|| self.mismatch("into_expr", "scalar"))
    }

    pub fn into_matrix(self) -> Result<Matrix> {
        match self {
            Operand::Matrix(m) => Ok(m),
            other => Err(other.mismatch("into_matrix", "matrix")),
        }
    }

    pub fn into_vector(self) -> Result<Vector3D> {
        match self {
            Operand::Vector(v) => Ok(v),
            other => Err(other.mismatch("into_vector", "vector")),
        }
    }

    pub fn into_tensor(self) -> Result<Tensor3D> {
        match self {
            Operand::Tensor(t) => Ok(t),
            other => Err(other.mismatch("into_tensor", "tensor")),
        }
    }

    pub fn into_wrench(self) -> Result<Wrench3D> {
        match self {
            Operand::Wrench(w) => Ok(w),
            other => Err(other.mismatch("into_wrench", "wrench")),
        }
    }

    /// Applies `f` to every scalar inside the operand, keeping its kind.
    pub fn map_exprs(&self, mut f: impl FnMut(&Expr) -> Expr) -> Operand {
        match self {
            Operand::Number(_) | Operand::Symbol(_) | Operand::Expr(_) => {
                let e = self.as_scalar().unwrap_or_else(Expr::zero);
                Operand::Expr(f(&e))
            }
            Operand::Matrix(m) => Operand::Matrix(m.map(f)),
            Operand::Vector(v) => Operand::Vector(v.map(f)),
            Operand::Tensor(t) => Operand::Tensor(t.map(f)),
            Operand::Wrench(w) => Operand::Wrench(w.map(f)),
        }
    }

    /// Every scalar inside the operand, in storage order.
    pub fn exprs(&self) -> Vec<Expr> {
        match self {
            Operand::Number(_) | Operand::Symbol(_) | Operand::Expr(_) => {
                self.as_scalar().into_iter().collect()
            }
            Operand::Matrix(m) => m.as_slice().to_vec(),
            Operand::Vector(v) => v.components().to_vec(),
            Operand::Tensor(t) => t.matrix().as_slice().to_vec(),
            Operand::Wrench(w) => w
                .force()
                .components()
                .iter()
                .chain(w.moment().components())
                .cloned()
                .collect(),
        }
    }
}

impl fmt::Display for Operand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operand::Number(n) => crate::expr::write_number(f, *n),
            Operand::Symbol(s) => write!(f, "{s}"),
            Operand::Expr(e) => write!(f, "{e}"),
            Operand::Matrix(m) => write!(f, "{m}"),
            Operand::Vector(v) => write!(f, "{v}"),
            Operand::Tensor(t) => write!(f, "{t}"),
            Operand::Wrench(w) => write!(f, "{w}"),
        }
    }
}

macro_rules! operand_from {
    ($($ty:ty => $variant:ident),* $(,)?) => {$(
        impl From<$ty> for Operand {
            fn from(value: $ty) -> Self {
                Operand::$variant(value)
            }
        }

        impl From<&$ty> for Operand {
            fn from(value: &$ty) -> Self {
                Operand::$variant(value.clone())
            }
        }
    )*};
}

operand_from!(
    f64 => Number,
    Symbol => Symbol,
    Expr => Expr,
    Matrix => Matrix,
    Vector3D => Vector,
    Tensor3D => Tensor,
    Wrench3D => Wrench,
);

impl From<i32> for Operand {
    fn from(value: i32) -> Self {
        Operand::Number(f64::from(value))
    }
}

/// Argument naming a symbol: its name, its handle, or an expression that is
/// exactly one symbol. Other kinds are carried along only to report them.
#[derive(Debug, Clone)]
pub enum Target {
    Name(String),
    Symbol(Symbol),
    Other(Operand),
}

impl From<&str> for Target {
    fn from(name: &str) -> Self {
        Target::Name(name.to_string())
    }
}

impl From<String> for Target {
    fn from(name: String) -> Self {
        Target::Name(name)
    }
}

impl From<&String> for Target {
    fn from(name: &String) -> Self {
        Target::Name(name.clone())
    }
}

impl From<Symbol> for Target {
    fn from(symbol: Symbol) -> Self {
        Target::Symbol(symbol)
    }
}

impl From<&Symbol> for Target {
    fn from(symbol: &Symbol) -> Self {
        Target::Symbol(symbol.clone())
    }
}

impl From<Operand> for Target {
    fn from(operand: Operand) -> Self {
        match operand {
            Operand::Symbol(s) => Target::Symbol(s),
            Operand::Expr(e) => match e.as_symbol() {
                Some(s) => Target::Symbol(s.clone()),
                None => Target::Other(Operand::Expr(e)),
            },
            other => Target::Other(other),
        }
    }
}

macro_rules! target_from_operand {
    ($($ty:ty),*) => {$(
        impl From<$ty> for Target {
            fn from(value: $ty) -> Self {
                Target::from(Operand::from(value))
            }
        }
    )*};
}

target_from_operand!(
    f64, i32, Expr, &Expr, Matrix, &Matrix, Vector3D, &Vector3D, Tensor3D, &Tensor3D, Wrench3D,
    &Wrench3D
);

impl System {
    pub fn add(&self, lhs: impl Into<Operand>, rhs: impl Into<Operand>) -> Result<Operand> {
        self.binary(BinaryOp::Add, lhs.into(), rhs.into())
    }

    pub fn sub(&self, lhs: impl Into<Operand>, rhs: impl Into<Operand>) -> Result<Operand> {
        self.binary(BinaryOp::Sub, lhs.into(), rhs.into())
    }

    pub fn mul(&self, lhs: impl Into<Operand>, rhs: impl Into<Operand>) -> Result<Operand> {
        self.binary(BinaryOp::Mul, lhs.into(), rhs.into())
    }

    pub fn div(&self, lhs: impl Into<Operand>, rhs: impl Into<Operand>) -> Result<Operand> {
        self.binary(BinaryOp::Div, lhs.into(), rhs.into())
    }

    pub fn pow(&self, lhs: impl Into<Operand>, rhs: impl Into<Operand>) -> Result<Operand> {
        self.binary(BinaryOp::Pow, lhs.into(), rhs.into())
    }

    pub fn neg(&self, operand: impl Into<Operand>) -> Operand {
        operand.into().map_exprs(|e| -e)
    }

    pub fn binary(&self, op: BinaryOp, lhs: Operand, rhs: Operand) -> Result<Operand> {
        use Operand as O;

        if let (Some(a), Some(b)) = (lhs.as_scalar(), rhs.as_scalar()) {
            return Ok(O::Expr(match op {
                BinaryOp::Add => a + b,
                BinaryOp::Sub => a - b,
                BinaryOp::Mul => a * b,
                BinaryOp::Div => a / b,
                BinaryOp::Pow => a.pow(b),
            }));
        }

        let result = match (op, &lhs, &rhs) {
            (BinaryOp::Add, O::Matrix(a), O::Matrix(b)) => O::Matrix(a.try_add(b)?),
            (BinaryOp::Sub, O::Matrix(a), O::Matrix(b)) => O::Matrix(a.try_sub(b)?),
            (BinaryOp::Mul, O::Matrix(a), O::Matrix(b)) => O::Matrix(a.try_mul(b)?),

            (BinaryOp::Add, O::Vector(a), O::Vector(b)) => {
                O::Vector(a.zip(&self.in_base(b, a.base())?, |x, y| x + y))
            }
            (BinaryOp::Sub, O::Vector(a), O::Vector(b)) => {
                O::Vector(a.zip(&self.in_base(b, a.base())?, |x, y| x - y))
            }
            (BinaryOp::Mul, O::Vector(a), O::Vector(b)) => O::Expr(self.dot(a, b)?),

            (BinaryOp::Add, O::Tensor(a), O::Tensor(b)) => {
                O::Tensor(a.zip(&self.tensor_in_base(b, a.base())?, |x, y| x + y))
            }
            (BinaryOp::Sub, O::Tensor(a), O::Tensor(b)) => {
                O::Tensor(a.zip(&self.tensor_in_base(b, a.base())?, |x, y| x - y))
            }
            (BinaryOp::Mul, O::Tensor(a), O::Tensor(b)) => {
                O::Tensor(a.compose_components(&self.tensor_in_base(b, a.base())?))
            }
            (BinaryOp::Mul, O::Tensor(a), O::Vector(b)) => {
                O::Vector(a.apply_components(&self.in_base(b, a.base())?))
            }

            (BinaryOp::Add, O::Wrench(a), O::Wrench(b)) => O::Wrench(self.wrench_sum(a, b)?),
            (BinaryOp::Sub, O::Wrench(a), O::Wrench(b)) => O::Wrench(self.wrench_sum(a, &-b)?),
            (BinaryOp::Mul, O::Wrench(a), O::Wrench(b)) => O::Expr(self.wrench_product(a, b)?),

            (BinaryOp::Mul, _, _) => match (lhs.as_scalar(), rhs.as_scalar()) {
                (Some(k), None) => scaled(&rhs, &k).ok_or_else(|| unsupported(op, &lhs, &rhs))?,
                (None, Some(k)) => scaled(&lhs, &k).ok_or_else(|| unsupported(op, &lhs, &rhs))?,
                _ => return Err(unsupported(op, &lhs, &rhs)),
            },
            (BinaryOp::Div, _, _) => match rhs.as_scalar() {
                Some(k) => {
                    scaled(&lhs, &(Expr::one() / k)).ok_or_else(|| unsupported(op, &lhs, &rhs))?
                }
                None => return Err(unsupported(op, &lhs, &rhs)),
            },
            _ => return Err(unsupported(op, &lhs, &rhs)),
        };
        Ok(result)
    }
}

fn unsupported(op: BinaryOp, lhs: &Operand, rhs: &Operand) -> Error {
    Error::Unsupported {
        op,
        lhs: lhs.kind(),
        rhs: rhs.kind(),
    }
}

fn scaled(operand: &Operand, k: &Expr) -> Option<Operand> {
    match operand {
        Operand::Matrix(m) => Some(Operand::Matrix(m.scale(k))),
        Operand::Vector(v) => Some(Operand::Vector(v.scale(k))),
        Operand::Tensor(t) => Some(Operand::Tensor(t.scale(k))),
        Operand::Wrench(w) => Some(Operand::Wrench(w.scale(k))),
        _ => None,
    }
}
