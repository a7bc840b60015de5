use crate::operand::{BinaryOp, OperandKind};
use std::fmt;
use thiserror::Error;

/// Kind of named entity, used to qualify lookup and naming errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityKind {
    Symbol,
    Base,
    Point,
    Vector,
    Tensor,
    Matrix,
    Frame,
    Solid,
    Wrench,
    Drawing,
}

impl EntityKind {
    pub const fn as_str(&self) -> &'static str {
        match self {
            EntityKind::Symbol => "symbol",
            EntityKind::Base => "base",
            EntityKind::Point => "point",
            EntityKind::Vector => "vector",
            EntityKind::Tensor => "tensor",
            EntityKind::Matrix => "matrix",
            EntityKind::Frame => "frame",
            EntityKind::Solid => "solid",
            EntityKind::Wrench => "wrench",
            EntityKind::Drawing => "drawing",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum Error {
    #[error("no {kind} named '{name}'")]
    NameLookup { kind: EntityKind, name: String },

    #[error("a {kind} named '{name}' already exists")]
    DuplicateName { kind: EntityKind, name: String },

    #[error("'{name}' is not a valid identifier")]
    InvalidName { name: String },

    #[error("{context}: expected {expected}, found {found}")]
    TypeMismatch {
        context: &'static str,
        expected: &'static str,
        found: &'static str,
    },

    #[error("unsupported operation: {lhs} {op} {rhs}")]
    Unsupported {
        op: BinaryOp,
        lhs: OperandKind,
        rhs: OperandKind,
    },

    #[error("{op}: incompatible shapes {lhs:?} and {rhs:?}")]
    Shape {
        op: &'static str,
        lhs: (usize, usize),
        rhs: (usize, usize),
    },

    #[error("no path between {kind} '{from}' and {kind} '{to}'")]
    GraphConnectivity {
        kind: EntityKind,
        from: String,
        to: String,
    },

    #[error("evaluation failed: {0}")]
    Evaluation(String),

    #[error("symbol '{name}' belongs to another system")]
    ForeignSymbol { name: String },

    #[error("'{expr}' is not a bare symbol")]
    NotASymbol { expr: String },

    #[error("cannot combine a wrench on solid '{lhs}' with a wrench on solid '{rhs}'")]
    IncompatibleWrench { lhs: String, rhs: String },
}

impl Error {
    pub(crate) fn lookup(kind: EntityKind, name: impl Into<String>) -> Self {
        Error::NameLookup {
            kind,
            name: name.into(),
        }
    }

    pub(crate) fn duplicate(kind: EntityKind, name: impl Into<String>) -> Self {
        Error::DuplicateName {
            kind,
            name: name.into(),
        }
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
