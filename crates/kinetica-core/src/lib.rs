//! Symbolic multibody kinematics and dynamics.
//!
//! A [`System`] owns a symbol registry and a graph of bases, points, frames
//! and solids. Everything it derives (rotation matrices, velocities,
//! wrenches) is an exact symbolic [`Expr`] over the registered symbols, ready
//! to be compiled into a numeric function.

pub mod error;
pub mod expr;
pub mod geometry;
pub mod globals;
pub mod kinematics;
pub mod matrix;
pub mod operand;
pub mod symbol;
pub mod system;

pub use error::{EntityKind, Error, Result};
pub use expr::{Expr, Func, Node};
pub use geometry::{
    Base, BaseId, Drawing3D, DrawingKind, EntityGraph, Frame, FrameId, IntoComponents, Point,
    PointId, Ref, Solid, SolidId, Tensor3D, Vector3D, Wrench3D, WrenchKind,
};
pub use globals::{
    GravityDirection, atomization_state, gravity_direction, set_atomization_state,
    set_gravity_direction,
};
pub use matrix::Matrix;
pub use operand::{BinaryOp, Operand, OperandKind, Target};
pub use symbol::{CoordinateSpec, Symbol, SymbolKind, SymbolRegistry, SystemId, ValueTable};
pub use system::{DEFAULT_GRAVITY, System};
