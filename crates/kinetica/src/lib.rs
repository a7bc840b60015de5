//! Symbolic multibody kinematics and dynamics with compiled numeric
//! evaluators.
//!
//! Build a [`System`] of coordinates, bases, points and solids, derive
//! velocities and wrenches symbolically, then compile the result into an
//! [`Evaluator`]:
//!
//! ```no_run
//! use kinetica::{CompileOptions, System, compiler};
//!
//! let mut sys = System::new();
//! let [q, ..] = sys.new_coordinate("q", 0.3)?;
//! let l = sys.new_parameter("l", 1.0)?;
//! sys.new_base("B", "xyz", [0.0, 0.0, 1.0], &q)?;
//! sys.new_vector("OA", (&l, 0.0, 0.0), "B")?;
//! sys.new_point("A", "O", "OA")?;
//!
//! let v = sys.velocity_vector("A")?;
//! let f = compiler::compile_numeric_function(&sys, v, CompileOptions::default())?;
//! println!("{:?}", f.evaluate()?);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! The [`default`] module keeps one process-wide system and mirrors the
//! `System` methods as free functions over it; those are re-exported here.

pub mod config;
pub mod default;
pub mod logging;

pub use config::Settings;
pub use default::*;
pub use kinetica_compile as compiler;
pub use kinetica_compile::{
    CompileError, CompileOptions, ComputationList, Evaluator, Kernel, NumericMatrix, Output,
};
pub use kinetica_core::{
    Base, BinaryOp, CoordinateSpec, DEFAULT_GRAVITY, Drawing3D, DrawingKind, EntityKind, Error,
    Expr, Frame, Func, GravityDirection, IntoComponents, Matrix, Operand, OperandKind, Point, Ref,
    Result, Solid, Symbol, SymbolKind, System, Target, Tensor3D, ValueTable, Vector3D, Wrench3D,
    WrenchKind,
};
