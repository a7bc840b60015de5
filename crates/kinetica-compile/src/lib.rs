//! Numeric function compiler.
//!
//! [`compile_numeric_function`] lowers the expressions of an operand into one
//! [`ComputationList`] and wraps it in an [`Evaluator`]. The list is executed
//! either by the [`Interpreter`] or by a [`NativeKernel`], a wasm module run
//! by wasmtime. Both backends execute the same list, so they agree bit for
//! bit on the same inputs.

pub mod computation;
pub mod evaluator;
pub mod interp;
pub mod native;

pub use computation::{ComputationList, Op, Slot};
pub use evaluator::{Evaluator, NumericMatrix, Output};
pub use interp::Interpreter;
pub use native::NativeKernel;

use kinetica_core::{Error, Operand, System, globals};
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum CompileError {
    #[error(transparent)]
    Core(#[from] Error),

    /// Failure while emitting or instantiating the native kernel.
    #[error(transparent)]
    Codegen(#[from] anyhow::Error),
}

pub type Result<T, E = CompileError> = std::result::Result<T, E>;

/// How an operand is compiled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompileOptions {
    /// Share equal subexpressions between slots.
    pub atomize: bool,
    /// Run the list as a wasm kernel instead of interpreting it.
    pub native: bool,
}

impl Default for CompileOptions {
    fn default() -> Self {
        Self {
            atomize: globals::atomization_state(),
            native: false,
        }
    }
}

impl CompileOptions {
    pub fn with_atomize(mut self, atomize: bool) -> Self {
        self.atomize = atomize;
        self
    }

    pub fn with_native(mut self, native: bool) -> Self {
        self.native = native;
        self
    }
}

/// A backend able to execute a [`ComputationList`].
pub trait Kernel: Send + Sync {
    fn name(&self) -> &'static str;

    /// Evaluates the list with `inputs` in the order of
    /// [`ComputationList::inputs`], writing one value per target.
    fn run(&self, inputs: &[f64], outputs: &mut [f64]) -> Result<()>;
}

/// Compiles `target` into an evaluator reading the values of `system`.
///
/// Fails with [`Error::ForeignSymbol`] if `target` mentions a symbol that
/// `system` did not create.
pub fn compile_numeric_function(
    system: &System,
    target: impl Into<Operand>,
    options: CompileOptions,
) -> Result<Evaluator> {
    let target = target.into();
    let exprs = target.exprs();
    let registry = system.registry();
    for symbol in exprs.iter().flat_map(|e| e.symbols()) {
        if !registry.contains(&symbol) {
            return Err(Error::ForeignSymbol {
                name: symbol.name().to_string(),
            }
            .into());
        }
    }

    let shape = match &target {
        Operand::Matrix(m) => Some(m.shape()),
        Operand::Vector(_) => Some((3, 1)),
        Operand::Tensor(_) => Some((3, 3)),
        Operand::Wrench(_) => Some((6, 1)),
        Operand::Number(_) | Operand::Symbol(_) | Operand::Expr(_) => None,
    };

    let list = Arc::new(ComputationList::build(&exprs, options.atomize));
    debug!(
        slots = list.len(),
        inputs = list.inputs().len(),
        shared = list.shared(),
        atomize = options.atomize,
        native = options.native,
        "computation list built"
    );

    let kernel: Box<dyn Kernel> = if options.native {
        Box::new(NativeKernel::new(&list)?)
    } else {
        Box::new(Interpreter::new(list.clone()))
    };
    Ok(Evaluator::new(list, kernel, system.values().clone(), shape))
}

#[cfg(test)]
mod tests {
    use super::*;
    use kinetica_core::{Expr, Matrix};

    #[test]
    fn options_default_to_the_global_atomization_state() {
        let options = CompileOptions::default();
        assert_eq!(options.atomize, globals::atomization_state());
        assert!(!options.native);
        let options = options.with_atomize(false).with_native(true);
        assert_eq!(
            options,
            CompileOptions {
                atomize: false,
                native: true
            }
        );
    }

    #[test]
    fn foreign_symbols_are_rejected() {
        let sys = System::new();
        let mut other = System::new();
        let x = other.new_parameter("x", 1.0).unwrap();
        let err = compile_numeric_function(&sys, Expr::from(&x) + 1.0, CompileOptions::default())
            .unwrap_err();
        assert!(matches!(
            err,
            CompileError::Core(Error::ForeignSymbol { ref name }) if name == "x"
        ));
    }

    #[test]
    fn output_shape_follows_the_operand() {
        let mut sys = System::new();
        let a = Expr::from(sys.new_parameter("a", 2.0).unwrap());
        let m = Matrix::from_rows([[a.clone(), Expr::one()], [a.pow(2.0), Expr::zero()]]).unwrap();
        let f = compile_numeric_function(&sys, m, CompileOptions::default()).unwrap();
        let Output::Matrix(out) = f.evaluate().unwrap() else {
            panic!("matrix output expected");
        };
        assert_eq!((out.rows(), out.cols()), (2, 2));
        assert_eq!(out[(1, 0)], 4.0);

        let s = compile_numeric_function(&sys, &a * 3.0, CompileOptions::default()).unwrap();
        assert_eq!(s.evaluate().unwrap(), Output::Scalar(6.0));
    }
}
