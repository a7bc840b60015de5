use crate::{ComputationList, Kernel, Result};
use kinetica_core::{Error, Expr, ValueTable};
use std::{fmt, ops::Index, sync::Arc};
use tracing::trace;

/// Row-major matrix of numbers.
#[derive(Debug, Clone, PartialEq)]
pub struct NumericMatrix {
    rows: usize,
    cols: usize,
    data: Vec<f64>,
}

impl NumericMatrix {
    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn data(&self) -> &[f64] {
        &self.data
    }

    pub fn get(&self, row: usize, col: usize) -> Option<f64> {
        if row < self.rows && col < self.cols {
            self.data.get(row * self.cols + col).copied()
        } else {
            None
        }
    }
}

impl Index<(usize, usize)> for NumericMatrix {
    type Output = f64;

    fn index(&self, (row, col): (usize, usize)) -> &f64 {
        assert!(row < self.rows && col < self.cols, "matrix index out of bounds");
        &self.data[row * self.cols + col]
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Output {
    Scalar(f64),
    Matrix(NumericMatrix),
}

impl Output {
    pub fn as_scalar(&self) -> Option<f64> {
        match self {
            Output::Scalar(v) => Some(*v),
            Output::Matrix(_) => None,
        }
    }

    /// Every value, row-major.
    pub fn values(&self) -> &[f64] {
        match self {
            Output::Scalar(v) => std::slice::from_ref(v),
            Output::Matrix(m) => m.data(),
        }
    }
}

/// A compiled numeric function.
///
/// Holds the value table of the system it was compiled from, so
/// [`evaluate`](Self::evaluate) always sees the latest `set_value`.
pub struct Evaluator {
    list: Arc<ComputationList>,
    kernel: Box<dyn Kernel>,
    values: ValueTable,
    shape: Option<(usize, usize)>,
}

impl fmt::Debug for Evaluator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Evaluator")
            .field("backend", &self.kernel.name())
            .field("slots", &self.list.len())
            .field("inputs", &self.list.inputs().len())
            .field("shape", &self.shape)
            .finish()
    }
}

impl Evaluator {
    pub(crate) fn new(
        list: Arc<ComputationList>,
        kernel: Box<dyn Kernel>,
        values: ValueTable,
        shape: Option<(usize, usize)>,
    ) -> Self {
        Self {
            list,
            kernel,
            values,
            shape,
        }
    }

    /// Name of the kernel running the list.
    pub fn backend(&self) -> &'static str {
        self.kernel.name()
    }

    pub fn computation_list(&self) -> &ComputationList {
        &self.list
    }

    /// `(rows, cols)` of a matrix-shaped result, `None` for a scalar.
    pub fn shape(&self) -> Option<(usize, usize)> {
        self.shape
    }

    /// The compiled targets rebuilt as expressions, one per output value.
    pub fn unatomize(&self) -> Vec<Expr> {
        self.list.unatomize()
    }

    /// Evaluates with the current values of the system.
    pub fn evaluate(&self) -> Result<Output> {
        let values = self.values.read();
        self.evaluate_with(&values)
    }

    /// Evaluates against `values`, indexed like the system's value table.
    pub fn evaluate_with(&self, values: &[f64]) -> Result<Output> {
        let inputs = self
            .list
            .inputs()
            .iter()
            .map(|s| {
                values.get(s.index()).copied().ok_or_else(|| {
                    Error::Evaluation(format!("no value for symbol '{}'", s.name()))
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        let mut outputs = vec![0.0; self.list.targets().len()];
        self.kernel.run(&inputs, &mut outputs)?;
        trace!(backend = self.backend(), outputs = outputs.len(), "evaluated");

        Ok(match self.shape {
            None => Output::Scalar(outputs.first().copied().unwrap_or_default()),
            Some((rows, cols)) => Output::Matrix(NumericMatrix {
                rows,
                cols,
                data: outputs,
            }),
        })
    }
}
