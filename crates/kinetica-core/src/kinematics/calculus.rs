use crate::{
    error::{Error, Result},
    geometry::{Base, Frame, Ref},
    matrix::Matrix,
    operand::{Operand, Target},
    system::System,
};
use tracing::trace;

impl System {
    /// Time derivative of `operand`.
    ///
    /// Vectors are differentiated as seen from `xyz`; every other kind is
    /// differentiated component by component.
    pub fn derivative(&self, operand: impl Into<Operand>) -> Result<Operand> {
        self.derivative_with(operand, None, None)
    }

    /// Time derivative of `operand`, with vectors differentiated as seen
    /// from `base` or from the base of `frame` (at most one of the two).
    pub fn derivative_with(
        &self,
        operand: impl Into<Operand>,
        base: Option<Ref<'_, Base>>,
        frame: Option<Ref<'_, Frame>>,
    ) -> Result<Operand> {
        let operand = operand.into();
        if base.is_some() && frame.is_some() {
            return Err(Error::TypeMismatch {
                context: "derivative",
                expected: "either a base or a frame",
                found: "both",
            });
        }
        let Operand::Vector(v) = &operand else {
            if base.is_some() || frame.is_some() {
                return Err(Error::TypeMismatch {
                    context: "derivative",
                    expected: "vector when a base or frame is given",
                    found: operand.kind().as_str(),
                });
            }
            return Ok(operand.map_exprs(|e| self.dt(e)));
        };

        let observer = match (base, frame) {
            (Some(b), _) => self.graph().base(b)?,
            (_, Some(f)) => self.graph().frame(f)?.base().clone(),
            (None, None) => self.xyz().clone(),
        };
        trace!(observer = observer.name(), "vector derivative");
        Ok(Operand::Vector(self.vector_rate(v, &observer)?))
    }

    /// Partial derivative of `operand` with respect to one symbol.
    pub fn diff(&self, operand: impl Into<Operand>, symbol: impl Into<Target>) -> Result<Operand> {
        let symbol = self.resolve_symbol(symbol)?;
        Ok(operand.into().map_exprs(|e| e.diff(&symbol)))
    }

    /// Jacobian of the `1 x n` row `row` (a value or a named matrix) with
    /// respect to `vars`: a matrix of bare symbols (row or column) or a
    /// single symbol. The result is `n x m`.
    pub fn jacobian<'a>(
        &self,
        row: impl Into<Ref<'a, Matrix>>,
        vars: impl Into<Operand>,
    ) -> Result<Matrix> {
        let row = self.graph().matrix(row.into())?;
        match vars.into() {
            Operand::Matrix(m) => {
                for s in m.to_symbols()? {
                    self.registry().check_owned(&s)?;
                }
                row.jacobian(&m)
            }
            other => {
                let expr = other.into_expr()?;
                let symbol = expr.to_symbol()?;
                self.registry().check_owned(&symbol)?;
                row.jacobian_symbol(&symbol)
            }
        }
    }
}
