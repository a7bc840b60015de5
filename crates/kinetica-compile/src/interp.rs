// Interpreter backend: one pass over the computation list per call.

use crate::{ComputationList, Kernel, Result};
use kinetica_core::Error;
use std::sync::Arc;

pub struct Interpreter {
    list: Arc<ComputationList>,
}

impl Interpreter {
    pub fn new(list: Arc<ComputationList>) -> Self {
        Self { list }
    }
}

impl Kernel for Interpreter {
    fn name(&self) -> &'static str {
        "interpreter"
    }

    fn run(&self, inputs: &[f64], outputs: &mut [f64]) -> Result<()> {
        let list = &self.list;
        if inputs.len() < list.inputs().len() || outputs.len() < list.targets().len() {
            return Err(Error::Evaluation(format!(
                "interpreter expects {} inputs and {} outputs, got {} and {}",
                list.inputs().len(),
                list.targets().len(),
                inputs.len(),
                outputs.len()
            ))
            .into());
        }

        let mut slots = Vec::with_capacity(list.len());
        for op in list.ops() {
            let value = op.apply(&slots, inputs);
            slots.push(value);
        }
        for (out, target) in outputs.iter_mut().zip(list.targets()) {
            *out = slots[*target];
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kinetica_core::{Expr, System};

    #[test]
    fn runs_every_target() {
        let mut sys = System::new();
        let a = Expr::from(sys.new_parameter("a", 0.0).unwrap());
        let b = Expr::from(sys.new_parameter("b", 0.0).unwrap());
        let targets = [(&a * &b).cos(), &a / &b - 1.0, a.pow(&b)];
        let list = Arc::new(ComputationList::build(&targets, true));
        let interp = Interpreter::new(list);

        let mut out = [0.0; 3];
        interp.run(&[0.5, 2.0], &mut out).unwrap();
        assert_eq!(out, [1.0f64.cos(), 0.5 / 2.0 - 1.0, 0.5f64.powf(2.0)]);
        assert!(matches!(
            interp.run(&[0.5], &mut out),
            Err(crate::CompileError::Core(Error::Evaluation(_)))
        ));
    }
}
