//! Native backend: the computation list lowered to a core wasm module and
//! compiled by wasmtime.
//!
//! The module exports `memory` and `run: () -> ()`. Inputs sit at the start
//! of linear memory as little-endian `f64`s, followed by the outputs and then
//! by the slots that did not fit in locals. Transcendental functions and
//! `pow` are host imports from `env` calling [`Func::apply`] and
//! [`powf`], the functions the interpreter uses, so both backends round
//! identically.

use crate::{ComputationList, Kernel, Op, Result, Slot, computation::powf};
use anyhow::{Context, anyhow};
use kinetica_core::{Error, Func};
use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use std::collections::BTreeSet;
use tracing::{debug, trace};
use wasm_encoder::{
    CodeSection, EntityType, ExportKind, ExportSection, Function, FunctionSection, Ieee64,
    ImportSection, Instruction, MemArg, MemorySection, MemoryType, Module, TypeSection, ValType,
};
use wasmtime::{Config as WasmtimeConfig, Engine, Linker, Memory, Store, TypedFunc};

/// Slots kept in wasm locals; later slots live in linear memory.
pub const LOCAL_LIMIT: usize = 4096;

const IMPORT_MODULE: &str = "env";
const POW_IMPORT: &str = "pow";
const PAGE_SIZE: u64 = 65536;

/// Byte offsets of the regions of linear memory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Layout {
    pub inputs: usize,
    pub outputs: usize,
    pub spilled: usize,
}

impl Layout {
    fn new(list: &ComputationList, local_limit: usize) -> Self {
        Self {
            inputs: list.inputs().len(),
            outputs: list.targets().len(),
            spilled: list.len().saturating_sub(local_limit),
        }
    }

    pub fn output_offset(&self) -> u64 {
        8 * self.inputs as u64
    }

    pub fn spill_offset(&self) -> u64 {
        8 * (self.inputs + self.outputs) as u64
    }

    fn pages(&self) -> u64 {
        let bytes = 8 * (self.inputs + self.outputs + self.spilled) as u64;
        bytes.div_ceil(PAGE_SIZE).max(1)
    }
}

fn memarg(offset: u64) -> MemArg {
    MemArg {
        offset,
        align: 3,
        memory_index: 0,
    }
}

/// Functions the module imports, in import order.
fn imports_of(list: &ComputationList) -> (Vec<Func>, bool) {
    let mut funcs = BTreeSet::new();
    let mut pow = false;
    for op in list.ops() {
        match op {
            Op::Call(Func::Sqrt | Func::Abs, _) => {}
            Op::Call(func, _) => {
                funcs.insert(*func);
            }
            Op::Pow(..) => pow = true,
            _ => {}
        }
    }
    (funcs.into_iter().collect(), pow)
}

struct Emitter {
    func: Function,
    layout: Layout,
    local_limit: usize,
}

impl Emitter {
    fn instruction(&mut self, instruction: &Instruction<'_>) {
        self.func.instruction(instruction);
    }

    fn get(&mut self, slot: Slot) {
        if slot < self.local_limit {
            self.instruction(&Instruction::LocalGet(slot as u32));
        } else {
            let offset = self.spill_address(slot);
            self.instruction(&Instruction::I32Const(0));
            self.instruction(&Instruction::F64Load(memarg(offset)));
        }
    }

    /// Pushes the store address of a spilled slot; must precede its value.
    fn begin_set(&mut self, slot: Slot) {
        if slot >= self.local_limit {
            self.instruction(&Instruction::I32Const(0));
        }
    }

    fn end_set(&mut self, slot: Slot) {
        if slot < self.local_limit {
            self.instruction(&Instruction::LocalSet(slot as u32));
        } else {
            let offset = self.spill_address(slot);
            self.instruction(&Instruction::F64Store(memarg(offset)));
        }
    }

    fn spill_address(&self, slot: Slot) -> u64 {
        self.layout.spill_offset() + 8 * (slot - self.local_limit) as u64
    }
}

/// Lowers `list` to a core wasm module.
pub fn lower(list: &ComputationList) -> anyhow::Result<Vec<u8>> {
    lower_with_limit(list, LOCAL_LIMIT)
}

pub(crate) fn lower_with_limit(
    list: &ComputationList,
    local_limit: usize,
) -> anyhow::Result<Vec<u8>> {
    let layout = Layout::new(list, local_limit);
    let (funcs, uses_pow) = imports_of(list);

    let mut types = TypeSection::new();
    let mut imports = ImportSection::new();
    let mut functions = FunctionSection::new();
    let mut exports = ExportSection::new();
    let mut code = CodeSection::new();
    let mut memories = MemorySection::new();

    let unary = types.len();
    types.ty().function(vec![ValType::F64], vec![ValType::F64]);
    let binary = types.len();
    types.ty().function(vec![ValType::F64, ValType::F64], vec![ValType::F64]);
    let run_type = types.len();
    types.ty().function(vec![], vec![]);

    let mut import_indices: FxHashMap<Func, u32> = FxHashMap::default();
    let mut next_func_index = 0u32;
    for func in &funcs {
        imports.import(IMPORT_MODULE, func.name(), EntityType::Function(unary));
        import_indices.insert(*func, next_func_index);
        next_func_index += 1;
    }
    let pow_index = if uses_pow {
        imports.import(IMPORT_MODULE, POW_IMPORT, EntityType::Function(binary));
        let index = next_func_index;
        next_func_index += 1;
        Some(index)
    } else {
        None
    };

    functions.function(run_type);
    let run_index = next_func_index;

    let locals = list.len().min(local_limit) as u32;
    let locals = if locals == 0 {
        vec![]
    } else {
        vec![(locals, ValType::F64)]
    };
    let mut emit = Emitter {
        func: Function::new(locals),
        layout,
        local_limit,
    };

    for (slot, op) in list.ops().iter().enumerate() {
        emit.begin_set(slot);
        match *op {
            Op::Const(n) => emit.instruction(&Instruction::F64Const(Ieee64::from(n))),
            Op::Input(k) => {
                emit.instruction(&Instruction::I32Const(0));
                emit.instruction(&Instruction::F64Load(memarg(8 * k as u64)));
            }
            Op::Add(a, b) | Op::Sub(a, b) | Op::Mul(a, b) | Op::Div(a, b) => {
                emit.get(a);
                emit.get(b);
                emit.instruction(&match op {
                    Op::Add(..) => Instruction::F64Add,
                    Op::Sub(..) => Instruction::F64Sub,
                    Op::Mul(..) => Instruction::F64Mul,
                    _ => Instruction::F64Div,
                });
            }
            Op::Pow(a, b) => {
                let pow = pow_index.ok_or_else(|| anyhow!("pow used but not imported"))?;
                emit.get(a);
                emit.get(b);
                emit.instruction(&Instruction::Call(pow));
            }
            Op::Neg(a) => {
                emit.get(a);
                emit.instruction(&Instruction::F64Neg);
            }
            Op::Sqrt(a) | Op::Call(Func::Sqrt, a) => {
                emit.get(a);
                emit.instruction(&Instruction::F64Sqrt);
            }
            Op::Call(Func::Abs, a) => {
                emit.get(a);
                emit.instruction(&Instruction::F64Abs);
            }
            Op::Call(func, a) => {
                let index = *import_indices
                    .get(&func)
                    .ok_or_else(|| anyhow!("missing import for {func}"))?;
                emit.get(a);
                emit.instruction(&Instruction::Call(index));
            }
        }
        emit.end_set(slot);
    }

    for (j, target) in list.targets().iter().enumerate() {
        emit.instruction(&Instruction::I32Const(0));
        emit.get(*target);
        let offset = layout.output_offset() + 8 * j as u64;
        emit.instruction(&Instruction::F64Store(memarg(offset)));
    }
    emit.instruction(&Instruction::End);
    code.function(&emit.func);

    memories.memory(MemoryType {
        minimum: layout.pages(),
        maximum: None,
        memory64: false,
        shared: false,
        page_size_log2: None,
    });
    exports.export("run", ExportKind::Func, run_index);
    exports.export("memory", ExportKind::Memory, 0);

    let mut module = Module::new();
    module.section(&types);
    module.section(&imports);
    module.section(&functions);
    module.section(&memories);
    module.section(&exports);
    module.section(&code);
    let wasm = module.finish();
    debug!(
        bytes = wasm.len(),
        imports = next_func_index,
        spilled = layout.spilled,
        "lowered computation list to wasm"
    );
    Ok(wasm)
}

/// A wasmtime instance of the lowered list. Calls are serialized by a mutex
/// around the store.
pub struct NativeKernel {
    store: Mutex<Store<()>>,
    memory: Memory,
    run: TypedFunc<(), ()>,
    layout: Layout,
}

impl NativeKernel {
    pub fn new(list: &ComputationList) -> anyhow::Result<Self> {
        Self::with_local_limit(list, LOCAL_LIMIT)
    }

    pub(crate) fn with_local_limit(
        list: &ComputationList,
        local_limit: usize,
    ) -> anyhow::Result<Self> {
        let wasm = lower_with_limit(list, local_limit)?;
        let engine =
            Engine::new(&WasmtimeConfig::new()).context("failed to create wasmtime engine")?;
        let module = wasmtime::Module::new(&engine, &wasm).context("failed to compile kernel")?;

        let mut linker = Linker::new(&engine);
        let (funcs, uses_pow) = imports_of(list);
        for func in funcs {
            linker
                .func_wrap(IMPORT_MODULE, func.name(), move |x: f64| func.apply(x))
                .with_context(|| format!("failed to link host function {func}"))?;
        }
        if uses_pow {
            linker
                .func_wrap(IMPORT_MODULE, POW_IMPORT, powf)
                .context("failed to link host function pow")?;
        }

        let mut store = Store::new(&engine, ());
        let instance = linker
            .instantiate(&mut store, &module)
            .context("failed to instantiate kernel")?;
        let run = instance
            .get_typed_func::<(), ()>(&mut store, "run")
            .context("kernel does not export run")?;
        let memory = instance
            .get_memory(&mut store, "memory")
            .ok_or_else(|| anyhow!("kernel does not export memory"))?;
        debug!(bytes = wasm.len(), "native kernel instantiated");

        Ok(Self {
            store: Mutex::new(store),
            memory,
            run,
            layout: Layout::new(list, local_limit),
        })
    }

    fn call(&self, inputs: &[f64], outputs: &mut [f64]) -> anyhow::Result<()> {
        let mut store = self.store.lock();
        let bytes: Vec<u8> = inputs[..self.layout.inputs]
            .iter()
            .flat_map(|v| v.to_le_bytes())
            .collect();
        self.memory
            .write(&mut *store, 0, &bytes)
            .context("failed to write kernel inputs")?;

        self.run.call(&mut *store, ()).context("kernel trapped")?;

        let mut buf = vec![0u8; 8 * self.layout.outputs];
        self.memory
            .read(&*store, self.layout.output_offset() as usize, &mut buf)
            .context("failed to read kernel outputs")?;
        for (out, chunk) in outputs.iter_mut().zip(buf.chunks_exact(8)) {
            let mut raw = [0u8; 8];
            raw.copy_from_slice(chunk);
            *out = f64::from_le_bytes(raw);
        }
        trace!(inputs = inputs.len(), "native kernel call");
        Ok(())
    }
}

impl Kernel for NativeKernel {
    fn name(&self) -> &'static str {
        "native"
    }

    fn run(&self, inputs: &[f64], outputs: &mut [f64]) -> Result<()> {
        if inputs.len() < self.layout.inputs || outputs.len() < self.layout.outputs {
            return Err(Error::Evaluation(format!(
                "native kernel expects {} inputs and {} outputs, got {} and {}",
                self.layout.inputs,
                self.layout.outputs,
                inputs.len(),
                outputs.len()
            ))
            .into());
        }
        Ok(self.call(inputs, outputs)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Interpreter;
    use kinetica_core::{Expr, System};
    use std::sync::Arc;

    fn list() -> ComputationList {
        let mut sys = System::new();
        let a = Expr::from(sys.new_parameter("a", 0.0).unwrap());
        let b = Expr::from(sys.new_parameter("b", 0.0).unwrap());
        let targets = [
            (&a * &b).sin() + a.abs() * b.sqrt(),
            a.pow(&b) - b.exp() / 3.0,
            (&a - &b).atan(),
        ];
        ComputationList::build(&targets, true)
    }

    #[test]
    fn imports_only_what_is_called() {
        let (funcs, pow) = imports_of(&list());
        assert_eq!(funcs, [Func::Sin, Func::Atan, Func::Exp]);
        assert!(pow);
    }

    #[test]
    fn matches_the_interpreter() {
        let list = list();
        let native = NativeKernel::new(&list).unwrap();
        let interp = Interpreter::new(Arc::new(list));
        for inputs in [[0.5, 2.0], [-1.25, 2.0], [3.0, 0.0]] {
            let mut x = [0.0; 3];
            let mut y = [0.0; 3];
            native.run(&inputs, &mut x).unwrap();
            interp.run(&inputs, &mut y).unwrap();
            assert_eq!(x.map(f64::to_bits), y.map(f64::to_bits));
        }
    }

    #[test]
    fn spilled_slots_round_trip_through_memory() {
        let list = list();
        let layout = Layout::new(&list, 2);
        assert_eq!(layout.spilled, list.len() - 2);
        assert_eq!(layout.spill_offset(), 8 * 5);

        let spilled = NativeKernel::with_local_limit(&list, 2).unwrap();
        let native = NativeKernel::new(&list).unwrap();
        let mut x = [0.0; 3];
        let mut y = [0.0; 3];
        spilled.run(&[0.5, 2.0], &mut x).unwrap();
        native.run(&[0.5, 2.0], &mut y).unwrap();
        assert_eq!(x.map(f64::to_bits), y.map(f64::to_bits));
    }
}
