use std::collections::HashMap;

use crate::dependence::{AnalysisError, DependenceBackend, DependencyGraph};
use crate::ir::{InstrId, Module, Opcode, Operand};

/// Dependency analysis derived directly from the IR.
///
/// - data: every SSA use (`def -> use`), every `store` to a stack slot feeding every
///   `load` from that slot, and every `ret` of a callee feeding its direct call sites
/// - control: a `cond_br` governs every later instruction of its function
pub struct DefUseBackend;

impl DependenceBackend for DefUseBackend {
    fn analyze(&self, module: &Module) -> Result<DependencyGraph, AnalysisError> {
        let mut graph = DependencyGraph::new();

        for func in module.functions() {
            let mut stores: HashMap<InstrId, Vec<InstrId>> = HashMap::new();
            let mut loads: HashMap<InstrId, Vec<InstrId>> = HashMap::new();
            let mut branches: Vec<InstrId> = Vec::new();

            for inst in module.instructions(func.id()) {
                graph.add_node(inst.id());
                for def in inst.value_operands() {
                    graph.add_data_edge(def, inst.id());
                }

                // store <value>, <slot>; load <slot>
                let slot = match inst.opcode {
                    Opcode::Store => inst.operands.get(1),
                    Opcode::Load => inst.operands.first(),
                    _ => None,
                };
                if let Some(Operand::Value(slot)) = slot {
                    let is_alloca =
                        module.instruction(*slot).is_some_and(|s| s.opcode == Opcode::Alloca);
                    if is_alloca {
                        let bucket = if inst.opcode == Opcode::Store { &mut stores } else { &mut loads };
                        bucket.entry(*slot).or_default().push(inst.id());
                    }
                }

                for branch in &branches {
                    graph.add_control_edge(*branch, inst.id());
                }
                if inst.opcode == Opcode::CondBr {
                    branches.push(inst.id());
                }
            }

            for (slot, slot_stores) in &stores {
                let Some(slot_loads) = loads.get(slot) else { continue };
                for store in slot_stores {
                    for load in slot_loads {
                        graph.add_data_edge(*store, *load);
                    }
                }
            }
        }

        for inst in module.all_instructions() {
            let Some(callee) = inst.direct_callee() else { continue };
            if inst.ty.is_void() {
                continue;
            }
            for ret in module.instructions(callee) {
                if ret.opcode == Opcode::Ret && !ret.operands.is_empty() {
                    graph.add_data_edge(ret.id(), inst.id());
                }
            }
        }

        Ok(graph)
    }

    fn name(&self) -> &'static str {
        "def-use"
    }

    fn description(&self) -> &'static str {
        "SSA def-use, stack-slot store/load and return-value edges computed from the IR"
    }
}
