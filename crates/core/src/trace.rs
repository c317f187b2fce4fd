//! Stage-by-stage trace emitted when a run is verbose.
//!
//! Everything goes through `log` at info level under [`TRACE_TARGET`], so it can be
//! filtered independently of the rest of the crate's logging.

use log::info;

use crate::analysis::{BlockCallGraph, DependencyBlocks, SlicePath};
use crate::dependence::{DependenceQuery, DependencyGraph};
use crate::ir::{FunctionId, InstrId, Module};
use crate::transform::SlicePlan;

pub const TRACE_TARGET: &str = "pathcut::trace";

pub fn trace_module(module: &Module) {
    info!(target: TRACE_TARGET, "== module {} ==", module.name);
    for line in module.display().to_string().lines() {
        info!(target: TRACE_TARGET, "{line}");
    }
}

pub fn trace_targets(module: &Module, targets: &[InstrId]) {
    info!(target: TRACE_TARGET, "== targets ({}) ==", targets.len());
    for target in targets {
        if let Some(inst) = module.instruction(*target) {
            let text = module.render_instruction(inst);
            info!(target: TRACE_TARGET, "  {}: {text}", module.describe(*target));
        }
    }
}

/// Per-instruction dump of the four dependency lists, in program order.
pub fn trace_dependencies(module: &Module, graph: &DependencyGraph) {
    info!(
        target: TRACE_TARGET,
        "== dependencies ({} node(s), {} data edge(s), {} control edge(s)) ==",
        graph.node_count(),
        graph.data_edge_count(),
        graph.control_edge_count()
    );
    let list = |ids: &[InstrId]| -> String {
        ids.iter().map(|i| module.describe(*i)).collect::<Vec<_>>().join(", ")
    };
    for inst in module.all_instructions() {
        let id = inst.id();
        let text = module.render_instruction(inst);
        info!(target: TRACE_TARGET, "  {}: {text}", module.describe(id));
        info!(target: TRACE_TARGET, "    control:     [{}]", list(graph.control_deps(id)));
        info!(target: TRACE_TARGET, "    rev control: [{}]", list(graph.rev_control_deps(id)));
        info!(target: TRACE_TARGET, "    data:        [{}]", list(graph.data_deps(id)));
        info!(target: TRACE_TARGET, "    rev data:    [{}]", list(graph.rev_data_deps(id)));
    }
}

pub fn trace_blocks(module: &Module, blocks: &DependencyBlocks) {
    info!(target: TRACE_TARGET, "== dependency blocks ({}) ==", blocks.len());
    for func in module.functions() {
        let ids = blocks.blocks_of(func.id());
        info!(target: TRACE_TARGET, "@{}: {} block(s)", func.name, ids.len());
        for block in ids.iter().filter_map(|b| blocks.block(*b)) {
            let members: Vec<String> =
                block.instructions.iter().map(|i| module.describe(*i)).collect();
            info!(target: TRACE_TARGET, "  {}: [{}]", block.id, members.join(", "));
        }
    }
}

pub fn trace_call_graph(module: &Module, graph: &BlockCallGraph, blocks: &DependencyBlocks) {
    info!(target: TRACE_TARGET, "== call graph ({} edge(s)) ==", graph.edge_count());
    for (block, callee) in graph.edges() {
        let owner = blocks.block(block).map(|b| module.function_name(b.function)).unwrap_or("?");
        info!(target: TRACE_TARGET, "  {block} (@{owner}) -> @{}", module.function_name(callee));
    }
}

pub fn trace_path(module: &Module, path: &SlicePath, blocks: &DependencyBlocks) {
    let steps: Vec<String> = path
        .blocks
        .iter()
        .filter_map(|b| blocks.block(*b))
        .map(|b| format!("@{}[{}]", module.function_name(b.function), b.id))
        .collect();
    info!(target: TRACE_TARGET, "== path ==");
    info!(target: TRACE_TARGET, "  {}", steps.join(" -> "));
}

pub fn trace_plan(module: &Module, plan: &SlicePlan) {
    let names = |ids: &[FunctionId]| {
        ids.iter().map(|f| format!("@{}", module.function_name(*f))).collect::<Vec<_>>().join(", ")
    };
    info!(target: TRACE_TARGET, "== slice ==");
    info!(target: TRACE_TARGET, "  keep: {}", names(&plan.keep));
    info!(target: TRACE_TARGET, "  remove: {}", names(&plan.remove));
    for site in &plan.erase_call_sites {
        info!(target: TRACE_TARGET, "  erase call site {}", module.describe(*site));
    }
    for target in &plan.targets {
        info!(target: TRACE_TARGET, "  instrument {}", module.describe(*target));
    }
}
