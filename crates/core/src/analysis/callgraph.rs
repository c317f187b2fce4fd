use std::collections::HashMap;

use crate::analysis::blocks::{BlockId, DependencyBlocks};
use crate::error::SliceError;
use crate::ir::{Callee, FunctionId, Module};

/// Bipartite graph between dependency blocks and functions.
///
/// A block points at the functions its call instructions invoke; a function points at
/// the blocks built from its own body.
#[derive(Debug, Clone, Default)]
pub struct BlockCallGraph {
    callees: HashMap<BlockId, Vec<FunctionId>>,
    function_blocks: HashMap<FunctionId, Vec<BlockId>>,
}

impl BlockCallGraph {
    /// Functions called from `block`, in the order the calls appear.
    pub fn callees_of(&self, block: BlockId) -> &[FunctionId] {
        self.callees.get(&block).map(Vec::as_slice).unwrap_or_default()
    }

    pub fn blocks_of(&self, function: FunctionId) -> &[BlockId] {
        self.function_blocks.get(&function).map(Vec::as_slice).unwrap_or_default()
    }

    pub fn has_function(&self, function: FunctionId) -> bool {
        self.function_blocks.contains_key(&function)
    }

    /// Blocks that call `function`, sorted by id.
    pub fn callers_of(&self, function: FunctionId) -> Vec<BlockId> {
        let mut callers: Vec<BlockId> = self
            .callees
            .iter()
            .filter(|(_, callees)| callees.contains(&function))
            .map(|(block, _)| *block)
            .collect();
        callers.sort();
        callers
    }

    /// Every `block -> callee` edge, sorted by block then call order.
    pub fn edges(&self) -> Vec<(BlockId, FunctionId)> {
        let mut blocks: Vec<&BlockId> = self.callees.keys().collect();
        blocks.sort();
        blocks
            .into_iter()
            .flat_map(|block| self.callees_of(*block).iter().map(move |callee| (*block, *callee)))
            .collect()
    }

    pub fn edge_count(&self) -> usize {
        self.callees.values().map(Vec::len).sum()
    }
}

/// Derives the block/function call graph from a module and its dependency blocks.
///
/// Fails with [`SliceError::Resolution`] on the first call whose target is not a
/// known function.
pub fn build_call_graph(
    module: &Module,
    blocks: &DependencyBlocks,
) -> Result<BlockCallGraph, SliceError> {
    let mut graph = BlockCallGraph::default();
    for func in module.functions() {
        graph.function_blocks.insert(func.id(), blocks.blocks_of(func.id()).to_vec());
    }

    for block in blocks.iter() {
        let callees = graph.callees.entry(block.id).or_default();
        for inst in block.instructions.iter().filter_map(|id| module.instruction(*id)) {
            if !inst.is_call() {
                continue;
            }
            match inst.callee {
                Some(Callee::Direct(callee)) => {
                    if !callees.contains(&callee) {
                        callees.push(callee);
                    }
                }
                _ => {
                    return Err(SliceError::Resolution {
                        function: module.function_name(inst.parent()).to_string(),
                        instruction: module.describe(inst.id()),
                    })
                }
            }
        }
    }
    Ok(graph)
}
