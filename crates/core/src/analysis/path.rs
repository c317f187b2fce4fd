use std::collections::{HashMap, HashSet, VecDeque};

use log::debug;

use crate::analysis::blocks::{BlockId, DependencyBlocks};
use crate::analysis::callgraph::BlockCallGraph;
use crate::error::SliceError;
use crate::ir::{FunctionId, InstrId, Module};

/// Dependency blocks leading from the source function to a target instruction.
///
/// Each block calls the function owning the next one; the last block holds a target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlicePath {
    pub blocks: Vec<BlockId>,
}

impl SlicePath {
    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    /// Block holding the target instruction.
    pub fn target_block(&self) -> Option<BlockId> {
        self.blocks.last().copied()
    }

    /// Owning function of each block, in path order.
    pub fn functions(&self, blocks: &DependencyBlocks) -> Vec<FunctionId> {
        self.blocks.iter().filter_map(|b| blocks.block(*b)).map(|b| b.function).collect()
    }
}

/// Breadth-first search from `source` to the first function containing a target.
///
/// Functions are visited at most once, so recursion and call cycles terminate. Ties go
/// to whatever was enqueued first: blocks in program order, then callees in call order.
pub fn find_path(
    module: &Module,
    graph: &BlockCallGraph,
    blocks: &DependencyBlocks,
    source: FunctionId,
    targets: &[InstrId],
) -> Result<SlicePath, SliceError> {
    if !graph.has_function(source) {
        return Err(SliceError::RootNotFound(module.function_name(source).to_string()));
    }
    let targets: HashSet<InstrId> = targets.iter().copied().collect();

    let mut queue = VecDeque::from([source]);
    let mut visited = HashSet::from([source]);
    let mut reached_via: HashMap<FunctionId, BlockId> = HashMap::new();

    while let Some(function) = queue.pop_front() {
        debug!("path: visiting @{}", module.function_name(function));
        let own_blocks = graph.blocks_of(function);

        let hit = own_blocks.iter().copied().find(|b| {
            blocks.block(*b).is_some_and(|blk| blk.instructions.iter().any(|i| targets.contains(i)))
        });
        if let Some(hit) = hit {
            debug!("path: target reached in {hit} of @{}", module.function_name(function));
            return Ok(reconstruct(blocks, &reached_via, source, function, hit));
        }

        for block in own_blocks {
            for callee in graph.callees_of(*block) {
                if visited.insert(*callee) {
                    debug!(
                        "path: enqueue @{} via {block} of @{}",
                        module.function_name(*callee),
                        module.function_name(function)
                    );
                    reached_via.insert(*callee, *block);
                    queue.push_back(*callee);
                }
            }
        }
    }

    let mut names: Vec<String> = targets.iter().map(|t| module.describe(*t)).collect();
    names.sort();
    Err(SliceError::PathNotFound {
        source_function: module.function_name(source).to_string(),
        targets: names.join(", "),
    })
}

fn reconstruct(
    blocks: &DependencyBlocks,
    reached_via: &HashMap<FunctionId, BlockId>,
    source: FunctionId,
    found_in: FunctionId,
    hit: BlockId,
) -> SlicePath {
    let mut path = vec![hit];
    let mut current = found_in;
    while current != source {
        let Some(via) = reached_via.get(&current) else { break };
        path.push(*via);
        match blocks.block(*via) {
            Some(block) => current = block.function,
            None => break,
        }
    }
    path.reverse();
    SlicePath { blocks: path }
}
