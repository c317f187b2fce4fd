use std::collections::HashMap;
use std::fmt;

use serde::Serialize;

use crate::dependence::DependenceQuery;
use crate::ir::{FunctionId, InstrId, Module};

#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub struct BlockId(pub(crate) usize);

impl BlockId {
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for BlockId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "b{}", self.0)
    }
}

/// Instructions of one function that are connected through data dependencies.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DependencyBlock {
    pub id: BlockId,
    pub function: FunctionId,
    /// Members in program order.
    pub instructions: Vec<InstrId>,
}

impl DependencyBlock {
    pub fn contains(&self, inst: InstrId) -> bool {
        self.instructions.contains(&inst)
    }

    pub fn len(&self) -> usize {
        self.instructions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instructions.is_empty()
    }
}

/// Dependency blocks of every function in a module.
///
/// Invariant: each live instruction belongs to exactly one block, and every function
/// has an entry in the per-function index (possibly empty).
#[derive(Debug, Clone, Default)]
pub struct DependencyBlocks {
    blocks: Vec<DependencyBlock>,
    by_function: HashMap<FunctionId, Vec<BlockId>>,
    owner: HashMap<InstrId, BlockId>,
}

impl DependencyBlocks {
    pub fn block(&self, id: BlockId) -> Option<&DependencyBlock> {
        self.blocks.get(id.0)
    }

    /// All blocks; functions in declaration order, blocks by first instruction.
    pub fn iter(&self) -> impl Iterator<Item = &DependencyBlock> {
        self.blocks.iter()
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    pub fn blocks_of(&self, function: FunctionId) -> &[BlockId] {
        self.by_function.get(&function).map(Vec::as_slice).unwrap_or_default()
    }

    pub fn has_function(&self, function: FunctionId) -> bool {
        self.by_function.contains_key(&function)
    }

    /// Block holding `inst`.
    pub fn block_of(&self, inst: InstrId) -> Option<BlockId> {
        self.owner.get(&inst).copied()
    }
}

/// Union-find over dense indices.
struct DisjointSets {
    parent: Vec<usize>,
    rank: Vec<u8>,
}

impl DisjointSets {
    fn new(len: usize) -> Self {
        Self { parent: (0..len).collect(), rank: vec![0; len] }
    }

    fn find(&mut self, mut x: usize) -> usize {
        while self.parent[x] != x {
            self.parent[x] = self.parent[self.parent[x]];
            x = self.parent[x];
        }
        x
    }

    fn union(&mut self, a: usize, b: usize) {
        let (ra, rb) = (self.find(a), self.find(b));
        if ra == rb {
            return;
        }
        match self.rank[ra].cmp(&self.rank[rb]) {
            std::cmp::Ordering::Less => self.parent[ra] = rb,
            std::cmp::Ordering::Greater => self.parent[rb] = ra,
            std::cmp::Ordering::Equal => {
                self.parent[rb] = ra;
                self.rank[ra] += 1;
            }
        }
    }
}

/// Partitions the instructions of `function` into dependency blocks.
///
/// Two instructions end up together when a data edge (in either direction) links them,
/// directly or transitively. Control edges and edges leaving the function are ignored.
/// Groups come back ordered by their first instruction, members in program order.
pub fn compute_blocks(
    module: &Module,
    function: FunctionId,
    deps: &impl DependenceQuery,
) -> Vec<Vec<InstrId>> {
    let Some(func) = module.function(function) else {
        return Vec::new();
    };
    let body = func.body();
    let index: HashMap<InstrId, usize> = body.iter().enumerate().map(|(i, id)| (*id, i)).collect();

    let mut sets = DisjointSets::new(body.len());
    for (i, id) in body.iter().enumerate() {
        for other in deps.data_deps(*id).iter().chain(deps.rev_data_deps(*id)) {
            if let Some(&j) = index.get(other) {
                sets.union(i, j);
            }
        }
    }

    let mut groups: Vec<Vec<InstrId>> = Vec::new();
    let mut group_of_root: HashMap<usize, usize> = HashMap::new();
    for (i, id) in body.iter().enumerate() {
        let root = sets.find(i);
        let group = *group_of_root.entry(root).or_insert_with(|| {
            groups.push(Vec::new());
            groups.len() - 1
        });
        groups[group].push(*id);
    }
    groups
}

/// Computes the dependency blocks of every function in `module`.
pub fn build_dependency_blocks(module: &Module, deps: &impl DependenceQuery) -> DependencyBlocks {
    let mut out = DependencyBlocks::default();
    for func in module.functions() {
        let ids = out.by_function.entry(func.id()).or_default();
        for instructions in compute_blocks(module, func.id(), deps) {
            let id = BlockId(out.blocks.len());
            for inst in &instructions {
                out.owner.insert(*inst, id);
            }
            ids.push(id);
            out.blocks.push(DependencyBlock { id, function: func.id(), instructions });
        }
    }
    out
}
