//! Dependency graph adapter and the analysis backends that populate it.
//!
//! The slicer only needs four neighbour queries per instruction (see
//! [`DependenceQuery`]). How those edges are computed is up to a
//! [`DependenceBackend`]: the built-in def-use analysis, or a graph recorded by an
//! external program-dependence engine.

mod def_use;
mod recorded;

use std::collections::HashMap;

use thiserror::Error;

use crate::ir::{InstrId, Module};

pub use def_use::DefUseBackend;
pub use recorded::{EdgeKind, RecordedBackend, RecordedEdge, RecordedGraph};

/// Per-instruction dependency queries.
///
/// Edges point from the instruction that is depended upon to the dependent one, so
/// `data_deps(def)` lists the uses of `def` and `rev_data_deps(use)` lists its defs.
pub trait DependenceQuery {
    fn control_deps(&self, node: InstrId) -> &[InstrId];
    fn rev_control_deps(&self, node: InstrId) -> &[InstrId];
    fn data_deps(&self, node: InstrId) -> &[InstrId];
    fn rev_data_deps(&self, node: InstrId) -> &[InstrId];
}

/// Neighbour lists of one instruction.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NodeDeps {
    pub control: Vec<InstrId>,
    pub rev_control: Vec<InstrId>,
    pub data: Vec<InstrId>,
    pub rev_data: Vec<InstrId>,
}

/// Control/data dependency edges indexed by instruction.
#[derive(Debug, Clone, Default)]
pub struct DependencyGraph {
    nodes: HashMap<InstrId, NodeDeps>,
}

impl DependencyGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes sure `node` has an entry even if it has no edges.
    pub fn add_node(&mut self, node: InstrId) {
        self.nodes.entry(node).or_default();
    }

    /// Records that `to` uses data produced by `from`.
    pub fn add_data_edge(&mut self, from: InstrId, to: InstrId) {
        push_unique(&mut self.nodes.entry(from).or_default().data, to);
        push_unique(&mut self.nodes.entry(to).or_default().rev_data, from);
    }

    /// Records that whether `to` executes depends on `from`.
    pub fn add_control_edge(&mut self, from: InstrId, to: InstrId) {
        push_unique(&mut self.nodes.entry(from).or_default().control, to);
        push_unique(&mut self.nodes.entry(to).or_default().rev_control, from);
    }

    pub fn node(&self, node: InstrId) -> Option<&NodeDeps> {
        self.nodes.get(&node)
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn data_edge_count(&self) -> usize {
        self.nodes.values().map(|n| n.data.len()).sum()
    }

    pub fn control_edge_count(&self) -> usize {
        self.nodes.values().map(|n| n.control.len()).sum()
    }
}

fn push_unique(list: &mut Vec<InstrId>, id: InstrId) {
    if !list.contains(&id) {
        list.push(id);
    }
}

impl DependenceQuery for DependencyGraph {
    fn control_deps(&self, node: InstrId) -> &[InstrId] {
        self.nodes.get(&node).map(|n| n.control.as_slice()).unwrap_or_default()
    }

    fn rev_control_deps(&self, node: InstrId) -> &[InstrId] {
        self.nodes.get(&node).map(|n| n.rev_control.as_slice()).unwrap_or_default()
    }

    fn data_deps(&self, node: InstrId) -> &[InstrId] {
        self.nodes.get(&node).map(|n| n.data.as_slice()).unwrap_or_default()
    }

    fn rev_data_deps(&self, node: InstrId) -> &[InstrId] {
        self.nodes.get(&node).map(|n| n.rev_data.as_slice()).unwrap_or_default()
    }
}

#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("Dependency backend not found: {name} (available: {available})")]
    MissingBackend { name: String, available: String },
    #[error("Recorded dependency endpoint `{0}` does not match any instruction")]
    UnknownEndpoint(String),
    #[error("Dependency backend error: {0}")]
    Backend(String),
}

/// Something that can compute a [`DependencyGraph`] for a module.
pub trait DependenceBackend {
    fn analyze(&self, module: &Module) -> Result<DependencyGraph, AnalysisError>;
    fn name(&self) -> &'static str;
    fn description(&self) -> &'static str {
        ""
    }
}

/// Registry of dependency backends; callers select by name.
#[derive(Default)]
pub struct BackendRegistry {
    backends: HashMap<String, Box<dyn DependenceBackend>>,
}

impl BackendRegistry {
    pub fn new() -> Self {
        Self { backends: HashMap::new() }
    }

    pub fn register<B: DependenceBackend + 'static>(&mut self, backend: B) -> &mut Self {
        self.backends.insert(backend.name().to_string(), Box::new(backend));
        self
    }

    pub fn get(&self, name: &str) -> Option<&dyn DependenceBackend> {
        self.backends.get(name).map(|b| &**b)
    }

    /// Like [`BackendRegistry::get`], but reports the available names on failure.
    pub fn require(&self, name: &str) -> Result<&dyn DependenceBackend, AnalysisError> {
        self.get(name).ok_or_else(|| AnalysisError::MissingBackend {
            name: name.to_string(),
            available: self.names().join(", "),
        })
    }

    /// Sorted backend names for error messages/help.
    pub fn names(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.backends.keys().cloned().collect();
        keys.sort();
        keys
    }
}

/// Registry populated with the backends that need no external input.
pub fn default_backend_registry() -> BackendRegistry {
    let mut registry = BackendRegistry::new();
    registry.register(DefUseBackend);
    registry
}
