use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::dependence::{AnalysisError, DependenceBackend, DependencyGraph};
use crate::ir::doc::is_json;
use crate::ir::{InstrId, Module};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EdgeKind {
    Data,
    Control,
}

/// One dependency edge as exported by an external analysis engine.
///
/// Endpoints name instructions as `function:%value` or `function#index`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordedEdge {
    pub kind: EdgeKind,
    pub from: String,
    pub to: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordedGraph {
    #[serde(default)]
    pub edges: Vec<RecordedEdge>,
}

impl RecordedGraph {
    /// Reads an edge file; `.json` is parsed as JSON, anything else as YAML.
    pub fn load(path: &Path) -> Result<Self> {
        let body = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read dependency edges at {}", path.display()))?;
        let graph = if is_json(path) {
            serde_json::from_str(&body).context("Failed to parse dependency edges JSON")?
        } else {
            serde_yaml::from_str(&body).context("Failed to parse dependency edges YAML")?
        };
        Ok(graph)
    }
}

/// Replays a dependency graph computed outside this crate.
pub struct RecordedBackend {
    graph: RecordedGraph,
}

impl RecordedBackend {
    pub fn new(graph: RecordedGraph) -> Self {
        Self { graph }
    }

    pub fn from_path(path: &Path) -> Result<Self> {
        Ok(Self::new(RecordedGraph::load(path)?))
    }
}

fn resolve_endpoint(module: &Module, text: &str) -> Result<InstrId, AnalysisError> {
    let unknown = || AnalysisError::UnknownEndpoint(text.to_string());
    if let Some((function, index)) = text.rsplit_once('#') {
        if let Ok(index) = index.parse::<usize>() {
            let f = module.function_by_name(function).ok_or_else(unknown)?;
            return module
                .function(f)
                .and_then(|func| func.body().get(index).copied())
                .ok_or_else(unknown);
        }
    }
    let (function, name) = text.split_once(":%").ok_or_else(unknown)?;
    let f = module.function_by_name(function).ok_or_else(unknown)?;
    module
        .instructions(f)
        .find(|inst| inst.name.as_deref() == Some(name))
        .map(|inst| inst.id())
        .ok_or_else(unknown)
}

impl DependenceBackend for RecordedBackend {
    fn analyze(&self, module: &Module) -> Result<DependencyGraph, AnalysisError> {
        let mut graph = DependencyGraph::new();
        for inst in module.all_instructions() {
            graph.add_node(inst.id());
        }
        for edge in &self.graph.edges {
            let from = resolve_endpoint(module, &edge.from)?;
            let to = resolve_endpoint(module, &edge.to)?;
            match edge.kind {
                EdgeKind::Data => graph.add_data_edge(from, to),
                EdgeKind::Control => graph.add_control_edge(from, to),
            }
        }
        Ok(graph)
    }

    fn name(&self) -> &'static str {
        "recorded"
    }

    fn description(&self) -> &'static str {
        "Edges exported by an external program-dependence engine (--dependencies FILE)"
    }
}
