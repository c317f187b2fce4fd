use log::info;
use serde::Serialize;

use crate::analysis::{
    build_call_graph, build_dependency_blocks, find_path, BlockCallGraph, BlockId,
    DependencyBlocks, SlicePath,
};
use crate::config::SliceConfig;
use crate::dependence::{DependenceBackend, DependencyGraph};
use crate::error::SliceError;
use crate::ir::{FunctionId, InstrId, Module};
use crate::locate::locate_targets;
use crate::trace;
use crate::transform::{
    apply_plan, declare_helper, inject_exit, inject_extraction, plan_slice, strip_debug_info,
    StripStats,
};

/// One block of the path, as reported.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PathStep {
    pub function: String,
    pub block: BlockId,
    pub instructions: usize,
}

/// Summary of a completed slicing run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SliceReport {
    pub module: String,
    pub backend: String,
    pub source_function: String,
    pub target: String,
    /// Instrumented target instructions, described before the module was rewritten.
    /// Targets inside removed functions are not listed.
    pub targets: Vec<String>,
    pub path: Vec<PathStep>,
    pub kept_functions: Vec<String>,
    pub removed_functions: Vec<String>,
    pub erased_call_sites: usize,
    pub injected_calls: usize,
    pub exit_calls: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub strip: Option<StripStats>,
}

/// Read-only results of the analysis stages.
#[derive(Debug, Clone)]
pub struct PathAnalysis {
    pub source: FunctionId,
    pub targets: Vec<InstrId>,
    pub dependencies: DependencyGraph,
    pub blocks: DependencyBlocks,
    pub call_graph: BlockCallGraph,
    pub path: SlicePath,
}

impl PathAnalysis {
    pub fn steps(&self, module: &Module) -> Vec<PathStep> {
        self.path
            .blocks
            .iter()
            .filter_map(|b| self.blocks.block(*b))
            .map(|b| PathStep {
                function: module.function_name(b.function).to_string(),
                block: b.id,
                instructions: b.len(),
            })
            .collect()
    }
}

/// Runs the slicing stages in order against one module.
pub struct SliceRunner<'a> {
    config: SliceConfig,
    backend: &'a dyn DependenceBackend,
}

impl<'a> SliceRunner<'a> {
    pub fn new(config: SliceConfig, backend: &'a dyn DependenceBackend) -> Self {
        Self { config, backend }
    }

    pub fn config(&self) -> &SliceConfig {
        &self.config
    }

    /// Everything up to and including the path search. Does not touch the module.
    pub fn analyze(&self, module: &Module) -> Result<PathAnalysis, SliceError> {
        self.config.validate()?;
        let verbose = self.config.verbose;
        if verbose {
            trace::trace_module(module);
        }

        let source = module
            .function_by_name(&self.config.source_function)
            .ok_or_else(|| SliceError::RootNotFound(self.config.source_function.clone()))?;
        let (file, line) = self.config.target()?;
        let targets = locate_targets(module, file, line)?;
        if verbose {
            trace::trace_targets(module, &targets);
        }

        info!("analysis: running dependence backend `{}`", self.backend.name());
        let dependencies = self.backend.analyze(module)?;
        if verbose {
            trace::trace_dependencies(module, &dependencies);
        }
        let blocks = build_dependency_blocks(module, &dependencies);
        if verbose {
            trace::trace_blocks(module, &blocks);
        }

        let call_graph = build_call_graph(module, &blocks)?;
        if verbose {
            trace::trace_call_graph(module, &call_graph, &blocks);
        }

        let path = find_path(module, &call_graph, &blocks, source, &targets)?;
        if verbose {
            trace::trace_path(module, &path, &blocks);
        }

        Ok(PathAnalysis { source, targets, dependencies, blocks, call_graph, path })
    }

    /// Slices `module` in place.
    ///
    /// Every check runs before the first mutation, so a failed run leaves the module as
    /// it was.
    pub fn run(&self, module: &mut Module) -> Result<SliceReport, SliceError> {
        let analysis = self.analyze(module)?;
        let protected = self.config.protected_set();
        let plan = plan_slice(
            module,
            &analysis.call_graph,
            &analysis.blocks,
            &analysis.path,
            &analysis.targets,
            &protected,
        )?;
        if self.config.verbose {
            trace::trace_plan(module, &plan);
        }

        let target_names: Vec<String> =
            plan.targets.iter().map(|t| module.describe(*t)).collect();
        let path = analysis.steps(module);

        let extraction = declare_helper(module, &self.config.extraction_function);
        let exit = self.config.exit_function.as_deref().map(|name| declare_helper(module, name));

        let outcome = apply_plan(module, &plan)?;
        let injected = inject_extraction(module, &plan.targets, extraction)?;
        let exit_calls = match exit {
            Some(exit) => inject_exit(module, &plan.targets, extraction, exit)?.len(),
            None => 0,
        };
        let strip = if self.config.strip_debug {
            Some(strip_debug_info(module, &protected)?)
        } else {
            None
        };

        info!(
            "slice: kept {} function(s), removed {}, injected {} extraction call(s)",
            outcome.kept_functions.len(),
            outcome.removed_functions.len(),
            injected.len()
        );

        let (file, line) = self.config.target()?;
        Ok(SliceReport {
            module: module.name.clone(),
            backend: self.backend.name().to_string(),
            source_function: self.config.source_function.clone(),
            target: format!("{file}:{line}"),
            targets: target_names,
            path,
            kept_functions: outcome.kept_functions,
            removed_functions: outcome.removed_functions,
            erased_call_sites: outcome.erased_call_sites,
            injected_calls: injected.len(),
            exit_calls,
            strip,
        })
    }
}
