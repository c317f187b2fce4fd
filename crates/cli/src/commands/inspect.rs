use anyhow::{anyhow, Result};
use pathcut_core::analysis::{build_call_graph, build_dependency_blocks, BlockId};
use pathcut_core::config::{SliceConfig, DEFAULT_BACKEND};
use pathcut_core::dependence::DependenceQuery;
use pathcut_core::ir::InstrId;
use pathcut_core::locate::locate_targets;
use pathcut_core::pipeline::{PathStep, SliceRunner};
use serde::Serialize;

use crate::commands::util::{read_module, BackendOptions};

#[derive(Debug, Serialize)]
pub struct BlockInfo {
    pub block: BlockId,
    pub function: String,
    pub instructions: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct DependencyInfo {
    pub instruction: String,
    pub text: String,
    pub control: Vec<String>,
    pub rev_control: Vec<String>,
    pub data: Vec<String>,
    pub rev_data: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct CallEdgeInfo {
    pub block: BlockId,
    pub function: String,
    pub callee: String,
}

#[derive(Debug, Serialize)]
pub struct LocatedInfo {
    pub function: String,
    pub instruction: String,
    pub text: String,
}

/// Print a module, as text or as its JSON document.
pub fn dump_command(module_path: &str, json: bool) -> Result<()> {
    let module = read_module(module_path)?;
    if json {
        println!("{}", serde_json::to_string_pretty(&module.to_doc())?);
    } else {
        print!("{}", module.display());
    }
    Ok(())
}

/// Print the dependency blocks of every function, or of `function` only.
pub fn blocks_command(
    module_path: &str,
    function: Option<&str>,
    backend: &BackendOptions,
    json: bool,
) -> Result<()> {
    let module = read_module(module_path)?;
    let filter = match function {
        Some(name) => Some(
            module
                .function_by_name(name)
                .ok_or_else(|| anyhow!("Function @{name} not found in {module_path}"))?,
        ),
        None => None,
    };

    let registry = backend.registry()?;
    let deps = registry.require(&backend.backend_name(DEFAULT_BACKEND))?.analyze(&module)?;
    let blocks = build_dependency_blocks(&module, &deps);

    let entries: Vec<BlockInfo> = blocks
        .iter()
        .filter(|b| filter.map_or(true, |f| b.function == f))
        .map(|b| BlockInfo {
            block: b.id,
            function: module.function_name(b.function).to_string(),
            instructions: b.instructions.iter().map(|i| module.describe(*i)).collect(),
        })
        .collect();

    if json {
        println!("{}", serde_json::to_string_pretty(&entries)?);
        return Ok(());
    }

    if entries.is_empty() {
        println!("Blocks: (none)");
        return Ok(());
    }
    println!("Blocks:");
    for entry in entries {
        println!("- {} @{}: {}", entry.block, entry.function, entry.instructions.join(", "));
    }
    Ok(())
}

/// Print the control and data dependencies of every instruction, or of the
/// instructions in `function` only.
pub fn deps_command(
    module_path: &str,
    function: Option<&str>,
    backend: &BackendOptions,
    json: bool,
) -> Result<()> {
    let module = read_module(module_path)?;
    let filter = match function {
        Some(name) => Some(
            module
                .function_by_name(name)
                .ok_or_else(|| anyhow!("Function @{name} not found in {module_path}"))?,
        ),
        None => None,
    };

    let registry = backend.registry()?;
    let deps = registry.require(&backend.backend_name(DEFAULT_BACKEND))?.analyze(&module)?;
    let describe = |ids: &[InstrId]| -> Vec<String> {
        ids.iter().map(|i| module.describe(*i)).collect()
    };

    let entries: Vec<DependencyInfo> = module
        .all_instructions()
        .filter(|i| filter.map_or(true, |f| i.parent() == f))
        .map(|inst| DependencyInfo {
            instruction: module.describe(inst.id()),
            text: module.render_instruction(inst),
            control: describe(deps.control_deps(inst.id())),
            rev_control: describe(deps.rev_control_deps(inst.id())),
            data: describe(deps.data_deps(inst.id())),
            rev_data: describe(deps.rev_data_deps(inst.id())),
        })
        .collect();

    if json {
        println!("{}", serde_json::to_string_pretty(&entries)?);
        return Ok(());
    }

    if entries.is_empty() {
        println!("Dependencies: (none)");
        return Ok(());
    }
    println!("Dependencies:");
    for entry in entries {
        println!("- {}: {}", entry.instruction, entry.text);
        println!("    control: [{}]", entry.control.join(", "));
        println!("    rev control: [{}]", entry.rev_control.join(", "));
        println!("    data: [{}]", entry.data.join(", "));
        println!("    rev data: [{}]", entry.rev_data.join(", "));
    }
    Ok(())
}

/// Print every block -> callee edge.
pub fn callgraph_command(module_path: &str, backend: &BackendOptions, json: bool) -> Result<()> {
    let module = read_module(module_path)?;
    let registry = backend.registry()?;
    let deps = registry.require(&backend.backend_name(DEFAULT_BACKEND))?.analyze(&module)?;
    let blocks = build_dependency_blocks(&module, &deps);
    let graph = build_call_graph(&module, &blocks)?;

    let edges: Vec<CallEdgeInfo> = graph
        .edges()
        .into_iter()
        .map(|(block, callee)| CallEdgeInfo {
            block,
            function: blocks
                .block(block)
                .map(|b| module.function_name(b.function).to_string())
                .unwrap_or_default(),
            callee: module.function_name(callee).to_string(),
        })
        .collect();

    if json {
        println!("{}", serde_json::to_string_pretty(&edges)?);
        return Ok(());
    }

    if edges.is_empty() {
        println!("Call graph: (no calls)");
        return Ok(());
    }
    println!("Call graph:");
    for edge in edges {
        println!("- {} (@{}) -> @{}", edge.block, edge.function, edge.callee);
    }
    Ok(())
}

/// List the instructions located at `file:line`.
pub fn locate_command(module_path: &str, file: &str, line: u32, json: bool) -> Result<()> {
    let module = read_module(module_path)?;
    let targets = locate_targets(&module, file, line)?;

    let entries: Vec<LocatedInfo> = targets
        .iter()
        .filter_map(|t| module.instruction(*t))
        .map(|inst| LocatedInfo {
            function: module.function_name(inst.parent()).to_string(),
            instruction: module.describe(inst.id()),
            text: module.render_instruction(inst),
        })
        .collect();

    if json {
        println!("{}", serde_json::to_string_pretty(&entries)?);
        return Ok(());
    }

    println!("Instructions at {file}:{line}:");
    for entry in entries {
        println!("- {}: {}", entry.instruction, entry.text);
    }
    Ok(())
}

/// Print the path from `source` to `file:line` without modifying anything.
pub fn path_command(
    module_path: &str,
    source: Option<&str>,
    file: &str,
    line: u32,
    backend: &BackendOptions,
    json: bool,
) -> Result<()> {
    let module = read_module(module_path)?;
    let mut config = SliceConfig::for_target(file, line);
    if let Some(source) = source {
        config.source_function = source.to_string();
    }
    config.backend = backend.backend_name(&config.backend);

    let registry = backend.registry()?;
    let runner = SliceRunner::new(config.clone(), registry.require(&config.backend)?);
    let analysis = runner.analyze(&module)?;
    let steps: Vec<PathStep> = analysis.steps(&module);

    if json {
        println!("{}", serde_json::to_string_pretty(&steps)?);
        return Ok(());
    }

    println!("Path from @{} to {file}:{line}:", config.source_function);
    for step in steps {
        println!("- @{} {} ({} instruction(s))", step.function, step.block, step.instructions);
    }
    Ok(())
}
