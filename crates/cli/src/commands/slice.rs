use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use chrono::Utc;
use pathcut_core::config::{load_slice_config, SliceConfig};
use pathcut_core::ir::save_module;
use pathcut_core::pipeline::{SliceReport, SliceRunner};
use serde::Serialize;

use crate::commands::util::{read_module, BackendOptions};
use crate::sha256_file;

/// Inputs of the `slice` command. Flags override values from `config`.
#[derive(Debug, Clone, Default)]
pub struct SliceArgs {
    pub module: String,
    pub config: Option<String>,
    pub source: Option<String>,
    pub file: Option<String>,
    pub line: Option<u32>,
    pub protect: Vec<String>,
    pub backend: BackendOptions,
    pub output: Option<String>,
    pub report: Option<String>,
    pub no_strip: bool,
    pub verbose: bool,
}

/// Report written by `slice --report`.
#[derive(Debug, Serialize)]
pub struct SliceRunRecord {
    pub input: String,
    pub input_sha256: String,
    pub output: Option<String>,
    pub generated_at: String,
    pub config: SliceConfig,
    #[serde(flatten)]
    pub report: SliceReport,
}

/// Merge the config file (if any) with the command-line overrides.
pub fn resolve_slice_config(args: &SliceArgs) -> Result<SliceConfig> {
    let mut config = match &args.config {
        Some(path) => load_slice_config(Path::new(path))?,
        None => SliceConfig::default(),
    };
    if let Some(source) = &args.source {
        config.source_function = source.clone();
    }
    if let Some(file) = &args.file {
        config.target_file = Some(file.clone());
    }
    if let Some(line) = args.line {
        config.target_line = Some(line);
    }
    for name in &args.protect {
        if !config.protected_functions.contains(name) {
            config.protected_functions.push(name.clone());
        }
    }
    if args.no_strip {
        config.strip_debug = false;
    }
    if args.verbose {
        config.verbose = true;
    }
    config.backend = args.backend.backend_name(&config.backend);
    Ok(config)
}

/// Slice a module file and write the result.
pub fn slice_command(args: &SliceArgs) -> Result<()> {
    let config = resolve_slice_config(args)?;
    let mut module = read_module(&args.module)?;
    let input_sha256 = sha256_file(Path::new(&args.module))?;

    let registry = args.backend.registry()?;
    let backend = registry.require(&config.backend)?;
    let runner = SliceRunner::new(config.clone(), backend);
    let report = runner
        .run(&mut module)
        .with_context(|| format!("Slicing {} failed", args.module))?;

    match &args.output {
        Some(output) => save_module(&module, Path::new(output))?,
        None => print!("{}", module.display()),
    }

    if let Some(report_path) = &args.report {
        let record = SliceRunRecord {
            input: args.module.clone(),
            input_sha256,
            output: args.output.clone(),
            generated_at: Utc::now().to_rfc3339(),
            config,
            report: report.clone(),
        };
        let json = serde_json::to_string_pretty(&record)?;
        fs::write(report_path, json)
            .with_context(|| format!("Failed to write slice report to {report_path}"))?;
    }

    // Keep stdout clean for the module text when no output file is given.
    if args.output.is_some() {
        println!("Sliced module {}:", report.module);
        println!("  Target: {} ({} instruction(s))", report.target, report.targets.len());
        let path: Vec<String> =
            report.path.iter().map(|s| format!("@{}[{}]", s.function, s.block)).collect();
        println!("  Path: {}", path.join(" -> "));
        println!("  Kept: {}", report.kept_functions.join(", "));
        println!("  Removed: {}", report.removed_functions.join(", "));
        println!("  Extraction calls: {}", report.injected_calls);
        if let Some(output) = &args.output {
            println!("  Output: {output}");
        }
    }

    Ok(())
}
