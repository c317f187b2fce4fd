use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::error::SliceError;
use crate::ir::doc::is_json;

pub const DEFAULT_SOURCE_FUNCTION: &str = "main";
pub const DEFAULT_EXTRACTION_FUNCTION: &str = "__pathcut_extract";
pub const DEFAULT_EXIT_FUNCTION: &str = "__pathcut_exit";
pub const DEFAULT_BACKEND: &str = "def-use";

/// Settings for one slicing run.
///
/// Loaded from a JSON or YAML file with every field optional, then overridden by
/// command-line flags. The value is passed explicitly to [`crate::pipeline::SliceRunner`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SliceConfig {
    /// Entry point of the path search.
    pub source_function: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_file: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_line: Option<u32>,
    /// Functions that are never removed.
    pub protected_functions: Vec<String>,
    /// Helper receiving the target's value.
    pub extraction_function: String,
    /// Helper called after extraction to stop the program; `None` disables it.
    pub exit_function: Option<String>,
    /// Name of the dependence backend to run.
    pub backend: String,
    pub strip_debug: bool,
    /// Emit the per-stage trace at info level.
    pub verbose: bool,
}

impl Default for SliceConfig {
    fn default() -> Self {
        Self {
            source_function: DEFAULT_SOURCE_FUNCTION.to_string(),
            target_file: None,
            target_line: None,
            protected_functions: vec![
                "llvm.dbg.declare".to_string(),
                "llvm.dbg.value".to_string(),
                DEFAULT_EXTRACTION_FUNCTION.to_string(),
                DEFAULT_EXIT_FUNCTION.to_string(),
            ],
            extraction_function: DEFAULT_EXTRACTION_FUNCTION.to_string(),
            exit_function: Some(DEFAULT_EXIT_FUNCTION.to_string()),
            backend: DEFAULT_BACKEND.to_string(),
            strip_debug: true,
            verbose: false,
        }
    }
}

impl SliceConfig {
    /// Config targeting `file:line` with every other field at its default.
    pub fn for_target(file: impl Into<String>, line: u32) -> Self {
        Self { target_file: Some(file.into()), target_line: Some(line), ..Self::default() }
    }

    /// The requested target location.
    pub fn target(&self) -> Result<(&str, u32), SliceError> {
        match (self.target_file.as_deref(), self.target_line) {
            (Some(file), Some(line)) if !file.is_empty() && line > 0 => Ok((file, line)),
            (None, _) | (Some(""), _) => Err(SliceError::Config("target_file is required".into())),
            _ => Err(SliceError::Config("target_line must be a positive line number".into())),
        }
    }

    /// Checks everything a run needs before the module is touched.
    pub fn validate(&self) -> Result<(), SliceError> {
        if self.source_function.is_empty() {
            return Err(SliceError::Config("source_function must not be empty".into()));
        }
        if self.extraction_function.is_empty() {
            return Err(SliceError::Config("extraction_function must not be empty".into()));
        }
        if self.exit_function.as_deref() == Some(self.extraction_function.as_str()) {
            return Err(SliceError::Config(
                "exit_function must differ from extraction_function".into(),
            ));
        }
        self.target()?;
        Ok(())
    }

    /// Configured protected functions plus the helpers, without duplicates.
    pub fn protected_set(&self) -> Vec<String> {
        let mut out: Vec<String> = Vec::with_capacity(self.protected_functions.len() + 2);
        let helpers =
            std::iter::once(&self.extraction_function).chain(self.exit_function.as_ref());
        for name in self.protected_functions.iter().chain(helpers) {
            if !out.contains(name) {
                out.push(name.clone());
            }
        }
        out
    }
}

/// Reads a [`SliceConfig`] from disk. `.json` files are parsed as JSON, anything else
/// as YAML. Missing fields take their defaults.
pub fn load_slice_config(path: &Path) -> Result<SliceConfig> {
    let body = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read slice config at {}", path.display()))?;
    let config: SliceConfig = if is_json(path) {
        serde_json::from_str(&body).context("Failed to parse slice config JSON")?
    } else if body.trim().is_empty() {
        SliceConfig::default()
    } else {
        serde_yaml::from_str(&body).context("Failed to parse slice config YAML")?
    };
    Ok(config)
}
