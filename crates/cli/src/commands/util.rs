use std::path::Path;

use anyhow::{Context, Result};
use pathcut_core::dependence::{default_backend_registry, BackendRegistry, RecordedBackend};
use pathcut_core::ir::{load_module, Module};

/// Backend options shared by every command that runs the dependence analysis.
#[derive(Debug, Clone, Default)]
pub struct BackendOptions {
    /// Backend name; falls back to the config value, then `def-use`.
    pub backend: Option<String>,
    /// Recorded edge file. Selects the `recorded` backend.
    pub dependencies: Option<String>,
}

impl BackendOptions {
    /// Name of the backend to run, given the configured default.
    pub fn backend_name(&self, configured: &str) -> String {
        if self.dependencies.is_some() {
            return "recorded".to_string();
        }
        self.backend.clone().unwrap_or_else(|| configured.to_string())
    }

    /// Built-in backends, plus `recorded` when an edge file was given.
    pub fn registry(&self) -> Result<BackendRegistry> {
        let mut registry = default_backend_registry();
        if let Some(path) = &self.dependencies {
            let recorded = RecordedBackend::from_path(Path::new(path))
                .with_context(|| format!("Failed to load recorded dependencies from {path}"))?;
            registry.register(recorded);
        }
        Ok(registry)
    }
}

pub fn read_module(path: &str) -> Result<Module> {
    load_module(Path::new(path))
}
