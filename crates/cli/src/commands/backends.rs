use anyhow::Result;
use pathcut_core::dependence::{default_backend_registry, RecordedBackend, RecordedGraph};
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct BackendInfo {
    pub name: String,
    pub description: String,
}

/// List the dependence backends known to this binary.
pub fn list_backends_command(json: bool) -> Result<()> {
    let mut registry = default_backend_registry();
    registry.register(RecordedBackend::new(RecordedGraph::default()));

    let entries: Vec<BackendInfo> = registry
        .names()
        .into_iter()
        .map(|name| {
            let description = registry
                .get(&name)
                .map(|b| b.description())
                .filter(|d| !d.is_empty())
                .map(str::to_string)
                .unwrap_or_else(|| format!("Backend '{}'", name));
            BackendInfo { name, description }
        })
        .collect();

    if json {
        println!("{}", serde_json::to_string_pretty(&entries)?);
        return Ok(());
    }

    if entries.is_empty() {
        println!("Backends: (none)");
        return Ok(());
    }

    println!("Backends:");
    for entry in entries {
        println!("- {}: {}", entry.name, entry.description);
    }

    Ok(())
}
