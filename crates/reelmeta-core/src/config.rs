//! Configuration surface the core reads (component boundary: §6.4).
//!
//! Loading a config file from disk, detecting its format, and applying CLI
//! overrides are the embedding binary's concern; this module only defines
//! the shapes the core's components deserialize their slice from, mirroring
//! the `ConfigData` pattern this crate's configuration layer is descended
//! from.
use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::plugin::loader::PluginConfigEntry;

/// Batch-wide execution options (`options.*`).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Options {
    pub dry_run: bool,
    pub debug: bool,
    pub hardlink: bool,
    pub worker_pool_size: Option<usize>,
    pub plugin_timeout_ms: Option<u64>,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            dry_run: false,
            debug: false,
            hardlink: false,
            worker_pool_size: None,
            plugin_timeout_ms: None,
        }
    }
}

/// One entry of `plugins.<name>` as read from the config file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PluginConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(flatten)]
    pub settings: Value,
}

/// One entry of the `tasks` list.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskConfig {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: TaskKind,
    #[serde(default)]
    pub condition: Option<String>,
    pub template: String,
    #[serde(default)]
    pub destination: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskKind {
    Print,
    Save,
    Summary,
}

/// The full configuration document: `options`, `plugins`, and `tasks`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub options: Options,
    pub plugins: HashMap<String, PluginConfig>,
    pub tasks: Vec<TaskConfig>,
}

impl Config {
    /// Convert `plugins.*` into the loader's [`PluginConfigEntry`] map.
    pub fn plugin_config_entries(&self) -> HashMap<String, PluginConfigEntry> {
        self.plugins
            .iter()
            .map(|(name, cfg)| {
                (
                    name.clone(),
                    PluginConfigEntry {
                        enabled: cfg.enabled,
                        config: cfg.settings.clone(),
                    },
                )
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deserializes_minimal_document() {
        let json = r#"{
            "options": {"debug": true},
            "plugins": {"probe": {"enabled": true, "api_key": "x"}},
            "tasks": [{"name": "log", "type": "print", "template": "{{input_path}}"}]
        }"#;
        let config: Config = serde_json::from_str(json).unwrap();
        assert!(config.options.debug);
        assert!(config.plugins["probe"].enabled);
        assert_eq!(config.tasks[0].kind, TaskKind::Print);
    }
}
