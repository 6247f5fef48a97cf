//! Plugin loader (component C2): resolves each enabled manifest to a live
//! [`Plugin`] instance via a locator convention, backed by a compile-time
//! factory registry rather than the dynamic `.so` loading a FFI-based
//! engine would use — plugin bodies are supplied by the embedding binary,
//! not discovered on disk.
use std::collections::HashMap;
use std::sync::Arc;

use serde_json::Value;

use crate::error::LoaderError;
use crate::manifest::ManifestRegistry;
use crate::plugin::Plugin;

/// Constructs a boxed [`Plugin`] from its opaque per-plugin configuration
/// slice. Registered once per locator string at process startup.
pub type PluginFactory = Arc<dyn Fn(&Value) -> Result<Arc<dyn Plugin>, String> + Send + Sync>;

/// Per-plugin enablement and configuration, as read from `plugins.<name>`.
#[derive(Debug, Clone, Default)]
pub struct PluginConfigEntry {
    pub enabled: bool,
    pub config: Value,
}

/// Maps locator strings (explicit `class_hint` or name-convention-derived)
/// to factories. The loader never matches on a plugin's own name; the
/// locator is the entire contract.
#[derive(Default)]
pub struct PluginLoader {
    factories: HashMap<String, PluginFactory>,
}

impl PluginLoader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a factory under an explicit locator string.
    pub fn register(&mut self, locator: impl Into<String>, factory: PluginFactory) -> &mut Self {
        self.factories.insert(locator.into(), factory);
        self
    }

    /// Derive a locator from a plugin name per the naming convention:
    /// split on `_`/`-`, capitalize each part, append `Plugin`.
    pub fn derive_locator(name: &str) -> String {
        let mut hint = String::new();
        for part in name.split(['_', '-']) {
            let mut chars = part.chars();
            if let Some(first) = chars.next() {
                hint.extend(first.to_uppercase());
                hint.push_str(chars.as_str());
            }
        }
        hint.push_str("Plugin");
        hint
    }

    /// Instantiate every manifest whose `plugins.<name>.enabled` is true.
    pub fn load_enabled(
        &self,
        registry: &ManifestRegistry,
        configs: &HashMap<String, PluginConfigEntry>,
    ) -> Result<HashMap<String, Arc<dyn Plugin>>, LoaderError> {
        let mut loaded = HashMap::new();

        for (name, entry) in configs {
            if !entry.enabled {
                continue;
            }
            let manifest = registry
                .get(name)
                .ok_or_else(|| LoaderError::UnknownPlugin(name.clone()))?;

            let locator = manifest
                .class_hint
                .clone()
                .unwrap_or_else(|| Self::derive_locator(&manifest.name));

            let factory = self
                .factories
                .get(&locator)
                .ok_or_else(|| LoaderError::UnresolvedLocator {
                    plugin: name.clone(),
                    locator: locator.clone(),
                })?;

            let plugin = factory(&entry.config).map_err(|message| LoaderError::ConstructionFailed {
                plugin: name.clone(),
                message,
            })?;

            loaded.insert(name.clone(), plugin);
        }

        Ok(loaded)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derive_locator_applies_naming_convention() {
        assert_eq!(PluginLoader::derive_locator("mock_test"), "MockTestPlugin");
        assert_eq!(PluginLoader::derive_locator("mock-test"), "MockTestPlugin");
        assert_eq!(PluginLoader::derive_locator("solo"), "SoloPlugin");
    }
}
