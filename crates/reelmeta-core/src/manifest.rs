//! Plugin manifest model and the on-disk manifest registry (component C1).
//!
//! A manifest describes a plugin without instantiating it: its category,
//! its static `depends_on` edges, and the runtime `expects` paths the
//! dependency resolver gates execution on. The registry enumerates the
//! immediate subdirectories of a plugin root and validates every
//! `plugin.json` it finds.
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::ManifestError;

pub const MANIFEST_FILE_NAME: &str = "plugin.json";

/// Category a plugin manifest declares itself as.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PluginCategory {
    Input,
    Output,
}

/// A single `expects` entry: either a top-level key (`K`) or a first-level
/// subkey of a top-level map value (`K.S`).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ExpectsPath {
    pub key: String,
    pub subkey: Option<String>,
}

impl ExpectsPath {
    pub fn parse(raw: &str) -> Option<Self> {
        let mut parts = raw.splitn(2, '.');
        let key = parts.next()?.to_string();
        if key.is_empty() {
            return None;
        }
        let subkey = match parts.next() {
            Some(s) if !s.is_empty() => Some(s.to_string()),
            Some(_) => return None,
            None => None,
        };
        Some(Self { key, subkey })
    }

    /// The plugin name this path's first segment resolves to.
    pub fn plugin(&self) -> &str {
        &self.key
    }
}

impl std::fmt::Display for ExpectsPath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.subkey {
            Some(s) => write!(f, "{}.{}", self.key, s),
            None => write!(f, "{}", self.key),
        }
    }
}

/// Raw, not-yet-validated manifest as deserialized from `plugin.json`.
#[derive(Debug, Deserialize)]
struct RawManifest {
    name: String,
    version: String,
    category: PluginCategory,
    #[serde(default)]
    class_hint: Option<String>,
    #[serde(default)]
    depends_on: Vec<String>,
    #[serde(default)]
    expects: Vec<String>,
    #[serde(default)]
    categories_supported: Vec<String>,
}

/// A validated plugin manifest.
#[derive(Debug, Clone)]
pub struct PluginManifest {
    pub name: String,
    pub version: String,
    pub category: PluginCategory,
    pub class_hint: Option<String>,
    pub depends_on: HashSet<String>,
    pub expects: HashSet<ExpectsPath>,
    pub categories_supported: HashSet<String>,
    pub source: PathBuf,
}

impl PluginManifest {
    fn from_raw(raw: RawManifest, source: PathBuf) -> Result<Self, ManifestError> {
        if raw.name.trim().is_empty() {
            return Err(ManifestError::Invalid {
                path: source,
                message: "plugin name must not be empty".into(),
            });
        }
        let mut expects = HashSet::new();
        for entry in &raw.expects {
            let parsed = ExpectsPath::parse(entry).ok_or_else(|| ManifestError::Invalid {
                path: source.clone(),
                message: format!("invalid expects path '{entry}'"),
            })?;
            expects.insert(parsed);
        }
        Ok(Self {
            name: raw.name,
            version: raw.version,
            category: raw.category,
            class_hint: raw.class_hint,
            depends_on: raw.depends_on.into_iter().collect(),
            expects,
            categories_supported: raw.categories_supported.into_iter().collect(),
            source,
        })
    }
}

/// Name-indexed set of validated manifests, produced by scanning a plugin
/// root directory non-recursively (one level of subdirectories).
#[derive(Debug, Default, Clone)]
pub struct ManifestRegistry {
    manifests: HashMap<String, PluginManifest>,
}

impl ManifestRegistry {
    /// Build a registry directly from already-validated manifests, bypassing
    /// the filesystem scan. Useful for embedding applications that source
    /// manifests from somewhere other than a plugin directory, and for
    /// tests.
    pub fn from_manifests(manifests: impl IntoIterator<Item = PluginManifest>) -> Self {
        Self {
            manifests: manifests.into_iter().map(|m| (m.name.clone(), m)).collect(),
        }
    }

    pub fn get(&self, name: &str) -> Option<&PluginManifest> {
        self.manifests.get(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &PluginManifest> {
        self.manifests.values()
    }

    pub fn len(&self) -> usize {
        self.manifests.len()
    }

    pub fn is_empty(&self) -> bool {
        self.manifests.is_empty()
    }

    /// Scan the immediate subdirectories of `root` for `plugin.json` files,
    /// parse and validate each, and index them by name.
    pub async fn load(root: impl AsRef<Path>) -> Result<Self, ManifestError> {
        let root = root.as_ref();
        let mut entries = tokio::fs::read_dir(root)
            .await
            .map_err(|source| ManifestError::Io {
                path: root.to_path_buf(),
                source,
            })?;

        let mut manifests: HashMap<String, PluginManifest> = HashMap::new();

        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|source| ManifestError::Io {
                path: root.to_path_buf(),
                source,
            })?
        {
            let path = entry.path();
            let file_type = match entry.file_type().await {
                Ok(ft) => ft,
                Err(_) => continue,
            };
            if !file_type.is_dir() {
                continue;
            }

            let manifest_path = path.join(MANIFEST_FILE_NAME);
            if !manifest_path.is_file() {
                continue;
            }

            let contents =
                tokio::fs::read_to_string(&manifest_path)
                    .await
                    .map_err(|source| ManifestError::Io {
                        path: manifest_path.clone(),
                        source,
                    })?;

            let raw: RawManifest =
                serde_json::from_str(&contents).map_err(|e| ManifestError::Parse {
                    path: manifest_path.clone(),
                    message: e.to_string(),
                })?;

            let manifest = PluginManifest::from_raw(raw, manifest_path.clone())?;

            if let Some(existing) = manifests.get(&manifest.name) {
                return Err(ManifestError::DuplicateName {
                    name: manifest.name.clone(),
                    first: existing.source.clone(),
                    second: manifest_path,
                });
            }

            manifests.insert(manifest.name.clone(), manifest);
        }

        Ok(Self { manifests })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn expects_path_parses_single_segment() {
        let p = ExpectsPath::parse("foo").unwrap();
        assert_eq!(p.key, "foo");
        assert_eq!(p.subkey, None);
    }

    #[test]
    fn expects_path_parses_two_segments() {
        let p = ExpectsPath::parse("foo.bar").unwrap();
        assert_eq!(p.key, "foo");
        assert_eq!(p.subkey.as_deref(), Some("bar"));
    }

    #[test]
    fn expects_path_rejects_empty_segments() {
        assert!(ExpectsPath::parse("").is_none());
        assert!(ExpectsPath::parse(".bar").is_none());
        assert!(ExpectsPath::parse("foo.").is_none());
    }

    #[tokio::test]
    async fn load_scans_immediate_subdirectories_only() {
        let dir = tempfile::tempdir().unwrap();
        let plugin_dir = dir.path().join("alpha");
        tokio::fs::create_dir_all(&plugin_dir).await.unwrap();
        tokio::fs::write(
            plugin_dir.join(MANIFEST_FILE_NAME),
            r#"{"name":"alpha","version":"0.1.0","category":"output"}"#,
        )
        .await
        .unwrap();

        let nested = plugin_dir.join("nested");
        tokio::fs::create_dir_all(&nested).await.unwrap();
        tokio::fs::write(
            nested.join(MANIFEST_FILE_NAME),
            r#"{"name":"should-not-load","version":"0.1.0","category":"output"}"#,
        )
        .await
        .unwrap();

        let registry = ManifestRegistry::load(dir.path()).await.unwrap();
        assert_eq!(registry.len(), 1);
        assert!(registry.get("alpha").is_some());
        assert!(registry.get("should-not-load").is_none());
    }

    #[tokio::test]
    async fn load_rejects_duplicate_names() {
        let dir = tempfile::tempdir().unwrap();
        for sub in ["a", "b"] {
            let plugin_dir = dir.path().join(sub);
            tokio::fs::create_dir_all(&plugin_dir).await.unwrap();
            tokio::fs::write(
                plugin_dir.join(MANIFEST_FILE_NAME),
                r#"{"name":"dup","version":"0.1.0","category":"output"}"#,
            )
            .await
            .unwrap();
        }

        let err = ManifestRegistry::load(dir.path()).await.unwrap_err();
        assert!(matches!(err, ManifestError::DuplicateName { .. }));
    }
}
