//! Configuration-file loading: the one piece of `options`/`plugins`/`tasks`
//! handling the core deliberately stays out of. Format detection mirrors
//! the extension-sniffing `ConfigFormat` this binary's sibling library
//! crate uses for its own on-disk configuration.
use std::path::Path;

use reelmeta_core::Config;

#[derive(Debug, thiserror::Error)]
pub enum ConfigLoadError {
    #[error("failed to read config file {path}: {source}")]
    Io {
        path: std::path::PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config file {path}: {message}")]
    Parse { path: std::path::PathBuf, message: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    Json,
    Yaml,
    Toml,
}

impl ConfigFormat {
    pub fn from_path(path: &Path) -> Option<Self> {
        path.extension()
            .and_then(|ext| ext.to_str())
            .and_then(|ext| match ext.to_lowercase().as_str() {
                "json" => Some(ConfigFormat::Json),
                "yaml" | "yml" => Some(ConfigFormat::Yaml),
                "toml" => Some(ConfigFormat::Toml),
                _ => None,
            })
    }
}

/// Load and parse a configuration document, choosing a parser by the file
/// extension of `path` and falling back to JSON if the extension is
/// unrecognized.
pub fn load(path: &Path) -> Result<Config, ConfigLoadError> {
    let contents = std::fs::read_to_string(path).map_err(|source| ConfigLoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    let format = ConfigFormat::from_path(path).unwrap_or(ConfigFormat::Json);
    let config = match format {
        ConfigFormat::Json => serde_json::from_str(&contents).map_err(|e| ConfigLoadError::Parse {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?,
        ConfigFormat::Yaml => serde_yaml::from_str(&contents).map_err(|e| ConfigLoadError::Parse {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?,
        ConfigFormat::Toml => toml::from_str(&contents).map_err(|e| ConfigLoadError::Parse {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?,
    };
    Ok(config)
}
