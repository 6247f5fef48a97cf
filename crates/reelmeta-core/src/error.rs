//! # Reelmeta Core Errors
//!
//! Defines the error types raised by each orchestration component and the
//! top-level [`Error`] enum that aggregates them via `#[from]` conversions,
//! the same shape the plugin/stage subsystems this crate grew out of used.
use std::path::PathBuf;

/// Errors raised while discovering and validating plugin manifests.
#[derive(Debug, thiserror::Error)]
pub enum ManifestError {
    #[error("failed to read manifest at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse manifest at {path}: {message}")]
    Parse { path: PathBuf, message: String },

    #[error("manifest at {path} is invalid: {message}")]
    Invalid { path: PathBuf, message: String },

    #[error("duplicate plugin name '{name}' declared in {first} and {second}")]
    DuplicateName {
        name: String,
        first: PathBuf,
        second: PathBuf,
    },
}

/// Errors raised while instantiating enabled plugins.
#[derive(Debug, thiserror::Error)]
pub enum LoaderError {
    #[error("no manifest found for enabled plugin '{0}'")]
    UnknownPlugin(String),

    #[error("no factory registered for locator '{locator}' (plugin '{plugin}')")]
    UnresolvedLocator { plugin: String, locator: String },

    #[error("failed to construct plugin '{plugin}': {message}")]
    ConstructionFailed { plugin: String, message: String },
}

/// Errors raised while planning the dependency graph of output plugins.
#[derive(Debug, thiserror::Error)]
pub enum DependencyError {
    #[error("plugin '{plugin}' depends on unknown or disabled plugin '{depends_on}'")]
    UnknownDependency { plugin: String, depends_on: String },

    #[error("plugin '{plugin}' expects data from unknown or disabled plugin '{expects}'")]
    UnknownExpectation { plugin: String, expects: String },

    #[error("dependency cycle detected among plugins: {}", .members.join(", "))]
    Cycle { members: Vec<String> },
}

/// Errors raised while rendering or executing a task.
#[derive(Debug, thiserror::Error)]
pub enum TaskError {
    #[error("failed to render template for task '{task}': {message}")]
    Render { task: String, message: String },

    #[error("failed to write output for task '{task}': {source}")]
    Io {
        task: String,
        #[source]
        source: std::io::Error,
    },
}

/// Top-level error aggregating every orchestration-phase failure.
///
/// Only the variants wrapping startup phases (manifest loading, plugin
/// loading, dependency planning) are fatal to the process; per-plugin and
/// per-task failures are caught at their own boundary and folded into the
/// outcome records the response document carries, never into this enum.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("manifest registry error: {0}")]
    Manifest(#[from] ManifestError),

    #[error("plugin loader error: {0}")]
    Loader(#[from] LoaderError),

    #[error("dependency resolution error: {0}")]
    Dependency(#[from] DependencyError),

    #[error("task runner error: {0}")]
    Task(#[from] TaskError),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("batch aborted")]
    Aborted,
}

pub type Result<T> = std::result::Result<T, Error>;
