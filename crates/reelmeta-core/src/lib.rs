//! # Reelmeta Core
//!
//! Plugin orchestration core for the Reelmeta media-metadata enrichment
//! engine. This crate owns manifest discovery, plugin instantiation,
//! dependency planning, per-match execution, and response/task assembly.
//! It never parses a CLI argument, reads a configuration file from disk, or
//! initializes a logging subscriber — those are the embedding binary's job.
pub mod config;
pub mod dependency;
pub mod error;
pub mod executor;
pub mod manifest;
pub mod plugin;
pub mod response;
pub mod task;

pub use config::Config;
pub use error::{Error, Result};
pub use executor::Pipeline;
pub use manifest::{ManifestRegistry, PluginCategory, PluginManifest};
pub use plugin::{Plugin, PluginContext, PluginOutcome, PluginResult, PluginStatus};
pub use plugin::loader::{PluginConfigEntry, PluginFactory, PluginLoader};
pub use response::{Match, MatchStatus, Response, TaskOutcome};
