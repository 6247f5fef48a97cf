//! The plugin invocation contract (component C2's consumer-facing half).
//!
//! Everything the core knows about a live plugin is captured by the
//! [`Plugin`] trait and the [`PluginResult`]/[`PluginStatus`] shapes it
//! returns. Concrete plugin bodies (filesystem scanners, media probes,
//! HTTP clients) are opaque to this crate; only the fields named here are
//! ever read by the executor or assembler.
pub mod loader;

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;

/// The context a plugin is invoked with: for input plugins, empty; for
/// output plugins, a snapshot of the match's accumulated results.
pub type PluginContext = HashMap<String, Value>;

/// The core-observed subset of a plugin's returned status.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct PluginStatus {
    pub success: bool,
    #[serde(default)]
    pub not_supported: bool,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub duration_ms: i64,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub validation: Option<Value>,
}

impl PluginStatus {
    pub fn outcome(&self) -> PluginOutcome {
        if self.success {
            PluginOutcome::Success
        } else if self.not_supported {
            PluginOutcome::NotSupported
        } else {
            PluginOutcome::Failed
        }
    }
}

/// The three disjoint outcomes a plugin invocation can resolve to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PluginOutcome {
    Success,
    NotSupported,
    Failed,
}

/// A plugin's full result: the core-owned `status` and `category` fields,
/// plus an opaque payload passed through verbatim into the response.
#[derive(Debug, Clone)]
pub struct PluginResult {
    pub status: PluginStatus,
    pub category: Option<String>,
    pub payload: Value,
}

impl PluginResult {
    /// Convert to the JSON object the response document embeds verbatim
    /// under `matches[i].plugins.<name>`.
    pub fn to_json(&self) -> Value {
        let mut obj = match &self.payload {
            Value::Object(map) => map.clone(),
            Value::Null => serde_json::Map::new(),
            other => {
                let mut map = serde_json::Map::new();
                map.insert("value".into(), other.clone());
                map
            }
        };
        obj.insert(
            "status".into(),
            serde_json::to_value(&self.status).unwrap_or(Value::Null),
        );
        if let Some(category) = &self.category {
            obj.insert("category".into(), Value::String(category.clone()));
        }
        Value::Object(obj)
    }
}

/// The two-method contract every plugin implements. Construction (with an
/// opaque configuration value) happens once in [`loader`]; `execute` may be
/// called many times, at most once per match.
#[async_trait]
pub trait Plugin: Send + Sync {
    /// The plugin's own name, matching its manifest entry.
    fn name(&self) -> &str;

    /// Run the plugin against the given context, returning its result.
    /// Implementations should never panic; an unexpected failure should be
    /// returned as a `status.success = false` result. A panic is still
    /// caught by the executor and converted into a failed outcome.
    async fn execute(&self, context: &PluginContext) -> PluginResult;
}

/// Construct a [`PluginStatus`] marking a clean success.
pub fn success_status(started_at: DateTime<Utc>) -> PluginStatus {
    let finished_at = Utc::now();
    PluginStatus {
        success: true,
        not_supported: false,
        duration_ms: (finished_at - started_at).num_milliseconds(),
        started_at,
        finished_at,
        error: None,
        validation: None,
    }
}
