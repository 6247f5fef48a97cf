//! Canonical response document (component C5, §6.1) and the per-match
//! records the executor builds on the way there. Assembly here is strictly
//! plugin-agnostic: only `status.*` and the top-level `category` signal are
//! ever inspected; everything else is copied through verbatim.
use chrono::{DateTime, Utc};
use serde_json::{Map, Value};

use crate::config::Config;
use crate::plugin::PluginResult;

/// Outcome of a single task run against one match.
#[derive(Debug, Clone)]
pub struct TaskOutcome {
    pub name: String,
    pub kind: String,
    pub success: bool,
    pub rendered: Option<String>,
    pub destination: Option<String>,
    pub dry_run: bool,
    pub error: Option<String>,
}

impl TaskOutcome {
    fn to_json(&self) -> Value {
        let mut map = Map::new();
        map.insert("name".into(), Value::String(self.name.clone()));
        map.insert("type".into(), Value::String(self.kind.clone()));
        map.insert("success".into(), Value::Bool(self.success));
        if let Some(r) = &self.rendered {
            map.insert("rendered".into(), Value::String(r.clone()));
        }
        if let Some(d) = &self.destination {
            map.insert("destination".into(), Value::String(d.clone()));
        }
        map.insert("dry_run".into(), Value::Bool(self.dry_run));
        if let Some(e) = &self.error {
            map.insert("error".into(), Value::String(e.clone()));
        }
        Value::Object(map)
    }
}

/// Aggregate status for a single match: the three disjoint outcome lists
/// plus timing.
#[derive(Debug, Clone)]
pub struct MatchStatus {
    pub success_plugins: Vec<String>,
    pub failed_plugins: Vec<String>,
    pub not_supported_plugins: Vec<String>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl MatchStatus {
    pub fn success(&self) -> bool {
        self.failed_plugins.is_empty()
    }

    pub fn duration_ms(&self) -> i64 {
        (self.finished_at - self.started_at).num_milliseconds()
    }

    fn to_json(&self) -> Value {
        let mut map = Map::new();
        map.insert("success".into(), Value::Bool(self.success()));
        map.insert(
            "success_plugins".into(),
            Value::Array(self.success_plugins.iter().cloned().map(Value::String).collect()),
        );
        map.insert(
            "failed_plugins".into(),
            Value::Array(self.failed_plugins.iter().cloned().map(Value::String).collect()),
        );
        map.insert(
            "not_supported_plugins".into(),
            Value::Array(
                self.not_supported_plugins
                    .iter()
                    .cloned()
                    .map(Value::String)
                    .collect(),
            ),
        );
        map.insert("started_at".into(), Value::String(self.started_at.to_rfc3339()));
        map.insert("finished_at".into(), Value::String(self.finished_at.to_rfc3339()));
        map.insert("duration_ms".into(), Value::Number(self.duration_ms().into()));
        Value::Object(map)
    }
}

/// One unit of work processed by the pipeline.
#[derive(Debug, Clone)]
pub struct Match {
    pub index: usize,
    pub input_path: String,
    pub results: Map<String, Value>,
    pub category: Option<String>,
    pub status: Option<MatchStatus>,
    pub tasks: Vec<TaskOutcome>,
}

impl Match {
    pub fn new(index: usize, input_path: String, results: Map<String, Value>) -> Self {
        Self {
            index,
            input_path,
            results,
            category: None,
            status: None,
            tasks: Vec::new(),
        }
    }

    /// Splice a plugin's result into this match's accumulated results and
    /// propagate its `category` field if present, regardless of which
    /// plugin produced it.
    pub fn record_plugin_result(&mut self, plugin_name: &str, result: &PluginResult) {
        if let Some(category) = &result.category {
            self.category = Some(category.clone());
        }
        self.results
            .insert(plugin_name.to_string(), result.to_json());
    }

    fn to_json(&self) -> Value {
        let status = self
            .status
            .as_ref()
            .map(MatchStatus::to_json)
            .unwrap_or(Value::Null);

        let mut globals = Map::new();
        globals.insert("index".into(), Value::Number(self.index.into()));
        globals.insert("input_path".into(), Value::String(self.input_path.clone()));
        globals.insert("status".into(), status);
        let mut output = Map::new();
        output.insert(
            "tasks".into(),
            Value::Array(self.tasks.iter().map(TaskOutcome::to_json).collect()),
        );
        globals.insert("output".into(), Value::Object(output));

        let mut plugins = Map::new();
        for (name, value) in &self.results {
            plugins.insert(name.clone(), value.clone());
        }

        let mut entry = Map::new();
        entry.insert("globals".into(), Value::Object(globals));
        entry.insert("plugins".into(), Value::Object(plugins));
        Value::Object(entry)
    }
}

/// The canonical response document, built incrementally as matches
/// complete and finalized once the batch ends.
#[derive(Debug, Clone, Default)]
pub struct Response {
    pub matches: Vec<Match>,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
    pub input_plugin_used: Option<String>,
    pub output_plugins_used: Vec<String>,
    pub categories: Vec<String>,
}

impl Response {
    pub fn errors(&self) -> usize {
        self.matches
            .iter()
            .filter(|m| m.status.as_ref().map(|s| !s.success()).unwrap_or(false))
            .count()
    }

    pub fn success(&self) -> bool {
        self.errors() == 0
    }

    fn total_size_bytes(&self) -> u64 {
        self.matches
            .iter()
            .flat_map(|m| m.results.values())
            .filter_map(|v| v.get("size_bytes").and_then(Value::as_u64))
            .sum()
    }

    fn total_duration_seconds(&self) -> f64 {
        self.matches
            .iter()
            .flat_map(|m| m.results.values())
            .filter_map(|v| v.get("status")?.get("duration_ms")?.as_i64())
            .sum::<i64>() as f64
            / 1000.0
    }

    /// Render the full canonical document described in §6.1.
    pub fn to_json(&self, config: &Config) -> Value {
        let started_at = self.started_at.unwrap_or_else(Utc::now);
        let finished_at = self.finished_at.unwrap_or_else(Utc::now);
        let duration_ms = (finished_at - started_at).num_milliseconds();

        let mut status = Map::new();
        status.insert("success".into(), Value::Bool(self.success()));
        status.insert("started_at".into(), Value::String(started_at.to_rfc3339()));
        status.insert("finished_at".into(), Value::String(finished_at.to_rfc3339()));
        status.insert("duration_ms".into(), Value::Number(duration_ms.into()));
        status.insert("matches".into(), Value::Number(self.matches.len().into()));
        status.insert(
            "tasks".into(),
            Value::Number(self.matches.iter().map(|m| m.tasks.len()).sum::<usize>().into()),
        );
        status.insert("errors".into(), Value::Number(self.errors().into()));

        let mut summary = Map::new();
        summary.insert(
            "input_plugin_used".into(),
            self.input_plugin_used
                .clone()
                .map(Value::String)
                .unwrap_or(Value::Null),
        );
        summary.insert(
            "output_plugins_used".into(),
            Value::Array(self.output_plugins_used.iter().cloned().map(Value::String).collect()),
        );
        summary.insert(
            "categories".into(),
            Value::Array(self.categories.iter().cloned().map(Value::String).collect()),
        );
        summary.insert(
            "total_size_bytes".into(),
            Value::Number(self.total_size_bytes().into()),
        );
        summary.insert(
            "total_duration_seconds".into(),
            serde_json::Number::from_f64(self.total_duration_seconds())
                .map(Value::Number)
                .unwrap_or(Value::Null),
        );

        let config_snapshot = serde_json::to_value(config).unwrap_or(Value::Null);

        let mut globals = Map::new();
        globals.insert("status".into(), Value::Object(status));
        globals.insert("summary".into(), Value::Object(summary));
        globals.insert("config".into(), config_snapshot);

        let mut doc = Map::new();
        doc.insert("globals".into(), Value::Object(globals));
        doc.insert(
            "matches".into(),
            Value::Array(self.matches.iter().map(Match::to_json).collect()),
        );
        Value::Object(doc)
    }
}
