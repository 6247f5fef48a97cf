//! Pipeline executor (component C4): drives input plugins to produce
//! matches, then iterates each match's execution groups, gating readiness,
//! classifying outcomes, and recording timing — mirroring the validate-then-
//! run shape of the stage pipeline this crate's orchestration loop grew out
//! of, generalized to groups of concurrently-runnable plugins.
use std::collections::HashMap;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use futures::FutureExt;
use serde_json::{Map, Value};
use tracing::{debug, info, instrument, warn};

use crate::config::Config;
use crate::dependency::{self, AvailabilitySet, ExecutionPlan};
use crate::manifest::{ManifestRegistry, PluginCategory};
use crate::plugin::{Plugin, PluginContext, PluginResult, PluginStatus};
use crate::response::{Match, MatchStatus, Response};
use crate::task::TaskRunner;

/// Everything the executor needs to run one batch: the validated manifest
/// set, the instantiated plugins, and the output execution plan.
pub struct Pipeline {
    manifests: ManifestRegistry,
    plugins: HashMap<String, Arc<dyn Plugin>>,
    plan: ExecutionPlan,
}

impl Pipeline {
    /// Build a pipeline, validating `expects` edges and planning the
    /// output execution groups. Fails fast on any startup-phase error.
    pub fn new(
        manifests: ManifestRegistry,
        plugins: HashMap<String, Arc<dyn Plugin>>,
    ) -> Result<Self, crate::error::DependencyError> {
        let output_manifests: HashMap<String, crate::manifest::PluginManifest> = manifests
            .iter()
            .filter(|m| m.category == PluginCategory::Output && plugins.contains_key(&m.name))
            .map(|m| (m.name.clone(), m.clone()))
            .collect();

        dependency::validate_expectations(&output_manifests)?;
        let plan = dependency::plan(&output_manifests)?;

        Ok(Self {
            manifests,
            plugins,
            plan,
        })
    }

    fn input_plugin_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .manifests
            .iter()
            .filter(|m| m.category == PluginCategory::Input && self.plugins.contains_key(&m.name))
            .map(|m| m.name.clone())
            .collect();
        names.sort();
        names
    }

    /// Run every enabled input plugin and flatten their emitted work items
    /// into an ordered list of seed matches (component §4.4.1).
    #[instrument(skip(self), fields(component = "executor"))]
    async fn run_input_phase(&self, timeout: Option<Duration>) -> Vec<Match> {
        let empty_context = PluginContext::new();
        let mut matches = Vec::new();
        let mut index = 0usize;

        for name in self.input_plugin_names() {
            let plugin = self.plugins[&name].clone();
            let result = invoke(&plugin, &empty_context, timeout).await;

            let items = match result.payload {
                Value::Array(items) => items,
                Value::Null => Vec::new(),
                other => vec![other],
            };

            for item in items {
                let input_path = item
                    .get("input")
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_string();
                let seed = match item {
                    Value::Object(map) => map,
                    other => {
                        let mut map = Map::new();
                        map.insert(name.clone(), other);
                        map
                    }
                };
                matches.push(Match::new(index, input_path, seed));
                index += 1;
            }
        }

        if let Some(first) = self.input_plugin_names().first() {
            info!(plugin = %first, "input phase produced {} matches", matches.len());
        }

        matches
    }

    /// Run the output phase for a single match: iterate groups in plan
    /// order, gate each plugin's readiness against the live availability
    /// set, and classify every invocation's outcome.
    #[instrument(skip(self, m), fields(component = "executor", index = m.index))]
    async fn run_output_phase(&self, m: &mut Match, timeout: Option<Duration>) {
        let started_at = Utc::now();
        let mut success_plugins = Vec::new();
        let mut failed_plugins = Vec::new();
        let mut not_supported_plugins = Vec::new();
        // Plugins deferred at a prior group boundary because their
        // `expects` was unsatisfied at the time. `expects` may name any
        // known output plugin regardless of `depends_on` (Invariant 2), so
        // a deferred plugin must be re-checked at every later group
        // boundary, not just the one where it was first deferred (§4.4.2
        // step 3: "carried forward to the next Group").
        let mut pending: Vec<String> = Vec::new();

        for group in &self.plan.groups {
            let candidates: Vec<String> = group.iter().cloned().chain(pending.drain(..)).collect();

            let availability = self.availability_for(m);
            let mut ready = Vec::new();
            for name in &candidates {
                let manifest = self
                    .manifests
                    .get(name)
                    .expect("planned plugin must have a manifest");
                if dependency::is_ready(manifest, &availability) {
                    ready.push(name.clone());
                } else {
                    pending.push(name.clone());
                }
            }

            if ready.is_empty() {
                continue;
            }

            // Ready members of a group are eligible for concurrent
            // invocation (§5); this executor runs them serially by
            // default (the resolved Open Question in §9), recomputing
            // the invocation context after each so generic signals like
            // `category` propagate within a group, not just across them.
            for name in &ready {
                let context = self.context_from(m);
                let plugin = self.plugins[name].clone();
                let result = invoke(&plugin, &context, timeout).await;

                debug!(plugin = %name, outcome = ?result.status.outcome(), "group member completed");
                match result.status.outcome() {
                    crate::plugin::PluginOutcome::Success => success_plugins.push(name.clone()),
                    crate::plugin::PluginOutcome::NotSupported => {
                        not_supported_plugins.push(name.clone())
                    }
                    crate::plugin::PluginOutcome::Failed => {
                        warn!(plugin = %name, "plugin failed");
                        failed_plugins.push(name.clone());
                    }
                }
                m.record_plugin_result(name, &result);
            }
        }

        // Groups are exhausted; anything still pending never became ready.
        for name in pending {
            if m.results.contains_key(&name) {
                continue;
            }
            not_supported_plugins.push(name);
        }

        let finished_at = Utc::now();
        m.status = Some(MatchStatus {
            success_plugins,
            failed_plugins,
            not_supported_plugins,
            started_at,
            finished_at,
        });
    }

    /// Recompute the availability set from a match's current results.
    fn availability_for(&self, m: &Match) -> AvailabilitySet {
        let mut availability = AvailabilitySet::new();
        for (key, value) in &m.results {
            availability.insert_key(key);
            if let Value::Object(map) = value {
                for subkey in map.keys() {
                    if subkey == "status" {
                        continue;
                    }
                    availability.insert_subkey(key, subkey);
                }
            }
        }
        availability
    }

    fn context_from(&self, m: &Match) -> PluginContext {
        let mut context: PluginContext = m
            .results
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        if let Some(category) = &m.category {
            context.insert("category".to_string(), Value::String(category.clone()));
        }
        context
    }

    /// Run the full batch: input phase, then output phase and task
    /// execution per match in order, preserving input order in the
    /// resulting response.
    pub async fn run(&self, config: &Config) -> Response {
        let started_at = Utc::now();
        // `0` means "no timeout" (§6.4).
        let timeout = config
            .options
            .plugin_timeout_ms
            .filter(|&ms| ms > 0)
            .map(Duration::from_millis);

        let seeds = self.run_input_phase(timeout).await;
        let total = seeds.len();

        let task_runner = TaskRunner::new(config);
        let mut response = Response {
            matches: Vec::with_capacity(total),
            started_at: Some(started_at),
            finished_at: None,
            input_plugin_used: self.input_plugin_names().into_iter().next(),
            output_plugins_used: self.output_plugin_names(),
            categories: self.supported_categories(),
        };

        for (i, mut m) in seeds.into_iter().enumerate() {
            self.run_output_phase(&mut m, timeout).await;
            let is_last = i + 1 == total;
            task_runner.run_for_match(&mut m, &response, is_last);
            response.matches.push(m);
        }

        response.finished_at = Some(Utc::now());
        response
    }

    fn output_plugin_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .manifests
            .iter()
            .filter(|man| man.category == PluginCategory::Output && self.plugins.contains_key(&man.name))
            .map(|man| man.name.clone())
            .collect();
        names.sort();
        names
    }

    fn supported_categories(&self) -> Vec<String> {
        let mut categories: Vec<String> = self
            .manifests
            .iter()
            .flat_map(|man| man.categories_supported.iter().cloned())
            .collect();
        categories.sort();
        categories.dedup();
        categories
    }
}

/// Invoke a plugin, catching an unwinding panic and enforcing an optional
/// per-plugin timeout, converting either fault into a failed
/// [`PluginResult`] instead of propagating past this boundary (§4.4.6: a
/// single plugin's fault must never abort the batch).
async fn invoke(
    plugin: &Arc<dyn Plugin>,
    context: &PluginContext,
    timeout: Option<Duration>,
) -> PluginResult {
    let started_at = Utc::now();
    let guarded = AssertUnwindSafe(plugin.execute(context)).catch_unwind();

    let outcome = match timeout {
        Some(limit) => match tokio::time::timeout(limit, guarded).await {
            Ok(outcome) => outcome,
            Err(_) => {
                let finished_at = Utc::now();
                return PluginResult {
                    status: PluginStatus {
                        success: false,
                        not_supported: false,
                        started_at,
                        finished_at,
                        duration_ms: (finished_at - started_at).num_milliseconds(),
                        error: Some("timeout".to_string()),
                        validation: None,
                    },
                    category: None,
                    payload: Value::Null,
                };
            }
        },
        None => guarded.await,
    };

    match outcome {
        Ok(result) => result,
        Err(panic) => {
            let message = panic
                .downcast_ref::<&str>()
                .map(|s| s.to_string())
                .or_else(|| panic.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "plugin panicked".to_string());
            let finished_at = Utc::now();
            PluginResult {
                status: PluginStatus {
                    success: false,
                    not_supported: false,
                    started_at,
                    finished_at,
                    duration_ms: (finished_at - started_at).num_milliseconds(),
                    error: Some(message),
                    validation: None,
                },
                category: None,
                payload: Value::Null,
            }
        }
    }
}
