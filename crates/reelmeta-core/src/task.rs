//! Task runner (component C5's second half): renders `print`/`save`/
//! `summary` tasks against the response document under construction.
//! Template rendering itself is delegated to `handlebars`; this module
//! owns only the context assembly, the skip/condition rules, and the
//! save-task file placement and collision handling.
use std::path::{Path, PathBuf};

use handlebars::Handlebars;
use serde_json::{Map, Value};
use tracing::{instrument, warn};

use crate::config::{Config, TaskConfig, TaskKind};
use crate::response::{Match, Response, TaskOutcome};

/// Runs every configured task against each match, honoring the
/// summary-fires-once-on-last-match rule (§4.5.2).
pub struct TaskRunner<'a> {
    handlebars: Handlebars<'a>,
    tasks: Vec<TaskConfig>,
    dry_run: bool,
    hardlink: bool,
}

impl<'a> TaskRunner<'a> {
    pub fn new(config: &Config) -> Self {
        Self {
            handlebars: Handlebars::new(),
            tasks: config.tasks.clone(),
            dry_run: config.options.dry_run,
            hardlink: config.options.hardlink,
        }
    }

    /// Run all applicable tasks for `m`, given the response assembled so
    /// far and whether this is the last match of the batch.
    #[instrument(skip(self, m, response), fields(component = "task_runner", index = m.index))]
    pub fn run_for_match(&self, m: &mut Match, response: &Response, is_last: bool) {
        for task in &self.tasks {
            if task.kind == TaskKind::Summary && !is_last {
                continue;
            }

            let context = self.build_context(m, response);

            if let Some(condition) = &task.condition {
                match self.render(condition, &context) {
                    Ok(rendered) if is_falsy(&rendered) => continue,
                    Err(e) => {
                        warn!(task = %task.name, error = %e, "condition failed to render");
                        m.tasks.push(TaskOutcome {
                            name: task.name.clone(),
                            kind: kind_str(task.kind).to_string(),
                            success: false,
                            rendered: None,
                            destination: None,
                            dry_run: self.dry_run,
                            error: Some(e),
                        });
                        continue;
                    }
                    _ => {}
                }
            }

            let outcome = self.run_task(task, &context, m);
            m.tasks.push(outcome);
        }
    }

    fn run_task(&self, task: &TaskConfig, context: &Value, m: &Match) -> TaskOutcome {
        let rendered = match self.render(&task.template, context) {
            Ok(r) => r,
            Err(e) => {
                return TaskOutcome {
                    name: task.name.clone(),
                    kind: kind_str(task.kind).to_string(),
                    success: false,
                    rendered: None,
                    destination: None,
                    dry_run: self.dry_run,
                    error: Some(e),
                };
            }
        };

        match task.kind {
            TaskKind::Print => {
                println!("{rendered}");
                TaskOutcome {
                    name: task.name.clone(),
                    kind: kind_str(task.kind).to_string(),
                    success: true,
                    rendered: Some(rendered),
                    destination: None,
                    dry_run: self.dry_run,
                    error: None,
                }
            }
            TaskKind::Summary => TaskOutcome {
                name: task.name.clone(),
                kind: kind_str(task.kind).to_string(),
                success: true,
                rendered: Some(rendered),
                destination: None,
                dry_run: self.dry_run,
                error: None,
            },
            TaskKind::Save => self.run_save_task(task, context, rendered, Path::new(&m.input_path)),
        }
    }

    /// Place the match's source file at the rendered `destination`, per
    /// §4.5.2 step 6: a hardlink when `options.hardlink` is set, otherwise
    /// a move. `rendered` (the task's own `template` output) is recorded on
    /// the outcome but is not written as file content — `save` relocates a
    /// real file, it does not synthesize one.
    fn run_save_task(
        &self,
        task: &TaskConfig,
        context: &Value,
        rendered: String,
        source: &Path,
    ) -> TaskOutcome {
        let destination_template = task.destination.as_deref().unwrap_or_default();
        let destination = match self.render(destination_template, context) {
            Ok(d) => d,
            Err(e) => {
                return TaskOutcome {
                    name: task.name.clone(),
                    kind: kind_str(task.kind).to_string(),
                    success: false,
                    rendered: Some(rendered),
                    destination: None,
                    dry_run: self.dry_run,
                    error: Some(e),
                }
            }
        };

        if self.dry_run {
            return TaskOutcome {
                name: task.name.clone(),
                kind: kind_str(task.kind).to_string(),
                success: true,
                rendered: Some(rendered),
                destination: Some(destination),
                dry_run: true,
                error: None,
            };
        }

        let path = Path::new(&destination);
        let unique = unique_destination(path);

        let result = unique
            .parent()
            .map(std::fs::create_dir_all)
            .unwrap_or(Ok(()))
            .and_then(|_| self.place_file(source, &unique));

        match result {
            Ok(()) => TaskOutcome {
                name: task.name.clone(),
                kind: kind_str(task.kind).to_string(),
                success: true,
                rendered: Some(rendered),
                destination: Some(unique.display().to_string()),
                dry_run: false,
                error: None,
            },
            Err(e) => TaskOutcome {
                name: task.name.clone(),
                kind: kind_str(task.kind).to_string(),
                success: false,
                rendered: Some(rendered),
                destination: Some(unique.display().to_string()),
                dry_run: false,
                error: Some(e.to_string()),
            },
        }
    }

    /// Hardlink or move `source` to `destination`, selected by
    /// `options.hardlink` (config.rs).
    fn place_file(&self, source: &Path, destination: &Path) -> std::io::Result<()> {
        if self.hardlink {
            std::fs::hard_link(source, destination)
        } else {
            std::fs::rename(source, destination)
        }
    }

    fn render(&self, template: &str, context: &Value) -> Result<String, String> {
        self.handlebars
            .render_template(template, context)
            .map_err(|e| e.to_string())
    }

    fn build_context(&self, m: &Match, response: &Response) -> Value {
        let mut ctx = Map::new();
        for (key, value) in &m.results {
            ctx.insert(key.clone(), value.clone());
        }
        ctx.insert("index".into(), Value::Number(m.index.into()));
        ctx.insert("input_path".into(), Value::String(m.input_path.clone()));
        if let Some(category) = &m.category {
            ctx.insert("category".into(), Value::String(category.clone()));
        }
        ctx.insert("hardlink".into(), Value::Bool(self.hardlink));
        ctx.insert(
            "matches_so_far".into(),
            Value::Number(response.matches.len().into()),
        );
        // Indexed by position, so a `summary` task (which only ever runs
        // once, on the last match) can reach earlier matches' data —
        // `{{matches.[0].input_path}}` and so on.
        ctx.insert(
            "matches".into(),
            Value::Array(response.matches.iter().map(match_context_entry).collect()),
        );
        Value::Object(ctx)
    }
}

/// Render a completed match the same shape `build_context` exposes for the
/// match currently under task execution, for use inside the `matches` array.
fn match_context_entry(m: &Match) -> Value {
    let mut entry = Map::new();
    for (key, value) in &m.results {
        entry.insert(key.clone(), value.clone());
    }
    entry.insert("index".into(), Value::Number(m.index.into()));
    entry.insert("input_path".into(), Value::String(m.input_path.clone()));
    if let Some(category) = &m.category {
        entry.insert("category".into(), Value::String(category.clone()));
    }
    Value::Object(entry)
}

fn kind_str(kind: TaskKind) -> &'static str {
    match kind {
        TaskKind::Print => "print",
        TaskKind::Save => "save",
        TaskKind::Summary => "summary",
    }
}

fn is_falsy(rendered: &str) -> bool {
    matches!(rendered.trim(), "" | "false" | "0")
}

/// Append a monotone numeric suffix to `path` until it does not already
/// exist on disk.
fn unique_destination(path: &Path) -> PathBuf {
    if !path.exists() {
        return path.to_path_buf();
    }
    let stem = path.file_stem().and_then(|s| s.to_str()).unwrap_or("file");
    let ext = path.extension().and_then(|s| s.to_str());
    let parent = path.parent().unwrap_or_else(|| Path::new(""));

    let mut n = 1u32;
    loop {
        let candidate_name = match ext {
            Some(ext) => format!("{stem}-{n}.{ext}"),
            None => format!("{stem}-{n}"),
        };
        let candidate = parent.join(candidate_name);
        if !candidate.exists() {
            return candidate;
        }
        n += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unique_destination_appends_suffix_on_collision() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("report.json");
        std::fs::write(&path, b"x").unwrap();

        let unique = unique_destination(&path);
        assert_eq!(unique, dir.path().join("report-1.json"));
    }

    #[test]
    fn unique_destination_is_identity_when_absent() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("report.json");
        assert_eq!(unique_destination(&path), path);
    }

    #[test]
    fn is_falsy_matches_empty_and_false_literals() {
        assert!(is_falsy(""));
        assert!(is_falsy("false"));
        assert!(is_falsy("0"));
        assert!(!is_falsy("true"));
        assert!(!is_falsy("anything"));
    }
}
