//! Coverage of the task runner's summary-on-last-match and save-task
//! collision-handling rules.
use reelmeta_core::config::{Config, Options, TaskConfig, TaskKind};
use reelmeta_core::response::{Match, Response};
use reelmeta_core::task::TaskRunner;
use serde_json::Map;

fn make_match(index: usize) -> Match {
    Match::new(index, format!("input-{index}"), Map::new())
}

#[test]
fn summary_task_fires_only_on_last_match() {
    let config = Config {
        options: Options::default(),
        plugins: Default::default(),
        tasks: vec![TaskConfig {
            name: "final".to_string(),
            kind: TaskKind::Summary,
            condition: None,
            template: "done".to_string(),
            destination: None,
        }],
    };

    let runner = TaskRunner::new(&config);
    let response = Response::default();

    let mut first = make_match(0);
    runner.run_for_match(&mut first, &response, false);
    assert!(first.tasks.is_empty());

    let mut last = make_match(1);
    runner.run_for_match(&mut last, &response, true);
    assert_eq!(last.tasks.len(), 1);
    assert_eq!(last.tasks[0].name, "final");
    assert!(last.tasks[0].success);
}

#[test]
fn save_task_moves_source_file_to_destination() {
    let dir = tempfile::tempdir().unwrap();
    let source = dir.path().join("source.mkv");
    std::fs::write(&source, b"source bytes").unwrap();
    let destination = dir.path().join("organized.mkv");

    let config = Config {
        options: Options::default(),
        plugins: Default::default(),
        tasks: vec![TaskConfig {
            name: "organize".to_string(),
            kind: TaskKind::Save,
            condition: None,
            template: "match {{index}}".to_string(),
            destination: Some(destination.display().to_string()),
        }],
    };

    let runner = TaskRunner::new(&config);
    let response = Response::default();
    let mut m = Match::new(0, source.display().to_string(), Map::new());
    runner.run_for_match(&mut m, &response, true);

    assert!(m.tasks[0].success);
    assert!(!source.exists());
    assert_eq!(std::fs::read_to_string(&destination).unwrap(), "source bytes");
}

#[test]
fn save_task_hardlinks_source_when_configured() {
    let dir = tempfile::tempdir().unwrap();
    let source = dir.path().join("source.mkv");
    std::fs::write(&source, b"source bytes").unwrap();
    let destination = dir.path().join("organized.mkv");

    let mut options = Options::default();
    options.hardlink = true;
    let config = Config {
        options,
        plugins: Default::default(),
        tasks: vec![TaskConfig {
            name: "organize".to_string(),
            kind: TaskKind::Save,
            condition: None,
            template: "match {{index}}".to_string(),
            destination: Some(destination.display().to_string()),
        }],
    };

    let runner = TaskRunner::new(&config);
    let response = Response::default();
    let mut m = Match::new(0, source.display().to_string(), Map::new());
    runner.run_for_match(&mut m, &response, true);

    assert!(m.tasks[0].success);
    assert!(source.exists());
    assert_eq!(std::fs::read_to_string(&destination).unwrap(), "source bytes");
}

#[test]
fn dry_run_save_task_does_not_touch_filesystem() {
    let dir = tempfile::tempdir().unwrap();
    let destination = dir.path().join("report.txt");

    let mut options = Options::default();
    options.dry_run = true;
    let config = Config {
        options,
        plugins: Default::default(),
        tasks: vec![TaskConfig {
            name: "report".to_string(),
            kind: TaskKind::Save,
            condition: None,
            template: "match {{index}}".to_string(),
            destination: Some(destination.display().to_string()),
        }],
    };

    let runner = TaskRunner::new(&config);
    let response = Response::default();
    let mut m = make_match(0);
    runner.run_for_match(&mut m, &response, true);

    assert!(m.tasks[0].success);
    assert!(m.tasks[0].dry_run);
    assert!(!destination.exists());
}
