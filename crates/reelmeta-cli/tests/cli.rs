use assert_cmd::Command;
use predicates::prelude::*;

#[test]
fn empty_batch_with_no_plugins_succeeds() {
    let dir = tempfile::tempdir().unwrap();
    let plugins_dir = dir.path().join("plugins");
    std::fs::create_dir_all(&plugins_dir).unwrap();

    let config_path = dir.path().join("reelmeta.json");
    std::fs::write(
        &config_path,
        r#"{"options": {}, "plugins": {}, "tasks": []}"#,
    )
    .unwrap();

    Command::cargo_bin("reelmeta")
        .unwrap()
        .arg("--config")
        .arg(&config_path)
        .arg("--plugins-dir")
        .arg(&plugins_dir)
        .assert()
        .success()
        .stdout(predicate::str::contains("\"matches\""));
}

#[test]
fn missing_config_file_exits_with_startup_error_code() {
    let dir = tempfile::tempdir().unwrap();

    Command::cargo_bin("reelmeta")
        .unwrap()
        .arg("--config")
        .arg(dir.path().join("does-not-exist.json"))
        .arg("--plugins-dir")
        .arg(dir.path())
        .assert()
        .code(2);
}
