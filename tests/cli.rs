use assert_cmd::Command;
use predicates::prelude::*;
use std::path::Path;
use tempfile::TempDir;

fn clickshot_cmd() -> Command {
    Command::cargo_bin("clickshot").expect("binary exists")
}

/// Config that keeps downloads and the store inside `dir`.
fn write_config(dir: &Path) -> std::path::PathBuf {
    let path = dir.join("config.toml");
    let contents = format!(
        "[capture]\nnotify = false\n\n[storage]\ndownload_dir = \"{}\"\nstore_path = \"{}\"\n",
        dir.join("downloads").display(),
        dir.join("store.json").display()
    );
    std::fs::write(&path, contents).unwrap();
    path
}

#[test]
fn help_prints_usage() {
    clickshot_cmd()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "Click-to-capture screenshots with marker and note overlays",
        ));
}

#[test]
fn stats_start_at_zero() {
    let temp = TempDir::new().unwrap();
    let config = write_config(temp.path());

    clickshot_cmd()
        .arg("--config")
        .arg(&config)
        .arg("stats")
        .assert()
        .success()
        .stdout(predicate::str::contains("\"totalScreenshots\": 0"));
}

#[test]
fn settings_patch_is_persisted() {
    let temp = TempDir::new().unwrap();
    let config = write_config(temp.path());

    clickshot_cmd()
        .arg("--config")
        .arg(&config)
        .args(["settings", "--patch", r#"{"imageFormat":"jpeg"}"#])
        .assert()
        .success();

    clickshot_cmd()
        .arg("--config")
        .arg(&config)
        .arg("settings")
        .assert()
        .success()
        .stdout(predicate::str::contains("\"imageFormat\": \"jpeg\""));
}

#[test]
fn restricted_page_capture_fails() {
    let temp = TempDir::new().unwrap();
    let config = write_config(temp.path());

    clickshot_cmd()
        .arg("--config")
        .arg(&config)
        .args(["capture", "--url", "chrome://settings", "--x", "10", "--y", "10"])
        .assert()
        .failure()
        .stdout(predicate::str::contains("\"errorCategory\": \"validation\""))
        .stdout(predicate::str::contains("not allowed"));
}

#[test]
fn serve_answers_each_line() {
    let temp = TempDir::new().unwrap();
    let config = write_config(temp.path());

    clickshot_cmd()
        .arg("--config")
        .arg(&config)
        .arg("serve")
        .write_stdin("{\"type\":\"GET_SETTINGS\"}\n{\"type\":\"LAUNCH_ROCKETS\"}\n")
        .assert()
        .success()
        .stdout(predicate::str::contains("\"markerColor\""))
        .stdout(predicate::str::contains(
            "Unknown message type: LAUNCH_ROCKETS",
        ));
}

#[test]
fn export_writes_a_gzip_snapshot() {
    let temp = TempDir::new().unwrap();
    let config = write_config(temp.path());
    let snapshot = temp.path().join("backup.json.gz");

    clickshot_cmd()
        .arg("--config")
        .arg(&config)
        .arg("export")
        .arg(&snapshot)
        .assert()
        .success();

    let bytes = std::fs::read(&snapshot).unwrap();
    assert_eq!(&bytes[0..2], &[0x1f, 0x8b]);

    clickshot_cmd()
        .arg("--config")
        .arg(&config)
        .arg("import")
        .arg(&snapshot)
        .assert()
        .success();
}
