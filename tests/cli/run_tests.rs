//! Tests for the `run` command

use std::fs;
use std::process::Command;
use std::thread;
use std::time::{Duration, Instant};

use crate::common::{assert_no_kicks, assert_restored, assert_valid_json, TestRepo};
use buildkick::report::read_table;

/// Warm-up creates the marker; every later build requires a kicked Foo.java
fn kick_checking_script(marker: &str) -> String {
    format!(
        "if [ -e {m} ]; then grep -q _kicked_ app/src/Foo.java; else touch {m}; fi",
        m = marker
    )
}

const SOURCES: &[&str] = &[
    "app/src/Foo.java",
    "app/src/Bar.kt",
    "app/build/_generated_databinding/Baz.java",
];

#[test]
fn test_run_writes_table_and_restores_sources() {
    let repo = TestRepo::new();
    repo.with_jvm_sources();
    let bazel = kick_checking_script(".warm_bazel");
    let buck = kick_checking_script(".warm_buck");
    let config = repo.write_shell_config(
        &[("Bazel", bazel.as_str()), ("Buck2", buck.as_str())],
        SOURCES,
    );
    let before = repo.snapshot();

    let stdout = repo.run_cli_success(&[
        "run",
        "--config",
        config.to_str().unwrap(),
        "-n",
        "3",
        "--output-csv",
        "times.csv",
        "--output-json",
        "run.json",
    ]);

    assert!(stdout.contains("Warm-up builds:"));
    assert!(stdout.contains("2 file(s) kicked, 1 excluded"));
    assert!(stdout.contains("Fastest:"));

    let series = read_table(&repo.file("times.csv")).unwrap();
    assert_eq!(series.len(), 2);
    assert_eq!(series[0].name, "Bazel");
    assert_eq!(series[0].color, "#4CAF50");
    assert_eq!(series[1].name, "Buck2");
    assert_eq!(series[1].color, "#FF9800");
    assert!(series.iter().all(|s| s.durations.len() == 3));

    let report = std::fs::read_to_string(repo.file("run.json")).unwrap();
    let json = assert_valid_json(&report, "run report");
    assert_eq!(json["iterations"], 3);
    assert_eq!(json["mutated_files"], 2);
    assert_eq!(json["excluded_files"], 1);

    let after = repo.snapshot();
    assert_restored(&before, &after);
    assert_no_kicks(&after);
}

#[test]
fn test_failed_build_exits_with_build_code_and_restores() {
    let repo = TestRepo::new();
    repo.with_jvm_sources();
    // fails on the first timed build, after the warm-up succeeded
    let failing = "if [ -e .warm ]; then echo boom >&2; exit 7; else touch .warm; fi";
    let config = repo.write_shell_config(&[("Bazel", "true"), ("Buck2", failing)], SOURCES);
    let before = repo.snapshot();

    let (code, stderr) = repo.run_cli_failure(&["run", "--config", config.to_str().unwrap()]);
    assert_eq!(code, Some(3));
    assert!(stderr.contains("Buck2 build failed"), "stderr: {}", stderr);
    assert!(stderr.contains("boom"));
    assert!(!repo.file("incremental_build_times.csv").exists());

    assert_restored(&before, &repo.snapshot());
}

#[test]
fn test_timeout_kills_build() {
    let repo = TestRepo::new();
    repo.with_jvm_sources();
    let config = repo.write_shell_config(&[("Slow", "exec sleep 5")], SOURCES);

    let (code, stderr) = repo.run_cli_failure(&[
        "run",
        "--config",
        config.to_str().unwrap(),
        "--timeout",
        "0.2",
    ]);
    assert_eq!(code, Some(3));
    assert!(stderr.contains("timed out"), "stderr: {}", stderr);
}

#[test]
fn test_unknown_target_name_rejected() {
    let repo = TestRepo::new();
    repo.with_jvm_sources();
    let config = repo.write_shell_config(&[("Bazel", "true")], SOURCES);

    let (code, stderr) = repo.run_cli_failure(&[
        "run",
        "--config",
        config.to_str().unwrap(),
        "--target",
        "Pants=//app:app",
    ]);
    assert_eq!(code, Some(4));
    assert!(stderr.contains("unknown build system 'Pants'"));
}

#[test]
fn test_malformed_target_spec_rejected() {
    let repo = TestRepo::new();
    let config = repo.write_shell_config(&[("Bazel", "true")], SOURCES);

    let (_, stderr) = repo.run_cli_failure(&[
        "run",
        "--config",
        config.to_str().unwrap(),
        "--target",
        "Bazel",
    ]);
    assert!(stderr.contains("NAME=TARGET"), "stderr: {}", stderr);
}

#[test]
fn test_missing_config_file() {
    let repo = TestRepo::new();
    let (code, stderr) = repo.run_cli_failure(&["run", "--config", "nope.toml"]);
    assert_eq!(code, Some(1));
    assert!(stderr.contains("File not found"));
}

#[test]
fn test_sigint_during_build_restores_sources() {
    let repo = TestRepo::new();
    repo.with_jvm_sources();
    // warm-up is instant, every timed build hangs until killed
    let hanging = "if [ -e .warm ]; then exec sleep 30; else touch .warm; fi";
    let config = repo.write_shell_config(&[("Bazel", hanging)], SOURCES);
    let before = repo.snapshot();

    let child = repo
        .spawn_cli(&["run", "--config", config.to_str().unwrap()])
        .unwrap();

    let deadline = Instant::now() + Duration::from_secs(20);
    while !fs::read_to_string(repo.file("app/src/Bar.kt"))
        .unwrap()
        .contains("_kicked_")
    {
        assert!(Instant::now() < deadline, "sources were never kicked");
        thread::sleep(Duration::from_millis(20));
    }

    let status = Command::new("kill")
        .args(["-INT", &child.id().to_string()])
        .status()
        .unwrap();
    assert!(status.success());

    let output = child.wait_with_output().unwrap();
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert_eq!(output.status.code(), Some(130), "stderr: {}", stderr);
    assert!(stderr.contains("Interrupted"));

    let after = repo.snapshot();
    assert_restored(&before, &after);
    assert_no_kicks(&after);
}
