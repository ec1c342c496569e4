//! Tests for the `files` command

use crate::common::{assert_restored, TestRepo};

#[test]
fn test_files_lists_eligible_and_excluded() {
    let repo = TestRepo::new();
    repo.with_jvm_sources()
        .add_file("app/res/values.xml", "<resources/>\n");
    let config = repo.write_shell_config(
        &[("Bazel", "true")],
        &[
            "app/src/Foo.java",
            "app/src/Bar.kt",
            "app/res/values.xml",
            "app/build/_generated_databinding/Baz.java",
        ],
    );
    let before = repo.snapshot();

    let stdout = repo.run_cli_success(&["files", "--config", config.to_str().unwrap()]);

    assert!(stdout.contains("Eligible (2):"), "stdout: {}", stdout);
    assert!(stdout.contains("Foo.java"));
    assert!(stdout.contains("Bar.kt"));
    assert!(stdout.contains("Unsupported type (1):"));
    assert!(stdout.contains("values.xml"));
    assert!(stdout.contains("Excluded (1):"));
    assert!(stdout.contains("Baz.java"));

    // listing never touches sources
    assert_restored(&before, &repo.snapshot());
}

#[test]
fn test_files_extra_exclusions() {
    let repo = TestRepo::new();
    repo.with_jvm_sources();
    let config =
        repo.write_shell_config(&[("Bazel", "true")], &["app/src/Foo.java", "app/src/Bar.kt"]);

    let stdout = repo.run_cli_success(&[
        "files",
        "--config",
        config.to_str().unwrap(),
        "--exclude",
        "Bar.kt",
    ]);
    assert!(stdout.contains("Eligible (1):"));
    assert!(stdout.contains("Excluded (1):"));
}
