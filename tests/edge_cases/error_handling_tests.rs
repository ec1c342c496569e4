//! Error Handling and Edge Case Tests
//!
//! Kicker behavior on files that change underneath it, custom strategies and
//! guaranteed cleanup.

use std::fs;
use std::process::Command;

use buildkick::{
    CleanupOutcome, FileType, FunctionKicker, KickError, Kicker, MutationScope, StrategyRegistry,
    TemplateStrategy,
};

use crate::common::TestRepo;

// ============================================================================
// EMPTY AND TINY FILE TESTS
// ============================================================================

#[test]
fn test_empty_source_round_trip() {
    let repo = TestRepo::new();
    repo.add_file("Empty.kt", "");
    let file = repo.file("Empty.kt");

    let mut kicker = FunctionKicker::new();
    kicker.append(&file).unwrap();
    kicker.append(&file).unwrap();
    assert_eq!(kicker.cleanup(&file), CleanupOutcome::Restored);
    assert!(fs::read(&file).unwrap().is_empty());
}

#[test]
fn test_truncated_file_left_untouched() {
    let repo = TestRepo::new();
    repo.add_file("Foo.java", "class Foo {}\n");
    let file = repo.file("Foo.java");

    let mut kicker = FunctionKicker::new();
    kicker.append(&file).unwrap();
    // someone rewrites the file mid-run
    fs::write(&file, "x").unwrap();

    let outcome = kicker.cleanup(&file);
    assert!(matches!(outcome, CleanupOutcome::TooSmall { size: 1, .. }));
    assert_eq!(fs::read_to_string(&file).unwrap(), "x");
}

// ============================================================================
// DIRTY SET TESTS
// ============================================================================

#[test]
fn test_cleanup_all_dirty_clears_set_despite_failures() {
    let repo = TestRepo::new();
    repo.add_file("a.py", "a = 1\n").add_file("b.py", "b = 2\n");
    let (a, b) = (repo.file("a.py"), repo.file("b.py"));

    let mut kicker = FunctionKicker::new();
    kicker.append(&a).unwrap();
    kicker.append(&b).unwrap();
    fs::remove_file(&a).unwrap();

    let report = kicker.cleanup_all_dirty();
    assert_eq!(report.restored, 1);
    assert_eq!(report.unrestored, vec![a]);
    assert!(kicker.dirty_files().is_empty());
    assert_eq!(fs::read_to_string(&b).unwrap(), "b = 2\n");
}

#[test]
fn test_second_append_refuses_to_stack_on_unrevertable_file() {
    let repo = TestRepo::new();
    repo.add_file("Foo.java", "class Foo {}\n");
    let file = repo.file("Foo.java");

    let mut kicker = FunctionKicker::new();
    kicker.append(&file).unwrap();
    fs::write(&file, "").unwrap();

    let err = kicker.append(&file).unwrap_err();
    assert!(matches!(err, KickError::IoFailure { .. }));
    assert_eq!(fs::read_to_string(&file).unwrap(), "");
}

#[test]
fn test_missing_and_extensionless_files() {
    let repo = TestRepo::new();
    repo.add_file("Makefile", "all:\n");
    let mut kicker = FunctionKicker::new();

    let err = kicker.append(&repo.file("Gone.java")).unwrap_err();
    assert!(matches!(err, KickError::FileNotFound { .. }));

    let err = kicker.append(&repo.file("Makefile")).unwrap_err();
    assert!(matches!(err, KickError::UnsupportedFileType { .. }));
    assert!(kicker.dirty_files().is_empty());
}

// ============================================================================
// GENERATED CODE TESTS
// ============================================================================

#[test]
fn test_kicked_java_file_is_a_top_level_class() {
    let repo = TestRepo::new();
    let original = "public class Foo {\n    void run() {}\n}\n";
    repo.add_file("Foo.java", original);
    let file = repo.file("Foo.java");

    let mut kicker = FunctionKicker::new();
    kicker.append(&file).unwrap();
    let kicked = fs::read_to_string(&file).unwrap();
    let tail = kicked.strip_prefix(original).unwrap();
    assert!(tail.starts_with("\nclass _kicked_"));
    assert!(tail.ends_with(" {}\n"));
}

#[test]
fn test_kicked_java_file_compiles() {
    let javac_available = Command::new("javac")
        .arg("-version")
        .output()
        .map(|o| o.status.success())
        .unwrap_or(false);
    if !javac_available {
        eprintln!("javac not found, skipping");
        return;
    }

    let repo = TestRepo::new();
    repo.add_file("Foo.java", "public class Foo {\n    void run() {}\n}\n");
    let file = repo.file("Foo.java");
    let classes = repo.file("classes");
    fs::create_dir_all(&classes).unwrap();

    let mut kicker = FunctionKicker::new();
    kicker.append(&file).unwrap();
    let output = Command::new("javac")
        .arg("-d")
        .arg(&classes)
        .arg(&file)
        .output()
        .unwrap();
    assert!(
        output.status.success(),
        "javac rejected kicked file: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    assert_eq!(kicker.cleanup(&file), CleanupOutcome::Restored);
}

// ============================================================================
// CUSTOM STRATEGY TESTS
// ============================================================================

#[test]
fn test_registered_strategy_round_trip() {
    let repo = TestRepo::new();
    let original = "package main\n\nfunc main() {}\n";
    repo.add_file("main.go", original);
    let file = repo.file("main.go");

    let mut registry = StrategyRegistry::with_defaults();
    registry.register(
        FileType::from_extension("go"),
        TemplateStrategy::new("func ", "() {}").with_identifier_length(16),
    );
    let mut kicker = FunctionKicker::with_registry(registry);

    kicker.append(&file).unwrap();
    let kicked = fs::read_to_string(&file).unwrap();
    assert!(kicked.starts_with(original));
    assert!(kicked.contains("\nfunc _kicked_"));
    assert_eq!(kicked.len(), original.len() + 2 + "func _kicked_() {}".len() + 16);

    assert_eq!(kicker.cleanup(&file), CleanupOutcome::Restored);
    assert_eq!(fs::read_to_string(&file).unwrap(), original);
}

// ============================================================================
// SCOPED CLEANUP TESTS
// ============================================================================

#[test]
fn test_scope_reverts_on_early_return() {
    let repo = TestRepo::new();
    repo.add_file("Foo.java", "class Foo {}\n")
        .add_file("Bar.kt", "class Bar\n");

    fn kick_both(kicker: &mut FunctionKicker, repo: &TestRepo) -> buildkick::Result<()> {
        let mut scope = MutationScope::new(kicker);
        scope.append(&repo.file("Foo.java"))?;
        scope.append(&repo.file("Bar.kt"))?;
        scope.append(&repo.file("Missing.kt"))?;
        Ok(())
    }

    let mut kicker = FunctionKicker::new();
    assert!(kick_both(&mut kicker, &repo).is_err());
    assert!(kicker.dirty_files().is_empty());
    assert_eq!(
        fs::read_to_string(repo.file("Foo.java")).unwrap(),
        "class Foo {}\n"
    );
    assert_eq!(fs::read_to_string(repo.file("Bar.kt")).unwrap(), "class Bar\n");
}
