//! Custom assertions for integration tests

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde_json::Value;

/// Assert that output is valid JSON and return parsed value
pub fn assert_valid_json(output: &str, context: &str) -> Value {
    serde_json::from_str(output).unwrap_or_else(|e| {
        panic!(
            "Expected valid JSON ({}): {}\nOutput:\n{}",
            context, e, output
        )
    })
}

/// Assert that every file in `before` still has exactly the same bytes
pub fn assert_restored(before: &BTreeMap<PathBuf, Vec<u8>>, after: &BTreeMap<PathBuf, Vec<u8>>) {
    for (path, bytes) in before {
        let now = after
            .get(path)
            .unwrap_or_else(|| panic!("{} disappeared", path.display()));
        assert!(
            now == bytes,
            "{} was not restored:\n--- before ---\n{}\n--- after ---\n{}",
            path.display(),
            String::from_utf8_lossy(bytes),
            String::from_utf8_lossy(now)
        );
    }
}

/// Assert that no file under the snapshot carries a leftover mutation
pub fn assert_no_kicks(files: &BTreeMap<PathBuf, Vec<u8>>) {
    for (path, bytes) in files {
        assert!(
            !String::from_utf8_lossy(bytes).contains("_kicked_"),
            "{} still contains a mutation",
            path.display()
        );
    }
}
