//! TestRepo builder for integration testing
//!
//! Creates a temporary source tree, writes benchmark configs pointing into it
//! and runs the `buildkick` binary against it.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Output, Stdio};
use tempfile::TempDir;

/// Builder for a throwaway project tree
pub struct TestRepo {
    dir: TempDir,
}

impl TestRepo {
    /// Create a new empty test repository
    pub fn new() -> Self {
        Self {
            dir: TempDir::new().expect("Failed to create temp dir"),
        }
    }

    /// Get the path to the test repository root
    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Absolute path of a file inside the repository
    pub fn file(&self, relative_path: &str) -> PathBuf {
        self.dir.path().join(relative_path)
    }

    /// Add a source file with the given content
    pub fn add_file(&self, relative_path: &str, content: &str) -> &Self {
        let full_path = self.file(relative_path);
        if let Some(parent) = full_path.parent() {
            fs::create_dir_all(parent).expect("Failed to create parent dirs");
        }
        fs::write(&full_path, content).expect("Failed to write file");
        self
    }

    /// Read a file back as bytes
    pub fn read_bytes(&self, relative_path: &str) -> Vec<u8> {
        fs::read(self.file(relative_path)).expect("Failed to read file")
    }

    /// Add a small Android-style project: two kickable sources and one generated file
    pub fn with_jvm_sources(&self) -> &Self {
        self.add_file(
            "app/src/Foo.java",
            "package app;\n\npublic class Foo {\n    int answer() { return 42; }\n}\n",
        )
        .add_file(
            "app/src/Bar.kt",
            "package app\n\nclass Bar {\n    fun greet() = \"hi\"\n}\n",
        )
        .add_file(
            "app/build/_generated_databinding/Baz.java",
            "package app.generated;\n\nclass Baz {}\n",
        )
    }

    /// Snapshot of every file under the repository
    pub fn snapshot(&self) -> BTreeMap<PathBuf, Vec<u8>> {
        let mut files = BTreeMap::new();
        collect(self.path(), &mut files);
        files
    }

    /// Write a benchmark config whose build systems are `sh -c <script>` in the repo root.
    ///
    /// Discovery lists `files` relative to the repository.
    pub fn write_shell_config(&self, systems: &[(&str, &str)], files: &[&str]) -> PathBuf {
        let mut config = String::new();
        config.push_str("[benchmark]\niterations = 2\nexclude = [\"/_generated_databinding/\"]\n\n");
        config.push_str("[discovery]\nkind = \"files\"\n");
        config.push_str(&format!("root = '{}'\n", self.path().display()));
        let listed: Vec<String> = files.iter().map(|f| format!("\"{}\"", f)).collect();
        config.push_str(&format!("files = [{}]\n", listed.join(", ")));

        for (name, script) in systems {
            config.push_str("\n[[build_systems]]\n");
            config.push_str(&format!("name = \"{}\"\n", name));
            config.push_str("command = \"sh\"\n");
            config.push_str(&format!("working_dir = '{}'\n", self.path().display()));
            config.push_str(&format!("args = {{ \"-c\" = '{}' }}\n", script));
        }

        let path = self.file("bench.toml");
        fs::write(&path, config).expect("Failed to write config");
        path
    }

    /// Run the buildkick CLI in the repository and return output
    pub fn run_cli(&self, args: &[&str]) -> std::io::Result<Output> {
        Command::new(env!("CARGO_BIN_EXE_buildkick"))
            .current_dir(self.path())
            .env_remove("RUST_LOG")
            .args(args)
            .output()
    }

    /// Start the CLI in the background with captured output
    pub fn spawn_cli(&self, args: &[&str]) -> std::io::Result<Child> {
        Command::new(env!("CARGO_BIN_EXE_buildkick"))
            .current_dir(self.path())
            .env_remove("RUST_LOG")
            .args(args)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
    }

    /// Run CLI and expect success, return stdout
    pub fn run_cli_success(&self, args: &[&str]) -> String {
        let output = self.run_cli(args).expect("Failed to run CLI");
        assert!(
            output.status.success(),
            "CLI command {:?} failed: {}",
            args,
            String::from_utf8_lossy(&output.stderr)
        );
        String::from_utf8_lossy(&output.stdout).to_string()
    }

    /// Run CLI and expect failure, return (exit code, stderr)
    pub fn run_cli_failure(&self, args: &[&str]) -> (Option<i32>, String) {
        let output = self.run_cli(args).expect("Failed to run CLI");
        assert!(
            !output.status.success(),
            "CLI command {:?} should have failed",
            args
        );
        (
            output.status.code(),
            String::from_utf8_lossy(&output.stderr).to_string(),
        )
    }
}

impl Default for TestRepo {
    fn default() -> Self {
        Self::new()
    }
}

fn collect(dir: &Path, files: &mut BTreeMap<PathBuf, Vec<u8>>) {
    for entry in fs::read_dir(dir).expect("Failed to read dir").flatten() {
        let path = entry.path();
        if path.is_dir() {
            collect(&path, files);
        } else {
            let bytes = fs::read(&path).expect("Failed to read file");
            files.insert(path, bytes);
        }
    }
}
