//! Test environment builder for isolated Stratus testing.
//!
//! Provides `TestEnv` - an isolated temp project directory plus helpers to
//! run the stratus CLI inside it. Every invocation strips ambient STRATUS_*
//! variables so tests cannot leak configuration into each other.

use std::path::{Path, PathBuf};
use std::process::Command;

use tempfile::TempDir;

/// Result of running a stratus CLI command
#[derive(Debug)]
pub struct TestResult {
    pub success: bool,
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
}

impl TestResult {
    /// Combine stdout and stderr
    pub fn combined_output(&self) -> String {
        format!("{}\n{}", self.stdout, self.stderr)
    }
}

/// Isolated test environment with a temp project directory
pub struct TestEnv {
    pub project: TempDir,
    stratus_bin: PathBuf,
}

impl TestEnv {
    pub fn new() -> Self {
        Self {
            project: TempDir::new().expect("create temp project dir"),
            stratus_bin: PathBuf::from(env!("CARGO_BIN_EXE_stratus")),
        }
    }

    /// Create an environment with a manifest already written
    pub fn with_manifest(manifest: &str) -> Self {
        let env = Self::new();
        env.write_manifest(manifest);
        env
    }

    /// Get path relative to the project root
    pub fn project_path(&self, relative: &str) -> PathBuf {
        self.project.path().join(relative)
    }

    /// Write the deployment manifest
    pub fn write_manifest(&self, content: &str) {
        std::fs::write(self.project_path("stratus.toml"), content)
            .expect("write manifest");
    }

    /// Read the raw state file, if present
    pub fn read_state(&self) -> Option<String> {
        std::fs::read_to_string(self.project_path("stratus.state")).ok()
    }

    pub fn state_exists(&self) -> bool {
        self.project_path("stratus.state").exists()
    }

    /// Run stratus in this environment from the project root
    pub fn run(&self, args: &[&str]) -> TestResult {
        self.run_with_env(args, &[])
    }

    /// Run stratus with extra environment variables
    pub fn run_with_env(&self, args: &[&str], env_vars: &[(&str, &str)]) -> TestResult {
        self.run_from_with_env(self.project.path(), args, env_vars)
    }

    fn run_from_with_env(
        &self,
        cwd: &Path,
        args: &[&str],
        env_vars: &[(&str, &str)],
    ) -> TestResult {
        let mut cmd = Command::new(&self.stratus_bin);
        cmd.current_dir(cwd)
            .args(args)
            .env_remove("STRATUS_REGION")
            .env_remove("STRATUS_EDGE_SECRET");
        for (key, value) in env_vars {
            cmd.env(key, value);
        }

        let output = cmd.output().expect("run stratus binary");
        TestResult {
            success: output.status.success(),
            exit_code: output.status.code().unwrap_or(-1),
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
        }
    }
}

impl Default for TestEnv {
    fn default() -> Self {
        Self::new()
    }
}
