//! Shared fixtures for notesync integration tests

use assert_fs::fixture::{FileWriteStr, PathChild};
use assert_fs::TempDir;
use std::path::{Path, PathBuf};
use std::process::Command;

/// Temp workspace holding a config file and one or more repositories
pub struct TestVault {
    pub temp_dir: TempDir,
}

impl TestVault {
    pub fn new() -> Self {
        Self {
            temp_dir: TempDir::new().expect("Failed to create temp dir"),
        }
    }

    /// Write a config file and return its path
    pub fn write_config(&self, content: &str) -> PathBuf {
        let file = self.temp_dir.child("config.json");
        file.write_str(content).expect("Failed to write test config");
        file.path().to_path_buf()
    }

    /// Directory that looks like a repository (has a .git marker) but holds
    /// no real git metadata. Enough for validation and dry-run paths.
    pub fn fake_repo(&self, name: &str) -> PathBuf {
        let dir = self.temp_dir.child(name);
        std::fs::create_dir_all(dir.path().join(".git")).expect("Failed to create .git");
        dir.path().to_path_buf()
    }

    /// Real repository initialized with git, with commit identity configured
    pub fn real_repo(&self, name: &str) -> PathBuf {
        let dir = self.temp_dir.child(name);
        std::fs::create_dir_all(dir.path()).expect("Failed to create repo dir");
        git(dir.path(), &["init", "-q"]);
        git(dir.path(), &["config", "user.email", "tests@notesync.local"]);
        git(dir.path(), &["config", "user.name", "notesync tests"]);
        dir.path().to_path_buf()
    }

    /// Drop a file into a repository working tree
    pub fn write_file(&self, repo: &Path, name: &str, content: &str) {
        std::fs::write(repo.join(name), content).expect("Failed to write file");
    }
}

/// Run a git command in `cwd`, panicking on failure
pub fn git(cwd: &Path, args: &[&str]) {
    let status = Command::new("git")
        .args(args)
        .current_dir(cwd)
        .status()
        .expect("Failed to run git");
    assert!(status.success(), "git {:?} failed in {}", args, cwd.display());
}

/// Capture git stdout in `cwd`
pub fn git_output(cwd: &Path, args: &[&str]) -> String {
    let output = Command::new("git")
        .args(args)
        .current_dir(cwd)
        .output()
        .expect("Failed to run git");
    String::from_utf8_lossy(&output.stdout).into_owned()
}
