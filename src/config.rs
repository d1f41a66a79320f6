use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Top-level configuration: one set of global switches plus the ordered
/// list of repositories to synchronize.
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    /// Switches applied uniformly to every repository in the run
    #[serde(default)]
    pub global: GlobalConfig,

    /// Repositories, processed in declaration order
    pub repos: Vec<RepoConfig>,
}

/// Global synchronization switches
#[derive(Debug, Deserialize, Clone)]
pub struct GlobalConfig {
    /// Rebase-pull (with autostash) from the remote before staging
    #[serde(default = "default_true")]
    pub pull_rebase: bool,

    /// Push the configured branch after a successful commit
    #[serde(default = "default_true")]
    pub push: bool,

    /// Create an empty commit even when nothing is staged
    #[serde(default)]
    pub commit_if_no_changes: bool,
}

/// Per-repository settings
#[derive(Debug, Deserialize, Clone)]
pub struct RepoConfig {
    /// Working-tree location; `~` is expanded at load time
    pub path: PathBuf,

    /// Remote name
    #[serde(default = "default_remote")]
    pub remote: String,

    /// Branch name
    #[serde(default = "default_branch")]
    pub branch: String,

    /// Commit message template with a literal `{timestamp}` placeholder
    #[serde(default = "default_message")]
    pub message: String,

    /// Glob patterns excluded from staging via git pathspec magic
    #[serde(default)]
    pub excludes: Vec<String>,
}

// Default value functions
fn default_true() -> bool {
    true
}
fn default_remote() -> String {
    "origin".to_string()
}
fn default_branch() -> String {
    "main".to_string()
}
fn default_message() -> String {
    "Auto-commit {timestamp}".to_string()
}

impl Default for GlobalConfig {
    fn default() -> Self {
        Self {
            pull_rebase: true,
            push: true,
            commit_if_no_changes: false,
        }
    }
}

impl Config {
    /// Load and validate configuration from a JSON file.
    ///
    /// Fails when the file is missing or unreadable, the document does not
    /// parse, `repos` is absent/empty/not a list, or a repository entry
    /// lacks a `path`. Pure parsing and validation, no git interaction.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;

        let mut config: Config = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {:?}", path))?;

        if config.repos.is_empty() {
            bail!("'repos' must contain at least one repository in {:?}", path);
        }

        config.expand_paths();

        Ok(config)
    }

    /// Expand `~` in every configured repository path
    fn expand_paths(&mut self) {
        for repo in &mut self.repos {
            let raw = repo.path.to_string_lossy().into_owned();
            repo.path = PathBuf::from(shellexpand::tilde(&raw).into_owned());
        }
    }
}

impl RepoConfig {
    /// Substitute the run timestamp into the commit message template
    pub fn commit_message(&self, timestamp: &str) -> String {
        self.message.replace("{timestamp}", timestamp)
    }
}
