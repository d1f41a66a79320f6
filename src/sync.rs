//! Sync engine - drives each configured repository through the
//! pull / stage / commit / push sequence, strictly one repository at a time.
//!
//! Operational failures (missing directory, failed pull, failed commit,
//! failed push) are warnings that stop the affected repository only; the
//! run continues with the next one and the process exit code becomes the
//! worst per-repository code.

use crate::config::{Config, RepoConfig};
use crate::git::{self, GitClient};
use anyhow::Result;
use chrono::Local;
use std::path::PathBuf;
use tracing::{debug, error, info, warn};

/// Per-repository result. `Skipped` is the only warning state (code 1);
/// everything else is success (code 0).
#[derive(Debug, Clone)]
pub enum RepoOutcome {
    /// Changes were committed (and pushed, when enabled)
    Synced,
    /// Nothing staged after excludes, no commit made
    NoChanges,
    /// Dry run: the plan was printed instead of executed
    Planned,
    /// Repository skipped after a warning
    Skipped { reason: String },
}

impl RepoOutcome {
    pub fn code(&self) -> i32 {
        match self {
            RepoOutcome::Skipped { .. } => 1,
            _ => 0,
        }
    }
}

/// One processed repository within a run
#[derive(Debug, Clone)]
pub struct RepoResult {
    pub path: PathBuf,
    pub outcome: RepoOutcome,
}

/// Results from a complete run over all configured repositories
#[derive(Debug, Clone, Default)]
pub struct RunSummary {
    pub results: Vec<RepoResult>,
}

impl RunSummary {
    /// Worst per-repository code: 0 when everything synced or was clean,
    /// 1 when at least one repository warned
    pub fn exit_code(&self) -> i32 {
        self.results.iter().map(|r| r.outcome.code()).max().unwrap_or(0)
    }

    pub fn synced(&self) -> usize {
        self.count(|o| matches!(o, RepoOutcome::Synced))
    }

    pub fn clean(&self) -> usize {
        self.count(|o| matches!(o, RepoOutcome::NoChanges | RepoOutcome::Planned))
    }

    pub fn skipped(&self) -> usize {
        self.count(|o| matches!(o, RepoOutcome::Skipped { .. }))
    }

    fn count(&self, pred: impl Fn(&RepoOutcome) -> bool) -> usize {
        self.results.iter().filter(|r| pred(&r.outcome)).count()
    }
}

/// The sync engine: iterates repositories in configured order and applies
/// warn-and-continue failure handling around each one.
pub struct SyncEngine {
    config: Config,
    git: GitClient,
    dry_run: bool,
}

impl SyncEngine {
    pub fn new(config: Config, dry_run: bool) -> Self {
        Self {
            config,
            git: GitClient::new(),
            dry_run,
        }
    }

    /// Capture the run timestamp once so every commit in one invocation
    /// carries the same value
    pub fn run_timestamp() -> String {
        Local::now().format("%Y-%m-%d %H:%M:%S").to_string()
    }

    /// Process every configured repository sequentially. A repository that
    /// errors unexpectedly is recorded as skipped; it never aborts the rest.
    pub async fn run(&self) -> RunSummary {
        let timestamp = Self::run_timestamp();
        let mut results = Vec::with_capacity(self.config.repos.len());

        for repo in &self.config.repos {
            info!("Syncing repository: {}", repo.path.display());

            let outcome = match self.sync_repository(repo, &timestamp).await {
                Ok(outcome) => outcome,
                Err(e) => {
                    error!("Failed in {}: {:#}", repo.path.display(), e);
                    RepoOutcome::Skipped {
                        reason: format!("{:#}", e),
                    }
                }
            };

            results.push(RepoResult {
                path: repo.path.clone(),
                outcome,
            });
        }

        RunSummary { results }
    }

    /// Drive one repository through the linear sync sequence
    async fn sync_repository(&self, repo: &RepoConfig, timestamp: &str) -> Result<RepoOutcome> {
        let path = &repo.path;

        if !path.exists() {
            warn!("Directory does not exist: {}", path.display());
            return Ok(RepoOutcome::Skipped {
                reason: "directory does not exist".to_string(),
            });
        }
        if !self.git.is_repository(path) {
            warn!("Not a git repository (no .git): {}", path.display());
            return Ok(RepoOutcome::Skipped {
                reason: "not a git repository".to_string(),
            });
        }

        if self.dry_run {
            return Ok(self.plan_repository(repo, timestamp));
        }

        if self.config.global.pull_rebase {
            // Fetch is non-critical; the rebase-pull does its own fetch
            match self.git.fetch(path, &repo.remote).await {
                Ok(result) if !result.success() => {
                    debug!("Fetch failed (ignored) in {}:\n{}", path.display(), result.output);
                }
                Err(e) => debug!("Fetch failed (ignored) in {}: {:#}", path.display(), e),
                _ => {}
            }

            let pulled = self.git.pull_rebase(path, &repo.remote, &repo.branch).await?;
            if !pulled.success() {
                warn!(
                    "Pull failed in {}, check for conflicts:\n{}",
                    path.display(),
                    pulled.output
                );
                return Ok(RepoOutcome::Skipped {
                    reason: "pull failed".to_string(),
                });
            }
            info!("Pull done: {}", path.display());
        }

        match self.git.has_changes(path).await {
            Ok(dirty) => debug!("Working tree dirty in {}: {}", path.display(), dirty),
            Err(e) => debug!("Status check failed (ignored) in {}: {:#}", path.display(), e),
        }

        let staged = self.git.stage_all(path, &repo.excludes).await?;
        if !staged.success() {
            warn!("Staging failed in {}:\n{}", path.display(), staged.output);
            return Ok(RepoOutcome::Skipped {
                reason: "staging failed".to_string(),
            });
        }

        let has_staged = self.git.has_staged_changes(path).await?;
        let allow_empty = !has_staged && self.config.global.commit_if_no_changes;
        if !has_staged && !allow_empty {
            info!("No changes to commit (after excludes): {}", path.display());
            return Ok(RepoOutcome::NoChanges);
        }
        if allow_empty {
            info!("Nothing staged, committing empty: {}", path.display());
        }

        let message = repo.commit_message(timestamp);
        let committed = self.git.commit(path, &message, allow_empty).await?;
        if !committed.success() {
            warn!("Commit failed in {}:\n{}", path.display(), committed.output);
            return Ok(RepoOutcome::Skipped {
                reason: "commit failed".to_string(),
            });
        }
        info!("Committed: {}", path.display());

        if self.config.global.push {
            let pushed = self.git.push(path, &repo.remote, &repo.branch).await?;
            if !pushed.success() {
                warn!("Push failed in {}:\n{}", path.display(), pushed.output);
                return Ok(RepoOutcome::Skipped {
                    reason: "push failed".to_string(),
                });
            }
            info!("Pushed: {}", path.display());
        }

        Ok(RepoOutcome::Synced)
    }

    /// Dry run: print every mutating command that would run, execute none of
    /// them, and report pass-through success. The staged-changes check is
    /// bypassed because staging never actually happened.
    fn plan_repository(&self, repo: &RepoConfig, timestamp: &str) -> RepoOutcome {
        let prefix = format!("[dry-run] {}:", repo.path.display());

        if self.config.global.pull_rebase {
            println!("{} {}", prefix, git::render_command(&git::fetch_args(&repo.remote)));
            println!(
                "{} {}",
                prefix,
                git::render_command(&git::pull_rebase_args(&repo.remote, &repo.branch))
            );
        }
        println!("{} {}", prefix, git::render_command(&git::stage_args(&repo.excludes)));
        println!("{} would check for staged changes", prefix);
        println!(
            "{} {}",
            prefix,
            git::render_command(&git::commit_args(&repo.commit_message(timestamp), false))
        );
        if self.config.global.push {
            println!(
                "{} {}",
                prefix,
                git::render_command(&git::push_args(&repo.remote, &repo.branch))
            );
        }

        RepoOutcome::Planned
    }
}
