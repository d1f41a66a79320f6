//! notesync - Automated commit-and-push for note vaults and personal repos
//!
//! Keeps a configured set of git-controlled directories in sync with their
//! remotes: pull with rebase and autostash, stage everything except the
//! configured excludes, commit with a shared run timestamp, push. Intended
//! to be invoked by an external scheduler; a single run processes every
//! repository sequentially and never lets one failure abort the rest.
//!
//! ## Modules
//!
//! - [`config`]: JSON configuration loading and validation
//! - [`git`]: child-process command runner and git operation wrappers
//! - [`sync`]: per-repository synchronizer and run orchestrator

pub mod config;
pub mod git;
pub mod sync;

pub use config::{Config, GlobalConfig, RepoConfig};
pub use git::{CommandOutput, GitClient};
pub use sync::{RepoOutcome, RunSummary, SyncEngine};
