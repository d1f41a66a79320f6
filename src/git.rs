use anyhow::{bail, Context, Result};
use std::path::Path;
use tokio::process::Command as AsyncCommand;
use tracing::debug;

/// Exit code and combined stdout/stderr of a finished child process
#[derive(Debug, Clone)]
pub struct CommandOutput {
    pub code: i32,
    pub output: String,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.code == 0
    }
}

/// Run an external command in `cwd`, capturing stdout and stderr into one
/// text blob. Only a spawn failure is an error; a non-zero exit code is
/// reported through the returned [`CommandOutput`]. No retries, no timeout.
pub async fn run_capture(program: &str, args: &[String], cwd: &Path) -> Result<CommandOutput> {
    debug!("Running: {} {} (in {})", program, args.join(" "), cwd.display());

    let output = AsyncCommand::new(program)
        .args(args)
        .current_dir(cwd)
        .output()
        .await
        .with_context(|| format!("Failed to execute {} {}", program, args.join(" ")))?;

    let mut combined = String::from_utf8_lossy(&output.stdout).into_owned();
    combined.push_str(&String::from_utf8_lossy(&output.stderr));

    Ok(CommandOutput {
        code: output.status.code().unwrap_or(-1),
        output: combined,
    })
}

/// Like [`run_capture`], but a non-zero exit code becomes an error with the
/// captured output embedded for diagnostics.
pub async fn run_checked(program: &str, args: &[String], cwd: &Path) -> Result<CommandOutput> {
    let result = run_capture(program, args, cwd).await?;
    if !result.success() {
        bail!(
            "Command failed ({}): {} {}\n{}",
            result.code,
            program,
            args.join(" "),
            result.output
        );
    }
    Ok(result)
}

// Argument builders are separate from execution so dry-run can print the
// exact command line that would have run.

pub fn fetch_args(remote: &str) -> Vec<String> {
    vec!["fetch".into(), remote.into()]
}

pub fn pull_rebase_args(remote: &str, branch: &str) -> Vec<String> {
    vec![
        "pull".into(),
        "--rebase".into(),
        "--autostash".into(),
        remote.into(),
        branch.into(),
    ]
}

/// `git add -A -- .` plus one `:(exclude,glob)<pat>` pathspec per pattern,
/// preserving configuration order. An exclude matching nothing is harmless.
pub fn stage_args(excludes: &[String]) -> Vec<String> {
    let mut args: Vec<String> = vec!["add".into(), "-A".into(), "--".into(), ".".into()];
    for pattern in excludes {
        args.push(format!(":(exclude,glob){}", pattern));
    }
    args
}

pub fn commit_args(message: &str, allow_empty: bool) -> Vec<String> {
    let mut args: Vec<String> = vec!["commit".into()];
    if allow_empty {
        args.push("--allow-empty".into());
    }
    args.push("-m".into());
    args.push(message.into());
    args
}

pub fn push_args(remote: &str, branch: &str) -> Vec<String> {
    vec!["push".into(), remote.into(), branch.into()]
}

/// Render a git invocation for user-facing dry-run output
pub fn render_command(args: &[String]) -> String {
    format!("git {}", args.join(" "))
}

/// Thin wrapper over the git executable, one method per operation used by
/// the synchronizer. Strictly sequential; each call blocks until the child
/// process exits.
pub struct GitClient;

impl GitClient {
    pub fn new() -> Self {
        Self
    }

    /// Check for the repository marker without invoking git
    pub fn is_repository(&self, path: &Path) -> bool {
        path.join(".git").exists()
    }

    pub async fn fetch(&self, path: &Path, remote: &str) -> Result<CommandOutput> {
        run_capture("git", &fetch_args(remote), path).await
    }

    pub async fn pull_rebase(
        &self,
        path: &Path,
        remote: &str,
        branch: &str,
    ) -> Result<CommandOutput> {
        run_capture("git", &pull_rebase_args(remote, branch), path).await
    }

    pub async fn stage_all(&self, path: &Path, excludes: &[String]) -> Result<CommandOutput> {
        run_capture("git", &stage_args(excludes), path).await
    }

    /// Whether the working tree has any changes at all, staged or not.
    /// Coarser than [`Self::has_staged_changes`]: excludes may leave all of
    /// these unstaged.
    pub async fn has_changes(&self, path: &Path) -> Result<bool> {
        let args: Vec<String> = vec!["status".into(), "--porcelain".into()];
        let result = run_capture("git", &args, path).await?;
        if !result.success() {
            bail!(
                "git status failed ({}) in {}:\n{}",
                result.code,
                path.display(),
                result.output
            );
        }
        Ok(!result.output.trim().is_empty())
    }

    /// Whether anything is staged for commit. Uses `git diff --cached
    /// --quiet`: exit 0 means nothing staged, 1 means staged changes exist,
    /// anything else is an error.
    pub async fn has_staged_changes(&self, path: &Path) -> Result<bool> {
        let args: Vec<String> = vec!["diff".into(), "--cached".into(), "--quiet".into()];
        let result = run_capture("git", &args, path).await?;
        match result.code {
            0 => Ok(false),
            1 => Ok(true),
            code => bail!(
                "git diff --cached failed ({}) in {}:\n{}",
                code,
                path.display(),
                result.output
            ),
        }
    }

    pub async fn commit(
        &self,
        path: &Path,
        message: &str,
        allow_empty: bool,
    ) -> Result<CommandOutput> {
        run_capture("git", &commit_args(message, allow_empty), path).await
    }

    pub async fn push(&self, path: &Path, remote: &str, branch: &str) -> Result<CommandOutput> {
        run_capture("git", &push_args(remote, branch), path).await
    }
}

impl Default for GitClient {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_stage_args_without_excludes() {
        let args = stage_args(&[]);
        assert_eq!(args, vec!["add", "-A", "--", "."]);
    }

    #[test]
    fn test_stage_args_with_excludes_keeps_order() {
        let excludes = vec!["*.tmp".to_string(), ".obsidian/cache/*".to_string()];
        let args = stage_args(&excludes);
        assert_eq!(
            args,
            vec![
                "add",
                "-A",
                "--",
                ".",
                ":(exclude,glob)*.tmp",
                ":(exclude,glob).obsidian/cache/*",
            ]
        );
    }

    #[test]
    fn test_pull_rebase_args() {
        let args = pull_rebase_args("origin", "main");
        assert_eq!(args, vec!["pull", "--rebase", "--autostash", "origin", "main"]);
    }

    #[test]
    fn test_commit_args() {
        assert_eq!(
            commit_args("backup 2026-08-24", false),
            vec!["commit", "-m", "backup 2026-08-24"]
        );
        assert_eq!(
            commit_args("backup", true),
            vec!["commit", "--allow-empty", "-m", "backup"]
        );
    }

    #[test]
    fn test_render_command() {
        let rendered = render_command(&push_args("origin", "main"));
        assert_eq!(rendered, "git push origin main");
    }

    #[tokio::test]
    async fn test_run_capture_combines_streams_and_reports_code() {
        let args: Vec<String> = vec![
            "-c".into(),
            "echo to-stdout; echo to-stderr 1>&2; exit 3".into(),
        ];
        let result = run_capture("sh", &args, &PathBuf::from("/tmp"))
            .await
            .expect("Failed to spawn sh");

        assert_eq!(result.code, 3);
        assert!(!result.success());
        assert!(result.output.contains("to-stdout"));
        assert!(result.output.contains("to-stderr"));
    }

    #[tokio::test]
    async fn test_run_checked_embeds_output_on_failure() {
        let args: Vec<String> = vec!["-c".into(), "echo diagnostic-detail; exit 1".into()];
        let err = run_checked("sh", &args, &PathBuf::from("/tmp"))
            .await
            .expect_err("Expected non-zero exit to become an error");

        assert!(err.to_string().contains("diagnostic-detail"));
    }

    #[tokio::test]
    async fn test_run_capture_spawn_failure_is_error() {
        let result = run_capture("notesync-no-such-binary", &[], &PathBuf::from("/tmp")).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_change_detection_against_real_repository() {
        let dir = tempfile::tempdir().expect("Failed to create temp dir");
        let init = std::process::Command::new("git")
            .args(["init", "-q"])
            .current_dir(dir.path())
            .status()
            .expect("Failed to run git init");
        assert!(init.success());

        let git = GitClient::new();
        assert!(!git.has_changes(dir.path()).await.expect("status failed"));
        assert!(!git.has_staged_changes(dir.path()).await.expect("diff failed"));

        std::fs::write(dir.path().join("note.md"), "note\n").expect("Failed to write file");
        assert!(git.has_changes(dir.path()).await.expect("status failed"));
        // Untracked only, nothing staged yet
        assert!(!git.has_staged_changes(dir.path()).await.expect("diff failed"));

        git.stage_all(dir.path(), &[]).await.expect("stage failed");
        assert!(git.has_staged_changes(dir.path()).await.expect("diff failed"));
    }

    #[test]
    fn test_is_repository_requires_git_marker() {
        let dir = tempfile::tempdir().expect("Failed to create temp dir");
        let git = GitClient::new();

        assert!(!git.is_repository(dir.path()));
        std::fs::create_dir(dir.path().join(".git")).expect("Failed to create .git");
        assert!(git.is_repository(dir.path()));
    }
}
