//! Git branch probe for uplift.
//!
//! Backups are archived under a per-branch directory, so the branch name
//! has to be usable as a single path segment. Branch names like
//! `feature/x` would otherwise introduce nested directories (or bogus
//! object-storage key segments), so every `/` is replaced with `_`.
//!
//! Probe failures are recoverable: the backup archiver falls back to an
//! `"unknown"` label rather than aborting the pipeline.

use std::path::Path;
use std::process::Command;

use anyhow::{Context, Result};

/// Fallback label used when the branch cannot be determined.
pub const UNKNOWN_BRANCH: &str = "unknown";

/// Replace path separators so the branch name is a single path segment.
pub fn sanitize_branch(branch: &str) -> String {
    branch.trim().replace('/', "_")
}

/// Check if we're inside a git repository.
pub fn is_git_repo(path: &Path) -> bool {
    Command::new("git")
        .args(["rev-parse", "--is-inside-work-tree"])
        .current_dir(path)
        .output()
        .map(|o| o.status.success())
        .unwrap_or(false)
}

/// Current branch name, sanitized for use as a path segment.
///
/// Fails if git is unavailable, the directory is not a repository, or
/// HEAD is unborn. Callers that only need a label should fall back to
/// [`UNKNOWN_BRANCH`].
pub fn branch_label(path: &Path) -> Result<String> {
    let output = Command::new("git")
        .args(["rev-parse", "--abbrev-ref", "HEAD"])
        .current_dir(path)
        .output()
        .context("failed to run git rev-parse")?;

    if !output.status.success() {
        return Err(anyhow::anyhow!(
            "git rev-parse failed: {}",
            String::from_utf8_lossy(&output.stderr).trim()
        ));
    }

    let branch = String::from_utf8_lossy(&output.stdout);
    let label = sanitize_branch(&branch);
    if label.is_empty() {
        return Err(anyhow::anyhow!("git reported an empty branch name"));
    }
    Ok(label)
}

/// Branch label with the `"unknown"` fallback applied.
pub fn branch_label_or_unknown(path: &Path) -> String {
    branch_label(path).unwrap_or_else(|_| UNKNOWN_BRANCH.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use tempfile::tempdir;

    fn init_git_repo(dir: &Path) {
        Command::new("git")
            .args(["init", "-b", "main"])
            .current_dir(dir)
            .output()
            .expect("git init");

        Command::new("git")
            .args(["config", "user.email", "test@example.com"])
            .current_dir(dir)
            .output()
            .expect("git config");

        Command::new("git")
            .args(["config", "user.name", "Test User"])
            .current_dir(dir)
            .output()
            .expect("git config");

        Command::new("git")
            .args(["commit", "--allow-empty", "-m", "init"])
            .current_dir(dir)
            .output()
            .expect("git commit");
    }

    #[test]
    fn sanitize_replaces_separators() {
        assert_eq!(sanitize_branch("feature/x"), "feature_x");
        assert_eq!(sanitize_branch("release/2026/08"), "release_2026_08");
        assert_eq!(sanitize_branch("main"), "main");
    }

    #[test]
    fn sanitize_trims_whitespace() {
        assert_eq!(sanitize_branch("main\n"), "main");
    }

    #[test]
    fn is_git_repo_detects_repo() {
        let td = tempdir().expect("tempdir");
        init_git_repo(td.path());
        assert!(is_git_repo(td.path()));
    }

    #[test]
    fn is_git_repo_returns_false_for_non_repo() {
        let td = tempdir().expect("tempdir");
        assert!(!is_git_repo(td.path()));
    }

    #[test]
    fn branch_label_reads_current_branch() {
        let td = tempdir().expect("tempdir");
        init_git_repo(td.path());

        let label = branch_label(td.path()).expect("branch label");
        assert_eq!(label, "main");
    }

    #[test]
    fn branch_label_sanitizes_slashes() {
        let td = tempdir().expect("tempdir");
        init_git_repo(td.path());

        Command::new("git")
            .args(["checkout", "-b", "feature/x"])
            .current_dir(td.path())
            .output()
            .expect("git checkout");

        let label = branch_label(td.path()).expect("branch label");
        assert_eq!(label, "feature_x");
    }

    #[test]
    fn fallback_for_non_repo() {
        let td = tempdir().expect("tempdir");
        assert_eq!(branch_label_or_unknown(td.path()), UNKNOWN_BRANCH);
    }

    proptest! {
        #[test]
        fn sanitized_labels_have_no_separators(branch in "[a-zA-Z0-9/_-]{0,64}") {
            let label = sanitize_branch(&branch);
            prop_assert!(!label.contains('/'));
        }
    }
}
