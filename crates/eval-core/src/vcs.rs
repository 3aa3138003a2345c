//! Version-control context stamped onto every run record.

use std::path::{Path, PathBuf};

pub const UNKNOWN: &str = "unknown";

/// Source of the commit and branch a run was evaluated against.
pub trait VcsContextProvider: Send + Sync {
    fn current_sha(&self) -> String;
    fn current_branch(&self) -> String;
}

/// Reads context from the `git` binary. Any failure (no repository, git
/// missing, detached oddities) reports [`UNKNOWN`] rather than an error.
#[derive(Debug, Clone)]
pub struct GitCli {
    root: PathBuf,
}

impl GitCli {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn rev_parse(&self, args: &[&str]) -> String {
        read_git(&self.root, args).unwrap_or_else(|| UNKNOWN.to_string())
    }
}

impl VcsContextProvider for GitCli {
    fn current_sha(&self) -> String {
        self.rev_parse(&["rev-parse", "HEAD"])
    }

    fn current_branch(&self) -> String {
        self.rev_parse(&["rev-parse", "--abbrev-ref", "HEAD"])
    }
}

fn read_git(root: &Path, args: &[&str]) -> Option<String> {
    let output = std::process::Command::new("git")
        .args(args)
        .current_dir(root)
        .output()
        .ok()?;
    if !output.status.success() {
        tracing::debug!(?args, status = ?output.status, "git query failed");
        return None;
    }
    let value = String::from_utf8_lossy(&output.stdout).trim().to_string();
    (!value.is_empty()).then_some(value)
}

/// Constant context, for tests and for recording outside a repository.
#[derive(Debug, Clone)]
pub struct FixedVcs {
    pub sha: String,
    pub branch: String,
}

impl FixedVcs {
    pub fn new(sha: impl Into<String>, branch: impl Into<String>) -> Self {
        Self {
            sha: sha.into(),
            branch: branch.into(),
        }
    }
}

impl VcsContextProvider for FixedVcs {
    fn current_sha(&self) -> String {
        self.sha.clone()
    }

    fn current_branch(&self) -> String {
        self.branch.clone()
    }
}
