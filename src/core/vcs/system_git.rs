//! System git backend
//!
//! Shells out to the `git` binary with an isolated environment. Each call
//! captures stdout and stderr so a failure can report the full diagnostic.

use super::VcsClient;
use crate::core::error::{GitError, PkgError, PkgResult, ResultExt};
use std::path::{Path, PathBuf};
use std::process::{Command, Output};

/// Git backend using system git (zero crate dependencies)
pub struct SystemGit {
  /// Working copy (may not exist yet)
  work_tree: PathBuf,

  /// Remote URL, e.g. `git-server:repos/widget.git`
  remote: String,
}

impl SystemGit {
  pub fn new(work_tree: impl Into<PathBuf>, remote: impl Into<String>) -> Self {
    Self {
      work_tree: work_tree.into(),
      remote: remote.into(),
    }
  }

  /// Create a safe git command with isolated environment
  ///
  /// - Clears environment variables
  /// - Whitelists PATH, HOME and the ssh agent/command variables
  /// - Adds safe configuration overrides
  fn base_cmd(&self) -> Command {
    let mut cmd = Command::new("git");

    cmd.env_clear();
    for key in ["PATH", "HOME", "SSH_AUTH_SOCK", "GIT_SSH_COMMAND"] {
      if let Ok(value) = std::env::var(key) {
        cmd.env(key, value);
      }
    }

    cmd.arg("-c").arg("advice.detachedHead=false");
    cmd.arg("-c").arg("core.quotePath=false");

    cmd
  }

  /// Git command running inside the working copy
  fn git_cmd(&self) -> Command {
    let mut cmd = self.base_cmd();
    cmd.arg("-C").arg(&self.work_tree);
    cmd
  }

  /// Run a command, returning stdout on success
  fn run(&self, mut cmd: Command, label: &str) -> PkgResult<String> {
    let output = cmd.output().with_context(|| format!("Failed to execute {}", label))?;
    if !output.status.success() {
      return Err(PkgError::Git(GitError::CommandFailed {
        command: label.to_string(),
        output: combined_output(&output),
      }));
    }
    Ok(String::from_utf8_lossy(&output.stdout).to_string())
  }
}

impl VcsClient for SystemGit {
  fn remote(&self) -> &str {
    &self.remote
  }

  fn work_tree(&self) -> &Path {
    &self.work_tree
  }

  fn is_repo(&self) -> bool {
    if !self.work_tree.exists() {
      return false;
    }
    let mut cmd = self.git_cmd();
    cmd.args(["rev-parse", "--is-inside-work-tree"]);
    cmd.output().map(|o| o.status.success()).unwrap_or(false)
  }

  fn clone_remote(&self, branch: Option<&str>) -> PkgResult<()> {
    let mut cmd = self.base_cmd();
    cmd.arg("clone");
    if let Some(branch) = branch.filter(|b| *b != "master") {
      cmd.args(["-b", branch]);
    }
    cmd.arg(&self.remote).arg(&self.work_tree);

    tracing::debug!(remote = %self.remote, path = %self.work_tree.display(), "cloning");
    self.run(cmd, "git clone").map(|_| ())
  }

  fn fetch_all(&self) -> PkgResult<()> {
    let mut cmd = self.git_cmd();
    cmd.args(["fetch", "--all", "--tags"]);
    self.run(cmd, "git fetch --all --tags").map(|_| ())
  }

  fn list_remote_tags(&self) -> PkgResult<Vec<String>> {
    let mut cmd = self.base_cmd();
    cmd.args(["ls-remote", "--tags", &self.remote]);

    let output = cmd.output().with_context(|| "Failed to execute git ls-remote".to_string())?;
    if !output.status.success() {
      return Err(PkgError::Git(GitError::StoreUnreachable {
        remote: self.remote.clone(),
        output: combined_output(&output),
      }));
    }

    Ok(
      String::from_utf8_lossy(&output.stdout)
        .lines()
        .map(|l| l.trim_end().to_string())
        .filter(|l| !l.is_empty())
        .collect(),
    )
  }

  fn resolve_commit(&self, reference: &str) -> PkgResult<String> {
    let mut cmd = self.git_cmd();
    cmd.args(["rev-list", "-1", reference]);
    let stdout = self.run(cmd, &format!("git rev-list -1 {}", reference))?;
    stdout
      .lines()
      .next()
      .map(|s| s.trim().to_string())
      .filter(|s| !s.is_empty())
      .ok_or_else(|| {
        PkgError::Git(GitError::CommandFailed {
          command: format!("git rev-list -1 {}", reference),
          output: "no commit reported".to_string(),
        })
      })
  }

  fn current_branch(&self) -> PkgResult<String> {
    if !self.work_tree.exists() {
      return Ok("master".to_string());
    }
    let mut cmd = self.git_cmd();
    cmd.args(["rev-parse", "--abbrev-ref", "HEAD"]);
    let stdout = self.run(cmd, "git rev-parse --abbrev-ref HEAD")?;
    Ok(stdout.trim().to_string())
  }

  fn create_tag(&self, name: &str, message: &str) -> PkgResult<()> {
    let mut cmd = self.git_cmd();
    cmd.args(["tag", "-a", name, "-m", message]);
    self.run(cmd, &format!("git tag -a {}", name)).map(|_| ())
  }

  fn push_tags(&self) -> PkgResult<()> {
    let mut cmd = self.git_cmd();
    cmd.args(["push", "-f", "origin", "--tags", "--quiet"]);
    self.run(cmd, "git push -f origin --tags").map(|_| ())
  }

  fn commit(&self, message: &str) -> PkgResult<()> {
    let mut add = self.git_cmd();
    add.args(["add", "."]);
    self.run(add, "git add .")?;

    let mut cmd = self.git_cmd();
    cmd.args(["commit", "-am", message, "--quiet"]);
    match self.run(cmd, "git commit") {
      Ok(_) => Ok(()),
      Err(PkgError::Git(GitError::CommandFailed { output, .. })) if is_nothing_to_commit(&output) => {
        tracing::debug!(path = %self.work_tree.display(), "nothing to commit");
        Ok(())
      }
      Err(e) => Err(e),
    }
  }
}

/// stdout followed by stderr, as one diagnostic string
fn combined_output(output: &Output) -> String {
  let stdout = String::from_utf8_lossy(&output.stdout);
  let stderr = String::from_utf8_lossy(&output.stderr);
  match (stdout.trim().is_empty(), stderr.trim().is_empty()) {
    (true, _) => stderr.trim().to_string(),
    (false, true) => stdout.trim().to_string(),
    (false, false) => format!("{}\n{}", stdout.trim(), stderr.trim()),
  }
}

fn is_nothing_to_commit(output: &str) -> bool {
  output.contains("nothing to commit") || output.contains("up-to-date") || output.contains("up to date")
}
