//! Test helpers for integration tests

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use tempfile::TempDir;

/// Dev, build, deploy and cfg roots under one temporary directory
pub struct TestRoots {
  _root: TempDir,
  pub path: PathBuf,
}

impl TestRoots {
  pub fn new() -> Result<Self> {
    let root = TempDir::new()?;
    let path = root.path().to_path_buf();
    for dir in ["dev", "builds", "deploy", "cfg"] {
      std::fs::create_dir_all(path.join(dir))?;
    }
    Ok(Self { _root: root, path })
  }

  pub fn dev_root(&self) -> PathBuf {
    self.path.join("dev")
  }

  pub fn build_root(&self) -> PathBuf {
    self.path.join("builds")
  }

  pub fn deploy_root(&self) -> PathBuf {
    self.path.join("deploy")
  }

  pub fn cfg_root(&self) -> PathBuf {
    self.path.join("cfg")
  }

  pub fn registry(&self) -> PathBuf {
    self.deploy_root().join("registry.toml")
  }

  /// Environment the binary reads its roots from
  pub fn env(&self) -> Vec<(&'static str, String)> {
    vec![
      ("GT_DEV_ROOT", self.dev_root().display().to_string()),
      ("GT_BUILD_ROOT", self.build_root().display().to_string()),
      ("GT_DEPLOY_ROOT", self.deploy_root().display().to_string()),
      ("GT_CFG_ROOT", self.cfg_root().display().to_string()),
    ]
  }

  /// Create a working copy with the given files
  pub fn add_package(&self, name: &str, files: &[(&str, &str)]) -> Result<PathBuf> {
    let package = self.dev_root().join(name);
    for (file, content) in files {
      let path = package.join(file);
      if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
      }
      std::fs::write(path, content)?;
    }
    Ok(package)
  }

  /// Check if a file exists relative to the roots
  pub fn file_exists(&self, path: &str) -> bool {
    self.path.join(path).exists()
  }

  /// Read a file relative to the roots
  pub fn read_file(&self, path: &str) -> Result<String> {
    Ok(std::fs::read_to_string(self.path.join(path))?)
  }
}

/// Run git command in a directory
pub fn git(cwd: &Path, args: &[&str]) -> Result<Output> {
  let output = Command::new("git")
    .current_dir(cwd)
    .args(args)
    .output()
    .context("Failed to run git command")?;

  if !output.status.success() {
    let stderr = String::from_utf8_lossy(&output.stderr);
    anyhow::bail!("Git command failed: git {}\n{}", args.join(" "), stderr);
  }

  Ok(output)
}

/// Bare repository seeded with one commit on `branch`
pub fn bare_repo(root: &Path, name: &str, branch: &str, files: &[(&str, &str)]) -> Result<PathBuf> {
  let bare = root.join("server").join(format!("{}.git", name));
  std::fs::create_dir_all(&bare)?;
  git(&bare, &["init", "--bare", &format!("--initial-branch={}", branch)])?;

  let seed = root.join("seed").join(name);
  std::fs::create_dir_all(&seed)?;
  git(&seed, &["init", &format!("--initial-branch={}", branch)])?;
  configure_identity(&seed)?;
  for (file, content) in files {
    std::fs::write(seed.join(file), content)?;
  }
  git(&seed, &["add", "."])?;
  git(&seed, &["commit", "-m", "Initial package"])?;
  git(&seed, &["push", &bare.display().to_string(), branch])?;

  Ok(bare)
}

/// Local committer identity so annotated tags work without a global config
pub fn configure_identity(repo: &Path) -> Result<()> {
  git(repo, &["config", "user.name", "Test User"])?;
  git(repo, &["config", "user.email", "test@example.com"])?;
  Ok(())
}

/// Run pkgrail with the roots' environment, returning output regardless of status
pub fn run_pkgrail_raw(roots: &TestRoots, args: &[&str]) -> Result<Output> {
  let pkgrail_bin = env!("CARGO_BIN_EXE_pkgrail");

  let mut cmd = Command::new(pkgrail_bin);
  cmd.current_dir(&roots.path).args(args).env_clear();
  if let Ok(path) = std::env::var("PATH") {
    cmd.env("PATH", path);
  }
  cmd.env("RUST_LOG", "warn");
  for (key, value) in roots.env() {
    cmd.env(key, value);
  }

  cmd.output().context("Failed to run pkgrail")
}

/// Run pkgrail, failing on a non-zero exit
pub fn run_pkgrail(roots: &TestRoots, args: &[&str]) -> Result<Output> {
  let output = run_pkgrail_raw(roots, args)?;

  if !output.status.success() {
    let stderr = String::from_utf8_lossy(&output.stderr);
    let stdout = String::from_utf8_lossy(&output.stdout);
    anyhow::bail!(
      "pkgrail command failed: pkgrail {}\nstdout: {}\nstderr: {}",
      args.join(" "),
      stdout,
      stderr
    );
  }

  Ok(output)
}
