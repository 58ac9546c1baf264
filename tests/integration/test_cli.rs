//! Integration tests for the `pkgrail` binary

use crate::helpers::{TestRoots, run_pkgrail, run_pkgrail_raw};
use anyhow::Result;

#[test]
fn test_build_deploy_publish() -> Result<()> {
  let roots = TestRoots::new()?;
  roots.add_package("widget", &[("a.txt", "alpha"), (".git/HEAD", "ref: refs/heads/dev")])?;

  let output = run_pkgrail(&roots, &["build", "widget"])?;
  let stdout = String::from_utf8_lossy(&output.stdout);
  assert!(stdout.contains("Built widget rc001"), "stdout: {}", stdout);
  assert!(roots.file_exists("builds/widget/rc001/a.txt"));
  assert!(roots.file_exists("builds/widget/rc001/buildlog.json"));
  assert!(!roots.file_exists("builds/widget/rc001/.git"));

  let output = run_pkgrail(&roots, &["deploy", "widget", "--release", "minor"])?;
  let stdout = String::from_utf8_lossy(&output.stdout);
  assert!(stdout.contains("Deployed widget 1.0.0"), "stdout: {}", stdout);
  assert!(roots.file_exists("deploy/widget/1.0.0/a.txt"));

  let output = run_pkgrail(
    &roots,
    &["publish", "widget", "--version", "1.0.0", "--project", "alpha", "--notes", "first cut"],
  )?;
  let stdout = String::from_utf8_lossy(&output.stdout);
  assert!(stdout.contains("project 'alpha' [id 1 (new)]"), "stdout: {}", stdout);

  let notes = roots.read_file("deploy/widget/1.0.0/release_notes.txt")?;
  assert!(notes.contains("===== [widget][1.0.0] Release Notes ====="));
  assert!(notes.contains("first cut"));

  let registry = roots.read_file("deploy/registry.toml")?;
  assert!(registry.contains("code = \"alpha\""), "registry: {}", registry);
  assert!(registry.contains("widget = \"1.0.0\""), "registry: {}", registry);

  Ok(())
}

#[test]
fn test_second_build_without_force_conflicts() -> Result<()> {
  let roots = TestRoots::new()?;
  roots.add_package("widget", &[("a.txt", "alpha")])?;
  run_pkgrail(&roots, &["build", "widget"])?;

  let output = run_pkgrail_raw(&roots, &["build", "widget"])?;
  assert_eq!(output.status.code(), Some(1));
  let stderr = String::from_utf8_lossy(&output.stderr);
  assert!(stderr.contains("--force"), "stderr: {}", stderr);

  run_pkgrail(&roots, &["build", "widget", "--force"])?;
  assert!(!roots.file_exists("builds/widget/rc002"));

  Ok(())
}

#[test]
fn test_publish_unknown_version_fails() -> Result<()> {
  let roots = TestRoots::new()?;
  roots.add_package("widget", &[("a.txt", "alpha")])?;

  let output = run_pkgrail_raw(&roots, &["publish", "widget", "--version", "3.1.4"])?;
  assert_eq!(output.status.code(), Some(1));
  let stderr = String::from_utf8_lossy(&output.stderr);
  assert!(stderr.contains("3.1.4"), "stderr: {}", stderr);
  assert!(!roots.registry().exists());

  Ok(())
}

#[test]
fn test_missing_root_variable() -> Result<()> {
  let roots = TestRoots::new()?;
  let bin = env!("CARGO_BIN_EXE_pkgrail");

  let output = std::process::Command::new(bin)
    .args(["build", "widget"])
    .env_clear()
    .env("GT_DEV_ROOT", roots.dev_root())
    .env("GT_BUILD_ROOT", roots.build_root())
    .output()?;

  assert_eq!(output.status.code(), Some(1));
  let stderr = String::from_utf8_lossy(&output.stderr);
  assert!(stderr.contains("GT_DEPLOY_ROOT"), "stderr: {}", stderr);

  Ok(())
}

#[test]
fn test_tags_json_orders_numerically() -> Result<()> {
  let roots = TestRoots::new()?;
  for name in ["rc2", "rc10", "rc9", "notes"] {
    std::fs::create_dir_all(roots.build_root().join("widget").join(name))?;
  }

  let output = run_pkgrail(&roots, &["tags", "widget", "--builds", "--json"])?;
  let tags: Vec<serde_json::Value> = serde_json::from_slice(&output.stdout)?;
  let names: Vec<&str> = tags.iter().filter_map(|t| t["name"].as_str()).collect();
  assert_eq!(names, vec!["rc2", "rc9", "rc10"]);

  let output = run_pkgrail(&roots, &["tags", "widget", "--builds"])?;
  let stdout = String::from_utf8_lossy(&output.stdout);
  assert!(stdout.contains("Next build: rc011"), "stdout: {}", stdout);

  Ok(())
}

#[test]
fn test_config_file_overrides_environment() -> Result<()> {
  let roots = TestRoots::new()?;
  roots.add_package("widget", &[("a.txt", "alpha")])?;

  let alt_builds = roots.path.join("alt-builds");
  let config = roots.path.join("pkgrail.toml");
  std::fs::write(
    &config,
    format!(
      "build_root = {:?}\ndev_root = {:?}\ndeploy_root = {:?}\n",
      alt_builds.display().to_string(),
      roots.dev_root().display().to_string(),
      roots.deploy_root().display().to_string()
    ),
  )?;

  run_pkgrail(&roots, &["--config", &config.display().to_string(), "build", "widget"])?;
  assert!(alt_builds.join("widget/rc001/a.txt").exists());
  assert!(!roots.file_exists("builds/widget"));

  Ok(())
}

#[test]
fn test_commit_requires_vcs() -> Result<()> {
  let roots = TestRoots::new()?;
  roots.add_package("widget", &[("a.txt", "alpha")])?;

  let output = run_pkgrail_raw(&roots, &["build", "widget", "--commit", "wip"])?;
  assert_eq!(output.status.code(), Some(1));
  assert!(!roots.file_exists("builds/widget/rc001"));

  Ok(())
}
