//! Integration tests for the git-backed tag store against a local bare repository

use crate::helpers::{TestRoots, bare_repo, configure_identity, git};
use anyhow::Result;
use pkgrail::core::config::EnvConfig;
use pkgrail::core::vcs::{SystemGit, VcsClient};
use pkgrail::registry::FileRegistry;
use pkgrail::release::{PackageLayout, PackageSnapshot, ReleaseKind, ReleaseLifecycle, TagKind, TagStore, VcsTagStore};

fn config(roots: &TestRoots) -> Result<EnvConfig> {
  let env = roots.env();
  let config = EnvConfig::from_lookup(|key| env.iter().find(|(k, _)| *k == key).map(|(_, v)| v.clone()))?;
  Ok(config)
}

fn store(config: &EnvConfig, remote: &std::path::Path) -> VcsTagStore<SystemGit> {
  let package = PackageSnapshot::new("widget");
  let layout = PackageLayout::resolve(config, &package);
  let client = SystemGit::new(&layout.local_root, remote.display().to_string());
  VcsTagStore::new(client, layout, "widget", config.protected_branches.clone())
}

#[test]
fn test_sync_clones_then_fetches() -> Result<()> {
  let roots = TestRoots::new()?;
  let remote = bare_repo(&roots.path, "widget", "dev", &[("a.txt", "alpha")])?;
  let config = config(&roots)?;

  let store = store(&config, &remote);
  assert!(!store.client().is_repo());
  store.sync(false)?;
  assert!(store.client().is_repo());
  assert!(roots.dev_root().join("widget/a.txt").exists());
  assert_eq!(store.client().current_branch()?, "dev");

  // Second sync fetches instead of cloning
  store.sync(false)?;
  Ok(())
}

#[test]
fn test_sync_rejects_non_repository() -> Result<()> {
  let roots = TestRoots::new()?;
  let remote = bare_repo(&roots.path, "widget", "dev", &[("a.txt", "alpha")])?;
  roots.add_package("widget", &[("stray.txt", "not a repo")])?;
  let config = config(&roots)?;

  let store = store(&config, &remote);
  assert!(store.sync(false).is_err());

  store.sync(true)?;
  assert!(store.client().is_repo());
  assert!(!roots.dev_root().join("widget/stray.txt").exists());
  Ok(())
}

#[test]
fn test_deploy_tags_and_pushes() -> Result<()> {
  let roots = TestRoots::new()?;
  let remote = bare_repo(&roots.path, "widget", "dev", &[("a.txt", "alpha")])?;
  let config = config(&roots)?;

  let store = store(&config, &remote);
  store.sync(false)?;
  let work_tree = roots.dev_root().join("widget");
  configure_identity(&work_tree)?;
  let head = String::from_utf8_lossy(&git(&work_tree, &["rev-parse", "HEAD"])?.stdout)
    .trim()
    .to_string();

  let registry = FileRegistry::load(&config.registry_path())?;
  let mut lc = ReleaseLifecycle::new(&config, PackageSnapshot::new("widget"), store, registry);
  let record = lc.deploy(ReleaseKind::Minor)?;
  assert_eq!(record.tag.name, "1.0.0");
  assert_eq!(record.tag.commit.as_deref(), Some(head.as_str()));
  assert_eq!(record.tag.branch.as_deref(), Some("dev"));
  assert!(roots.file_exists("deploy/widget/1.0.0/a.txt"));
  assert!(!roots.file_exists("builds/widget/rc001/.git"));

  // A fresh store sees the pushed tags with their commits
  let fresh = self::store(&config, &remote);
  let builds = fresh.list_tags(TagKind::Build)?;
  assert_eq!(builds.iter().map(|t| t.name.as_str()).collect::<Vec<_>>(), vec!["rc001"]);
  assert_eq!(builds[0].commit.as_deref(), Some(head.as_str()));
  let versions = fresh.list_tags(TagKind::Version)?;
  assert_eq!(versions.iter().map(|t| t.name.as_str()).collect::<Vec<_>>(), vec!["1.0.0"]);

  let tags = String::from_utf8_lossy(&git(&remote, &["tag", "--list"])?.stdout).to_string();
  assert!(tags.contains("rc001") && tags.contains("1.0.0"), "remote tags: {}", tags);
  Ok(())
}

#[test]
fn test_protected_branch_refuses_version() -> Result<()> {
  let roots = TestRoots::new()?;
  let remote = bare_repo(&roots.path, "widget", "master", &[("a.txt", "alpha")])?;
  let config = config(&roots)?;

  let store = store(&config, &remote);
  store.sync(false)?;

  let registry = FileRegistry::load(&config.registry_path())?;
  let mut lc = ReleaseLifecycle::new(&config, PackageSnapshot::new("widget"), store, registry);
  let err = lc.deploy(ReleaseKind::Minor).unwrap_err();
  assert!(err.to_string().contains("master"), "error: {}", err);
  assert!(!roots.file_exists("builds/widget"));
  assert!(!roots.file_exists("deploy/widget"));
  Ok(())
}

#[test]
fn test_unreachable_remote_is_an_error() -> Result<()> {
  let roots = TestRoots::new()?;
  let config = config(&roots)?;

  let store = store(&config, &roots.path.join("server/missing.git"));
  let err = store.list_tags(TagKind::Version).unwrap_err();
  assert!(err.is_store_unreachable());
  Ok(())
}

#[test]
fn test_commit_tolerates_clean_tree() -> Result<()> {
  let roots = TestRoots::new()?;
  let remote = bare_repo(&roots.path, "widget", "dev", &[("a.txt", "alpha")])?;
  let config = config(&roots)?;

  let store = store(&config, &remote);
  store.sync(false)?;
  configure_identity(&roots.dev_root().join("widget"))?;

  store.client().commit("nothing changed")?;

  std::fs::write(roots.dev_root().join("widget/b.txt"), "beta")?;
  store.client().commit("add b")?;
  let log = String::from_utf8_lossy(&git(&roots.dev_root().join("widget"), &["log", "-1", "--format=%s"])?.stdout)
    .trim()
    .to_string();
  assert_eq!(log, "add b");
  Ok(())
}
