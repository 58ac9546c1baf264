//! Integration tests for the release lifecycle through the library API

use crate::helpers::TestRoots;
use anyhow::Result;
use pkgrail::core::config::EnvConfig;
use pkgrail::core::context::ReleaseContext;
use pkgrail::registry::{ConfigRegistry, FileRegistry};
use pkgrail::release::{BuildRecord, ReleaseKind, ReleaseLifecycle, TagKind, TagStore};

fn config(roots: &TestRoots) -> Result<EnvConfig> {
  let env = roots.env();
  let config = EnvConfig::from_lookup(|key| env.iter().find(|(k, _)| *k == key).map(|(_, v)| v.clone()))?;
  Ok(config)
}

fn lifecycle(ctx: &ReleaseContext) -> Result<ReleaseLifecycle<'_, pkgrail::release::FilesystemTagStore, FileRegistry>> {
  Ok(ReleaseLifecycle::new(
    &ctx.config,
    ctx.package.clone(),
    ctx.filesystem_store(),
    ctx.registry()?,
  ))
}

#[test]
fn test_versions_accumulate_across_runs() -> Result<()> {
  let roots = TestRoots::new()?;
  let source = roots.add_package("widget", &[("a.txt", "v1")])?;
  let ctx = ReleaseContext::build(config(&roots)?, "widget")?;

  lifecycle(&ctx)?.deploy(ReleaseKind::Minor)?;

  std::fs::write(source.join("a.txt"), "v2")?;
  lifecycle(&ctx)?.deploy(ReleaseKind::Bug)?;

  std::fs::write(source.join("a.txt"), "v3")?;
  lifecycle(&ctx)?.deploy(ReleaseKind::Minor)?;

  let store = ctx.filesystem_store();
  let versions: Vec<String> = store.list_tags(TagKind::Version)?.into_iter().map(|t| t.name).collect();
  assert_eq!(versions, vec!["1.0.0", "1.0.1", "1.1.0"]);
  let builds: Vec<String> = store.list_tags(TagKind::Build)?.into_iter().map(|t| t.name).collect();
  assert_eq!(builds, vec!["rc001", "rc002", "rc003"]);

  assert_eq!(roots.read_file("deploy/widget/1.1.0/a.txt")?, "v3");
  Ok(())
}

#[test]
fn test_package_file_selects_dev_builds_and_platform() -> Result<()> {
  let roots = TestRoots::new()?;
  roots.add_package(
    "tool",
    &[("run.sh", "echo hi"), ("package.toml", "root = \"dev\"\nplatform = \"native\"\n")],
  )?;
  let ctx = ReleaseContext::build(config(&roots)?, "tool")?;

  let record = lifecycle(&ctx)?.build()?;
  let expected = roots.dev_root().join("builds").join("tool").join(std::env::consts::OS).join("rc001");
  assert_eq!(record.tag.path, expected);
  assert!(expected.join("run.sh").exists());
  Ok(())
}

#[test]
fn test_cfg_package_publishes_into_live_root() -> Result<()> {
  let roots = TestRoots::new()?;
  roots.add_package(
    "settings",
    &[("app.ini", "[core]\nmode = live\n"), ("package.toml", "root = \"cfg\"\n")],
  )?;
  let ctx = ReleaseContext::build(config(&roots)?, "settings")?;

  let mut lc = lifecycle(&ctx)?;
  lc.deploy(ReleaseKind::Major)?;
  let report = lc.publish("1.0.0", "alpha", None)?;

  assert_eq!(report.project, "default");
  assert!(roots.file_exists("cfg/app.ini"));
  assert!(roots.file_exists("cfg/release_notes.txt"));
  assert!(!roots.file_exists("cfg/buildlog.json"));

  let registry = FileRegistry::load(&roots.registry())?;
  assert!(registry.find_one("alpha").is_none());
  assert_eq!(registry.find_one("default").and_then(|e| e.version_of("settings")), Some("1.0.0"));
  Ok(())
}

#[test]
fn test_publish_two_packages_share_project_entry() -> Result<()> {
  let roots = TestRoots::new()?;
  roots.add_package("widget", &[("a.txt", "a")])?;
  roots.add_package("gadget", &[("b.txt", "b")])?;
  let config = config(&roots)?;

  for (name, release) in [("widget", ReleaseKind::Minor), ("gadget", ReleaseKind::Bug)] {
    let ctx = ReleaseContext::build(config.clone(), name)?;
    let mut lc = lifecycle(&ctx)?;
    let record = lc.deploy(release)?;
    lc.publish(&record.tag.name, "Alpha", None)?;
  }

  let registry = FileRegistry::load(&roots.registry())?;
  assert_eq!(registry.entries().len(), 1);
  let entry = registry.find_one("alpha").expect("alpha entry");
  assert_eq!(entry.id, 1);
  assert_eq!(entry.version_of("widget"), Some("1.0.0"));
  assert_eq!(entry.version_of("gadget"), Some("1.0.0"));
  Ok(())
}

#[test]
fn test_version_record_matches_build() -> Result<()> {
  let roots = TestRoots::new()?;
  roots.add_package("widget", &[("a.txt", "a")])?;
  let ctx = ReleaseContext::build(config(&roots)?, "widget")?;

  let deployed = lifecycle(&ctx)?.deploy(ReleaseKind::Minor)?;
  let build = BuildRecord::read(&roots.build_root().join("widget/rc001"))?;
  let version = BuildRecord::read(&deployed.tag.path)?;

  assert_eq!(version.source_digest, build.source_digest);
  assert_eq!(version.package.version, "1.0.0");
  assert_eq!(build.package.version, "0.0.0");
  Ok(())
}
