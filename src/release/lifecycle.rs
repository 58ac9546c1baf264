//! Build -> deploy -> publish state machine for one package
//!
//! ```text
//! Local --build()--> Built (rc<N>) --deploy(kind)--> Deployed (x.y.z) --publish(version, project)--> Published
//! ```
//!
//! Every promotion copies into a hidden staging directory next to the
//! destination, writes the [`BuildRecord`] there, and renames it into place.
//! A failed copy never leaves a partial tag directory behind.

use crate::core::config::EnvConfig;
use crate::core::error::{PkgError, PkgResult, ReleaseError, ResultExt};
use crate::registry::{ConfigEntry, ConfigRegistry};
use crate::release::package::{PackageLayout, PackageSnapshot, RootKind};
use crate::release::policy::{ReleaseKind, next_build_tag, next_version_tag};
use crate::release::record::{BUILD_RECORD_FILE, BuildRecord, RELEASE_NOTES_FILE};
use crate::release::store::TagStore;
use crate::release::tag::{Tag, TagKind};
use crate::utils::{CopyFilter, copy_tree, tree_digest};
use serde::Serialize;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

/// Project `cfg` packages always publish into
pub const DEFAULT_PROJECT: &str = "default";

/// Copied from the working copy into a build
const BUILD_FILTER: CopyFilter<'static> = CopyFilter {
  names: &[".git"],
  extensions: &[],
};

/// Copied from a build into a version
const DEPLOY_FILTER: CopyFilter<'static> = CopyFilter {
  names: &[".git", ".gitignore", BUILD_RECORD_FILE],
  extensions: &["pyc"],
};

/// Lifecycle transition
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
  Build,
  Deploy,
  Publish,
}

impl fmt::Display for Stage {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Stage::Build => write!(f, "build"),
      Stage::Deploy => write!(f, "deploy"),
      Stage::Publish => write!(f, "publish"),
    }
  }
}

/// Observer notified when a transition starts
pub trait TraceHook {
  fn enter(&self, stage: Stage, package: &str, tag: &str);
}

/// Ignores every transition
pub struct NoopTrace;

impl TraceHook for NoopTrace {
  fn enter(&self, _stage: Stage, _package: &str, _tag: &str) {}
}

/// Emits a debug event per transition
pub struct LogTrace;

impl TraceHook for LogTrace {
  fn enter(&self, stage: Stage, package: &str, tag: &str) {
    tracing::debug!(%stage, package, tag, "entering transition");
  }
}

/// One requested transition
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LifecycleAction {
  Build,
  Deploy(ReleaseKind),
  Publish {
    version: String,
    project: String,
    notes: Option<String>,
  },
}

/// Result of [`ReleaseLifecycle::run`]
#[derive(Debug, Clone)]
pub enum LifecycleOutcome {
  Built(BuildRecord),
  Deployed(BuildRecord),
  Published(PublishReport),
}

/// What a publish changed
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PublishReport {
  pub package: String,
  pub version: String,
  /// Project code the version was pinned under
  pub project: String,
  pub entry_id: u64,
  /// Whether the registry entry was created by this publish
  pub created_entry: bool,
  pub notes_path: Option<PathBuf>,
  /// Live config root the version was mirrored into (`cfg` packages)
  pub mirrored_to: Option<PathBuf>,
}

/// Drives one package through its lifecycle stages
pub struct ReleaseLifecycle<'a, S: TagStore, R: ConfigRegistry> {
  config: &'a EnvConfig,
  package: PackageSnapshot,
  layout: PackageLayout,
  store: S,
  registry: R,
  trace: Box<dyn TraceHook>,
  force: bool,
}

impl<'a, S: TagStore, R: ConfigRegistry> ReleaseLifecycle<'a, S, R> {
  pub fn new(config: &'a EnvConfig, package: PackageSnapshot, store: S, registry: R) -> Self {
    let layout = PackageLayout::resolve(config, &package);
    Self {
      config,
      package,
      layout,
      store,
      registry,
      trace: Box::new(NoopTrace),
      force: false,
    }
  }

  /// Install a transition observer
  pub fn with_trace(mut self, trace: Box<dyn TraceHook>) -> Self {
    self.trace = trace;
    self
  }

  /// Allow replacing existing destinations
  pub fn with_force(mut self, force: bool) -> Self {
    self.force = force;
    self
  }

  pub fn package(&self) -> &PackageSnapshot {
    &self.package
  }

  pub fn layout(&self) -> &PackageLayout {
    &self.layout
  }

  pub fn store(&self) -> &S {
    &self.store
  }

  pub fn registry(&self) -> &R {
    &self.registry
  }

  /// Dispatch one action
  pub fn run(&mut self, action: LifecycleAction) -> PkgResult<LifecycleOutcome> {
    match action {
      LifecycleAction::Build => self.build().map(LifecycleOutcome::Built),
      LifecycleAction::Deploy(release) => self.deploy(release).map(LifecycleOutcome::Deployed),
      LifecycleAction::Publish {
        version,
        project,
        notes,
      } => self
        .publish(&version, &project, notes.as_deref())
        .map(LifecycleOutcome::Published),
    }
  }

  /// Copy the working copy into the build root under the next build tag
  pub fn build(&mut self) -> PkgResult<BuildRecord> {
    self.build_stage(false)
  }

  /// Build, then promote that build into the deploy root under the next version
  pub fn deploy(&mut self, release: ReleaseKind) -> PkgResult<BuildRecord> {
    // Refuse before the internal build copies anything
    self.store.check_promotion(TagKind::Version)?;

    let mut tag = match self.store.highest_tag(TagKind::Version)? {
      Some(current) => next_version_tag(&current, release)?,
      None => Tag::zero(TagKind::Version),
    };

    let build = self.build_stage(true)?;
    let build_path = self.layout.tag_path(TagKind::Build, &build.tag.name);
    tag.path = self.layout.tag_path(TagKind::Version, &tag.name);
    tag.commit = build.tag.commit.clone();
    tag.branch = build.tag.branch.clone();
    self.trace.enter(Stage::Deploy, &self.package.name, &tag.name);

    let mut package = self.package.clone();
    package.version = tag.name.clone();
    let record = BuildRecord::new(self.config.operator.clone(), tag, package.clone())
      .with_source_digest(build.source_digest.clone());

    self.promote(Stage::Deploy, &build_path, &record, DEPLOY_FILTER)?;
    self.store.record_tag(TagKind::Version, &record.tag)?;
    self.package = package;

    tracing::info!(
      package = %self.package.name,
      build = %build.tag.name,
      version = %record.tag.name,
      %release,
      "deployed"
    );
    Ok(record)
  }

  /// Pin an existing version under a project in the registry
  pub fn publish(&mut self, version: &str, project: &str, notes: Option<&str>) -> PkgResult<PublishReport> {
    self.trace.enter(Stage::Publish, &self.package.name, version);

    if !TagKind::Version.matches(version) {
      return Err(PkgError::Release(ReleaseError::InvalidTag {
        name: version.to_string(),
        kind: TagKind::Version,
      }));
    }
    let version_path = self.layout.tag_path(TagKind::Version, version);
    if !version_path.is_dir() {
      tracing::warn!(package = %self.package.name, version, path = %version_path.display(), "version not deployed");
      return Err(PkgError::Release(ReleaseError::TagNotFound {
        package: self.package.name.clone(),
        tag: version.to_string(),
      }));
    }

    let is_cfg = self.package.root == RootKind::Cfg;
    let project = if is_cfg { DEFAULT_PROJECT } else { project };
    let cfg_root = if is_cfg {
      Some(self.config.require_cfg_root()?.to_path_buf())
    } else {
      None
    };

    let (mut entry, created_entry) = match self.registry.find_one(project) {
      Some(entry) => (entry.clone(), false),
      None => (ConfigEntry::new(self.registry.next_id(), project), true),
    };

    let notes_path = if BuildRecord::path_in(&version_path).exists() {
      let record = BuildRecord::read(&version_path)?;
      let path = version_path.join(RELEASE_NOTES_FILE);
      fs::write(&path, record.render_release_notes(notes)?)
        .with_context(|| format!("Failed to write release notes {}", path.display()))?;
      Some(path)
    } else {
      tracing::warn!(package = %self.package.name, version, "no build record, skipping release notes");
      None
    };

    let mirrored_to = match cfg_root {
      Some(root) => {
        self.mirror(&version_path, &root, version)?;
        Some(root)
      }
      None => None,
    };

    self.package.version = version.to_string();
    entry.upsert(&self.package);
    self.registry.upsert(entry.clone());
    self.registry.persist()?;

    tracing::info!(package = %self.package.name, version, project = %entry.code, id = entry.id, "published");
    Ok(PublishReport {
      package: self.package.name.clone(),
      version: version.to_string(),
      project: entry.code,
      entry_id: entry.id,
      created_entry,
      notes_path,
      mirrored_to,
    })
  }

  /// Shared by `build()` and the build step of `deploy()`.
  ///
  /// An unchanged source maps onto the highest build's tag. `reuse_unchanged`
  /// returns that build as-is instead of re-promoting it (unless forced).
  fn build_stage(&mut self, reuse_unchanged: bool) -> PkgResult<BuildRecord> {
    self.store.check_promotion(TagKind::Build)?;

    let latest = self.store.highest_tag(TagKind::Build)?;
    let next = next_build_tag(latest.as_ref().unwrap_or(&Tag::zero(TagKind::Build)))?;

    let source = self.layout.local_root.clone();
    if !source.is_dir() {
      return Err(self.transition_error(
        Stage::Build,
        &next.name,
        format!("working copy {} does not exist", source.display()),
      ));
    }
    let digest =
      tree_digest(&source, BUILD_FILTER).map_err(|e| self.transition_error(Stage::Build, &next.name, e.to_string()))?;

    let unchanged = latest.filter(|tag| {
      BuildRecord::read(&tag.path)
        .ok()
        .and_then(|r| r.source_digest)
        .is_some_and(|d| d == digest)
    });

    let (mut tag, fresh) = match unchanged {
      Some(previous) if reuse_unchanged && !self.force => {
        tracing::info!(package = %self.package.name, build = %previous.name, "source unchanged, reusing build");
        let mut record = BuildRecord::read(&previous.path)?;
        record.tag.path = previous.path;
        return Ok(record);
      }
      Some(previous) => (previous, false),
      None => (next, true),
    };
    tag.id = None;
    tag.path = self.layout.tag_path(TagKind::Build, &tag.name);
    let revision = self.store.source_revision();
    tag.commit = revision.commit;
    tag.branch = revision.branch;
    self.trace.enter(Stage::Build, &self.package.name, &tag.name);

    let record =
      BuildRecord::new(self.config.operator.clone(), tag, self.package.clone()).with_source_digest(Some(digest));
    self.promote(Stage::Build, &source, &record, BUILD_FILTER)?;
    if fresh {
      self.store.record_tag(TagKind::Build, &record.tag)?;
    }

    tracing::info!(package = %self.package.name, build = %record.tag.name, "built");
    Ok(record)
  }

  /// Copy `source` to `record.tag.path` through a staging directory
  fn promote(&self, stage: Stage, source: &Path, record: &BuildRecord, filter: CopyFilter<'_>) -> PkgResult<()> {
    let tag = &record.tag;
    let dest = &tag.path;

    if dest.exists() && !self.force {
      return Err(PkgError::Release(ReleaseError::TransitionConflict {
        package: self.package.name.clone(),
        stage,
        tag: tag.name.clone(),
        path: dest.clone(),
      }));
    }

    let parent = dest
      .parent()
      .ok_or_else(|| self.transition_error(stage, &tag.name, format!("{} has no parent", dest.display())))?;
    fs::create_dir_all(parent).with_context(|| format!("Failed to create {}", parent.display()))?;

    let staging = parent.join(format!(".{}.staging", tag.name));
    if staging.exists() {
      fs::remove_dir_all(&staging).with_context(|| format!("Failed to clear {}", staging.display()))?;
    }

    tracing::debug!(%stage, from = %source.display(), to = %dest.display(), "copying");
    let staged = copy_tree(source, &staging, filter).and_then(|files| record.write(&staging).map(|_| files));
    let files = match staged {
      Ok(files) => files,
      Err(e) => {
        if let Err(cleanup) = fs::remove_dir_all(&staging) {
          tracing::warn!(path = %staging.display(), error = %cleanup, "failed to remove staging directory");
        }
        return Err(self.transition_error(stage, &tag.name, e.to_string()));
      }
    };

    if dest.exists() {
      tracing::info!(%stage, path = %dest.display(), "replacing existing destination");
      fs::remove_dir_all(dest).with_context(|| format!("Failed to remove {}", dest.display()))?;
    }
    fs::rename(&staging, dest)
      .with_context(|| format!("Failed to move {} to {}", staging.display(), dest.display()))?;

    tracing::debug!(%stage, files, path = %dest.display(), "promoted");
    Ok(())
  }

  /// Merge a version into the live config root, minus the build record
  fn mirror(&self, version_path: &Path, root: &Path, version: &str) -> PkgResult<()> {
    copy_tree(version_path, root, CopyFilter::NONE)
      .map_err(|e| self.transition_error(Stage::Publish, version, e.to_string()))?;

    let record = root.join(BUILD_RECORD_FILE);
    if record.exists() {
      fs::remove_file(&record).with_context(|| format!("Failed to remove {}", record.display()))?;
    }
    tracing::debug!(from = %version_path.display(), to = %root.display(), "mirrored into config root");
    Ok(())
  }

  fn transition_error(&self, stage: Stage, tag: &str, message: String) -> PkgError {
    PkgError::Release(ReleaseError::Transition {
      package: self.package.name.clone(),
      stage,
      tag: tag.to_string(),
      message,
    })
  }
}
