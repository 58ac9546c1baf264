//! Tag discovery over the two backing stores
//!
//! - [`FilesystemTagStore`]: tag directories under the package's build/deploy roots
//! - [`VcsTagStore`]: tags in the package's remote repository
//!
//! Both return tags in ascending order (see [`order_tags`]) and re-derive the
//! list from the backing store on every call. Nothing is cached, so tags created
//! by other processes are always seen.

use crate::core::error::{GitError, PkgError, PkgResult, ReleaseError, ResultExt};
use crate::core::vcs::VcsClient;
use crate::release::package::PackageLayout;
use crate::release::record::BuildRecord;
use crate::release::tag::{Tag, TagKind, order_tags};
use regex::Regex;
use std::fs;
use std::sync::LazyLock;

static REMOTE_BUILD_LINE: LazyLock<Regex> =
  LazyLock::new(|| Regex::new(r"^(\S+)\s+\S+/(rc\d+)$").expect("valid remote build line regex"));
static REMOTE_VERSION_LINE: LazyLock<Regex> =
  LazyLock::new(|| Regex::new(r"^(\S+)\s+\S+/(\d+\.\d+\.\d+)$").expect("valid remote version line regex"));

/// Commit and branch of the source a build is taken from
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SourceRevision {
  pub commit: Option<String>,
  pub branch: Option<String>,
}

/// Something that can discover the tags of one package
pub trait TagStore {
  /// All tags of `kind`, ascending
  fn list_tags(&self, kind: TagKind) -> PkgResult<Vec<Tag>>;

  /// Fill `tag.commit` from the store
  fn resolve_commit(&self, tag: &mut Tag) -> PkgResult<()>;

  /// Highest tag of `kind`, or `None` for an empty store
  fn highest_tag(&self, kind: TagKind) -> PkgResult<Option<Tag>> {
    Ok(self.list_tags(kind)?.pop())
  }

  /// Highest tag of `kind`, or the kind's zero-tag for an empty store
  fn current_tag(&self, kind: TagKind) -> PkgResult<Tag> {
    Ok(self.highest_tag(kind)?.unwrap_or_else(|| Tag::zero(kind)))
  }

  /// Revision of the working copy a build is taken from
  fn source_revision(&self) -> SourceRevision {
    SourceRevision::default()
  }

  /// Refuse a promotion before anything is copied
  fn check_promotion(&self, _kind: TagKind) -> PkgResult<()> {
    Ok(())
  }

  /// Publish a freshly minted tag to the store, if the store keeps its own tags
  fn record_tag(&self, _kind: TagKind, _tag: &Tag) -> PkgResult<()> {
    Ok(())
  }
}

/// Tags are directories named `rc<N>` / `x.y.z` under the package roots
pub struct FilesystemTagStore {
  layout: PackageLayout,
}

impl FilesystemTagStore {
  pub fn new(layout: PackageLayout) -> Self {
    Self { layout }
  }
}

impl TagStore for FilesystemTagStore {
  fn list_tags(&self, kind: TagKind) -> PkgResult<Vec<Tag>> {
    let root = self.layout.root_for(kind);
    if !root.exists() {
      tracing::debug!(root = %root.display(), %kind, "tag root missing, no tags yet");
      return Ok(Vec::new());
    }

    let mut tags = Vec::new();
    let entries = fs::read_dir(root).with_context(|| format!("Failed to list {} tags in {}", kind, root.display()))?;
    for entry in entries {
      let entry = entry.with_context(|| format!("Failed to read entry in {}", root.display()))?;
      let path = entry.path();
      if !path.is_dir() {
        continue;
      }
      let Some(name) = entry.file_name().to_str().map(str::to_string) else {
        continue;
      };
      if !kind.matches(&name) {
        continue;
      }

      let mut tag = Tag::named(name).at(path);
      self.resolve_commit(&mut tag)?;
      tags.push(tag);
    }

    Ok(order_tags(kind, tags))
  }

  /// Best-effort: a missing or unreadable record leaves `commit` unset
  fn resolve_commit(&self, tag: &mut Tag) -> PkgResult<()> {
    tag.commit = BuildRecord::read_commit(&tag.path);
    Ok(())
  }
}

/// Tags live in the package's remote repository
pub struct VcsTagStore<C: VcsClient> {
  client: C,
  layout: PackageLayout,
  package: String,
  protected_branches: Vec<String>,
}

impl<C: VcsClient> VcsTagStore<C> {
  pub fn new(client: C, layout: PackageLayout, package: impl Into<String>, protected_branches: Vec<String>) -> Self {
    Self {
      client,
      layout,
      package: package.into(),
      protected_branches,
    }
  }

  /// Underlying VCS client
  pub fn client(&self) -> &C {
    &self.client
  }

  /// Make sure the local working copy exists and is up to date.
  ///
  /// Clones when missing; a non-repository at the path is an error unless
  /// `force`, which removes it and clones again.
  pub fn sync(&self, force: bool) -> PkgResult<()> {
    let work_tree = self.client.work_tree();
    if !work_tree.exists() {
      if let Some(parent) = work_tree.parent() {
        fs::create_dir_all(parent).with_context(|| format!("Failed to create {}", parent.display()))?;
      }
      return self.client.clone_remote(None);
    }

    if !self.client.is_repo() {
      if !force {
        return Err(GitError::NotARepository {
          path: work_tree.to_path_buf(),
        }
        .into());
      }
      tracing::info!(path = %work_tree.display(), "replacing invalid working copy");
      fs::remove_dir_all(work_tree).with_context(|| format!("Failed to remove {}", work_tree.display()))?;
      return self.client.clone_remote(None);
    }

    self.client.fetch_all()
  }

  /// Parse one `<ref-id>\t<remote>/<tag>` line
  fn parse_line(kind: TagKind, line: &str) -> Option<(String, String)> {
    let pattern = match kind {
      TagKind::Build => &REMOTE_BUILD_LINE,
      TagKind::Version => &REMOTE_VERSION_LINE,
    };
    let caps = pattern.captures(line)?;
    Some((caps[1].to_string(), caps[2].to_string()))
  }
}

impl<C: VcsClient> TagStore for VcsTagStore<C> {
  fn list_tags(&self, kind: TagKind) -> PkgResult<Vec<Tag>> {
    let lines = self.client.list_remote_tags()?;

    let mut tags = Vec::new();
    for line in &lines {
      let Some((id, name)) = Self::parse_line(kind, line) else {
        continue;
      };
      let mut tag = Tag::named(&name).at(self.layout.tag_path(kind, &name));
      tag.id = Some(id);
      if let Err(e) = self.resolve_commit(&mut tag) {
        tracing::warn!(package = %self.package, tag = %tag.name, error = %e, "unable to resolve tag commit");
      }
      tags.push(tag);
    }

    tracing::debug!(package = %self.package, %kind, count = tags.len(), "listed remote tags");
    Ok(order_tags(kind, tags))
  }

  fn resolve_commit(&self, tag: &mut Tag) -> PkgResult<()> {
    let reference = tag.id.clone().unwrap_or_else(|| tag.name.clone());
    tag.commit = Some(self.client.resolve_commit(&reference)?);
    Ok(())
  }

  fn source_revision(&self) -> SourceRevision {
    SourceRevision {
      commit: self.client.resolve_commit("HEAD").ok(),
      branch: self.client.current_branch().ok(),
    }
  }

  fn check_promotion(&self, kind: TagKind) -> PkgResult<()> {
    if kind != TagKind::Version {
      return Ok(());
    }
    let branch = self.client.current_branch()?;
    if self.protected_branches.iter().any(|b| *b == branch) {
      return Err(PkgError::Release(ReleaseError::ProtectedBranch { branch }));
    }
    Ok(())
  }

  fn record_tag(&self, kind: TagKind, tag: &Tag) -> PkgResult<()> {
    let message = format!("[{}] {} {}", self.package, kind, tag.name);
    self.client.create_tag(&tag.name, &message)?;
    self.client.push_tags()
  }
}
