//! Version-control capability used by VCS-backed tag stores
//!
//! Every primitive is synchronous and fallible. Failures surface as
//! [`GitError::CommandFailed`](crate::core::error::GitError) carrying the
//! captured stdout/stderr. Nothing here retries; that is the caller's decision.

pub mod system_git;

pub use system_git::SystemGit;

use crate::core::error::PkgResult;
use std::path::Path;

/// Clone/fetch/tag primitives over one package repository
pub trait VcsClient {
  /// Remote location this client talks to
  fn remote(&self) -> &str;

  /// Local working copy
  fn work_tree(&self) -> &Path;

  /// Whether the working copy exists and is a repository
  fn is_repo(&self) -> bool;

  /// Clone the remote into the working copy path
  fn clone_remote(&self, branch: Option<&str>) -> PkgResult<()>;

  /// Fetch all remotes, including tags
  fn fetch_all(&self) -> PkgResult<()>;

  /// Raw `<ref-id>\t<ref>` lines for every remote tag
  fn list_remote_tags(&self) -> PkgResult<Vec<String>>;

  /// Commit a ref points at
  fn resolve_commit(&self, reference: &str) -> PkgResult<String>;

  /// Checked-out branch of the working copy
  fn current_branch(&self) -> PkgResult<String>;

  /// Create an annotated tag at HEAD
  fn create_tag(&self, name: &str, message: &str) -> PkgResult<()>;

  /// Push all local tags to `origin`
  fn push_tags(&self) -> PkgResult<()>;

  /// Stage everything and commit. An empty commit is not an error.
  fn commit(&self, message: &str) -> PkgResult<()>;
}
