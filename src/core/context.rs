//! Release context: build once in main, pass by reference to commands
//!
//! ```text
//! main.rs:
//!   ReleaseContext::build(config, package) -> &ReleaseContext
//!   |
//!   v
//! commands/release.rs, tags.rs:
//!   fn run_*(ctx: &ReleaseContext, ...)
//! ```

use crate::core::config::EnvConfig;
use crate::core::error::PkgResult;
use crate::core::vcs::SystemGit;
use crate::registry::FileRegistry;
use crate::release::package::{PackageLayout, PackageSnapshot};
use crate::release::store::{FilesystemTagStore, VcsTagStore};

/// Configuration plus the resolved package a command operates on
#[derive(Debug, Clone)]
pub struct ReleaseContext {
  /// Process configuration (roots, remotes, operator)
  pub config: EnvConfig,

  /// Package settings from `<dev_root>/<name>/package.toml`
  pub package: PackageSnapshot,

  /// Per-stage directories of the package
  pub layout: PackageLayout,
}

impl ReleaseContext {
  /// Load the package settings and resolve its layout
  pub fn build(config: EnvConfig, package: &str) -> PkgResult<Self> {
    let package = PackageSnapshot::load(&config.dev_root, package)?;
    let layout = PackageLayout::resolve(&config, &package);
    tracing::debug!(
      package = %package.name,
      root = %package.root,
      build_root = %layout.build_root.display(),
      deploy_root = %layout.deploy_root.display(),
      "resolved package"
    );
    Ok(Self {
      config,
      package,
      layout,
    })
  }

  /// Tags discovered from the package's directories
  pub fn filesystem_store(&self) -> FilesystemTagStore {
    FilesystemTagStore::new(self.layout.clone())
  }

  /// Tags discovered from the package's remote repository
  pub fn vcs_store(&self) -> PkgResult<VcsTagStore<SystemGit>> {
    let remote = self.config.remote_url(&self.package.name)?;
    let client = SystemGit::new(&self.layout.local_root, remote);
    Ok(VcsTagStore::new(
      client,
      self.layout.clone(),
      &self.package.name,
      self.config.protected_branches.clone(),
    ))
  }

  /// Project registry configured for this process
  pub fn registry(&self) -> PkgResult<FileRegistry> {
    FileRegistry::load(&self.config.registry_path())
  }
}
