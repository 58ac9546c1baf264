//! Package configuration and per-stage filesystem layout

use crate::core::config::EnvConfig;
use crate::core::error::{PkgResult, ResultExt};
use crate::release::tag::TagKind;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

/// Per-package settings file inside the working copy
pub const PACKAGE_FILE: &str = "package.toml";

/// Selects which root mapping and promotion rules apply to a package
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RootKind {
  /// Builds live next to the working copies (`<dev_root>/builds`)
  Dev,
  #[default]
  Build,
  Deploy,
  /// Published versions are mirrored into the live config root
  Cfg,
}

impl fmt::Display for RootKind {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      RootKind::Dev => write!(f, "dev"),
      RootKind::Build => write!(f, "build"),
      RootKind::Deploy => write!(f, "deploy"),
      RootKind::Cfg => write!(f, "cfg"),
    }
  }
}

/// The package fields needed to reproduce a release
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageSnapshot {
  #[serde(default)]
  pub name: String,

  #[serde(default = "default_version")]
  pub version: String,

  #[serde(default)]
  pub root: RootKind,

  #[serde(default)]
  pub platform: Option<String>,

  #[serde(rename = "type", default)]
  pub kind: Option<String>,
}

fn default_version() -> String {
  "0.0.0".to_string()
}

impl PackageSnapshot {
  /// A package with default settings
  pub fn new(name: impl Into<String>) -> Self {
    Self {
      name: name.into(),
      version: default_version(),
      root: RootKind::default(),
      platform: None,
      kind: None,
    }
  }

  /// Set the root kind
  pub fn with_root(mut self, root: RootKind) -> Self {
    self.root = root;
    self
  }

  /// Load `<dev_root>/<name>/package.toml`, falling back to defaults when absent
  pub fn load(dev_root: &Path, name: &str) -> PkgResult<Self> {
    let path = dev_root.join(name).join(PACKAGE_FILE);
    if !path.exists() {
      return Ok(Self::new(name));
    }

    let content = fs::read_to_string(&path).with_context(|| format!("Failed to read {}", path.display()))?;
    let mut snapshot: PackageSnapshot =
      toml_edit::de::from_str(&content).with_context(|| format!("Failed to parse {}", path.display()))?;
    // Directory name wins over whatever the file says
    snapshot.name = name.to_string();
    Ok(snapshot)
  }
}

/// Where each lifecycle stage of one package lives on disk
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageLayout {
  /// Working copy
  pub local_root: PathBuf,
  /// Parent of this package's `rc<N>` directories
  pub build_root: PathBuf,
  /// Parent of this package's `x.y.z` directories
  pub deploy_root: PathBuf,
}

impl PackageLayout {
  /// Resolve a package's roots from the process configuration
  pub fn resolve(config: &EnvConfig, package: &PackageSnapshot) -> Self {
    let local_root = config.dev_root.join(&package.name);

    let mut build_root = match package.root {
      RootKind::Dev => config.dev_root.join("builds"),
      _ => config.build_root.clone(),
    };
    build_root.push(&package.name);

    let mut deploy_root = config.deploy_root.join(&package.name);

    if package.platform.is_some() {
      build_root.push(std::env::consts::OS);
      deploy_root.push(std::env::consts::OS);
    }

    Self {
      local_root,
      build_root,
      deploy_root,
    }
  }

  /// Root holding tags of `kind`
  pub fn root_for(&self, kind: TagKind) -> &Path {
    match kind {
      TagKind::Build => &self.build_root,
      TagKind::Version => &self.deploy_root,
    }
  }

  /// Directory a tag of `kind` named `name` is promoted into
  pub fn tag_path(&self, kind: TagKind, name: &str) -> PathBuf {
    self.root_for(kind).join(name)
  }
}
