//! Process-wide configuration
//!
//! All external roots are read exactly once (from the environment or a
//! `pkgrail.toml` file) into [`EnvConfig`], which is then passed by reference.
//! Nothing below `main` reads environment variables.

use crate::core::error::{EnvironmentError, PkgError, PkgResult, ResultExt};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

pub const BUILD_ROOT_VAR: &str = "GT_BUILD_ROOT";
pub const DEV_ROOT_VAR: &str = "GT_DEV_ROOT";
pub const DEPLOY_ROOT_VAR: &str = "GT_DEPLOY_ROOT";
pub const CFG_ROOT_VAR: &str = "GT_CFG_ROOT";
pub const REPO_SERVER_VAR: &str = "GT_REPO_SERVER";
pub const REPO_ROOT_VAR: &str = "GT_REPO_ROOT";
pub const REGISTRY_VAR: &str = "GT_REGISTRY";

/// Roots and remote locations for every lifecycle stage
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnvConfig {
  /// Where builds (`rc<N>`) are promoted to
  pub build_root: PathBuf,

  /// Parent of local working copies
  pub dev_root: PathBuf,

  /// Where versions (`x.y.z`) are promoted to
  pub deploy_root: PathBuf,

  /// Live config root that `cfg` packages are mirrored into on publish
  #[serde(default)]
  pub cfg_root: Option<PathBuf>,

  /// Git server host (e.g. `git-server`)
  #[serde(default)]
  pub repo_server: Option<String>,

  /// Directory on the git server holding `<name>.git` repos
  #[serde(default)]
  pub repo_root: Option<String>,

  /// Project registry file (default: `<deploy_root>/registry.toml`)
  #[serde(default)]
  pub registry_path: Option<PathBuf>,

  /// Branches that version tags must not be cut from
  #[serde(default = "default_protected_branches")]
  pub protected_branches: Vec<String>,

  /// Identity written into build records
  #[serde(skip, default)]
  pub operator: Operator,
}

fn default_protected_branches() -> Vec<String> {
  vec!["main".to_string(), "master".to_string()]
}

impl EnvConfig {
  /// Read configuration from the process environment
  pub fn from_env() -> PkgResult<Self> {
    Self::from_lookup(|key| std::env::var(key).ok())
  }

  /// Read configuration through an arbitrary variable lookup
  pub fn from_lookup<F>(lookup: F) -> PkgResult<Self>
  where
    F: Fn(&str) -> Option<String>,
  {
    let required = |name: &str| -> PkgResult<String> {
      lookup(name)
        .filter(|v| !v.is_empty())
        .ok_or_else(|| PkgError::from(EnvironmentError::MissingVariable { name: name.to_string() }))
    };
    let optional = |name: &str| lookup(name).filter(|v| !v.is_empty());

    Ok(Self {
      build_root: PathBuf::from(required(BUILD_ROOT_VAR)?),
      dev_root: PathBuf::from(required(DEV_ROOT_VAR)?),
      deploy_root: PathBuf::from(required(DEPLOY_ROOT_VAR)?),
      cfg_root: optional(CFG_ROOT_VAR).map(PathBuf::from),
      repo_server: optional(REPO_SERVER_VAR),
      repo_root: optional(REPO_ROOT_VAR),
      registry_path: optional(REGISTRY_VAR).map(PathBuf::from),
      protected_branches: default_protected_branches(),
      operator: Operator::default(),
    })
  }

  /// Load configuration from a TOML file
  pub fn load(path: &Path) -> PkgResult<Self> {
    let content = fs::read_to_string(path).with_context(|| format!("Failed to read config from {}", path.display()))?;
    let config: EnvConfig =
      toml_edit::de::from_str(&content).with_context(|| format!("Failed to parse config from {}", path.display()))?;
    Ok(config)
  }

  /// Attach the operator identity recorded in build records
  pub fn with_operator(mut self, operator: Operator) -> Self {
    self.operator = operator;
    self
  }

  /// Registry file location
  pub fn registry_path(&self) -> PathBuf {
    self
      .registry_path
      .clone()
      .unwrap_or_else(|| self.deploy_root.join("registry.toml"))
  }

  /// Live config root, required when publishing `cfg` packages
  pub fn require_cfg_root(&self) -> PkgResult<&Path> {
    self.cfg_root.as_deref().ok_or_else(|| {
      EnvironmentError::MissingRoot {
        name: CFG_ROOT_VAR.to_string(),
        purpose: "publish cfg packages".to_string(),
      }
      .into()
    })
  }

  /// Remote URL for a package: `<server>:<repo_root>/<name>.git`
  pub fn remote_url(&self, package: &str) -> PkgResult<String> {
    let server = self.repo_server.as_deref().ok_or_else(|| {
      PkgError::from(EnvironmentError::MissingVariable {
        name: REPO_SERVER_VAR.to_string(),
      })
    })?;
    let root = self.repo_root.as_deref().ok_or_else(|| {
      PkgError::from(EnvironmentError::MissingVariable {
        name: REPO_ROOT_VAR.to_string(),
      })
    })?;
    let root = root.trim_end_matches('/');
    Ok(format!("{}:{}/{}.git", server, root, package))
  }
}

/// The person (and machine) performing a transition
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Operator {
  pub login: String,
  pub home: String,
  pub ssh_key: String,
  pub hostname: String,
  pub ip: String,
}

impl Operator {
  /// Detect the current operator from the environment and host
  pub fn detect() -> Self {
    let login = std::env::var("USERNAME")
      .or_else(|_| std::env::var("USER"))
      .unwrap_or_default();
    let home = std::env::var("USERPROFILE")
      .or_else(|_| std::env::var("HOME"))
      .unwrap_or_default()
      .replace('\\', "/");
    let ssh_key = format!("{}/.ssh/id_rsa.pub", home.trim_end_matches('/'));
    let hostname = detect_hostname();
    let ip = resolve_ip(&hostname);

    Self {
      login,
      home,
      ssh_key,
      hostname,
      ip,
    }
  }
}

fn detect_hostname() -> String {
  hostname::get()
    .ok()
    .and_then(|name| name.into_string().ok())
    .filter(|name| !name.is_empty())
    .unwrap_or_else(|| "localhost".to_string())
}

fn resolve_ip(hostname: &str) -> String {
  use std::net::ToSocketAddrs;

  (hostname, 0)
    .to_socket_addrs()
    .ok()
    .and_then(|mut addrs| addrs.find(|a| a.is_ipv4()))
    .map(|a| a.ip().to_string())
    .unwrap_or_else(|| "127.0.0.1".to_string())
}
