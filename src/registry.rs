//! Project registry: which package versions each project pins
//!
//! Publishing a version records `package -> version` under a project entry.
//! The lifecycle only talks to [`ConfigRegistry`]; [`FileRegistry`] is the
//! TOML-file implementation used by the CLI.

use crate::core::error::{PkgResult, ResultExt};
use crate::release::package::PackageSnapshot;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

/// One project and the package versions it pins
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigEntry {
  pub id: u64,
  /// Lowercased project code
  pub code: String,
  #[serde(default)]
  pub packages: BTreeMap<String, String>,
}

impl ConfigEntry {
  pub fn new(id: u64, code: &str) -> Self {
    Self {
      id,
      code: code.to_lowercase(),
      packages: BTreeMap::new(),
    }
  }

  /// Pin the snapshot's current version
  pub fn upsert(&mut self, package: &PackageSnapshot) {
    self.packages.insert(package.name.clone(), package.version.clone());
  }

  /// Version pinned for a package
  pub fn version_of(&self, package: &str) -> Option<&str> {
    self.packages.get(package).map(String::as_str)
  }
}

/// Lookup and upsert of project entries
pub trait ConfigRegistry {
  /// Entries in lookup order
  fn entries(&self) -> &[ConfigEntry];

  /// Insert or replace the entry with the same id
  fn upsert(&mut self, entry: ConfigEntry);

  /// Write pending changes to the backing store
  fn persist(&self) -> PkgResult<()>;

  /// First entry whose code matches (case-insensitive)
  fn find_one(&self, code: &str) -> Option<&ConfigEntry> {
    self.entries().iter().find(|e| e.code.eq_ignore_ascii_case(code))
  }

  /// Next free id: one past the highest, or 1 for an empty registry
  fn next_id(&self) -> u64 {
    self.entries().iter().map(|e| e.id).max().map_or(1, |id| id + 1)
  }
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct RegistryFile {
  #[serde(default)]
  projects: Vec<ConfigEntry>,
}

/// Registry stored as `[[projects]]` tables in a TOML file
#[derive(Debug)]
pub struct FileRegistry {
  path: PathBuf,
  entries: Vec<ConfigEntry>,
}

impl FileRegistry {
  /// Load the registry. A missing file is an empty registry.
  pub fn load(path: &Path) -> PkgResult<Self> {
    let entries = if path.exists() {
      let content = fs::read_to_string(path).with_context(|| format!("Failed to read registry {}", path.display()))?;
      let file: RegistryFile =
        toml_edit::de::from_str(&content).with_context(|| format!("Failed to parse registry {}", path.display()))?;
      file.projects
    } else {
      Vec::new()
    };

    tracing::debug!(path = %path.display(), entries = entries.len(), "loaded registry");
    Ok(Self {
      path: path.to_path_buf(),
      entries,
    })
  }

  pub fn path(&self) -> &Path {
    &self.path
  }
}

impl ConfigRegistry for FileRegistry {
  fn entries(&self) -> &[ConfigEntry] {
    &self.entries
  }

  fn upsert(&mut self, entry: ConfigEntry) {
    match self.entries.iter_mut().find(|e| e.id == entry.id) {
      Some(existing) => *existing = entry,
      None => self.entries.push(entry),
    }
  }

  fn persist(&self) -> PkgResult<()> {
    if let Some(parent) = self.path.parent() {
      fs::create_dir_all(parent).with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    let file = RegistryFile {
      projects: self.entries.clone(),
    };
    let content = toml_edit::ser::to_string_pretty(&file)?;
    fs::write(&self.path, content).with_context(|| format!("Failed to write registry {}", self.path.display()))?;
    Ok(())
  }
}
