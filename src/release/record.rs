//! Build records and release notes
//!
//! A [`BuildRecord`] is written once into every promoted tag directory. It is
//! never rewritten in place: a forced re-promotion replaces the whole directory
//! first, so the record is always created fresh.

use crate::core::config::Operator;
use crate::core::error::{PkgResult, ResultExt};
use crate::release::package::PackageSnapshot;
use crate::release::tag::Tag;
use serde::{Deserialize, Serialize, Serializer};
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

/// Record file name inside each tag directory
pub const BUILD_RECORD_FILE: &str = "buildlog.json";

/// Release notes file name inside each version directory
pub const RELEASE_NOTES_FILE: &str = "release_notes.txt";

/// Tag fields kept in a persisted record; `id` and `path` are local to the store that listed the tag
pub const RECORD_TAG_FIELDS: &[&str] = &["name", "commit", "branch"];

/// Provenance of one promotion
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildRecord {
  /// `%y/%m/%d-%H:%M` local time
  pub date: String,
  pub user: Operator,
  #[serde(serialize_with = "serialize_tag")]
  pub tag: Tag,
  #[serde(alias = "pkg")]
  pub package: PackageSnapshot,
  /// Digest of the source tree the build was taken from
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub source_digest: Option<String>,
}

impl BuildRecord {
  /// Stamp a new record with the current local time
  pub fn new(user: Operator, tag: Tag, package: PackageSnapshot) -> Self {
    Self {
      date: chrono::Local::now().format("%y/%m/%d-%H:%M").to_string(),
      user,
      tag,
      package,
      source_digest: None,
    }
  }

  /// Attach the source tree digest
  pub fn with_source_digest(mut self, digest: Option<String>) -> Self {
    self.source_digest = digest;
    self
  }

  /// Record location inside a tag directory
  pub fn path_in(dir: &Path) -> PathBuf {
    dir.join(BUILD_RECORD_FILE)
  }

  /// Write the record into `dir`. Fails if a record already exists there.
  pub fn write(&self, dir: &Path) -> PkgResult<PathBuf> {
    let path = Self::path_in(dir);
    let json = serde_json::to_string_pretty(self)?;
    let mut file = OpenOptions::new()
      .write(true)
      .create_new(true)
      .open(&path)
      .with_context(|| format!("Failed to create build record {}", path.display()))?;
    file
      .write_all(json.as_bytes())
      .with_context(|| format!("Failed to write build record {}", path.display()))?;
    Ok(path)
  }

  /// Read the record stored in `dir`
  pub fn read(dir: &Path) -> PkgResult<Self> {
    let path = Self::path_in(dir);
    let content = fs::read_to_string(&path).with_context(|| format!("Failed to read {}", path.display()))?;
    let record = serde_json::from_str(&content).with_context(|| format!("Failed to parse {}", path.display()))?;
    Ok(record)
  }

  /// Commit recorded in `dir`, if a readable record with a commit exists
  pub fn read_commit(dir: &Path) -> Option<String> {
    match Self::read(dir) {
      Ok(record) => record.tag.commit,
      Err(e) => {
        tracing::debug!(path = %dir.display(), error = %e, "no readable build record");
        None
      }
    }
  }

  /// Render the plain-text release notes for this record
  pub fn render_release_notes(&self, notes: Option<&str>) -> PkgResult<String> {
    let mut text = format!(
      "\n===== [{}][{}] Release Notes =====\n",
      self.package.name, self.package.version
    );
    text.push_str(&format!("Notes: \n{}\n\n", notes.unwrap_or("")));
    text.push_str(&serde_json::to_string_pretty(self)?);
    text.push('\n');
    Ok(text)
  }
}

fn serialize_tag<S: Serializer>(tag: &Tag, serializer: S) -> Result<S::Ok, S::Error> {
  tag.dump(RECORD_TAG_FIELDS).serialize(serializer)
}
