//! Build and version tags
//!
//! A tag is identified by its `name` within its kind:
//! - build tags: `rc<digits>` (e.g. `rc003`), ordered by the integer suffix
//! - version tags: `<major>.<minor>.<bug>` (e.g. `1.4.0`), ordered numerically
//!
//! Lexicographic ordering is never used: `rc2 < rc10` and `1.9.0 < 1.10.0`.

use regex::Regex;
use semver::Version;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::sync::LazyLock;

static BUILD_TAG: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^rc(\d+)$").expect("valid build tag regex"));
static VERSION_TAG: LazyLock<Regex> =
  LazyLock::new(|| Regex::new(r"^(\d+)\.(\d+)\.(\d+)$").expect("valid version tag regex"));

/// Which namespace a tag belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TagKind {
  Build,
  Version,
}

impl TagKind {
  /// Tag reported as "current" when a store holds no tags of this kind
  pub fn zero_tag_name(self) -> &'static str {
    match self {
      TagKind::Build => "rc0",
      TagKind::Version => "1.0.0",
    }
  }

  /// Parse a tag name into its ordering key, if it belongs to this kind
  pub fn parse_key(self, name: &str) -> Option<TagKey> {
    match self {
      TagKind::Build => {
        let caps = BUILD_TAG.captures(name)?;
        caps[1].parse::<u64>().ok().map(TagKey::Build)
      }
      TagKind::Version => {
        let caps = VERSION_TAG.captures(name)?;
        let major = caps[1].parse::<u64>().ok()?;
        let minor = caps[2].parse::<u64>().ok()?;
        let bug = caps[3].parse::<u64>().ok()?;
        Some(TagKey::Version(Version::new(major, minor, bug)))
      }
    }
  }

  /// Check whether a name is a valid tag of this kind
  pub fn matches(self, name: &str) -> bool {
    self.parse_key(name).is_some()
  }
}

impl fmt::Display for TagKind {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      TagKind::Build => write!(f, "build"),
      TagKind::Version => write!(f, "version"),
    }
  }
}

/// Ordering key derived from a tag name
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub enum TagKey {
  Build(u64),
  Version(Version),
}

/// A build or version tag
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tag {
  /// VCS ref identifier (object id reported by the remote)
  #[serde(default)]
  pub id: Option<String>,

  /// Resolved commit hash; filled lazily, may stay absent
  #[serde(default)]
  pub commit: Option<String>,

  /// Tag label, e.g. `rc003` or `1.4.0`
  pub name: String,

  /// Filesystem location of this tag's promoted tree
  #[serde(default)]
  pub path: PathBuf,

  /// Branch the tag was cut from (VCS-backed packages)
  #[serde(default)]
  pub branch: Option<String>,
}

impl Tag {
  /// Create a tag with only a name
  pub fn named(name: impl Into<String>) -> Self {
    Self {
      name: name.into(),
      ..Default::default()
    }
  }

  /// The zero-tag of a kind (`rc0` / `1.0.0`)
  pub fn zero(kind: TagKind) -> Self {
    Self::named(kind.zero_tag_name())
  }

  /// Set the filesystem path
  pub fn at(mut self, path: impl Into<PathBuf>) -> Self {
    self.path = path.into();
    self
  }

  /// Ordering key under `kind`, if the name is valid for it
  pub fn key(&self, kind: TagKind) -> Option<TagKey> {
    kind.parse_key(&self.name)
  }

  /// Project the tag onto a whitelist of fields.
  ///
  /// An empty whitelist keeps every field.
  pub fn dump(&self, fields: &[&str]) -> serde_json::Value {
    let mut value = serde_json::to_value(self).unwrap_or(serde_json::Value::Null);
    if !fields.is_empty()
      && let Some(map) = value.as_object_mut()
    {
      map.retain(|key, _| fields.contains(&key.as_str()));
    }
    value
  }
}

impl fmt::Display for Tag {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.name)
  }
}

/// Order discovered tags of one kind.
///
/// Names that do not parse under `kind` are dropped. Tags whose keys compare
/// equal (e.g. `rc1` and `rc001`) collapse to the one discovered last.
pub fn order_tags(kind: TagKind, tags: Vec<Tag>) -> Vec<Tag> {
  let mut keyed: Vec<(TagKey, Tag)> = tags
    .into_iter()
    .filter_map(|tag| match tag.key(kind) {
      Some(key) => Some((key, tag)),
      None => {
        tracing::debug!(tag = %tag.name, %kind, "skipping tag that does not match kind");
        None
      }
    })
    .collect();

  // Stable: equal keys keep discovery order, so the last one is the latest discovered
  keyed.sort_by(|a, b| a.0.cmp(&b.0));

  let mut ordered: Vec<(TagKey, Tag)> = Vec::with_capacity(keyed.len());
  for (key, tag) in keyed {
    match ordered.last_mut() {
      Some(last) if last.0 == key => *last = (key, tag),
      _ => ordered.push((key, tag)),
    }
  }

  ordered.into_iter().map(|(_, tag)| tag).collect()
}
