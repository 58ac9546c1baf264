//! Next-tag computation
//!
//! Pure functions: given the current highest tag (or the zero-tag of an empty
//! store) compute the tag the next transition will mint.

use crate::core::error::{PkgResult, ReleaseError};
use crate::release::tag::{Tag, TagKey, TagKind};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Width of the zero-padded build number (`rc004`)
pub const BUILD_NUMBER_WIDTH: usize = 3;

/// Which version component a release increments
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ReleaseKind {
  /// `(major + 1, 0, 0)`
  Major,
  /// `(major, minor + 1, 0)`
  Minor,
  /// `(major, minor, bug + 1)`
  Bug,
}

impl ReleaseKind {
  /// Apply this release kind to a version triple, `None` on overflow
  pub fn apply(self, version: &semver::Version) -> Option<semver::Version> {
    match self {
      ReleaseKind::Major => Some(semver::Version::new(version.major.checked_add(1)?, 0, 0)),
      ReleaseKind::Minor => Some(semver::Version::new(version.major, version.minor.checked_add(1)?, 0)),
      ReleaseKind::Bug => Some(semver::Version::new(version.major, version.minor, version.patch.checked_add(1)?)),
    }
  }
}

impl fmt::Display for ReleaseKind {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      ReleaseKind::Major => write!(f, "major"),
      ReleaseKind::Minor => write!(f, "minor"),
      ReleaseKind::Bug => write!(f, "bug"),
    }
  }
}

impl FromStr for ReleaseKind {
  type Err = String;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s.to_ascii_lowercase().as_str() {
      "major" => Ok(ReleaseKind::Major),
      "minor" => Ok(ReleaseKind::Minor),
      "bug" => Ok(ReleaseKind::Bug),
      other => Err(format!("Unknown release type '{}'. Expected major, minor or bug", other)),
    }
  }
}

/// Increment the build number: `rc003` -> `rc004`, `rc0` -> `rc001`
pub fn next_build_tag(current: &Tag) -> PkgResult<Tag> {
  let next = match current.key(TagKind::Build) {
    Some(TagKey::Build(n)) => n.checked_add(1),
    _ => None,
  };
  match next {
    Some(n) => Ok(Tag::named(format!("rc{:0width$}", n, width = BUILD_NUMBER_WIDTH))),
    None => Err(
      ReleaseError::InvalidTag {
        name: current.name.clone(),
        kind: TagKind::Build,
      }
      .into(),
    ),
  }
}

/// Increment the version component selected by `release`
pub fn next_version_tag(current: &Tag, release: ReleaseKind) -> PkgResult<Tag> {
  let next = match current.key(TagKind::Version) {
    Some(TagKey::Version(version)) => release.apply(&version),
    _ => None,
  };
  match next {
    Some(version) => Ok(Tag::named(version.to_string())),
    None => Err(
      ReleaseError::InvalidTag {
        name: current.name.clone(),
        kind: TagKind::Version,
      }
      .into(),
    ),
  }
}
