//! Tag listing command

use crate::core::context::ReleaseContext;
use crate::core::error::PkgResult;
use crate::release::policy::{ReleaseKind, next_build_tag, next_version_tag};
use crate::release::store::TagStore;
use crate::release::tag::{Tag, TagKind};

/// Fields shown by `tags --json`
const JSON_FIELDS: &[&str] = &["name", "id", "commit", "branch", "path"];

/// Run the tags command
pub fn run_tags(ctx: &ReleaseContext, builds: bool, json: bool, vcs: bool) -> PkgResult<()> {
  let kind = if builds { TagKind::Build } else { TagKind::Version };

  let tags = if vcs {
    let store = ctx.vcs_store()?;
    store.sync(false)?;
    store.list_tags(kind)?
  } else {
    ctx.filesystem_store().list_tags(kind)?
  };

  if json {
    let values: Vec<_> = tags.iter().map(|t| t.dump(JSON_FIELDS)).collect();
    println!("{}", serde_json::to_string_pretty(&values)?);
    return Ok(());
  }

  print_tags(&ctx.package.name, kind, &tags)
}

fn print_tags(package: &str, kind: TagKind, tags: &[Tag]) -> PkgResult<()> {
  if tags.is_empty() {
    println!("⚠️  No {} tags for '{}'", kind, package);
  } else {
    println!("🏷️  {} {} tags ({})", package, kind, tags.len());
    println!();
    for tag in tags {
      match &tag.commit {
        Some(commit) => println!("  {:<10} {}", tag.name, short(commit)),
        None => println!("  {:<10} -", tag.name),
      }
    }
  }

  println!();
  match (kind, tags.last()) {
    (TagKind::Build, current) => {
      let zero = Tag::zero(kind);
      println!("Next build: {}", next_build_tag(current.unwrap_or(&zero))?);
    }
    (TagKind::Version, Some(current)) => {
      println!(
        "Next version: {} (major) | {} (minor) | {} (bug)",
        next_version_tag(current, ReleaseKind::Major)?,
        next_version_tag(current, ReleaseKind::Minor)?,
        next_version_tag(current, ReleaseKind::Bug)?
      );
    }
    (TagKind::Version, None) => println!("Next version: {}", Tag::zero(kind)),
  }
  Ok(())
}

fn short(commit: &str) -> &str {
  commit.get(..12).unwrap_or(commit)
}
