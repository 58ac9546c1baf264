//! Directory tree helpers shared by the lifecycle transitions

use crate::core::error::{PkgResult, ResultExt};
use sha2::{Digest, Sha256};
use std::fs;
use std::path::{Path, PathBuf};

/// Names and extensions skipped while copying or hashing a tree.
///
/// Matching applies at every directory level.
#[derive(Debug, Clone, Copy, Default)]
pub struct CopyFilter<'a> {
  /// Exact file or directory names (e.g. `.git`)
  pub names: &'a [&'a str],
  /// File extensions without the dot (e.g. `pyc`)
  pub extensions: &'a [&'a str],
}

impl CopyFilter<'_> {
  /// Copy everything
  pub const NONE: CopyFilter<'static> = CopyFilter {
    names: &[],
    extensions: &[],
  };

  /// Check if a path is excluded
  pub fn excludes(&self, path: &Path) -> bool {
    let name_hit = path
      .file_name()
      .and_then(|n| n.to_str())
      .is_some_and(|n| self.names.contains(&n));
    let ext_hit = path
      .extension()
      .and_then(|e| e.to_str())
      .is_some_and(|e| self.extensions.contains(&e));
    name_hit || ext_hit
  }
}

/// Recursively copy `src` into `dst`, merging into existing directories and
/// overwriting existing files. Returns the number of files copied.
pub fn copy_tree(src: &Path, dst: &Path, filter: CopyFilter<'_>) -> PkgResult<usize> {
  fs::create_dir_all(dst).with_context(|| format!("Failed to create {}", dst.display()))?;

  let mut copied = 0;
  for entry in fs::read_dir(src).with_context(|| format!("Failed to read {}", src.display()))? {
    let entry = entry.with_context(|| format!("Failed to read entry in {}", src.display()))?;
    let from = entry.path();
    if filter.excludes(&from) {
      continue;
    }
    let to = dst.join(entry.file_name());

    if from.is_dir() {
      copied += copy_tree(&from, &to, filter)?;
    } else {
      fs::copy(&from, &to).with_context(|| format!("Failed to copy {} to {}", from.display(), to.display()))?;
      copied += 1;
    }
  }

  Ok(copied)
}

/// All files under `root` (relative paths, sorted), honoring `filter`
pub fn list_files(root: &Path, filter: CopyFilter<'_>) -> PkgResult<Vec<PathBuf>> {
  fn walk(root: &Path, dir: &Path, filter: CopyFilter<'_>, out: &mut Vec<PathBuf>) -> PkgResult<()> {
    for entry in fs::read_dir(dir).with_context(|| format!("Failed to read {}", dir.display()))? {
      let path = entry.with_context(|| format!("Failed to read entry in {}", dir.display()))?.path();
      if filter.excludes(&path) {
        continue;
      }
      if path.is_dir() {
        walk(root, &path, filter, out)?;
      } else {
        out.push(path.strip_prefix(root)?.to_path_buf());
      }
    }
    Ok(())
  }

  let mut files = Vec::new();
  walk(root, root, filter, &mut files)?;
  files.sort();
  Ok(files)
}

/// SHA-256 over the relative paths and contents of every file under `root`.
///
/// Two trees with identical files produce the same digest regardless of
/// directory iteration order or modification times.
pub fn tree_digest(root: &Path, filter: CopyFilter<'_>) -> PkgResult<String> {
  let mut hasher = Sha256::new();
  for relative in list_files(root, filter)? {
    let path = root.join(&relative);
    let content = fs::read(&path).with_context(|| format!("Failed to read {}", path.display()))?;
    hasher.update(path_to_git_format(&relative).as_bytes());
    hasher.update([0u8]);
    hasher.update((content.len() as u64).to_le_bytes());
    hasher.update(&content);
  }
  Ok(format!("{:x}", hasher.finalize()))
}

/// Convert a path to Git format (always forward slashes)
pub fn path_to_git_format(path: &Path) -> String {
  #[cfg(target_os = "windows")]
  {
    path.to_string_lossy().replace('\\', "/")
  }
  #[cfg(not(target_os = "windows"))]
  {
    path.to_string_lossy().to_string()
  }
}
