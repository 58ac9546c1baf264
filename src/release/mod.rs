//! Tag resolution and the build -> deploy -> publish lifecycle
//!
//! # Invariants
//!
//! 1. **Tags are ordered numerically**
//!    - `rc2` < `rc10`, `1.9.0` < `1.10.0`
//!    - The current tag is the highest; an empty store yields the zero-tag
//!
//! 2. **Promotions never overwrite silently**
//!    - An existing destination is a conflict unless forced
//!    - Copies are staged and renamed into place
//!
//! 3. **Every promoted directory carries a build record**
//!    - Operator, tag (with commit and branch), package snapshot, source digest

pub mod lifecycle;
pub mod package;
pub mod policy;
pub mod record;
pub mod store;
pub mod tag;

pub use lifecycle::{LifecycleAction, LifecycleOutcome, LogTrace, NoopTrace, ReleaseLifecycle, Stage, TraceHook};
pub use package::{PackageLayout, PackageSnapshot, RootKind};
pub use policy::{ReleaseKind, next_build_tag, next_version_tag};
pub use record::BuildRecord;
pub use store::{FilesystemTagStore, TagStore, VcsTagStore};
pub use tag::{Tag, TagKind};
