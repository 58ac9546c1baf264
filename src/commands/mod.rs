//! CLI commands for pkgrail
//!
//! - **build**: copy the working copy into the build root under the next `rc<N>`
//! - **deploy**: build, then promote into the deploy root under the next version
//! - **publish**: pin a deployed version under a project in the registry
//! - **tags**: list build or version tags in order
//!
//! All commands accept `&ReleaseContext` to avoid redundant loads.

pub mod release;
pub mod tags;

pub use release::{RunOptions, run_build, run_deploy, run_publish};
pub use tags::run_tags;
