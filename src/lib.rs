//! pkgrail: promote packages through build, deploy and publish stages
//!
//! Build tags (`rc<N>`) and version tags (`x.y.z`) are discovered from either
//! the package's directories or its remote repository, ordered numerically,
//! and advanced by [`release::policy`]. [`release::ReleaseLifecycle`] performs
//! the copies and records provenance; [`registry`] pins published versions
//! per project.

pub mod commands;
pub mod core;
pub mod registry;
pub mod release;
pub mod utils;
