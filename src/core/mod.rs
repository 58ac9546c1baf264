//! Core building blocks shared by every command
//!
//! - **config**: process configuration (`EnvConfig`) and operator identity
//! - **context**: release context built once per invocation
//! - **error**: error taxonomy with contextual help messages and exit codes
//! - **vcs**: git capability (`VcsClient`) and the system git backend

pub mod config;
pub mod context;
pub mod error;
pub mod vcs;
