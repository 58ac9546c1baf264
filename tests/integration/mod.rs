//! Integration tests for pkgrail
//!
//! Single test target so helpers compile once.

mod helpers;
mod test_cli;
mod test_lifecycle;
mod test_vcs;
