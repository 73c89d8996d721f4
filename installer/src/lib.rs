//! regionkit installer library.
//!
//! This crate provides the core of the regionkit launcher: checking for and
//! installing a newer release of the launcher itself, and installing Among Us
//! server lists by downloading them next to their destination and swapping
//! them into place. It is used by the `regionkit` binary and can be driven
//! programmatically with stub fetchers and launchers.
//!
//! # Modules
//!
//! - [`atomic`] - Download-then-promote installation of a single file
//! - [`cli`] - Command-line argument definitions
//! - [`config`] - TOML configuration loading
//! - [`dirs`] - Directory resolution abstraction for platform-specific paths
//! - [`error`] - Semantic error types
//! - [`fetch`] - Blocking HTTP retrieval behind a trait
//! - [`launch`] - Detached process spawning and link opening
//! - [`manifest`] - Default endpoints and profile catalogue
//! - [`output`] - User-facing message formatting
//! - [`profile`] - Server-list profile installation
//! - [`update`] - Version check and self-update state machine
//! - [`version`] - Dotted numeric version ordering

pub mod atomic;
pub mod cli;
pub mod config;
pub mod dirs;
pub mod error;
pub mod fetch;
pub mod launch;
pub mod manifest;
pub mod output;
pub mod profile;
pub mod update;
pub mod version;

#[cfg(any(test, feature = "test-support"))]
pub mod test_utils;
