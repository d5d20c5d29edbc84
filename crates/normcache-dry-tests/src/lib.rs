// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Shared test doubles and fixtures for normcache crates.
#![forbid(unsafe_code)]
//!
//! This crate keeps the selections, payloads and builders that the normcache
//! test suites share, so each test file can focus on the behavior it checks.
//!
//! # Modules
//!
//! - [`cache`] - Cache builder that replays writes before a test starts
//! - [`selections`] - Selection fixtures (viewer, friends, nodes, connections)

pub mod cache;
pub mod selections;

// Re-export commonly used items at crate root for convenience
pub use cache::CacheTestBuilder;
pub use selections::{
    connection_selection, friends_selection, node_selection, user_fields, viewer_selection,
    FRIENDS_LIST,
};
