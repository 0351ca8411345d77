//! # dockwatch-common
//!
//! Shared types, error definitions, configuration models, and constants
//! used across the dockwatch workspace.
//!
//! This crate is the leaf of the dependency graph: it depends on no other
//! internal crate and holds the primitives the engine client, the
//! notification pipeline and the CLI all agree on.

pub mod config;
pub mod constants;
pub mod error;
pub mod types;
