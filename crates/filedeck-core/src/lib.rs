//! Core types and traits for filedeck.
//!
//! This crate provides the fundamental data structures shared by the
//! operation engine and its hosts: transient file nodes, canonical path
//! helpers, the operation error taxonomy, and engine configuration.

mod config;
mod error;
mod node;
pub mod paths;

pub use config::{DEFAULT_BUFFER_SIZE, EngineConfig, EngineConfigBuilder};
pub use error::{ErrorCategory, OpError};
pub use node::{FileNode, NodeKind, is_readable, is_writable};
