//! balance-core: Shared types, errors, and configuration
//!
//! This crate provides the canonical balance record model every chain adapter
//! emits into, plus the asset/chain descriptors and error taxonomy used across
//! the workspace.

pub mod amount;
pub mod config;
pub mod errors;
pub mod types;

pub use amount::*;
pub use config::*;
pub use errors::*;
pub use types::*;
