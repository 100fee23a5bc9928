//! Environment file parsing
//!
//! This module turns `KEY=VALUE` sources into an [`EnvSnapshot`], splitting
//! plain values from `!{...}` secret references.

pub mod parser;
pub mod snapshot;

pub use parser::*;
pub use snapshot::*;
