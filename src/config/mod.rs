//! Configuration management module
//!
//! This module handles configuration loading from the configuration file,
//! environment variables and default values.

pub mod settings;

pub use settings::*;
