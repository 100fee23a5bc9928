//! Utility functions module
//!
//! HTTP client setup, network error classification and retry logic shared
//! by the secret providers.

pub mod network;
pub mod retry;

pub use network::*;
pub use retry::*;
