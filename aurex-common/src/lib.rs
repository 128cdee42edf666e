//! # Aurex Common Library
//!
//! Shared code for the aurex decoding and metadata crates:
//! - Error and result types
//! - TOML configuration loading and API key resolution
//! - Tracing subscriber initialisation

pub mod config;
pub mod error;
pub mod logging;

pub use config::AurexConfig;
pub use error::{Error, Result};
