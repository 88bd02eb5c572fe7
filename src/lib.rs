//! Simple Config Library
//!
//! Layered configuration: files found across ordered search paths are
//! deep-merged, decoded into a typed value, and overridden by environment
//! variables.

pub mod cli;
pub mod config;
pub mod error;
pub mod logging;

pub use config::{ConfigLoader, Format};
pub use error::{ConfigError, ErrorKind, Result};
