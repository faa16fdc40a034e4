//! Application configuration and constants.
//!
//! This module provides:
//! - Configuration constants (defaults, artifact names, format limits)
//! - CLI option types and parsing

mod constants;
mod types;

pub use constants::*;
pub use types::{Config, LogFormat, LogLevel, Opt};
