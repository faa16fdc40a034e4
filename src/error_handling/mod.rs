//! Error handling.
//!
//! Errors are categorized into:
//! - **Connectivity**: the database cannot be used at all (fatal)
//! - **Query**: one table cannot be described or read (isolated per table)
//! - **Write**: an artifact cannot be written

mod types;

pub use types::{ExportError, InitializationError};
