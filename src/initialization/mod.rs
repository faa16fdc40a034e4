//! Application initialization.
//!
//! Logging is the only process-wide resource the exporter sets up; the
//! database connection is owned by the export run itself.

mod logger;

pub use logger::init_logger_with;
