//! Logging utilities.
//!
//! This module centralizes logger initialization. Library code only uses
//! the `log` facade; the binary installs the `env_logger` backend.

mod init;

pub use init::{init_logging, LoggingConfig, DEFAULT_FILTER};
