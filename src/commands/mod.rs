//! CLI command implementations for procpulse.
//!
//! - `check`: probe every kernel source through the configured reader
//! - `config`: configuration file generation
//! - `snapshot`: one sample printed as JSON or YAML
//!
//! The `dashboard` subcommand lives in [`crate::tui`].

pub mod check;
pub mod config;
pub mod snapshot;

// Re-export command functions
pub use check::command_check;
pub use config::command_config;
pub use snapshot::command_snapshot;
