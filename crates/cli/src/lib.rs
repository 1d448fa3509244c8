//! autotest command-line front end
//!
//! Parses flags, loads configuration, sets up logging and wires the watcher
//! to the test runner and notifier.

pub mod app;
pub mod config;
pub mod logging;

pub use app::App;
pub use config::{Cli, Config, ConfigError};
