//! Configuration
//!
//! Values come from three places, highest precedence first: command-line
//! flags, an optional TOML file given with `--config`, built-in defaults.
//!
//! A relative `path` in the file is taken relative to the file's directory.
//! A relative `--path` flag is taken relative to the working directory.
//!
//! Example file:
//! ```toml
//! cmd = "cargo test"
//! flags = "--quiet"
//! path = "src"
//! skip_notify = false
//! recursive = true
//! ```

use clap::{ArgAction, Parser};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use thiserror::Error;
use watcher::RecursiveMode;

/// Command run when none is configured
pub const DEFAULT_COMMAND: &str = "go test";

/// Directory watched when none is configured
pub const DEFAULT_PATH: &str = ".";

/// autotest - run a test command on every file change
#[derive(Debug, Clone, Default, Parser)]
#[command(name = "autotest")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Command to exec on every change [default: "go test"]
    #[arg(long, value_name = "COMMAND")]
    pub cmd: Option<String>,

    /// Command flags to add
    #[arg(long, value_name = "FLAGS", allow_hyphen_values = true)]
    pub flags: Option<String>,

    /// Path to watch for changes [default: "."]
    #[arg(long, value_name = "DIR")]
    pub path: Option<PathBuf>,

    /// Skip sending desktop notifications
    #[arg(long)]
    pub skip_notify: bool,

    /// Watch subdirectories too
    #[arg(long)]
    pub recursive: bool,

    /// Read settings from a TOML file (flags take precedence)
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Also write logs to this file
    #[arg(long, value_name = "FILE")]
    pub log_file: Option<PathBuf>,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = ArgAction::Count)]
    pub verbose: u8,
}

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("no command configured")]
    EmptyCommand,

    #[error("watch path does not exist: {0}")]
    MissingPath(PathBuf),

    #[error("watch path is not a directory: {0}")]
    NotADirectory(PathBuf),
}

/// Settings file contents; every key is optional
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
    pub cmd: Option<String>,
    pub flags: Option<String>,
    pub path: Option<PathBuf>,
    pub skip_notify: Option<bool>,
    pub recursive: Option<bool>,
}

impl FileConfig {
    /// Load settings from a TOML file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        let mut file: Self = toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;

        if let (Some(watch_path), Some(dir)) = (&file.path, path.parent()) {
            if watch_path.is_relative() {
                file.path = Some(dir.join(watch_path));
            }
        }

        Ok(file)
    }
}

/// Effective configuration, fixed for the process lifetime
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Base command, may embed arguments
    pub command: String,
    /// Extra space-separated arguments appended to the command
    pub extra_flags: String,
    /// Directory to watch
    pub watch_path: PathBuf,
    pub notifications_enabled: bool,
    pub recursive: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            command: DEFAULT_COMMAND.to_string(),
            extra_flags: String::new(),
            watch_path: PathBuf::from(DEFAULT_PATH),
            notifications_enabled: true,
            recursive: false,
        }
    }
}

impl Config {
    /// Build the effective configuration from parsed flags
    ///
    /// Reads the `--config` file if one was given. Does not validate.
    pub fn from_cli(cli: &Cli) -> Result<Self, ConfigError> {
        let file = match &cli.config {
            Some(path) => FileConfig::load(path)?,
            None => FileConfig::default(),
        };
        Ok(Self::merge(cli, file))
    }

    /// Layer flags over file settings over defaults
    ///
    /// Boolean switches can only be turned on from the command line, so an
    /// absent switch defers to the file.
    pub fn merge(cli: &Cli, file: FileConfig) -> Self {
        let defaults = Self::default();

        Self {
            command: cli.cmd.clone().or(file.cmd).unwrap_or(defaults.command),
            extra_flags: cli
                .flags
                .clone()
                .or(file.flags)
                .unwrap_or(defaults.extra_flags),
            watch_path: cli.path.clone().or(file.path).unwrap_or(defaults.watch_path),
            notifications_enabled: !(cli.skip_notify || file.skip_notify.unwrap_or(false)),
            recursive: cli.recursive || file.recursive.unwrap_or(defaults.recursive),
        }
    }

    /// Reject configurations that cannot start
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.command.trim().is_empty() {
            return Err(ConfigError::EmptyCommand);
        }

        if !self.watch_path.exists() {
            return Err(ConfigError::MissingPath(self.watch_path.clone()));
        }
        if !self.watch_path.is_dir() {
            return Err(ConfigError::NotADirectory(self.watch_path.clone()));
        }

        Ok(())
    }

    pub fn recursive_mode(&self) -> RecursiveMode {
        if self.recursive {
            RecursiveMode::Recursive
        } else {
            RecursiveMode::NonRecursive
        }
    }
}
