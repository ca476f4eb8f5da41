//! Runtime configuration for the scheduler core.
//!
//! # Responsibility
//! - Describe where the store lives and how logging is set up.
//! - Provide defaults so a partially written config file still loads.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;

/// Where the entity store keeps its data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StoreLocation {
    /// Throwaway database that lives as long as the connection.
    Memory,
    /// SQLite database file.
    File(PathBuf),
}

/// Store connection settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreConfig {
    #[serde(default = "default_location")]
    pub location: StoreLocation,
    /// How long a writer waits on a locked database before failing.
    #[serde(default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            location: default_location(),
            busy_timeout_ms: default_busy_timeout_ms(),
        }
    }
}

impl StoreConfig {
    /// Config for a database file at `path` with default timeouts.
    pub fn file(path: impl Into<PathBuf>) -> Self {
        Self {
            location: StoreLocation::File(path.into()),
            ..Self::default()
        }
    }

    /// Config for an in-memory database.
    pub fn memory() -> Self {
        Self::default()
    }
}

/// Logging settings consumed by [`crate::logging::init_logging`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogConfig {
    /// `trace|debug|info|warn|error`; falls back to the build default.
    #[serde(default)]
    pub level: Option<String>,
    /// Absolute directory for rolling log files. Logging stays off when unset.
    #[serde(default)]
    pub dir: Option<PathBuf>,
}

/// Top-level configuration document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchedulerConfig {
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub log: LogConfig,
}

fn default_location() -> StoreLocation {
    StoreLocation::Memory
}

fn default_busy_timeout_ms() -> u64 {
    DEFAULT_BUSY_TIMEOUT_MS
}
