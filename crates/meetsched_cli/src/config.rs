use anyhow::{Context, Result};
use meetsched_core::{LogConfig, SchedulerConfig, StoreConfig, StoreLocation};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Get the config directory path (~/.config/meetsched)
pub fn config_dir() -> Result<PathBuf> {
    let dir = dirs::config_dir()
        .context("Could not determine config directory")?
        .join("meetsched");
    Ok(dir)
}

/// Get the config file path (~/.config/meetsched/config.toml)
pub fn config_path() -> Result<PathBuf> {
    Ok(config_dir()?.join("config.toml"))
}

/// Default database file when the config names none (~/.local/share/meetsched/meetsched.db)
pub fn default_db_path() -> Result<PathBuf> {
    let dir = dirs::data_dir()
        .context("Could not determine data directory")?
        .join("meetsched");
    Ok(dir.join("meetsched.db"))
}

/// config.toml as written by the user. Every field may be left out.
#[derive(Debug, Default, Deserialize)]
struct ConfigFile {
    #[serde(default)]
    store: StoreSection,
    #[serde(default)]
    log: LogConfig,
}

#[derive(Debug, Default, Deserialize)]
struct StoreSection {
    location: Option<StoreLocation>,
    busy_timeout_ms: Option<u64>,
}

impl ConfigFile {
    /// Fills unset store fields. A missing location means the file database
    /// at `default_db`, never the library's in-memory default.
    fn resolve(self, default_db: PathBuf) -> SchedulerConfig {
        let mut store = StoreConfig::file(default_db);
        if let Some(location) = self.store.location {
            store.location = location;
        }
        if let Some(busy_timeout_ms) = self.store.busy_timeout_ms {
            store.busy_timeout_ms = busy_timeout_ms;
        }
        SchedulerConfig {
            store,
            log: self.log,
        }
    }
}

/// Loads the config file, or defaults when it does not exist.
///
/// `db_override` wins over whatever location the file names.
pub fn load_config(db_override: Option<&Path>) -> Result<SchedulerConfig> {
    let path = config_path()?;
    let file = if path.exists() {
        read_config(&path)?
    } else {
        ConfigFile::default()
    };
    let mut config = file.resolve(default_db_path()?);

    if let Some(db) = db_override {
        config.store.location = StoreLocation::File(db.to_path_buf());
    }
    if let StoreLocation::File(db) = &config.store.location {
        if let Some(parent) = db.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create database directory {}", parent.display())
            })?;
        }
    }
    Ok(config)
}

fn read_config(path: &Path) -> Result<ConfigFile> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config from {}", path.display()))?;
    parse_config(&contents).with_context(|| format!("Failed to parse {}", path.display()))
}

fn parse_config(contents: &str) -> Result<ConfigFile> {
    Ok(toml::from_str(contents)?)
}

#[cfg(test)]
mod tests {
    use super::parse_config;
    use meetsched_core::StoreLocation;
    use std::path::PathBuf;

    fn default_db() -> PathBuf {
        PathBuf::from("/data/meetsched/meetsched.db")
    }

    #[test]
    fn parses_file_store_and_log_section() {
        let config = parse_config(
            r#"
            [store]
            location = { file = "/tmp/meetings.db" }
            busy_timeout_ms = 250

            [log]
            level = "warn"
            dir = "/tmp/meetsched-logs"
            "#,
        )
        .unwrap()
        .resolve(default_db());

        assert_eq!(
            config.store.location,
            StoreLocation::File(PathBuf::from("/tmp/meetings.db"))
        );
        assert_eq!(config.store.busy_timeout_ms, 250);
        assert_eq!(config.log.level.as_deref(), Some("warn"));
    }

    #[test]
    fn log_only_document_keeps_a_file_store() {
        let config = parse_config("[log]\nlevel = \"warn\"\n")
            .unwrap()
            .resolve(default_db());

        assert_eq!(config.store.location, StoreLocation::File(default_db()));
        assert_eq!(config.log.level.as_deref(), Some("warn"));
    }

    #[test]
    fn empty_document_uses_file_store_defaults() {
        let config = parse_config("").unwrap().resolve(default_db());
        assert_eq!(config.store.location, StoreLocation::File(default_db()));
        assert_eq!(config.store.busy_timeout_ms, 5_000);
        assert!(config.log.dir.is_none());
    }

    #[test]
    fn explicit_memory_location_is_respected() {
        let config = parse_config("[store]\nlocation = \"memory\"\n")
            .unwrap()
            .resolve(default_db());
        assert_eq!(config.store.location, StoreLocation::Memory);
    }
}
