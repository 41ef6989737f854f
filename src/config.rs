use serde::{Deserialize, Serialize};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::storage::PoolOptions;

/// Runtime settings, resolved from defaults, `cellstore.toml`, then the environment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub database: PathBuf,
    pub port: u16,
    pub log_level: String,
    pub pool_size: usize,
    pub acquire_timeout_secs: u64,
    pub max_upload_bytes: usize,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            database: default_database_path(),
            port: 8000,
            log_level: "info".to_string(),
            pool_size: 4,
            acquire_timeout_secs: 30,
            max_upload_bytes: 64 * 1024 * 1024,
        }
    }
}

impl Settings {
    /// Load settings: defaults, overlaid by the config file (if present), then the environment.
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        let path = path.map(Path::to_path_buf).unwrap_or_else(default_config_path);
        let mut settings = Self::read(&path)?.unwrap_or_default();
        settings.apply_env(|key| std::env::var(key).ok())?;
        Ok(settings)
    }

    /// Overlay values from environment variables.
    ///
    /// `lookup` is `std::env::var` in production and a map in tests.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<()> {
        if let Some(database) = lookup("CELLSTORE_DATABASE") {
            self.database = PathBuf::from(database);
        }
        if let Some(port) = lookup("API_PORT") {
            self.port = port
                .parse()
                .map_err(|e| anyhow::anyhow!("invalid API_PORT {:?}: {}", port, e))?;
        }
        if let Some(level) = lookup("LOG_LEVEL") {
            self.log_level = level;
        }
        if let Some(size) = lookup("CELLSTORE_POOL_SIZE") {
            self.pool_size = size
                .parse()
                .map_err(|e| anyhow::anyhow!("invalid CELLSTORE_POOL_SIZE {:?}: {}", size, e))?;
        }
        Ok(())
    }

    /// Parse a settings file. A missing file is `None`; keys absent from the file keep their defaults.
    pub fn read(path: &Path) -> anyhow::Result<Option<Self>> {
        let contents = match std::fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let settings = toml::from_str(&contents)
            .map_err(|e| anyhow::anyhow!("invalid settings in {}: {}", path.display(), e))?;
        Ok(Some(settings))
    }

    /// Write these settings as TOML. An existing file is only replaced with `force`.
    pub fn save(&self, path: &Path, force: bool) -> anyhow::Result<()> {
        let contents = toml::to_string_pretty(self)?;
        let mut options = std::fs::OpenOptions::new();
        options.write(true);
        if force {
            options.create(true).truncate(true);
        } else {
            options.create_new(true);
        }

        let mut file = options.open(path).map_err(|e| match e.kind() {
            std::io::ErrorKind::AlreadyExists => anyhow::anyhow!(
                "settings already exist at {} (use --force to overwrite)",
                path.display()
            ),
            _ => e.into(),
        })?;
        file.write_all(contents.as_bytes())?;
        Ok(())
    }

    /// Create the directory holding the database file.
    pub fn prepare_database_dir(&self) -> anyhow::Result<()> {
        match self.database.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => {
                std::fs::create_dir_all(parent)?;
            }
            _ => {}
        }
        Ok(())
    }

    pub fn pool_options(&self) -> PoolOptions {
        PoolOptions {
            size: self.pool_size,
            acquire_timeout: Duration::from_secs(self.acquire_timeout_secs),
            ..PoolOptions::default()
        }
    }
}

pub fn default_config_path() -> PathBuf {
    PathBuf::from("cellstore.toml")
}

pub fn default_database_path() -> PathBuf {
    PathBuf::from(".cellstore").join("cellstore.db")
}
