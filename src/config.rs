use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

pub const DEFAULT_PORT: u16 = 8080;
pub const DEFAULT_FETCH_RETRIES: u32 = 3;
pub const DEFAULT_RETRY_DELAY_MS: u64 = 1000;

/// Source of a configuration value
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ConfigSource {
    Default,
    File,
    Environment,
}

impl std::fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigSource::Default => write!(f, "default"),
            ConfigSource::File => write!(f, "file"),
            ConfigSource::Environment => write!(f, "environment"),
        }
    }
}

/// A configuration value with its source
#[derive(Debug, Clone, Serialize)]
pub struct ConfigValue<T> {
    pub value: T,
    pub source: ConfigSource,
}

impl<T> ConfigValue<T> {
    pub fn new(value: T, source: ConfigSource) -> Self {
        Self { value, source }
    }

    fn set(&mut self, value: T, source: ConfigSource) {
        self.value = value;
        self.source = source;
    }
}

/// Application configuration with source tracking
#[derive(Debug, Clone, Serialize)]
pub struct Config {
    /// Path to the SQLite database (server)
    pub database_path: ConfigValue<PathBuf>,
    /// Port the API listens on (server)
    pub port: ConfigValue<u16>,
    /// Base URL of the API (client)
    pub server_url: ConfigValue<String>,
    /// Where the client keeps its last good catalog copy
    pub catalog_cache_path: ConfigValue<PathBuf>,
    /// Attempts made when fetching the catalog
    pub fetch_retries: ConfigValue<u32>,
    /// Fixed pause between catalog fetch attempts
    pub retry_delay_ms: ConfigValue<u64>,
    /// Config file path used (if any)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub config_file: Option<PathBuf>,
}

/// Internal struct for deserializing config file
#[derive(Debug, Deserialize, Default)]
#[serde(default, deny_unknown_fields)]
struct ConfigFile {
    database_path: Option<PathBuf>,
    port: Option<u16>,
    server_url: Option<String>,
    catalog_cache_path: Option<PathBuf>,
    fetch_retries: Option<u32>,
    retry_delay_ms: Option<u64>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_path: ConfigValue::new(
                Self::default_data_dir().join("vegstock.db"),
                ConfigSource::Default,
            ),
            port: ConfigValue::new(DEFAULT_PORT, ConfigSource::Default),
            server_url: ConfigValue::new(
                format!("http://localhost:{}", DEFAULT_PORT),
                ConfigSource::Default,
            ),
            catalog_cache_path: ConfigValue::new(
                Self::default_cache_dir().join("vegetables.json"),
                ConfigSource::Default,
            ),
            fetch_retries: ConfigValue::new(DEFAULT_FETCH_RETRIES, ConfigSource::Default),
            retry_delay_ms: ConfigValue::new(DEFAULT_RETRY_DELAY_MS, ConfigSource::Default),
            config_file: None,
        }
    }
}

impl Config {
    /// Load configuration with priority: env vars > config file > defaults
    pub fn load(config_path: Option<PathBuf>) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        // Try to load from config file
        let path = config_path.unwrap_or_else(Self::default_config_path);
        if path.exists() {
            let contents = std::fs::read_to_string(&path)
                .map_err(|e| ConfigError::ReadError(path.clone(), e))?;
            let file_config: ConfigFile = serde_yaml::from_str(&contents)
                .map_err(|e| ConfigError::ParseError(path.clone(), e))?;

            config.apply_file(file_config, &path);
            config.config_file = Some(path);
        }

        config.apply_env()?;
        Ok(config)
    }

    fn apply_file(&mut self, file: ConfigFile, path: &Path) {
        // Resolve relative paths against config file's directory
        let resolve = |p: PathBuf| {
            if p.is_relative() {
                path.parent().map(|dir| dir.join(&p)).unwrap_or(p)
            } else {
                p
            }
        };

        if let Some(db_path) = file.database_path {
            self.database_path.set(resolve(db_path), ConfigSource::File);
        }
        if let Some(port) = file.port {
            self.port.set(port, ConfigSource::File);
        }
        if let Some(url) = file.server_url {
            self.server_url.set(url, ConfigSource::File);
        }
        if let Some(cache) = file.catalog_cache_path {
            self.catalog_cache_path
                .set(resolve(cache), ConfigSource::File);
        }
        if let Some(retries) = file.fetch_retries {
            self.fetch_retries.set(retries, ConfigSource::File);
        }
        if let Some(delay) = file.retry_delay_ms {
            self.retry_delay_ms.set(delay, ConfigSource::File);
        }
    }

    fn apply_env(&mut self) -> Result<(), ConfigError> {
        if let Ok(db_path) = std::env::var("VEGSTOCK_DATABASE_PATH") {
            self.database_path
                .set(PathBuf::from(db_path), ConfigSource::Environment);
        }
        if let Some(port) = parse_env("VEGSTOCK_PORT")? {
            self.port.set(port, ConfigSource::Environment);
        }
        if let Ok(url) = std::env::var("VEGSTOCK_SERVER_URL") {
            self.server_url.set(url, ConfigSource::Environment);
        }
        if let Ok(cache) = std::env::var("VEGSTOCK_CATALOG_CACHE") {
            self.catalog_cache_path
                .set(PathBuf::from(cache), ConfigSource::Environment);
        }
        if let Some(retries) = parse_env("VEGSTOCK_FETCH_RETRIES")? {
            self.fetch_retries.set(retries, ConfigSource::Environment);
        }
        if let Some(delay) = parse_env("VEGSTOCK_RETRY_DELAY_MS")? {
            self.retry_delay_ms.set(delay, ConfigSource::Environment);
        }
        Ok(())
    }

    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms.value)
    }

    /// Default config directory (platform-specific):
    /// - Linux: ~/.config/vegstock/
    /// - macOS: ~/Library/Application Support/vegstock/
    /// - Windows: %APPDATA%/vegstock/
    pub fn default_config_dir() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("vegstock")
    }

    /// Default data directory (platform-specific):
    /// - Linux: ~/.local/share/vegstock/
    /// - macOS: ~/Library/Application Support/vegstock/
    /// - Windows: %APPDATA%/vegstock/
    pub fn default_data_dir() -> PathBuf {
        dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("vegstock")
    }

    pub fn default_cache_dir() -> PathBuf {
        dirs::cache_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("vegstock")
    }

    /// Default config file path (platform-specific config dir + config.yaml)
    pub fn default_config_path() -> PathBuf {
        Self::default_config_dir().join("config.yaml")
    }
}

fn parse_env<T: FromStr>(var: &'static str) -> Result<Option<T>, ConfigError> {
    match std::env::var(var) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::InvalidEnv(var, raw)),
        Err(_) => Ok(None),
    }
}

#[derive(Debug)]
pub enum ConfigError {
    ReadError(PathBuf, std::io::Error),
    ParseError(PathBuf, serde_yaml::Error),
    InvalidEnv(&'static str, String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::ReadError(path, e) => {
                write!(f, "Failed to read config file '{}': {}", path.display(), e)
            }
            ConfigError::ParseError(path, e) => {
                write!(f, "Failed to parse config file '{}': {}", path.display(), e)
            }
            ConfigError::InvalidEnv(var, value) => {
                write!(f, "Invalid value '{}' for environment variable {}", value, var)
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::ReadError(_, e) => Some(e),
            ConfigError::ParseError(_, e) => Some(e),
            ConfigError::InvalidEnv(..) => None,
        }
    }
}
