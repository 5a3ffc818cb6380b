
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const CONFIG_FILE_NAME: &str = "vector-ingest.toml";
pub const DEFAULT_PORT: u16 = 3001;
pub const DEFAULT_MAINTENANCE_PROBABILITY: f64 = 0.1;

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub maintenance: MaintenanceConfig,
    /// Directory holding the JSONL inputs and, in local mode, the database
    #[serde(skip)]
    pub base_dir: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: DEFAULT_PORT,
        }
    }
}

/// Remote object storage settings. An empty or missing bucket selects the
/// local on-disk database.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct StorageConfig {
    pub bucket: Option<String>,
    pub access_key_id: String,
    pub secret_access_key: String,
    pub region: String,
    pub s3_express: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            bucket: None,
            access_key_id: String::new(),
            secret_access_key: String::new(),
            region: String::new(),
            s3_express: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct MaintenanceConfig {
    pub probability: f64,
    pub seed: Option<u64>,
}

impl Default for MaintenanceConfig {
    fn default() -> Self {
        Self {
            probability: DEFAULT_MAINTENANCE_PROBABILITY,
            seed: None,
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid port: {0} (must be between 1 and 65535)")]
    InvalidPort(u16),
    #[error("Invalid host: {0:?} (cannot be empty)")]
    InvalidHost(String),
    #[error("Invalid maintenance probability: {0} (must be between 0 and 1)")]
    InvalidProbability(f64),
    #[error("Invalid value for {key}: {value:?}")]
    InvalidEnvValue { key: &'static str, value: String },
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parsing error: {0}")]
    TomlParse(#[from] toml::de::Error),
}

impl Config {
    /// Load `vector-ingest.toml` from `base_dir` if present, then overlay
    /// the process environment.
    #[inline]
    pub fn load<P: AsRef<Path>>(base_dir: P) -> Result<Self> {
        let mut config = Self::load_file(base_dir)?;
        config
            .apply_env(|key| std::env::var(key).ok())
            .context("Failed to apply environment overrides")?;
        config
            .validate()
            .context("Configuration validation failed")?;
        Ok(config)
    }

    /// Load only the TOML file, falling back to defaults when it is absent
    #[inline]
    pub fn load_file<P: AsRef<Path>>(base_dir: P) -> Result<Self> {
        let defaults = Self {
            base_dir: base_dir.as_ref().to_path_buf(),
            ..Self::default()
        };
        let config_path = defaults.config_file_path();

        if !config_path.exists() {
            return Ok(defaults);
        }

        let content = fs::read_to_string(&config_path)
            .with_context(|| format!("Failed to read config file: {}", config_path.display()))?;

        let mut config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", config_path.display()))?;
        config.base_dir = defaults.base_dir;

        Ok(config)
    }

    /// Overlay values from an environment lookup. Unset variables leave the
    /// current value untouched.
    #[inline]
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(bucket) = lookup("AWS_BUCKET") {
            self.storage.bucket = Some(bucket);
        }
        if let Some(key_id) = lookup("AWS_ACCESS_KEY_ID") {
            self.storage.access_key_id = key_id;
        }
        if let Some(secret) = lookup("AWS_SECRET_ACCESS_KEY") {
            self.storage.secret_access_key = secret;
        }
        if let Some(region) = lookup("AWS_REGION") {
            self.storage.region = region;
        }
        if let Some(host) = lookup("HOST") {
            self.server.host = host;
        }
        if let Some(port) = lookup("PORT") {
            self.server.port = parse_env("PORT", port)?;
        }
        if let Some(probability) = lookup("MAINTENANCE_PROBABILITY") {
            self.maintenance.probability = parse_env("MAINTENANCE_PROBABILITY", probability)?;
        }
        if let Some(seed) = lookup("MAINTENANCE_SEED") {
            self.maintenance.seed = Some(parse_env("MAINTENANCE_SEED", seed)?);
        }
        Ok(())
    }

    #[inline]
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.server.validate()?;
        self.maintenance.validate()?;
        Ok(())
    }

    /// Get the base directory for the application
    #[inline]
    pub fn get_base_dir(&self) -> &Path {
        &self.base_dir
    }

    /// The bucket URI when remote storage is configured
    #[inline]
    pub fn remote_bucket(&self) -> Option<&str> {
        self.storage
            .bucket
            .as_deref()
            .map(str::trim)
            .filter(|bucket| !bucket.is_empty())
    }

    /// Location of the TOML file this config is loaded from
    #[inline]
    pub fn config_file_path(&self) -> PathBuf {
        self.get_base_dir().join(CONFIG_FILE_NAME)
    }
}

impl ServerConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.port == 0 {
            return Err(ConfigError::InvalidPort(self.port));
        }

        if self.host.trim().is_empty() {
            return Err(ConfigError::InvalidHost(self.host.clone()));
        }

        Ok(())
    }

    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn set_port(&mut self, port: u16) -> Result<(), ConfigError> {
        if port == 0 {
            return Err(ConfigError::InvalidPort(port));
        }
        self.port = port;
        Ok(())
    }
}

impl MaintenanceConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(0.0..=1.0).contains(&self.probability) {
            return Err(ConfigError::InvalidProbability(self.probability));
        }
        Ok(())
    }
}

fn parse_env<T: std::str::FromStr>(key: &'static str, value: String) -> Result<T, ConfigError> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigError::InvalidEnvValue { key, value })
}
