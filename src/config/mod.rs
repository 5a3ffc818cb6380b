// Configuration management module
// TOML file settings with environment overrides

pub mod settings;

pub use settings::{Config, ConfigError, MaintenanceConfig, ServerConfig, StorageConfig};
