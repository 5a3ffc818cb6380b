use thiserror::Error;

pub type Result<T> = std::result::Result<T, IngestError>;

#[derive(Error, Debug)]
pub enum IngestError {
    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("File not found: {0}")]
    NotFound(String),

    #[error("Parse error on line {line}: {message}")]
    Parse { line: usize, message: String },

    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Other error: {0}")]
    Other(#[from] anyhow::Error),
}

pub mod config;
pub mod database;
pub mod ingest;
pub mod jsonl;
pub mod server;
