#[cfg(test)]
mod tests;

use lancedb::Connection;
use tracing::{debug, info};

use crate::{
    IngestError,
    config::{Config, StorageConfig},
};

/// Open a database connection for the configured storage mode.
///
/// A non-empty bucket connects to remote object storage with the configured
/// credentials. Otherwise the database lives in the base directory.
#[inline]
pub async fn connect(config: &Config) -> Result<Connection, IngestError> {
    if let Some(bucket) = config.remote_bucket() {
        info!("Connecting to remote LanceDB at {}", bucket);
        return lancedb::connect(bucket)
            .storage_options(storage_options(&config.storage))
            .execute()
            .await
            .map_err(|e| {
                IngestError::Connection(format!("Failed to connect to {}: {}", bucket, e))
            });
    }

    let uri = config.get_base_dir().display().to_string();
    debug!("Connecting to local LanceDB at {}", uri);
    lancedb::connect(&uri)
        .execute()
        .await
        .map_err(|e| IngestError::Connection(format!("Failed to connect to {}: {}", uri, e)))
}

/// Object store options passed to the remote connection. Empty credentials
/// are left out so the store can fall back to its default provider chain.
#[inline]
pub fn storage_options(storage: &StorageConfig) -> Vec<(String, String)> {
    let mut options = Vec::with_capacity(4);
    let credentials = [
        ("aws_access_key_id", &storage.access_key_id),
        ("aws_secret_access_key", &storage.secret_access_key),
        ("region", &storage.region),
    ];
    for (key, value) in credentials {
        if !value.is_empty() {
            options.push((key.to_string(), value.clone()));
        }
    }
    options.push(("s3_express".to_string(), storage.s3_express.to_string()));
    options
}
