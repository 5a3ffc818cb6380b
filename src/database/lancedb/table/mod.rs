#[cfg(test)]
mod tests;

use arrow::record_batch::RecordBatchIterator;
use futures::TryStreamExt;
use lancedb::query::ExecutableQuery;
use lancedb::table::{CompactionOptions, OptimizeAction, OptimizeOptions};
use lancedb::{Connection, Table};
use std::fmt;
use tracing::{debug, info};

use super::{Record, batch_to_records, record_schema, records_to_batch};
use crate::IngestError;

/// Handle to the table holding one user's records
#[derive(Clone)]
pub struct UserTable {
    table: Table,
}

impl fmt::Debug for UserTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UserTable")
            .field("name", &self.name())
            .finish()
    }
}

impl UserTable {
    /// Open the table called `name`, creating it empty with the record
    /// schema when it does not exist yet.
    ///
    /// # Arguments
    /// * `connection` - Open database connection
    /// * `name` - Table name, normally the user identifier
    #[inline]
    pub async fn open_or_create(connection: &Connection, name: &str) -> Result<Self, IngestError> {
        let table_names = connection
            .table_names()
            .execute()
            .await
            .map_err(|e| IngestError::Storage(format!("Failed to list tables: {}", e)))?;

        let table = if table_names.iter().any(|existing| existing == name) {
            debug!("Opening existing table {}", name);
            open_table(connection, name).await?
        } else {
            info!("Creating table {}", name);
            match connection
                .create_empty_table(name, record_schema())
                .execute()
                .await
            {
                Ok(table) => table,
                // Another writer created it after we listed the tables
                Err(lancedb::Error::TableAlreadyExists { .. }) => {
                    debug!("Table {} was created concurrently, opening it", name);
                    open_table(connection, name).await?
                }
                Err(e) => {
                    return Err(IngestError::Storage(format!(
                        "Failed to create table {}: {}",
                        name, e
                    )));
                }
            }
        };

        Ok(Self { table })
    }

    #[inline]
    pub fn name(&self) -> &str {
        self.table.name()
    }

    /// Access the underlying LanceDB table
    #[inline]
    pub fn inner(&self) -> &Table {
        &self.table
    }

    /// Append records as a single batch. Returns the number of rows written.
    #[inline]
    pub async fn append(&self, records: &[Record]) -> Result<usize, IngestError> {
        if records.is_empty() {
            debug!("No records to append to {}", self.name());
            return Ok(0);
        }

        let record_batch = records_to_batch(records)?;
        let schema = record_batch.schema();
        let reader = RecordBatchIterator::new(std::iter::once(Ok(record_batch)), schema);
        self.table
            .add(reader)
            .execute()
            .await
            .map_err(|e| {
                IngestError::Storage(format!("Failed to append to {}: {}", self.name(), e))
            })?;

        debug!("Appended {} records to {}", records.len(), self.name());
        Ok(records.len())
    }

    /// Compact data files, drop versions older than `older_than` and
    /// refresh indices.
    #[inline]
    pub async fn optimize(&self, older_than: chrono::Duration) -> Result<(), IngestError> {
        debug!("Optimizing table {}", self.name());

        let compact = self
            .table
            .optimize(OptimizeAction::Compact {
                options: CompactionOptions::default(),
                remap_options: None,
            })
            .await
            .map_err(|e| IngestError::Storage(format!("Failed to compact {}: {}", self.name(), e)))?;
        if let Some(metrics) = compact.compaction {
            debug!(
                "Compacted {}: +{} / -{} files",
                self.name(),
                metrics.files_added,
                metrics.files_removed
            );
        }

        let prune = self
            .table
            .optimize(OptimizeAction::Prune {
                older_than: Some(older_than),
                delete_unverified: Some(false),
                error_if_tagged_old_versions: Some(false),
            })
            .await
            .map_err(|e| {
                IngestError::Storage(format!("Failed to clean up {}: {}", self.name(), e))
            })?;
        if let Some(metrics) = prune.prune {
            debug!(
                "Pruned {}: {} old versions, {} bytes",
                self.name(),
                metrics.old_versions,
                metrics.bytes_removed
            );
        }

        self.table
            .optimize(OptimizeAction::Index(OptimizeOptions::default()))
            .await
            .map_err(|e| {
                IngestError::Storage(format!("Failed to optimize indices of {}: {}", self.name(), e))
            })?;

        Ok(())
    }

    #[inline]
    pub async fn count_rows(&self) -> Result<usize, IngestError> {
        self.table
            .count_rows(None)
            .await
            .map_err(|e| IngestError::Storage(format!("Failed to count rows: {}", e)))
    }

    /// Scan every row of the table in storage order
    #[inline]
    pub async fn read_all(&self) -> Result<Vec<Record>, IngestError> {
        let mut stream = self
            .table
            .query()
            .execute()
            .await
            .map_err(|e| IngestError::Storage(format!("Failed to scan {}: {}", self.name(), e)))?;

        let mut records = Vec::new();
        while let Some(batch) = stream
            .try_next()
            .await
            .map_err(|e| IngestError::Storage(format!("Failed to read result stream: {}", e)))?
        {
            records.extend(batch_to_records(&batch)?);
        }

        Ok(records)
    }
}

async fn open_table(connection: &Connection, name: &str) -> Result<Table, IngestError> {
    connection
        .open_table(name)
        .execute()
        .await
        .map_err(|e| IngestError::Storage(format!("Failed to open table {}: {}", name, e)))
}
