// JSONL reader
// Loads newline-delimited JSON records from a file derived from an identifier


use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs::File;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tracing::{debug, info};

use crate::IngestError;
use crate::database::{Record, VECTOR_DIMENSION};

pub const JSONL_EXTENSION: &str = "jsonl";

/// Map an identifier (usually a URL) to its JSONL file under `base_dir`.
///
/// Every `/` becomes `-`, so `https://a.com/docs` maps to
/// `https:--a.com-docs.jsonl`.
#[inline]
pub fn jsonl_path(base_dir: &Path, identifier: &str) -> PathBuf {
    let file_name = format!("{}.{}", identifier.replace('/', "-"), JSONL_EXTENSION);
    base_dir.join(file_name)
}

/// Read every record from the file for `identifier`, in file order.
///
/// Blank lines are skipped. The first line that is not a valid record
/// aborts the read.
#[inline]
pub async fn read_records(base_dir: &Path, identifier: &str) -> Result<Vec<Record>, IngestError> {
    let path = jsonl_path(base_dir, identifier);
    info!("Reading from {}", path.display());

    let file = File::open(&path).await.map_err(|e| match e.kind() {
        ErrorKind::NotFound => IngestError::NotFound(path.display().to_string()),
        _ => IngestError::Io(e),
    })?;

    let records = read_lines(BufReader::new(file)).await?;
    debug!("Read {} records from {}", records.len(), path.display());
    Ok(records)
}

/// Parse JSONL from any buffered async reader
#[inline]
pub async fn read_lines<R>(reader: R) -> Result<Vec<Record>, IngestError>
where
    R: AsyncBufRead + Unpin,
{
    let mut lines = reader.lines();
    let mut records = Vec::new();
    let mut line_number = 0;

    loop {
        let line = match lines.next_line().await {
            Ok(Some(line)) => line,
            Ok(None) => break,
            Err(e) if e.kind() == ErrorKind::InvalidData => {
                return Err(IngestError::Parse {
                    line: line_number + 1,
                    message: e.to_string(),
                });
            }
            Err(e) => return Err(e.into()),
        };
        line_number += 1;
        if line.trim().is_empty() {
            continue;
        }
        records.push(parse_record(line_number, &line)?);
    }

    Ok(records)
}

/// Parse one line into a record. The line must hold a JSON object; unknown
/// keys are ignored and a present vector must have `VECTOR_DIMENSION` entries.
#[inline]
pub fn parse_record(line_number: usize, line: &str) -> Result<Record, IngestError> {
    let parse_error = |message: String| IngestError::Parse {
        line: line_number,
        message,
    };

    let value: serde_json::Value =
        serde_json::from_str(line).map_err(|e| parse_error(e.to_string()))?;
    if !value.is_object() {
        return Err(parse_error("expected a JSON object".to_string()));
    }

    let record: Record = serde_json::from_value(value).map_err(|e| parse_error(e.to_string()))?;
    if let Some(len) = record.vector.as_ref().map(Vec::len) {
        if len != VECTOR_DIMENSION {
            return Err(parse_error(format!(
                "vector has {} entries, expected {}",
                len, VECTOR_DIMENSION
            )));
        }
    }

    Ok(record)
}
