// LanceDB vector database module
// Schema, connection selection and per-user table access


pub mod connection;
pub mod table;

pub use connection::connect;
pub use table::UserTable;

use arrow::array::{
    Array, ArrayRef, FixedSizeListArray, Float32Array, Float64Array, StringArray,
};
use arrow::datatypes::{DataType, Field, Float32Type, Schema, SchemaRef};
use arrow::record_batch::RecordBatch;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::IngestError;

/// Length of the embedding stored in the `vector` column
pub const VECTOR_DIMENSION: usize = 384;

/// One ingested row. Every column is nullable.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Record {
    /// Creation timestamp, as a number
    pub create_time: Option<f64>,
    pub title: Option<String>,
    pub url: Option<String>,
    pub image: Option<String>,
    pub text: Option<String>,
    /// Embedding of `VECTOR_DIMENSION` floats
    pub vector: Option<Vec<f32>>,
}

/// Column layout shared by every per-user table
#[inline]
pub fn record_schema() -> SchemaRef {
    Arc::new(Schema::new(vec![
        Field::new("create_time", DataType::Float64, true),
        Field::new("title", DataType::Utf8, true),
        Field::new("url", DataType::Utf8, true),
        Field::new("image", DataType::Utf8, true),
        Field::new("text", DataType::Utf8, true),
        Field::new(
            "vector",
            DataType::FixedSizeList(
                Arc::new(Field::new("item", DataType::Float32, true)),
                VECTOR_DIMENSION as i32,
            ),
            true,
        ),
    ]))
}

/// Build a single RecordBatch matching `record_schema()`
#[inline]
pub fn records_to_batch(records: &[Record]) -> Result<RecordBatch, IngestError> {
    if let Some((row, len)) = records.iter().enumerate().find_map(|(row, record)| {
        record
            .vector
            .as_ref()
            .filter(|vector| vector.len() != VECTOR_DIMENSION)
            .map(|vector| (row, vector.len()))
    }) {
        return Err(IngestError::Storage(format!(
            "Record {} has a vector of length {}, expected {}",
            row, len, VECTOR_DIMENSION
        )));
    }

    let create_times: Float64Array = records.iter().map(|r| r.create_time).collect();
    let titles: StringArray = records.iter().map(|r| r.title.as_deref()).collect();
    let urls: StringArray = records.iter().map(|r| r.url.as_deref()).collect();
    let images: StringArray = records.iter().map(|r| r.image.as_deref()).collect();
    let texts: StringArray = records.iter().map(|r| r.text.as_deref()).collect();
    let vectors = FixedSizeListArray::from_iter_primitive::<Float32Type, _, _>(
        records
            .iter()
            .map(|r| r.vector.as_ref().map(|v| v.iter().copied().map(Some))),
        VECTOR_DIMENSION as i32,
    );

    let arrays: Vec<ArrayRef> = vec![
        Arc::new(create_times),
        Arc::new(titles),
        Arc::new(urls),
        Arc::new(images),
        Arc::new(texts),
        Arc::new(vectors),
    ];

    RecordBatch::try_new(record_schema(), arrays)
        .map_err(|e| IngestError::Storage(format!("Failed to create record batch: {}", e)))
}

/// Convert a scanned batch back into records
#[inline]
pub fn batch_to_records(batch: &RecordBatch) -> Result<Vec<Record>, IngestError> {
    let create_times = column::<Float64Array>(batch, "create_time")?;
    let titles = column::<StringArray>(batch, "title")?;
    let urls = column::<StringArray>(batch, "url")?;
    let images = column::<StringArray>(batch, "image")?;
    let texts = column::<StringArray>(batch, "text")?;
    let vectors = column::<FixedSizeListArray>(batch, "vector")?;

    let mut records = Vec::with_capacity(batch.num_rows());
    for row in 0..batch.num_rows() {
        let vector = if vectors.is_null(row) {
            None
        } else {
            let values = vectors.value(row);
            let values = values
                .as_any()
                .downcast_ref::<Float32Array>()
                .ok_or_else(|| IngestError::Storage("Invalid vector item type".to_string()))?;
            Some(values.values().to_vec())
        };

        records.push(Record {
            create_time: (!create_times.is_null(row)).then(|| create_times.value(row)),
            title: string_value(titles, row),
            url: string_value(urls, row),
            image: string_value(images, row),
            text: string_value(texts, row),
            vector,
        });
    }

    Ok(records)
}

fn column<'a, T: 'static>(batch: &'a RecordBatch, name: &str) -> Result<&'a T, IngestError> {
    batch
        .column_by_name(name)
        .ok_or_else(|| IngestError::Storage(format!("Missing {} column", name)))?
        .as_any()
        .downcast_ref::<T>()
        .ok_or_else(|| IngestError::Storage(format!("Invalid {} column type", name)))
}

fn string_value(array: &StringArray, row: usize) -> Option<String> {
    (!array.is_null(row)).then(|| array.value(row).to_string())
}
