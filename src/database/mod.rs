// Database module
// LanceDB holds one table of records per user

pub mod lancedb;

pub use self::lancedb::{Record, UserTable, VECTOR_DIMENSION, connect, record_schema};
