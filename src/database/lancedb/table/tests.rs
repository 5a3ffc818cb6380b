use super::*;
use crate::config::Config;
use crate::database::lancedb::{VECTOR_DIMENSION, connect};
use tempfile::TempDir;

async fn create_test_connection() -> (Connection, TempDir) {
    let temp_dir = TempDir::new().expect("should create temp dir");
    let config = Config {
        base_dir: temp_dir.path().to_path_buf(),
        ..Config::default()
    };
    let connection = connect(&config).await.expect("should connect");
    (connection, temp_dir)
}

fn create_test_record(index: usize) -> Record {
    Record {
        create_time: Some(1_700_000_000.0 + index as f64),
        title: Some(format!("Page {}", index)),
        url: Some(format!("https://www.memfree.me/blog/{}", index)),
        image: (index % 2 == 0).then(|| format!("https://img.example.com/{}.png", index)),
        text: Some(format!("Body text {}", index)),
        vector: Some(
            (0..VECTOR_DIMENSION)
                .map(|i| (index as f32).mul_add(0.01, i as f32 * 0.001))
                .collect(),
        ),
    }
}

#[tokio::test]
async fn creates_missing_table_with_schema() {
    let (connection, _temp_dir) = create_test_connection().await;

    let table = UserTable::open_or_create(&connection, "memfree")
        .await
        .expect("should create table");
    assert_eq!(table.name(), "memfree");
    assert_eq!(table.count_rows().await.expect("count"), 0);

    let names = connection
        .table_names()
        .execute()
        .await
        .expect("should list tables");
    assert_eq!(names, vec!["memfree".to_string()]);

    let schema = table.inner().schema().await.expect("should read schema");
    let expected = record_schema();
    for field in expected.fields() {
        let stored = schema
            .field_with_name(field.name())
            .expect("stored schema should contain column");
        assert_eq!(stored.data_type(), field.data_type());
    }
}

#[tokio::test]
async fn reopens_existing_table() {
    let (connection, _temp_dir) = create_test_connection().await;

    let table = UserTable::open_or_create(&connection, "user_a")
        .await
        .expect("should create table");
    table
        .append(&[create_test_record(1)])
        .await
        .expect("should append");

    let reopened = UserTable::open_or_create(&connection, "user_a")
        .await
        .expect("should reopen table");
    assert_eq!(reopened.count_rows().await.expect("count"), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_open_or_create_on_fresh_table() {
    let (connection, _temp_dir) = create_test_connection().await;

    let handles: Vec<_> = (0..8)
        .map(|index| {
            let connection = connection.clone();
            tokio::spawn(async move {
                let table = UserTable::open_or_create(&connection, "memfree").await?;
                table.append(&[create_test_record(index)]).await
            })
        })
        .collect();

    for handle in handles {
        let written = handle
            .await
            .expect("task should not panic")
            .expect("every caller should get the table");
        assert_eq!(written, 1);
    }

    let table = UserTable::open_or_create(&connection, "memfree")
        .await
        .expect("should open table");
    assert_eq!(table.count_rows().await.expect("count"), 8);
}

#[tokio::test]
async fn append_then_read_preserves_order() {
    let (connection, _temp_dir) = create_test_connection().await;
    let table = UserTable::open_or_create(&connection, "ordered")
        .await
        .expect("should create table");

    let records: Vec<Record> = (0..5).map(create_test_record).collect();
    let written = table.append(&records).await.expect("should append");
    assert_eq!(written, 5);

    let read_back = table.read_all().await.expect("should scan table");
    assert_eq!(read_back, records);
}

#[tokio::test]
async fn appending_nothing_is_a_no_op() {
    let (connection, _temp_dir) = create_test_connection().await;
    let table = UserTable::open_or_create(&connection, "empty")
        .await
        .expect("should create table");

    assert_eq!(table.append(&[]).await.expect("should succeed"), 0);
    assert_eq!(table.count_rows().await.expect("count"), 0);
}

#[tokio::test]
async fn append_rejects_wrong_vector_length() {
    let (connection, _temp_dir) = create_test_connection().await;
    let table = UserTable::open_or_create(&connection, "bad_vectors")
        .await
        .expect("should create table");

    let bad = Record {
        vector: Some(vec![1.0; 10]),
        ..Record::default()
    };
    let result = table.append(&[bad]).await;
    assert!(matches!(result, Err(IngestError::Storage(_))));
    assert_eq!(table.count_rows().await.expect("count"), 0);
}

#[tokio::test]
async fn optimize_keeps_rows() {
    let (connection, _temp_dir) = create_test_connection().await;
    let table = UserTable::open_or_create(&connection, "compacted")
        .await
        .expect("should create table");

    for index in 0..3 {
        table
            .append(&[create_test_record(index)])
            .await
            .expect("should append");
    }

    table
        .optimize(chrono::Duration::zero())
        .await
        .expect("should optimize");

    assert_eq!(table.count_rows().await.expect("count"), 3);
}
