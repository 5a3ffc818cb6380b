use super::*;
use tempfile::TempDir;

fn local_config() -> (Config, TempDir) {
    let temp_dir = TempDir::new().expect("should create temp dir");
    let config = Config {
        base_dir: temp_dir.path().to_path_buf(),
        ..Config::default()
    };
    (config, temp_dir)
}

#[tokio::test]
async fn connects_to_local_directory_without_bucket() {
    let (config, _temp_dir) = local_config();

    let connection = connect(&config).await.expect("should connect locally");
    let tables = connection
        .table_names()
        .execute()
        .await
        .expect("should list tables");
    assert!(tables.is_empty());
}

#[tokio::test]
async fn blank_bucket_falls_back_to_local() {
    let (mut config, _temp_dir) = local_config();
    config.storage.bucket = Some(String::new());

    assert!(connect(&config).await.is_ok());
}

#[test]
fn storage_options_include_credentials() {
    let storage = StorageConfig {
        bucket: Some("s3://memfree".to_string()),
        access_key_id: "AKIA".to_string(),
        secret_access_key: "secret".to_string(),
        region: "us-west-2".to_string(),
        s3_express: true,
    };

    let options = storage_options(&storage);
    assert_eq!(
        options,
        vec![
            ("aws_access_key_id".to_string(), "AKIA".to_string()),
            ("aws_secret_access_key".to_string(), "secret".to_string()),
            ("region".to_string(), "us-west-2".to_string()),
            ("s3_express".to_string(), "true".to_string()),
        ]
    );
}

#[test]
fn storage_options_skip_empty_credentials() {
    let storage = StorageConfig {
        s3_express: false,
        ..StorageConfig::default()
    };

    let options = storage_options(&storage);
    assert_eq!(
        options,
        vec![("s3_express".to_string(), "false".to_string())]
    );
}
