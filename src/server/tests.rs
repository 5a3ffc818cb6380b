use super::handlers::*;
use super::*;
use crate::database::{Record, UserTable, VECTOR_DIMENSION, connect};
use crate::ingest::RandomMaintenance;
use crate::jsonl::jsonl_path;
use axum::Json;
use axum::body::{Bytes, to_bytes};
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::Response;
use tempfile::TempDir;

fn create_test_state() -> (AppState, TempDir) {
    let temp_dir = TempDir::new().expect("should create temp dir");
    let config = Config {
        base_dir: temp_dir.path().to_path_buf(),
        ..Config::default()
    };
    let ingestor = Ingestor::with_policy(
        config,
        RandomMaintenance::seeded(0.0, 3).expect("valid probability"),
    );
    (
        AppState {
            ingestor: Arc::new(ingestor),
        },
        temp_dir,
    )
}

async fn body_string(response: Response) -> String {
    let bytes = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("should read body");
    serde_json::from_slice(&bytes).expect("body should be a JSON string")
}

#[tokio::test]
async fn index_jsonl_success() {
    let (state, temp_dir) = create_test_state();
    let url = "https://www.memfree.me/docs/index-bookmarks";
    let record = Record {
        title: Some("Index bookmarks".to_string()),
        vector: Some(vec![0.25; VECTOR_DIMENSION]),
        ..Record::default()
    };
    std::fs::write(
        jsonl_path(temp_dir.path(), url),
        serde_json::to_string(&record).expect("serialize"),
    )
    .expect("should write fixture");

    let body = Bytes::from(format!(r#"{{"url":"{}","userId":"memfree"}}"#, url));
    let response = index_jsonl(State(state.clone()), body).await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_string(response).await, SUCCESS_MESSAGE);

    let connection = connect(state.ingestor.config()).await.expect("connect");
    let table = UserTable::open_or_create(&connection, "memfree")
        .await
        .expect("open table");
    assert_eq!(table.read_all().await.expect("scan"), vec![record]);
}

#[tokio::test]
async fn index_jsonl_missing_file() {
    let (state, _temp_dir) = create_test_state();

    let body =
        Bytes::from_static(br#"{"url":"https://www.memfree.me/nothing","userId":"memfree"}"#);
    let response = index_jsonl(State(state), body).await;

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body_string(response).await, FAILURE_MESSAGE);
}

#[tokio::test]
async fn index_jsonl_invalid_body() {
    let (state, _temp_dir) = create_test_state();

    let bodies: [&'static [u8]; 3] = [b"not json", br#"{"url":"x"}"#, b""];
    for body in bodies {
        let response = index_jsonl(State(state.clone()), Bytes::from_static(body)).await;
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body_string(response).await, FAILURE_MESSAGE);
    }
}

#[tokio::test]
async fn welcome_and_not_found_payloads() {
    let Json(message) = welcome().await;
    assert_eq!(message, WELCOME_MESSAGE);

    let (status, Json(message)) = not_found().await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(message, NOT_FOUND_MESSAGE);
}

#[test]
fn index_request_uses_camel_case_user_id() {
    let request: IndexRequest =
        serde_json::from_str(r#"{"url":"https://a.com/b","userId":"u1"}"#).expect("parse");
    assert_eq!(request.url, "https://a.com/b");
    assert_eq!(request.user_id, "u1");

    assert!(serde_json::from_str::<IndexRequest>(r#"{"url":"a","user_id":"u1"}"#).is_err());
}
