use anyformat_daemon::config::{Config, DaemonConfig, HistoryConfig};
use anyformat_daemon::server::Server;
use anyformat_protocol::*;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::UnixStream;

/// Create a test config with a unique socket path and history directory.
fn test_config(socket_path: &str, history_dir: &std::path::Path) -> Config {
    Config {
        daemon: DaemonConfig {
            socket_path: socket_path.to_string(),
            log_level: "warn".to_string(),
        },
        history: HistoryConfig {
            storage_dir: Some(history_dir.display().to_string()),
            ..HistoryConfig::default()
        },
        ..Config::default()
    }
}

/// Send a JSON-RPC request and read the response.
async fn send_request(
    socket_path: &str,
    method: &str,
    params: Option<serde_json::Value>,
) -> JsonRpcResponse {
    let stream = UnixStream::connect(socket_path).await.unwrap();
    let (reader, mut writer) = stream.into_split();

    let request = JsonRpcRequest::new(method, params, RequestId::Number(1));
    let json = serde_json::to_string(&request).unwrap();

    writer.write_all(json.as_bytes()).await.unwrap();
    writer.write_all(b"\n").await.unwrap();
    writer.flush().await.unwrap();

    let mut reader = BufReader::new(reader);
    let mut line = String::new();
    reader.read_line(&mut line).await.unwrap();

    serde_json::from_str(&line).unwrap()
}

/// Start a daemon server in the background for testing.
async fn start_test_server(config: Config) {
    let server = Server::new(config);
    tokio::spawn(async move {
        let _ = server.run().await;
    });
    // Give the server a moment to bind
    tokio::time::sleep(Duration::from_millis(100)).await;
}

#[tokio::test]
async fn test_status_request() {
    let socket = format!("/tmp/anyformat-test-status-{}.sock", std::process::id());
    let dir = tempfile::tempdir().unwrap();
    start_test_server(test_config(&socket, dir.path())).await;

    let response = send_request(&socket, methods::STATUS, None).await;

    assert!(response.error.is_none(), "Status should not return error");
    let result = response.result.unwrap();
    assert_eq!(result["status"], "running");
    assert_eq!(result["history_enabled"], true);
    assert_eq!(result["history_items"], 0);

    let _ = std::fs::remove_file(&socket);
}

#[tokio::test]
async fn test_create_then_get_updates_history() {
    let socket = format!("/tmp/anyformat-test-create-{}.sock", std::process::id());
    let dir = tempfile::tempdir().unwrap();
    start_test_server(test_config(&socket, dir.path())).await;

    let params = serde_json::json!({"input": "{\"users\": [1, 2, 3]}", "title": "users.json"});
    let response = send_request(&socket, methods::DOCUMENT_CREATE, Some(params)).await;
    assert!(
        response.error.is_none(),
        "Create should not return error: {:?}",
        response.error
    );
    let doc = response.result.unwrap();
    assert_eq!(doc["title"], "users.json");
    let id = doc["id"].as_str().unwrap().to_string();

    let second = send_request(
        &socket,
        methods::DOCUMENT_CREATE,
        Some(serde_json::json!({"input": "[true]"})),
    )
    .await
    .result
    .unwrap();

    // Viewing the first document again moves it back to the top.
    let fetched = send_request(
        &socket,
        methods::DOCUMENT_GET,
        Some(serde_json::json!({"id": id})),
    )
    .await;
    assert_eq!(fetched.result.unwrap()["id"], id.as_str());

    let history = send_request(&socket, methods::HISTORY_LIST, None)
        .await
        .result
        .unwrap();
    let ids: Vec<&str> = history
        .as_array()
        .unwrap()
        .iter()
        .map(|r| r["id"].as_str().unwrap())
        .collect();
    assert_eq!(ids, [id.as_str(), second["id"].as_str().unwrap()]);

    // History is persisted in the configured directory.
    assert!(dir.path().join("anyformat_file_history.json").exists());

    let _ = std::fs::remove_file(&socket);
}

#[tokio::test]
async fn test_create_from_file_missing_fields() {
    let socket = format!("/tmp/anyformat-test-upload-{}.sock", std::process::id());
    let dir = tempfile::tempdir().unwrap();
    start_test_server(test_config(&socket, dir.path())).await;

    let response = send_request(
        &socket,
        methods::DOCUMENT_CREATE_FROM_FILE,
        Some(serde_json::json!({"filename": "data.json"})),
    )
    .await;

    let error = response.error.unwrap();
    assert_eq!(error.code, INVALID_PARAMS);
    assert_eq!(error.data.unwrap(), serde_json::json!({"rawJson": true}));

    let _ = std::fs::remove_file(&socket);
}

#[tokio::test]
async fn test_invalid_method() {
    let socket = format!("/tmp/anyformat-test-method-{}.sock", std::process::id());
    let dir = tempfile::tempdir().unwrap();
    start_test_server(test_config(&socket, dir.path())).await;

    let response = send_request(&socket, "nonexistent/method", None).await;

    assert!(response.error.is_some());
    assert_eq!(response.error.unwrap().code, METHOD_NOT_FOUND);

    let _ = std::fs::remove_file(&socket);
}

#[tokio::test]
async fn test_create_missing_params() {
    let socket = format!("/tmp/anyformat-test-params-{}.sock", std::process::id());
    let dir = tempfile::tempdir().unwrap();
    start_test_server(test_config(&socket, dir.path())).await;

    let response = send_request(&socket, methods::DOCUMENT_CREATE, None).await;

    assert!(response.error.is_some());
    assert_eq!(response.error.unwrap().code, INVALID_PARAMS);

    let _ = std::fs::remove_file(&socket);
}

#[tokio::test]
async fn test_multiple_requests_same_connection() {
    let socket = format!("/tmp/anyformat-test-multi-{}.sock", std::process::id());
    let dir = tempfile::tempdir().unwrap();
    start_test_server(test_config(&socket, dir.path())).await;

    let stream = UnixStream::connect(&socket).await.unwrap();
    let (reader, mut writer) = stream.into_split();
    let mut reader = BufReader::new(reader);

    // Request 1: record a history entry
    let params = serde_json::json!({"id": "abc", "title": "abc.json", "type": "file", "size": 3});
    let req1 = JsonRpcRequest::new(methods::HISTORY_ADD, Some(params), RequestId::Number(1));
    let json1 = serde_json::to_string(&req1).unwrap();
    writer.write_all(json1.as_bytes()).await.unwrap();
    writer.write_all(b"\n").await.unwrap();
    writer.flush().await.unwrap();

    let mut line1 = String::new();
    reader.read_line(&mut line1).await.unwrap();
    let resp1: JsonRpcResponse = serde_json::from_str(&line1).unwrap();
    assert!(resp1.error.is_none());

    // Request 2: list it back
    let req2 = JsonRpcRequest::new(methods::HISTORY_LIST, None, RequestId::Number(2));
    let json2 = serde_json::to_string(&req2).unwrap();
    writer.write_all(json2.as_bytes()).await.unwrap();
    writer.write_all(b"\n").await.unwrap();
    writer.flush().await.unwrap();

    let mut line2 = String::new();
    reader.read_line(&mut line2).await.unwrap();
    let resp2: JsonRpcResponse = serde_json::from_str(&line2).unwrap();
    assert_eq!(resp2.id, RequestId::Number(2));
    let records = resp2.result.unwrap();
    assert_eq!(records[0]["id"], "abc");
    assert_eq!(records[0]["size"], 3);

    let _ = std::fs::remove_file(&socket);
}

#[tokio::test]
async fn test_malformed_line_is_parse_error() {
    let socket = format!("/tmp/anyformat-test-parse-{}.sock", std::process::id());
    let dir = tempfile::tempdir().unwrap();
    start_test_server(test_config(&socket, dir.path())).await;

    let stream = UnixStream::connect(&socket).await.unwrap();
    let (reader, mut writer) = stream.into_split();
    writer.write_all(b"{not json\n").await.unwrap();
    writer.flush().await.unwrap();

    let mut reader = BufReader::new(reader);
    let mut line = String::new();
    reader.read_line(&mut line).await.unwrap();
    let response: JsonRpcResponse = serde_json::from_str(&line).unwrap();
    assert_eq!(response.error.unwrap().code, PARSE_ERROR);

    let _ = std::fs::remove_file(&socket);
}
