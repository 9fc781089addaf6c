use mcp_link::core::errors::ClientError;
use mcp_link::mcp::{Address, McpClient, McpServer};
use mcp_link::registry::{EchoTool, StaticToolRegistry};
use serde_json::{json, Map, Value};
use std::collections::BTreeMap;
use std::io::Write;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};

fn echo_server() -> McpServer {
    let tools = StaticToolRegistry::new().with_tool(EchoTool::new("x"));
    McpServer::new("scenario-server", "0.9.0", Arc::new(tools))
}

fn args(value: Value) -> Map<String, Value> {
    value.as_object().cloned().unwrap_or_default()
}

async fn serve_unix(server: &McpServer, dir: &tempfile::TempDir) -> Address {
    let path = dir.path().join("mcp.sock");
    server.listen(&Address::Unix(path)).await.unwrap()
}

#[tokio::test]
async fn test_initialize_over_unix_socket() {
    let dir = tempfile::tempdir().unwrap();
    let server = echo_server();
    let addr = serve_unix(&server, &dir).await;

    let client = McpClient::connect(&addr).await.unwrap();
    let result = client.initialize("test", "0.1.0").await.unwrap();

    assert_eq!(result.protocol_version, "2024-11-05");
    assert_eq!(result.server_info.name, "scenario-server");
    assert_eq!(result.server_info.version, "0.9.0");
    assert!(result.capabilities.tools);
    assert!(result.capabilities.resources);
    assert!(!result.capabilities.prompts);
    assert_eq!(client.server_info().unwrap().name, "scenario-server");

    client.close().await;
    server.shutdown(Duration::from_secs(1)).await;
}

#[tokio::test]
async fn test_initialize_twice_is_idempotent() {
    let server = echo_server();
    let addr = server.listen(&Address::Tcp("127.0.0.1:0".into())).await.unwrap();

    let client = McpClient::connect(&addr).await.unwrap();
    let first = client.call("initialize", Some(json!({}))).await.unwrap();
    let second = client.call("initialize", Some(json!({}))).await.unwrap();
    assert_eq!(first, second);
    server.shutdown(Duration::from_secs(1)).await;
}

#[tokio::test]
async fn test_tools_over_tcp() {
    let server = echo_server();
    let addr = server.listen(&Address::Tcp("127.0.0.1:0".into())).await.unwrap();
    let client = McpClient::connect(&addr).await.unwrap();

    let tools = client.list_tools().await.unwrap();
    assert_eq!(tools.len(), 1);
    assert_eq!(tools[0].name, "echo");

    let text = client.call_tool("echo", args(json!({"x": "hi"}))).await.unwrap();
    assert_eq!(text, "hi");

    let err = client.call_tool("nope", Map::new()).await.unwrap_err();
    match err {
        ClientError::Rpc { code, message } => {
            assert_eq!(code, -32602);
            assert!(message.starts_with("Tool execution failed"), "{}", message);
        }
        other => panic!("unexpected error: {:?}", other),
    }

    server.shutdown(Duration::from_secs(1)).await;
}

#[tokio::test]
async fn test_unknown_method_is_reported() {
    let server = echo_server();
    let addr = server.listen(&Address::Tcp("127.0.0.1:0".into())).await.unwrap();
    let client = McpClient::connect(&addr).await.unwrap();

    let resp = client
        .request("prompts/list", None, Duration::from_secs(5))
        .await
        .unwrap();
    let err = resp.error().unwrap();
    assert_eq!(err.code, -32601);
    assert_eq!(err.message, "Method not found");

    server.shutdown(Duration::from_secs(1)).await;
}

#[tokio::test]
async fn test_resources_list_and_read() {
    let dir = tempfile::tempdir().unwrap();
    let server = echo_server();
    let addr = serve_unix(&server, &dir).await;
    let client = McpClient::connect(&addr).await.unwrap();

    assert!(client.list_resources().await.unwrap().is_empty());

    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(b"line one\nline two\n").unwrap();
    let uri = file.path().to_string_lossy().to_string();
    let mut metadata = BTreeMap::new();
    metadata.insert("owner".to_string(), "tests".to_string());
    server.register_resource(uri.clone(), "notes", "Test notes", "text/plain", metadata);
    server.register_resource("/nowhere/image.png", "img", "", "image/png", BTreeMap::new());

    let listed = client.list_resources().await.unwrap();
    assert_eq!(listed.len(), 2);

    let read = client.read_resource(&uri).await.unwrap();
    assert_eq!(read.contents.len(), 1);
    assert_eq!(read.contents[0].uri, uri);
    assert_eq!(read.contents[0].mime_type, "text/plain");
    assert_eq!(read.contents[0].text, "line one\nline two\n");

    let missing = client.read_resource("mem://missing").await.unwrap_err();
    assert!(matches!(
        missing,
        ClientError::Rpc { code: -32602, ref message } if message == "Resource not found"
    ));

    let binary = client.read_resource("/nowhere/image.png").await.unwrap_err();
    assert!(matches!(
        binary,
        ClientError::Rpc { code: -32602, ref message } if message == "Unsupported resource type"
    ));

    server.shutdown(Duration::from_secs(1)).await;
}

#[tokio::test]
async fn test_unreadable_resource_reports_failure() {
    let server = echo_server();
    let addr = server.listen(&Address::Tcp("127.0.0.1:0".into())).await.unwrap();
    server.register_resource("/definitely/not/here.txt", "gone", "", "text/plain", BTreeMap::new());

    let client = McpClient::connect(&addr).await.unwrap();
    let err = client.read_resource("/definitely/not/here.txt").await.unwrap_err();
    match err {
        ClientError::Rpc { code, message } => {
            assert_eq!(code, -32602);
            assert!(message.starts_with("Failed to read resource"), "{}", message);
        }
        other => panic!("unexpected error: {:?}", other),
    }
    server.shutdown(Duration::from_secs(1)).await;
}

#[tokio::test]
async fn test_ids_are_echoed_and_requests_answered_in_order() {
    let server = echo_server();
    let addr = server.listen(&Address::Tcp("127.0.0.1:0".into())).await.unwrap();
    let Address::Tcp(hostport) = addr else {
        panic!("expected tcp address");
    };

    let mut stream = tokio::net::TcpStream::connect(hostport).await.unwrap();
    // Two requests back to back with no separator, one with a string id.
    let wire = [
        r#"{"jsonrpc":"2.0","id":"abc","method":"tools/list"}"#,
        r#"{"jsonrpc":"2.0","id":42,"method":"resources/list"}"#,
    ]
    .concat();
    stream.write_all(wire.as_bytes()).await.unwrap();
    stream.shutdown().await.unwrap();

    let mut raw = String::new();
    stream.read_to_string(&mut raw).await.unwrap();
    let responses: Vec<Value> = serde_json::Deserializer::from_str(&raw)
        .into_iter::<Value>()
        .collect::<Result<_, _>>()
        .unwrap();

    assert_eq!(responses.len(), 2);
    assert_eq!(responses[0]["id"], json!("abc"));
    assert!(responses[0]["result"]["tools"].is_array());
    assert_eq!(responses[1]["id"], json!(42));
    assert_eq!(responses[1]["result"], json!({"resources": []}));
}

#[tokio::test]
async fn test_malformed_input_closes_only_that_connection() {
    let dir = tempfile::tempdir().unwrap();
    let server = echo_server();
    let addr = serve_unix(&server, &dir).await;

    let healthy = McpClient::connect(&addr).await.unwrap();
    healthy.list_tools().await.unwrap();

    let mut bad = tokio::net::UnixStream::connect(dir.path().join("mcp.sock"))
        .await
        .unwrap();
    bad.write_all(b"{not json}\n").await.unwrap();
    let mut buf = Vec::new();
    let n = tokio::time::timeout(Duration::from_secs(5), bad.read_to_end(&mut buf))
        .await
        .expect("server should close the connection")
        .unwrap();
    assert_eq!(n, 0, "no response is written for malformed input");

    let text = healthy.call_tool("echo", args(json!({"x": "still here"}))).await.unwrap();
    assert_eq!(text, "still here");

    server.shutdown(Duration::from_secs(1)).await;
}

#[tokio::test]
async fn test_serves_unix_and_tcp_at_once() {
    let dir = tempfile::tempdir().unwrap();
    let server = echo_server();
    let unix = serve_unix(&server, &dir).await;
    let tcp = server.listen(&Address::Tcp("127.0.0.1:0".into())).await.unwrap();
    assert_eq!(server.listening().len(), 2);

    let a = McpClient::connect(&unix).await.unwrap();
    let b = McpClient::connect(&tcp).await.unwrap();
    assert_eq!(a.call_tool("echo", args(json!({"x": "u"}))).await.unwrap(), "u");
    assert_eq!(b.call_tool("echo", args(json!({"x": "t"}))).await.unwrap(), "t");

    server.shutdown(Duration::from_secs(1)).await;
    assert!(!dir.path().join("mcp.sock").exists());
}

#[tokio::test]
async fn test_shutdown_closes_open_connections() {
    let server = echo_server();
    let addr = server.listen(&Address::Tcp("127.0.0.1:0".into())).await.unwrap();
    let client = McpClient::connect(&addr).await.unwrap();
    client.list_tools().await.unwrap();
    assert_eq!(server.active_connections(), 1);

    server.shutdown(Duration::from_secs(2)).await;
    assert_eq!(server.active_connections(), 0);

    let err = client.list_tools().await.unwrap_err();
    assert!(
        matches!(err, ClientError::ConnectionClosed | ClientError::Transport(_)),
        "{:?}",
        err
    );
}
