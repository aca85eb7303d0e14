//! `ApiClient` against a local HTTP stub that records every request.

use std::collections::HashMap;
use std::io;
use std::sync::{Arc, Mutex};

use serde_json::json;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;

use einventory_core::api::LoginRequest;
use einventory_core::{ApiClient, ApiError, Config, IdentityService, Token};

#[derive(Debug, Clone)]
struct Recorded {
    method: String,
    path: String,
    headers: HashMap<String, String>,
    body: String,
}

impl Recorded {
    fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).map(String::as_str)
    }
}

/// Answers each path with a fixed status and body; unknown paths get 404.
struct StubServer {
    client: ApiClient,
    requests: Arc<Mutex<Vec<Recorded>>>,
    handle: JoinHandle<()>,
}

impl StubServer {
    async fn start(routes: &[(&'static str, u16, &'static str)]) -> Self {
        let listener = TcpListener::bind(("127.0.0.1", 0)).await.unwrap();
        let addr = listener.local_addr().unwrap();
        let routes: HashMap<&'static str, (u16, &'static str)> = routes
            .iter()
            .map(|(path, status, body)| (*path, (*status, *body)))
            .collect();
        let requests = Arc::new(Mutex::new(Vec::new()));

        let log = requests.clone();
        let handle = tokio::spawn(async move {
            while let Ok((mut stream, _)) = listener.accept().await {
                let Ok(request) = read_request(&mut stream).await else {
                    continue;
                };
                let (status, body) = routes.get(request.path.as_str()).copied().unwrap_or((404, ""));
                log.lock().unwrap().push(request);

                let reason = reqwest::StatusCode::from_u16(status)
                    .ok()
                    .and_then(|s| s.canonical_reason())
                    .unwrap_or("Unknown");
                let reply = format!(
                    "HTTP/1.1 {} {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                    status,
                    reason,
                    body.len(),
                    body
                );
                let _ = stream.write_all(reply.as_bytes()).await;
                let _ = stream.shutdown().await;
            }
        });

        let mut config = Config::default();
        config.override_api_base_url(Some(format!("http://{}/api", addr)));
        let client = ApiClient::new(&config).unwrap();

        Self {
            client,
            requests,
            handle,
        }
    }

    fn requests(&self) -> Vec<Recorded> {
        self.requests.lock().unwrap().clone()
    }

    fn only_request(&self) -> Recorded {
        let requests = self.requests();
        assert_eq!(requests.len(), 1, "expected one request, got {:?}", requests);
        requests[0].clone()
    }
}

impl Drop for StubServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

async fn read_request(stream: &mut TcpStream) -> io::Result<Recorded> {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 1024];

    let header_end = loop {
        if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
            break pos + 4;
        }
        let n = stream.read(&mut chunk).await?;
        if n == 0 {
            return Err(io::ErrorKind::UnexpectedEof.into());
        }
        buf.extend_from_slice(&chunk[..n]);
    };

    let head = String::from_utf8_lossy(&buf[..header_end]).to_string();
    let mut lines = head.split("\r\n");
    let mut request_line = lines.next().unwrap_or_default().split_whitespace();
    let method = request_line.next().unwrap_or_default().to_string();
    let path = request_line.next().unwrap_or_default().to_string();
    let headers: HashMap<String, String> = lines
        .filter_map(|line| line.split_once(':'))
        .map(|(name, value)| (name.trim().to_ascii_lowercase(), value.trim().to_string()))
        .collect();

    let length: usize = headers
        .get("content-length")
        .and_then(|v| v.parse().ok())
        .unwrap_or(0);
    while buf.len() < header_end + length {
        let n = stream.read(&mut chunk).await?;
        if n == 0 {
            return Err(io::ErrorKind::UnexpectedEof.into());
        }
        buf.extend_from_slice(&chunk[..n]);
    }
    let body = String::from_utf8_lossy(&buf[header_end..header_end + length]).to_string();

    Ok(Recorded {
        method,
        path,
        headers,
        body,
    })
}

fn credentials() -> LoginRequest {
    LoginRequest {
        identifier: "ana".to_string(),
        secret: "hunter22".to_string(),
        site_id: 2,
    }
}

fn token() -> Token {
    Token::new("tok123").unwrap()
}

#[tokio::test]
async fn login_posts_credentials_as_json() {
    let server = StubServer::start(&[("/api/login", 200, r#"{"access":"tok123","username":"ana"}"#)]).await;

    let login = server.client.authenticate(&credentials()).await.unwrap();
    assert_eq!(login.token, "tok123");
    assert_eq!(login.identifier_echo.as_deref(), Some("ana"));

    let request = server.only_request();
    assert_eq!(request.method, "POST");
    assert_eq!(request.path, "/api/login");
    assert_eq!(request.header("content-type"), Some("application/json"));
    assert!(request.header("authorization").is_none());
    let body: serde_json::Value = serde_json::from_str(&request.body).unwrap();
    assert_eq!(body, json!({"username": "ana", "password": "hunter22", "sede_id": 2}));
}

#[tokio::test]
async fn login_with_both_token_fields_uses_access() {
    let server = StubServer::start(&[("/api/login", 200, r#"{"access":"a1","token":"t1"}"#)]).await;

    let login = server.client.authenticate(&credentials()).await.unwrap();
    assert_eq!(login.token, "a1");
}

#[tokio::test]
async fn login_without_token_is_an_invalid_response() {
    let server = StubServer::start(&[("/api/login", 200, r#"{"username":"ana"}"#)]).await;

    let err = server.client.authenticate(&credentials()).await.unwrap_err();
    assert!(matches!(err, ApiError::InvalidResponse(_)), "got {:?}", err);
}

#[tokio::test]
async fn rejected_login_keeps_service_message() {
    let server = StubServer::start(&[("/api/login", 400, r#"{"error":"Missing credentials"}"#)]).await;

    match server.client.authenticate(&credentials()).await {
        Err(ApiError::Rejected(message)) => assert_eq!(message, "Missing credentials"),
        other => panic!("expected rejection, got {:?}", other),
    }
}

#[tokio::test]
async fn wrong_credentials_map_to_unauthorized() {
    let server = StubServer::start(&[("/api/login", 401, r#"{"error":"Bad credentials"}"#)]).await;

    let err = server.client.authenticate(&credentials()).await.unwrap_err();
    assert!(matches!(err, ApiError::Unauthorized), "got {:?}", err);
}

#[tokio::test]
async fn validate_token_posts_bearer_without_body() {
    let server = StubServer::start(&[("/api/validate-token", 200, r#"{"valid":true}"#)]).await;

    server.client.validate_token(&token()).await.unwrap();

    let request = server.only_request();
    assert_eq!(request.method, "POST");
    assert_eq!(request.path, "/api/validate-token");
    assert_eq!(request.header("authorization"), Some("Bearer tok123"));
    assert!(request.body.is_empty());
}

#[tokio::test]
async fn rejected_token_maps_to_unauthorized() {
    let server = StubServer::start(&[("/api/validate-token", 401, r#"{"detail":"Token expired"}"#)]).await;

    let err = server.client.validate_token(&token()).await.unwrap_err();
    assert!(matches!(err, ApiError::Unauthorized), "got {:?}", err);
    assert!(!err.is_network());
}

#[tokio::test]
async fn profile_fetch_sends_bearer_token() {
    let server = StubServer::start(&[(
        "/api/protected-data",
        200,
        r#"{"username":"ana","message":"ok","rol":"admin"}"#,
    )])
    .await;

    let profile = server.client.fetch_profile(&token()).await.unwrap();
    assert_eq!(profile.display_name(), Some("ana"));
    assert_eq!(profile.extra.get("rol"), Some(&json!("admin")));

    let request = server.only_request();
    assert_eq!(request.method, "GET");
    assert_eq!(request.path, "/api/protected-data");
    assert_eq!(request.header("authorization"), Some("Bearer tok123"));
}

#[tokio::test]
async fn profile_server_failure_maps_to_server_error() {
    let server = StubServer::start(&[("/api/protected-data", 500, "boom")]).await;

    match server.client.fetch_profile(&token()).await {
        Err(ApiError::ServerError(message)) => assert_eq!(message, "boom"),
        other => panic!("expected server error, got {:?}", other),
    }
}

#[tokio::test]
async fn sites_are_read_from_envelope() {
    let server = StubServer::start(&[(
        "/api/sites",
        200,
        r#"{"sedes":[{"id":1,"nombre":"Central","ciudad":"Bogota"},{"id":7,"nombre":"Norte","ciudad":"Medellin","direccion":"Calle 10"}]}"#,
    )])
    .await;

    let sites = server.client.fetch_sites().await.unwrap();
    assert_eq!(sites.len(), 2);
    assert_eq!(sites[0].name, "Central");
    assert_eq!(sites[1].address.as_deref(), Some("Calle 10"));

    let request = server.only_request();
    assert_eq!(request.method, "GET");
    assert!(request.header("authorization").is_none());
}

#[tokio::test]
async fn unreachable_service_is_a_network_error() {
    let listener = TcpListener::bind(("127.0.0.1", 0)).await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let mut config = Config::default();
    config.override_api_base_url(Some(format!("http://{}", addr)));
    let client = ApiClient::new(&config).unwrap();

    let err = client.fetch_sites().await.unwrap_err();
    assert!(err.is_network(), "got {:?}", err);
}
