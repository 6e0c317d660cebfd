//! Export tests

use std::io;
use std::pin::Pin;
use std::task::{Context, Poll};

use opsbackup::app::run::run_export;
use opsbackup::errors::ClientError;
use opsbackup::remote::executor::CommandExecutor;
use opsbackup::storage::layout::BackupLayout;
use serde_json::json;
use tokio::io::{AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpListener;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use crate::common::{
    basic_auth_client, client, mount_token, mount_token_rejected, RecordingExecutor, ADMIN_BASIC,
    TOKEN,
};

const SETTINGS: &str = r#"{"infrastructure":{"type":"vsphere"},"products":[]}"#;

fn archive() -> Vec<u8> {
    // Not valid UTF-8 so the copy is checked byte for byte
    let mut bytes = b"PK\x03\x04".to_vec();
    bytes.extend((0..=255u8).cycle().take(64 * 1024 + 17));
    bytes
}

#[tokio::test]
async fn test_export_with_token() {
    let mock_server = MockServer::start().await;
    mount_token(&mock_server).await;

    Mock::given(method("GET"))
        .and(path("/api/installation_settings"))
        .and(header("authorization", format!("Bearer {}", TOKEN).as_str()))
        .and(header("content-type", "application/octet-stream"))
        .respond_with(ResponseTemplate::new(200).set_body_string(SETTINGS))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = client(&mock_server, false);
    let mut sink = Vec::new();
    let written = client
        .export_file("{base}/api/installation_settings", "installation.json", &mut sink)
        .await
        .unwrap();

    assert_eq!(written, SETTINGS.len() as u64);
    assert_eq!(sink, SETTINGS.as_bytes());
}

#[tokio::test]
async fn test_export_falls_back_to_basic_auth() {
    let mock_server = MockServer::start().await;
    mount_token_rejected(&mock_server).await;

    Mock::given(method("GET"))
        .and(path("/api/installation_asset_collection"))
        .and(header("authorization", ADMIN_BASIC))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(archive()))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = client(&mock_server, false);
    let mut sink = Vec::new();
    client
        .export_file("/api/installation_asset_collection", "installation.zip", &mut sink)
        .await
        .unwrap();

    assert_eq!(sink, archive());
}

#[tokio::test]
async fn test_export_error_carries_body() {
    let mock_server = MockServer::start().await;
    mount_token(&mock_server).await;

    Mock::given(method("GET"))
        .and(path("/api/installation_settings"))
        .respond_with(ResponseTemplate::new(500).set_body_string("export went sideways"))
        .mount(&mock_server)
        .await;

    let client = client(&mock_server, false);
    let mut sink = Vec::new();
    let err = client
        .export_file("{base}/api/installation_settings", "installation.json", &mut sink)
        .await
        .unwrap_err();

    assert_eq!(err.status(), Some(500));
    let message = err.to_string();
    assert!(message.contains("expected status 200, was 500"));
    assert!(message.contains("Response Body: export went sideways"));
    assert!(sink.is_empty());
}

#[tokio::test]
async fn test_run_export_writes_backup() {
    let mock_server = MockServer::start().await;
    mount_token(&mock_server).await;

    Mock::given(method("GET"))
        .and(path("/api/installation_settings"))
        .respond_with(ResponseTemplate::new(200).set_body_string(SETTINGS))
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/installation_asset_collection"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(archive()))
        .mount(&mock_server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let layout = BackupLayout::new(dir.path());
    let executor = RecordingExecutor::with_output(b"deployments-tarball");

    run_export(&client(&mock_server, false), &layout, Some(&executor as &dyn CommandExecutor))
        .await
        .unwrap();

    assert_eq!(
        std::fs::read_to_string(dir.path().join("installation.json")).unwrap(),
        SETTINGS
    );
    assert_eq!(std::fs::read(dir.path().join("installation.zip")).unwrap(), archive());
    assert_eq!(
        std::fs::read(dir.path().join("deployments.tar.gz")).unwrap(),
        b"deployments-tarball"
    );
    assert_eq!(
        executor.calls(),
        ["cd /var/tempest/workspaces/default && tar cz deployments"]
    );
}

#[tokio::test]
async fn test_failed_export_leaves_no_partial_files() {
    let mock_server = MockServer::start().await;
    mount_token(&mock_server).await;

    Mock::given(method("GET"))
        .and(path("/api/installation_settings"))
        .respond_with(ResponseTemplate::new(200).set_body_string(SETTINGS))
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/installation_asset_collection"))
        .respond_with(ResponseTemplate::new(503).set_body_string("busy"))
        .mount(&mock_server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let layout = BackupLayout::new(dir.path());

    let err = run_export(&client(&mock_server, false), &layout, None)
        .await
        .unwrap_err();

    assert!(matches!(err, ClientError::UnexpectedStatus { actual: 503, .. }));
    assert!(!dir.path().join("installation.json").exists());
    assert!(!dir.path().join("installation.zip").exists());
}

#[tokio::test]
async fn test_installation_settings_raw() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/installation_settings"))
        .and(header("authorization", ADMIN_BASIC))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"installation_settings": {"products": []}})),
        )
        .mount(&mock_server)
        .await;

    let raw = client(&mock_server, false)
        .installation_settings_raw()
        .await
        .unwrap()
        .unwrap();
    assert_eq!(raw, br#"{"products":[]}"#);
}

#[tokio::test]
async fn test_installation_settings_raw_not_installed() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/installation_settings"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&mock_server)
        .await;

    let raw = client(&mock_server, false)
        .installation_settings_raw()
        .await
        .unwrap();
    assert!(raw.is_none());
}

/// Sink that refuses every write
struct FullDisk;

impl AsyncWrite for FullDisk {
    fn poll_write(
        self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
        _buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        Poll::Ready(Err(io::Error::other("no space left on device")))
    }

    fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Poll::Ready(Ok(()))
    }

    fn poll_shutdown(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Poll::Ready(Ok(()))
    }
}

#[tokio::test]
async fn test_sink_write_failure_is_an_error() {
    let mock_server = MockServer::start().await;
    mount_token(&mock_server).await;

    Mock::given(method("GET"))
        .and(path("/api/installation_asset_collection"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(archive()))
        .mount(&mock_server)
        .await;

    let err = client(&mock_server, false)
        .export_file("{base}/api/installation_asset_collection", "installation.zip", &mut FullDisk)
        .await
        .unwrap_err();

    assert!(matches!(err, ClientError::IoError(ref e) if e.to_string().contains("no space left")));
}

/// Serves the settings in full but closes the connection a few bytes into
/// the asset archive, well short of its declared length
async fn truncating_server() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        while let Ok((mut socket, _)) = listener.accept().await {
            tokio::spawn(async move {
                let mut request = Vec::new();
                let mut buf = [0u8; 1024];
                while !request.windows(4).any(|w| w == b"\r\n\r\n") {
                    match socket.read(&mut buf).await {
                        Ok(0) | Err(_) => return,
                        Ok(n) => request.extend_from_slice(&buf[..n]),
                    }
                }

                let response = if request.starts_with(b"GET /api/installation_settings ") {
                    format!(
                        "HTTP/1.1 200 OK\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                        SETTINGS.len(),
                        SETTINGS
                    )
                    .into_bytes()
                } else {
                    b"HTTP/1.1 200 OK\r\nContent-Length: 4096\r\nConnection: close\r\n\r\nPK\x03\x04partial"
                        .to_vec()
                };
                let _ = socket.write_all(&response).await;
                let _ = socket.shutdown().await;
            });
        }
    });

    format!("http://{}", addr)
}

#[tokio::test]
async fn test_truncated_body_is_an_error() {
    let base_url = truncating_server().await;
    let client = basic_auth_client(&base_url);

    let mut sink = Vec::new();
    let err = client
        .export_file("{base}/api/installation_asset_collection", "installation.zip", &mut sink)
        .await
        .unwrap_err();

    assert!(matches!(err, ClientError::Transport { .. }), "{:?}", err);
}

#[tokio::test]
async fn test_truncated_export_leaves_no_partial_files() {
    let base_url = truncating_server().await;
    let dir = tempfile::tempdir().unwrap();
    let layout = BackupLayout::new(dir.path());

    let result = run_export(&basic_auth_client(&base_url), &layout, None).await;

    assert!(result.is_err());
    assert!(!dir.path().join("installation.json").exists());
    assert!(!dir.path().join("installation.zip").exists());
}
