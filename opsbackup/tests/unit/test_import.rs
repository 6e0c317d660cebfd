//! Import tests

use opsbackup::app::run::run_import;
use opsbackup::errors::ClientError;
use opsbackup::filesys::file::File;
use opsbackup::remote::executor::CommandExecutor;
use wiremock::matchers::{body_string_contains, header, header_regex, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use crate::common::{client, RecordingExecutor, ADMIN_BASIC};

const ASSETS_PATH: &str = "/api/installation_asset_collection";
const ARCHIVE: &[u8] = b"PK\x03\x04installation-archive";

fn remove_command() -> &'static str {
    "if [ -f /var/tempest/workspaces/default/deployments/bosh-deployments.yml ]; \
     then sudo rm /var/tempest/workspaces/default/deployments/bosh-deployments.yml;fi"
}

async fn mount_upload(mock_server: &MockServer, status: u16) {
    Mock::given(method("POST"))
        .and(path(ASSETS_PATH))
        .and(header("authorization", ADMIN_BASIC))
        .and(header_regex("content-type", "^multipart/form-data; boundary="))
        .and(body_string_contains("name=\"installation[file]\"; filename=\"installation.zip\""))
        .and(body_string_contains("name=\"passphrase\""))
        .and(body_string_contains("decrypt-me"))
        .and(body_string_contains("installation-archive"))
        .respond_with(ResponseTemplate::new(status).set_body_string("upload response"))
        .expect(1)
        .mount(mock_server)
        .await;
}

#[tokio::test]
async fn test_import_then_cleanup() {
    let mock_server = MockServer::start().await;
    mount_upload(&mock_server, 200).await;
    let executor = RecordingExecutor::default();

    client(&mock_server, false)
        .import_installation(ARCHIVE, Some(&executor as &dyn CommandExecutor))
        .await
        .unwrap();

    assert_eq!(executor.calls(), [remove_command()]);
}

#[tokio::test]
async fn test_import_without_cleanup() {
    let mock_server = MockServer::start().await;
    mount_upload(&mock_server, 200).await;

    client(&mock_server, false)
        .import_installation(ARCHIVE, None)
        .await
        .unwrap();
}

#[tokio::test]
async fn test_rejected_import_skips_cleanup() {
    let mock_server = MockServer::start().await;
    mount_upload(&mock_server, 500).await;
    let executor = RecordingExecutor::default();

    let err = client(&mock_server, false)
        .import_installation(ARCHIVE, Some(&executor as &dyn CommandExecutor))
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        ClientError::UnexpectedStatus { expected: 200, actual: 500, ref body, .. } if body == "upload response"
    ));
    assert!(executor.calls().is_empty());
}

#[tokio::test]
async fn test_cleanup_failure_is_reported_apart() {
    let mock_server = MockServer::start().await;
    mount_upload(&mock_server, 200).await;
    let executor = RecordingExecutor::failing();

    let err = client(&mock_server, false)
        .import_installation(ARCHIVE, Some(&executor as &dyn CommandExecutor))
        .await
        .unwrap_err();

    assert!(err.is_cleanup());
    assert_eq!(executor.calls().len(), 1);
}

#[tokio::test]
async fn test_sized_import_of_archive_file() {
    let mock_server = MockServer::start().await;
    mount_upload(&mock_server, 200).await;

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("installation.zip");
    std::fs::write(&path, ARCHIVE).unwrap();

    run_import(&client(&mock_server, true), &File::new(&path), None)
        .await
        .unwrap();
}

#[tokio::test]
async fn test_import_of_missing_archive() {
    let mock_server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();

    let err = run_import(
        &client(&mock_server, false),
        &File::new(dir.path().join("missing.zip")),
        None,
    )
    .await
    .unwrap_err();

    assert!(matches!(err, ClientError::IoError(_)));
}
