//! Shared test helpers

use std::sync::Mutex;

use async_trait::async_trait;
use opsbackup::app::options::ClientOptions;
use opsbackup::errors::ClientError;
use opsbackup::opsman::OpsManClient;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub const TOKEN: &str = "test-access-token";

/// base64("admin:admin")
pub const ADMIN_BASIC: &str = "Basic YWRtaW46YWRtaW4=";

/// Client for `mock_server`, with its UAA at `/uaa` on the same server
pub fn client(mock_server: &MockServer, is_s3: bool) -> OpsManClient {
    let mut options =
        ClientOptions::new(mock_server.uri(), "admin", "admin", "decrypt-me", is_s3);
    options.uaa_url = Some(format!("{}/uaa", mock_server.uri()));
    OpsManClient::new(options).unwrap()
}

/// Client that only ever gets to use basic auth: its UAA refuses connections
pub fn basic_auth_client(base_url: &str) -> OpsManClient {
    let mut options = ClientOptions::new(base_url, "admin", "admin", "decrypt-me", false);
    options.uaa_url = Some("http://127.0.0.1:1/uaa".to_string());
    OpsManClient::new(options).unwrap()
}

pub async fn mount_token(mock_server: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/uaa/oauth/token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "access_token": TOKEN,
            "token_type": "bearer",
            "expires_in": 43199,
            "scope": "opsman.admin"
        })))
        .mount(mock_server)
        .await;
}

pub async fn mount_token_rejected(mock_server: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/uaa/oauth/token"))
        .respond_with(ResponseTemplate::new(401).set_body_string("Bad credentials"))
        .mount(mock_server)
        .await;
}

/// Executor recording the commands it was asked to run
#[derive(Default)]
pub struct RecordingExecutor {
    pub commands: Mutex<Vec<String>>,
    pub output: Vec<u8>,
    pub fail: bool,
}

impl RecordingExecutor {
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Default::default()
        }
    }

    pub fn with_output(output: &[u8]) -> Self {
        Self {
            output: output.to_vec(),
            ..Default::default()
        }
    }

    pub fn calls(&self) -> Vec<String> {
        self.commands.lock().unwrap().clone()
    }
}

#[async_trait]
impl opsbackup::remote::executor::CommandExecutor for RecordingExecutor {
    async fn execute(
        &self,
        output: &mut (dyn AsyncWrite + Send + Unpin),
        command: &str,
    ) -> Result<(), ClientError> {
        self.commands.lock().unwrap().push(command.to_string());
        if self.fail {
            return Err(ClientError::Remote("ssh: connect to host refused".to_string()));
        }
        output.write_all(&self.output).await?;
        Ok(())
    }
}
