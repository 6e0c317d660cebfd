//! Client configuration options

use std::time::Duration;

use secrecy::SecretString;
use url::Url;

use crate::authn::negotiator::Credentials;
use crate::backup::upload::UploadStrategy;
use crate::errors::ClientError;
use crate::http::client::TransportConfig;
use crate::remote::executor::SshConfig;
use crate::storage::settings::Settings;

/// Options an `OpsManClient` is built from. Immutable once the client exists.
#[derive(Debug, Clone)]
pub struct ClientOptions {
    /// Appliance base URL, without trailing slash
    pub base_url: String,

    pub credentials: Credentials,

    /// Passphrase sent with imports
    pub passphrase: SecretString,

    /// Selects the object-storage upload encoding
    pub is_s3: bool,

    /// UAA base URL; derived from the target URL when absent
    pub uaa_url: Option<String>,

    /// Bound for buffering unknown-size uploads to object storage
    pub max_upload_buffer_bytes: Option<u64>,

    pub transport: TransportConfig,
}

impl ClientOptions {
    pub fn new(
        base_url: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<String>,
        passphrase: impl Into<String>,
        is_s3: bool,
    ) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            credentials: Credentials::new(username, password),
            passphrase: SecretString::from(passphrase.into()),
            is_s3,
            uaa_url: None,
            max_upload_buffer_bytes: None,
            transport: TransportConfig::default(),
        }
    }

    /// Upload encoding selected by these options
    pub fn upload_strategy(&self) -> UploadStrategy {
        match (UploadStrategy::for_backend(self.is_s3), self.max_upload_buffer_bytes) {
            (UploadStrategy::Sized { .. }, Some(max_buffer_bytes)) => {
                UploadStrategy::Sized { max_buffer_bytes }
            }
            (strategy, _) => strategy,
        }
    }
}

impl TryFrom<&Settings> for ClientOptions {
    type Error = ClientError;

    fn try_from(settings: &Settings) -> Result<Self, Self::Error> {
        let opsman = &settings.opsman;
        if opsman.url.is_empty() {
            return Err(ClientError::ConfigError("opsman url is not set".to_string()));
        }
        Url::parse(&opsman.url)?;

        let mut options = ClientOptions::new(
            opsman.url.clone(),
            opsman.username.clone(),
            opsman.password.clone(),
            opsman.passphrase.clone(),
            opsman.is_s3,
        );
        options.uaa_url = opsman.uaa_url.clone();
        options.max_upload_buffer_bytes = opsman.max_upload_buffer_bytes;
        options.transport = TransportConfig {
            no_follow_redirect: settings.transport.no_follow_redirect,
            disable_tls_verification: settings.transport.disable_tls_verification,
            request_timeout: Duration::from_secs(settings.transport.request_timeout_secs),
            connect_timeout: Duration::from_secs(settings.transport.connect_timeout_secs),
        };

        Ok(options)
    }
}

/// SSH configuration from settings; the host falls back to the Ops Manager host
pub fn ssh_config(settings: &Settings) -> Result<SshConfig, ClientError> {
    let host = match &settings.ssh.host {
        Some(host) => host.clone(),
        None => Url::parse(&settings.opsman.url)?
            .host_str()
            .map(str::to_string)
            .ok_or_else(|| ClientError::ConfigError("cannot derive ssh host".to_string()))?,
    };

    Ok(SshConfig {
        username: settings.ssh.username.clone(),
        password: settings.ssh.password.clone().map(SecretString::from),
        host,
        port: settings.ssh.port,
        ssh_key: settings.ssh.key_path.clone(),
    })
}
