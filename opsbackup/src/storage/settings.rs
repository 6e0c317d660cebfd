//! Settings file management

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::logs::LogLevel;

/// Client settings, read from a JSON file
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Settings {
    /// Log level
    #[serde(default)]
    pub log_level: LogLevel,

    /// Emit logs as JSON
    #[serde(default)]
    pub json_logs: bool,

    /// Appliance connection
    #[serde(default)]
    pub opsman: OpsManSettings,

    /// HTTP transport tuning
    #[serde(default)]
    pub transport: TransportSettings,

    /// SSH access to the appliance VM
    #[serde(default)]
    pub ssh: SshSettings,
}

/// Ops Manager connection settings
#[derive(Clone, Serialize, Deserialize)]
pub struct OpsManSettings {
    /// Base URL, e.g. `https://opsman.example.com`
    #[serde(default)]
    pub url: String,

    #[serde(default = "default_username")]
    pub username: String,

    #[serde(default)]
    pub password: String,

    /// Decryption passphrase sent along with imports
    #[serde(default)]
    pub passphrase: String,

    /// The appliance keeps its assets in object storage
    #[serde(default)]
    pub is_s3: bool,

    /// Overrides the UAA location derived from `url`
    #[serde(default)]
    pub uaa_url: Option<String>,

    /// Largest unknown-size archive buffered for object-storage uploads
    #[serde(default)]
    pub max_upload_buffer_bytes: Option<u64>,
}

fn default_username() -> String {
    "admin".to_string()
}

impl Default for OpsManSettings {
    fn default() -> Self {
        Self {
            url: String::new(),
            username: default_username(),
            password: String::new(),
            passphrase: String::new(),
            is_s3: false,
            uaa_url: None,
            max_upload_buffer_bytes: None,
        }
    }
}

impl std::fmt::Debug for OpsManSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpsManSettings")
            .field("url", &self.url)
            .field("username", &self.username)
            .field("is_s3", &self.is_s3)
            .field("uaa_url", &self.uaa_url)
            .finish_non_exhaustive()
    }
}

/// HTTP transport settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransportSettings {
    #[serde(default = "default_true")]
    pub disable_tls_verification: bool,

    #[serde(default)]
    pub no_follow_redirect: bool,

    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,
}

fn default_true() -> bool {
    true
}

fn default_request_timeout() -> u64 {
    3600
}

fn default_connect_timeout() -> u64 {
    30
}

impl Default for TransportSettings {
    fn default() -> Self {
        Self {
            disable_tls_verification: true,
            no_follow_redirect: false,
            request_timeout_secs: default_request_timeout(),
            connect_timeout_secs: default_connect_timeout(),
        }
    }
}

/// SSH settings for commands the HTTP API does not offer
#[derive(Clone, Serialize, Deserialize)]
pub struct SshSettings {
    /// Defaults to the host of the Ops Manager URL
    #[serde(default)]
    pub host: Option<String>,

    #[serde(default = "default_ssh_port")]
    pub port: u16,

    #[serde(default = "default_ssh_username")]
    pub username: String,

    #[serde(default)]
    pub password: Option<String>,

    #[serde(default)]
    pub key_path: Option<PathBuf>,
}

fn default_ssh_port() -> u16 {
    22
}

fn default_ssh_username() -> String {
    "ubuntu".to_string()
}

impl Default for SshSettings {
    fn default() -> Self {
        Self {
            host: None,
            port: default_ssh_port(),
            username: default_ssh_username(),
            password: None,
            key_path: None,
        }
    }
}

impl std::fmt::Debug for SshSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SshSettings")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("key_path", &self.key_path)
            .finish_non_exhaustive()
    }
}
