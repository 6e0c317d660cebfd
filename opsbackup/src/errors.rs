//! Error types for the Ops Manager client

use thiserror::Error;

/// Main error type for the Ops Manager client
#[derive(Error, Debug)]
pub enum ClientError {
    /// Network, DNS or TLS failure talking to the appliance
    #[error("request to {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    /// Token flow and basic-auth flow both failed. Only the basic-auth
    /// failure is carried; the token failure is logged and dropped.
    #[error("authentication against {url} failed: {source}")]
    Auth {
        url: String,
        #[source]
        source: Box<ClientError>,
    },

    #[error("request for {url}: expected status {expected}, was {actual}. Response Body: {body}")]
    UnexpectedStatus {
        url: String,
        expected: u16,
        actual: u16,
        body: String,
    },

    #[error("error decoding response from {url}: {message}")]
    Decode { url: String, message: String },

    /// The product type could not be resolved from the product list
    #[error("{0} release not found")]
    ClassificationMiss(String),

    #[error("error uploading installation to {url}: {source}")]
    Upload {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("upload of unknown size exceeds the {limit} byte buffer limit")]
    UploadTooLarge { limit: u64 },

    /// Import succeeded but the follow-up cleanup did not
    #[error("installation imported but cleanup failed: {0}")]
    Cleanup(String),

    #[error("remote command error: {0}")]
    Remote(String),

    #[error("error in token request: {0}")]
    Token(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("invalid url: {0}")]
    InvalidUrl(String),

    #[error("This version of Ops Manager (using api version '{0}') is not supported")]
    UnsupportedApiVersion(String),
}

impl ClientError {
    /// Status code of an `UnexpectedStatus` error
    pub fn status(&self) -> Option<u16> {
        match self {
            ClientError::UnexpectedStatus { actual, .. } => Some(*actual),
            _ => None,
        }
    }

    /// True when the upload went through and only the cleanup step failed
    pub fn is_cleanup(&self) -> bool {
        matches!(self, ClientError::Cleanup(_))
    }
}

impl From<url::ParseError> for ClientError {
    fn from(err: url::ParseError) -> Self {
        ClientError::InvalidUrl(err.to_string())
    }
}
