//! HTTP transport for the Ops Manager API

use std::time::Duration;

use reqwest::{header, multipart, redirect, Body, Client, RequestBuilder, Response, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use tracing::{debug, error};

use crate::errors::ClientError;

/// Content type sent on export requests
pub const OCTET_STREAM: &str = "application/octet-stream";

pub const FORM_URLENCODED: &str = "application/x-www-form-urlencoded";

/// Transport configuration
#[derive(Debug, Clone)]
pub struct TransportConfig {
    /// Return 3xx responses as-is instead of following them
    pub no_follow_redirect: bool,

    /// Accept any TLS certificate presented by the appliance
    pub disable_tls_verification: bool,

    /// Timeout for a whole request, body included
    pub request_timeout: Duration,

    /// Timeout for establishing the TCP/TLS connection
    pub connect_timeout: Duration,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            no_follow_redirect: false,
            // appliances ship with self-signed certificates
            disable_tls_verification: true,
            request_timeout: Duration::from_secs(3600),
            connect_timeout: Duration::from_secs(30),
        }
    }
}

/// Authentication applied to a single request
#[derive(Clone, Copy)]
pub enum Auth<'a> {
    None,
    Basic {
        username: &'a str,
        password: &'a SecretString,
    },
    Bearer(&'a str),
}

impl std::fmt::Debug for Auth<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Auth::None => write!(f, "None"),
            Auth::Basic { username, .. } => write!(f, "Basic({})", username),
            Auth::Bearer(_) => write!(f, "Bearer(***)"),
        }
    }
}

fn apply_auth(request: RequestBuilder, auth: Auth<'_>) -> RequestBuilder {
    match auth {
        Auth::None => request,
        Auth::Basic { username, password } => {
            request.basic_auth(username, Some(password.expose_secret()))
        }
        Auth::Bearer(token) => request.header(header::AUTHORIZATION, format!("Bearer {}", token)),
    }
}

/// HTTP transport shared by every call of one client
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
}

impl HttpTransport {
    /// Create a new transport
    pub fn new(config: &TransportConfig) -> Result<Self, ClientError> {
        let policy = if config.no_follow_redirect {
            redirect::Policy::none()
        } else {
            redirect::Policy::default()
        };

        let client = Client::builder()
            .timeout(config.request_timeout)
            .connect_timeout(config.connect_timeout)
            .danger_accept_invalid_certs(config.disable_tls_verification)
            .redirect(policy)
            .build()
            .map_err(|e| ClientError::ConfigError(format!("failed to build http client: {}", e)))?;

        Ok(Self { client })
    }

    /// Make a GET request. The response is returned whatever its status.
    pub async fn get(
        &self,
        url: &str,
        auth: Auth<'_>,
        content_type: Option<&str>,
    ) -> Result<Response, ClientError> {
        debug!("GET {} auth={:?}", url, auth);

        let mut request = apply_auth(self.client.get(url), auth);
        if let Some(content_type) = content_type {
            request = request.header(header::CONTENT_TYPE, content_type);
        }

        self.send(url, request).await
    }

    /// Make a POST request with a raw body
    pub async fn post(
        &self,
        url: &str,
        content_type: &str,
        body: impl Into<Body>,
        auth: Auth<'_>,
    ) -> Result<Response, ClientError> {
        debug!("POST {} ({})", url, content_type);

        let request = apply_auth(self.client.post(url), auth)
            .header(header::CONTENT_TYPE, content_type)
            .body(body);

        self.send(url, request).await
    }

    /// Make a multipart POST request
    pub async fn post_multipart(
        &self,
        url: &str,
        form: multipart::Form,
        auth: Auth<'_>,
    ) -> Result<Response, ClientError> {
        debug!("POST {} (multipart)", url);

        apply_auth(self.client.post(url), auth)
            .multipart(form)
            .send()
            .await
            .map_err(|source| {
                error!("Upload to {} failed: {}", url, source);
                ClientError::Upload {
                    url: url.to_string(),
                    source,
                }
            })
    }

    async fn send(&self, url: &str, request: RequestBuilder) -> Result<Response, ClientError> {
        request.send().await.map_err(|source| ClientError::Transport {
            url: url.to_string(),
            source,
        })
    }
}

/// Consume a response that did not carry the expected status and turn it
/// into an error embedding the body
pub async fn unexpected_status(url: &str, response: Response, expected: StatusCode) -> ClientError {
    let actual = response.status().as_u16();
    let body = response
        .text()
        .await
        .unwrap_or_else(|_| "COULDN'T READ RESPONSE BODY".to_string());

    error!("Request for {} failed: {} - {}", url, actual, body);
    ClientError::UnexpectedStatus {
        url: url.to_string(),
        expected: expected.as_u16(),
        actual,
        body,
    }
}
