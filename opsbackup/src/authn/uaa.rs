//! UAA token acquisition (resource-owner password grant)

use opsman_models::TokenResponse;
use secrecy::SecretString;
use tracing::debug;
use url::{form_urlencoded, Url};

use crate::errors::ClientError;
use crate::http::client::{Auth, HttpTransport, FORM_URLENCODED};

/// OAuth client registered on every Ops Manager UAA
pub const CLIENT_ID: &str = "opsman";

/// Derive the UAA base URL from the URL of the resource being fetched.
/// The identity provider lives on the same host under `/uaa`, always https.
pub fn uaa_base_url(target: &str) -> Result<String, ClientError> {
    let url = Url::parse(target)?;
    let host = url
        .host_str()
        .ok_or_else(|| ClientError::InvalidUrl(format!("{} has no host", target)))?;

    Ok(match url.port() {
        Some(port) => format!("https://{}:{}/uaa", host, port),
        None => format!("https://{}/uaa", host),
    })
}

/// Request a bearer token for `username`/`password` from the UAA at `uaa_base`
pub async fn fetch_token(
    transport: &HttpTransport,
    uaa_base: &str,
    username: &str,
    password: &str,
) -> Result<String, ClientError> {
    let token_url = format!("{}/oauth/token", uaa_base.trim_end_matches('/'));
    debug!("Acquiring token from {}", token_url);

    let client_secret = SecretString::from(String::new());
    let form = form_urlencoded::Serializer::new(String::new())
        .append_pair("grant_type", "password")
        .append_pair("username", username)
        .append_pair("password", password)
        .finish();
    let response = transport
        .post(
            &token_url,
            FORM_URLENCODED,
            form,
            Auth::Basic {
                username: CLIENT_ID,
                password: &client_secret,
            },
        )
        .await?;

    if !response.status().is_success() {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        return Err(ClientError::Token(format!(
            "{} returned {}: {}",
            token_url, status, body
        )));
    }

    let token: TokenResponse = response
        .json()
        .await
        .map_err(|e| ClientError::Token(format!("malformed token response: {}", e)))?;

    if token.access_token.is_empty() {
        return Err(ClientError::Token("empty access token".to_string()));
    }

    Ok(token.access_token)
}
