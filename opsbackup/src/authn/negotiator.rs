//! Token-first, basic-auth-second request negotiation

use reqwest::Response;
use secrecy::{ExposeSecret, SecretString};
use tracing::{debug, info};

use crate::authn::uaa::{fetch_token, uaa_base_url};
use crate::errors::ClientError;
use crate::http::client::{Auth, HttpTransport, OCTET_STREAM};

/// Appliance credentials
#[derive(Clone)]
pub struct Credentials {
    pub username: String,
    pub password: SecretString,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: SecretString::from(password.into()),
        }
    }

    /// Basic-auth header for these credentials
    pub(crate) fn basic(&self) -> Auth<'_> {
        Auth::Basic {
            username: &self.username,
            password: &self.password,
        }
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .finish_non_exhaustive()
    }
}

/// Outcome of one authentication flow
#[derive(Debug)]
pub enum Attempt {
    Succeeded(Response),
    Failed(ClientError),
}

impl From<Result<Response, ClientError>> for Attempt {
    fn from(result: Result<Response, ClientError>) -> Self {
        match result {
            Ok(response) => Attempt::Succeeded(response),
            Err(err) => Attempt::Failed(err),
        }
    }
}

/// Fetches a resource trying the UAA token flow first and plain basic auth
/// second. Borrowed for the duration of a single export.
pub struct AuthNegotiator<'a> {
    transport: &'a HttpTransport,
    credentials: &'a Credentials,
    uaa_url: Option<&'a str>,
}

impl<'a> AuthNegotiator<'a> {
    pub fn new(
        transport: &'a HttpTransport,
        credentials: &'a Credentials,
        uaa_url: Option<&'a str>,
    ) -> Self {
        Self {
            transport,
            credentials,
            uaa_url,
        }
    }

    /// GET `url`. The response is returned whatever its status; a failure
    /// of the token flow is only logged, and when both flows fail the
    /// basic-auth error is reported.
    pub async fn fetch(&self, url: &str) -> Result<Response, ClientError> {
        debug!("Attempting to auth against {}", url);

        match self.token_flow(url).await {
            Attempt::Succeeded(response) => return Ok(response),
            Attempt::Failed(err) => {
                info!("Falling back to basic auth for legacy system: {}", err);
            }
        }

        match self.basic_flow(url).await {
            Attempt::Succeeded(response) => Ok(response),
            Attempt::Failed(err) => Err(ClientError::Auth {
                url: url.to_string(),
                source: Box::new(err),
            }),
        }
    }

    async fn token_flow(&self, url: &str) -> Attempt {
        let uaa = match self.uaa_url {
            Some(uaa) => uaa.to_string(),
            None => match uaa_base_url(url) {
                Ok(uaa) => uaa,
                Err(err) => return Attempt::Failed(err),
            },
        };

        let token = match fetch_token(
            self.transport,
            &uaa,
            &self.credentials.username,
            self.credentials.password.expose_secret(),
        )
        .await
        {
            Ok(token) => token,
            Err(err) => return Attempt::Failed(err),
        };

        debug!("Token acquired from {}", uaa);
        self.transport
            .get(url, Auth::Bearer(&token), Some(OCTET_STREAM))
            .await
            .into()
    }

    async fn basic_flow(&self, url: &str) -> Attempt {
        let attempt: Attempt = self
            .transport
            .get(url, self.credentials.basic(), Some(OCTET_STREAM))
            .await
            .into();
        debug!("Called basic auth on legacy ops manager {}", url);
        attempt
    }
}
