//! Installation and product API calls

use opsman_models::{InstallationSettings, Product, Version};
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::debug;

use crate::errors::ClientError;
use crate::http::client::unexpected_status;
use crate::opsman::{OpsManClient, API_VERSION_PATH, PRODUCTS_PATH};

/// The only API version this client speaks
pub const SUPPORTED_API_VERSION: &str = "2.0";

const INSTALLATION_SETTINGS: &str = "/api/installation_settings";

/// Check for a supported API version
pub fn validate_api_version(version: &str) -> Result<(), ClientError> {
    if version != SUPPORTED_API_VERSION {
        return Err(ClientError::UnsupportedApiVersion(version.to_string()));
    }
    Ok(())
}

impl OpsManClient {
    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, ClientError> {
        let url = self.url(path);
        let response = self
            .transport
            .get(&url, self.credentials.basic(), None)
            .await?;

        if response.status() != StatusCode::OK {
            return Err(unexpected_status(&url, response, StatusCode::OK).await);
        }

        let body = response.bytes().await.map_err(|source| ClientError::Transport {
            url: url.clone(),
            source,
        })?;
        serde_json::from_slice(&body).map_err(|e| ClientError::Decode {
            url,
            message: e.to_string(),
        })
    }

    /// Ops Manager API version
    pub async fn api_version(&self) -> Result<String, ClientError> {
        let version: Version = self.get_json(API_VERSION_PATH).await?;
        Ok(version.version)
    }

    /// Installation settings decoded into the typed model
    pub async fn installation_settings(&self) -> Result<InstallationSettings, ClientError> {
        self.get_json(INSTALLATION_SETTINGS).await
    }

    /// All products of the installation
    pub async fn products(&self) -> Result<Vec<Product>, ClientError> {
        self.get_json(PRODUCTS_PATH).await
    }

    /// Installation settings as raw bytes, `None` when the appliance has no
    /// installation yet (404)
    pub async fn installation_settings_raw(&self) -> Result<Option<Vec<u8>>, ClientError> {
        let url = self.url(INSTALLATION_SETTINGS);
        let response = self
            .transport
            .get(&url, self.credentials.basic(), None)
            .await?;

        match response.status() {
            StatusCode::NOT_FOUND => {
                debug!("No installation at {}", url);
                return Ok(None);
            }
            StatusCode::OK => {}
            _ => return Err(unexpected_status(&url, response, StatusCode::OK).await),
        }

        let envelope: serde_json::Map<String, Value> =
            response.json().await.map_err(|e| ClientError::Decode {
                url: url.clone(),
                message: format!("error unmarshalling installation settings json response: {}", e),
            })?;

        let raw = match envelope.get("installation_settings") {
            Some(Value::String(settings)) => settings.clone().into_bytes(),
            Some(Value::Null) | None => Vec::new(),
            Some(settings) => serde_json::to_vec(settings)?,
        };
        Ok(Some(raw))
    }
}
