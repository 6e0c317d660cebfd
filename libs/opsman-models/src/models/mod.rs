//! API models

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Full installation settings document (`GET /api/installation_settings`)
///
/// Only the fields the client reads are typed. Everything else is kept in
/// `extra` so a decoded document re-serializes without losing data.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InstallationSettings {
    #[serde(default)]
    pub products: Vec<ProductInstance>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl InstallationSettings {
    /// Find a product instance by GUID
    pub fn product_by_guid(&self, guid: &str) -> Option<&ProductInstance> {
        self.products.iter().find(|p| p.guid == guid)
    }
}

/// A product instance inside the installation settings
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProductInstance {
    /// Product type, e.g. `cf` or `p-bosh`
    #[serde(default)]
    pub identifier: String,

    pub guid: String,

    #[serde(default)]
    pub installation_name: String,

    #[serde(default)]
    pub jobs: Vec<JobInstance>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A job (VM group) deployed as part of a product
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct JobInstance {
    #[serde(default)]
    pub identifier: String,

    #[serde(default)]
    pub guid: String,

    #[serde(default)]
    pub installation_name: String,

    /// VM / instance records, schema varies between appliance versions
    #[serde(default)]
    pub instances: Vec<Value>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl JobInstance {
    /// Names a job can be classified by, most authoritative first:
    /// `identifier`, then `installation_name`, then `guid`. Empty fields are
    /// skipped.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        [&self.identifier, &self.installation_name, &self.guid]
            .into_iter()
            .filter(|s| !s.is_empty())
            .map(String::as_str)
    }
}

/// Entry of `GET /api/installation_settings/products`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    #[serde(rename = "type")]
    pub product_type: String,

    pub guid: String,
}

/// Response of `GET /api/api_version`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Version {
    pub version: String,
}

/// UAA token endpoint response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,

    #[serde(default)]
    pub token_type: Option<String>,

    #[serde(default)]
    pub expires_in: Option<u64>,

    #[serde(default)]
    pub scope: Option<String>,
}
