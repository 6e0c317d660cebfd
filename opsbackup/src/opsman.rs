//! Ops Manager client

use opsman_models::{InstallationSettings, Product};
use secrecy::SecretString;
use tokio::io::{AsyncRead, AsyncWrite};
use tracing::{debug, info};

use crate::app::options::ClientOptions;
use crate::authn::negotiator::{AuthNegotiator, Credentials};
use crate::backup::export::{StreamExporter, BASE_PLACEHOLDER};
use crate::backup::import::StreamImporter;
use crate::backup::upload::UploadStrategy;
use crate::errors::ClientError;
use crate::http::client::HttpTransport;
use crate::models::deployment::Deployment;
use crate::remote::executor::CommandExecutor;

pub const INSTALLATION_SETTINGS_PATH: &str = "{base}/api/installation_settings";
pub const INSTALLATION_ASSETS_PATH: &str = "{base}/api/installation_asset_collection";
pub const PRODUCTS_PATH: &str = "/api/installation_settings/products";
pub const API_VERSION_PATH: &str = "/api/api_version";

/// Product type of Elastic Runtime
pub const CF_PRODUCT_TYPE: &str = "cf";

/// Command archiving the deployments directory on the appliance VM
pub const SAVE_DEPLOYMENTS_COMMAND: &str =
    "cd /var/tempest/workspaces/default && tar cz deployments";

/// Client for one Ops Manager appliance
pub struct OpsManClient {
    pub(crate) base_url: String,
    pub(crate) credentials: Credentials,
    passphrase: SecretString,
    uaa_url: Option<String>,
    pub(crate) transport: HttpTransport,
    upload_strategy: UploadStrategy,
}

impl OpsManClient {
    /// Create a new client. The upload encoding is fixed here.
    pub fn new(options: ClientOptions) -> Result<Self, ClientError> {
        let transport = HttpTransport::new(&options.transport)?;
        let upload_strategy = options.upload_strategy();
        debug!(
            "Ops Manager client for {} (upload: {:?})",
            options.base_url, upload_strategy
        );

        Ok(Self {
            base_url: options.base_url,
            credentials: options.credentials,
            passphrase: options.passphrase,
            uaa_url: options.uaa_url,
            transport,
            upload_strategy,
        })
    }

    /// Get the base URL
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn upload_strategy(&self) -> UploadStrategy {
        self.upload_strategy
    }

    pub(crate) fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn exporter(&self) -> StreamExporter<'_> {
        let negotiator =
            AuthNegotiator::new(&self.transport, &self.credentials, self.uaa_url.as_deref());
        StreamExporter::new(negotiator, &self.base_url)
    }

    fn importer(&self) -> StreamImporter<'_> {
        StreamImporter::new(
            &self.transport,
            &self.credentials,
            &self.passphrase,
            self.upload_strategy,
        )
    }

    /// Elastic Runtime deployment of the installation
    pub fn cf_deployment(
        &self,
        installation: &InstallationSettings,
        products: &[Product],
    ) -> Result<Deployment, ClientError> {
        let release = product_guid(products, CF_PRODUCT_TYPE)
            .ok_or_else(|| ClientError::ClassificationMiss(CF_PRODUCT_TYPE.to_string()))?;

        Ok(Deployment::new(installation, release))
    }

    /// Export one resource into `sink`
    pub async fn export_file<W>(
        &self,
        url_format: &str,
        filename: &str,
        sink: &mut W,
    ) -> Result<u64, ClientError>
    where
        W: AsyncWrite + Unpin + ?Sized,
    {
        debug!("Exporting file url: {}, filename: {}", url_format, filename);
        self.exporter().export(url_format, sink).await
    }

    /// Export the installation settings and the asset archive
    pub async fn save_installation<S, A>(
        &self,
        settings_sink: &mut S,
        assets_sink: &mut A,
    ) -> Result<(), ClientError>
    where
        S: AsyncWrite + Unpin + ?Sized,
        A: AsyncWrite + Unpin + ?Sized,
    {
        self.export_file(INSTALLATION_SETTINGS_PATH, "installation.json", settings_sink)
            .await?;
        self.export_file(INSTALLATION_ASSETS_PATH, "installation.zip", assets_sink)
            .await?;
        info!("Installation saved from {}", self.base_url);
        Ok(())
    }

    /// Installation settings exported into memory
    pub async fn installation_settings_buffered(&self) -> Result<Vec<u8>, ClientError> {
        let mut buffer = Vec::new();
        self.exporter()
            .export(INSTALLATION_SETTINGS_PATH, &mut buffer)
            .await?;
        Ok(buffer)
    }

    /// Stream a tarball of the appliance's deployments directory into `sink`
    pub async fn save_deployments(
        &self,
        executor: &dyn CommandExecutor,
        sink: &mut (dyn AsyncWrite + Send + Unpin),
    ) -> Result<(), ClientError> {
        executor.execute(sink, SAVE_DEPLOYMENTS_COMMAND).await
    }

    /// Upload an installation archive, then remove the stale deployments
    /// file through `cleanup` if one is given; see
    /// [`StreamImporter::import_installation`].
    pub async fn import_installation<R>(
        &self,
        backup_reader: R,
        cleanup: Option<&dyn CommandExecutor>,
    ) -> Result<(), ClientError>
    where
        R: AsyncRead + Send + Sync + Unpin + 'static,
    {
        let url = INSTALLATION_ASSETS_PATH.replace(BASE_PLACEHOLDER, &self.base_url);
        self.importer()
            .import_installation(&url, backup_reader, cleanup)
            .await
    }
}

/// GUID of the first product of `product_type`
pub fn product_guid<'a>(products: &'a [Product], product_type: &str) -> Option<&'a str> {
    products
        .iter()
        .find(|p| p.product_type == product_type)
        .map(|p| p.guid.as_str())
}
