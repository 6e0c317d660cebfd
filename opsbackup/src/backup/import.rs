//! Streaming import of an installation asset archive

use std::collections::BTreeMap;

use reqwest::StatusCode;
use secrecy::{ExposeSecret, SecretString};
use tokio::io::{AsyncRead, BufReader};
use tracing::{debug, info, warn};

use crate::authn::negotiator::Credentials;
use crate::backup::upload::{ConnAuth, UploadStrategy};
use crate::errors::ClientError;
use crate::http::client::{unexpected_status, HttpTransport};
use crate::remote::executor::CommandExecutor;

/// Multipart field the appliance reads the archive from
pub const INSTALLATION_FIELD: &str = "installation[file]";

/// Nominal name of the uploaded archive
pub const INSTALLATION_ARCHIVE: &str = "installation.zip";

/// Deployment state left behind by a previous install. It points at
/// deployments that no longer exist after a restore.
pub const BOSH_DEPLOYMENTS_FILE: &str =
    "/var/tempest/workspaces/default/deployments/bosh-deployments.yml";

const READ_BUFFER_BYTES: usize = 64 * 1024;

/// Shell command removing the stale deployments file if present
pub fn remove_deployments_command() -> String {
    format!(
        "if [ -f {file} ]; then sudo rm {file};fi",
        file = BOSH_DEPLOYMENTS_FILE
    )
}

/// Uploads archives through the configured upload strategy
pub struct StreamImporter<'a> {
    transport: &'a HttpTransport,
    credentials: &'a Credentials,
    passphrase: &'a SecretString,
    strategy: UploadStrategy,
}

impl<'a> StreamImporter<'a> {
    pub fn new(
        transport: &'a HttpTransport,
        credentials: &'a Credentials,
        passphrase: &'a SecretString,
        strategy: UploadStrategy,
    ) -> Self {
        Self {
            transport,
            credentials,
            passphrase,
            strategy,
        }
    }

    /// Upload `source` to `url` as `field_name`. The size is never known up
    /// front, the reader is consumed in buffered chunks.
    pub async fn import<R>(
        &self,
        url: &str,
        filename: &str,
        field_name: &str,
        source: R,
    ) -> Result<(), ClientError>
    where
        R: AsyncRead + Send + Sync + Unpin + 'static,
    {
        let reader = BufReader::with_capacity(READ_BUFFER_BYTES, source);
        let params = BTreeMap::from([
            (
                "password".to_string(),
                self.credentials.password.expose_secret().to_string(),
            ),
            (
                "passphrase".to_string(),
                self.passphrase.expose_secret().to_string(),
            ),
        ]);
        debug!(
            "Upload request, fieldname: {}, filename: {}, url: {}, strategy: {:?}",
            field_name, filename, url, self.strategy
        );

        let response = self
            .strategy
            .upload(
                self.transport,
                ConnAuth {
                    url,
                    credentials: self.credentials,
                },
                field_name,
                filename,
                None,
                reader,
                &params,
            )
            .await?;

        let status = response.status();
        if status != StatusCode::OK {
            return Err(unexpected_status(url, response, StatusCode::OK).await);
        }

        info!("Request for {} succeeded with status: {}", url, status);
        Ok(())
    }

    /// Import the installation archive. When `cleanup` is given, the stale
    /// deployments file is removed through it afterwards. A cleanup failure
    /// is reported as `ClientError::Cleanup`; the import itself has happened
    /// by then.
    pub async fn import_installation<R>(
        &self,
        url: &str,
        source: R,
        cleanup: Option<&dyn CommandExecutor>,
    ) -> Result<(), ClientError>
    where
        R: AsyncRead + Send + Sync + Unpin + 'static,
    {
        debug!("Uploading installation assets to {}", url);
        self.import(url, INSTALLATION_ARCHIVE, INSTALLATION_FIELD, source)
            .await?;

        if let Some(executor) = cleanup {
            debug!("Removing deployment files");
            remove_existing_deployment_files(executor).await?;
        }
        Ok(())
    }
}

/// Remove the stale deployments file on the appliance VM
pub async fn remove_existing_deployment_files(
    executor: &dyn CommandExecutor,
) -> Result<(), ClientError> {
    let mut output = tokio::io::sink();
    executor
        .execute(&mut output, &remove_deployments_command())
        .await
        .map_err(|e| {
            warn!("Installation imported but deployment files were not removed: {}", e);
            ClientError::Cleanup(e.to_string())
        })
}
