//! Backup and restore drivers

use tokio::io::AsyncWriteExt;
use tracing::{error, info, warn};

use crate::errors::ClientError;
use crate::filesys::file::File;
use crate::http::installation::validate_api_version;
use crate::models::deployment::Deployment;
use crate::opsman::OpsManClient;
use crate::remote::executor::CommandExecutor;
use crate::storage::layout::BackupLayout;

/// Export the installation into `layout`. With an executor the appliance's
/// deployments directory is archived as well. Files of a failed export are
/// removed so a partial backup never looks complete.
pub async fn run_export(
    client: &OpsManClient,
    layout: &BackupLayout,
    executor: Option<&dyn CommandExecutor>,
) -> Result<(), ClientError> {
    info!("Exporting installation from {}", client.base_url());

    let settings_file = layout.installation_settings();
    let assets_file = layout.installation_assets();

    let result = async {
        let mut settings_sink = settings_file.create().await?;
        let mut assets_sink = assets_file.create().await?;
        client
            .save_installation(&mut settings_sink, &mut assets_sink)
            .await?;
        settings_sink.shutdown().await?;
        assets_sink.shutdown().await?;
        Ok::<_, ClientError>(())
    }
    .await;

    if let Err(e) = result {
        error!("Export failed: {}", e);
        discard(&[&settings_file, &assets_file]).await;
        return Err(e);
    }

    if let Some(executor) = executor {
        let deployments_file = layout.deployments();
        let result = async {
            let mut sink = deployments_file.create().await?;
            client.save_deployments(executor, &mut sink).await?;
            sink.shutdown().await?;
            Ok::<_, ClientError>(())
        }
        .await;

        if let Err(e) = result {
            error!("Saving deployments failed: {}", e);
            discard(&[&deployments_file]).await;
            return Err(e);
        }
    }

    info!("Backup written to {}", layout.base_dir.display());
    Ok(())
}

async fn discard(files: &[&File]) {
    for file in files {
        if let Err(e) = file.delete().await {
            warn!("Could not remove partial file {}: {}", file.path().display(), e);
        }
    }
}

/// Import the installation archive `archive`
pub async fn run_import(
    client: &OpsManClient,
    archive: &File,
    cleanup: Option<&dyn CommandExecutor>,
) -> Result<(), ClientError> {
    let reader = archive.open().await?;
    info!(
        "Importing {} ({} bytes) into {}",
        archive.path().display(),
        archive.size().await?,
        client.base_url()
    );

    match client.import_installation(reader, cleanup).await {
        Ok(()) => {
            info!("Installation imported");
            Ok(())
        }
        Err(e) if e.is_cleanup() => {
            warn!("Installation imported but not fully cleaned up: {}", e);
            Err(e)
        }
        Err(e) => {
            error!("Installation not imported: {}", e);
            Err(e)
        }
    }
}

/// Classify the Elastic Runtime jobs of the installation
pub async fn run_deployment(client: &OpsManClient) -> Result<Deployment, ClientError> {
    let version = client.api_version().await?;
    validate_api_version(&version)?;

    let installation = client.installation_settings().await?;
    let products = client.products().await?;
    let deployment = client.cf_deployment(&installation, &products)?;

    info!(
        "Deployment is using CF release {} ({} classified jobs)",
        deployment.release,
        deployment.job_count()
    );
    Ok(deployment)
}
