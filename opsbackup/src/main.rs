//! opsbackup - Entry Point
//!
//! Exports and imports the installation of an Ops Manager appliance and
//! reports how its Elastic Runtime jobs are laid out.

use std::collections::HashMap;
use std::env;
use std::process::ExitCode;

use opsbackup::app::options::{ssh_config, ClientOptions};
use opsbackup::app::run::{run_deployment, run_export, run_import};
use opsbackup::filesys::file::File;
use opsbackup::logs::{init_logging, LogLevel, LogOptions};
use opsbackup::opsman::OpsManClient;
use opsbackup::remote::executor::{CommandExecutor, SshExecutor};
use opsbackup::storage::layout::BackupLayout;
use opsbackup::storage::settings::Settings;
use opsbackup::utils::{parse_cli_args, version_info};

use anyhow::{bail, Context, Result};
use tracing::{error, info};

const USAGE: &str = "usage: opsbackup --config=<settings.json> \
(--export=<dir> [--with-deployments] | --import=<installation.zip> [--remove-bosh-manifest] | --deployment) \
[--url=<opsman url>] [--username=<user>] [--password=<pw>] [--passphrase=<pp>] [--s3] [--log-level=<level>]";

#[tokio::main]
async fn main() -> ExitCode {
    let cli_args = parse_cli_args(env::args().skip(1));

    // Print version and exit
    if cli_args.contains_key("version") {
        match serde_json::to_string_pretty(&version_info()) {
            Ok(version) => println!("{}", version),
            Err(e) => println!("{}", e),
        }
        return ExitCode::SUCCESS;
    }

    let settings = match load_settings(&cli_args).await {
        Ok(settings) => settings,
        Err(e) => {
            eprintln!("Unable to read settings: {e:#}");
            return ExitCode::FAILURE;
        }
    };

    // Initialize logging
    let log_options = LogOptions {
        log_level: settings.log_level,
        json_format: settings.json_logs,
        ..Default::default()
    };
    if let Err(e) = init_logging(log_options) {
        eprintln!("Failed to initialize logging: {e}");
    }

    match run(&cli_args, &settings).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{:#}", e);
            ExitCode::FAILURE
        }
    }
}

/// Settings file (if any) with command line overrides applied
async fn load_settings(cli_args: &HashMap<String, String>) -> Result<Settings> {
    let mut settings = match cli_args.get("config") {
        Some(path) => File::new(path)
            .read_json::<Settings>()
            .await
            .with_context(|| format!("reading {}", path))?,
        None => Settings::default(),
    };

    if let Some(url) = cli_args.get("url") {
        settings.opsman.url = url.clone();
    }
    if let Some(username) = cli_args.get("username") {
        settings.opsman.username = username.clone();
    }
    if let Some(password) = cli_args.get("password") {
        settings.opsman.password = password.clone();
    }
    if let Some(passphrase) = cli_args.get("passphrase") {
        settings.opsman.passphrase = passphrase.clone();
    }
    if cli_args.contains_key("s3") {
        settings.opsman.is_s3 = true;
    }
    if let Some(level) = cli_args.get("log-level") {
        settings.log_level = level
            .parse::<LogLevel>()
            .map_err(anyhow::Error::msg)
            .context("--log-level")?;
    }

    Ok(settings)
}

async fn run(cli_args: &HashMap<String, String>, settings: &Settings) -> Result<()> {
    let options = ClientOptions::try_from(settings).context("invalid Ops Manager settings")?;
    let client = OpsManClient::new(options)?;
    info!("Using Ops Manager at {}", client.base_url());

    if let Some(dir) = cli_args.get("export") {
        let executor = if cli_args.contains_key("with-deployments") {
            Some(SshExecutor::new(ssh_config(settings)?)?)
        } else {
            None
        };
        let executor = executor.as_ref().map(|e| e as &dyn CommandExecutor);
        return run_export(&client, &BackupLayout::new(dir), executor)
            .await
            .with_context(|| format!("export into {}", dir));
    }

    if let Some(archive) = cli_args.get("import") {
        let executor = if cli_args.contains_key("remove-bosh-manifest") {
            Some(SshExecutor::new(ssh_config(settings)?)?)
        } else {
            None
        };
        let executor = executor.as_ref().map(|e| e as &dyn CommandExecutor);
        return run_import(&client, &File::new(archive), executor)
            .await
            .with_context(|| format!("import of {}", archive));
    }

    if cli_args.contains_key("deployment") {
        let deployment = run_deployment(&client)
            .await
            .context("reading the deployment")?;
        println!("{}", serde_json::to_string_pretty(&deployment)?);
        return Ok(());
    }

    bail!(USAGE)
}
