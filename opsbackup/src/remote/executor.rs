//! Remote command execution on the appliance VM

use std::path::PathBuf;
use std::process::Stdio;

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use tokio::io::{AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::process::Command;
use tracing::{debug, error};

use crate::errors::ClientError;

/// Runs one shell command on the appliance and streams its stdout
#[async_trait]
pub trait CommandExecutor: Send + Sync {
    async fn execute(
        &self,
        output: &mut (dyn AsyncWrite + Send + Unpin),
        command: &str,
    ) -> Result<(), ClientError>;
}

/// SSH connection settings
#[derive(Clone)]
pub struct SshConfig {
    pub username: String,
    pub password: Option<SecretString>,
    pub host: String,
    pub port: u16,
    pub ssh_key: Option<PathBuf>,
}

impl std::fmt::Debug for SshConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SshConfig")
            .field("username", &self.username)
            .field("host", &self.host)
            .field("port", &self.port)
            .field("ssh_key", &self.ssh_key)
            .finish_non_exhaustive()
    }
}

/// Executes commands through the system `ssh` client. Password logins go
/// through `sshpass`, which reads the password from `SSHPASS`.
#[derive(Debug, Clone)]
pub struct SshExecutor {
    config: SshConfig,
}

impl SshExecutor {
    pub fn new(config: SshConfig) -> Result<Self, ClientError> {
        if config.host.is_empty() {
            return Err(ClientError::ConfigError("ssh host is not set".to_string()));
        }
        if config.ssh_key.is_none() && config.password.is_none() {
            return Err(ClientError::ConfigError(
                "ssh needs either a key file or a password".to_string(),
            ));
        }
        Ok(Self { config })
    }

    /// Program and arguments used to run `command`
    pub fn command_line(&self, command: &str) -> (String, Vec<String>) {
        let mut args = Vec::new();
        let program = if self.config.ssh_key.is_none() && self.config.password.is_some() {
            args.extend(["-e".to_string(), "ssh".to_string()]);
            "sshpass".to_string()
        } else {
            "ssh".to_string()
        };

        args.extend([
            "-o".to_string(),
            "StrictHostKeyChecking=no".to_string(),
            "-o".to_string(),
            "UserKnownHostsFile=/dev/null".to_string(),
            "-p".to_string(),
            self.config.port.to_string(),
        ]);
        if let Some(key) = &self.config.ssh_key {
            args.extend(["-i".to_string(), key.display().to_string()]);
        }
        args.push(format!("{}@{}", self.config.username, self.config.host));
        args.push(command.to_string());

        (program, args)
    }
}

#[async_trait]
impl CommandExecutor for SshExecutor {
    async fn execute(
        &self,
        output: &mut (dyn AsyncWrite + Send + Unpin),
        command: &str,
    ) -> Result<(), ClientError> {
        let (program, args) = self.command_line(command);
        debug!("Running on {}: {}", self.config.host, command);

        let mut cmd = Command::new(&program);
        cmd.args(&args);
        if let Some(password) = &self.config.password {
            cmd.env("SSHPASS", password.expose_secret());
        }

        run_streaming(cmd, &program, command, output).await
    }
}

/// Run `cmd`, streaming its stdout into `output`. A non-zero exit is an
/// error carrying stderr.
async fn run_streaming(
    mut cmd: Command,
    program: &str,
    command: &str,
    output: &mut (dyn AsyncWrite + Send + Unpin),
) -> Result<(), ClientError> {
    let mut child = cmd
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
        .map_err(|e| ClientError::Remote(format!("failed to run {}: {}", program, e)))?;

    let (Some(mut stdout), Some(mut stderr)) = (child.stdout.take(), child.stderr.take())
    else {
        return Err(ClientError::Remote(format!("{} has no output pipes", program)));
    };

    // Both pipes are drained together; a full stderr pipe would stall stdout
    let mut errors = Vec::new();
    let (copied, drained) = tokio::join!(
        tokio::io::copy(&mut stdout, output),
        stderr.read_to_end(&mut errors)
    );
    copied?;
    drained?;
    output.flush().await?;

    let status = child.wait().await?;
    if !status.success() {
        let stderr = String::from_utf8_lossy(&errors);
        error!("Remote command failed ({}): {}", status, stderr.trim());
        return Err(ClientError::Remote(format!(
            "`{}` exited with {}: {}",
            command,
            status,
            stderr.trim()
        )));
    }

    Ok(())
}
