//! File operations

use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use tokio::fs;
use tokio::io::{AsyncReadExt, BufWriter};

use crate::errors::ClientError;

/// A file wrapper with path
#[derive(Debug, Clone)]
pub struct File {
    path: PathBuf,
}

impl File {
    /// Create a new file reference
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Get the file path
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Check if the file exists
    pub async fn exists(&self) -> bool {
        fs::metadata(&self.path).await.is_ok()
    }

    /// Read file contents as string
    pub async fn read_string(&self) -> Result<String, ClientError> {
        let mut file = fs::File::open(&self.path).await?;
        let mut contents = String::new();
        file.read_to_string(&mut contents).await?;
        Ok(contents)
    }

    /// Read file as JSON
    pub async fn read_json<T: DeserializeOwned>(&self) -> Result<T, ClientError> {
        let contents = self.read_string().await?;
        let value = serde_json::from_str(&contents)?;
        Ok(value)
    }

    /// Open the file for streaming reads
    pub async fn open(&self) -> Result<fs::File, ClientError> {
        Ok(fs::File::open(&self.path).await?)
    }

    /// Create (or truncate) the file for buffered streaming writes
    pub async fn create(&self) -> Result<BufWriter<fs::File>, ClientError> {
        // Ensure parent directory exists
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).await?;
        }

        let file = fs::File::create(&self.path).await?;
        Ok(BufWriter::new(file))
    }

    /// Delete the file
    pub async fn delete(&self) -> Result<(), ClientError> {
        if self.exists().await {
            fs::remove_file(&self.path).await?;
        }
        Ok(())
    }

    /// Size of the file in bytes
    pub async fn size(&self) -> Result<u64, ClientError> {
        Ok(fs::metadata(&self.path).await?.len())
    }
}
