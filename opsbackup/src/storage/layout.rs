//! Backup directory layout

use std::path::PathBuf;

use crate::filesys::file::File;

/// Files making up one appliance backup
#[derive(Debug, Clone)]
pub struct BackupLayout {
    /// Directory holding the backup
    pub base_dir: PathBuf,
}

impl BackupLayout {
    /// Create a new backup layout
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
        }
    }

    /// Installation settings JSON
    pub fn installation_settings(&self) -> File {
        File::new(self.base_dir.join("installation.json"))
    }

    /// Installation asset archive
    pub fn installation_assets(&self) -> File {
        File::new(self.base_dir.join("installation.zip"))
    }

    /// Tarball of the appliance's deployments directory
    pub fn deployments(&self) -> File {
        File::new(self.base_dir.join("deployments.tar.gz"))
    }
}
