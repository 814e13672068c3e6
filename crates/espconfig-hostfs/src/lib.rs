//! # espconfig-hostfs
//!
//! Host implementation of the espconfig filesystem collaborator.
//!
//! Flash paths such as `/config/myapp.cfg` are mapped beneath a root
//! directory, so a config partition image can be inspected and edited on a
//! development machine:
//!
//! ```ignore
//! use espconfig_core::ConfigStore;
//! use espconfig_hostfs::HostFs;
//!
//! let mut store = ConfigStore::new("myapp", HostFs::new("./flash"));
//! store.setup();
//! ```

use std::fs::{self, File};
use std::io::BufWriter;
use std::path::{Component, Path, PathBuf};

use espconfig_core::{Filesystem, FsError};
use tracing::{debug, info};

/// Filesystem rooted at a host directory.
#[derive(Debug, Clone)]
pub struct HostFs {
    root: PathBuf,
    format_on_fail: bool,
}

impl HostFs {
    /// Root at `root`. Mounting fails if the directory does not exist.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            format_on_fail: false,
        }
    }

    /// Root at `root`, creating the directory on mount if needed.
    pub fn with_format(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            format_on_fail: true,
        }
    }

    /// Map a flash path onto the host root.
    ///
    /// Only normal components are kept, so `..` cannot escape the root.
    pub fn resolve(&self, path: &str) -> PathBuf {
        let mut resolved = self.root.clone();
        for component in Path::new(path).components() {
            if let Component::Normal(part) = component {
                resolved.push(part);
            }
        }
        resolved
    }
}

impl Filesystem for HostFs {
    type Reader = File;
    type Writer = BufWriter<File>;

    fn mount(&mut self) -> Result<(), FsError> {
        if self.root.is_dir() {
            info!(root = %self.root.display(), "Mounted host filesystem");
            return Ok(());
        }

        if !self.format_on_fail {
            return Err(FsError::MountFailed(format!(
                "{} is not a directory",
                self.root.display()
            )));
        }

        fs::create_dir_all(&self.root).map_err(|e| {
            FsError::MountFailed(format!("cannot create {}: {}", self.root.display(), e))
        })?;
        info!(root = %self.root.display(), "Formatted and mounted host filesystem");
        Ok(())
    }

    fn exists(&self, path: &str) -> bool {
        self.resolve(path).is_file()
    }

    fn open_read(&self, path: &str) -> Result<Self::Reader, FsError> {
        let host_path = self.resolve(path);
        File::open(&host_path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => FsError::NotFound(path.to_string()),
            _ => FsError::Io(e),
        })
    }

    fn open_write(&self, path: &str) -> Result<Self::Writer, FsError> {
        let host_path = self.resolve(path);
        // Same as LittleFS open(path, "w", create = true) on ESP32.
        if let Some(parent) = host_path.parent() {
            if !parent.is_dir() {
                debug!(dir = %parent.display(), "Creating config directory");
                fs::create_dir_all(parent)?;
            }
        }

        let file = File::create(&host_path)?;
        Ok(BufWriter::new(file))
    }

    fn close(&self, writer: Self::Writer) -> Result<(), FsError> {
        let file = writer.into_inner().map_err(|e| FsError::Io(e.into_error()))?;
        file.sync_all()?;
        Ok(())
    }
}
