//! Append-only failure log shared by the export and import drivers.
//!
//! The file is created on the first recorded failure, so a clean run leaves
//! nothing behind.

use std::path::PathBuf;

use tokio::fs::{File, OpenOptions};
use tokio::io::AsyncWriteExt;

use crate::error::Result;

/// Lazily created failure log.
pub struct ErrorLog {
    path: PathBuf,
    file: Option<File>,
    entries: u64,
}

impl ErrorLog {
    /// Create a log handle without touching the filesystem.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            file: None,
            entries: 0,
        }
    }

    /// Create a log handle and remove any log left by a previous run.
    pub async fn fresh(path: impl Into<PathBuf>) -> Result<Self> {
        let log = Self::new(path);
        match tokio::fs::remove_file(&log.path).await {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }
        Ok(log)
    }

    /// Append one entry followed by a blank line.
    pub async fn record(&mut self, entry: &str) -> Result<()> {
        if self.file.is_none() {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(&self.path)
                .await?;
            self.file = Some(file);
        }
        if let Some(file) = self.file.as_mut() {
            file.write_all(entry.as_bytes()).await?;
            file.write_all(b"\n\n").await?;
            file.flush().await?;
        }
        self.entries += 1;
        Ok(())
    }

    /// Log path, if anything was recorded.
    pub fn written_path(&self) -> Option<PathBuf> {
        (self.entries > 0).then(|| self.path.clone())
    }
}
