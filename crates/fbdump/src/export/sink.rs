//! Line-oriented dump output.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::fs::File;
use tokio::io::{AsyncWriteExt, BufWriter};

use crate::error::Result;

/// Destination for dump lines. Lines are written without their terminator.
#[async_trait]
pub trait DumpSink: Send {
    /// Append one line.
    async fn write_line(&mut self, line: &str) -> Result<()>;

    /// Flush everything written so far.
    async fn finish(&mut self) -> Result<()>;
}

/// Buffered UTF-8 dump file, written without a byte order mark.
pub struct FileSink {
    path: PathBuf,
    writer: BufWriter<File>,
}

impl FileSink {
    /// Create (or truncate) the dump file.
    pub async fn create(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = File::create(&path).await?;
        Ok(Self {
            path,
            writer: BufWriter::with_capacity(256 * 1024, file),
        })
    }

    /// Path of the dump file.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl DumpSink for FileSink {
    async fn write_line(&mut self, line: &str) -> Result<()> {
        self.writer.write_all(line.as_bytes()).await?;
        self.writer.write_all(b"\n").await?;
        Ok(())
    }

    async fn finish(&mut self) -> Result<()> {
        self.writer.flush().await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_file_sink_writes_lines_without_bom() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.sql");

        let mut sink = FileSink::create(&path).await.unwrap();
        sink.write_line("SET SQL DIALECT 3;").await.unwrap();
        sink.write_line("").await.unwrap();
        sink.write_line("INSERT INTO T (A) VALUES ('ação');").await.unwrap();
        sink.finish().await.unwrap();
        assert_eq!(sink.path(), path.as_path());

        let bytes = std::fs::read(&path).unwrap();
        assert_ne!(&bytes[..3], &[0xEF, 0xBB, 0xBF]);
        assert_eq!(
            String::from_utf8(bytes).unwrap(),
            "SET SQL DIALECT 3;\n\nINSERT INTO T (A) VALUES ('ação');\n"
        );
    }
}
