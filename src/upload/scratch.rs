//! Scratch files for in-flight uploads
//!
//! A [`ScratchFile`] owns a local path for the lifetime of one pipeline run.
//! The file is removed by [`ScratchFile::cleanup`] or, failing that, when the
//! value is dropped (RAII pattern).
//!
//! # Example
//!
//! ```no_run
//! use reel_uploadr::upload::scratch::ScratchFile;
//!
//! # async fn example() -> std::io::Result<()> {
//! let dir = std::env::temp_dir();
//! let (scratch, _file) = ScratchFile::create(&dir, "reel-upload-", ".mp4").await?;
//! println!("Staging into {:?}", scratch.path());
//! scratch.cleanup().await?;
//! # Ok(())
//! # }
//! ```

use std::io;
use std::path::{Path, PathBuf};
use tokio::fs::{File, OpenOptions};
use tokio::io::{AsyncRead, AsyncWriteExt};

/// Exclusively owned local file, deleted when its owner is done with it
#[must_use]
#[derive(Debug)]
pub struct ScratchFile {
    path: Option<PathBuf>,
}

impl ScratchFile {
    /// Create a new, uniquely named file `<prefix><uuid><suffix>` in `dir`
    pub async fn create(dir: &Path, prefix: &str, suffix: &str) -> io::Result<(Self, File)> {
        let path = dir.join(format!("{}{}{}", prefix, uuid::Uuid::new_v4(), suffix));

        let file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .await?;

        Ok((Self { path: Some(path) }, file))
    }

    /// Take ownership of a path some other process is about to write
    ///
    /// The path need not exist yet.
    pub fn adopt(path: PathBuf) -> Self {
        Self { path: Some(path) }
    }

    pub fn path(&self) -> &Path {
        self.path.as_deref().unwrap_or_else(|| Path::new(""))
    }

    /// Open the file for reading
    pub async fn open(&self) -> io::Result<File> {
        File::open(self.path()).await
    }

    /// Remove the file now. A file that never got created is not an error.
    pub async fn cleanup(mut self) -> io::Result<()> {
        if let Some(path) = self.path.take() {
            match tokio::fs::remove_file(&path).await {
                Ok(()) => {}
                Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                Err(e) => return Err(e),
            }
            tracing::trace!(path = %path.display(), "Removed scratch file");
        }
        Ok(())
    }
}

impl Drop for ScratchFile {
    fn drop(&mut self) {
        if let Some(path) = self.path.take() {
            let _ = std::fs::remove_file(path);
        }
    }
}

/// Errors while filling a scratch file from a stream
#[derive(Debug, thiserror::Error)]
pub enum StageError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Body exceeds the limit of {0} bytes")]
    TooLarge(u64),
}

/// Copy `reader` into `file`, refusing to write more than `limit` bytes
///
/// The file is flushed and synced before returning the byte count.
pub async fn write_limited<R>(reader: R, file: &mut File, limit: u64) -> Result<u64, StageError>
where
    R: AsyncRead + Unpin,
{
    let mut limited = tokio::io::AsyncReadExt::take(reader, limit.saturating_add(1));
    let written = tokio::io::copy(&mut limited, file).await?;

    if written > limit {
        return Err(StageError::TooLarge(limit));
    }

    file.flush().await?;
    file.sync_all().await?;

    Ok(written)
}
