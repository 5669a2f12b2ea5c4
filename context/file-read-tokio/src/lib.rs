//! Tokio-based file reading implementation for azblob.
//!
//! This crate provides `TokioFileRead`, an async file reader that implements
//! the `FileRead` trait from `azblob_core` using Tokio's file system operations.
//!
//! ## Example
//!
//! ```no_run
//! use azblob_core::Context;
//! use azblob_file_read_tokio::TokioFileRead;
//! use std::path::Path;
//!
//! #[tokio::main]
//! async fn main() {
//!     let ctx = Context::new().with_file_read(TokioFileRead);
//!
//!     match ctx.file_len(Path::new("/path/to/upload.pdf")).await {
//!         Ok(len) => println!("File is {len} bytes"),
//!         Err(e) => eprintln!("Failed to stat file: {e}"),
//!     }
//! }
//! ```

use std::io::SeekFrom;
use std::path::Path;

use async_trait::async_trait;
use azblob_core::{Error, ErrorKind, FileRead, Result};
use tokio::io::{AsyncReadExt, AsyncSeekExt};

/// Tokio-based implementation of the `FileRead` trait.
///
/// A missing file maps to `ErrorKind::FileNotFound`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioFileRead;

#[async_trait]
impl FileRead for TokioFileRead {
    async fn file_len(&self, path: &Path) -> Result<u64> {
        let meta = tokio::fs::metadata(path)
            .await
            .map_err(|e| with_path(e, "failed to stat file", path))?;
        if !meta.is_file() {
            return Err(Error::file_not_found(format!(
                "{} is not a regular file",
                path.display()
            )));
        }
        Ok(meta.len())
    }

    async fn file_read_range(&self, path: &Path, offset: u64, len: usize) -> Result<Vec<u8>> {
        let mut f = tokio::fs::File::open(path)
            .await
            .map_err(|e| with_path(e, "failed to open file", path))?;
        f.seek(SeekFrom::Start(offset))
            .await
            .map_err(|e| with_path(e, "failed to seek file", path))?;

        let mut buf = vec![0; len];
        f.read_exact(&mut buf)
            .await
            .map_err(|e| with_path(e, "failed to read file range", path))?;
        Ok(buf)
    }
}

fn with_path(err: std::io::Error, action: &str, path: &Path) -> Error {
    let kind = match err.kind() {
        std::io::ErrorKind::NotFound => ErrorKind::FileNotFound,
        _ => ErrorKind::Unexpected,
    };
    Error::new(kind, format!("{action} {}", path.display())).with_source(err)
}
