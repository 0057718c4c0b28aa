//! Tokio-based file I/O implementation for stowage.
//!
//! This crate provides `TokioFileIo`, an async file reader and writer that
//! implements the `FileRead` and `FileWrite` traits from `stowage_core`
//! using Tokio's file system operations.
//!
//! ## Example
//!
//! ```no_run
//! use stowage_core::Context;
//! use stowage_file_io_tokio::TokioFileIo;
//!
//! #[tokio::main]
//! async fn main() {
//!     let ctx = Context::new()
//!         .with_file_read(TokioFileIo)
//!         .with_file_write(TokioFileIo);
//!
//!     match ctx.file_read("/path/to/artifact.zip").await {
//!         Ok(content) => println!("Read {} bytes", content.len()),
//!         Err(e) => eprintln!("Failed to read file: {}", e),
//!     }
//! }
//! ```

use async_trait::async_trait;
use bytes::Bytes;
use stowage_core::{Error, FileRead, FileWrite, Result};

/// Tokio-based implementation of the `FileRead` and `FileWrite` traits.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioFileIo;

#[async_trait]
impl FileRead for TokioFileIo {
    async fn file_read(&self, path: &str) -> Result<Vec<u8>> {
        tokio::fs::read(path)
            .await
            .map_err(|e| Error::unexpected("failed to read file").with_source(e))
    }
}

#[async_trait]
impl FileWrite for TokioFileIo {
    async fn file_write(&self, path: &str, content: Bytes) -> Result<()> {
        tokio::fs::write(path, content)
            .await
            .map_err(|e| Error::unexpected("failed to write file").with_source(e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_write_then_read() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("artifact.bin");
        let path = path.to_str().unwrap();

        let fs = TokioFileIo;
        fs.file_write(path, Bytes::from_static(b"\x00\x01binary\xff"))
            .await
            .unwrap();

        let content = fs.file_read(path).await.unwrap();
        assert_eq!(content, b"\x00\x01binary\xff");
    }

    #[tokio::test]
    async fn test_read_missing_file() {
        let fs = TokioFileIo;
        assert!(fs.file_read("/definitely/not/a/file").await.is_err());
    }
}
