use crate::Result;
use bytes::Bytes;
use std::fmt::Debug;

/// FileRead is used to read a local file entirely into memory.
///
/// Uploads stream the returned bytes to the remote store.
#[async_trait::async_trait]
pub trait FileRead: Debug + Send + Sync + 'static {
    /// Read the file content entirely in `Vec<u8>`.
    async fn file_read(&self, path: &str) -> Result<Vec<u8>>;
}

/// FileWrite is used to write raw bytes to a local path.
///
/// Downloads assemble the blob in memory and hand the finished buffer to
/// this trait; the implementation decides how the bytes reach disk.
#[async_trait::async_trait]
pub trait FileWrite: Debug + Send + Sync + 'static {
    /// Write the content to the given path, replacing any existing file.
    async fn file_write(&self, path: &str, content: Bytes) -> Result<()>;
}
