mod http;
mod local;

pub use http::HttpStream;
pub use local::LocalFileReader;

use async_trait::async_trait;

use crate::error::Result;

/// Sequential byte source read in bounded chunks.
#[async_trait]
pub trait ReadChunk: Send {
    /// Fill the front of `buf` with the next bytes of the stream.
    ///
    /// Returns the number of bytes written into `buf`; `0` means the stream is
    /// exhausted.
    async fn read_chunk(&mut self, buf: &mut [u8]) -> Result<usize>;
}

/// Trait for random access reading from a data source
#[async_trait]
pub trait ReadAt: Send + Sync {
    /// Fill `buf` entirely with the bytes starting at `offset`.
    async fn read_exact_at(&self, offset: u64, buf: &mut [u8]) -> std::io::Result<()>;

    /// Get the total size of the data source
    fn size(&self) -> u64;
}
