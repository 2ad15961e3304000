//! Random-access byte sources.
//!
//! Everything that needs bytes (signature sniffing, the ZIP reader, nested
//! archives) goes through [`ReadAt`], so a local file, a remote file served
//! with HTTP Range requests and an archive member look the same.

mod http;
mod local;
mod memory;

pub use http::HttpRangeReader;
pub use local::LocalFileReader;
pub use memory::{MemoryReader, WindowReader};

use anyhow::Result;
use async_trait::async_trait;

/// Trait for random access reading from a data source
#[async_trait]
pub trait ReadAt: Send + Sync {
    /// Read data at the specified offset into the buffer.
    ///
    /// Returns the number of bytes read, which is smaller than `buf.len()`
    /// only when the end of the source is reached.
    async fn read_at(&self, offset: u64, buf: &mut [u8]) -> Result<usize>;

    /// Get the total size of the data source
    fn size(&self) -> u64;
}
