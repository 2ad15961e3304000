use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;

use super::ReadAt;

/// Reader over bytes held in memory, used for decompressed archive members.
pub struct MemoryReader {
    data: Vec<u8>,
}

impl MemoryReader {
    pub fn new(data: Vec<u8>) -> Self {
        Self { data }
    }
}

#[async_trait]
impl ReadAt for MemoryReader {
    async fn read_at(&self, offset: u64, buf: &mut [u8]) -> Result<usize> {
        let len = self.data.len() as u64;
        if offset >= len {
            return Ok(0);
        }
        let start = offset as usize;
        let n = buf.len().min(self.data.len() - start);
        buf[..n].copy_from_slice(&self.data[start..start + n]);
        Ok(n)
    }

    fn size(&self) -> u64 {
        self.data.len() as u64
    }
}

/// A `[start, start + len)` slice of another reader.
///
/// STORED archive members are exposed this way so they can be sniffed or
/// mounted without copying them out of the enclosing archive.
pub struct WindowReader {
    inner: Arc<dyn ReadAt>,
    start: u64,
    len: u64,
}

impl WindowReader {
    pub fn new(inner: Arc<dyn ReadAt>, start: u64, len: u64) -> Self {
        Self { inner, start, len }
    }
}

#[async_trait]
impl ReadAt for WindowReader {
    async fn read_at(&self, offset: u64, buf: &mut [u8]) -> Result<usize> {
        if offset >= self.len {
            return Ok(0);
        }
        let n = (buf.len() as u64).min(self.len - offset) as usize;
        self.inner.read_at(self.start + offset, &mut buf[..n]).await
    }

    fn size(&self) -> u64 {
        self.len
    }
}
