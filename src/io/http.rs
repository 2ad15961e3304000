use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use super::ReadAt;
use anyhow::{Result, anyhow, bail};
use tracing::{debug, warn};

const MAX_RETRY: u32 = 10;

/// HTTP Range reader for remote files.
///
/// Only the byte ranges actually requested are fetched, so sniffing a remote
/// archive costs 4 bytes and listing it costs the central directory.
pub struct HttpRangeReader {
    client: Client,
    url: String,
    size: u64,
    transferred_bytes: Arc<AtomicU64>,
}

impl HttpRangeReader {
    /// Probe `url` with a HEAD request for Range support and its size.
    pub async fn new(url: String) -> Result<Self> {
        Self::with_counter(url, Arc::new(AtomicU64::new(0))).await
    }

    /// Like [`HttpRangeReader::new`], but adds transferred bytes to a counter
    /// shared with other readers.
    pub async fn with_counter(url: String, transferred_bytes: Arc<AtomicU64>) -> Result<Self> {
        let client = Client::builder().timeout(Duration::from_secs(30)).build()?;

        let resp = client.head(&url).send().await?;
        if !resp.status().is_success() {
            bail!("HTTP request failed with status: {}", resp.status());
        }

        let header = |name: &str| {
            resp.headers()
                .get(name)
                .and_then(|v| v.to_str().ok())
                .map(str::to_owned)
        };

        if !header("accept-ranges").is_some_and(|v| v.contains("bytes")) {
            bail!("Remote server does not support Range requests");
        }
        let size: u64 = header("content-length")
            .and_then(|v| v.parse().ok())
            .ok_or_else(|| anyhow!("Remote server did not return Content-Length"))?;

        debug!(url = %url, size, "opened remote file");

        Ok(Self {
            client,
            url,
            size,
            transferred_bytes,
        })
    }

    /// Get total bytes transferred from network
    pub fn transferred_bytes(&self) -> u64 {
        self.transferred_bytes.load(Ordering::Relaxed)
    }

    /// GET `bytes=start-end`, retrying connection failures with a growing delay.
    async fn fetch(&self, start: u64, end: u64) -> Result<Vec<u8>> {
        let range = format!("bytes={start}-{end}");
        let mut attempt = 0;

        loop {
            match self.client.get(&self.url).header("Range", &range).send().await {
                Ok(resp) if resp.status() == StatusCode::PARTIAL_CONTENT => {
                    return Ok(resp.bytes().await?.to_vec());
                }
                Ok(resp) => bail!("HTTP request failed with status: {}", resp.status()),
                Err(e) if e.is_timeout() || e.is_connect() => {
                    attempt += 1;
                    if attempt >= MAX_RETRY {
                        bail!("Max retries exceeded");
                    }
                    warn!(url = %self.url, "connection error, retry {attempt}/{MAX_RETRY}: {e}");
                    tokio::time::sleep(Duration::from_millis(500 * attempt as u64)).await;
                }
                Err(e) => return Err(e.into()),
            }
        }
    }
}

#[async_trait]
impl ReadAt for HttpRangeReader {
    async fn read_at(&self, offset: u64, buf: &mut [u8]) -> Result<usize> {
        if buf.is_empty() || offset >= self.size {
            return Ok(0);
        }

        let end = (offset + buf.len() as u64 - 1).min(self.size - 1);
        let expected = (end - offset + 1) as usize;

        // Servers may answer with less than asked; keep requesting the rest
        let mut received = 0;
        while received < expected {
            let bytes = self.fetch(offset + received as u64, end).await?;
            let chunk_len = bytes.len().min(expected - received);
            if chunk_len == 0 {
                bail!("empty range response from {}", self.url);
            }
            buf[received..received + chunk_len].copy_from_slice(&bytes[..chunk_len]);
            received += chunk_len;

            self.transferred_bytes
                .fetch_add(chunk_len as u64, Ordering::Relaxed);
        }

        Ok(received)
    }

    fn size(&self) -> u64 {
        self.size
    }
}
