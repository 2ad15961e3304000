use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use anyhow::{Context, Result, bail};
use async_trait::async_trait;
use tracing::trace;

use super::FileSystem;
use crate::detect::{FileType, FileTypeRegistry};
use crate::entry::{Entry, Origin};
use crate::io::{HttpRangeReader, LocalFileReader, ReadAt};

/// The filesystem the binary browses: local directories, remote files and
/// the insides of mounted archives.
pub struct VirtualFs {
    file_types: FileTypeRegistry,
    transferred_bytes: Arc<AtomicU64>,
}

impl VirtualFs {
    pub fn new(file_types: FileTypeRegistry) -> Self {
        Self {
            file_types,
            transferred_bytes: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Bytes fetched over HTTP by all remote readers opened so far.
    pub fn transferred_bytes(&self) -> u64 {
        self.transferred_bytes.load(Ordering::Relaxed)
    }
}

impl Default for VirtualFs {
    fn default() -> Self {
        Self::new(FileTypeRegistry::default())
    }
}

#[async_trait]
impl FileSystem for VirtualFs {
    async fn list_children(&self, dir: &Entry) -> Result<Vec<Entry>> {
        if !dir.is_directory() {
            return Ok(Vec::new());
        }

        match dir.origin() {
            Origin::Local(path) => {
                let mut read_dir = tokio::fs::read_dir(path)
                    .await
                    .with_context(|| format!("cannot list {}", path.display()))?;
                let mut children = Vec::new();
                while let Some(child) = read_dir.next_entry().await? {
                    let child_path = child.path();
                    // Follow symlinks; a dangling one is shown as a file
                    let is_directory = tokio::fs::metadata(&child_path)
                        .await
                        .map(|meta| meta.is_dir())
                        .unwrap_or(false);
                    children.push(Entry::local(child_path, is_directory));
                }
                trace!(path = dir.path(), children = children.len(), "listed directory");
                Ok(children)
            }
            Origin::Remote { .. } => Ok(Vec::new()),
            Origin::Archived { index, name } => Ok(index
                .children(name)
                .map(|(child, is_directory)| Entry::archived(index.clone(), child, is_directory))
                .collect()),
        }
    }

    fn declared_type(&self, entry: &Entry) -> FileType {
        self.file_types.file_type(entry)
    }

    async fn open_for_read(&self, entry: &Entry) -> Result<Arc<dyn ReadAt>> {
        if entry.is_directory() {
            bail!("{} is a directory", entry.path());
        }

        match entry.origin() {
            Origin::Local(path) => Ok(Arc::new(LocalFileReader::new(path)?)),
            Origin::Remote { url } => Ok(Arc::new(
                HttpRangeReader::with_counter(url.clone(), self.transferred_bytes.clone()).await?,
            )),
            Origin::Archived { index, name } => index.open(name).await,
        }
    }

    async fn read_prefix(&self, entry: &Entry, len: usize) -> Result<Vec<u8>> {
        match entry.origin() {
            // Compressed members are decoded only as far as the prefix
            Origin::Archived { index, name } if !entry.is_directory() => {
                index.read_prefix(name, len).await
            }
            _ => {
                let reader = self.open_for_read(entry).await?;
                let mut buf = vec![0u8; len];
                let n = reader.read_at(0, &mut buf).await?;
                buf.truncate(n);
                Ok(buf)
            }
        }
    }
}
