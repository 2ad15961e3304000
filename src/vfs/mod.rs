//! Collaborators consumed by the tree: a filesystem, an archive mounter and
//! a scope predicate, plus the implementations the binary uses.

mod archive;
mod fs;
mod scope;

pub use archive::{ArchiveIndex, ZipMounter};
pub use fs::VirtualFs;
pub use scope::{ContentRoots, glob_match};

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;

use crate::detect::FileType;
use crate::entry::Entry;
use crate::io::ReadAt;

/// Source of directory listings and file contents.
#[async_trait]
pub trait FileSystem: Send + Sync {
    /// Immediate children of `dir`, in the order the source yields them.
    async fn list_children(&self, dir: &Entry) -> Result<Vec<Entry>>;

    /// Type declared for `entry` by registration, without reading it.
    fn declared_type(&self, entry: &Entry) -> FileType;

    /// Open `entry` for reading. Dropping the reader releases the handle.
    async fn open_for_read(&self, entry: &Entry) -> Result<Arc<dyn ReadAt>>;

    /// Up to `len` leading bytes of `entry`. The reader is dropped before
    /// returning.
    async fn read_prefix(&self, entry: &Entry, len: usize) -> Result<Vec<u8>> {
        let reader = self.open_for_read(entry).await?;
        let mut buf = vec![0u8; len];
        let n = reader.read_at(0, &mut buf).await?;
        buf.truncate(n);
        Ok(buf)
    }
}

/// Resolves an archive file to the root directory of its contents.
#[async_trait]
pub trait ArchiveMount: Send + Sync {
    /// `Ok(None)` when there is nothing to mount for `file`.
    async fn mount_root(&self, file: &Entry) -> Result<Option<Entry>>;
}

/// Which entries should be displayed at all.
pub trait Scope: Send + Sync {
    fn in_scope(&self, entry: &Entry) -> bool;
}

impl<F> Scope for F
where
    F: Fn(&Entry) -> bool + Send + Sync,
{
    fn in_scope(&self, entry: &Entry) -> bool {
        self(entry)
    }
}
