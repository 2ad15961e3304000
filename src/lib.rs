//! # arcbrowse
//!
//! Browse archives as if they were directories.
//!
//! A file tree asks [`TreeExpander`] for the children of each visible node.
//! Files that are archives, either by registered extension (`.zip`, `.epub`,
//! `.htmlz`) or by their leading `PK\x03\x04` signature, come back as
//! [`NodeVariant::ArchiveFile`] nodes whose children are the archive's
//! contents. Nested archives work the same way, and remote archives are read
//! with HTTP Range requests so only the central directory is downloaded.
//!
//! Broken archives, unreadable files and unlistable directories never cause
//! an error: they just show no children.
//!
//! ## Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use arcbrowse::{Entry, FileSystem, TreeExpander, TreeNode, VirtualFs, ZipMounter};
//!
//! #[tokio::main]
//! async fn main() {
//!     let fs: Arc<dyn FileSystem> = Arc::new(VirtualFs::default());
//!     let expander = TreeExpander::new(fs.clone(), Arc::new(ZipMounter::new(fs)));
//!
//!     let root = TreeNode::for_entry(Entry::local("site.zip", false), ());
//!     for child in expander.children(root).await {
//!         println!("{} {:?}", child.entry().path(), child.variant());
//!     }
//! }
//! ```

pub mod cli;
pub mod detect;
pub mod entry;
pub mod io;
pub mod render;
pub mod tree;
pub mod vfs;
pub mod zip;

#[cfg(test)]
mod testing;

pub use cli::{Cli, ViewSettings};
pub use detect::{ARCHIVE_EXTENSIONS, ArchiveDetector, ArchiveKind, FileType, FileTypeRegistry};
pub use entry::{Entry, Origin};
pub use io::{HttpRangeReader, LocalFileReader, ReadAt};
pub use render::{TreeStats, render_tree};
pub use tree::{NodeVariant, TreeExpander, TreeNode};
pub use vfs::{ArchiveMount, ContentRoots, FileSystem, Scope, VirtualFs, ZipMounter};
