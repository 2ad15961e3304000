//! Filesystem items as seen by the tree.

use std::path::PathBuf;
use std::sync::Arc;

use crate::vfs::ArchiveIndex;

/// Separator between an archive's path and a path inside it.
pub const ARCHIVE_SEPARATOR: &str = "!/";

/// Where the bytes of an [`Entry`] live.
#[derive(Debug, Clone)]
pub enum Origin {
    /// A path on the local filesystem.
    Local(PathBuf),
    /// A single remote file, read with HTTP Range requests.
    Remote { url: String },
    /// A member of a mounted archive. `name` is the '/'-separated path inside
    /// the archive; directories end with '/', the root is `""`.
    Archived { index: Arc<ArchiveIndex>, name: String },
}

/// A file or directory. Immutable; identified by its path.
#[derive(Debug, Clone)]
pub struct Entry {
    path: String,
    is_directory: bool,
    origin: Origin,
}

impl Entry {
    pub fn local(path: impl Into<PathBuf>, is_directory: bool) -> Self {
        let path = path.into();
        Self {
            path: path.to_string_lossy().into_owned(),
            is_directory,
            origin: Origin::Local(path),
        }
    }

    pub fn remote(url: impl Into<String>) -> Self {
        let url = url.into();
        Self {
            path: url.clone(),
            is_directory: false,
            origin: Origin::Remote { url },
        }
    }

    /// A member of `index`; its path is `<archive path>!/<name>`.
    pub fn archived(index: Arc<ArchiveIndex>, name: impl Into<String>, is_directory: bool) -> Self {
        let name = name.into();
        Self {
            path: format!("{}{}{}", index.label(), ARCHIVE_SEPARATOR, name),
            is_directory,
            origin: Origin::Archived { index, name },
        }
    }

    /// The virtual root directory of a mounted archive.
    pub fn archive_root(index: Arc<ArchiveIndex>) -> Self {
        Self::archived(index, String::new(), true)
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn is_directory(&self) -> bool {
        self.is_directory
    }

    pub fn origin(&self) -> &Origin {
        &self.origin
    }

    /// Last path component, used for display and extension lookup.
    pub fn name(&self) -> &str {
        match &self.origin {
            Origin::Local(path) => path
                .file_name()
                .and_then(|name| name.to_str())
                .unwrap_or(self.path.as_str()),
            Origin::Remote { url } => {
                let url = url.split(['?', '#']).next().unwrap_or(url.as_str());
                last_segment(url)
            }
            Origin::Archived { index, name } if name.is_empty() => last_segment(index.label()),
            Origin::Archived { name, .. } => last_segment(name),
        }
    }

    /// Extension of [`name`](Self::name), case preserved.
    pub fn extension(&self) -> Option<&str> {
        match self.name().rsplit_once('.') {
            Some((stem, ext)) if !stem.is_empty() && !ext.is_empty() => Some(ext),
            _ => None,
        }
    }
}

fn last_segment(path: &str) -> &str {
    let trimmed = path.trim_end_matches('/');
    let trimmed = trimmed.strip_suffix('!').unwrap_or(trimmed);
    trimmed.rsplit('/').next().unwrap_or(trimmed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn local_names_and_extensions() {
        let entry = Entry::local("/work/site/report.ZIP", false);
        assert_eq!(entry.path(), "/work/site/report.ZIP");
        assert_eq!(entry.name(), "report.ZIP");
        assert_eq!(entry.extension(), Some("ZIP"));

        assert_eq!(Entry::local("/work/.zip", false).extension(), None);
        assert_eq!(Entry::local("/work/Makefile", false).extension(), None);
    }

    #[test]
    fn remote_name_ignores_query() {
        let entry = Entry::remote("https://example.com/dist/book.epub?token=abc");
        assert_eq!(entry.name(), "book.epub");
        assert_eq!(entry.extension(), Some("epub"));
        assert!(!entry.is_directory());
    }
}
