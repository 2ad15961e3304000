use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::Arc;

use anyhow::{Result, anyhow};
use async_trait::async_trait;
use tracing::debug;

use super::{ArchiveMount, FileSystem};
use crate::entry::{ARCHIVE_SEPARATOR, Entry};
use crate::io::ReadAt;
use crate::zip::{ZipExtractor, ZipFileEntry};

#[derive(Debug, Clone)]
struct Child {
    name: String,
    is_directory: bool,
}

/// Directory structure of a mounted ZIP archive.
///
/// Intermediate directories are synthesized when the archive has no explicit
/// record for them. Children keep central directory order of first
/// appearance.
pub struct ArchiveIndex {
    label: String,
    extractor: ZipExtractor,
    members: HashMap<String, ZipFileEntry>,
    dirs: HashMap<String, Vec<Child>>,
}

impl ArchiveIndex {
    /// Read the central directory of the archive behind `reader`.
    ///
    /// `label` is the archive's own path, used as prefix for member paths.
    pub async fn load(label: impl Into<String>, reader: Arc<dyn ReadAt>) -> Result<Self> {
        let extractor = ZipExtractor::new(reader);
        let files = extractor.list_files().await?;

        let mut members = HashMap::new();
        let mut dirs: HashMap<String, Vec<Child>> = HashMap::new();
        let mut seen = HashSet::new();
        dirs.insert(String::new(), Vec::new());

        for file in files {
            let Some(name) = insert_path(&mut dirs, &mut seen, &file.file_name, file.is_directory)
            else {
                continue;
            };
            if !file.is_directory {
                members.insert(name, file);
            }
        }

        Ok(Self {
            label: label.into(),
            extractor,
            members,
            dirs,
        })
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    /// Number of file members.
    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Children of the directory `dir` (`""` for the root) as
    /// `(name, is_directory)` pairs.
    pub fn children(&self, dir: &str) -> impl Iterator<Item = (&str, bool)> + '_ {
        self.dirs
            .get(dir)
            .into_iter()
            .flatten()
            .map(|child| (child.name.as_str(), child.is_directory))
    }

    /// Open the file member `name` for reading.
    pub async fn open(&self, name: &str) -> Result<Arc<dyn ReadAt>> {
        self.extractor.open_entry(self.member(name)?).await
    }

    /// Up to `len` leading bytes of the file member `name`, without
    /// decompressing the rest of it.
    pub async fn read_prefix(&self, name: &str, len: usize) -> Result<Vec<u8>> {
        self.extractor.read_prefix(self.member(name)?, len).await
    }

    fn member(&self, name: &str) -> Result<&ZipFileEntry> {
        self.members
            .get(name)
            .ok_or_else(|| anyhow!("{}{ARCHIVE_SEPARATOR}{name} not found", self.label))
    }
}

impl fmt::Debug for ArchiveIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ArchiveIndex")
            .field("label", &self.label)
            .field("members", &self.members.len())
            .field("dirs", &self.dirs.len())
            .finish()
    }
}

/// Record `raw` and all its ancestors, returning the normalized name.
///
/// Empty and `.` segments are dropped, so `/a//./b` becomes `a/b`.
fn insert_path(
    dirs: &mut HashMap<String, Vec<Child>>,
    seen: &mut HashSet<String>,
    raw: &str,
    is_directory: bool,
) -> Option<String> {
    let parts: Vec<&str> = raw
        .split('/')
        .filter(|part| !part.is_empty() && *part != ".")
        .collect();
    if parts.is_empty() {
        return None;
    }

    let mut parent = String::new();
    for (i, part) in parts.iter().enumerate() {
        let child_is_dir = is_directory || i + 1 < parts.len();
        let mut name = format!("{parent}{part}");
        if child_is_dir {
            name.push('/');
            dirs.entry(name.clone()).or_default();
        }
        if seen.insert(name.clone()) {
            dirs.entry(parent).or_default().push(Child {
                name: name.clone(),
                is_directory: child_is_dir,
            });
        }
        parent = name;
    }

    Some(parent)
}

/// Mounts ZIP containers (including `.epub`, `.htmlz`, and archives nested in
/// other archives) as virtual directories.
///
/// Every call reads the central directory again; nothing is cached.
pub struct ZipMounter {
    fs: Arc<dyn FileSystem>,
}

impl ZipMounter {
    pub fn new(fs: Arc<dyn FileSystem>) -> Self {
        Self { fs }
    }
}

#[async_trait]
impl ArchiveMount for ZipMounter {
    async fn mount_root(&self, file: &Entry) -> Result<Option<Entry>> {
        if file.is_directory() {
            return Ok(None);
        }

        let reader = self.fs.open_for_read(file).await?;
        let index = ArchiveIndex::load(file.path(), reader).await?;
        debug!(path = file.path(), members = index.len(), "mounted archive");

        Ok(Some(Entry::archive_root(Arc::new(index))))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn build(names: &[(&str, bool)]) -> HashMap<String, Vec<Child>> {
        let mut dirs = HashMap::new();
        let mut seen = HashSet::new();
        dirs.insert(String::new(), Vec::new());
        for (name, is_dir) in names {
            insert_path(&mut dirs, &mut seen, name, *is_dir);
        }
        dirs
    }

    fn names(dirs: &HashMap<String, Vec<Child>>, dir: &str) -> Vec<String> {
        dirs[dir].iter().map(|c| c.name.clone()).collect()
    }

    #[test]
    fn intermediate_directories_are_synthesized() {
        let dirs = build(&[("docs/guide/intro.md", false), ("README", false)]);
        assert_eq!(names(&dirs, ""), ["docs/", "README"]);
        assert_eq!(names(&dirs, "docs/"), ["docs/guide/"]);
        assert_eq!(names(&dirs, "docs/guide/"), ["docs/guide/intro.md"]);
        assert!(dirs[""][0].is_directory);
        assert!(!dirs[""][1].is_directory);
    }

    #[test]
    fn explicit_directory_records_are_not_duplicated() {
        let dirs = build(&[
            ("images/", true),
            ("images/a.png", false),
            ("index.html", false),
            ("images/b.png", false),
        ]);
        assert_eq!(names(&dirs, ""), ["images/", "index.html"]);
        assert_eq!(names(&dirs, "images/"), ["images/a.png", "images/b.png"]);
    }

    #[test]
    fn odd_names_are_normalized() {
        let mut dirs = HashMap::new();
        let mut seen = HashSet::new();
        assert_eq!(
            insert_path(&mut dirs, &mut seen, "/a//./b.txt", false).as_deref(),
            Some("a/b.txt")
        );
        assert_eq!(insert_path(&mut dirs, &mut seen, "/", true), None);
        assert_eq!(names(&dirs, "a/"), ["a/b.txt"]);
    }
}
