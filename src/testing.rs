//! In-memory collaborators for unit tests.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use anyhow::{Result, anyhow, bail};
use async_trait::async_trait;

use crate::detect::{FileType, FileTypeRegistry};
use crate::entry::Entry;
use crate::io::{MemoryReader, ReadAt};
use crate::vfs::{ArchiveMount, FileSystem};

#[derive(Clone)]
enum Node {
    Dir(Vec<String>),
    File(Vec<u8>),
    Unreadable { is_directory: bool },
}

/// A filesystem held in a map from path to node.
pub(crate) struct FakeFs {
    nodes: Mutex<HashMap<String, Node>>,
    file_types: FileTypeRegistry,
    opens: AtomicUsize,
}

impl FakeFs {
    pub fn new() -> Self {
        Self {
            nodes: Mutex::new(HashMap::new()),
            file_types: FileTypeRegistry::default(),
            opens: AtomicUsize::new(0),
        }
    }

    fn with(self, path: &str, node: Node) -> Self {
        self.nodes.lock().unwrap().insert(path.to_string(), node);
        self
    }

    pub fn dir(self, path: &str, children: &[&str]) -> Self {
        let children = children.iter().map(|c| c.to_string()).collect();
        self.with(path, Node::Dir(children))
    }

    pub fn file(self, path: &str, data: &[u8]) -> Self {
        self.with(path, Node::File(data.to_vec()))
    }

    pub fn unreadable(self, path: &str) -> Self {
        self.with(path, Node::Unreadable { is_directory: false })
    }

    pub fn unreadable_dir(self, path: &str) -> Self {
        self.with(path, Node::Unreadable { is_directory: true })
    }

    pub fn overwrite(&self, path: &str, data: &[u8]) {
        self.nodes
            .lock()
            .unwrap()
            .insert(path.to_string(), Node::File(data.to_vec()));
    }

    pub fn entry(&self, path: &str) -> Entry {
        let is_directory = matches!(
            self.nodes.lock().unwrap().get(path),
            Some(Node::Dir(_)) | Some(Node::Unreadable { is_directory: true })
        );
        Entry::local(path, is_directory)
    }

    /// Number of `open_for_read` calls so far.
    pub fn opens(&self) -> usize {
        self.opens.load(Ordering::SeqCst)
    }

    fn node(&self, entry: &Entry) -> Result<Node> {
        self.nodes
            .lock()
            .unwrap()
            .get(entry.path())
            .cloned()
            .ok_or_else(|| anyhow!("{} not found", entry.path()))
    }
}

#[async_trait]
impl FileSystem for FakeFs {
    async fn list_children(&self, dir: &Entry) -> Result<Vec<Entry>> {
        match self.node(dir)? {
            Node::Dir(children) => Ok(children.iter().map(|c| self.entry(c)).collect()),
            Node::File(_) => Ok(Vec::new()),
            Node::Unreadable { .. } => bail!("permission denied: {}", dir.path()),
        }
    }

    fn declared_type(&self, entry: &Entry) -> FileType {
        self.file_types.file_type(entry)
    }

    async fn open_for_read(&self, entry: &Entry) -> Result<Arc<dyn ReadAt>> {
        self.opens.fetch_add(1, Ordering::SeqCst);
        match self.node(entry)? {
            Node::File(data) => Ok(Arc::new(MemoryReader::new(data))),
            Node::Dir(_) => bail!("{} is a directory", entry.path()),
            Node::Unreadable { .. } => bail!("permission denied: {}", entry.path()),
        }
    }
}

/// Maps archive paths to directories of a [`FakeFs`].
pub(crate) struct FakeMount {
    roots: HashMap<String, String>,
    failing: HashSet<String>,
}

impl FakeMount {
    pub fn new() -> Self {
        Self {
            roots: HashMap::new(),
            failing: HashSet::new(),
        }
    }

    pub fn root(mut self, archive: &str, root: &str) -> Self {
        self.roots.insert(archive.to_string(), root.to_string());
        self
    }

    pub fn failing(mut self, archive: &str) -> Self {
        self.failing.insert(archive.to_string());
        self
    }
}

#[async_trait]
impl ArchiveMount for FakeMount {
    async fn mount_root(&self, file: &Entry) -> Result<Option<Entry>> {
        if self.failing.contains(file.path()) {
            bail!("not a valid ZIP file");
        }
        Ok(self
            .roots
            .get(file.path())
            .map(|root| Entry::local(root.as_str(), true)))
    }
}
