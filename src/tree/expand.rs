use std::sync::Arc;

use tracing::debug;

use super::node::{NodeVariant, TreeNode};
use crate::detect::{ArchiveDetector, ArchiveKind};
use crate::entry::Entry;
use crate::vfs::{ArchiveMount, FileSystem, Scope};

/// Produces the children of tree nodes, presenting archives as directories.
///
/// Stateless between calls: variants are recomputed on every request, so
/// changes on disk show up on the next expansion. No failure is ever
/// returned; a node that cannot be read or mounted just has no children.
pub struct TreeExpander {
    fs: Arc<dyn FileSystem>,
    mounter: Arc<dyn ArchiveMount>,
    scope: Option<Arc<dyn Scope>>,
    detector: ArchiveDetector,
}

impl TreeExpander {
    pub fn new(fs: Arc<dyn FileSystem>, mounter: Arc<dyn ArchiveMount>) -> Self {
        Self {
            fs,
            mounter,
            scope: None,
            detector: ArchiveDetector::default(),
        }
    }

    /// Only show entries accepted by `scope`.
    pub fn with_scope(mut self, scope: Arc<dyn Scope>) -> Self {
        self.scope = Some(scope);
        self
    }

    pub async fn classify(&self, entry: &Entry) -> Option<ArchiveKind> {
        self.detector.classify(self.fs.as_ref(), entry).await
    }

    /// Turn a plain file that is an archive into an archive node with the
    /// same entry and settings. Other nodes pass through unchanged.
    pub async fn transform<S>(&self, node: TreeNode<S>) -> TreeNode<S> {
        if node.variant() != NodeVariant::PlainFile {
            return node;
        }
        match self.classify(node.entry()).await {
            Some(kind) => node.into_archive(kind),
            None => node,
        }
    }

    /// Tree decoration hook: [`transform`](Self::transform) every node of a
    /// freshly expanded level, keeping order.
    pub async fn decorate<S>(&self, children: Vec<TreeNode<S>>) -> Vec<TreeNode<S>> {
        let mut decorated = Vec::with_capacity(children.len());
        for child in children {
            decorated.push(self.transform(child).await);
        }
        decorated
    }

    /// Children of `node`, by variant.
    pub async fn expand<S: Clone>(&self, node: &TreeNode<S>) -> Vec<TreeNode<S>> {
        match node.variant() {
            NodeVariant::PlainFile => Vec::new(),
            NodeVariant::Directory => self.directory_children(node.entry(), node.settings()).await,
            NodeVariant::ArchiveFile(_) => {
                let entry = node.entry();
                match self.mounter.mount_root(entry).await {
                    Ok(Some(root)) => self.directory_children(&root, node.settings()).await,
                    Ok(None) => {
                        debug!(path = entry.path(), reason = "mount_failure", "nothing to mount");
                        Vec::new()
                    }
                    Err(e) => {
                        debug!(path = entry.path(), reason = "mount_failure", "cannot mount: {e:#}");
                        Vec::new()
                    }
                }
            }
        }
    }

    /// One full host round for a visible node: transform it, expand it, and
    /// decorate the result.
    pub async fn children<S: Clone>(&self, node: TreeNode<S>) -> Vec<TreeNode<S>> {
        let node = self.transform(node).await;
        let children = self.expand(&node).await;
        self.decorate(children).await
    }

    async fn directory_children<S: Clone>(&self, dir: &Entry, settings: &S) -> Vec<TreeNode<S>> {
        let entries = match self.fs.list_children(dir).await {
            Ok(entries) => entries,
            Err(e) => {
                debug!(path = dir.path(), reason = "list_failure", "cannot list: {e:#}");
                return Vec::new();
            }
        };

        entries
            .into_iter()
            .filter(|entry| self.in_scope(entry))
            .map(|entry| TreeNode::for_entry(entry, settings.clone()))
            .collect()
    }

    fn in_scope(&self, entry: &Entry) -> bool {
        self.scope.as_ref().is_none_or(|scope| scope.in_scope(entry))
    }
}
