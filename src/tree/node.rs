use crate::detect::ArchiveKind;
use crate::entry::Entry;

/// Shape of a tree node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeVariant {
    PlainFile,
    Directory,
    /// A file that expands like a directory.
    ArchiveFile(ArchiveKind),
}

/// A display-facing wrapper around an [`Entry`].
///
/// `S` holds display settings; the tree only clones it into child nodes.
#[derive(Debug, Clone)]
pub struct TreeNode<S> {
    entry: Entry,
    variant: NodeVariant,
    settings: S,
}

impl<S> TreeNode<S> {
    pub fn new(entry: Entry, variant: NodeVariant, settings: S) -> Self {
        Self {
            entry,
            variant,
            settings,
        }
    }

    /// `Directory` for directories, `PlainFile` otherwise.
    pub fn for_entry(entry: Entry, settings: S) -> Self {
        let variant = if entry.is_directory() {
            NodeVariant::Directory
        } else {
            NodeVariant::PlainFile
        };
        Self::new(entry, variant, settings)
    }

    pub fn entry(&self) -> &Entry {
        &self.entry
    }

    pub fn variant(&self) -> NodeVariant {
        self.variant
    }

    pub fn settings(&self) -> &S {
        &self.settings
    }

    /// Whether the node can have children.
    pub fn is_expandable(&self) -> bool {
        !matches!(self.variant, NodeVariant::PlainFile)
    }

    pub(crate) fn into_archive(self, kind: ArchiveKind) -> Self {
        Self {
            variant: NodeVariant::ArchiveFile(kind),
            ..self
        }
    }
}
