//! Archive detection by declared type or by leading bytes.

use std::collections::HashMap;
use std::fmt;

use tracing::{debug, trace};

use crate::entry::Entry;
use crate::vfs::FileSystem;

/// Number of leading bytes compared against [`SIGNATURES`].
pub const SIGNATURE_LEN: usize = 4;

/// ZIP local file header magic.
pub const ZIP_SIGNATURE: [u8; SIGNATURE_LEN] = *b"PK\x03\x04";

/// Known container signatures, checked in order.
pub static SIGNATURES: &[([u8; SIGNATURE_LEN], ArchiveKind)] = &[(ZIP_SIGNATURE, ArchiveKind::Zip)];

/// Extensions registered as ZIP containers by default.
pub const ARCHIVE_EXTENSIONS: &[&str] = &["epub", "htmlz", "zip"];

/// A recognized container format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArchiveKind {
    Zip,
}

impl fmt::Display for ArchiveKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArchiveKind::Zip => write!(f, "zip"),
        }
    }
}

/// Declared type of an entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileType {
    Archive(ArchiveKind),
    Other,
}

/// Extension-based file type registration.
///
/// Lookups are case-insensitive. Directories always have [`FileType::Other`].
#[derive(Debug, Clone)]
pub struct FileTypeRegistry {
    extensions: HashMap<String, ArchiveKind>,
}

impl FileTypeRegistry {
    pub fn empty() -> Self {
        Self {
            extensions: HashMap::new(),
        }
    }

    /// Declare `extension` (with or without a leading dot) as a `kind` container.
    pub fn register(&mut self, extension: &str, kind: ArchiveKind) {
        let extension = extension.trim_start_matches('.').to_ascii_lowercase();
        if !extension.is_empty() {
            self.extensions.insert(extension, kind);
        }
    }

    pub fn file_type(&self, entry: &Entry) -> FileType {
        if entry.is_directory() {
            return FileType::Other;
        }
        entry
            .extension()
            .and_then(|ext| self.extensions.get(&ext.to_ascii_lowercase()))
            .map_or(FileType::Other, |kind| FileType::Archive(*kind))
    }
}

impl Default for FileTypeRegistry {
    fn default() -> Self {
        let mut registry = Self::empty();
        for extension in ARCHIVE_EXTENSIONS {
            registry.register(extension, ArchiveKind::Zip);
        }
        registry
    }
}

/// Decides whether an entry is an archive.
#[derive(Debug, Clone, Copy)]
pub struct ArchiveDetector {
    signatures: &'static [([u8; SIGNATURE_LEN], ArchiveKind)],
}

impl Default for ArchiveDetector {
    fn default() -> Self {
        Self {
            signatures: SIGNATURES,
        }
    }
}

impl ArchiveDetector {
    /// Classify `entry`, trusting its declared type first and its leading
    /// bytes otherwise.
    ///
    /// Never fails: unreadable, empty or short files are simply not archives.
    pub async fn classify(&self, fs: &dyn FileSystem, entry: &Entry) -> Option<ArchiveKind> {
        if entry.is_directory() {
            return None;
        }

        if let FileType::Archive(kind) = fs.declared_type(entry) {
            trace!(path = entry.path(), %kind, "archive by declared type");
            return Some(kind);
        }

        let prefix = match fs.read_prefix(entry, SIGNATURE_LEN).await {
            Ok(prefix) => prefix,
            Err(e) => {
                debug!(path = entry.path(), reason = "read_failure", "cannot sniff: {e:#}");
                return None;
            }
        };

        let kind = self.sniff(&prefix);
        if let Some(kind) = kind {
            trace!(path = entry.path(), %kind, "archive by signature");
        }
        kind
    }

    /// Match leading bytes against the signature table.
    pub fn sniff(&self, prefix: &[u8]) -> Option<ArchiveKind> {
        let head = prefix.get(..SIGNATURE_LEN)?;
        self.signatures
            .iter()
            .find(|(signature, _)| signature.as_slice() == head)
            .map(|(_, kind)| *kind)
    }
}
