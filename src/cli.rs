use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;

use crate::detect::{ArchiveKind, FileTypeRegistry};
use crate::vfs::ContentRoots;

#[derive(Parser, Debug)]
#[command(name = "arcbrowse")]
#[command(version)]
#[command(about = "Show a directory tree with ZIP archives expanded in place", long_about = None)]
#[command(after_help = "Examples:\n  \
  arcbrowse .                              tree of the current directory\n  \
  arcbrowse book.epub -L 2 -x '*.png'      two levels of an e-book, without images\n  \
  arcbrowse https://example.com/site.zip   list a remote archive")]
pub struct Cli {
    /// Directory, file or HTTP URL to browse
    #[arg(value_name = "TARGET")]
    pub target: String,

    /// Descend at most N levels
    #[arg(short = 'L', long = "depth", value_name = "N")]
    pub depth: Option<usize>,

    /// Print full paths instead of names
    #[arg(short = 'f', long)]
    pub full_path: bool,

    /// Mark archives with their kind
    #[arg(short = 'k', long)]
    pub kind: bool,

    /// Keep listing order instead of sorting by name
    #[arg(long)]
    pub no_sort: bool,

    /// Content root; directories under a root hide excluded directories
    #[arg(short = 'r', long = "root", value_name = "DIR")]
    pub roots: Vec<PathBuf>,

    /// Excluded directory inside a content root
    #[arg(short = 'e', long = "exclude-dir", value_name = "DIR")]
    pub excluded: Vec<PathBuf>,

    /// Hide entries whose name matches (supports * and ?)
    #[arg(short = 'x', value_name = "PATTERN", num_args = 1..)]
    pub exclude: Vec<String>,

    /// Additional extension to treat as a ZIP container
    #[arg(long = "archive-ext", value_name = "EXT")]
    pub archive_extensions: Vec<String>,

    /// Verbose logging (-v info, -vv debug, -vvv trace)
    #[arg(short = 'v', action = clap::ArgAction::Count)]
    pub verbose: u8,
}

/// Display settings carried by every tree node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ViewSettings {
    pub max_depth: Option<usize>,
    pub full_path: bool,
    pub show_kind: bool,
    pub sort: bool,
}

impl Cli {
    pub fn is_http_url(&self) -> bool {
        self.target.starts_with("http://") || self.target.starts_with("https://")
    }

    pub fn view_settings(&self) -> ViewSettings {
        ViewSettings {
            max_depth: self.depth,
            full_path: self.full_path,
            show_kind: self.kind,
            sort: !self.no_sort,
        }
    }

    pub fn file_types(&self) -> FileTypeRegistry {
        let mut registry = FileTypeRegistry::default();
        for extension in &self.archive_extensions {
            registry.register(extension, ArchiveKind::Zip);
        }
        registry
    }

    /// `None` when no filtering was requested.
    pub fn content_roots(&self) -> Result<Option<ContentRoots>> {
        if self.roots.is_empty() && self.excluded.is_empty() && self.exclude.is_empty() {
            return Ok(None);
        }

        let mut scope = ContentRoots::new();
        for root in &self.roots {
            let root = root
                .canonicalize()
                .with_context(|| format!("content root {}", root.display()))?;
            scope = scope.with_root(root);
        }
        for dir in &self.excluded {
            // A missing excluded directory hides nothing; keep it as given
            scope = scope.with_excluded(dir.canonicalize().unwrap_or_else(|_| dir.clone()));
        }
        for pattern in &self.exclude {
            scope = scope.with_pattern(pattern.clone());
        }
        Ok(Some(scope))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detect::FileType;
    use crate::entry::Entry;

    #[test]
    fn flags_map_to_settings_and_registry() {
        let cli = Cli::parse_from([
            "arcbrowse",
            "-L",
            "2",
            "--no-sort",
            "--archive-ext",
            "jar",
            ".",
        ]);
        assert_eq!(
            cli.view_settings(),
            ViewSettings {
                max_depth: Some(2),
                full_path: false,
                show_kind: false,
                sort: false,
            }
        );
        assert_eq!(
            cli.file_types().file_type(&Entry::local("lib.jar", false)),
            FileType::Archive(ArchiveKind::Zip)
        );
        assert!(cli.content_roots().unwrap().is_none());
        assert!(!cli.is_http_url());
    }

    #[test]
    fn exclusion_patterns_build_a_scope() {
        let cli = Cli::parse_from(["arcbrowse", "https://example.com/a.zip", "-x", "*.png", "*.jpg"]);
        assert!(cli.is_http_url());
        assert_eq!(cli.exclude, ["*.png", "*.jpg"]);
        assert!(cli.content_roots().unwrap().is_some());
    }
}
