use std::path::{Path, PathBuf};

use super::Scope;
use crate::entry::{Entry, Origin};

/// Scope built from project content roots.
///
/// A local entry is filtered only when its parent directory lies under one of
/// the content roots: it is then dropped if it lies under an excluded
/// directory. Entries whose parent is under no root pass unfiltered, as do
/// remote entries and archive members. Name patterns apply everywhere.
#[derive(Debug, Clone, Default)]
pub struct ContentRoots {
    roots: Vec<PathBuf>,
    excluded: Vec<PathBuf>,
    patterns: Vec<String>,
}

impl ContentRoots {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.roots.push(root.into());
        self
    }

    pub fn with_excluded(mut self, dir: impl Into<PathBuf>) -> Self {
        self.excluded.push(dir.into());
        self
    }

    /// Hide entries whose name matches `pattern` (`*` and `?` wildcards).
    pub fn with_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.patterns.push(pattern.into());
        self
    }

    fn governs(&self, dir: &Path) -> bool {
        self.roots.iter().any(|root| dir.starts_with(root))
    }
}

impl Scope for ContentRoots {
    fn in_scope(&self, entry: &Entry) -> bool {
        if self.patterns.iter().any(|p| glob_match(p, entry.name())) {
            return false;
        }

        let Origin::Local(path) = entry.origin() else {
            return true;
        };
        match path.parent() {
            Some(parent) if self.governs(parent) => {
                !self.excluded.iter().any(|dir| path.starts_with(dir))
            }
            _ => true,
        }
    }
}

/// Simple glob pattern matching supporting `*` and `?` wildcards.
///
/// - `*` matches zero or more characters
/// - `?` matches exactly one character
///
/// ```
/// use arcbrowse::vfs::glob_match;
///
/// assert!(glob_match("*.txt", "readme.txt"));
/// assert!(glob_match("file?.dat", "file1.dat"));
/// assert!(!glob_match("*.txt", "readme.md"));
/// ```
pub fn glob_match(pattern: &str, text: &str) -> bool {
    let pattern: Vec<char> = pattern.chars().collect();
    let text: Vec<char> = text.chars().collect();
    let (mut p, mut t) = (0, 0);
    // Last star seen, and where in the text its match currently ends
    let mut star: Option<(usize, usize)> = None;

    while t < text.len() {
        match pattern.get(p) {
            Some('*') => {
                star = Some((p, t));
                p += 1;
            }
            Some(&c) if c == '?' || c == text[t] => {
                p += 1;
                t += 1;
            }
            _ => match star {
                // Let the star swallow one more character and retry
                Some((star_p, star_t)) => {
                    star = Some((star_p, star_t + 1));
                    p = star_p + 1;
                    t = star_t + 1;
                }
                None => return false,
            },
        }
    }

    pattern[p..].iter().all(|&c| c == '*')
}
