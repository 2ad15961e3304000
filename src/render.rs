//! Text rendering of an archive-aware tree, in the style of `tree(1)`.

use std::cmp::Ordering;
use std::io::Write;

use anyhow::Result;

use crate::cli::ViewSettings;
use crate::tree::{NodeVariant, TreeExpander, TreeNode};

/// Totals printed under the tree.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct TreeStats {
    pub directories: usize,
    pub files: usize,
    pub archives: usize,
}

struct Pending {
    node: TreeNode<ViewSettings>,
    prefix: String,
    last: bool,
    depth: usize,
}

/// Write the tree below `root` to `out`, expanding archives.
///
/// Walks with an explicit stack so deep trees and nested archives don't need
/// recursive futures.
pub async fn render_tree<W: Write>(
    expander: &TreeExpander,
    root: TreeNode<ViewSettings>,
    out: &mut W,
) -> Result<TreeStats> {
    let mut stats = TreeStats::default();
    let root = expander.transform(root).await;
    writeln!(out, "{}", label(&root, true))?;

    let mut stack = Vec::new();
    push_children(expander, &root, String::new(), 1, &mut stack).await;

    while let Some(pending) = stack.pop() {
        let node = &pending.node;
        let branch = if pending.last { "└── " } else { "├── " };
        writeln!(out, "{}{}{}", pending.prefix, branch, label(node, false))?;

        match node.variant() {
            NodeVariant::PlainFile => stats.files += 1,
            NodeVariant::Directory => stats.directories += 1,
            NodeVariant::ArchiveFile(_) => stats.archives += 1,
        }

        if node.is_expandable() {
            let prefix = format!("{}{}", pending.prefix, if pending.last { "    " } else { "│   " });
            push_children(expander, node, prefix, pending.depth + 1, &mut stack).await;
        }
    }

    writeln!(
        out,
        "\n{} directories, {} files, {} archives",
        stats.directories, stats.files, stats.archives
    )?;
    Ok(stats)
}

async fn push_children(
    expander: &TreeExpander,
    node: &TreeNode<ViewSettings>,
    prefix: String,
    depth: usize,
    stack: &mut Vec<Pending>,
) {
    let settings = node.settings();
    if settings.max_depth.is_some_and(|max| depth > max) {
        return;
    }

    let mut children = expander.decorate(expander.expand(node).await).await;
    if settings.sort {
        children.sort_by(compare);
    }

    let count = children.len();
    // Reversed so the first child is popped first
    for (i, node) in children.into_iter().enumerate().rev() {
        stack.push(Pending {
            node,
            prefix: prefix.clone(),
            last: i + 1 == count,
            depth,
        });
    }
}

/// Directories first, then case-insensitive by name.
fn compare(a: &TreeNode<ViewSettings>, b: &TreeNode<ViewSettings>) -> Ordering {
    let rank = |n: &TreeNode<ViewSettings>| n.variant() != NodeVariant::Directory;
    rank(a)
        .cmp(&rank(b))
        .then_with(|| {
            let (a, b) = (a.entry().name(), b.entry().name());
            a.to_lowercase().cmp(&b.to_lowercase()).then_with(|| a.cmp(b))
        })
}

fn label(node: &TreeNode<ViewSettings>, is_root: bool) -> String {
    let settings = node.settings();
    let entry = node.entry();
    let mut label = if settings.full_path || is_root {
        entry.path().to_string()
    } else {
        entry.name().to_string()
    };
    match node.variant() {
        NodeVariant::Directory if !label.ends_with('/') => label.push('/'),
        NodeVariant::ArchiveFile(kind) if settings.show_kind => {
            label.push_str(&format!(" [{kind}]"));
        }
        _ => {}
    }
    label
}
