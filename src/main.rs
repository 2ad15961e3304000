//! Main entry point for the arcbrowse CLI application.
//!
//! Prints the tree of a local directory, a local archive or a remote archive,
//! with every archive found along the way expanded in place.

use anyhow::{Context, Result};
use clap::Parser;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

use arcbrowse::{
    Cli, Entry, FileSystem, TreeExpander, TreeNode, VirtualFs, ZipMounter, render_tree,
};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let vfs = Arc::new(VirtualFs::new(cli.file_types()));
    let fs: Arc<dyn FileSystem> = vfs.clone();
    let mut expander = TreeExpander::new(fs.clone(), Arc::new(ZipMounter::new(fs)));
    if let Some(scope) = cli.content_roots()? {
        expander = expander.with_scope(Arc::new(scope));
    }

    let root = if cli.is_http_url() {
        Entry::remote(cli.target.clone())
    } else {
        let path = std::path::Path::new(&cli.target)
            .canonicalize()
            .with_context(|| format!("cannot access {}", cli.target))?;
        let is_directory = path.is_dir();
        Entry::local(path, is_directory)
    };

    let mut stdout = std::io::stdout().lock();
    render_tree(
        &expander,
        TreeNode::for_entry(root, cli.view_settings()),
        &mut stdout,
    )
    .await?;

    // Display network transfer statistics for HTTP sources
    if cli.is_http_url() {
        eprintln!(
            "\nTotal bytes transferred: {}",
            format_size(vfs.transferred_bytes())
        );
    }

    Ok(())
}

/// Log to stderr; `RUST_LOG` takes precedence over `-v`.
fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

/// Format a byte size into a human-readable string.
///
/// ```ignore
/// assert_eq!(format_size(500), "500 bytes");
/// assert_eq!(format_size(1536), "1.50 KB");
/// ```
fn format_size(size: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if size >= GB {
        format!("{:.2} GB", size as f64 / GB as f64)
    } else if size >= MB {
        format!("{:.2} MB", size as f64 / MB as f64)
    } else if size >= KB {
        format!("{:.2} KB", size as f64 / KB as f64)
    } else {
        format!("{} bytes", size)
    }
}
