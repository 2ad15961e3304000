//! Archive-aware tree nodes and their expansion.

mod expand;
mod node;

pub use expand::TreeExpander;
pub use node::{NodeVariant, TreeNode};
