//! Analysis that decides what the slice keeps.
//!
//! - [`blocks`]: group each function's instructions into dependency blocks
//! - [`callgraph`]: connect blocks to the functions they call
//! - [`path`]: search that graph from the source function to the target line

pub mod blocks;
pub mod callgraph;
pub mod path;

pub use blocks::{build_dependency_blocks, compute_blocks, BlockId, DependencyBlock, DependencyBlocks};
pub use callgraph::{build_call_graph, BlockCallGraph};
pub use path::{find_path, SlicePath};
