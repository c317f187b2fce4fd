//! pathcut-core
//!
//! Whole-program path slicing over an arena IR.
//!
//! Given a module, a source function and a target source line, the crate finds a call
//! path from the source to the instructions at that line, removes every function the
//! path does not need, and instruments the targets so the reduced program reports their
//! values.
//!
//! Layers, bottom-up:
//! - [`ir`]: the module arena, its document format and mutation primitives
//! - [`dependence`]: the dependency graph adapter and the backends filling it
//! - [`analysis`]: dependency blocks, the block/function call graph, path search
//! - [`transform`]: slicing, instrumentation, debug stripping
//! - [`pipeline`]: the stages wired together under a [`config::SliceConfig`]
//!
//! All substantive logic lives here so it stays testable without the CLI.

pub mod analysis;
pub mod config;
pub mod dependence;
pub mod error;
pub mod ir;
pub mod locate;
pub mod pipeline;
pub mod trace;
pub mod transform;

pub use error::SliceError;

/// Returns the library version as encoded at compile time.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
