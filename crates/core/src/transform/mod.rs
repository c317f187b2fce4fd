//! Module rewrites applied once a path is known: removing what the path does not
//! need, instrumenting the targets, and dropping debug metadata.

pub mod inject;
pub mod slice;
pub mod strip;

pub use inject::{declare_helper, inject_exit, inject_extraction, EXTRACTION_SENTINEL};
pub use slice::{apply_plan, plan_slice, reachable_functions, slice, SliceOutcome, SlicePlan};
pub use strip::{strip_debug_info, StripStats};
