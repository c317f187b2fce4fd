use crate::error::SliceError;
use crate::ir::{InstrId, Module};

/// Instructions whose debug location is `file:line`, in declaration order.
///
/// Fails with [`SliceError::TargetNotFound`] when nothing matches.
pub fn locate_targets(module: &Module, file: &str, line: u32) -> Result<Vec<InstrId>, SliceError> {
    let found: Vec<InstrId> = module
        .functions()
        .flat_map(|f| module.instructions(f.id()))
        .filter(|i| i.loc.as_ref().is_some_and(|loc| loc.matches(file, line)))
        .map(|i| i.id())
        .collect();

    if found.is_empty() {
        return Err(SliceError::TargetNotFound { file: file.to_string(), line });
    }
    Ok(found)
}
