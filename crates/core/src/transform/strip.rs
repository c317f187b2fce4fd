use log::debug;
use serde::Serialize;

use crate::error::SliceError;
use crate::ir::{InstrId, Module};

/// Prefix shared by the debug intrinsics.
pub const DEBUG_INTRINSIC_PREFIX: &str = "llvm.dbg.";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StripStats {
    pub locations_cleared: usize,
    pub intrinsic_calls_erased: usize,
    pub declarations_erased: usize,
}

/// Drops debug metadata: every instruction location, every call to a debug intrinsic,
/// then the intrinsic declarations themselves once nothing references them.
///
/// Declarations named in `protected` stay in the module even when their calls are gone.
pub fn strip_debug_info(
    module: &mut Module,
    protected: &[String],
) -> Result<StripStats, SliceError> {
    let mut stats = StripStats::default();

    let located: Vec<InstrId> =
        module.all_instructions().filter(|i| i.loc.is_some()).map(|i| i.id()).collect();
    for id in located {
        if let Some(inst) = module.instruction_mut(id) {
            inst.loc = None;
            stats.locations_cleared += 1;
        }
    }

    let intrinsics: Vec<_> = module
        .functions()
        .filter(|f| f.name.starts_with(DEBUG_INTRINSIC_PREFIX))
        .map(|f| f.id())
        .collect();

    for intrinsic in &intrinsics {
        let calls: Vec<InstrId> = module
            .references_to(*intrinsic)
            .into_iter()
            .filter(|r| module.instruction(*r).and_then(|i| i.direct_callee()) == Some(*intrinsic))
            .collect();
        for call in calls {
            module.erase_instruction(call)?;
            stats.intrinsic_calls_erased += 1;
        }
    }

    for intrinsic in intrinsics {
        if protected.iter().any(|p| p == module.function_name(intrinsic)) {
            debug!("strip: keeping protected @{}", module.function_name(intrinsic));
            continue;
        }
        if !module.references_to(intrinsic).is_empty() {
            debug!("strip: keeping @{}, still referenced", module.function_name(intrinsic));
            continue;
        }
        module.erase_function(intrinsic)?;
        stats.declarations_erased += 1;
    }

    Ok(stats)
}
