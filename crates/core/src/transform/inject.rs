use log::debug;

use crate::error::SliceError;
use crate::ir::{FunctionId, InstrId, Instruction, IrError, Module, Operand, Type};

/// Argument passed to the extraction helper when the target produces no value.
pub const EXTRACTION_SENTINEL: i64 = -1;

/// Returns the helper called `name`, declaring it as `void(i64)` if the module lacks it.
pub fn declare_helper(module: &mut Module, name: &str) -> FunctionId {
    module.declare_function(name, Type::Void, vec![Type::I64])
}

/// Inserts a call to `extraction` right after every target instruction.
///
/// The call receives the target's value, or [`EXTRACTION_SENTINEL`] for void targets.
/// Extraction calls already following a target are skipped over, so injecting twice
/// leaves two calls in injection order. A terminator target (`ret`, `br`, ...) gets its
/// call directly in front of it instead, with the sentinel. Returns the new call
/// instructions.
pub fn inject_extraction(
    module: &mut Module,
    targets: &[InstrId],
    extraction: FunctionId,
) -> Result<Vec<InstrId>, SliceError> {
    let ret = module.function(extraction).ok_or(IrError::MissingFunction(extraction))?.ret;
    let mut injected = Vec::with_capacity(targets.len());

    for target in targets {
        let inst = module.instruction(*target).ok_or(IrError::MissingInstruction(*target))?;
        let terminator = inst.opcode.is_terminator();
        let arg = if terminator || inst.ty.is_void() {
            Operand::Const(EXTRACTION_SENTINEL)
        } else {
            Operand::Value(*target)
        };
        let call = Instruction::call(extraction, ret, vec![arg]);
        let call = if terminator {
            module.insert_before(*target, call)?
        } else {
            let anchor = last_call_run(module, *target, &[extraction]);
            module.insert_after(anchor, call)?
        };
        debug!(
            "inject: @{} after {}",
            module.function_name(extraction),
            module.describe(*target)
        );
        injected.push(call);
    }
    Ok(injected)
}

/// Inserts `exit(0)` after the extraction calls that follow each target.
///
/// Targets already followed by an exit call are left alone. For a terminator target
/// the exit goes directly in front of it, unless an exit call is already there; run
/// extraction first, since later extraction calls land between the exit and the
/// terminator.
pub fn inject_exit(
    module: &mut Module,
    targets: &[InstrId],
    extraction: FunctionId,
    exit: FunctionId,
) -> Result<Vec<InstrId>, SliceError> {
    let ret = module.function(exit).ok_or(IrError::MissingFunction(exit))?.ret;
    let mut injected = Vec::new();

    for target in targets {
        let inst = module.instruction(*target).ok_or(IrError::MissingInstruction(*target))?;
        let call = Instruction::call(exit, ret, vec![Operand::Const(0)]);
        if inst.opcode.is_terminator() {
            if previous_direct_callee(module, *target) == Some(exit) {
                continue;
            }
            injected.push(module.insert_before(*target, call)?);
            continue;
        }
        let anchor = last_call_run(module, *target, &[extraction]);
        if next_direct_callee(module, anchor) == Some(exit) {
            continue;
        }
        injected.push(module.insert_after(anchor, call)?);
    }
    Ok(injected)
}

/// Last instruction of the run of calls to any of `callees` that directly follows
/// `start`, or `start` itself when no such call follows.
fn last_call_run(module: &Module, start: InstrId, callees: &[FunctionId]) -> InstrId {
    let mut anchor = start;
    loop {
        match next_instruction(module, anchor) {
            Some(next)
                if module
                    .instruction(next)
                    .and_then(|i| i.direct_callee())
                    .is_some_and(|c| callees.contains(&c)) =>
            {
                anchor = next
            }
            _ => return anchor,
        }
    }
}

fn next_instruction(module: &Module, id: InstrId) -> Option<InstrId> {
    let parent = module.instruction(id)?.parent();
    let pos = module.position(id)?;
    module.function(parent)?.body().get(pos + 1).copied()
}

fn next_direct_callee(module: &Module, id: InstrId) -> Option<FunctionId> {
    next_instruction(module, id).and_then(|n| module.instruction(n)).and_then(|i| i.direct_callee())
}

fn previous_direct_callee(module: &Module, id: InstrId) -> Option<FunctionId> {
    let parent = module.instruction(id)?.parent();
    let pos = module.position(id)?.checked_sub(1)?;
    let prev = module.function(parent)?.body().get(pos).copied()?;
    module.instruction(prev).and_then(|i| i.direct_callee())
}
