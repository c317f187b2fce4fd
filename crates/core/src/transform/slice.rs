use std::collections::HashSet;

use log::{debug, info};
use serde::Serialize;

use crate::analysis::{BlockCallGraph, DependencyBlocks, SlicePath};
use crate::error::SliceError;
use crate::ir::{FunctionId, InstrId, Module};

/// What a slice will do to a module, computed before anything is mutated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlicePlan {
    /// Surviving functions, declaration order.
    pub keep: Vec<FunctionId>,
    /// Functions to erase, declaration order.
    pub remove: Vec<FunctionId>,
    /// Instructions in surviving functions that call (or take the address of) a removed
    /// function. All of them are void, and none of them is a target.
    pub erase_call_sites: Vec<InstrId>,
    /// Targets that survive the slice, in the order they were given. Targets inside
    /// removed functions are dropped.
    pub targets: Vec<InstrId>,
}

/// Result of applying a [`SlicePlan`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SliceOutcome {
    pub kept_functions: Vec<String>,
    pub removed_functions: Vec<String>,
    pub erased_call_sites: usize,
}

/// Keep-set under construction. `full` marks functions whose every block has been
/// walked.
struct Reach<'g> {
    graph: &'g BlockCallGraph,
    keep: HashSet<FunctionId>,
    full: HashSet<FunctionId>,
}

impl<'g> Reach<'g> {
    /// Drains `worklist`. Entries flagged `true` were entered along the path, so only
    /// their path blocks run; everything else runs in full.
    fn expand(&mut self, mut worklist: Vec<(FunctionId, bool)>) {
        while let Some((function, on_path)) = worklist.pop() {
            self.keep.insert(function);
            if on_path || !self.full.insert(function) {
                continue;
            }
            for block in self.graph.blocks_of(function) {
                worklist.extend(self.graph.callees_of(*block).iter().map(|c| (*c, false)));
            }
        }
    }
}

fn reach_path<'g>(
    graph: &'g BlockCallGraph,
    blocks: &DependencyBlocks,
    path: &SlicePath,
) -> Reach<'g> {
    let owners = path.functions(blocks);
    let mut reach = Reach { graph, keep: owners.iter().copied().collect(), full: HashSet::new() };

    let mut worklist = Vec::new();
    for (i, block) in path.blocks.iter().enumerate() {
        let next = owners.get(i + 1).copied();
        worklist.extend(graph.callees_of(*block).iter().map(|c| (*c, Some(*c) == next)));
    }
    reach.expand(worklist);
    reach
}

/// Functions the path needs.
///
/// Every function owning a path block survives. A call from one path block into the
/// owner of the next is the path itself and only keeps that owner. Any other call from
/// a path block runs its callee in full, so the callee survives together with
/// everything it transitively calls, path owners included.
pub fn reachable_functions(
    graph: &BlockCallGraph,
    blocks: &DependencyBlocks,
    path: &SlicePath,
) -> HashSet<FunctionId> {
    reach_path(graph, blocks, path).keep
}

/// Decides which functions go and checks that removing them is safe.
///
/// Targets whose function survives are never erased: whatever they call or reference
/// is kept, in full. Targets inside removed functions are dropped from the plan.
///
/// Fails with [`SliceError::UnsafeRemoval`] if a surviving instruction consumes the
/// non-void result of a call to (or the address of) a function slated for removal.
/// References located inside other removed functions disappear with them and are not
/// checked.
pub fn plan_slice(
    module: &Module,
    graph: &BlockCallGraph,
    blocks: &DependencyBlocks,
    path: &SlicePath,
    targets: &[InstrId],
    protected: &[String],
) -> Result<SlicePlan, SliceError> {
    let mut reach = reach_path(graph, blocks, path);
    for name in protected {
        if let Some(id) = module.function_by_name(name) {
            reach.keep.insert(id);
        }
    }

    // Rooting a target's callees can keep the owner of another target alive.
    let mut surviving: HashSet<InstrId> = HashSet::new();
    loop {
        let mut worklist = Vec::new();
        for target in targets {
            let Some(inst) = module.instruction(*target) else { continue };
            if reach.keep.contains(&inst.parent()) && surviving.insert(*target) {
                worklist.extend(inst.referenced_functions().map(|f| (f, false)));
            }
        }
        if worklist.is_empty() {
            break;
        }
        reach.expand(worklist);
    }
    let keep = reach.keep;

    let (kept, remove): (Vec<FunctionId>, Vec<FunctionId>) =
        module.function_ids().into_iter().partition(|f| keep.contains(f));
    let removing: HashSet<FunctionId> = remove.iter().copied().collect();

    let mut erase_call_sites = Vec::new();
    for function in &remove {
        for site in module.references_to(*function) {
            let Some(inst) = module.instruction(site) else { continue };
            if removing.contains(&inst.parent()) {
                continue;
            }
            let ty = if inst.direct_callee() == Some(*function) {
                module.function(*function).map(|f| f.ret).unwrap_or(inst.ty)
            } else {
                inst.ty
            };
            if !ty.is_void() {
                return Err(SliceError::UnsafeRemoval {
                    function: module.function_name(*function).to_string(),
                    caller: module.function_name(inst.parent()).to_string(),
                    instruction: module.describe(site),
                    ty: ty.to_string(),
                });
            }
            if !erase_call_sites.contains(&site) {
                erase_call_sites.push(site);
            }
        }
    }

    let mut kept_targets = Vec::with_capacity(surviving.len());
    for target in targets {
        if surviving.contains(target) {
            if !kept_targets.contains(target) {
                kept_targets.push(*target);
            }
        } else {
            debug!("slice: dropping target {}, its function is removed", module.describe(*target));
        }
    }

    Ok(SlicePlan { keep: kept, remove, erase_call_sites, targets: kept_targets })
}

/// Applies a validated plan: call sites first, then whole functions.
pub fn apply_plan(module: &mut Module, plan: &SlicePlan) -> Result<SliceOutcome, SliceError> {
    let kept_functions: Vec<String> =
        plan.keep.iter().map(|f| module.function_name(*f).to_string()).collect();

    for site in &plan.erase_call_sites {
        debug!("slice: erasing call site {}", module.describe(*site));
        module.erase_instruction(*site)?;
    }
    for function in &plan.remove {
        module.clear_body(*function)?;
    }

    let mut removed_functions = Vec::with_capacity(plan.remove.len());
    for function in &plan.remove {
        let erased = module.erase_function(*function)?;
        info!("slice: removed @{}", erased.name);
        removed_functions.push(erased.name);
    }

    Ok(SliceOutcome {
        kept_functions,
        removed_functions,
        erased_call_sites: plan.erase_call_sites.len(),
    })
}

/// Removes every function the path does not need.
///
/// All removals are validated before the first mutation, so on error the module is
/// left untouched.
pub fn slice(
    module: &mut Module,
    graph: &BlockCallGraph,
    blocks: &DependencyBlocks,
    path: &SlicePath,
    targets: &[InstrId],
    protected: &[String],
) -> Result<SliceOutcome, SliceError> {
    let plan = plan_slice(module, graph, blocks, path, targets, protected)?;
    apply_plan(module, &plan)
}
