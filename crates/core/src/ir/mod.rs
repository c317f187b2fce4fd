//! Arena IR for the programs being sliced.
//!
//! A [`Module`] owns every function and instruction. Everything outside this module
//! refers to them through [`FunctionId`] / [`InstrId`] handles, which stay valid (but
//! resolve to `None`) after the object they name has been erased.
//!
//! The module also provides the low-level mutation primitives the slicer relies on:
//! erasing instructions and functions, inserting calls, and declaring helpers.

mod display;
pub mod doc;
mod module;
mod types;

use thiserror::Error;

pub use display::ModuleDisplay;
pub use doc::{load_module, save_module, ArgDoc, FunctionDoc, InstrDoc, ModuleDoc};
pub use module::{Function, Instruction, Module};
pub use types::{Callee, DebugLoc, FunctionId, InstrId, Opcode, Operand, Type};

/// Errors raised while building, loading, or mutating a [`Module`].
#[derive(Debug, Error)]
pub enum IrError {
    #[error("Duplicate function name: {0}")]
    DuplicateFunction(String),

    #[error("Duplicate value name %{name} in function {function}")]
    DuplicateValue { function: String, name: String },

    #[error("Unknown function: {0}")]
    UnknownFunction(String),

    #[error("Unknown value %{name} in function {function}")]
    UnknownValue { function: String, name: String },

    #[error("Invalid operand `{operand}` in function {function}")]
    InvalidOperand { function: String, operand: String },

    #[error("Invalid debug location `{0}` (expected file:line[:column])")]
    InvalidLocation(String),

    #[error("Call in {function} to @{callee} has type {found}, but @{callee} returns {expected}")]
    CallTypeMismatch { function: String, callee: String, expected: Type, found: Type },

    #[error("Call instruction in {0} has no callee")]
    MissingCallee(String),

    #[error("Instruction {0} does not exist (erased or never created)")]
    MissingInstruction(InstrId),

    #[error("Function {0} does not exist (erased or never created)")]
    MissingFunction(FunctionId),

    #[error("Cannot erase {instruction} in {function}: its value is still used by {users} instruction(s)")]
    ValueInUse { function: String, instruction: String, users: usize },

    #[error("Cannot erase function @{function}: still referenced by {references} instruction(s)")]
    FunctionInUse { function: String, references: usize },

    #[error("Failed to parse module document: {0}")]
    Parse(String),
}
