use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::ir::IrError;

/// Stable identifier of a function inside a [`crate::ir::Module`].
///
/// Assigned at load/build time and never reused, even after the function is erased.
#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct FunctionId(pub(crate) usize);

impl FunctionId {
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for FunctionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "f{}", self.0)
    }
}

/// Stable identifier of an instruction inside a [`crate::ir::Module`].
#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct InstrId(pub(crate) usize);

impl InstrId {
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for InstrId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "i{}", self.0)
    }
}

/// Result type of an instruction or return type of a function.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Type {
    #[default]
    Void,
    I1,
    I8,
    I32,
    I64,
    F64,
    Ptr,
}

impl Type {
    pub fn is_void(self) -> bool {
        matches!(self, Type::Void)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Type::Void => "void",
            Type::I1 => "i1",
            Type::I8 => "i8",
            Type::I32 => "i32",
            Type::I64 => "i64",
            Type::F64 => "f64",
            Type::Ptr => "ptr",
        }
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Operation performed by an instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Opcode {
    Alloca,
    Load,
    Store,
    Call,
    Ret,
    Br,
    CondBr,
    Add,
    Sub,
    Mul,
    Div,
    Icmp,
    Phi,
    Cast,
    Gep,
    Unreachable,
}

impl Opcode {
    /// Ends a basic block; nothing placed after it runs.
    pub fn is_terminator(self) -> bool {
        matches!(self, Opcode::Ret | Opcode::Br | Opcode::CondBr | Opcode::Unreachable)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Opcode::Alloca => "alloca",
            Opcode::Load => "load",
            Opcode::Store => "store",
            Opcode::Call => "call",
            Opcode::Ret => "ret",
            Opcode::Br => "br",
            Opcode::CondBr => "cond_br",
            Opcode::Add => "add",
            Opcode::Sub => "sub",
            Opcode::Mul => "mul",
            Opcode::Div => "div",
            Opcode::Icmp => "icmp",
            Opcode::Phi => "phi",
            Opcode::Cast => "cast",
            Opcode::Gep => "gep",
            Opcode::Unreachable => "unreachable",
        }
    }
}

impl fmt::Display for Opcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Value consumed by an instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operand {
    /// Result of another instruction in the same function.
    Value(InstrId),
    /// Incoming parameter of the enclosing function.
    Param(u32),
    Const(i64),
    /// Address of a function.
    Function(FunctionId),
}

/// Call target of a call instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Callee {
    Direct(FunctionId),
    /// Target computed at runtime; cannot be followed by the slicer.
    Indirect(Operand),
}

/// Source location attached to an instruction by the front end.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DebugLoc {
    pub file: String,
    pub line: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub column: Option<u32>,
}

impl DebugLoc {
    pub fn new(file: impl Into<String>, line: u32) -> Self {
        Self { file: file.into(), line, column: None }
    }

    /// True when this location sits on `line` of `file`.
    ///
    /// Front ends record paths relative to their working directory, so a path that is a
    /// `/`-separated suffix of the other counts as the same file.
    pub fn matches(&self, file: &str, line: u32) -> bool {
        self.line == line && same_file(&self.file, file)
    }
}

fn same_file(a: &str, b: &str) -> bool {
    if a == b {
        return true;
    }
    let (long, short) = if a.len() >= b.len() { (a, b) } else { (b, a) };
    long.strip_suffix(short).is_some_and(|prefix| prefix.ends_with('/'))
}

impl fmt::Display for DebugLoc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.column {
            Some(col) => write!(f, "{}:{}:{}", self.file, self.line, col),
            None => write!(f, "{}:{}", self.file, self.line),
        }
    }
}

impl FromStr for DebugLoc {
    type Err = IrError;

    /// Parses `file:line` or `file:line:column`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || IrError::InvalidLocation(s.to_string());
        let mut parts = s.rsplitn(3, ':');
        let last = parts.next().ok_or_else(invalid)?;
        let middle = parts.next().ok_or_else(invalid)?;
        match parts.next() {
            Some(file) if middle.parse::<u32>().is_ok() => {
                let line = middle.parse().map_err(|_| invalid())?;
                let column = last.parse().map_err(|_| invalid())?;
                if file.is_empty() {
                    return Err(invalid());
                }
                Ok(Self { file: file.to_string(), line, column: Some(column) })
            }
            rest => {
                // `middle` is part of the file name (e.g. `C:` drive prefixes).
                let file = match rest {
                    Some(prefix) => format!("{prefix}:{middle}"),
                    None => middle.to_string(),
                };
                let line = last.parse().map_err(|_| invalid())?;
                if file.is_empty() {
                    return Err(invalid());
                }
                Ok(Self { file, line, column: None })
            }
        }
    }
}
