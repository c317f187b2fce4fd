//! Serializable module documents (JSON or YAML).
//!
//! Instructions name their values with `id`, and refer to other things with a small
//! operand syntax: `%name` for an instruction value, `$N` for a parameter, `@name` for
//! a function, and plain integers for constants.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::ir::{Callee, FunctionId, InstrId, Instruction, IrError, Module, Opcode, Operand, Type};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleDoc {
    pub name: String,
    #[serde(default)]
    pub functions: Vec<FunctionDoc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunctionDoc {
    pub name: String,
    #[serde(default, skip_serializing_if = "is_void")]
    pub ret: Type,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub params: Vec<Type>,
    /// Empty for declarations.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub body: Vec<InstrDoc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstrDoc {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub op: Opcode,
    #[serde(default, skip_serializing_if = "is_void")]
    pub ty: Type,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub args: Vec<ArgDoc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub callee: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub loc: Option<String>,
}

/// Operand text. Integer constants may be written unquoted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ArgDoc {
    Int(i64),
    Text(String),
}

impl fmt::Display for ArgDoc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgDoc::Int(v) => write!(f, "{v}"),
            ArgDoc::Text(t) => f.write_str(t),
        }
    }
}

fn is_void(ty: &Type) -> bool {
    ty.is_void()
}

impl Module {
    /// Builds a module from its document form, assigning fresh ids.
    pub fn from_doc(doc: &ModuleDoc) -> Result<Module, IrError> {
        let mut module = Module::new(doc.name.clone());
        let mut ids = Vec::with_capacity(doc.functions.len());
        for func in &doc.functions {
            ids.push(module.add_function(func.name.clone(), func.ret, func.params.clone())?);
        }

        for (func, fid) in doc.functions.iter().zip(ids) {
            // First pass creates every instruction so operands may refer forward (phis).
            let mut names: HashMap<&str, InstrId> = HashMap::new();
            let mut created = Vec::with_capacity(func.body.len());
            for inst in &func.body {
                let mut ir = Instruction::new(inst.op, inst.ty);
                ir.name = inst.id.clone();
                if let Some(loc) = &inst.loc {
                    ir.loc = Some(loc.parse()?);
                }
                let id = module.push_unchecked(fid, ir);
                if let Some(name) = inst.id.as_deref() {
                    if names.insert(name, id).is_some() {
                        return Err(IrError::DuplicateValue {
                            function: func.name.clone(),
                            name: name.to_string(),
                        });
                    }
                }
                created.push(id);
            }

            for (inst, id) in func.body.iter().zip(created) {
                let operands = inst
                    .args
                    .iter()
                    .map(|arg| resolve_operand(&module, &func.name, &names, &arg.to_string()))
                    .collect::<Result<Vec<_>, _>>()?;
                let callee = inst
                    .callee
                    .as_deref()
                    .map(|text| resolve_callee(&module, &func.name, &names, text))
                    .transpose()?;
                if let Some(slot) = module.instruction_mut(id) {
                    slot.operands = operands;
                    slot.callee = callee;
                }
            }
        }

        module.verify()?;
        Ok(module)
    }

    /// Converts the module back into its document form.
    ///
    /// Anonymous instructions whose value is used get a generated `tN` name.
    pub fn to_doc(&self) -> ModuleDoc {
        let functions = self
            .functions()
            .map(|func| {
                let names = value_names(self, func.id());
                let body = self
                    .instructions(func.id())
                    .map(|inst| InstrDoc {
                        id: names.get(&inst.id()).cloned(),
                        op: inst.opcode,
                        ty: inst.ty,
                        args: inst.operands.iter().map(|op| operand_doc(self, &names, op)).collect(),
                        callee: inst.callee.map(|callee| match callee {
                            Callee::Direct(f) => format!("@{}", self.function_name(f)),
                            Callee::Indirect(op) => operand_doc(self, &names, &op).to_string(),
                        }),
                        loc: inst.loc.as_ref().map(|loc| loc.to_string()),
                    })
                    .collect();
                FunctionDoc { name: func.name.clone(), ret: func.ret, params: func.params.clone(), body }
            })
            .collect();
        ModuleDoc { name: self.name.clone(), functions }
    }

    pub fn from_json_str(text: &str) -> Result<Module, IrError> {
        let doc: ModuleDoc = serde_json::from_str(text).map_err(|e| IrError::Parse(e.to_string()))?;
        Module::from_doc(&doc)
    }

    pub fn from_yaml_str(text: &str) -> Result<Module, IrError> {
        let doc: ModuleDoc = serde_yaml::from_str(text).map_err(|e| IrError::Parse(e.to_string()))?;
        Module::from_doc(&doc)
    }
}

fn value_names(module: &Module, function: FunctionId) -> HashMap<InstrId, String> {
    let mut names: HashMap<InstrId, String> = HashMap::new();
    let mut taken: HashSet<String> = HashSet::new();
    for inst in module.instructions(function) {
        if let Some(name) = &inst.name {
            names.insert(inst.id(), name.clone());
            taken.insert(name.clone());
        }
    }

    let mut counter = 0usize;
    for inst in module.instructions(function) {
        for used in inst.value_operands() {
            if names.contains_key(&used) {
                continue;
            }
            let name = loop {
                let candidate = format!("t{counter}");
                counter += 1;
                if !taken.contains(&candidate) {
                    break candidate;
                }
            };
            taken.insert(name.clone());
            names.insert(used, name);
        }
    }
    names
}

fn operand_doc(module: &Module, names: &HashMap<InstrId, String>, op: &Operand) -> ArgDoc {
    match op {
        Operand::Value(v) => {
            ArgDoc::Text(format!("%{}", names.get(v).map(String::as_str).unwrap_or("?")))
        }
        Operand::Param(n) => ArgDoc::Text(format!("${n}")),
        Operand::Const(c) => ArgDoc::Int(*c),
        Operand::Function(f) => ArgDoc::Text(format!("@{}", module.function_name(*f))),
    }
}

fn resolve_operand(
    module: &Module,
    function: &str,
    names: &HashMap<&str, InstrId>,
    text: &str,
) -> Result<Operand, IrError> {
    let invalid =
        || IrError::InvalidOperand { function: function.to_string(), operand: text.to_string() };
    if let Some(name) = text.strip_prefix('%') {
        names.get(name).map(|id| Operand::Value(*id)).ok_or_else(|| IrError::UnknownValue {
            function: function.to_string(),
            name: name.to_string(),
        })
    } else if let Some(index) = text.strip_prefix('$') {
        index.parse().map(Operand::Param).map_err(|_| invalid())
    } else if let Some(name) = text.strip_prefix('@') {
        module
            .function_by_name(name)
            .map(Operand::Function)
            .ok_or_else(|| IrError::UnknownFunction(name.to_string()))
    } else {
        text.trim().parse().map(Operand::Const).map_err(|_| invalid())
    }
}

fn resolve_callee(
    module: &Module,
    function: &str,
    names: &HashMap<&str, InstrId>,
    text: &str,
) -> Result<Callee, IrError> {
    match text.strip_prefix('@') {
        Some(name) => module
            .function_by_name(name)
            .map(Callee::Direct)
            .ok_or_else(|| IrError::UnknownFunction(name.to_string())),
        None => resolve_operand(module, function, names, text).map(Callee::Indirect),
    }
}

/// Reads a module document from disk. `.json` files are parsed as JSON, anything else as
/// YAML.
pub fn load_module(path: &Path) -> Result<Module> {
    let body = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read module at {}", path.display()))?;
    let module = if is_json(path) {
        Module::from_json_str(&body)
    } else {
        Module::from_yaml_str(&body)
    }
    .with_context(|| format!("Failed to load module from {}", path.display()))?;
    Ok(module)
}

/// Writes `module` to disk, choosing JSON or YAML by extension like [`load_module`].
pub fn save_module(module: &Module, path: &Path) -> Result<()> {
    let doc = module.to_doc();
    let body = if is_json(path) {
        serde_json::to_string_pretty(&doc).context("Failed to serialize module to JSON")?
    } else {
        serde_yaml::to_string(&doc).context("Failed to serialize module to YAML")?
    };
    std::fs::write(path, body)
        .with_context(|| format!("Failed to write module to {}", path.display()))?;
    Ok(())
}

pub(crate) fn is_json(path: &Path) -> bool {
    path.extension().and_then(|e| e.to_str()).is_some_and(|e| e.eq_ignore_ascii_case("json"))
}
