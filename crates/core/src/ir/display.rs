use std::fmt;

use crate::ir::{Callee, Instruction, Module, Operand};

/// Textual, LLVM-flavoured rendering of a [`Module`] for dumps and traces.
pub struct ModuleDisplay<'a>(pub &'a Module);

impl Module {
    pub fn display(&self) -> ModuleDisplay<'_> {
        ModuleDisplay(self)
    }

    /// Renders a single instruction on one line, without indentation.
    pub fn render_instruction(&self, inst: &Instruction) -> String {
        let mut out = String::new();
        if let Some(name) = &inst.name {
            out.push_str(&format!("%{name} = "));
        }
        out.push_str(inst.opcode.as_str());
        if !inst.ty.is_void() {
            out.push_str(&format!(" {}", inst.ty));
        }
        match inst.callee {
            Some(Callee::Direct(f)) => out.push_str(&format!(" @{}", self.function_name(f))),
            Some(Callee::Indirect(op)) => out.push_str(&format!(" *{}", self.render_operand(&op))),
            None => {}
        }
        let operands: Vec<String> = inst.operands.iter().map(|op| self.render_operand(op)).collect();
        if inst.callee.is_some() {
            out.push_str(&format!("({})", operands.join(", ")));
        } else if !operands.is_empty() {
            out.push(' ');
            out.push_str(&operands.join(", "));
        }
        if let Some(loc) = &inst.loc {
            out.push_str(&format!("  ; {loc}"));
        }
        out
    }

    fn render_operand(&self, op: &Operand) -> String {
        match op {
            Operand::Value(v) => match self.instruction(*v) {
                Some(Instruction { name: Some(name), .. }) => format!("%{name}"),
                _ => format!("%{v}"),
            },
            Operand::Param(n) => format!("${n}"),
            Operand::Const(c) => c.to_string(),
            Operand::Function(f) => format!("@{}", self.function_name(*f)),
        }
    }
}

impl fmt::Display for ModuleDisplay<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let module = self.0;
        writeln!(f, "; module {}", module.name)?;
        for func in module.functions() {
            let params: Vec<&str> = func.params.iter().map(|t| t.as_str()).collect();
            if func.is_declaration() {
                writeln!(f, "declare {} @{}({})", func.ret, func.name, params.join(", "))?;
                continue;
            }
            writeln!(f, "define {} @{}({}) {{", func.ret, func.name, params.join(", "))?;
            for inst in module.instructions(func.id()) {
                writeln!(f, "  {}", module.render_instruction(inst))?;
            }
            writeln!(f, "}}")?;
        }
        Ok(())
    }
}
