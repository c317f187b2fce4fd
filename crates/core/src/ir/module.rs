use crate::ir::{Callee, DebugLoc, FunctionId, InstrId, IrError, Opcode, Operand, Type};

/// Placeholder id carried by an [`Instruction`] until a [`Module`] adopts it.
const UNATTACHED: usize = usize::MAX;

/// A named, ordered sequence of instructions.
///
/// A function with no instructions is a declaration of an external symbol.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Function {
    pub(crate) id: FunctionId,
    pub name: String,
    pub ret: Type,
    pub params: Vec<Type>,
    pub(crate) body: Vec<InstrId>,
}

impl Function {
    pub fn id(&self) -> FunctionId {
        self.id
    }

    /// Instruction ids in program order.
    pub fn body(&self) -> &[InstrId] {
        &self.body
    }

    pub fn is_declaration(&self) -> bool {
        self.body.is_empty()
    }
}

/// A single IR operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Instruction {
    pub(crate) id: InstrId,
    pub(crate) parent: FunctionId,
    /// Optional SSA value name (`%name`).
    pub name: Option<String>,
    pub opcode: Opcode,
    /// Result type; `void` when the instruction produces no value.
    pub ty: Type,
    pub operands: Vec<Operand>,
    pub callee: Option<Callee>,
    pub loc: Option<DebugLoc>,
}

impl Instruction {
    /// Creates a detached instruction. Its id and parent are assigned when it is added
    /// to a module.
    pub fn new(opcode: Opcode, ty: Type) -> Self {
        Self {
            id: InstrId(UNATTACHED),
            parent: FunctionId(UNATTACHED),
            name: None,
            opcode,
            ty,
            operands: Vec::new(),
            callee: None,
            loc: None,
        }
    }

    /// Direct call to `callee` producing a value of type `ty`.
    pub fn call(callee: FunctionId, ty: Type, args: Vec<Operand>) -> Self {
        let mut inst = Self::new(Opcode::Call, ty);
        inst.callee = Some(Callee::Direct(callee));
        inst.operands = args;
        inst
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_operands(mut self, operands: Vec<Operand>) -> Self {
        self.operands = operands;
        self
    }

    pub fn with_callee(mut self, callee: Callee) -> Self {
        self.callee = Some(callee);
        self
    }

    pub fn at(mut self, loc: DebugLoc) -> Self {
        self.loc = Some(loc);
        self
    }

    pub fn id(&self) -> InstrId {
        self.id
    }

    /// Function that owns this instruction.
    pub fn parent(&self) -> FunctionId {
        self.parent
    }

    pub fn is_call(&self) -> bool {
        self.opcode == Opcode::Call
    }

    pub fn direct_callee(&self) -> Option<FunctionId> {
        match self.callee {
            Some(Callee::Direct(f)) => Some(f),
            _ => None,
        }
    }

    /// True if `f` is called by, or has its address taken by, this instruction.
    pub fn references_function(&self, f: FunctionId) -> bool {
        match self.callee {
            Some(Callee::Direct(c)) if c == f => return true,
            Some(Callee::Indirect(Operand::Function(c))) if c == f => return true,
            _ => {}
        }
        self.operands.iter().any(|op| *op == Operand::Function(f))
    }

    /// Functions this instruction calls directly or whose address it takes.
    pub fn referenced_functions(&self) -> impl Iterator<Item = FunctionId> + '_ {
        let callee = match self.callee {
            Some(Callee::Direct(f)) | Some(Callee::Indirect(Operand::Function(f))) => Some(f),
            _ => None,
        };
        callee.into_iter().chain(self.operands.iter().filter_map(|op| match op {
            Operand::Function(f) => Some(*f),
            _ => None,
        }))
    }

    /// True if the result of `value` is consumed by this instruction.
    pub fn uses_value(&self, value: InstrId) -> bool {
        if let Some(Callee::Indirect(Operand::Value(v))) = self.callee {
            if v == value {
                return true;
            }
        }
        self.operands.iter().any(|op| *op == Operand::Value(value))
    }

    /// Instruction results this instruction reads, in operand order.
    pub fn value_operands(&self) -> impl Iterator<Item = InstrId> + '_ {
        let indirect = match self.callee {
            Some(Callee::Indirect(Operand::Value(v))) => Some(v),
            _ => None,
        };
        indirect.into_iter().chain(self.operands.iter().filter_map(|op| match op {
            Operand::Value(v) => Some(*v),
            _ => None,
        }))
    }
}

/// The complete program under transformation.
///
/// Functions and instructions live in two arenas indexed by their ids. Erasing an
/// object empties its slot; ids are never reused.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Module {
    pub name: String,
    functions: Vec<Option<Function>>,
    instructions: Vec<Option<Instruction>>,
}

impl Module {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into(), functions: Vec::new(), instructions: Vec::new() }
    }

    /// Adds a new, empty function. Names must be unique within the module.
    pub fn add_function(
        &mut self,
        name: impl Into<String>,
        ret: Type,
        params: Vec<Type>,
    ) -> Result<FunctionId, IrError> {
        let name = name.into();
        if self.function_by_name(&name).is_some() {
            return Err(IrError::DuplicateFunction(name));
        }
        let id = FunctionId(self.functions.len());
        self.functions.push(Some(Function { id, name, ret, params, body: Vec::new() }));
        Ok(id)
    }

    /// Returns the function called `name`, declaring it first if it does not exist.
    pub fn declare_function(&mut self, name: &str, ret: Type, params: Vec<Type>) -> FunctionId {
        if let Some(id) = self.function_by_name(name) {
            return id;
        }
        let id = FunctionId(self.functions.len());
        self.functions.push(Some(Function {
            id,
            name: name.to_string(),
            ret,
            params,
            body: Vec::new(),
        }));
        id
    }

    /// Appends `inst` to the end of `function`.
    pub fn push_instruction(
        &mut self,
        function: FunctionId,
        inst: Instruction,
    ) -> Result<InstrId, IrError> {
        let len = self.function(function).ok_or(IrError::MissingFunction(function))?.body.len();
        self.attach(function, len, inst)
    }

    /// Inserts `inst` directly after `anchor`, in the anchor's function.
    pub fn insert_after(&mut self, anchor: InstrId, inst: Instruction) -> Result<InstrId, IrError> {
        let function = self.instruction(anchor).ok_or(IrError::MissingInstruction(anchor))?.parent;
        let pos = self.position(anchor).ok_or(IrError::MissingInstruction(anchor))?;
        self.attach(function, pos + 1, inst)
    }

    /// Inserts `inst` directly before `anchor`, in the anchor's function.
    pub fn insert_before(
        &mut self,
        anchor: InstrId,
        inst: Instruction,
    ) -> Result<InstrId, IrError> {
        let function = self.instruction(anchor).ok_or(IrError::MissingInstruction(anchor))?.parent;
        let pos = self.position(anchor).ok_or(IrError::MissingInstruction(anchor))?;
        self.attach(function, pos, inst)
    }

    fn attach(
        &mut self,
        function: FunctionId,
        pos: usize,
        mut inst: Instruction,
    ) -> Result<InstrId, IrError> {
        self.validate(function, &inst)?;
        let id = InstrId(self.instructions.len());
        inst.id = id;
        inst.parent = function;
        self.instructions.push(Some(inst));
        let func = self.function_slot_mut(function)?;
        func.body.insert(pos, id);
        Ok(id)
    }

    /// Appends `inst` without checking its operands. Callers must run [`Module::verify`]
    /// once the function bodies are complete.
    pub(crate) fn push_unchecked(&mut self, function: FunctionId, mut inst: Instruction) -> InstrId {
        let id = InstrId(self.instructions.len());
        inst.id = id;
        inst.parent = function;
        self.instructions.push(Some(inst));
        if let Ok(func) = self.function_slot_mut(function) {
            func.body.push(id);
        }
        id
    }

    /// Checks every instruction's operands and callee against the rest of the module.
    pub fn verify(&self) -> Result<(), IrError> {
        for inst in self.all_instructions() {
            self.check_references(inst.parent, inst)?;
        }
        Ok(())
    }

    fn validate(&self, function: FunctionId, inst: &Instruction) -> Result<(), IrError> {
        let func = self.function(function).ok_or(IrError::MissingFunction(function))?;
        if let Some(name) = &inst.name {
            if self.instructions(function).any(|other| other.name.as_deref() == Some(name)) {
                return Err(IrError::DuplicateValue {
                    function: func.name.clone(),
                    name: name.clone(),
                });
            }
        }
        self.check_references(function, inst)
    }

    fn check_references(&self, function: FunctionId, inst: &Instruction) -> Result<(), IrError> {
        let func = self.function(function).ok_or(IrError::MissingFunction(function))?;
        for value in inst.value_operands() {
            match self.instruction(value) {
                Some(def) if def.parent == function => {}
                _ => {
                    return Err(IrError::InvalidOperand {
                        function: func.name.clone(),
                        operand: value.to_string(),
                    })
                }
            }
        }
        for op in &inst.operands {
            match op {
                Operand::Function(f) => {
                    self.function(*f).ok_or(IrError::MissingFunction(*f))?;
                }
                Operand::Param(n) if *n as usize >= func.params.len() => {
                    return Err(IrError::InvalidOperand {
                        function: func.name.clone(),
                        operand: format!("${n}"),
                    });
                }
                _ => {}
            }
        }

        match inst.callee {
            Some(Callee::Direct(callee)) => {
                let target = self.function(callee).ok_or(IrError::MissingFunction(callee))?;
                if target.ret != inst.ty {
                    return Err(IrError::CallTypeMismatch {
                        function: func.name.clone(),
                        callee: target.name.clone(),
                        expected: target.ret,
                        found: inst.ty,
                    });
                }
            }
            Some(Callee::Indirect(_)) => {}
            None if inst.is_call() => return Err(IrError::MissingCallee(func.name.clone())),
            None => {}
        }
        Ok(())
    }

    pub fn function(&self, id: FunctionId) -> Option<&Function> {
        self.functions.get(id.0).and_then(Option::as_ref)
    }

    fn function_slot_mut(&mut self, id: FunctionId) -> Result<&mut Function, IrError> {
        self.functions.get_mut(id.0).and_then(Option::as_mut).ok_or(IrError::MissingFunction(id))
    }

    pub fn function_by_name(&self, name: &str) -> Option<FunctionId> {
        self.functions().find(|f| f.name == name).map(|f| f.id)
    }

    /// Name of a function, or `<erased>` when the id no longer resolves.
    pub fn function_name(&self, id: FunctionId) -> &str {
        self.function(id).map(|f| f.name.as_str()).unwrap_or("<erased>")
    }

    /// Live functions in declaration order.
    pub fn functions(&self) -> impl Iterator<Item = &Function> {
        self.functions.iter().filter_map(Option::as_ref)
    }

    pub fn function_ids(&self) -> Vec<FunctionId> {
        self.functions().map(|f| f.id).collect()
    }

    pub fn function_count(&self) -> usize {
        self.functions().count()
    }

    pub fn instruction(&self, id: InstrId) -> Option<&Instruction> {
        self.instructions.get(id.0).and_then(Option::as_ref)
    }

    pub fn instruction_mut(&mut self, id: InstrId) -> Option<&mut Instruction> {
        self.instructions.get_mut(id.0).and_then(Option::as_mut)
    }

    /// Instructions of `function` in program order (empty if the function is gone).
    pub fn instructions(&self, function: FunctionId) -> impl Iterator<Item = &Instruction> {
        self.function(function)
            .map(|f| f.body.as_slice())
            .unwrap_or_default()
            .iter()
            .filter_map(move |id| self.instruction(*id))
    }

    /// Every live instruction, function by function in declaration order.
    pub fn all_instructions(&self) -> impl Iterator<Item = &Instruction> {
        self.functions()
            .flat_map(move |f| f.body.iter().filter_map(move |id| self.instruction(*id)))
    }

    pub fn instruction_count(&self) -> usize {
        self.all_instructions().count()
    }

    /// Index of `id` within its function's body.
    pub fn position(&self, id: InstrId) -> Option<usize> {
        let inst = self.instruction(id)?;
        self.function(inst.parent)?.body.iter().position(|i| *i == id)
    }

    /// Instructions that call `f` or take its address, in program order.
    pub fn references_to(&self, f: FunctionId) -> Vec<InstrId> {
        self.all_instructions().filter(|i| i.references_function(f)).map(|i| i.id).collect()
    }

    /// Instructions that consume the value produced by `value`.
    pub fn users_of(&self, value: InstrId) -> Vec<InstrId> {
        let Some(def) = self.instruction(value) else {
            return Vec::new();
        };
        self.instructions(def.parent).filter(|i| i.uses_value(value)).map(|i| i.id).collect()
    }

    /// Short, stable description of an instruction: `function:%name` for named values,
    /// `function#index` otherwise.
    pub fn describe(&self, id: InstrId) -> String {
        let Some(inst) = self.instruction(id) else {
            return format!("<erased {id}>");
        };
        let function = self.function_name(inst.parent);
        match &inst.name {
            Some(name) => format!("{function}:%{name}"),
            None => format!("{function}#{}", self.position(id).unwrap_or_default()),
        }
    }

    /// Removes a single instruction.
    ///
    /// Fails while another live instruction still consumes its value.
    pub fn erase_instruction(&mut self, id: InstrId) -> Result<Instruction, IrError> {
        let parent = self.instruction(id).ok_or(IrError::MissingInstruction(id))?.parent;
        let users = self.users_of(id).into_iter().filter(|u| *u != id).count();
        if users > 0 {
            return Err(IrError::ValueInUse {
                function: self.function_name(parent).to_string(),
                instruction: self.describe(id),
                users,
            });
        }
        self.function_slot_mut(parent)?.body.retain(|i| *i != id);
        self.instructions[id.0].take().ok_or(IrError::MissingInstruction(id))
    }

    /// Drops every instruction of `function`, leaving it as a declaration.
    ///
    /// Returns the number of instructions removed.
    pub fn clear_body(&mut self, function: FunctionId) -> Result<usize, IrError> {
        let body = std::mem::take(&mut self.function_slot_mut(function)?.body);
        for id in &body {
            self.instructions[id.0] = None;
        }
        Ok(body.len())
    }

    /// Removes `function` together with its body.
    ///
    /// Fails while an instruction outside the function still calls it or takes its address.
    pub fn erase_function(&mut self, function: FunctionId) -> Result<Function, IrError> {
        let func = self.function(function).ok_or(IrError::MissingFunction(function))?;
        let references = self
            .references_to(function)
            .into_iter()
            .filter(|r| self.instruction(*r).is_some_and(|i| i.parent != function))
            .count();
        if references > 0 {
            return Err(IrError::FunctionInUse { function: func.name.clone(), references });
        }
        self.clear_body(function)?;
        self.functions[function.0].take().ok_or(IrError::MissingFunction(function))
    }
}
