use crate::bytecode::codegen_error::CodegenError;
use crate::bytecode::isa::MAX_MEMORY_OFFSET;
use crate::lang::node::{Builtin, Function, Logic, Node, Operator};

/// Frame pointer. Locals and parameters live at `[rcx+slot]`.
pub const FRAME_REGISTER: &str = "rcx";
/// Scratch register for console I/O.
pub const SCRATCH_REGISTER: &str = "rax";
/// Sink for values nobody reads.
pub const DISCARD_REGISTER: &str = "rbx";

/// Which function body is being generated.
#[derive(Debug, Clone, Copy)]
struct Scope {
    /// Slots of the current activation frame (0 for global initializers).
    frame_size: usize,
    is_main: bool,
}

/// Lowers a parsed program to stack-machine assembly text.
///
/// Layout of the output:
///
/// ```text
/// push <globals>      ; frame pointer starts above the global slots
/// pop rcx
/// <global initializers>
/// jmp func_0
/// :call_<id>          ; one block per user function
/// pop [rcx+<param>]   ; arguments, last one first
/// :func_<id>
/// <initializers> <body> push 0 ret
/// :func_0
/// <main initializers> <main body> end
/// ```
///
/// Calls advance `rcx` past the caller's frame before `call` and restore it
/// afterwards, so every activation owns a disjoint block of memory.
pub struct CodeGenerator {
    lines: Vec<String>,
    next_label: usize,
    scope: Scope,
}

impl Default for CodeGenerator {
    fn default() -> Self {
        Self::new()
    }
}

impl CodeGenerator {
    pub fn new() -> Self {
        Self {
            lines: Vec::new(),
            next_label: 0,
            scope: Scope {
                frame_size: 0,
                is_main: false,
            },
        }
    }

    /// Generates assembly for a whole program.
    ///
    /// # Errors
    /// [`CodegenError::UnknownNodeKind`] if a node shows up where it has no
    /// lowering rule, [`CodegenError::SlotOutOfRange`] if a slot does not fit
    /// a memory offset.
    pub fn compile_program(mut self, root: &Node) -> Result<String, CodegenError> {
        let Node::Root {
            globals,
            init,
            functions,
            main,
        } = root
        else {
            return Err(CodegenError::unknown(root, "program root"));
        };

        self.emit(format!("push {}", globals.len()));
        self.emit(format!("pop {}", FRAME_REGISTER));
        self.compile_init_block(init)?;
        self.emit("jmp func_0");

        let Node::FunctionTable(table) = functions.as_ref() else {
            return Err(CodegenError::unknown(functions, "function table position"));
        };
        for node in table {
            match node {
                Node::UserFunctionDecl(f) => self.compile_function(f)?,
                other => return Err(CodegenError::unknown(other, "function table")),
            }
        }

        match main.as_ref() {
            Node::MainFunction(f) => self.compile_main(f)?,
            other => return Err(CodegenError::unknown(other, "main position")),
        }

        let mut text = self.lines.join("\n");
        text.push('\n');
        Ok(text)
    }

    fn emit(&mut self, line: impl Into<String>) {
        self.lines.push(line.into());
    }

    fn emit_label(&mut self, label: &str) {
        self.lines.push(format!(":{}", label));
    }

    fn fresh_label(&mut self) -> usize {
        let n = self.next_label;
        self.next_label += 1;
        n
    }

    // ============================================================
    // Functions
    // ============================================================

    fn compile_function(&mut self, f: &Function) -> Result<(), CodegenError> {
        self.emit_label(&format!("call_{}", f.id));
        for slot in (0..f.params.len()).rev() {
            let addr = frame_address(slot)?;
            self.emit(format!("pop {}", addr));
        }
        self.emit_label(&format!("func_{}", f.id));

        self.scope = Scope {
            frame_size: f.frame_size(),
            is_main: false,
        };
        self.compile_init_block(&f.init)?;
        self.compile_body(&f.body)?;
        self.emit("push 0");
        self.emit("ret");
        Ok(())
    }

    fn compile_main(&mut self, f: &Function) -> Result<(), CodegenError> {
        self.emit_label("func_0");
        self.scope = Scope {
            frame_size: f.frame_size(),
            is_main: true,
        };
        self.compile_init_block(&f.init)?;
        self.compile_body(&f.body)?;
        self.emit("end");
        Ok(())
    }

    fn compile_init_block(&mut self, node: &Node) -> Result<(), CodegenError> {
        let Node::VarInitBlock(inits) = node else {
            return Err(CodegenError::unknown(node, "initializer position"));
        };
        for init in inits {
            match init {
                Node::Operator {
                    op: Operator::Assign,
                    operands,
                } => self.compile_assignment(Operator::Assign, operands)?,
                other => return Err(CodegenError::unknown(other, "initializer block")),
            }
        }
        Ok(())
    }

    // ============================================================
    // Statements
    // ============================================================

    fn compile_body(&mut self, body: &[Node]) -> Result<(), CodegenError> {
        for stmt in body {
            self.compile_statement(stmt)?;
        }
        Ok(())
    }

    fn compile_statement(&mut self, node: &Node) -> Result<(), CodegenError> {
        match node {
            Node::Operator { op, operands } if op.is_assignment() => {
                self.compile_assignment(*op, operands)
            }
            Node::BuiltinCall {
                builtin: Builtin::Print,
                args,
            } => {
                let [value] = args.as_slice() else {
                    return Err(CodegenError::unknown(node, "print with wrong arity"));
                };
                self.compile_expr(value)?;
                self.emit(format!("pop {}", SCRATCH_REGISTER));
                self.emit(format!("out {}", SCRATCH_REGISTER));
                Ok(())
            }
            Node::BuiltinCall {
                builtin: Builtin::Scan,
                args,
            } => {
                let [target] = args.as_slice() else {
                    return Err(CodegenError::unknown(node, "scan with wrong arity"));
                };
                let addr = variable_address(target)?;
                self.emit(format!("in {}", SCRATCH_REGISTER));
                self.emit(format!("move {} {}", SCRATCH_REGISTER, addr));
                Ok(())
            }
            Node::BuiltinCall {
                builtin: Builtin::Call(_),
                ..
            } => {
                self.compile_expr(node)?;
                self.emit(format!("pop {}", DISCARD_REGISTER));
                Ok(())
            }
            Node::Logic(Logic::If {
                cond,
                then_body,
                else_body,
            }) => {
                let n = self.fresh_label();
                self.compile_expr(cond)?;
                self.emit("push 0");
                self.emit(format!("je if_{}_else", n));
                self.compile_body(then_body)?;
                self.emit(format!("jmp if_{}_end", n));
                self.emit_label(&format!("if_{}_else", n));
                if let Some(body) = else_body {
                    self.compile_body(body)?;
                }
                self.emit_label(&format!("if_{}_end", n));
                Ok(())
            }
            Node::Logic(Logic::While { cond, body }) => {
                let n = self.fresh_label();
                self.emit_label(&format!("while_{}", n));
                self.compile_expr(cond)?;
                self.emit("push 0");
                self.emit(format!("je while_{}_end", n));
                self.compile_body(body)?;
                self.emit(format!("jmp while_{}", n));
                self.emit_label(&format!("while_{}_end", n));
                Ok(())
            }
            Node::Return(value) => {
                match value {
                    Some(expr) => self.compile_expr(expr)?,
                    None if !self.scope.is_main => self.emit("push 0"),
                    None => {}
                }
                self.emit(if self.scope.is_main { "end" } else { "ret" });
                Ok(())
            }
            other => Err(CodegenError::unknown(other, "statement position")),
        }
    }

    /// `x = e` pops `e` into `x`; `x op= e` computes `x op e` first.
    fn compile_assignment(&mut self, op: Operator, operands: &[Node]) -> Result<(), CodegenError> {
        let [target, value] = operands else {
            return Err(CodegenError::UnknownNodeKind {
                node_type: "Operator",
                position: "assignment with wrong arity",
            });
        };
        let addr = variable_address(target)?;

        match op.compound_base() {
            Some(base) => {
                self.emit(format!("push {}", addr));
                self.compile_expr(value)?;
                self.emit(arithmetic_mnemonic(base).unwrap_or("add"));
            }
            None => self.compile_expr(value)?,
        }
        self.emit(format!("pop {}", addr));
        Ok(())
    }

    // ============================================================
    // Expressions
    // ============================================================

    /// Emits code leaving exactly one value on the operand stack.
    fn compile_expr(&mut self, node: &Node) -> Result<(), CodegenError> {
        match node {
            Node::NumberLiteral(v) => {
                self.emit(format!("push {}", v));
                Ok(())
            }
            Node::GlobalVarRef(_) | Node::LocalVarRef(_) | Node::ParamRef(_) => {
                let addr = variable_address(node)?;
                self.emit(format!("push {}", addr));
                Ok(())
            }
            Node::Operator { op, operands } => self.compile_operator(node, *op, operands),
            Node::BuiltinCall { builtin, args } => match builtin {
                Builtin::Sin | Builtin::Cos | Builtin::Sqrt => {
                    let [arg] = args.as_slice() else {
                        return Err(CodegenError::unknown(node, "builtin with wrong arity"));
                    };
                    self.compile_expr(arg)?;
                    self.emit(builtin.name());
                    Ok(())
                }
                Builtin::Call(id) => {
                    for arg in args {
                        self.compile_expr(arg)?;
                    }
                    self.compile_call(*id);
                    Ok(())
                }
                Builtin::Scan | Builtin::Print => {
                    Err(CodegenError::unknown(node, "expression position"))
                }
            },
            other => Err(CodegenError::unknown(other, "expression position")),
        }
    }

    /// Calls `call_<id>` with the frame pointer moved past the current frame.
    fn compile_call(&mut self, id: usize) {
        let frame = self.scope.frame_size;
        if frame > 0 {
            self.shift_frame(frame, "add");
        }
        self.emit(format!("call call_{}", id));
        if frame > 0 {
            self.shift_frame(frame, "sub");
        }
    }

    fn shift_frame(&mut self, by: usize, mnemonic: &str) {
        self.emit(format!("push {}", FRAME_REGISTER));
        self.emit(format!("push {}", by));
        self.emit(mnemonic);
        self.emit(format!("pop {}", FRAME_REGISTER));
    }

    fn compile_operator(
        &mut self,
        node: &Node,
        op: Operator,
        operands: &[Node],
    ) -> Result<(), CodegenError> {
        match (op, operands) {
            (Operator::Minus, [operand]) => {
                self.emit("push 0");
                self.compile_expr(operand)?;
                self.emit("sub");
                Ok(())
            }
            (Operator::Not, [operand]) => {
                self.compile_expr(operand)?;
                self.emit("push 0");
                self.emit_select("je", 1.0);
                Ok(())
            }
            (Operator::And, [lhs, rhs]) => {
                let n = self.fresh_label();
                for side in [lhs, rhs] {
                    self.compile_expr(side)?;
                    self.emit("push 0");
                    self.emit(format!("je and_{}_false", n));
                }
                self.emit("push 1");
                self.emit(format!("jmp and_{}_end", n));
                self.emit_label(&format!("and_{}_false", n));
                self.emit("push 0");
                self.emit_label(&format!("and_{}_end", n));
                Ok(())
            }
            (Operator::Or, [lhs, rhs]) => {
                let n = self.fresh_label();
                for side in [lhs, rhs] {
                    self.compile_expr(side)?;
                    self.emit("push 0");
                    self.emit(format!("jne or_{}_true", n));
                }
                self.emit("push 0");
                self.emit(format!("jmp or_{}_end", n));
                self.emit_label(&format!("or_{}_true", n));
                self.emit("push 1");
                self.emit_label(&format!("or_{}_end", n));
                Ok(())
            }
            (_, [lhs, rhs]) if !op.is_assignment() => {
                self.compile_expr(lhs)?;
                self.compile_expr(rhs)?;
                if let Some(mnemonic) = arithmetic_mnemonic(op) {
                    self.emit(mnemonic);
                    return Ok(());
                }
                // a > b is !(a <= b) and a >= b is !(a < b).
                match op {
                    Operator::Equal => self.emit_select("je", 1.0),
                    Operator::NotEqual => self.emit_select("jne", 1.0),
                    Operator::Lower => self.emit_select("jl", 1.0),
                    Operator::NotGreater => self.emit_select("jle", 1.0),
                    Operator::Greater => self.emit_select("jle", 0.0),
                    Operator::NotLower => self.emit_select("jl", 0.0),
                    _ => return Err(CodegenError::unknown(node, "binary operator position")),
                }
                Ok(())
            }
            _ => Err(CodegenError::unknown(node, "expression position")),
        }
    }

    /// Consumes the two values a conditional jump compares and pushes
    /// `taken` if the jump fires, `1 - taken` otherwise.
    fn emit_select(&mut self, jump: &str, taken: f64) {
        let n = self.fresh_label();
        self.emit(format!("{} cmp_{}_taken", jump, n));
        self.emit(format!("push {}", 1.0 - taken));
        self.emit(format!("jmp cmp_{}_end", n));
        self.emit_label(&format!("cmp_{}_taken", n));
        self.emit(format!("push {}", taken));
        self.emit_label(&format!("cmp_{}_end", n));
    }
}

fn arithmetic_mnemonic(op: Operator) -> Option<&'static str> {
    match op {
        Operator::Plus => Some("add"),
        Operator::Minus => Some("sub"),
        Operator::Multiply => Some("mul"),
        Operator::Divide => Some("div"),
        _ => None,
    }
}

fn check_slot(slot: usize) -> Result<usize, CodegenError> {
    if slot > MAX_MEMORY_OFFSET as usize {
        return Err(CodegenError::SlotOutOfRange { slot });
    }
    Ok(slot)
}

fn frame_address(slot: usize) -> Result<String, CodegenError> {
    Ok(format!("[{}+{}]", FRAME_REGISTER, check_slot(slot)?))
}

/// Memory operand text for a variable reference.
fn variable_address(node: &Node) -> Result<String, CodegenError> {
    match node {
        Node::GlobalVarRef(slot) => Ok(format!("[{}]", check_slot(*slot)?)),
        Node::LocalVarRef(slot) | Node::ParamRef(slot) => frame_address(*slot),
        other => Err(CodegenError::unknown(other, "assignment target position")),
    }
}

/// Convenience wrapper around [`CodeGenerator::compile_program`].
pub fn generate(root: &Node) -> Result<String, CodegenError> {
    CodeGenerator::new().compile_program(root)
}
