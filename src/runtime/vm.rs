use crate::bytecode::encoding::{CorruptBytecode, validate};
use crate::bytecode::isa::{Instruction, Opcode, Operand, Program, REGISTER_COUNT};
use crate::runtime::console::{Console, ReadOutcome};
use crate::runtime::memory::Memory;
use crate::runtime::runtime_error::{Limit, VmError};
use std::io::{BufRead, Write};

#[derive(Debug, Clone)]
pub struct VmConfig {
    /// Number of memory cells.
    pub memory_size: usize,
    pub max_call_depth: usize,
    pub max_stack_size: usize,
    /// `None` runs until the program stops on its own.
    pub max_steps: Option<usize>,
}

impl Default for VmConfig {
    fn default() -> Self {
        VmConfig {
            memory_size: 1_000_000,
            max_call_depth: 10_000,
            max_stack_size: 100_000,
            max_steps: None,
        }
    }
}

impl VmConfig {
    pub fn memory_size(mut self, cells: usize) -> Self {
        self.memory_size = cells;
        self
    }

    pub fn max_call_depth(mut self, depth: usize) -> Self {
        self.max_call_depth = depth;
        self
    }

    pub fn max_stack_size(mut self, size: usize) -> Self {
        self.max_stack_size = size;
        self
    }

    pub fn max_steps(mut self, steps: Option<usize>) -> Self {
        self.max_steps = steps;
        self
    }
}

/// Register and stack machine executing an assembled [`Program`].
///
/// State: sixteen numeric registers, an operand stack, a call stack of
/// return addresses and a flat memory. Console I/O goes through the injected
/// reader and writer.
pub struct Vm<R: BufRead, W: Write> {
    registers: [f64; REGISTER_COUNT],
    stack: Vec<f64>,
    call_stack: Vec<usize>,
    memory: Memory,
    console: Console<R, W>,
    // Safety limits
    config: VmConfig,
    ip: usize,
    steps: usize,
}

impl<R: BufRead, W: Write> Vm<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self::with_config(VmConfig::default(), input, output)
    }

    pub fn with_config(config: VmConfig, input: R, output: W) -> Self {
        Self {
            registers: [0.0; REGISTER_COUNT],
            stack: Vec::new(),
            call_stack: Vec::new(),
            memory: Memory::new(config.memory_size),
            console: Console::new(input, output),
            config,
            ip: 0,
            steps: 0,
        }
    }

    pub fn stack(&self) -> &[f64] {
        &self.stack
    }

    pub fn registers(&self) -> &[f64] {
        &self.registers
    }

    pub fn memory(&self) -> &Memory {
        &self.memory
    }

    /// Index of the next instruction to execute.
    pub fn ip(&self) -> usize {
        self.ip
    }

    pub fn into_output(self) -> W {
        self.console.into_output()
    }

    pub fn reset_execution_state(&mut self) {
        self.registers = [0.0; REGISTER_COUNT];
        self.stack.clear();
        self.call_stack.clear();
        self.memory = Memory::new(self.config.memory_size);
        self.ip = 0;
        self.steps = 0;
    }

    /// Validates and runs `program` from instruction 0 until it stops.
    ///
    /// The program stops on `end` or when execution falls past the last
    /// instruction; either way the completion line is written.
    pub fn run(&mut self, program: &Program) -> Result<(), VmError> {
        validate(program)?;
        self.reset_execution_state();

        while self.ip < program.len() {
            self.check_limits()?;
            let instr = &program.instructions[self.ip];
            self.step(instr, program.len())?;
        }

        crate::info!("executed {} instructions", self.steps);
        self.console.write_finished()?;
        Ok(())
    }

    // Execution

    fn check_limits(&mut self) -> Result<(), VmError> {
        self.steps += 1;

        if let Some(max) = self.config.max_steps {
            if self.steps > max {
                return Err(self.limit(Limit::Steps(max)));
            }
        }

        if self.stack.len() > self.config.max_stack_size {
            return Err(self.limit(Limit::StackSize(self.config.max_stack_size)));
        }

        Ok(())
    }

    fn limit(&self, limit: Limit) -> VmError {
        VmError::LimitExceeded { ip: self.ip, limit }
    }

    fn step(&mut self, instr: &Instruction, len: usize) -> Result<(), VmError> {
        let ip = self.ip;
        let mut next = ip + 1;

        match instr.opcode {
            Opcode::Push => {
                let value = self.load(self.operand(instr)?)?;
                self.stack.push(value);
            }
            Opcode::Pop => {
                let value = self.pop("pop")?;
                self.store(self.operand(instr)?, value)?;
            }
            Opcode::Add => self.binary("add", |a, b| a + b)?,
            Opcode::Sub => self.binary("sub", |a, b| a - b)?,
            Opcode::Mul => self.binary("mul", |a, b| a * b)?,
            Opcode::Div => {
                let b = self.pop("div")?;
                let a = self.pop("div")?;
                if b == 0.0 {
                    self.stack.push(a);
                    self.stack.push(b);
                    return Err(VmError::DivisionByZero { ip });
                }
                self.stack.push(a / b);
            }
            Opcode::Sqrt => {
                let a = self.pop("sqrt")?;
                if a < 0.0 {
                    self.stack.push(a);
                    return Err(VmError::Domain {
                        ip,
                        op: "sqrt",
                        value: a,
                    });
                }
                self.stack.push(a.sqrt());
            }
            Opcode::Sin => self.unary("sin", f64::sin)?,
            Opcode::Cos => self.unary("cos", f64::cos)?,
            Opcode::Dup => {
                let a = self.pop("dup")?;
                self.stack.push(a);
                self.stack.push(a);
            }
            Opcode::In => {
                let dst = self.operand(instr)?;
                let value = match self.console.read_value()? {
                    ReadOutcome::Value(v) => v,
                    ReadOutcome::Exhausted => return Err(VmError::InputExhausted { ip }),
                    ReadOutcome::Invalid(token) => {
                        return Err(VmError::InvalidInput { ip, token });
                    }
                };
                self.store(dst, value)?;
            }
            Opcode::Out => {
                let value = self.load(self.operand(instr)?)?;
                self.console.write_value(value)?;
            }
            Opcode::End => next = len,
            Opcode::Jmp => next = self.target(instr)?,
            Opcode::Call => {
                if self.call_stack.len() >= self.config.max_call_depth {
                    return Err(self.limit(Limit::CallDepth(self.config.max_call_depth)));
                }
                self.call_stack.push(ip);
                next = self.target(instr)?;
            }
            Opcode::Je | Opcode::Jne | Opcode::Jl | Opcode::Jle => {
                let name = instr.opcode.mnemonic();
                let b = self.pop(name)?;
                let a = self.pop(name)?;
                let taken = match instr.opcode {
                    Opcode::Je => a == b,
                    Opcode::Jne => a != b,
                    Opcode::Jl => a < b,
                    _ => a <= b,
                };
                if taken {
                    next = self.target(instr)?;
                }
            }
            Opcode::Ret => {
                let addr = self
                    .call_stack
                    .pop()
                    .ok_or(VmError::ReturnWithoutCall { ip })?;
                next = addr + 1;
            }
        }

        self.ip = next;
        Ok(())
    }

    fn operand(&self, instr: &Instruction) -> Result<Operand, VmError> {
        instr
            .operands
            .first()
            .copied()
            .ok_or_else(|| CorruptBytecode::new(self.ip, "missing operand").into())
    }

    fn target(&self, instr: &Instruction) -> Result<usize, VmError> {
        instr
            .jump_target()
            .ok_or_else(|| CorruptBytecode::new(self.ip, "invalid jump target").into())
    }

    fn address(&self, reg: u8, offset: i32) -> f64 {
        self.registers[reg as usize] + offset as f64
    }

    fn load(&self, operand: Operand) -> Result<f64, VmError> {
        match operand {
            Operand::Immediate(v) => Ok(v),
            Operand::Register(r) => Ok(self.registers[r as usize]),
            Operand::Memory { reg, offset } => self.memory.read(self.address(reg, offset), self.ip),
        }
    }

    fn store(&mut self, operand: Operand, value: f64) -> Result<(), VmError> {
        match operand {
            Operand::Register(r) => {
                self.registers[r as usize] = value;
                Ok(())
            }
            Operand::Memory { reg, offset } => {
                let address = self.address(reg, offset);
                self.memory.write(address, value, self.ip)
            }
            Operand::Immediate(_) => {
                Err(CorruptBytecode::new(self.ip, "cannot store into an immediate").into())
            }
        }
    }

    fn pop(&mut self, op: &'static str) -> Result<f64, VmError> {
        self.stack
            .pop()
            .ok_or(VmError::StackUnderflow { ip: self.ip, op })
    }

    fn binary(&mut self, op: &'static str, f: impl Fn(f64, f64) -> f64) -> Result<(), VmError> {
        let b = self.pop(op)?;
        let a = self.pop(op)?;
        self.stack.push(f(a, b));
        Ok(())
    }

    fn unary(&mut self, op: &'static str, f: impl Fn(f64) -> f64) -> Result<(), VmError> {
        let a = self.pop(op)?;
        self.stack.push(f(a));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bytecode::assembler::assemble;

    // ============================================================
    // Helpers
    // ============================================================

    struct Outcome {
        result: Result<(), VmError>,
        stack: Vec<f64>,
        registers: Vec<f64>,
        output: String,
    }

    fn run_asm_with(src: &str, input: &str, config: VmConfig) -> Outcome {
        let program = assemble(src).expect("assembly should succeed");
        let mut vm = Vm::with_config(config, input.as_bytes(), Vec::new());
        let result = vm.run(&program);
        let stack = vm.stack().to_vec();
        let registers = vm.registers().to_vec();
        let output = String::from_utf8(vm.into_output()).unwrap();
        Outcome {
            result,
            stack,
            registers,
            output,
        }
    }

    fn run_asm(src: &str, input: &str) -> Outcome {
        run_asm_with(src, input, VmConfig::default().memory_size(64))
    }

    fn assert_stack(src: &str, expected: &[f64]) {
        let outcome = run_asm(src, "");
        assert!(outcome.result.is_ok(), "{:?}", outcome.result);
        assert_eq!(outcome.stack, expected);
    }

    fn assert_error(src: &str, category: &str) {
        let outcome = run_asm(src, "");
        match outcome.result {
            Err(e) => assert_eq!(e.category(), category, "{}", e),
            Ok(()) => panic!("expected {}, program succeeded", category),
        }
    }

    // ============================================================
    // Arithmetic
    // ============================================================

    #[test]
    fn arithmetic_pops_b_then_a() {
        assert_stack("push 10\npush 4\nsub", &[6.0]);
        assert_stack("push 10\npush 4\ndiv", &[2.5]);
        assert_stack("push 3\npush 4\nadd\npush 2\nmul", &[14.0]);
    }

    #[test]
    fn division_by_zero_keeps_operands() {
        let outcome = run_asm("push 7\npush 0\ndiv", "");
        assert!(matches!(outcome.result, Err(VmError::DivisionByZero { ip: 2 })));
        assert_eq!(outcome.stack, vec![7.0, 0.0]);
    }

    #[test]
    fn sqrt_and_trig() {
        assert_stack("push 9\nsqrt", &[3.0]);
        assert_stack("push 0\nsin\npush 0\ncos", &[0.0, 1.0]);
        assert_error("push -1\nsqrt", "DomainError");
    }

    #[test]
    fn dup_pushes_twice() {
        assert_stack("push 5\ndup", &[5.0, 5.0]);
    }

    #[test]
    fn underflow() {
        assert_error("add", "StackUnderflowError");
        assert_error("push 1\n:l\nje l", "StackUnderflowError");
        assert_error("pop rax", "StackUnderflowError");
    }

    // ============================================================
    // Registers and memory
    // ============================================================

    #[test]
    fn registers_and_memory() {
        let outcome = run_asm("push 5\npop rcx\npush 2\npop [rcx+1]\npush [6]\npop r9", "");
        assert!(outcome.result.is_ok());
        assert_eq!(outcome.registers[3], 5.0);
        assert_eq!(outcome.registers[9], 2.0);
    }

    #[test]
    fn memory_bounds() {
        assert_error("push [64]", "OutOfRangeError");
        assert_error("push -1\npop rax\npush [rax]", "OutOfRangeError");
        assert_error("push 0.5\npop rax\npush 1\npop [rax]", "OutOfRangeError");
    }

    // ============================================================
    // Control flow
    // ============================================================

    #[test]
    fn conditional_jumps() {
        let src = "push 1\npush 2\njl yes\npush 0\nend\n:yes\npush 1";
        assert_stack(src, &[1.0]);
        let src = "push 2\npush 2\njle yes\npush 0\nend\n:yes\npush 1";
        assert_stack(src, &[1.0]);
        let src = "push 2\npush 2\njne yes\npush 0\nend\n:yes\npush 1";
        assert_stack(src, &[0.0]);
    }

    #[test]
    fn call_and_ret() {
        let src = "call f\npush 2\nend\n:f\npush 1\nret";
        assert_stack(src, &[1.0, 2.0]);
    }

    #[test]
    fn ret_without_call() {
        assert_error("ret", "ReturnWithoutCallError");
    }

    #[test]
    fn jump_to_end_terminates() {
        let outcome = run_asm("jmp out\npush 1\n:out", "");
        assert!(outcome.result.is_ok());
        assert!(outcome.stack.is_empty());
        assert_eq!(outcome.output, "# processor: execution is finished\n");
    }

    #[test]
    fn end_stops_immediately() {
        assert_stack("push 1\nend\npush 2", &[1.0]);
    }

    // ============================================================
    // Console
    // ============================================================

    #[test]
    fn in_and_out() {
        let outcome = run_asm("in rax\nout rax\nin [3]\nout [3]\nout 7", "1.5\n-2");
        assert!(outcome.result.is_ok());
        assert_eq!(
            outcome.output,
            "# enter a value, please\n# console out: 1.5\n\
             # enter a value, please\n# console out: -2\n\
             # console out: 7\n# processor: execution is finished\n"
        );
    }

    #[test]
    fn input_errors() {
        let outcome = run_asm("in rax", "");
        assert!(matches!(outcome.result, Err(VmError::InputExhausted { ip: 0 })));
        let outcome = run_asm("in rax", "x1");
        assert!(matches!(outcome.result, Err(VmError::InvalidInput { .. })));
    }

    // ============================================================
    // Limits
    // ============================================================

    #[test]
    fn step_limit() {
        let config = VmConfig::default().memory_size(8).max_steps(Some(100));
        let outcome = run_asm_with(":loop\njmp loop", "", config);
        assert!(matches!(
            outcome.result,
            Err(VmError::LimitExceeded {
                limit: Limit::Steps(100),
                ..
            })
        ));
    }

    #[test]
    fn call_depth_limit() {
        let config = VmConfig::default().memory_size(8).max_call_depth(16);
        let outcome = run_asm_with(":f\ncall f", "", config);
        assert!(matches!(
            outcome.result,
            Err(VmError::LimitExceeded {
                limit: Limit::CallDepth(16),
                ..
            })
        ));
    }

    #[test]
    fn stack_limit() {
        let config = VmConfig::default().memory_size(8).max_stack_size(32);
        let outcome = run_asm_with(":f\npush 1\njmp f", "", config);
        assert!(matches!(
            outcome.result,
            Err(VmError::LimitExceeded {
                limit: Limit::StackSize(32),
                ..
            })
        ));
    }

    #[test]
    fn corrupt_program_is_rejected_before_running() {
        let program = Program {
            instructions: vec![
                Instruction::new(Opcode::Out, vec![Operand::Immediate(1.0)]),
                Instruction::new(Opcode::Jmp, vec![Operand::Immediate(9.0)]),
            ],
        };
        let mut vm = Vm::new("".as_bytes(), Vec::new());
        let err = vm.run(&program).unwrap_err();
        assert_eq!(err.category(), "CorruptBytecodeError");
        assert!(vm.into_output().is_empty());
    }

    #[test]
    fn state_resets_between_runs() {
        let program = assemble("push 1\npush 4\npop rax").unwrap();
        let mut vm = Vm::with_config(VmConfig::default().memory_size(4), "".as_bytes(), Vec::new());
        vm.run(&program).unwrap();
        vm.run(&program).unwrap();
        assert_eq!(vm.stack(), &[1.0]);
        assert_eq!(vm.ip(), 3);
    }

    #[test]
    fn repeated_runs_leave_identical_state() {
        let asm = crate::pipeline::compile_to_asm(
            "var g = 2; \
             func f(n) lol var t = n * g; if (n > 0) lol g += f(n - 1); kek return t; kek \
             main() lol var x; scan(x); print(f(x) + sqrt(g)); kek",
        )
        .unwrap();
        let program = assemble(&asm).unwrap();

        let run_once = || {
            let config = VmConfig::default().memory_size(256);
            let mut vm = Vm::with_config(config, "4".as_bytes(), Vec::new());
            vm.run(&program).unwrap();
            let registers = vm.registers().to_vec();
            let cells = vm.memory().cells().to_vec();
            let stack = vm.stack().to_vec();
            (registers, cells, stack, vm.into_output())
        };

        let first = run_once();
        let second = run_once();
        assert_eq!(first.0, second.0);
        assert_eq!(first.1, second.1);
        assert_eq!(first.2, second.2);
        assert_eq!(first.3, second.3);
        assert_ne!(first.1, vec![0.0; 256]);
    }
}
