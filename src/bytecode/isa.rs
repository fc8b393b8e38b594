//! Instruction table.
//!
//! [`define_instructions!`] holds the canonical instruction definitions and
//! generates the [`Opcode`] enum together with its decoding and metadata
//! lookups. The assembler, the encoder, the disassembler and the VM all read
//! the same table.
//!
//! Operand masks combine [`IMM`], [`REG`] and [`MEM`]. Jump-family
//! instructions take a single immediate holding the target instruction index.

use std::fmt;

/// Operand may be an immediate value.
pub const IMM: u8 = 1;
/// Operand may be a register.
pub const REG: u8 = 2;
/// Operand may be a memory reference.
pub const MEM: u8 = 4;

pub const REGISTER_COUNT: usize = 16;
pub const MAX_OPERANDS: usize = 2;
/// Memory offsets share an encoded value with the register id and get 8 bits.
pub const MAX_MEMORY_OFFSET: i32 = 0xFF;

macro_rules! define_instructions {
    (
        $(
            $(#[$doc:meta])*
            $name:ident = $opcode:literal, $mnemonic:literal => [$argc:literal, $mask:expr]
        ),* $(,)?
    ) => {
        #[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
        #[repr(u8)]
        pub enum Opcode {
            $(
                $(#[$doc])*
                $name = $opcode,
            )*
        }

        impl TryFrom<u8> for Opcode {
            type Error = u8;

            fn try_from(value: u8) -> Result<Self, Self::Error> {
                match value {
                    $( $opcode => Ok(Opcode::$name), )*
                    other => Err(other),
                }
            }
        }

        impl Opcode {
            pub const ALL: &'static [Opcode] = &[$( Opcode::$name, )*];

            /// Returns the assembly mnemonic for this instruction.
            pub const fn mnemonic(&self) -> &'static str {
                match self {
                    $( Opcode::$name => $mnemonic, )*
                }
            }

            pub const fn operand_count(&self) -> usize {
                match self {
                    $( Opcode::$name => $argc, )*
                }
            }

            pub const fn operand_mask(&self) -> u8 {
                match self {
                    $( Opcode::$name => $mask, )*
                }
            }

            pub fn from_mnemonic(name: &str) -> Option<Opcode> {
                match name {
                    $( $mnemonic => Some(Opcode::$name), )*
                    _ => None,
                }
            }
        }
    };
}

define_instructions! {
    // =========================
    // Data movement
    // =========================
    /// push src ; stack <- src
    Push = 1, "push" => [1, IMM | REG | MEM],
    /// pop dst ; dst <- stack
    Pop = 2, "pop" => [1, REG | MEM],
    // =========================
    // Arithmetic (pop b, pop a, push a OP b)
    // =========================
    Add = 3, "add" => [0, 0],
    Sub = 4, "sub" => [0, 0],
    Mul = 5, "mul" => [0, 0],
    /// Traps on division by exactly zero.
    Div = 6, "div" => [0, 0],
    /// Traps on negative input.
    Sqrt = 7, "sqrt" => [0, 0],
    /// dup ; pop x, push x, push x
    Dup = 8, "dup" => [0, 0],
    // =========================
    // Console
    // =========================
    /// in dst ; dst <- number read from input
    In = 9, "in" => [1, REG | MEM],
    /// out src ; write src to output
    Out = 10, "out" => [1, IMM | REG | MEM],
    // =========================
    // Control flow
    // =========================
    /// end ; stop execution
    End = 11, "end" => [0, 0],
    Jmp = 12, "jmp" => [1, IMM],
    /// call target ; push ip, jump
    Call = 13, "call" => [1, IMM],
    /// pop b, pop a, jump if a == b
    Je = 14, "je" => [1, IMM],
    /// pop b, pop a, jump if a != b
    Jne = 15, "jne" => [1, IMM],
    /// pop b, pop a, jump if a < b
    Jl = 16, "jl" => [1, IMM],
    /// pop b, pop a, jump if a <= b
    Jle = 17, "jle" => [1, IMM],
    /// ret ; ip <- popped return address + 1
    Ret = 18, "ret" => [0, 0],
    // =========================
    // Trigonometry
    // =========================
    Sin = 19, "sin" => [0, 0],
    Cos = 20, "cos" => [0, 0],
}

impl Opcode {
    /// Instructions whose only operand is a label reference.
    pub const fn is_jump(&self) -> bool {
        matches!(
            self,
            Opcode::Jmp | Opcode::Call | Opcode::Je | Opcode::Jne | Opcode::Jl | Opcode::Jle
        )
    }
}

impl fmt::Display for Opcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.mnemonic())
    }
}

/// Instruction operand with its addressing mode.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Operand {
    Immediate(f64),
    Register(u8),
    /// Memory cell at `register value + offset`.
    Memory { reg: u8, offset: i32 },
}

impl Operand {
    /// The mask bit this operand kind needs.
    pub const fn kind_bit(&self) -> u8 {
        match self {
            Operand::Immediate(_) => IMM,
            Operand::Register(_) => REG,
            Operand::Memory { .. } => MEM,
        }
    }

    pub const fn kind_name(&self) -> &'static str {
        match self {
            Operand::Immediate(_) => "immediate",
            Operand::Register(_) => "register",
            Operand::Memory { .. } => "memory",
        }
    }
}

impl fmt::Display for Operand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operand::Immediate(v) => write!(f, "{}", v),
            Operand::Register(r) => write!(f, "r{}", r),
            Operand::Memory { reg: 0, offset } => write!(f, "[{}]", offset),
            Operand::Memory { reg, offset: 0 } => write!(f, "[r{}]", reg),
            Operand::Memory { reg, offset } => write!(f, "[r{}+{}]", reg, offset),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Instruction {
    pub opcode: Opcode,
    pub operands: Vec<Operand>,
}

impl Instruction {
    pub fn new(opcode: Opcode, operands: Vec<Operand>) -> Self {
        Instruction { opcode, operands }
    }

    /// Target index of a jump-family instruction.
    pub fn jump_target(&self) -> Option<usize> {
        if !self.opcode.is_jump() {
            return None;
        }
        match self.operands.first() {
            Some(Operand::Immediate(v)) if *v >= 0.0 && v.fract() == 0.0 => Some(*v as usize),
            _ => None,
        }
    }
}

/// A fully assembled instruction stream.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Program {
    pub instructions: Vec<Instruction>,
}

impl Program {
    pub fn len(&self) -> usize {
        self.instructions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instructions.is_empty()
    }
}

/// Maps `r0`..`r15` and the `rax`..`rex` aliases to register ids.
pub fn register_id(name: &str) -> Option<u8> {
    let id = match name {
        "rax" => 1,
        "rbx" => 2,
        "rcx" => 3,
        "rdx" => 4,
        "rex" => 5,
        _ => {
            let digits = name.strip_prefix('r')?;
            if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
                return None;
            }
            if digits.len() > 1 && digits.starts_with('0') {
                return None;
            }
            digits.parse::<u8>().ok()?
        }
    };
    ((id as usize) < REGISTER_COUNT).then_some(id)
}
