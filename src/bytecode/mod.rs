//! Everything below the syntax tree: code generation to assembly text, the
//! two-pass assembler, the instruction set and its binary encoding.

pub mod asm_error;
pub mod assembler;
pub mod codegen;
pub mod codegen_error;
pub mod disasm;
pub mod encoding;
pub mod isa;

pub use asm_error::AsmError;
pub use codegen_error::CodegenError;
pub use encoding::{CorruptBytecode, EncodeError};
pub use isa::{Instruction, Opcode, Operand, Program};
