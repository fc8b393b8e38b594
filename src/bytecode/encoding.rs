//! Binary form of a [`Program`].
//!
//! Each instruction is a postcard-serialized [`RawInstruction`]:
//!
//! - opcode: 1 byte
//! - operand count: 1 byte (postcard length prefix)
//! - per operand: type tag (1 byte) then the value as a little-endian `f64`
//!
//! Tags are 1 = immediate, 2 = register, 3 = memory. A memory operand stores
//! `(register << 8) | offset`. Instructions are concatenated with no header;
//! the stream ends where the last instruction ends.

use crate::bytecode::isa::{
    Instruction, MAX_MEMORY_OFFSET, MAX_OPERANDS, Opcode, Operand, Program, REGISTER_COUNT,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const TAG_IMMEDIATE: u8 = 1;
pub const TAG_REGISTER: u8 = 2;
pub const TAG_MEMORY: u8 = 3;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
struct RawOperand {
    tag: u8,
    value: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct RawInstruction {
    opcode: u8,
    operands: Vec<RawOperand>,
}

/// Bytecode rejected at load time, before anything executes.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("corrupt bytecode at instruction {index}: {reason}")]
pub struct CorruptBytecode {
    pub index: usize,
    pub reason: String,
}

impl CorruptBytecode {
    pub(crate) fn new(index: usize, reason: impl Into<String>) -> Self {
        CorruptBytecode {
            index,
            reason: reason.into(),
        }
    }
}

fn raw_operand(operand: &Operand) -> RawOperand {
    match *operand {
        Operand::Immediate(value) => RawOperand {
            tag: TAG_IMMEDIATE,
            value,
        },
        Operand::Register(reg) => RawOperand {
            tag: TAG_REGISTER,
            value: reg as f64,
        },
        Operand::Memory { reg, offset } => RawOperand {
            tag: TAG_MEMORY,
            value: (((reg as i64) << 8) | offset as i64) as f64,
        },
    }
}

/// Why a program could not be turned into bytes.
#[derive(Debug, Error)]
pub enum EncodeError {
    /// The program breaks the instruction table and would not decode as written.
    #[error(transparent)]
    Invalid(#[from] CorruptBytecode),
    #[error("cannot serialize program: {0}")]
    Serialize(#[from] postcard::Error),
}

/// Validates and serializes a program.
///
/// # Errors
/// [`EncodeError::Invalid`] for anything [`validate`] rejects, so an
/// out-of-range offset never gets packed into the register bits.
pub fn encode(program: &Program) -> Result<Vec<u8>, EncodeError> {
    validate(program)?;
    let mut bytes = Vec::new();
    for instr in &program.instructions {
        let raw = RawInstruction {
            opcode: instr.opcode as u8,
            operands: instr.operands.iter().map(raw_operand).collect(),
        };
        bytes.extend(postcard::to_allocvec(&raw)?);
    }
    Ok(bytes)
}

/// Decodes and validates a binary stream.
///
/// # Errors
/// [`CorruptBytecode`] if the stream is truncated or any instruction breaks
/// the instruction table (see [`validate`]).
pub fn decode(bytes: &[u8]) -> Result<Program, CorruptBytecode> {
    let mut rest = bytes;
    let mut raws = Vec::new();
    while !rest.is_empty() {
        let (raw, tail) = postcard::take_from_bytes::<RawInstruction>(rest).map_err(|e| {
            CorruptBytecode::new(raws.len(), format!("undecodable instruction ({})", e))
        })?;
        raws.push(raw);
        rest = tail;
    }

    let instructions = raws
        .into_iter()
        .enumerate()
        .map(|(index, raw)| instruction_from_raw(index, raw))
        .collect::<Result<Vec<_>, _>>()?;

    let program = Program { instructions };
    validate(&program)?;
    Ok(program)
}

fn integral(value: f64) -> Option<i64> {
    (value.is_finite() && value.fract() == 0.0).then_some(value as i64)
}

fn operand_from_raw(index: usize, raw: RawOperand) -> Result<Operand, CorruptBytecode> {
    match raw.tag {
        TAG_IMMEDIATE => Ok(Operand::Immediate(raw.value)),
        TAG_REGISTER => match integral(raw.value) {
            Some(reg) if (0..REGISTER_COUNT as i64).contains(&reg) => {
                Ok(Operand::Register(reg as u8))
            }
            _ => Err(CorruptBytecode::new(
                index,
                format!("invalid register {}", raw.value),
            )),
        },
        TAG_MEMORY => {
            let encoded = integral(raw.value)
                .filter(|v| *v >= 0)
                .ok_or_else(|| {
                    CorruptBytecode::new(index, format!("invalid memory operand {}", raw.value))
                })?;
            let reg = encoded >> 8;
            if reg >= REGISTER_COUNT as i64 {
                return Err(CorruptBytecode::new(
                    index,
                    format!("invalid register {} in memory operand", reg),
                ));
            }
            Ok(Operand::Memory {
                reg: reg as u8,
                offset: (encoded & MAX_MEMORY_OFFSET as i64) as i32,
            })
        }
        tag => Err(CorruptBytecode::new(
            index,
            format!("unknown operand tag {}", tag),
        )),
    }
}

fn instruction_from_raw(index: usize, raw: RawInstruction) -> Result<Instruction, CorruptBytecode> {
    let opcode = Opcode::try_from(raw.opcode)
        .map_err(|op| CorruptBytecode::new(index, format!("unknown opcode {}", op)))?;
    if raw.operands.len() > MAX_OPERANDS {
        return Err(CorruptBytecode::new(
            index,
            format!(
                "operand count {} exceeds {}",
                raw.operands.len(),
                MAX_OPERANDS
            ),
        ));
    }
    let operands = raw
        .operands
        .into_iter()
        .map(|op| operand_from_raw(index, op))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Instruction { opcode, operands })
}

/// Checks every instruction against the instruction table.
///
/// Operand counts must match exactly, operand kinds must fit the mask,
/// registers must exist, and jump targets must lie within `0..=len`.
pub fn validate(program: &Program) -> Result<(), CorruptBytecode> {
    let len = program.len();

    for (index, instr) in program.instructions.iter().enumerate() {
        let opcode = instr.opcode;
        if instr.operands.len() != opcode.operand_count() {
            return Err(CorruptBytecode::new(
                index,
                format!(
                    "'{}' expects {} operand(s), found {}",
                    opcode,
                    opcode.operand_count(),
                    instr.operands.len()
                ),
            ));
        }

        for operand in &instr.operands {
            if opcode.operand_mask() & operand.kind_bit() == 0 {
                return Err(CorruptBytecode::new(
                    index,
                    format!("{} operand not allowed for '{}'", operand.kind_name(), opcode),
                ));
            }
            let reg = match operand {
                Operand::Register(reg) | Operand::Memory { reg, .. } => Some(*reg),
                Operand::Immediate(_) => None,
            };
            if reg.is_some_and(|r| r as usize >= REGISTER_COUNT) {
                return Err(CorruptBytecode::new(index, "register out of range"));
            }
            if let Operand::Immediate(v) = operand {
                if !v.is_finite() {
                    return Err(CorruptBytecode::new(index, "non-finite immediate"));
                }
            }
            if let Operand::Memory { offset, .. } = operand {
                if !(0..=MAX_MEMORY_OFFSET).contains(offset) {
                    return Err(CorruptBytecode::new(index, "memory offset out of range"));
                }
            }
        }

        if opcode.is_jump() {
            match instr.jump_target() {
                Some(target) if target <= len => {}
                _ => {
                    return Err(CorruptBytecode::new(
                        index,
                        format!("jump target {} outside program", instr.operands[0]),
                    ));
                }
            }
        }
    }

    Ok(())
}
