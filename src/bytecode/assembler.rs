//! Two-pass assembler from stack-machine text to a [`Program`].
//!
//! Source format:
//! - whitespace separates tokens, `;` starts a comment running to end of line
//! - `:name` declares a label bound to the next instruction
//! - `jmp call je jne jl jle` take a bare label name
//! - `move A B` expands to `push A` followed by `pop B`
//! - operands are registers (`r0`..`r15`, `rax`..`rex`), memory
//!   (`[R]`, `[N]`, `[R+N]`) or numeric immediates
//!
//! Pass one builds the instruction list and records label uses. Pass two
//! patches every use with the index of the instruction its label names.

use crate::bytecode::asm_error::AsmError;
use crate::bytecode::isa::{
    Instruction, MAX_MEMORY_OFFSET, Opcode, Operand, Program, register_id,
};
use std::collections::HashMap;

/// Comment introducer in assembly text.
pub const COMMENT_CHAR: char = ';';

const MOVE_MACRO: &str = "move";

/// Label definitions and unresolved label uses.
pub struct AsmContext {
    labels: HashMap<String, usize>,
    fixups: Vec<Fixup>,
}

/// A jump operand waiting for its label.
struct Fixup {
    instruction: usize,
    label: String,
    line: usize,
}

impl AsmContext {
    pub fn new() -> Self {
        Self {
            labels: HashMap::new(),
            fixups: Vec::new(),
        }
    }

    /// Registers a label at the given instruction index.
    fn define_label(&mut self, name: &str, index: usize, line: usize) -> Result<(), AsmError> {
        if self.labels.contains_key(name) {
            return Err(AsmError::DuplicateLabel {
                line,
                label: name.to_string(),
            });
        }
        self.labels.insert(name.to_string(), index);
        Ok(())
    }

    /// Resolves a label to its instruction index.
    fn resolve_label(&self, name: &str, line: usize) -> Result<usize, AsmError> {
        self.labels
            .get(name)
            .copied()
            .ok_or_else(|| AsmError::UndefinedLabel {
                line,
                label: name.to_string(),
            })
    }
}

impl Default for AsmContext {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone)]
struct Token {
    text: String,
    line: usize,
}

/// Splits source into tokens, dropping comments.
///
/// A bracketed operand written with inner spaces (`[ rcx + 2 ]`) is glued
/// back into a single token.
fn tokenize(source: &str) -> Vec<Token> {
    let mut out = Vec::new();

    for (idx, raw_line) in source.lines().enumerate() {
        let line = idx + 1;
        let code = raw_line
            .split_once(COMMENT_CHAR)
            .map_or(raw_line, |(code, _)| code);

        let mut pending: Option<String> = None;
        for word in code.split_whitespace() {
            if let Some(mut acc) = pending.take() {
                acc.push_str(word);
                if word.ends_with(']') {
                    out.push(Token { text: acc, line });
                } else {
                    pending = Some(acc);
                }
            } else if word.starts_with('[') && !word.ends_with(']') {
                pending = Some(word.to_string());
            } else {
                out.push(Token {
                    text: word.to_string(),
                    line,
                });
            }
        }
        if let Some(acc) = pending {
            out.push(Token { text: acc, line });
        }
    }

    out
}

/// Classifies an operand token by its shape.
pub(crate) fn parse_operand(text: &str, line: usize) -> Result<Operand, AsmError> {
    let malformed = |reason: &str| AsmError::MalformedOperand {
        line,
        operand: text.to_string(),
        reason: reason.to_string(),
    };

    if let Some(inner) = text.strip_prefix('[') {
        let inner = inner
            .strip_suffix(']')
            .ok_or_else(|| malformed("missing closing ']'"))?;
        return parse_memory(inner).map_err(|reason| malformed(&reason));
    }

    if let Some(reg) = register_id(text) {
        return Ok(Operand::Register(reg));
    }

    let starts_numeric = text
        .chars()
        .next()
        .is_some_and(|c| c.is_ascii_digit() || matches!(c, '-' | '+' | '.'));
    if starts_numeric {
        let value: f64 = text
            .parse()
            .map_err(|_| malformed("not a valid number"))?;
        if !value.is_finite() {
            return Err(malformed("number does not fit a finite f64"));
        }
        return Ok(Operand::Immediate(value));
    }

    if text.starts_with('r') {
        return Err(malformed("unknown register"));
    }
    Err(malformed("expected a register, memory reference or number"))
}

fn parse_offset(text: &str) -> Result<i32, String> {
    if text.is_empty() || !text.bytes().all(|b| b.is_ascii_digit()) {
        return Err(format!("'{}' is not a non-negative integer offset", text));
    }
    match text.parse::<i32>() {
        Ok(n) if n <= MAX_MEMORY_OFFSET => Ok(n),
        _ => Err(format!("offset {} exceeds {}", text, MAX_MEMORY_OFFSET)),
    }
}

/// Parses the inside of `[...]`: `R`, `N` or `R+N`.
fn parse_memory(inner: &str) -> Result<Operand, String> {
    let inner = inner.trim();
    if let Some((reg, offset)) = inner.split_once('+') {
        let reg = register_id(reg.trim()).ok_or_else(|| format!("'{}' is not a register", reg))?;
        let offset = parse_offset(offset.trim())?;
        return Ok(Operand::Memory { reg, offset });
    }
    if let Some(reg) = register_id(inner) {
        return Ok(Operand::Memory { reg, offset: 0 });
    }
    let offset = parse_offset(inner)?;
    Ok(Operand::Memory { reg: 0, offset })
}

/// Parses an operand and checks it against the instruction's mask.
fn typed_operand(opcode: Opcode, token: &Token) -> Result<Operand, AsmError> {
    let operand = parse_operand(&token.text, token.line)?;
    if opcode.operand_mask() & operand.kind_bit() == 0 {
        return Err(AsmError::IllegalOperandKind {
            line: token.line,
            mnemonic: opcode.mnemonic(),
            operand: token.text.clone(),
            kind: operand.kind_name(),
        });
    }
    Ok(operand)
}

fn next_operand<'a>(
    tokens: &mut impl Iterator<Item = &'a Token>,
    mnemonic: &str,
    expected: usize,
    line: usize,
) -> Result<&'a Token, AsmError> {
    tokens.next().ok_or_else(|| AsmError::MissingOperand {
        line,
        mnemonic: mnemonic.to_string(),
        expected,
    })
}

/// Assembles source text into a program.
///
/// # Errors
/// Any [`AsmError`]. On error no program is produced.
pub fn assemble(source: &str) -> Result<Program, AsmError> {
    let tokens = tokenize(source);
    let mut ctx = AsmContext::new();
    let mut instructions: Vec<Instruction> = Vec::new();

    // Pass 1: structure
    let mut iter = tokens.iter();
    while let Some(token) = iter.next() {
        let line = token.line;

        if let Some(label) = token.text.strip_prefix(':') {
            if label.is_empty() {
                return Err(AsmError::MalformedOperand {
                    line,
                    operand: token.text.clone(),
                    reason: "empty label name".to_string(),
                });
            }
            ctx.define_label(label, instructions.len(), line)?;
            continue;
        }

        if token.text == MOVE_MACRO {
            let src = next_operand(&mut iter, MOVE_MACRO, 2, line)?;
            let dst = next_operand(&mut iter, MOVE_MACRO, 2, line)?;
            let src = typed_operand(Opcode::Push, src)?;
            let dst = typed_operand(Opcode::Pop, dst)?;
            instructions.push(Instruction::new(Opcode::Push, vec![src]));
            instructions.push(Instruction::new(Opcode::Pop, vec![dst]));
            continue;
        }

        let opcode =
            Opcode::from_mnemonic(&token.text).ok_or_else(|| AsmError::UnknownMnemonic {
                line,
                mnemonic: token.text.clone(),
            })?;

        if opcode.is_jump() {
            let target = next_operand(&mut iter, opcode.mnemonic(), 1, line)?;
            ctx.fixups.push(Fixup {
                instruction: instructions.len(),
                label: target.text.clone(),
                line: target.line,
            });
            instructions.push(Instruction::new(opcode, vec![Operand::Immediate(0.0)]));
            continue;
        }

        let mut operands = Vec::with_capacity(opcode.operand_count());
        for _ in 0..opcode.operand_count() {
            let tok = next_operand(&mut iter, opcode.mnemonic(), opcode.operand_count(), line)?;
            operands.push(typed_operand(opcode, tok)?);
        }
        instructions.push(Instruction::new(opcode, operands));
    }

    // Pass 2: label resolution
    for fixup in &ctx.fixups {
        let target = ctx.resolve_label(&fixup.label, fixup.line)?;
        instructions[fixup.instruction].operands[0] = Operand::Immediate(target as f64);
    }

    Ok(Program { instructions })
}
