use thiserror::Error;

/// Errors raised while assembling text into a [`Program`](super::isa::Program).
///
/// Every variant carries the 1-based source line it was detected on.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum AsmError {
    /// Unrecognized instruction mnemonic.
    #[error("line {line}: unknown mnemonic '{mnemonic}'")]
    UnknownMnemonic { line: usize, mnemonic: String },
    /// Input ended before all operands of an instruction were read.
    #[error("line {line}: '{mnemonic}' expects {expected} operand(s)")]
    MissingOperand {
        line: usize,
        mnemonic: String,
        expected: usize,
    },
    /// Operand text that matches no addressing mode.
    #[error("line {line}: malformed operand '{operand}': {reason}")]
    MalformedOperand {
        line: usize,
        operand: String,
        reason: String,
    },
    /// Operand kind not permitted by the instruction's mask.
    #[error("line {line}: {kind} operand '{operand}' is not allowed for '{mnemonic}'")]
    IllegalOperandKind {
        line: usize,
        mnemonic: &'static str,
        operand: String,
        kind: &'static str,
    },
    /// Label defined more than once.
    #[error("line {line}: duplicate label '{label}'")]
    DuplicateLabel { line: usize, label: String },
    /// Reference to a label that is never declared.
    #[error("line {line}: undefined label '{label}'")]
    UndefinedLabel { line: usize, label: String },
}

impl AsmError {
    pub fn category(&self) -> &'static str {
        match self {
            AsmError::UnknownMnemonic { .. } => "UnknownMnemonicError",
            AsmError::MissingOperand { .. } => "MissingOperandError",
            AsmError::MalformedOperand { .. } => "MalformedOperandError",
            AsmError::IllegalOperandKind { .. } => "IllegalOperandKindError",
            AsmError::DuplicateLabel { .. } => "DuplicateLabelError",
            AsmError::UndefinedLabel { .. } => "UndefinedLabelError",
        }
    }

    pub fn line(&self) -> usize {
        match self {
            AsmError::UnknownMnemonic { line, .. }
            | AsmError::MissingOperand { line, .. }
            | AsmError::MalformedOperand { line, .. }
            | AsmError::IllegalOperandKind { line, .. }
            | AsmError::DuplicateLabel { line, .. }
            | AsmError::UndefinedLabel { line, .. } => *line,
        }
    }
}
