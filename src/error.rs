use crate::bytecode::encoding::EncodeError;
use crate::bytecode::{AsmError, CodegenError};
use crate::frontend::lexer::LexerError;
use crate::frontend::parser_error::ParserError;
use crate::runtime::VmError;
use thiserror::Error;

/// Any failure of the compile or run pipeline.
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Lex(#[from] LexerError),
    #[error(transparent)]
    Parse(#[from] ParserError),
    #[error(transparent)]
    Codegen(#[from] CodegenError),
    #[error(transparent)]
    Asm(#[from] AsmError),
    #[error(transparent)]
    Encode(#[from] EncodeError),
    #[error(transparent)]
    Vm(#[from] VmError),
}

impl Error {
    /// Error category label printed by the command-line driver.
    pub fn category(&self) -> &'static str {
        match self {
            Error::Lex(_) => "SyntaxError",
            Error::Parse(e) => e.category(),
            Error::Codegen(e) => e.category(),
            Error::Asm(e) => e.category(),
            Error::Encode(EncodeError::Invalid(_)) => "CorruptBytecodeError",
            Error::Encode(EncodeError::Serialize(_)) => "EncodeError",
            Error::Vm(e) => e.category(),
        }
    }
}

impl From<crate::bytecode::CorruptBytecode> for Error {
    fn from(e: crate::bytecode::CorruptBytecode) -> Self {
        Error::Vm(VmError::CorruptBytecode(e))
    }
}
