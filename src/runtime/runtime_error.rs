use crate::bytecode::encoding::CorruptBytecode;
use std::fmt;
use thiserror::Error;

/// Execution limit that stopped the machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Limit {
    CallDepth(usize),
    StackSize(usize),
    Steps(usize),
}

impl fmt::Display for Limit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Limit::CallDepth(n) => {
                write!(f, "call depth limit exceeded ({}), possible infinite recursion", n)
            }
            Limit::StackSize(n) => write!(f, "stack size limit exceeded ({})", n),
            Limit::Steps(n) => write!(f, "execution step limit exceeded ({})", n),
        }
    }
}

/// Errors raised while loading or executing a program.
///
/// Every variant carries the index of the faulting instruction where one
/// exists.
#[derive(Debug, Error)]
pub enum VmError {
    #[error(transparent)]
    CorruptBytecode(#[from] CorruptBytecode),

    #[error("instruction {ip}: division by zero")]
    DivisionByZero { ip: usize },

    #[error("instruction {ip}: {op} of {value} is undefined")]
    Domain {
        ip: usize,
        op: &'static str,
        value: f64,
    },

    #[error("instruction {ip}: memory address {address} is outside 0..{size}")]
    OutOfRange { ip: usize, address: f64, size: usize },

    #[error("instruction {ip}: {op} needs a value but the stack is empty")]
    StackUnderflow { ip: usize, op: &'static str },

    #[error("instruction {ip}: ret without a matching call")]
    ReturnWithoutCall { ip: usize },

    #[error("instruction {ip}: input ended while a value was expected")]
    InputExhausted { ip: usize },

    #[error("instruction {ip}: '{token}' is not a number")]
    InvalidInput { ip: usize, token: String },

    #[error("instruction {ip}: {limit}")]
    LimitExceeded { ip: usize, limit: Limit },

    #[error("console I/O failed: {0}")]
    Io(#[from] std::io::Error),
}

impl VmError {
    pub fn category(&self) -> &'static str {
        match self {
            VmError::CorruptBytecode(_) => "CorruptBytecodeError",
            VmError::DivisionByZero { .. } => "DivisionByZeroError",
            VmError::Domain { .. } => "DomainError",
            VmError::OutOfRange { .. } => "OutOfRangeError",
            VmError::StackUnderflow { .. } => "StackUnderflowError",
            VmError::ReturnWithoutCall { .. } => "ReturnWithoutCallError",
            VmError::InputExhausted { .. } => "InputExhaustedError",
            VmError::InvalidInput { .. } => "InvalidInputError",
            VmError::LimitExceeded { .. } => "LimitExceededError",
            VmError::Io(_) => "IoError",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_name_the_instruction() {
        let err = VmError::DivisionByZero { ip: 7 };
        assert_eq!(err.to_string(), "instruction 7: division by zero");
        assert_eq!(err.category(), "DivisionByZeroError");
    }

    #[test]
    fn limit_messages() {
        let err = VmError::LimitExceeded {
            ip: 0,
            limit: Limit::Steps(10),
        };
        assert_eq!(err.to_string(), "instruction 0: execution step limit exceeded (10)");
        assert_eq!(err.category(), "LimitExceededError");
    }

    #[test]
    fn io_errors_convert() {
        let err: VmError = std::io::Error::other("closed").into();
        assert_eq!(err.category(), "IoError");
    }
}
