use crate::lang::node::Node;
use thiserror::Error;

/// Code generation failures.
///
/// These are internal invariant violations: a tree produced by the parser
/// never triggers them.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CodegenError {
    /// A node kind that has no lowering rule in the position it appears in.
    #[error("cannot generate code for '{node_type}' node in {position}")]
    UnknownNodeKind {
        node_type: &'static str,
        position: &'static str,
    },
    /// A variable slot too large for an 8-bit memory offset.
    #[error("slot {slot} does not fit in a memory offset")]
    SlotOutOfRange { slot: usize },
}

impl CodegenError {
    /// Create an error for a node that appeared where it cannot be lowered.
    pub fn unknown(node: &Node, position: &'static str) -> Self {
        CodegenError::UnknownNodeKind {
            node_type: node.kind_name(),
            position,
        }
    }

    pub fn category(&self) -> &'static str {
        match self {
            CodegenError::UnknownNodeKind { .. } => "UnknownNodeKindError",
            CodegenError::SlotOutOfRange { .. } => "OutOfRangeError",
        }
    }
}
