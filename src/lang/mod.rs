//! # Program representation
//!
//! The parser resolves names through [`symbols::SymbolTable`] and produces a
//! tree of [`node::Node`]s that the code generator and the tree dump consume.

pub mod node;
pub mod symbols;
pub mod tree_dump;
