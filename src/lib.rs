//! `lolkek`: compiler, assembler and virtual machine for the `.lk` language.
//!
//! Source text goes through [`frontend`] (lexer, parser) into a [`lang`]
//! syntax tree, is lowered by [`bytecode::codegen`] to assembly text,
//! assembled into a [`bytecode::Program`], encoded to a binary stream and
//! finally executed by [`runtime::Vm`]. [`pipeline`] strings the stages
//! together.

pub mod bytecode;
pub mod error;
pub mod frontend;
pub mod lang;
pub mod pipeline;
pub mod runtime;
pub mod utils;

pub use error::Error;
pub use runtime::{Vm, VmConfig};
