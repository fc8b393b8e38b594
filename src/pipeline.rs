//! Stage-by-stage drivers shared by the command-line tool and the tests.

use crate::bytecode::assembler;
use crate::bytecode::codegen;
use crate::bytecode::encoding;
use crate::bytecode::isa::Program;
use crate::error::Error;
use crate::frontend::lexer::Lexer;
use crate::frontend::parser::Parser;
use crate::frontend::token::Token;
use crate::lang::node::Node;
use crate::runtime::{Vm, VmConfig};
use std::io::{BufRead, Write};

pub fn tokenize(source: &str) -> Result<Vec<Token>, Error> {
    Ok(Lexer::new(source).tokenize()?)
}

pub fn parse_source(source: &str) -> Result<Node, Error> {
    let tokens = tokenize(source)?;
    crate::info!("lexed {} tokens", tokens.len());
    Ok(Parser::new(tokens).parse()?)
}

/// Source text to assembly text.
pub fn compile_to_asm(source: &str) -> Result<String, Error> {
    let root = parse_source(source)?;
    let asm = codegen::generate(&root)?;
    crate::info!("generated {} lines of assembly", asm.lines().count());
    Ok(asm)
}

pub fn assemble(asm: &str) -> Result<Program, Error> {
    let program = assembler::assemble(asm)?;
    crate::info!("assembled {} instructions", program.len());
    Ok(program)
}

/// Assembly text to the binary stream.
pub fn assemble_to_binary(asm: &str) -> Result<Vec<u8>, Error> {
    let program = assemble(asm)?;
    Ok(encoding::encode(&program)?)
}

/// Source text all the way to the binary stream.
pub fn compile(source: &str) -> Result<Vec<u8>, Error> {
    assemble_to_binary(&compile_to_asm(source)?)
}

/// Decodes and validates a binary stream.
pub fn load(bytes: &[u8]) -> Result<Program, Error> {
    let program = encoding::decode(bytes)?;
    crate::info!("loaded {} instructions", program.len());
    Ok(program)
}

/// Runs a program on a fresh machine with the given console streams.
pub fn execute<R: BufRead, W: Write>(
    program: &Program,
    config: VmConfig,
    input: R,
    output: W,
) -> Result<(), Error> {
    let mut vm = Vm::with_config(config, input, output);
    vm.run(program)?;
    Ok(())
}

/// Compiles, encodes, decodes and runs source text.
///
/// Goes through the binary stream so the result matches running a compiled
/// file.
pub fn run_source<R: BufRead, W: Write>(
    source: &str,
    config: VmConfig,
    input: R,
    output: W,
) -> Result<(), Error> {
    let bytes = compile(source)?;
    let program = load(&bytes)?;
    execute(&program, config, input, output)
}
