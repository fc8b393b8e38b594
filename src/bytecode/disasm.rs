use crate::bytecode::isa::{Instruction, Program};
use std::collections::BTreeSet;
use std::fmt::Write;

/// Renders a program back to assembly text.
///
/// Every jump target gets a `:L<index>` label and jump operands refer to
/// those labels, so the result assembles to the same instruction stream.
/// Register aliases are not recovered: `rcx` comes back as `r3`.
pub fn disassemble(program: &Program) -> String {
    let targets = collect_jump_targets(program);
    let mut out = String::new();

    for (ip, instr) in program.instructions.iter().enumerate() {
        if targets.contains(&ip) {
            let _ = writeln!(out, ":L{}", ip);
        }
        let _ = writeln!(out, "{}", render_instruction(instr));
    }
    // Jumps to one past the end, i.e. straight to termination.
    if targets.contains(&program.len()) {
        let _ = writeln!(out, ":L{}", program.len());
    }

    out
}

/// Human-oriented listing with instruction indices and jump markers.
pub fn disassemble_annotated(program: &Program) -> String {
    let targets = collect_jump_targets(program);
    let mut out = String::new();

    let _ = writeln!(out, "════════════════════════════════════════");
    let _ = writeln!(out, " program");
    let _ = writeln!(out, " {} instructions", program.len());
    let _ = writeln!(out, "════════════════════════════════════════");

    for (ip, instr) in program.instructions.iter().enumerate() {
        if targets.contains(&ip) {
            let _ = writeln!(out, "      ┌──────────────────────────────────");
        }
        let marker = if targets.contains(&ip) { "► " } else { "  " };
        let _ = write!(out, "{:04} {}", ip, marker);

        match instr.jump_target() {
            Some(target) => {
                let direction = if target <= ip { "↑" } else { "↓" };
                let _ = writeln!(
                    out,
                    "{:<6}L{} {} (→ {:04})",
                    instr.opcode.mnemonic(),
                    target,
                    direction,
                    target
                );
            }
            None => {
                let _ = writeln!(out, "{}", render_instruction(instr));
            }
        }
    }
    if targets.contains(&program.len()) {
        let _ = writeln!(out, "{:04} ► <end>", program.len());
    }

    out
}

fn render_instruction(instr: &Instruction) -> String {
    if let Some(target) = instr.jump_target() {
        return format!("{} L{}", instr.opcode, target);
    }
    let mut line = instr.opcode.mnemonic().to_string();
    for operand in &instr.operands {
        let _ = write!(line, " {}", operand);
    }
    line
}

fn collect_jump_targets(program: &Program) -> BTreeSet<usize> {
    program
        .instructions
        .iter()
        .filter_map(Instruction::jump_target)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bytecode::assembler::assemble;
    use crate::bytecode::isa::{Opcode, Operand};

    #[test]
    fn plain_instructions() {
        let program = Program {
            instructions: vec![
                Instruction::new(Opcode::Push, vec![Operand::Immediate(2.5)]),
                Instruction::new(Opcode::Pop, vec![Operand::Memory { reg: 3, offset: 1 }]),
                Instruction::new(Opcode::Out, vec![Operand::Register(1)]),
                Instruction::new(Opcode::End, vec![]),
            ],
        };
        assert_eq!(disassemble(&program), "push 2.5\npop [r3+1]\nout r1\nend\n");
    }

    #[test]
    fn jumps_become_labels() {
        let program = assemble(":top\npush 1\npush 0\nje top\njmp done\n:done").unwrap();
        assert_eq!(
            disassemble(&program),
            ":L0\npush 1\npush 0\nje L0\njmp L4\n:L4\n"
        );
    }

    #[test]
    fn output_reassembles() {
        let src = "push 3\npop rcx\n:loop\npush [rcx]\npush 1\nsub\ndup\npop [rcx]\npush 0\njne loop\ncall fn\nend\n:fn\nin rax\nmove rax [rcx+2]\nret";
        let program = assemble(src).unwrap();
        let again = assemble(&disassemble(&program)).unwrap();
        assert_eq!(again, program);
    }

    #[test]
    fn annotated_marks_targets() {
        let program = assemble(":a\npush 1\njmp a").unwrap();
        let text = disassemble_annotated(&program);
        assert!(text.contains(" 2 instructions"));
        assert!(text.contains("0000 ► push 1"));
        assert!(text.contains("0001   jmp   L0 ↑ (→ 0000)"));
    }

    #[test]
    fn empty_program() {
        assert_eq!(disassemble(&Program::default()), "");
    }
}
