//! Text interchange dump of a parsed program.
//!
//! The format is what the graph and LaTeX visualizers read:
//!
//! ```text
//! VARS <n> <global names...>
//! FUNCS <n>
//!   <name>( PARAMS <p> <names...> NEWVAR <l> <names...>
//! [<kind> <value> <children...>]
//! ```
//!
//! Functions are listed in id order, so `main(` always comes first. Branch
//! bodies of `if`/`while` are wrapped in synthetic `condition` and
//! `condition_met` nodes and a call lists its function id as the first child.

use crate::lang::node::{Builtin, Function, Logic, Node};
use std::fmt::Write;

/// Logic sub-codes.
const LOGIC_IF: usize = 0;
const LOGIC_ELSE: usize = 1;
const LOGIC_WHILE: usize = 2;
const LOGIC_CONDITION: usize = 3;
const LOGIC_CONDITION_MET: usize = 4;

const LOGIC_KIND: usize = 8;

pub fn dump_tree(root: &Node) -> String {
    let mut out = String::new();

    if let Node::Root {
        globals,
        functions,
        main,
        ..
    } = root
    {
        write_list(&mut out, "VARS", globals);
        out.push('\n');

        let mut headers: Vec<&Function> = Vec::new();
        if let Node::MainFunction(f) = main.as_ref() {
            headers.push(f);
        }
        if let Node::FunctionTable(fs) = functions.as_ref() {
            headers.extend(fs.iter().filter_map(|n| match n {
                Node::UserFunctionDecl(f) => Some(f),
                _ => None,
            }));
        }

        let _ = writeln!(out, "FUNCS {}", headers.len());
        for f in headers {
            let _ = write!(out, "  {}( ", f.name);
            write_list(&mut out, "PARAMS", &f.params);
            out.push(' ');
            write_list(&mut out, "NEWVAR", &f.locals);
            out.push('\n');
        }
    }

    write_node(&mut out, root, 0);
    out
}

fn write_list(out: &mut String, tag: &str, names: &[String]) {
    let _ = write!(out, "{} {}", tag, names.len());
    for name in names {
        let _ = write!(out, " {}", name);
    }
}

fn format_value(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < i64::MAX as f64 {
        format!("{}", value as i64)
    } else {
        format!("{:.6}", value)
    }
}

fn open(out: &mut String, depth: usize, code: usize, value: f64) {
    let _ = write!(out, "{}[{} {}", "  ".repeat(depth), code, format_value(value));
}

fn close(out: &mut String, depth: usize, had_children: bool) {
    if had_children {
        let _ = writeln!(out, "{}]", "  ".repeat(depth));
    } else {
        out.push_str("]\n");
    }
}

fn write_group(out: &mut String, depth: usize, code: usize, value: f64, children: &[&Node]) {
    open(out, depth, code, value);
    if !children.is_empty() {
        out.push('\n');
    }
    for child in children {
        write_node(out, child, depth + 1);
    }
    close(out, depth, !children.is_empty());
}

fn write_node(out: &mut String, node: &Node, depth: usize) {
    let code = node.code();
    let value = node.value();

    match node {
        Node::Root {
            init,
            functions,
            main,
            ..
        } => write_group(
            out,
            depth,
            code,
            value,
            &[init.as_ref(), functions.as_ref(), main.as_ref()],
        ),
        Node::FunctionTable(children) | Node::VarInitBlock(children) => {
            let refs: Vec<&Node> = children.iter().collect();
            write_group(out, depth, code, value, &refs);
        }
        Node::UserFunctionDecl(f) | Node::MainFunction(f) => {
            let mut refs: Vec<&Node> = vec![f.init.as_ref()];
            refs.extend(f.body.iter());
            write_group(out, depth, code, value, &refs);
        }
        Node::Operator { operands, .. } => {
            let refs: Vec<&Node> = operands.iter().collect();
            write_group(out, depth, code, value, &refs);
        }
        Node::BuiltinCall { builtin, args } => {
            open(out, depth, code, value);
            out.push('\n');
            if let Builtin::Call(id) = builtin {
                write_node(out, &Node::NumberLiteral(*id as f64), depth + 1);
            }
            for arg in args {
                write_node(out, arg, depth + 1);
            }
            close(out, depth, true);
        }
        Node::Return(expr) => match expr {
            Some(e) => write_group(out, depth, code, value, &[e.as_ref()]),
            None => write_group(out, depth, code, value, &[]),
        },
        Node::Logic(Logic::If {
            cond,
            then_body,
            else_body,
        }) => {
            open(out, depth, LOGIC_KIND, LOGIC_IF as f64);
            out.push('\n');
            write_group(out, depth + 1, LOGIC_KIND, LOGIC_CONDITION as f64, &[cond.as_ref()]);
            write_body(out, depth + 1, then_body);
            if let Some(body) = else_body {
                open(out, depth + 1, LOGIC_KIND, LOGIC_ELSE as f64);
                out.push('\n');
                write_body(out, depth + 2, body);
                close(out, depth + 1, true);
            }
            close(out, depth, true);
        }
        Node::Logic(Logic::While { cond, body }) => {
            open(out, depth, LOGIC_KIND, LOGIC_WHILE as f64);
            out.push('\n');
            write_group(out, depth + 1, LOGIC_KIND, LOGIC_CONDITION as f64, &[cond.as_ref()]);
            write_body(out, depth + 1, body);
            close(out, depth, true);
        }
        Node::NumberLiteral(_)
        | Node::GlobalVarRef(_)
        | Node::LocalVarRef(_)
        | Node::ParamRef(_) => write_group(out, depth, code, value, &[]),
    }
}

fn write_body(out: &mut String, depth: usize, body: &[Node]) {
    let refs: Vec<&Node> = body.iter().collect();
    write_group(out, depth, LOGIC_KIND, LOGIC_CONDITION_MET as f64, &refs);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frontend::lexer::Lexer;
    use crate::frontend::parser::Parser;

    fn dump(src: &str) -> String {
        let tokens = Lexer::new(src).tokenize().unwrap();
        let root = Parser::new(tokens).parse().unwrap();
        dump_tree(&root)
    }

    /// Strips whitespace so assertions don't depend on indentation.
    fn compact(s: &str) -> String {
        s.split_whitespace().collect::<Vec<_>>().join(" ")
    }

    #[test]
    fn header_lists_globals_and_functions() {
        let out = dump("var g; func f(a, b) lol var t; kek main() lol kek");
        let mut lines = out.lines();
        assert_eq!(lines.next(), Some("VARS 1 g"));
        assert_eq!(lines.next(), Some("FUNCS 2"));
        assert_eq!(lines.next(), Some("  main( PARAMS 0 NEWVAR 0"));
        assert_eq!(lines.next(), Some("  f( PARAMS 2 a b NEWVAR 1 t"));
    }

    #[test]
    fn minimal_tree_shape() {
        let out = dump("main() lol kek");
        assert!(compact(&out).ends_with("[0 0 [11 0] [1 0] [9 0 [11 0] ] ]"));
    }

    #[test]
    fn call_lists_function_id_first() {
        let out = compact(&dump("func f(x) lol kek main() lol f(2.5); kek"));
        assert!(out.contains("[10 4 [3 1] [3 2.500000] ]"), "{}", out);
    }

    #[test]
    fn if_else_uses_condition_wrappers() {
        let out = compact(&dump("main() lol if (1) lol print(1); kek else lol print(2); kek kek"));
        assert!(
            out.contains("[8 0 [8 3 [3 1] ] [8 4 [10 1 [3 1] ] ] [8 1 [8 4 [10 1 [3 2] ] ] ] ]"),
            "{}",
            out
        );
    }
}
