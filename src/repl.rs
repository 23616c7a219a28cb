//! Interactive read-eval-print loop.
//!
//! Unlike the subprocess-per-line design this crate's driver shape is
//! otherwise patterned on, the tree-walking engine keeps one
//! [`Interpreter`] alive for the whole session: closures and classes
//! defined on one line must still be visible on the next. A simple
//! brace-depth counter lets a block, function, or class span several
//! lines before it's handed to the engine.

use std::io::{self, Write};

use lox::error::Diagnostics;
use lox::interpreter::Interpreter;
use lox::{interpret_bytecode, run_tree_with};

pub fn run(use_vm: bool) {
    println!("lox {} ({})", env!("CARGO_PKG_VERSION"), if use_vm { "vm" } else { "tree" });
    let mut interpreter = Interpreter::new();
    let mut pending = String::new();
    let mut depth: i32 = 0;

    loop {
        print_prompt(&pending, depth);
        let mut line = String::new();
        match io::stdin().read_line(&mut line) {
            Ok(0) => break, // EOF (Ctrl-D)
            Ok(_) => {}
            Err(err) => {
                eprintln!("Error reading input: {err}");
                break;
            }
        }

        depth += brace_delta(&line);
        pending.push_str(&line);

        if depth > 0 {
            continue;
        }
        depth = 0;

        let source = std::mem::take(&mut pending);
        if source.trim().is_empty() {
            continue;
        }

        let mut diagnostics = Diagnostics::new();
        if use_vm {
            interpret_bytecode(&source, &mut diagnostics);
        } else {
            run_tree_with(&source, &mut interpreter, &mut diagnostics);
        }
        // A REPL line's static error must not poison the next line.
        diagnostics.reset();
    }
}

fn print_prompt(pending: &str, depth: i32) {
    let prompt = if pending.is_empty() && depth == 0 { "> " } else { "... " };
    print!("{prompt}");
    let _ = io::stdout().flush();
}

fn brace_delta(line: &str) -> i32 {
    let mut delta = 0;
    for c in line.chars() {
        match c {
            '{' => delta += 1,
            '}' => delta -= 1,
            _ => {}
        }
    }
    delta
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn brace_delta_tracks_nesting() {
        assert_eq!(brace_delta("fun f() {"), 1);
        assert_eq!(brace_delta("}"), -1);
        assert_eq!(brace_delta("var x = 1;"), 0);
    }
}
