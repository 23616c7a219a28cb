//! Two interpreters for Lox: a tree-walking evaluator and a bytecode
//! compiler/VM, sharing a scanner and a common diagnostic format.

pub mod ast;
pub mod bytecode;
pub mod environment;
pub mod error;
pub mod interpreter;
pub mod parser;
pub mod resolver;
pub mod scanner;
pub mod token;
pub mod value;

use error::Diagnostics;
use interpreter::Interpreter;
use parser::Parser;
use resolver::Resolver;
use scanner::Scanner;

/// Run `source` through the tree-walking pipeline: scan, parse, resolve,
/// evaluate. Stops at the first phase boundary with an error, matching
/// jlox's "don't execute code that failed to parse" policy.
pub fn interpret_tree(source: &str, diagnostics: &mut Diagnostics) {
    let mut interpreter = Interpreter::new();
    run_tree_with(source, &mut interpreter, diagnostics);
}

/// Like [`interpret_tree`], but reuses an existing interpreter so globals
/// and closures defined on one call remain visible to the next. This is
/// what the REPL needs between lines.
pub fn run_tree_with(source: &str, interpreter: &mut Interpreter, diagnostics: &mut Diagnostics) {
    let tokens = Scanner::new(source).scan_tokens(diagnostics);
    let statements = Parser::new(tokens).parse(diagnostics);
    if diagnostics.had_error() {
        return;
    }

    let locals = Resolver::new().resolve(&statements, diagnostics);
    if diagnostics.had_error() {
        return;
    }

    interpreter.set_locals(locals);
    interpreter.interpret(&statements, diagnostics);
}

/// Run `source` through the bytecode pipeline: scan, compile, execute.
pub fn interpret_bytecode(source: &str, diagnostics: &mut Diagnostics) {
    let tokens = Scanner::new(source).scan_tokens(diagnostics);
    if diagnostics.had_error() {
        return;
    }

    let chunk = match bytecode::Compiler::new(tokens).compile(diagnostics) {
        Some(chunk) => chunk,
        None => return,
    };

    match bytecode::Vm::new().run(&chunk) {
        Ok(value) => println!("{value}"),
        Err((err, line)) => diagnostics.report_runtime(line, err.to_string()),
    }
}
