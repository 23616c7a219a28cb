//! CLI entry point: dispatches between the tree-walking and bytecode
//! engines, running a file or dropping into the REPL.

mod repl;

use std::env;
use std::fs;
use std::process::ExitCode;

use lox::error::Diagnostics;
use lox::{interpret_bytecode, interpret_tree};

const EXIT_OK: u8 = 0;
const EXIT_DATA_ERROR: u8 = 65;
const EXIT_SOFTWARE_ERROR: u8 = 70;

fn usage() -> String {
    "Usage:\n  \
     lox                   start the REPL (tree-walking engine)\n  \
     lox --vm              start the REPL (bytecode engine)\n  \
     lox <script>           run a file (tree-walking engine)\n  \
     lox --vm <script>      run a file (bytecode engine)\n  \
     lox -h | --help        show this message\n  \
     lox -v | --version     show the version"
        .to_string()
}

fn main() -> ExitCode {
    let args: Vec<String> = env::args().skip(1).collect();

    let mut use_vm = false;
    let mut script: Option<&str> = None;
    for arg in &args {
        match arg.as_str() {
            "-h" | "--help" => {
                println!("{}", usage());
                return ExitCode::from(EXIT_OK);
            }
            "-v" | "--version" => {
                println!("lox {}", env!("CARGO_PKG_VERSION"));
                return ExitCode::from(EXIT_OK);
            }
            "--vm" => use_vm = true,
            other => script = Some(other),
        }
    }

    match script {
        Some(path) => run_file(path, use_vm),
        None => {
            repl::run(use_vm);
            ExitCode::from(EXIT_OK)
        }
    }
}

fn run_file(path: &str, use_vm: bool) -> ExitCode {
    let source = match fs::read_to_string(path) {
        Ok(source) => source,
        Err(err) => {
            eprintln!("Could not read file '{path}': {err}");
            return ExitCode::from(EXIT_SOFTWARE_ERROR);
        }
    };

    let mut diagnostics = Diagnostics::new();
    if use_vm {
        interpret_bytecode(&source, &mut diagnostics);
    } else {
        interpret_tree(&source, &mut diagnostics);
    }

    if diagnostics.had_error() {
        ExitCode::from(EXIT_DATA_ERROR)
    } else if diagnostics.had_runtime_error() {
        ExitCode::from(EXIT_SOFTWARE_ERROR)
    } else {
        ExitCode::from(EXIT_OK)
    }
}
