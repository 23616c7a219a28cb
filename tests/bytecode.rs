//! End-to-end scenarios for the bytecode engine.

use lox::error::Diagnostics;
use lox::interpret_bytecode;

fn run(source: &str) -> Diagnostics {
    let mut diagnostics = Diagnostics::new();
    interpret_bytecode(source, &mut diagnostics);
    diagnostics
}

#[test]
fn evaluates_operator_precedence_and_associativity() {
    let diagnostics = run("1 + 2 * 3 - 4 / 2");
    assert!(!diagnostics.had_error());
    assert!(!diagnostics.had_runtime_error());
}

#[test]
fn evaluates_comparison_chains_via_negated_pairs() {
    let diagnostics = run("(1 < 2) == !(2 < 1)");
    assert!(!diagnostics.had_error());
    assert!(!diagnostics.had_runtime_error());
}

#[test]
fn reports_runtime_error_on_non_numeric_negate() {
    let diagnostics = run("-nil");
    assert!(!diagnostics.had_error());
    assert!(diagnostics.had_runtime_error());
}

#[test]
fn reports_compile_error_on_malformed_expression() {
    let diagnostics = run("1 + ");
    assert!(diagnostics.had_error());
    assert!(!diagnostics.had_runtime_error());
}

#[test]
fn nested_groupings_compile_and_run() {
    let diagnostics = run("((1 + 2) * (3 - 1)) / 2");
    assert!(!diagnostics.had_error());
    assert!(!diagnostics.had_runtime_error());
}
