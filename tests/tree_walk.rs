//! End-to-end scenarios for the tree-walking engine.

use lox::error::Diagnostics;
use lox::interpret_tree;

fn run(source: &str) -> Diagnostics {
    let mut diagnostics = Diagnostics::new();
    interpret_tree(source, &mut diagnostics);
    diagnostics
}

#[test]
fn scenario_closures_share_mutable_captured_state() {
    let diagnostics = run(
        r#"
        fun makeCounter() {
            var count = 0;
            fun increment() {
                count = count + 1;
                return count;
            }
            return increment;
        }
        var a = makeCounter();
        var b = makeCounter();
        print a();
        print a();
        print b();
        "#,
    );
    assert!(!diagnostics.had_error());
    assert!(!diagnostics.had_runtime_error());
}

#[test]
fn scenario_single_inheritance_method_override_and_super() {
    let diagnostics = run(
        r#"
        class Greeter {
            greet() { return "Hello"; }
        }
        class LoudGreeter < Greeter {
            greet() { return super.greet() + "!"; }
        }
        print LoudGreeter().greet();
        "#,
    );
    assert!(!diagnostics.had_error());
    assert!(!diagnostics.had_runtime_error());
}

#[test]
fn scenario_short_circuit_and_or_do_not_evaluate_right_operand() {
    let diagnostics = run(
        r#"
        fun boom() { return explode_please; }
        print false and boom();
        print true or boom();
        "#,
    );
    assert!(!diagnostics.had_error());
    assert!(!diagnostics.had_runtime_error());
}

#[test]
fn scenario_constructor_protocol_binds_this_and_returns_instance() {
    let diagnostics = run(
        r#"
        class Point {
            init(x, y) {
                this.x = x;
                this.y = y;
            }
            sum() { return this.x + this.y; }
        }
        var p = Point(3, 4);
        print p.sum();
        "#,
    );
    assert!(!diagnostics.had_error());
    assert!(!diagnostics.had_runtime_error());
}

#[test]
fn scenario_block_scoping_restores_outer_binding_after_shadow() {
    let diagnostics = run(
        r#"
        var x = "outer";
        {
            var x = "inner";
            print x;
        }
        print x;
        "#,
    );
    assert!(!diagnostics.had_error());
    assert!(!diagnostics.had_runtime_error());
}

#[test]
fn scenario_runtime_error_on_undefined_global_aborts_execution() {
    let diagnostics = run("print undefinedThing;");
    assert!(!diagnostics.had_error());
    assert!(diagnostics.had_runtime_error());
}

#[test]
fn scenario_static_error_on_bad_syntax_does_not_run_anything() {
    let diagnostics = run("var = ;");
    assert!(diagnostics.had_error());
    assert!(!diagnostics.had_runtime_error());
}

#[test]
fn scenario_resolver_rejects_self_referential_superclass() {
    let diagnostics = run("class Oops < Oops {}");
    assert!(diagnostics.had_error());
}

#[test]
fn scenario_while_loop_and_arithmetic_agree_with_ieee754() {
    let diagnostics = run(
        r#"
        var i = 0;
        var total = 0;
        while (i < 5) {
            total = total + i;
            i = i + 1;
        }
        print total;
        print 0.1 + 0.2;
        "#,
    );
    assert!(!diagnostics.had_error());
    assert!(!diagnostics.had_runtime_error());
}
