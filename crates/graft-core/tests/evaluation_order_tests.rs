use graft_core::ast::build::*;
use graft_core::ast::expression::BinaryOp;
use graft_core::ast::printer::print_program;
use graft_core::ast::Program;
use graft_core::{
    CollectingDiagnosticHandler, DiagnosticHandler, InlineExpansionPass, NoExternalFunctions,
};
use indoc::indoc;

fn run(program: &mut Program) -> String {
    let handler = CollectingDiagnosticHandler::new();
    let mut source = NoExternalFunctions;
    InlineExpansionPass::new(&mut source, &handler).run(program);
    print_program(program)
}

fn square_def() -> graft_core::ast::statement::Statement {
    func(
        "square",
        vec!["n"],
        vec![let_("r", mul(ident("n"), ident("n"))), ret(ident("r"))],
    )
}

// ============================================================================
// Hoisting before an expanded call
// ============================================================================

#[test]
fn subexpressions_before_the_call_are_hoisted() {
    // seed() runs before square's body, and must keep doing so
    let mut program = program(vec![
        square_def(),
        let_("total", add(call("seed", vec![]), inline_call("square", vec![ident("k")]))),
    ]);

    assert_eq!(
        run(&mut program),
        indoc! {"
            let tmp_1 = seed();
            let n_1 = k;
            let r_1 = (n_1 * n_1);
            let tmp_2 = r_1;
            let total = (tmp_1 + tmp_2);
        "}
    );
}

#[test]
fn variable_reads_before_the_call_are_hoisted() {
    // the body could assign `a`; the read of `a` must happen first
    let mut program = program(vec![
        square_def(),
        let_("total", add(ident("a"), inline_call("square", vec![ident("k")]))),
    ]);

    assert_eq!(
        run(&mut program),
        indoc! {"
            let tmp_1 = a;
            let n_1 = k;
            let r_1 = (n_1 * n_1);
            let tmp_2 = r_1;
            let total = (tmp_1 + tmp_2);
        "}
    );
}

#[test]
fn literals_before_the_call_stay_in_place() {
    let mut program = program(vec![
        square_def(),
        let_("total", add(int(10), inline_call("square", vec![ident("k")]))),
    ]);

    assert_eq!(
        run(&mut program),
        indoc! {"
            let n_1 = k;
            let r_1 = (n_1 * n_1);
            let tmp_1 = r_1;
            let total = (10 + tmp_1);
        "}
    );
}

#[test]
fn hoisted_temporaries_are_themselves_decomposed() {
    // both operands contain expansions; the first is hoisted and then
    // rewritten in its new statement
    let mut program = program(vec![
        square_def(),
        let_(
            "total",
            add(
                inline_call("square", vec![ident("a")]),
                inline_call("square", vec![ident("b")]),
            ),
        ),
    ]);

    assert_eq!(
        run(&mut program),
        indoc! {"
            let n_1 = a;
            let r_1 = (n_1 * n_1);
            let tmp_1 = r_1;
            let n_2 = b;
            let r_2 = (n_2 * n_2);
            let tmp_2 = r_2;
            let total = (tmp_1 + tmp_2);
        "}
    );
}

#[test]
fn receiver_of_a_method_call_is_hoisted() {
    let mut program = program(vec![
        square_def(),
        expr_stmt(graft_core::ast::build::call_on(
            ident("sink"),
            "push",
            vec![inline_call("square", vec![ident("k")])],
        )),
    ]);

    assert_eq!(
        run(&mut program),
        indoc! {"
            let tmp_1 = sink;
            let n_1 = k;
            let r_1 = (n_1 * n_1);
            let tmp_2 = r_1;
            tmp_1.push(tmp_2);
        "}
    );
}

// ============================================================================
// Declaration groups
// ============================================================================

#[test]
fn expansion_in_a_later_binding_splits_the_group() {
    let mut program = program(vec![
        square_def(),
        let_group(vec![
            ("x".into(), Some(call("seed", vec![]))),
            ("y".into(), Some(inline_call("square", vec![ident("x")]))),
            ("z".into(), Some(call("tail", vec![]))),
        ]),
    ]);

    assert_eq!(
        run(&mut program),
        indoc! {"
            let x = seed();
            let n_1 = x;
            let r_1 = (n_1 * n_1);
            let y = r_1, z = tail();
        "}
    );
}

#[test]
fn expansion_in_the_first_binding_precedes_the_group() {
    let mut program = program(vec![
        square_def(),
        let_group(vec![
            ("x".into(), Some(inline_call("square", vec![ident("k")]))),
            ("y".into(), Some(call("tail", vec![]))),
        ]),
    ]);

    assert_eq!(
        run(&mut program),
        indoc! {"
            let n_1 = k;
            let r_1 = (n_1 * n_1);
            let x = r_1, y = tail();
        "}
    );
}

#[test]
fn two_expansions_split_the_group_twice() {
    let mut program = program(vec![
        square_def(),
        let_group(vec![
            ("x".into(), Some(call("seed", vec![]))),
            ("y".into(), Some(inline_call("square", vec![int(2)]))),
            ("z".into(), Some(inline_call("square", vec![ident("y")]))),
        ]),
    ]);

    assert_eq!(
        run(&mut program),
        indoc! {"
            let x = seed();
            let r_1 = (2 * 2);
            let y = r_1;
            let n_1 = y;
            let r_2 = (n_1 * n_1);
            let z = r_2;
        "}
    );
}

// ============================================================================
// Conditionally evaluated positions
// ============================================================================

#[test]
fn short_circuit_right_operand_is_not_expanded() {
    let mut program = program(vec![
        square_def(),
        let_(
            "z",
            binary(
                BinaryOp::And,
                ident("flag"),
                inline_call("square", vec![ident("k")]),
            ),
        ),
    ]);

    let text = run(&mut program);
    assert!(text.contains("(flag && square(k))"));
    // never expanded anywhere, so the definition stays
    assert!(text.contains("function square"));
}

#[test]
fn while_conditions_are_not_expanded() {
    let mut program = program(vec![
        square_def(),
        while_(
            binary(
                BinaryOp::GreaterThan,
                inline_call("square", vec![ident("k")]),
                int(0),
            ),
            vec![expr_stmt(call("step", vec![]))],
        ),
    ]);

    let text = run(&mut program);
    assert!(text.contains("while ((square(k) > 0))"));
}

#[test]
fn pure_expansions_are_fine_in_conditional_positions() {
    let mut program = program(vec![
        func("two", vec![], vec![ret(int(2))]),
        let_(
            "z",
            binary(BinaryOp::Or, ident("flag"), inline_call("two", vec![])),
        ),
    ]);

    let text = run(&mut program);
    assert!(text.contains("let z = (flag || 2);"));
    assert!(!text.contains("function two"));
}

#[test]
fn if_conditions_are_promoted_to_statement_level() {
    let mut program = program(vec![
        square_def(),
        if_(
            binary(
                BinaryOp::GreaterThan,
                inline_call("square", vec![ident("k")]),
                int(0),
            ),
            vec![expr_stmt(call("hit", vec![]))],
        ),
    ]);

    assert_eq!(
        run(&mut program),
        indoc! {"
            let n_1 = k;
            let r_1 = (n_1 * n_1);
            let tmp_1 = r_1;
            if ((tmp_1 > 0)) {
                hit();
            }
        "}
    );
}
