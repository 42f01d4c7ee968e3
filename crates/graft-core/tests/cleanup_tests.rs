use graft_core::ast::build::*;
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

#[test]
fn fully_inlined_definitions_are_removed() {
    let mut program = program(vec![
        func("two", vec![], vec![ret(int(2))]),
        let_("x", inline_call("two", vec![])),
        let_("y", inline_call("two", vec![])),
    ]);

    assert_eq!(
        run(&mut program),
        indoc! {"
            let x = 2;
            let y = 2;
        "}
    );
}

#[test]
fn uncalled_but_never_inlined_functions_stay() {
    let mut program = program(vec![
        func("unused", vec![], vec![ret(int(1))]),
        let_("x", int(2)),
    ]);

    let text = run(&mut program);
    assert!(text.contains("function unused"));
}

#[test]
fn definitions_with_remaining_callers_stay() {
    let mut program = program(vec![
        func("two", vec![], vec![ret(int(2))]),
        let_("x", inline_call("two", vec![])),
        let_("y", call("two", vec![])),
    ]);

    let text = run(&mut program);
    assert!(text.contains("function two"));
    assert!(text.contains("let x = 2;"));
    assert!(text.contains("let y = two();"));
}

#[test]
fn unreferenced_local_functions_are_cleaned_at_function_exit() {
    let mut program = program(vec![
        func(
            "outer",
            vec![],
            vec![
                func("helper", vec![], vec![ret(int(3))]),
                let_("v", inline_call("helper", vec![])),
                ret(ident("v")),
            ],
        ),
        let_("x", call("outer", vec![])),
    ]);

    assert_eq!(
        run(&mut program),
        indoc! {"
            function outer() {
                let v = 3;
                return v;
            }
            let x = outer();
        "}
    );
}

#[test]
fn function_valued_bindings_are_cleaned_too() {
    let mut program = program(vec![
        let_("double", func_expr(vec!["n"], vec![ret(mul(ident("n"), int(2)))])),
        let_("x", inline_call("double", vec![int(4)])),
    ]);

    assert_eq!(
        run(&mut program),
        indoc! {"
            let x = (4 * 2);
        "}
    );
}
