use graft_core::ast::build::*;
use graft_core::ast::expression::CalleeDescriptor;
use graft_core::ast::printer::print_program;
use graft_core::ast::statement::{FunctionDef, Statement};
use graft_core::ast::Program;
use graft_core::{
    CollectingDiagnosticHandler, Diagnostic, DiagnosticHandler, FunctionSource,
    InlineExpansionPass,
};
use indoc::indoc;

/// A provider backed by one other unit, counting lookups.
struct MathUnit {
    lookups: usize,
}

impl FunctionSource for MathUnit {
    fn lookup(&mut self, target: &CalleeDescriptor) -> Option<FunctionDef> {
        self.lookups += 1;
        if target.unit.as_deref() != Some("math") {
            return None;
        }
        match target.name.as_str() {
            "triple" => {
                let Statement::Function(mut def) = func(
                    "triple",
                    vec!["n"],
                    vec![let_("r", mul(ident("n"), int(3))), ret(ident("r"))],
                ) else {
                    unreachable!()
                };
                def.name = None;
                Some(def)
            }
            _ => None,
        }
    }
}

fn run_with(source: &mut dyn FunctionSource, program: &mut Program) -> Vec<Diagnostic> {
    let handler = CollectingDiagnosticHandler::new();
    InlineExpansionPass::new(source, &handler).run(program);
    handler.get_diagnostics()
}

#[test]
fn cross_unit_bodies_are_fetched_and_expanded() {
    let mut source = MathUnit { lookups: 0 };
    let mut program = program(vec![let_(
        "t",
        cross_unit_call("math", "triple", vec![ident("k")]),
    )]);

    let diagnostics = run_with(&mut source, &mut program);

    assert!(diagnostics.is_empty());
    assert_eq!(
        print_program(&program),
        indoc! {"
            let n_1 = k;
            let r_1 = (n_1 * 3);
            let t = r_1;
        "}
    );
}

#[test]
fn fetches_are_memoized_per_target() {
    let mut source = MathUnit { lookups: 0 };
    let mut program = program(vec![
        let_("a", cross_unit_call("math", "triple", vec![int(1)])),
        let_("b", cross_unit_call("math", "triple", vec![int(2)])),
    ]);

    run_with(&mut source, &mut program);

    assert_eq!(source.lookups, 1);
    assert_eq!(
        print_program(&program),
        indoc! {"
            let r_1 = (1 * 3);
            let a = r_1;
            let r_2 = (2 * 3);
            let b = r_2;
        "}
    );
}

#[test]
fn unresolvable_targets_are_left_alone_without_diagnostics() {
    let mut source = MathUnit { lookups: 0 };
    let mut program = program(vec![
        let_("u", cross_unit_call("math", "halve", vec![int(8)])),
        let_("v", cross_unit_call("sound", "triple", vec![int(8)])),
    ]);

    let diagnostics = run_with(&mut source, &mut program);

    assert!(diagnostics.is_empty());
    let text = print_program(&program);
    assert!(text.contains("let u = halve(8);"));
    assert!(text.contains("let v = triple(8);"));
    // misses are memoized too
    assert_eq!(source.lookups, 2);
}
