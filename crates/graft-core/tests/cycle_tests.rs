use graft_core::ast::build::*;
use graft_core::ast::expression::{ExpressionKind, InlineStrategy};
use graft_core::ast::printer::print_program;
use graft_core::ast::statement::Statement;
use graft_core::ast::Program;
use graft_core::{
    CollectingDiagnosticHandler, Diagnostic, DiagnosticCode, DiagnosticHandler, DiagnosticLevel,
    InlineExpansionPass, NoExternalFunctions,
};

fn run(program: &mut Program) -> (bool, Vec<Diagnostic>) {
    let handler = CollectingDiagnosticHandler::new();
    let mut source = NoExternalFunctions;
    let changed = InlineExpansionPass::new(&mut source, &handler).run(program);
    (changed, handler.get_diagnostics())
}

/// No call in the tree may keep the inline strategy after the pass.
fn assert_no_flagged_calls(program: &Program) {
    fn check_stmt(stmt: &Statement) {
        match stmt {
            Statement::Declaration(group) => {
                for binding in &group.bindings {
                    if let Some(init) = &binding.init {
                        check_expr(init);
                    }
                }
            }
            Statement::Function(def) => {
                for s in &def.body.statements {
                    check_stmt(s);
                }
            }
            Statement::Expression(e) => check_expr(e),
            Statement::Return(ret) => {
                if let Some(value) = &ret.value {
                    check_expr(value);
                }
            }
            Statement::If(if_stmt) => {
                check_expr(&if_stmt.condition);
                for s in &if_stmt.then_block.statements {
                    check_stmt(s);
                }
                if let Some(else_block) = &if_stmt.else_block {
                    for s in &else_block.statements {
                        check_stmt(s);
                    }
                }
            }
            Statement::While(while_stmt) => {
                check_expr(&while_stmt.condition);
                for s in &while_stmt.body.statements {
                    check_stmt(s);
                }
            }
            Statement::Block(block) => {
                for s in &block.statements {
                    check_stmt(s);
                }
            }
            Statement::Break(_) => {}
            Statement::Labeled(labeled) => check_stmt(&labeled.body),
        }
    }
    fn check_expr(e: &graft_core::ast::expression::Expression) {
        match &e.kind {
            ExpressionKind::Call(call) => {
                assert_ne!(
                    call.inline.strategy,
                    InlineStrategy::Inline,
                    "a call survived the pass still flagged inline"
                );
                check_expr(&call.callee);
                for arg in &call.args {
                    check_expr(arg);
                }
            }
            ExpressionKind::Binary(_, l, r) => {
                check_expr(l);
                check_expr(r);
            }
            ExpressionKind::Unary(_, x) => check_expr(x),
            ExpressionKind::Assign(t, v) => {
                check_expr(t);
                check_expr(v);
            }
            ExpressionKind::Conditional(c, t, o) => {
                check_expr(c);
                check_expr(t);
                check_expr(o);
            }
            ExpressionKind::New(new) => {
                check_expr(&new.callee);
                for arg in &new.args {
                    check_expr(arg);
                }
            }
            ExpressionKind::Member(o, _) => check_expr(o),
            ExpressionKind::Index(o, k) => {
                check_expr(o);
                check_expr(k);
            }
            ExpressionKind::Function(def) => {
                for s in &def.body.statements {
                    check_stmt(s);
                }
            }
            _ => {}
        }
    }
    for stmt in &program.statements {
        check_stmt(stmt);
    }
}

#[test]
fn direct_recursion_is_downgraded_and_reported() {
    let mut program = program(vec![
        func("f", vec![], vec![ret(inline_call("f", vec![]))]),
        let_("x", inline_call("f", vec![])),
    ]);

    let (_, diagnostics) = run(&mut program);

    assert_eq!(diagnostics.len(), 1);
    assert_eq!(diagnostics[0].code, DiagnosticCode::InlineCallCycle);
    assert_eq!(diagnostics[0].level, DiagnosticLevel::Error);
    assert!(diagnostics[0].message.contains("'f'"));
    assert_no_flagged_calls(&program);

    // the pass terminated normally and the function still calls itself
    let text = print_program(&program);
    assert!(text.contains("f()"));
}

#[test]
fn mutual_recursion_reports_the_whole_chain() {
    let mut program = program(vec![
        func("a", vec![], vec![ret(inline_call("b", vec![]))]),
        func("b", vec![], vec![ret(inline_call("a", vec![]))]),
        let_("x", inline_call("a", vec![])),
    ]);

    let (_, diagnostics) = run(&mut program);

    // one diagnostic per open call on the cyclic path, newest first
    assert_eq!(diagnostics.len(), 2);
    assert!(diagnostics[0].message.contains("'a'"));
    assert!(diagnostics[1].message.contains("'b'"));
    assert_no_flagged_calls(&program);
}

#[test]
fn three_party_cycle_terminates() {
    let mut program = program(vec![
        func("a", vec![], vec![ret(inline_call("b", vec![]))]),
        func("b", vec![], vec![ret(inline_call("c", vec![]))]),
        func("c", vec![], vec![ret(inline_call("a", vec![]))]),
        let_("x", inline_call("a", vec![])),
    ]);

    let (_, diagnostics) = run(&mut program);

    assert_eq!(diagnostics.len(), 3);
    assert_no_flagged_calls(&program);
}

#[test]
fn cycle_does_not_block_unrelated_inlining() {
    let mut program = program(vec![
        func("loop_a", vec![], vec![ret(inline_call("loop_a", vec![]))]),
        func("plain", vec![], vec![ret(int(5))]),
        expr_stmt(inline_call("loop_a", vec![])),
        let_("x", inline_call("plain", vec![])),
    ]);

    let (_, diagnostics) = run(&mut program);

    assert_eq!(diagnostics.len(), 1);
    let text = print_program(&program);
    // the cyclic call compiles as a normal call; the unrelated one inlined
    assert!(text.contains("loop_a()"));
    assert!(text.contains("let x = 5;"));
    assert!(!text.contains("function plain"));
}
