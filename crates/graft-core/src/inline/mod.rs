//! The function-inlining pass.
//!
//! A depth-first walk over the tree replaces every call flagged "must be
//! inlined" with an expansion of its target's body. Targets are processed
//! before their first expansion, so nested inline calls are resolved exactly
//! once; an in-process set breaks cyclic chains. Evaluation order is
//! preserved by hoisting everything evaluated before an expanded call into
//! temporaries, and by splitting multi-binding declarations so expansions
//! land between bindings.

mod cleanup;
mod collect;
mod context;
mod decompose;
mod effects;
mod mutator;
mod naming;
mod registry;
mod rename;

pub use context::CallTarget;
pub use registry::{FunctionRegistry, FunctionSource, NoExternalFunctions};

use tracing::debug;

use crate::ast::expression::{
    CallExpression, Expression, ExpressionKind, InlineStrategy,
};
use crate::ast::statement::{
    Binding, Block, DeclarationGroup, FunctionDef, Statement,
};
use crate::ast::{FunctionId, Program, Spanned};
use crate::diagnostics::{Diagnostic, DiagnosticCode, DiagnosticHandler};
use crate::span::Span;

use context::{CallInfo, CallSite, FunctionContext, GroupFrame, InliningContext, StatementCursor};
use naming::NameSupply;

/// The pass entry point. Both collaborators are injected: the source that
/// supplies function bodies from other units, and the sink that receives
/// cycle diagnostics.
pub struct InlineExpansionPass<'a> {
    source: &'a mut dyn FunctionSource,
    handler: &'a dyn DiagnosticHandler,
}

impl<'a> InlineExpansionPass<'a> {
    pub fn new(source: &'a mut dyn FunctionSource, handler: &'a dyn DiagnosticHandler) -> Self {
        InlineExpansionPass { source, handler }
    }

    /// Expand every resolvable inline call in `program`, in place. Returns
    /// whether anything changed. Running the pass again on its own output
    /// is a no-op.
    pub fn run(&mut self, program: &mut Program) -> bool {
        let mut walker = Inliner::new(&mut *self.source, self.handler);
        walker.run(program)
    }
}

pub(crate) struct Inliner<'a> {
    source: &'a mut dyn FunctionSource,
    handler: &'a dyn DiagnosticHandler,
    registry: FunctionRegistry,
    names: NameSupply,
    contexts: Vec<InliningContext>,
    named_stack: Vec<FunctionId>,
    call_infos: Vec<CallInfo>,
    changed: bool,
}

impl<'a> Inliner<'a> {
    fn new(source: &'a mut dyn FunctionSource, handler: &'a dyn DiagnosticHandler) -> Self {
        Inliner {
            source,
            handler,
            registry: FunctionRegistry::new(),
            names: NameSupply::new(),
            contexts: Vec::new(),
            named_stack: Vec::new(),
            call_infos: Vec::new(),
            changed: false,
        }
    }

    fn run(&mut self, program: &mut Program) -> bool {
        debug!("inline expansion started");
        collect::reserve_program_names(program, &mut self.names);
        collect::label_functions(program, &mut self.registry);

        self.contexts.push(InliningContext::root());
        self.visit_statement_list(&mut program.statements);
        self.contexts.pop().expect("root inlining context missing");

        assert!(self.contexts.is_empty(), "inlining context leaked");
        assert!(self.call_infos.is_empty(), "open-call stack leaked");

        self.remove_unused_definitions(program);
        debug!(changed = self.changed, "inline expansion finished");
        self.changed
    }

    // -- statement traversal ------------------------------------------------

    fn visit_statement_list(&mut self, stmts: &mut Vec<Statement>) {
        self.decompose_statement_list(stmts);

        let mut index = 0;
        while index < stmts.len() {
            let mut cursor = StatementCursor::new();
            self.visit_statement(&mut stmts[index], &mut cursor);

            let StatementCursor { before, remove } = cursor;
            let inserted = before.len();
            if inserted > 0 {
                self.changed = true;
                stmts.splice(index..index, before);
            }
            if remove {
                self.changed = true;
                stmts.remove(index + inserted);
                index += inserted;
            } else {
                index += inserted + 1;
            }
        }
    }

    fn visit_statement(&mut self, stmt: &mut Statement, cursor: &mut StatementCursor) {
        match stmt {
            Statement::Declaration(group) => self.visit_declaration_group(group, cursor),
            Statement::Function(def) => self.visit_function_statement(def),
            Statement::Expression(e) => {
                if matches!(e.kind, ExpressionKind::Call(_)) {
                    self.process_call(e, CallSite::ExpressionStatement, Some(cursor));
                    return;
                }
                if let ExpressionKind::Assign(target, value) = &mut e.kind {
                    if matches!(target.kind, ExpressionKind::Identifier(_))
                        && matches!(value.kind, ExpressionKind::Call(_))
                    {
                        self.process_call(value, CallSite::AssignRhs, Some(cursor));
                        return;
                    }
                }
                self.visit_expr(e);
            }
            Statement::Return(ret) => {
                if let Some(value) = &mut ret.value {
                    if matches!(value.kind, ExpressionKind::Call(_)) {
                        self.process_call(value, CallSite::ReturnValue, Some(cursor));
                    } else {
                        self.visit_expr(value);
                    }
                }
            }
            Statement::If(if_stmt) => {
                self.visit_expr(&mut if_stmt.condition);
                self.visit_block(&mut if_stmt.then_block);
                if let Some(else_block) = &mut if_stmt.else_block {
                    self.visit_block(else_block);
                }
            }
            Statement::While(while_stmt) => {
                self.visit_expr(&mut while_stmt.condition);
                self.visit_block(&mut while_stmt.body);
            }
            Statement::Block(block) => self.visit_block(block),
            Statement::Break(_) => {}
            Statement::Labeled(labeled) => {
                self.visit_statement(&mut labeled.body, cursor);
                if cursor.remove {
                    // the labeled wrapper must survive; only its body goes
                    cursor.remove = false;
                    labeled.body = Box::new(Statement::Block(Block::new(vec![], labeled.span)));
                }
            }
        }
    }

    fn visit_block(&mut self, block: &mut Block) {
        self.visit_statement_list(&mut block.statements);
    }

    /// Visit a declaration group, cutting it whenever visiting a binding
    /// inserted statements: those statements must land strictly between the
    /// previous binding and the current one. The cut index only advances;
    /// relocated bindings are drained once, on exit.
    fn visit_declaration_group(&mut self, group: &mut DeclarationGroup, cursor: &mut StatementCursor) {
        let mut frame = GroupFrame { cut: 0 };
        for index in 0..group.bindings.len() {
            let mark = cursor.before.len();
            let binding_name = group.bindings[index].name.node.clone();
            let mut init = group.bindings[index].init.take();
            if let Some(init_expr) = init.as_mut() {
                self.visit_binding_init(&binding_name, init_expr, cursor);
            }
            group.bindings[index].init = init;

            if cursor.before.len() > mark && index > frame.cut {
                let moved = group.bindings[frame.cut..index].to_vec();
                cursor.before.insert(
                    mark,
                    Statement::Declaration(DeclarationGroup {
                        bindings: moved,
                        span: group.span,
                    }),
                );
                frame.cut = index;
            }
        }
        if frame.cut > 0 {
            group.bindings.drain(0..frame.cut);
        }
        assert!(
            !group.bindings.is_empty(),
            "declaration group lost every binding"
        );
    }

    fn visit_binding_init(
        &mut self,
        binding_name: &str,
        init: &mut Expression,
        cursor: &mut StatementCursor,
    ) {
        if let ExpressionKind::Function(def) = &mut init.kind {
            let id = def.uid.expect("function expression was never labeled");
            if self.registry.lookup_local(binding_name) == Some(id) {
                // the canonical copy is processed once; the defining
                // occurrence picks up the result
                self.ensure_processed(id);
                let processed = self.registry.def(id).expect("processed body missing");
                def.params = processed.params.clone();
                def.body = processed.body.clone();
            } else {
                self.visit_function(def);
            }
            return;
        }
        if matches!(init.kind, ExpressionKind::Call(_)) {
            self.process_call(init, CallSite::BindingInit, Some(cursor));
        } else {
            self.visit_expr(init);
        }
    }

    fn visit_function_statement(&mut self, def: &mut FunctionDef) {
        let id = def.uid.expect("function statement was never labeled");
        // only the occurrence the registry resolves to picks up the
        // canonical processed body; renamed copies inside expansions, and
        // definitions inside fetched bodies, are handled where they stand
        let canonical = def
            .name
            .as_ref()
            .is_some_and(|name| self.registry.lookup_local(&name.node) == Some(id));
        if canonical {
            self.ensure_processed(id);
            let processed = self.registry.def(id).expect("processed body missing");
            def.params = processed.params.clone();
            def.body = processed.body.clone();
        } else {
            self.visit_function(def);
        }
    }

    // -- expression traversal -----------------------------------------------

    fn visit_expr(&mut self, e: &mut Expression) {
        if matches!(e.kind, ExpressionKind::Call(_)) {
            self.process_call(e, CallSite::Subexpression, None);
            return;
        }
        match &mut e.kind {
            ExpressionKind::Identifier(_) | ExpressionKind::Literal(_) => {}
            ExpressionKind::Binary(_, left, right) => {
                self.visit_expr(left);
                self.visit_expr(right);
            }
            ExpressionKind::Unary(_, operand) => self.visit_expr(operand),
            ExpressionKind::Assign(target, value) => {
                self.visit_expr(target);
                self.visit_expr(value);
            }
            ExpressionKind::Conditional(cond, then, other) => {
                self.visit_expr(cond);
                self.visit_expr(then);
                self.visit_expr(other);
            }
            ExpressionKind::New(new) => {
                self.visit_expr(&mut new.callee);
                for arg in &mut new.args {
                    self.visit_expr(arg);
                }
            }
            ExpressionKind::Member(object, _) => self.visit_expr(object),
            ExpressionKind::Index(object, key) => {
                self.visit_expr(object);
                self.visit_expr(key);
            }
            ExpressionKind::Function(def) => self.visit_function(def),
            ExpressionKind::Call(_) => unreachable!("handled above"),
        }
    }

    fn visit_function(&mut self, def: &mut FunctionDef) {
        let id = def.uid.expect("function was never labeled");
        if self.registry.is_processed(id) {
            return;
        }
        self.process_function_body(def, id);
    }

    // -- function processing ------------------------------------------------

    /// Process the registry's canonical copy of `id`, if it has not been
    /// already. Safe to call at a call site before the walker has reached
    /// the defining occurrence.
    fn ensure_processed(&mut self, id: FunctionId) {
        if self.registry.is_processed(id) {
            return;
        }
        assert!(
            !self.registry.is_in_process(id),
            "inliner revisited a function that is still being processed"
        );
        let mut def = self
            .registry
            .take_def(id)
            .expect("function body missing from registry");
        self.process_function_body(&mut def, id);
        self.registry.put_def(id, def);
    }

    fn process_function_body(&mut self, def: &mut FunctionDef, id: FunctionId) {
        self.registry.begin_processing(id);
        self.contexts.push(InliningContext::for_function(id));
        let named = self.registry.is_named(id);
        if named {
            self.named_stack.push(id);
        }

        for param in &mut def.params {
            if let Some(default) = &mut param.default {
                self.visit_expr(default);
            }
        }
        self.visit_statement_list(&mut def.body.statements);
        self.cleanup_local_functions(&mut def.body);

        if named {
            let popped = self.named_stack.pop();
            assert_eq!(popped, Some(id), "named-function stack out of order");
        }
        let context = self.contexts.pop().expect("inlining context stack underflow");
        assert_eq!(context.function, Some(id), "inlining context stack out of order");
        self.registry.finish_processing(id);
    }

    // -- calls --------------------------------------------------------------

    fn process_call(
        &mut self,
        expr: &mut Expression,
        site: CallSite,
        mut cursor: Option<&mut StatementCursor>,
    ) {
        let span = expr.span;
        let ExpressionKind::Call(call) = &mut expr.kind else {
            unreachable!("process_call on a non-call expression")
        };

        if !call.inline.strategy.is_inline() {
            self.visit_call_children(call);
            return;
        }

        let Some(target) = self.resolve_call(call) else {
            // no resolvable body; compile as a normal call, silently
            call.inline.strategy = InlineStrategy::NotInline;
            self.changed = true;
            debug!(%span, "call left un-inlined: target not resolvable");
            self.visit_call_children(call);
            return;
        };

        let pushed = if let Some(&containing) = self.named_stack.last() {
            self.call_infos.push(CallInfo {
                span,
                target: call.inline.target.clone(),
                containing,
            });
            true
        } else {
            false
        };

        match target {
            CallTarget::Registered(id) => {
                if self.registry.is_in_process(id) {
                    self.report_inline_cycle(call, id);
                } else if !self.registry.is_processed(id) {
                    self.ensure_processed(id);
                }
            }
            // the definition is the callee; it is processed with the other
            // children below
            CallTarget::Direct(_) => {}
        }

        self.visit_call_children(call);

        let still_inline = {
            let ExpressionKind::Call(call) = &expr.kind else {
                unreachable!()
            };
            call.inline.strategy.is_inline()
        };
        if still_inline {
            if site.is_statement_level() {
                let cursor = cursor
                    .as_deref_mut()
                    .expect("statement-level call site without an insertion cursor");
                self.expand_at_statement(expr, target, site, cursor);
            } else if self.pure_expansion_possible(expr, target) {
                self.expand_pure(expr, target);
            } else {
                // conditionally evaluated position: hoisting the body would
                // change behavior, so the call stays a call
                let ExpressionKind::Call(call) = &mut expr.kind else {
                    unreachable!()
                };
                call.inline.strategy = InlineStrategy::NotInline;
                self.changed = true;
                debug!(%span, "call left un-inlined in a conditionally evaluated position");
            }
        }

        if pushed {
            let info = self.call_infos.pop().expect("open-call stack underflow");
            assert_eq!(info.span, span, "open-call stack out of order");
        }
    }

    fn visit_call_children(&mut self, call: &mut CallExpression) {
        self.visit_expr(&mut call.callee);
        for arg in &mut call.args {
            self.visit_expr(arg);
        }
    }

    fn resolve_call(&mut self, call: &CallExpression) -> Option<CallTarget> {
        FunctionContext::resolve(call, &mut self.registry, &mut *self.source, &mut self.names)
    }

    // -- cycle detection ----------------------------------------------------

    /// Downgrade the cyclic call and report one diagnostic per open call,
    /// newest first, down to (and including) the first frame whose enclosing
    /// function is the cyclic target.
    fn report_inline_cycle(&mut self, call: &mut CallExpression, target: FunctionId) {
        call.inline.strategy = InlineStrategy::NotInline;
        self.changed = true;
        debug!("inline cycle detected");

        let handler = self.handler;
        for info in self.call_infos.iter().rev() {
            if let Some(descriptor) = &info.target {
                handler.report(Diagnostic::error(
                    info.span,
                    DiagnosticCode::InlineCallCycle,
                    format!(
                        "cannot inline '{}': the inline call chain is cyclic",
                        descriptor.name
                    ),
                ));
            }
            if info.containing == target {
                break;
            }
        }
    }

    // -- shared helpers -----------------------------------------------------

    fn fresh_name(&mut self, base: &str) -> String {
        let context = self
            .contexts
            .last_mut()
            .expect("inlining context stack is empty");
        context.naming.fresh(&mut self.names, base)
    }

    fn function_context_mut(&mut self) -> &mut FunctionContext {
        &mut self
            .contexts
            .last_mut()
            .expect("inlining context stack is empty")
            .functions
    }

    fn function_context(&self) -> &FunctionContext {
        &self
            .contexts
            .last()
            .expect("inlining context stack is empty")
            .functions
    }
}

// ---------------------------------------------------------------------------
// Small node constructors used by the rewriting stages
// ---------------------------------------------------------------------------

pub(crate) fn ident_expr(name: impl Into<String>, span: Span) -> Expression {
    Expression::new(ExpressionKind::Identifier(name.into()), span)
}

pub(crate) fn single_binding(name: String, init: Option<Expression>, span: Span) -> Statement {
    Statement::Declaration(DeclarationGroup {
        bindings: vec![Binding {
            name: Spanned::new(name, span),
            init,
            span,
        }],
        span,
    })
}
