//! Substitution: turning a call plus its target's body into a statement
//! prelude and an optional result expression.

use rustc_hash::FxHashMap;

use crate::ast::expression::{Expression, ExpressionKind};
use crate::ast::statement::{
    Block, BreakStatement, FunctionDef, LabeledStatement, Statement,
};
use tracing::debug;

use super::context::{CallSite, CallTarget};
use super::effects::{can_have_side_effect, contains_call, is_literal, literal_nil};
use super::{collect, ident_expr, rename, single_binding, Inliner};

pub(crate) struct Expansion {
    pub prelude: Vec<Statement>,
    pub result: Option<Expression>,
}

impl Inliner<'_> {
    /// Replace a statement-level call with its expansion: the prelude goes
    /// through the insertion cursor, the call node becomes the result
    /// expression. A bare call statement with no result is deleted.
    pub(crate) fn expand_at_statement(
        &mut self,
        expr: &mut Expression,
        target: CallTarget,
        site: CallSite,
        cursor: &mut super::context::StatementCursor,
    ) {
        let span = expr.span;
        let def = self.clone_target_def(expr, target);
        let label_base = expansion_label(&def, expr);

        let ExpressionKind::Call(call) = &mut expr.kind else {
            unreachable!("expand_at_statement on a non-call expression")
        };
        self.function_context_mut().declare_constructor_args(&call.args);
        let args = std::mem::take(&mut call.args);
        self.registry.mark_inlined(target.id());

        let mut expansion = self.expand_call(def, args, site.result_needed(), &label_base);
        // nested inline calls inside the clone are resolved before splicing
        self.visit_statement_list(&mut expansion.prelude);
        cursor.before.append(&mut expansion.prelude);

        match expansion.result {
            Some(mut result) => {
                self.visit_expr(&mut result);
                result.span = span;
                *expr = result;
            }
            None => {
                assert!(
                    matches!(site, CallSite::ExpressionStatement),
                    "missing result expression at a value-position call site"
                );
                cursor.remove = true;
            }
        }
        self.changed = true;
        debug!(%span, callee = %label_base, "inlined call");
    }

    /// The whole substitution algorithm for one call, producing owned nodes
    /// and never touching the surrounding statement list.
    pub(crate) fn expand_call(
        &mut self,
        def: FunctionDef,
        args: Vec<Expression>,
        result_needed: bool,
        label_base: &str,
    ) -> Expansion {
        let FunctionDef { params, mut body, .. } = def;
        let mut prelude = Vec::new();

        // bind parameters in argument order; missing arguments fall back to
        // the parameter default
        let assigned = collect::collect_assigned_names(&body);
        let mut substitution: FxHashMap<String, Expression> = FxHashMap::default();
        let mut args = args.into_iter();
        for (index, param) in params.iter().enumerate() {
            let value = match args.next() {
                Some(arg) => arg,
                None => param.default.clone().unwrap_or_else(literal_nil),
            };
            let direct = is_literal(&value)
                && !assigned.contains(&param.name.node)
                && !self.function_context().is_constructor_arg(index);
            if direct {
                substitution.insert(param.name.node.clone(), value);
            } else {
                let span = value.span;
                let fresh = self.fresh_name(&param.name.node);
                substitution.insert(param.name.node.clone(), ident_expr(fresh.clone(), span));
                prelude.push(single_binding(fresh, Some(value), span));
            }
        }
        // surplus arguments are still evaluated, in order
        for extra in args {
            if is_literal(&extra) {
                continue;
            }
            let span = extra.span;
            let fresh = self.fresh_name("arg");
            prelude.push(single_binding(fresh, Some(extra), span));
        }

        // freshen everything the body declares, then everything it labels;
        // uniform renaming keeps the shadowing structure intact
        let declared = collect::collect_declared_names(&body);
        if !declared.is_empty() {
            let mut map = FxHashMap::default();
            for name in &declared {
                let fresh = self.fresh_name(name);
                map.insert(name.clone(), fresh);
            }
            rename::rename_names(&mut body.statements, &map);
        }
        let labels = collect::collect_labels(&body);
        if !labels.is_empty() {
            let mut map = FxHashMap::default();
            for label in &labels {
                let fresh = self.fresh_name(label);
                map.insert(label.clone(), fresh);
            }
            rename::rename_labels(&mut body.statements, &map);
        }
        // declarations that shadowed a parameter were renamed away, so the
        // remaining occurrences really are the parameters
        if !substitution.is_empty() {
            rename::substitute_identifiers(&mut body.statements, &substitution);
        }

        truncate_after_return(&mut body.statements);

        let result = self.lower_returns(&mut body, result_needed, label_base, &mut prelude);
        Expansion { prelude, result }
    }

    /// Lower the body's returns into the prelude. A body whose only return
    /// is its final statement needs no control flow; anything else routes
    /// returns through `break` out of a fresh labeled block, assigning a
    /// fresh result binding on the way when the call's value is used.
    fn lower_returns(
        &mut self,
        body: &mut Block,
        result_needed: bool,
        label_base: &str,
        prelude: &mut Vec<Statement>,
    ) -> Option<Expression> {
        let span = body.span;
        let returns = count_returns(&body.statements);

        if returns == 0 {
            prelude.append(&mut body.statements);
            return result_needed.then(literal_nil);
        }

        let single_trailing =
            returns == 1 && matches!(body.statements.last(), Some(Statement::Return(_)));
        if single_trailing {
            let Some(Statement::Return(ret)) = body.statements.pop() else {
                unreachable!()
            };
            prelude.append(&mut body.statements);
            return match (result_needed, ret.value) {
                (true, Some(value)) => Some(value),
                (true, None) => Some(literal_nil()),
                (false, Some(value)) => {
                    if can_have_side_effect(&value) {
                        prelude.push(Statement::Expression(value));
                    }
                    None
                }
                (false, None) => None,
            };
        }

        let result_name = if result_needed {
            let fresh = self.fresh_name(&format!("{}_result", label_base));
            prelude.push(single_binding(fresh.clone(), None, span));
            Some(fresh)
        } else {
            None
        };
        let label = self.fresh_name(&format!("{}_exit", label_base));

        rewrite_returns(&mut body.statements, result_name.as_deref(), &label);
        if let Some(Statement::Break(brk)) = body.statements.last() {
            // a break as the very last statement of the labeled block is a
            // no-op
            if brk.label.as_deref() == Some(label.as_str()) {
                body.statements.pop();
            }
        }

        let inner = Block::new(std::mem::take(&mut body.statements), span);
        prelude.push(Statement::Labeled(LabeledStatement {
            label,
            body: Box::new(Statement::Block(inner)),
            span,
        }));
        result_name.map(|name| ident_expr(name, span))
    }

    /// Replace a pure call in place: no temporaries, no statements, just
    /// the target's return expression with literal arguments substituted.
    pub(crate) fn expand_pure(&mut self, expr: &mut Expression, target: CallTarget) {
        let span = expr.span;
        let def = self.clone_target_def(expr, target);
        let ExpressionKind::Call(call) = &mut expr.kind else {
            unreachable!("expand_pure on a non-call expression")
        };
        let args = std::mem::take(&mut call.args);
        self.registry.mark_inlined(target.id());

        let FunctionDef { params, mut body, .. } = def;
        let Some(Statement::Return(ret)) = body.statements.pop() else {
            unreachable!("pure expansion target lost its return")
        };
        let mut result = ret.value.expect("pure expansion target has no value");

        let mut substitution: FxHashMap<String, Expression> = FxHashMap::default();
        let mut args = args.into_iter();
        for param in &params {
            let value = match args.next() {
                Some(arg) => arg,
                None => param.default.clone().unwrap_or_else(literal_nil),
            };
            substitution.insert(param.name.node.clone(), value);
        }
        rename::substitute_in_expr(&mut result, &substitution);

        result.span = span;
        *expr = result;
        self.changed = true;
        debug!(%span, "inlined pure call");
    }

    /// Whether `call` expands to a bare expression: a single-`return e`
    /// body where `e` cannot change shape under further inlining, and
    /// effect-free literal arguments (defaults included for the missing
    /// ones). Such calls substitute anywhere, even in conditionally
    /// evaluated positions.
    pub(crate) fn pure_expansion_possible(&mut self, expr: &Expression, target: CallTarget) -> bool {
        let ExpressionKind::Call(call) = &expr.kind else {
            return false;
        };
        self.pure_target(call, target)
    }

    pub(crate) fn pure_target(
        &mut self,
        call: &crate::ast::expression::CallExpression,
        target: CallTarget,
    ) -> bool {
        let def = match target {
            CallTarget::Registered(id) => match self.registry.def(id) {
                Some(def) => def,
                None => return false,
            },
            CallTarget::Direct(_) => match &call.callee.kind {
                ExpressionKind::Function(def) => def.as_ref(),
                _ => return false,
            },
        };
        let Some(value) = single_trailing_return_value(&def.body) else {
            return false;
        };
        if can_have_side_effect(value) || contains_call(value) {
            return false;
        }
        if !call.args.iter().all(is_literal) {
            return false;
        }
        def.params
            .iter()
            .skip(call.args.len())
            .all(|param| param.default.as_ref().map_or(true, is_literal))
    }

    fn clone_target_def(&self, expr: &Expression, target: CallTarget) -> FunctionDef {
        match target {
            CallTarget::Registered(id) => {
                assert!(
                    self.registry.is_processed(id),
                    "expanding a function that was never processed"
                );
                self.registry
                    .def(id)
                    .expect("processed body missing from registry")
                    .clone()
            }
            CallTarget::Direct(_) => {
                let ExpressionKind::Call(call) = &expr.kind else {
                    unreachable!()
                };
                let ExpressionKind::Function(def) = &call.callee.kind else {
                    unreachable!("direct call target without a function callee")
                };
                (**def).clone()
            }
        }
    }
}

fn expansion_label(def: &FunctionDef, call_expr: &Expression) -> String {
    if let Some(name) = &def.name {
        return name.node.clone();
    }
    if let ExpressionKind::Call(call) = &call_expr.kind {
        if let Some(descriptor) = &call.inline.target {
            return descriptor.name.clone();
        }
        if let ExpressionKind::Identifier(name) = &call.callee.kind {
            return name.clone();
        }
    }
    "inline".to_string()
}

fn single_trailing_return_value(body: &Block) -> Option<&Expression> {
    match body.statements.as_slice() {
        [Statement::Return(ret)] => ret.value.as_ref(),
        _ => None,
    }
}

/// Nothing after a top-level return can execute.
fn truncate_after_return(stmts: &mut Vec<Statement>) {
    if let Some(position) = stmts
        .iter()
        .position(|stmt| matches!(stmt, Statement::Return(_)))
    {
        stmts.truncate(position + 1);
    }
}

/// Count returns that belong to this body (nested functions keep theirs).
fn count_returns(stmts: &[Statement]) -> usize {
    let mut count = 0;
    for stmt in stmts {
        match stmt {
            Statement::Return(_) => count += 1,
            Statement::If(if_stmt) => {
                count += count_returns(&if_stmt.then_block.statements);
                if let Some(else_block) = &if_stmt.else_block {
                    count += count_returns(&else_block.statements);
                }
            }
            Statement::While(while_stmt) => count += count_returns(&while_stmt.body.statements),
            Statement::Block(block) => count += count_returns(&block.statements),
            Statement::Labeled(labeled) => {
                count += count_returns(std::slice::from_ref(labeled.body.as_ref()))
            }
            _ => {}
        }
    }
    count
}

/// Replace every return of this body with an optional result assignment
/// (or an effect-only evaluation) followed by a break out of `label`.
fn rewrite_returns(stmts: &mut Vec<Statement>, result: Option<&str>, label: &str) {
    let mut index = 0;
    while index < stmts.len() {
        match &mut stmts[index] {
            Statement::Return(ret) => {
                let value = ret.value.take();
                let span = ret.span;
                stmts[index] = Statement::Break(BreakStatement {
                    label: Some(label.to_string()),
                    span,
                });
                let extra = match (result, value) {
                    (Some(result), Some(value)) => {
                        let value_span = value.span;
                        Some(Statement::Expression(Expression::new(
                            ExpressionKind::Assign(
                                Box::new(ident_expr(result, span)),
                                Box::new(value),
                            ),
                            value_span,
                        )))
                    }
                    // a bare return still yields a value to the caller
                    (Some(result), None) => Some(Statement::Expression(Expression::new(
                        ExpressionKind::Assign(
                            Box::new(ident_expr(result, span)),
                            Box::new(literal_nil()),
                        ),
                        span,
                    ))),
                    (None, Some(value)) if can_have_side_effect(&value) => {
                        Some(Statement::Expression(value))
                    }
                    _ => None,
                };
                if let Some(extra) = extra {
                    stmts.insert(index, extra);
                    index += 1;
                }
                index += 1;
            }
            Statement::If(if_stmt) => {
                rewrite_returns(&mut if_stmt.then_block.statements, result, label);
                if let Some(else_block) = &mut if_stmt.else_block {
                    rewrite_returns(&mut else_block.statements, result, label);
                }
                index += 1;
            }
            Statement::While(while_stmt) => {
                rewrite_returns(&mut while_stmt.body.statements, result, label);
                index += 1;
            }
            Statement::Block(block) => {
                rewrite_returns(&mut block.statements, result, label);
                index += 1;
            }
            Statement::Labeled(labeled) => {
                let body = std::mem::replace(
                    &mut *labeled.body,
                    Statement::Break(BreakStatement {
                        label: None,
                        span: labeled.span,
                    }),
                );
                let mut inner = vec![body];
                rewrite_returns(&mut inner, result, label);
                *labeled.body = if inner.len() == 1 {
                    inner.pop().unwrap()
                } else {
                    Statement::Block(Block::new(inner, labeled.span))
                };
                index += 1;
            }
            _ => index += 1,
        }
    }
}
