//! Evaluation-order preservation.
//!
//! An inline expansion inserts statements before the statement containing
//! the call. If anything else is evaluated before that call within the same
//! statement, the insertion would run the body too early. So, before a
//! statement list is visited, every such call is promoted to statement
//! level: the subexpressions evaluated before it are stored to fresh
//! temporaries, then the call itself becomes the sole initializer of a
//! fresh binding. The scan runs to a fix-point — statements it inserts are
//! scanned again, since a hoisted initializer can itself contain another
//! call that needs promotion.
//!
//! Calls in conditionally evaluated positions (`&&`/`||` right operands,
//! conditional branches, loop conditions) are never promoted; the walker
//! later downgrades them unless they expand to a pure expression.

use crate::ast::expression::{CallExpression, Expression, ExpressionKind};
use crate::ast::statement::{DeclarationGroup, Statement};

use super::context::{CallTarget, FunctionContext};
use super::effects::is_literal;
use super::{ident_expr, single_binding, Inliner};

impl Inliner<'_> {
    pub(crate) fn decompose_statement_list(&mut self, stmts: &mut Vec<Statement>) {
        let mut index = 0;
        while index < stmts.len() {
            match self.decompose_step(&mut stmts[index]) {
                Some(prelude) if !prelude.is_empty() => {
                    self.changed = true;
                    stmts.splice(index..index, prelude);
                    // stay: the inserted statements and the shrunk original
                    // are rescanned
                }
                _ => index += 1,
            }
        }
    }

    /// Promote at most one call in `stmt` to statement level. Returns the
    /// statements to insert before it, or `None` when nothing needed
    /// promotion.
    fn decompose_step(&mut self, stmt: &mut Statement) -> Option<Vec<Statement>> {
        let mut prelude = Vec::new();
        let hit = match stmt {
            Statement::Expression(e) => self.extract_at_statement_root(e, &mut prelude),
            Statement::Return(ret) => match &mut ret.value {
                Some(value) => {
                    if matches!(value.kind, ExpressionKind::Call(_)) {
                        self.extract_inside_call(value, &mut prelude)
                    } else {
                        self.extract_one(value, &mut prelude)
                    }
                }
                None => false,
            },
            Statement::If(if_stmt) => self.extract_one(&mut if_stmt.condition, &mut prelude),
            Statement::Declaration(group) => {
                return self.decompose_declaration_group(group, &mut prelude);
            }
            _ => false,
        };
        hit.then_some(prelude)
    }

    /// Bindings are evaluated left to right, so a promotion inside binding
    /// `k` also splits the group: earlier bindings become their own
    /// statement ahead of the hoisted temporaries.
    fn decompose_declaration_group(
        &mut self,
        group: &mut DeclarationGroup,
        prelude: &mut Vec<Statement>,
    ) -> Option<Vec<Statement>> {
        for index in 0..group.bindings.len() {
            let Some(init) = &mut group.bindings[index].init else {
                continue;
            };
            let hit = if matches!(init.kind, ExpressionKind::Call(_)) {
                self.extract_inside_call(init, prelude)
            } else {
                self.extract_one(init, prelude)
            };
            if hit {
                if index > 0 {
                    let moved: Vec<_> = group.bindings.drain(0..index).collect();
                    prelude.insert(
                        0,
                        Statement::Declaration(DeclarationGroup {
                            bindings: moved,
                            span: group.span,
                        }),
                    );
                }
                return Some(std::mem::take(prelude));
            }
        }
        None
    }

    /// A statement-level expression: a call (or simple-name assignment of a
    /// call) at the root is already a substitution site and stays put; only
    /// calls nested deeper are promoted.
    fn extract_at_statement_root(
        &mut self,
        e: &mut Expression,
        prelude: &mut Vec<Statement>,
    ) -> bool {
        if matches!(e.kind, ExpressionKind::Call(_)) {
            return self.extract_inside_call(e, prelude);
        }
        if let ExpressionKind::Assign(target, value) = &mut e.kind {
            if matches!(target.kind, ExpressionKind::Identifier(_)) {
                if matches!(value.kind, ExpressionKind::Call(_)) {
                    return self.extract_inside_call(value, prelude);
                }
                return self.extract_one(value, prelude);
            }
        }
        self.extract_one(e, prelude)
    }

    /// Scan inside a root-position call without promoting the call itself.
    fn extract_inside_call(&mut self, e: &mut Expression, prelude: &mut Vec<Statement>) -> bool {
        let ExpressionKind::Call(call) = &mut e.kind else {
            unreachable!("extract_inside_call on a non-call expression")
        };
        let mut operands = callee_operands(&mut call.callee);
        operands.extend(call.args.iter_mut());
        self.extract_from_operands(operands, prelude)
    }

    /// Promote the leftmost extractable call within `e`, hoisting whatever
    /// is evaluated before it. Returns whether a promotion happened.
    fn extract_one(&mut self, e: &mut Expression, prelude: &mut Vec<Statement>) -> bool {
        if self.expr_requires_extraction(e) {
            let span = e.span;
            let fresh = self.fresh_name("tmp");
            let call = std::mem::replace(e, ident_expr(fresh.clone(), span));
            prelude.push(single_binding(fresh, Some(call), span));
            return true;
        }
        match &mut e.kind {
            ExpressionKind::Identifier(_)
            | ExpressionKind::Literal(_)
            | ExpressionKind::Function(_) => false,
            ExpressionKind::Binary(op, left, _) if op.is_short_circuit() => {
                self.extract_one(left, prelude)
            }
            ExpressionKind::Binary(_, left, right) => {
                self.extract_from_operands(vec![left.as_mut(), right.as_mut()], prelude)
            }
            ExpressionKind::Unary(_, operand) => self.extract_one(operand, prelude),
            ExpressionKind::Assign(target, value) => {
                let mut operands = assign_target_operands(target);
                operands.push(value.as_mut());
                self.extract_from_operands(operands, prelude)
            }
            ExpressionKind::Conditional(cond, _, _) => self.extract_one(cond, prelude),
            ExpressionKind::Call(call) => {
                let mut operands = callee_operands(&mut call.callee);
                operands.extend(call.args.iter_mut());
                self.extract_from_operands(operands, prelude)
            }
            ExpressionKind::New(new) => {
                let mut operands = callee_operands(&mut new.callee);
                operands.extend(new.args.iter_mut());
                self.extract_from_operands(operands, prelude)
            }
            ExpressionKind::Member(object, _) => self.extract_one(object, prelude),
            ExpressionKind::Index(object, key) => {
                self.extract_from_operands(vec![object.as_mut(), key.as_mut()], prelude)
            }
        }
    }

    /// `operands` in evaluation order. If one of them contains a call to
    /// promote, everything evaluated before it is hoisted to a temporary
    /// first (literals excepted — they cannot observe effects).
    fn extract_from_operands(
        &mut self,
        operands: Vec<&mut Expression>,
        prelude: &mut Vec<Statement>,
    ) -> bool {
        let mut found = None;
        for (index, operand) in operands.iter().enumerate() {
            if self.contains_extractable(operand) {
                found = Some(index);
                break;
            }
        }
        let Some(found) = found else { return false };

        let mut operands = operands;
        let target = operands.swap_remove(found);
        for operand in operands.into_iter().take(found) {
            self.hoist_operand(operand, prelude);
        }
        let hit = self.extract_one(target, prelude);
        debug_assert!(hit, "extraction scan and rewrite disagreed");
        hit
    }

    fn hoist_operand(&mut self, e: &mut Expression, prelude: &mut Vec<Statement>) {
        if is_literal(e) {
            return;
        }
        // a temporary this pass minted is assigned exactly once, at its own
        // statement; re-hoisting it would only add noise
        if let ExpressionKind::Identifier(name) = &e.kind {
            if self.names.is_generated(name) {
                return;
            }
        }
        let span = e.span;
        let fresh = self.fresh_name("tmp");
        let value = std::mem::replace(e, ident_expr(fresh.clone(), span));
        prelude.push(single_binding(fresh, Some(value), span));
    }

    /// Mirror of [`extract_one`]'s reachability, without rewriting.
    fn contains_extractable(&mut self, e: &Expression) -> bool {
        if self.expr_requires_extraction(e) {
            return true;
        }
        match &e.kind {
            ExpressionKind::Identifier(_)
            | ExpressionKind::Literal(_)
            | ExpressionKind::Function(_) => false,
            ExpressionKind::Binary(op, left, _) if op.is_short_circuit() => {
                self.contains_extractable(left)
            }
            ExpressionKind::Binary(_, left, right) => {
                self.contains_extractable(left) || self.contains_extractable(right)
            }
            ExpressionKind::Unary(_, operand) => self.contains_extractable(operand),
            ExpressionKind::Assign(target, value) => {
                let target_hit = match &target.kind {
                    ExpressionKind::Identifier(_) => false,
                    ExpressionKind::Member(object, _) => self.contains_extractable(object),
                    ExpressionKind::Index(object, key) => {
                        self.contains_extractable(object) || self.contains_extractable(key)
                    }
                    _ => self.contains_extractable(target),
                };
                target_hit || self.contains_extractable(value)
            }
            ExpressionKind::Conditional(cond, _, _) => self.contains_extractable(cond),
            ExpressionKind::Call(call) => {
                self.callee_contains_extractable(&call.callee)
                    || call.args.iter().any(|arg| self.contains_extractable(arg))
            }
            ExpressionKind::New(new) => {
                self.callee_contains_extractable(&new.callee)
                    || new.args.iter().any(|arg| self.contains_extractable(arg))
            }
            ExpressionKind::Member(object, _) => self.contains_extractable(object),
            ExpressionKind::Index(object, key) => {
                self.contains_extractable(object) || self.contains_extractable(key)
            }
        }
    }

    fn callee_contains_extractable(&mut self, callee: &Expression) -> bool {
        match &callee.kind {
            ExpressionKind::Identifier(_) | ExpressionKind::Function(_) => false,
            ExpressionKind::Member(object, _) => self.contains_extractable(object),
            _ => self.contains_extractable(callee),
        }
    }

    fn expr_requires_extraction(&mut self, e: &Expression) -> bool {
        let ExpressionKind::Call(call) = &e.kind else {
            return false;
        };
        self.call_requires_extraction(call)
    }

    /// A call needs statement-level promotion when it will be expanded and
    /// the expansion carries a statement prelude. In-process targets are
    /// about to be downgraded as cycles and stay where they are.
    fn call_requires_extraction(&mut self, call: &CallExpression) -> bool {
        if !FunctionContext::is_inline_eligible(
            call,
            &mut self.registry,
            &mut *self.source,
            &mut self.names,
        ) {
            return false;
        }
        let Some(target) = self.resolve_call(call) else {
            return false;
        };
        if let CallTarget::Registered(id) = target {
            if self.registry.is_in_process(id) {
                return false;
            }
        }
        !self.pure_target(call, target)
    }
}

/// The operand positions of a callee that are evaluated before the
/// arguments. A plain name dereferences without observable effects; a
/// member callee evaluates its receiver (the property slot itself is read
/// at call time); a function literal just produces a value. Anything else
/// is an ordinary operand.
fn callee_operands(callee: &mut Expression) -> Vec<&mut Expression> {
    if matches!(
        callee.kind,
        ExpressionKind::Identifier(_) | ExpressionKind::Function(_)
    ) {
        return vec![];
    }
    if matches!(callee.kind, ExpressionKind::Member(..)) {
        let ExpressionKind::Member(object, _) = &mut callee.kind else {
            unreachable!()
        };
        return vec![object.as_mut()];
    }
    vec![callee]
}

fn assign_target_operands(target: &mut Expression) -> Vec<&mut Expression> {
    if matches!(target.kind, ExpressionKind::Identifier(_)) {
        return vec![];
    }
    if matches!(target.kind, ExpressionKind::Member(..)) {
        let ExpressionKind::Member(object, _) = &mut target.kind else {
            unreachable!()
        };
        return vec![object.as_mut()];
    }
    if matches!(target.kind, ExpressionKind::Index(..)) {
        let ExpressionKind::Index(object, key) = &mut target.kind else {
            unreachable!()
        };
        return vec![object.as_mut(), key.as_mut()];
    }
    vec![target]
}
