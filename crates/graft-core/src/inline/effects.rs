//! Conservative side-effect analysis for expressions.

use crate::ast::expression::{Expression, ExpressionKind, Literal};

/// Whether evaluating `e` could observably change program state. Anything
/// that calls, constructs, or assigns counts; reads do not.
pub fn can_have_side_effect(e: &Expression) -> bool {
    match &e.kind {
        ExpressionKind::Identifier(_) | ExpressionKind::Literal(_) => false,
        // evaluating a function expression only creates a value
        ExpressionKind::Function(_) => false,
        ExpressionKind::Binary(_, left, right) => {
            can_have_side_effect(left) || can_have_side_effect(right)
        }
        ExpressionKind::Unary(_, operand) => can_have_side_effect(operand),
        ExpressionKind::Conditional(cond, then, other) => {
            can_have_side_effect(cond) || can_have_side_effect(then) || can_have_side_effect(other)
        }
        ExpressionKind::Member(object, _) => can_have_side_effect(object),
        ExpressionKind::Index(object, key) => {
            can_have_side_effect(object) || can_have_side_effect(key)
        }
        ExpressionKind::Assign(..) | ExpressionKind::Call(_) | ExpressionKind::New(_) => true,
    }
}

pub fn is_literal(e: &Expression) -> bool {
    matches!(e.kind, ExpressionKind::Literal(_))
}

/// Whether `e` contains a call or constructor anywhere. Used to decide if an
/// expression's shape can still change under further inlining.
pub fn contains_call(e: &Expression) -> bool {
    match &e.kind {
        ExpressionKind::Call(_) | ExpressionKind::New(_) => true,
        ExpressionKind::Identifier(_) | ExpressionKind::Literal(_) => false,
        ExpressionKind::Function(_) => false,
        ExpressionKind::Binary(_, left, right) => contains_call(left) || contains_call(right),
        ExpressionKind::Unary(_, operand) => contains_call(operand),
        ExpressionKind::Assign(target, value) => contains_call(target) || contains_call(value),
        ExpressionKind::Conditional(cond, then, other) => {
            contains_call(cond) || contains_call(then) || contains_call(other)
        }
        ExpressionKind::Member(object, _) => contains_call(object),
        ExpressionKind::Index(object, key) => contains_call(object) || contains_call(key),
    }
}

pub fn literal_nil() -> Expression {
    Expression::new(
        ExpressionKind::Literal(Literal::Nil),
        crate::span::Span::dummy(),
    )
}
