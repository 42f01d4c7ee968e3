//! Span-less constructors for assembling trees by hand.
//!
//! Frontends usually carry real spans; these helpers default every span to
//! [`Span::dummy`] and exist for tests and for programmatically generated
//! code.

use super::expression::{
    BinaryOp, CallExpression, CalleeDescriptor, Expression, ExpressionKind, InlineInfo,
    InlineStrategy, Literal, NewExpression, UnaryOp,
};
use super::statement::{
    Binding, Block, BreakStatement, DeclarationGroup, FunctionDef, IfStatement, LabeledStatement,
    Param, ReturnStatement, Statement, WhileStatement,
};
use super::{Ident, Program, Spanned};
use crate::span::Span;

pub fn name(s: impl Into<String>) -> Ident {
    Spanned::new(s.into(), Span::dummy())
}

fn expr(kind: ExpressionKind) -> Expression {
    Expression::new(kind, Span::dummy())
}

pub fn ident(s: impl Into<String>) -> Expression {
    expr(ExpressionKind::Identifier(s.into()))
}

pub fn nil() -> Expression {
    expr(ExpressionKind::Literal(Literal::Nil))
}

pub fn boolean(value: bool) -> Expression {
    expr(ExpressionKind::Literal(Literal::Boolean(value)))
}

pub fn int(value: i64) -> Expression {
    expr(ExpressionKind::Literal(Literal::Integer(value)))
}

pub fn number(value: f64) -> Expression {
    expr(ExpressionKind::Literal(Literal::Number(value)))
}

pub fn string(value: impl Into<String>) -> Expression {
    expr(ExpressionKind::Literal(Literal::String(value.into())))
}

pub fn binary(op: BinaryOp, left: Expression, right: Expression) -> Expression {
    expr(ExpressionKind::Binary(op, Box::new(left), Box::new(right)))
}

pub fn add(left: Expression, right: Expression) -> Expression {
    binary(BinaryOp::Add, left, right)
}

pub fn mul(left: Expression, right: Expression) -> Expression {
    binary(BinaryOp::Multiply, left, right)
}

pub fn unary(op: UnaryOp, operand: Expression) -> Expression {
    expr(ExpressionKind::Unary(op, Box::new(operand)))
}

pub fn assign(target: Expression, value: Expression) -> Expression {
    expr(ExpressionKind::Assign(Box::new(target), Box::new(value)))
}

pub fn conditional(cond: Expression, then: Expression, other: Expression) -> Expression {
    expr(ExpressionKind::Conditional(
        Box::new(cond),
        Box::new(then),
        Box::new(other),
    ))
}

pub fn member(object: Expression, property: impl Into<String>) -> Expression {
    expr(ExpressionKind::Member(Box::new(object), name(property)))
}

pub fn index(object: Expression, key: Expression) -> Expression {
    expr(ExpressionKind::Index(Box::new(object), Box::new(key)))
}

/// A plain call with no inline metadata.
pub fn call(callee: impl Into<String>, args: Vec<Expression>) -> Expression {
    expr(ExpressionKind::Call(CallExpression {
        callee: Box::new(ident(callee)),
        args,
        inline: InlineInfo::default(),
    }))
}

/// A call flagged "must be inlined" with a local callee descriptor.
pub fn inline_call(callee: impl Into<String>, args: Vec<Expression>) -> Expression {
    let callee = callee.into();
    expr(ExpressionKind::Call(CallExpression {
        callee: Box::new(ident(callee.clone())),
        args,
        inline: InlineInfo {
            strategy: InlineStrategy::Inline,
            target: Some(CalleeDescriptor::local(callee)),
        },
    }))
}

/// A call flagged "must be inlined" whose body lives in another unit.
pub fn cross_unit_call(
    unit: impl Into<String>,
    callee: impl Into<String>,
    args: Vec<Expression>,
) -> Expression {
    let callee = callee.into();
    expr(ExpressionKind::Call(CallExpression {
        callee: Box::new(ident(callee.clone())),
        args,
        inline: InlineInfo {
            strategy: InlineStrategy::Inline,
            target: Some(CalleeDescriptor::external(unit, callee)),
        },
    }))
}

/// A call through an immediately applied function expression.
pub fn direct_call(func: Expression, args: Vec<Expression>) -> Expression {
    expr(ExpressionKind::Call(CallExpression {
        callee: Box::new(func),
        args,
        inline: InlineInfo {
            strategy: InlineStrategy::Inline,
            target: None,
        },
    }))
}

/// A plain method call: `object.method(args)`.
pub fn call_on(object: Expression, method: impl Into<String>, args: Vec<Expression>) -> Expression {
    expr(ExpressionKind::Call(CallExpression {
        callee: Box::new(member(object, method)),
        args,
        inline: InlineInfo::default(),
    }))
}

pub fn new_(callee: impl Into<String>, args: Vec<Expression>) -> Expression {
    expr(ExpressionKind::New(NewExpression {
        callee: Box::new(ident(callee)),
        args,
    }))
}

pub fn func_expr(params: Vec<&str>, body: Vec<Statement>) -> Expression {
    expr(ExpressionKind::Function(Box::new(FunctionDef {
        name: None,
        params: params.into_iter().map(param).collect(),
        body: Block::new(body, Span::dummy()),
        uid: None,
        span: Span::dummy(),
    })))
}

pub fn param(p: &str) -> Param {
    Param {
        name: name(p),
        default: None,
        span: Span::dummy(),
    }
}

pub fn param_with_default(p: &str, default: Expression) -> Param {
    Param {
        name: name(p),
        default: Some(default),
        span: Span::dummy(),
    }
}

pub fn func(f: impl Into<String>, params: Vec<&str>, body: Vec<Statement>) -> Statement {
    func_with_params(f, params.into_iter().map(param).collect(), body)
}

pub fn func_with_params(f: impl Into<String>, params: Vec<Param>, body: Vec<Statement>) -> Statement {
    Statement::Function(FunctionDef {
        name: Some(name(f)),
        params,
        body: Block::new(body, Span::dummy()),
        uid: None,
        span: Span::dummy(),
    })
}

pub fn let_(binding: impl Into<String>, init: Expression) -> Statement {
    let_group(vec![(binding.into(), Some(init))])
}

pub fn let_uninit(binding: impl Into<String>) -> Statement {
    let_group(vec![(binding.into(), None)])
}

pub fn let_group(bindings: Vec<(String, Option<Expression>)>) -> Statement {
    Statement::Declaration(DeclarationGroup {
        bindings: bindings
            .into_iter()
            .map(|(n, init)| Binding {
                name: name(n),
                init,
                span: Span::dummy(),
            })
            .collect(),
        span: Span::dummy(),
    })
}

pub fn expr_stmt(e: Expression) -> Statement {
    Statement::Expression(e)
}

pub fn ret(value: Expression) -> Statement {
    Statement::Return(ReturnStatement {
        value: Some(value),
        span: Span::dummy(),
    })
}

pub fn ret_void() -> Statement {
    Statement::Return(ReturnStatement {
        value: None,
        span: Span::dummy(),
    })
}

pub fn if_(condition: Expression, then: Vec<Statement>) -> Statement {
    Statement::If(IfStatement {
        condition,
        then_block: Block::new(then, Span::dummy()),
        else_block: None,
        span: Span::dummy(),
    })
}

pub fn if_else(condition: Expression, then: Vec<Statement>, other: Vec<Statement>) -> Statement {
    Statement::If(IfStatement {
        condition,
        then_block: Block::new(then, Span::dummy()),
        else_block: Some(Block::new(other, Span::dummy())),
        span: Span::dummy(),
    })
}

pub fn while_(condition: Expression, body: Vec<Statement>) -> Statement {
    Statement::While(WhileStatement {
        condition,
        body: Block::new(body, Span::dummy()),
        span: Span::dummy(),
    })
}

pub fn block(statements: Vec<Statement>) -> Statement {
    Statement::Block(Block::new(statements, Span::dummy()))
}

pub fn break_(label: Option<&str>) -> Statement {
    Statement::Break(BreakStatement {
        label: label.map(str::to_owned),
        span: Span::dummy(),
    })
}

pub fn labeled(label: impl Into<String>, body: Statement) -> Statement {
    Statement::Labeled(LabeledStatement {
        label: label.into(),
        body: Box::new(body),
        span: Span::dummy(),
    })
}

pub fn program(statements: Vec<Statement>) -> Program {
    Program::new(statements, Span::dummy())
}
