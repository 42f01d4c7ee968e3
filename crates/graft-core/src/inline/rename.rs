//! Rewriters applied to a cloned body before it is spliced into a call site.
//!
//! `rename_names` renames uniformly: every declaration of a mapped name and
//! every reference to it, at any depth, becomes the same fresh name. Uniform
//! renaming preserves the shadowing structure, so references keep resolving
//! to the same bindings as before.
//!
//! `substitute_identifiers` replaces parameter references with argument
//! expressions. It runs after `rename_names`, which has already renamed away
//! any inner declaration that shadowed a parameter, so every remaining
//! occurrence really is the parameter.

use rustc_hash::FxHashMap;

use crate::ast::expression::{Expression, ExpressionKind};
use crate::ast::statement::{FunctionDef, Statement};

pub fn rename_names(statements: &mut [Statement], map: &FxHashMap<String, String>) {
    for stmt in statements {
        rename_stmt(stmt, map);
    }
}

fn rename_stmt(stmt: &mut Statement, map: &FxHashMap<String, String>) {
    match stmt {
        Statement::Declaration(group) => {
            for binding in &mut group.bindings {
                if let Some(new) = map.get(&binding.name.node) {
                    binding.name.node = new.clone();
                }
                if let Some(init) = &mut binding.init {
                    rename_expr(init, map);
                }
            }
        }
        Statement::Function(def) => rename_def(def, map),
        Statement::Expression(e) => rename_expr(e, map),
        Statement::Return(ret) => {
            if let Some(value) = &mut ret.value {
                rename_expr(value, map);
            }
        }
        Statement::If(if_stmt) => {
            rename_expr(&mut if_stmt.condition, map);
            rename_names(&mut if_stmt.then_block.statements, map);
            if let Some(else_block) = &mut if_stmt.else_block {
                rename_names(&mut else_block.statements, map);
            }
        }
        Statement::While(while_stmt) => {
            rename_expr(&mut while_stmt.condition, map);
            rename_names(&mut while_stmt.body.statements, map);
        }
        Statement::Block(block) => rename_names(&mut block.statements, map),
        Statement::Break(_) => {}
        Statement::Labeled(labeled) => rename_stmt(&mut labeled.body, map),
    }
}

fn rename_def(def: &mut FunctionDef, map: &FxHashMap<String, String>) {
    if let Some(name) = &mut def.name {
        if let Some(new) = map.get(&name.node) {
            name.node = new.clone();
        }
    }
    for param in &mut def.params {
        if let Some(new) = map.get(&param.name.node) {
            param.name.node = new.clone();
        }
        if let Some(default) = &mut param.default {
            rename_expr(default, map);
        }
    }
    rename_names(&mut def.body.statements, map);
}

fn rename_expr(e: &mut Expression, map: &FxHashMap<String, String>) {
    match &mut e.kind {
        ExpressionKind::Identifier(name) => {
            if let Some(new) = map.get(name) {
                *name = new.clone();
            }
        }
        ExpressionKind::Literal(_) => {}
        ExpressionKind::Binary(_, left, right) => {
            rename_expr(left, map);
            rename_expr(right, map);
        }
        ExpressionKind::Unary(_, operand) => rename_expr(operand, map),
        ExpressionKind::Assign(target, value) => {
            rename_expr(target, map);
            rename_expr(value, map);
        }
        ExpressionKind::Conditional(cond, then, other) => {
            rename_expr(cond, map);
            rename_expr(then, map);
            rename_expr(other, map);
        }
        ExpressionKind::Call(call) => {
            rename_expr(&mut call.callee, map);
            for arg in &mut call.args {
                rename_expr(arg, map);
            }
        }
        ExpressionKind::New(new) => {
            rename_expr(&mut new.callee, map);
            for arg in &mut new.args {
                rename_expr(arg, map);
            }
        }
        ExpressionKind::Member(object, _) => rename_expr(object, map),
        ExpressionKind::Index(object, key) => {
            rename_expr(object, map);
            rename_expr(key, map);
        }
        ExpressionKind::Function(def) => rename_def(def, map),
    }
}

/// Rename labels declared by the body and the breaks that target them.
/// Labels in nested functions are a different scope and stay untouched.
pub fn rename_labels(statements: &mut [Statement], map: &FxHashMap<String, String>) {
    for stmt in statements {
        rename_labels_stmt(stmt, map);
    }
}

fn rename_labels_stmt(stmt: &mut Statement, map: &FxHashMap<String, String>) {
    match stmt {
        Statement::Labeled(labeled) => {
            if let Some(new) = map.get(&labeled.label) {
                labeled.label = new.clone();
            }
            rename_labels_stmt(&mut labeled.body, map);
        }
        Statement::Break(brk) => {
            if let Some(label) = &mut brk.label {
                if let Some(new) = map.get(label) {
                    *label = new.clone();
                }
            }
        }
        Statement::If(if_stmt) => {
            rename_labels(&mut if_stmt.then_block.statements, map);
            if let Some(else_block) = &mut if_stmt.else_block {
                rename_labels(&mut else_block.statements, map);
            }
        }
        Statement::While(while_stmt) => rename_labels(&mut while_stmt.body.statements, map),
        Statement::Block(block) => rename_labels(&mut block.statements, map),
        _ => {}
    }
}

pub fn substitute_identifiers(statements: &mut [Statement], map: &FxHashMap<String, Expression>) {
    for stmt in statements {
        substitute_stmt(stmt, map);
    }
}

pub fn substitute_in_expr(e: &mut Expression, map: &FxHashMap<String, Expression>) {
    if let ExpressionKind::Identifier(name) = &e.kind {
        if let Some(replacement) = map.get(name) {
            *e = replacement.clone();
        }
        return;
    }
    match &mut e.kind {
        ExpressionKind::Identifier(_) | ExpressionKind::Literal(_) => {}
        ExpressionKind::Binary(_, left, right) => {
            substitute_in_expr(left, map);
            substitute_in_expr(right, map);
        }
        ExpressionKind::Unary(_, operand) => substitute_in_expr(operand, map),
        ExpressionKind::Assign(target, value) => {
            substitute_in_expr(target, map);
            substitute_in_expr(value, map);
        }
        ExpressionKind::Conditional(cond, then, other) => {
            substitute_in_expr(cond, map);
            substitute_in_expr(then, map);
            substitute_in_expr(other, map);
        }
        ExpressionKind::Call(call) => {
            substitute_in_expr(&mut call.callee, map);
            for arg in &mut call.args {
                substitute_in_expr(arg, map);
            }
        }
        ExpressionKind::New(new) => {
            substitute_in_expr(&mut new.callee, map);
            for arg in &mut new.args {
                substitute_in_expr(arg, map);
            }
        }
        ExpressionKind::Member(object, _) => substitute_in_expr(object, map),
        ExpressionKind::Index(object, key) => {
            substitute_in_expr(object, map);
            substitute_in_expr(key, map);
        }
        ExpressionKind::Function(def) => {
            for param in &mut def.params {
                if let Some(default) = &mut param.default {
                    substitute_in_expr(default, map);
                }
            }
            substitute_identifiers(&mut def.body.statements, map);
        }
    }
}

fn substitute_stmt(stmt: &mut Statement, map: &FxHashMap<String, Expression>) {
    match stmt {
        Statement::Declaration(group) => {
            for binding in &mut group.bindings {
                if let Some(init) = &mut binding.init {
                    substitute_in_expr(init, map);
                }
            }
        }
        Statement::Function(def) => {
            for param in &mut def.params {
                if let Some(default) = &mut param.default {
                    substitute_in_expr(default, map);
                }
            }
            substitute_identifiers(&mut def.body.statements, map);
        }
        Statement::Expression(e) => substitute_in_expr(e, map),
        Statement::Return(ret) => {
            if let Some(value) = &mut ret.value {
                substitute_in_expr(value, map);
            }
        }
        Statement::If(if_stmt) => {
            substitute_in_expr(&mut if_stmt.condition, map);
            substitute_identifiers(&mut if_stmt.then_block.statements, map);
            if let Some(else_block) = &mut if_stmt.else_block {
                substitute_identifiers(&mut else_block.statements, map);
            }
        }
        Statement::While(while_stmt) => {
            substitute_in_expr(&mut while_stmt.condition, map);
            substitute_identifiers(&mut while_stmt.body.statements, map);
        }
        Statement::Block(block) => substitute_identifiers(&mut block.statements, map),
        Statement::Break(_) => {}
        Statement::Labeled(labeled) => substitute_stmt(&mut labeled.body, map),
    }
}
