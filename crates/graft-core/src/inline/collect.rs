//! Tree collectors: name reservation, function labeling, reference counts.

use rustc_hash::{FxHashMap, FxHashSet};

use crate::ast::expression::{Expression, ExpressionKind};
use crate::ast::statement::{Block, FunctionDef, Statement};
use crate::ast::Program;

use super::naming::NameSupply;
use super::registry::FunctionRegistry;

// ---------------------------------------------------------------------------
// Name reservation
// ---------------------------------------------------------------------------

/// Reserve every name the program mentions, so generated names can never
/// collide with anything visible anywhere in the unit.
pub fn reserve_program_names(program: &Program, names: &mut NameSupply) {
    for stmt in &program.statements {
        reserve_stmt_names(stmt, names);
    }
}

pub fn reserve_function_names(def: &FunctionDef, names: &mut NameSupply) {
    if let Some(name) = &def.name {
        names.reserve(name.node.clone());
    }
    for param in &def.params {
        names.reserve(param.name.node.clone());
        if let Some(default) = &param.default {
            reserve_expr_names(default, names);
        }
    }
    for stmt in &def.body.statements {
        reserve_stmt_names(stmt, names);
    }
}

fn reserve_stmt_names(stmt: &Statement, names: &mut NameSupply) {
    match stmt {
        Statement::Declaration(group) => {
            for binding in &group.bindings {
                names.reserve(binding.name.node.clone());
                if let Some(init) = &binding.init {
                    reserve_expr_names(init, names);
                }
            }
        }
        Statement::Function(def) => reserve_function_names(def, names),
        Statement::Expression(e) => reserve_expr_names(e, names),
        Statement::Return(ret) => {
            if let Some(value) = &ret.value {
                reserve_expr_names(value, names);
            }
        }
        Statement::If(if_stmt) => {
            reserve_expr_names(&if_stmt.condition, names);
            reserve_block_names(&if_stmt.then_block, names);
            if let Some(else_block) = &if_stmt.else_block {
                reserve_block_names(else_block, names);
            }
        }
        Statement::While(while_stmt) => {
            reserve_expr_names(&while_stmt.condition, names);
            reserve_block_names(&while_stmt.body, names);
        }
        Statement::Block(block) => reserve_block_names(block, names),
        Statement::Break(brk) => {
            if let Some(label) = &brk.label {
                names.reserve(label.clone());
            }
        }
        Statement::Labeled(labeled) => {
            names.reserve(labeled.label.clone());
            reserve_stmt_names(&labeled.body, names);
        }
    }
}

fn reserve_block_names(block: &Block, names: &mut NameSupply) {
    for stmt in &block.statements {
        reserve_stmt_names(stmt, names);
    }
}

fn reserve_expr_names(e: &Expression, names: &mut NameSupply) {
    match &e.kind {
        ExpressionKind::Identifier(name) => names.reserve(name.clone()),
        ExpressionKind::Literal(_) => {}
        ExpressionKind::Binary(_, left, right) => {
            reserve_expr_names(left, names);
            reserve_expr_names(right, names);
        }
        ExpressionKind::Unary(_, operand) => reserve_expr_names(operand, names),
        ExpressionKind::Assign(target, value) => {
            reserve_expr_names(target, names);
            reserve_expr_names(value, names);
        }
        ExpressionKind::Conditional(cond, then, other) => {
            reserve_expr_names(cond, names);
            reserve_expr_names(then, names);
            reserve_expr_names(other, names);
        }
        ExpressionKind::Call(call) => {
            reserve_expr_names(&call.callee, names);
            for arg in &call.args {
                reserve_expr_names(arg, names);
            }
        }
        ExpressionKind::New(new) => {
            reserve_expr_names(&new.callee, names);
            for arg in &new.args {
                reserve_expr_names(arg, names);
            }
        }
        ExpressionKind::Member(object, _) => reserve_expr_names(object, names),
        ExpressionKind::Index(object, key) => {
            reserve_expr_names(object, names);
            reserve_expr_names(key, names);
        }
        ExpressionKind::Function(def) => reserve_function_names(def, names),
    }
}

// ---------------------------------------------------------------------------
// Function labeling
// ---------------------------------------------------------------------------

/// Assign a [`crate::ast::FunctionId`] to every function in the program and
/// register the canonical copy of every named one: function statements, and
/// bindings whose initializer is a function expression.
pub fn label_functions(program: &mut Program, registry: &mut FunctionRegistry) {
    for stmt in &mut program.statements {
        label_stmt(stmt, registry, true);
    }
}

/// Assign ids inside a function fetched from another unit. Its nested names
/// belong to the other unit's namespace and are not registered here.
pub fn label_function_tree(def: &mut FunctionDef, registry: &mut FunctionRegistry) {
    for param in &mut def.params {
        if let Some(default) = &mut param.default {
            label_expr(default, registry, false);
        }
    }
    for stmt in &mut def.body.statements {
        label_stmt(stmt, registry, false);
    }
}

fn label_def(def: &mut FunctionDef, registry: &mut FunctionRegistry, register: bool) {
    def.uid = Some(registry.alloc_id());
    for param in &mut def.params {
        if let Some(default) = &mut param.default {
            label_expr(default, registry, register);
        }
    }
    for stmt in &mut def.body.statements {
        label_stmt(stmt, registry, register);
    }
}

fn label_stmt(stmt: &mut Statement, registry: &mut FunctionRegistry, register: bool) {
    match stmt {
        Statement::Function(def) => {
            label_def(def, registry, register);
            if register {
                if let Some(name) = def.name.clone() {
                    registry.register_named(&name.node, def.clone());
                }
            }
        }
        Statement::Declaration(group) => {
            for binding in &mut group.bindings {
                let Some(init) = &mut binding.init else { continue };
                if let ExpressionKind::Function(def) = &mut init.kind {
                    label_def(def, registry, register);
                    if register {
                        registry.register_named(&binding.name.node, (**def).clone());
                    }
                } else {
                    label_expr(init, registry, register);
                }
            }
        }
        Statement::Expression(e) => label_expr(e, registry, register),
        Statement::Return(ret) => {
            if let Some(value) = &mut ret.value {
                label_expr(value, registry, register);
            }
        }
        Statement::If(if_stmt) => {
            label_expr(&mut if_stmt.condition, registry, register);
            for s in &mut if_stmt.then_block.statements {
                label_stmt(s, registry, register);
            }
            if let Some(else_block) = &mut if_stmt.else_block {
                for s in &mut else_block.statements {
                    label_stmt(s, registry, register);
                }
            }
        }
        Statement::While(while_stmt) => {
            label_expr(&mut while_stmt.condition, registry, register);
            for s in &mut while_stmt.body.statements {
                label_stmt(s, registry, register);
            }
        }
        Statement::Block(block) => {
            for s in &mut block.statements {
                label_stmt(s, registry, register);
            }
        }
        Statement::Break(_) => {}
        Statement::Labeled(labeled) => label_stmt(&mut labeled.body, registry, register),
    }
}

fn label_expr(e: &mut Expression, registry: &mut FunctionRegistry, register: bool) {
    match &mut e.kind {
        ExpressionKind::Identifier(_) | ExpressionKind::Literal(_) => {}
        ExpressionKind::Binary(_, left, right) => {
            label_expr(left, registry, register);
            label_expr(right, registry, register);
        }
        ExpressionKind::Unary(_, operand) => label_expr(operand, registry, register),
        ExpressionKind::Assign(target, value) => {
            label_expr(target, registry, register);
            label_expr(value, registry, register);
        }
        ExpressionKind::Conditional(cond, then, other) => {
            label_expr(cond, registry, register);
            label_expr(then, registry, register);
            label_expr(other, registry, register);
        }
        ExpressionKind::Call(call) => {
            label_expr(&mut call.callee, registry, register);
            for arg in &mut call.args {
                label_expr(arg, registry, register);
            }
        }
        ExpressionKind::New(new) => {
            label_expr(&mut new.callee, registry, register);
            for arg in &mut new.args {
                label_expr(arg, registry, register);
            }
        }
        ExpressionKind::Member(object, _) => label_expr(object, registry, register),
        ExpressionKind::Index(object, key) => {
            label_expr(object, registry, register);
            label_expr(key, registry, register);
        }
        ExpressionKind::Function(def) => label_def(def, registry, register),
    }
}

// ---------------------------------------------------------------------------
// Declared names and labels (for expansion freshening)
// ---------------------------------------------------------------------------

/// Every name declared anywhere inside `block`, in first-occurrence order:
/// bindings, function names, and the parameters of nested functions. Used to
/// freshen an expansion; order determines generated numbering, so it must be
/// the tree order, never hash order.
pub fn collect_declared_names(block: &Block) -> Vec<String> {
    let mut seen = FxHashSet::default();
    let mut out = Vec::new();
    for stmt in &block.statements {
        declared_in_stmt(stmt, &mut seen, &mut out);
    }
    out
}

fn push_name(name: &str, seen: &mut FxHashSet<String>, out: &mut Vec<String>) {
    if seen.insert(name.to_string()) {
        out.push(name.to_string());
    }
}

fn declared_in_stmt(stmt: &Statement, seen: &mut FxHashSet<String>, out: &mut Vec<String>) {
    match stmt {
        Statement::Declaration(group) => {
            for binding in &group.bindings {
                push_name(&binding.name.node, seen, out);
                if let Some(init) = &binding.init {
                    declared_in_expr(init, seen, out);
                }
            }
        }
        Statement::Function(def) => declared_in_def(def, seen, out),
        Statement::Expression(e) => declared_in_expr(e, seen, out),
        Statement::Return(ret) => {
            if let Some(value) = &ret.value {
                declared_in_expr(value, seen, out);
            }
        }
        Statement::If(if_stmt) => {
            declared_in_expr(&if_stmt.condition, seen, out);
            for s in &if_stmt.then_block.statements {
                declared_in_stmt(s, seen, out);
            }
            if let Some(else_block) = &if_stmt.else_block {
                for s in &else_block.statements {
                    declared_in_stmt(s, seen, out);
                }
            }
        }
        Statement::While(while_stmt) => {
            declared_in_expr(&while_stmt.condition, seen, out);
            for s in &while_stmt.body.statements {
                declared_in_stmt(s, seen, out);
            }
        }
        Statement::Block(block) => {
            for s in &block.statements {
                declared_in_stmt(s, seen, out);
            }
        }
        Statement::Break(_) => {}
        Statement::Labeled(labeled) => declared_in_stmt(&labeled.body, seen, out),
    }
}

fn declared_in_def(def: &FunctionDef, seen: &mut FxHashSet<String>, out: &mut Vec<String>) {
    if let Some(name) = &def.name {
        push_name(&name.node, seen, out);
    }
    for param in &def.params {
        push_name(&param.name.node, seen, out);
        if let Some(default) = &param.default {
            declared_in_expr(default, seen, out);
        }
    }
    for stmt in &def.body.statements {
        declared_in_stmt(stmt, seen, out);
    }
}

fn declared_in_expr(e: &Expression, seen: &mut FxHashSet<String>, out: &mut Vec<String>) {
    match &e.kind {
        ExpressionKind::Identifier(_) | ExpressionKind::Literal(_) => {}
        ExpressionKind::Binary(_, left, right) => {
            declared_in_expr(left, seen, out);
            declared_in_expr(right, seen, out);
        }
        ExpressionKind::Unary(_, operand) => declared_in_expr(operand, seen, out),
        ExpressionKind::Assign(target, value) => {
            declared_in_expr(target, seen, out);
            declared_in_expr(value, seen, out);
        }
        ExpressionKind::Conditional(cond, then, other) => {
            declared_in_expr(cond, seen, out);
            declared_in_expr(then, seen, out);
            declared_in_expr(other, seen, out);
        }
        ExpressionKind::Call(call) => {
            declared_in_expr(&call.callee, seen, out);
            for arg in &call.args {
                declared_in_expr(arg, seen, out);
            }
        }
        ExpressionKind::New(new) => {
            declared_in_expr(&new.callee, seen, out);
            for arg in &new.args {
                declared_in_expr(arg, seen, out);
            }
        }
        ExpressionKind::Member(object, _) => declared_in_expr(object, seen, out),
        ExpressionKind::Index(object, key) => {
            declared_in_expr(object, seen, out);
            declared_in_expr(key, seen, out);
        }
        ExpressionKind::Function(def) => declared_in_def(def, seen, out),
    }
}

/// Names assigned to (as a whole, by a simple-name assignment) anywhere in
/// `block`, nested functions included. A parameter that is assigned needs a
/// real binding at the call site, never direct substitution.
pub fn collect_assigned_names(block: &Block) -> FxHashSet<String> {
    let mut out = FxHashSet::default();
    for stmt in &block.statements {
        assigned_in_stmt(stmt, &mut out);
    }
    out
}

fn assigned_in_stmt(stmt: &Statement, out: &mut FxHashSet<String>) {
    match stmt {
        Statement::Declaration(group) => {
            for binding in &group.bindings {
                if let Some(init) = &binding.init {
                    assigned_in_expr(init, out);
                }
            }
        }
        Statement::Function(def) => {
            for param in &def.params {
                if let Some(default) = &param.default {
                    assigned_in_expr(default, out);
                }
            }
            for s in &def.body.statements {
                assigned_in_stmt(s, out);
            }
        }
        Statement::Expression(e) => assigned_in_expr(e, out),
        Statement::Return(ret) => {
            if let Some(value) = &ret.value {
                assigned_in_expr(value, out);
            }
        }
        Statement::If(if_stmt) => {
            assigned_in_expr(&if_stmt.condition, out);
            for s in &if_stmt.then_block.statements {
                assigned_in_stmt(s, out);
            }
            if let Some(else_block) = &if_stmt.else_block {
                for s in &else_block.statements {
                    assigned_in_stmt(s, out);
                }
            }
        }
        Statement::While(while_stmt) => {
            assigned_in_expr(&while_stmt.condition, out);
            for s in &while_stmt.body.statements {
                assigned_in_stmt(s, out);
            }
        }
        Statement::Block(block) => {
            for s in &block.statements {
                assigned_in_stmt(s, out);
            }
        }
        Statement::Break(_) => {}
        Statement::Labeled(labeled) => assigned_in_stmt(&labeled.body, out),
    }
}

fn assigned_in_expr(e: &Expression, out: &mut FxHashSet<String>) {
    match &e.kind {
        ExpressionKind::Assign(target, value) => {
            if let ExpressionKind::Identifier(name) = &target.kind {
                out.insert(name.clone());
            } else {
                assigned_in_expr(target, out);
            }
            assigned_in_expr(value, out);
        }
        ExpressionKind::Identifier(_) | ExpressionKind::Literal(_) => {}
        ExpressionKind::Binary(_, left, right) => {
            assigned_in_expr(left, out);
            assigned_in_expr(right, out);
        }
        ExpressionKind::Unary(_, operand) => assigned_in_expr(operand, out),
        ExpressionKind::Conditional(cond, then, other) => {
            assigned_in_expr(cond, out);
            assigned_in_expr(then, out);
            assigned_in_expr(other, out);
        }
        ExpressionKind::Call(call) => {
            assigned_in_expr(&call.callee, out);
            for arg in &call.args {
                assigned_in_expr(arg, out);
            }
        }
        ExpressionKind::New(new) => {
            assigned_in_expr(&new.callee, out);
            for arg in &new.args {
                assigned_in_expr(arg, out);
            }
        }
        ExpressionKind::Member(object, _) => assigned_in_expr(object, out),
        ExpressionKind::Index(object, key) => {
            assigned_in_expr(object, out);
            assigned_in_expr(key, out);
        }
        ExpressionKind::Function(def) => {
            for param in &def.params {
                if let Some(default) = &param.default {
                    assigned_in_expr(default, out);
                }
            }
            for s in &def.body.statements {
                assigned_in_stmt(s, out);
            }
        }
    }
}

/// Labels declared inside `block`, in first-occurrence order.
pub fn collect_labels(block: &Block) -> Vec<String> {
    let mut seen = FxHashSet::default();
    let mut out = Vec::new();
    for stmt in &block.statements {
        labels_in_stmt(stmt, &mut seen, &mut out);
    }
    out
}

fn labels_in_stmt(stmt: &Statement, seen: &mut FxHashSet<String>, out: &mut Vec<String>) {
    match stmt {
        Statement::Labeled(labeled) => {
            push_name(&labeled.label, seen, out);
            labels_in_stmt(&labeled.body, seen, out);
        }
        Statement::If(if_stmt) => {
            for s in &if_stmt.then_block.statements {
                labels_in_stmt(s, seen, out);
            }
            if let Some(else_block) = &if_stmt.else_block {
                for s in &else_block.statements {
                    labels_in_stmt(s, seen, out);
                }
            }
        }
        Statement::While(while_stmt) => {
            for s in &while_stmt.body.statements {
                labels_in_stmt(s, seen, out);
            }
        }
        Statement::Block(block) => {
            for s in &block.statements {
                labels_in_stmt(s, seen, out);
            }
        }
        // labels in nested functions cannot interact with this expansion
        _ => {}
    }
}

// ---------------------------------------------------------------------------
// Reference counting (for dead-definition cleanup)
// ---------------------------------------------------------------------------

/// Count every identifier reference in `statements`, nested functions
/// included. Declaration positions (binding names, parameter names, function
/// names) are not references.
pub fn count_name_references(statements: &[Statement], counts: &mut FxHashMap<String, usize>) {
    for stmt in statements {
        count_in_stmt(stmt, counts);
    }
}

fn count_in_stmt(stmt: &Statement, counts: &mut FxHashMap<String, usize>) {
    match stmt {
        Statement::Declaration(group) => {
            for binding in &group.bindings {
                if let Some(init) = &binding.init {
                    count_in_expr(init, counts);
                }
            }
        }
        Statement::Function(def) => count_in_def(def, counts),
        Statement::Expression(e) => count_in_expr(e, counts),
        Statement::Return(ret) => {
            if let Some(value) = &ret.value {
                count_in_expr(value, counts);
            }
        }
        Statement::If(if_stmt) => {
            count_in_expr(&if_stmt.condition, counts);
            count_name_references(&if_stmt.then_block.statements, counts);
            if let Some(else_block) = &if_stmt.else_block {
                count_name_references(&else_block.statements, counts);
            }
        }
        Statement::While(while_stmt) => {
            count_in_expr(&while_stmt.condition, counts);
            count_name_references(&while_stmt.body.statements, counts);
        }
        Statement::Block(block) => count_name_references(&block.statements, counts),
        Statement::Break(_) => {}
        Statement::Labeled(labeled) => count_in_stmt(&labeled.body, counts),
    }
}

fn count_in_def(def: &FunctionDef, counts: &mut FxHashMap<String, usize>) {
    for param in &def.params {
        if let Some(default) = &param.default {
            count_in_expr(default, counts);
        }
    }
    count_name_references(&def.body.statements, counts);
}

fn count_in_expr(e: &Expression, counts: &mut FxHashMap<String, usize>) {
    match &e.kind {
        ExpressionKind::Identifier(name) => {
            *counts.entry(name.clone()).or_insert(0) += 1;
        }
        ExpressionKind::Literal(_) => {}
        ExpressionKind::Binary(_, left, right) => {
            count_in_expr(left, counts);
            count_in_expr(right, counts);
        }
        ExpressionKind::Unary(_, operand) => count_in_expr(operand, counts),
        ExpressionKind::Assign(target, value) => {
            count_in_expr(target, counts);
            count_in_expr(value, counts);
        }
        ExpressionKind::Conditional(cond, then, other) => {
            count_in_expr(cond, counts);
            count_in_expr(then, counts);
            count_in_expr(other, counts);
        }
        ExpressionKind::Call(call) => {
            count_in_expr(&call.callee, counts);
            for arg in &call.args {
                count_in_expr(arg, counts);
            }
        }
        ExpressionKind::New(new) => {
            count_in_expr(&new.callee, counts);
            for arg in &new.args {
                count_in_expr(arg, counts);
            }
        }
        ExpressionKind::Member(object, _) => count_in_expr(object, counts),
        ExpressionKind::Index(object, key) => {
            count_in_expr(object, counts);
            count_in_expr(key, counts);
        }
        ExpressionKind::Function(def) => count_in_def(def, counts),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::build::*;

    #[test]
    fn declared_names_come_out_in_tree_order() {
        let Statement::Function(def) = func(
            "f",
            vec![],
            vec![
                let_group(vec![("b".into(), Some(int(1))), ("a".into(), None)]),
                func("g", vec!["p"], vec![ret(ident("p"))]),
            ],
        ) else {
            unreachable!()
        };
        assert_eq!(collect_declared_names(&def.body), vec!["b", "a", "g", "p"]);
    }

    #[test]
    fn counting_skips_declaration_positions() {
        let stmts = vec![
            func("f", vec!["x"], vec![ret(ident("x"))]),
            let_("y", call("f", vec![ident("z")])),
        ];
        let mut counts = FxHashMap::default();
        count_name_references(&stmts, &mut counts);
        assert_eq!(counts.get("x"), Some(&1));
        assert_eq!(counts.get("f"), Some(&1));
        assert_eq!(counts.get("z"), Some(&1));
        assert_eq!(counts.get("y"), None);
    }
}
