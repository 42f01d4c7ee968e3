//! Deterministic text rendering of a tree.
//!
//! This is a debugging and testing aid, not the final emitter: it prints a
//! readable JS-flavored form of the backend tree so tests can assert on
//! output and `tracing` consumers can dump intermediate states. Identical
//! trees always print to identical text.

use super::expression::{BinaryOp, Expression, ExpressionKind, Literal, UnaryOp};
use super::statement::{Block, DeclarationGroup, FunctionDef, Statement};
use super::Program;

pub struct Printer {
    output: String,
    indent: usize,
}

/// Render a whole program.
pub fn print_program(program: &Program) -> String {
    let mut printer = Printer::new();
    for stmt in &program.statements {
        printer.statement(stmt);
    }
    printer.finish()
}

/// Render a single statement (used by trace output).
pub fn print_statement(stmt: &Statement) -> String {
    let mut printer = Printer::new();
    printer.statement(stmt);
    printer.finish()
}

impl Printer {
    pub fn new() -> Self {
        Printer {
            output: String::new(),
            indent: 0,
        }
    }

    pub fn finish(self) -> String {
        self.output
    }

    fn write(&mut self, s: &str) {
        self.output.push_str(s);
    }

    fn write_indent(&mut self) {
        for _ in 0..self.indent {
            self.output.push_str("    ");
        }
    }

    fn writeln(&mut self, s: &str) {
        self.output.push_str(s);
        self.output.push('\n');
    }

    fn statement(&mut self, stmt: &Statement) {
        match stmt {
            Statement::Declaration(group) => self.declaration(group),
            Statement::Function(def) => {
                self.write_indent();
                self.function(def);
                self.writeln("");
            }
            Statement::Expression(e) => {
                self.write_indent();
                self.expression(e);
                self.writeln(";");
            }
            Statement::Return(ret) => {
                self.write_indent();
                match &ret.value {
                    Some(e) => {
                        self.write("return ");
                        self.expression(e);
                        self.writeln(";");
                    }
                    None => self.writeln("return;"),
                }
            }
            Statement::If(if_stmt) => {
                self.write_indent();
                self.write("if (");
                self.expression(&if_stmt.condition);
                self.write(") ");
                self.block(&if_stmt.then_block);
                if let Some(else_block) = &if_stmt.else_block {
                    self.write(" else ");
                    self.block(else_block);
                }
                self.writeln("");
            }
            Statement::While(while_stmt) => {
                self.write_indent();
                self.write("while (");
                self.expression(&while_stmt.condition);
                self.write(") ");
                self.block(&while_stmt.body);
                self.writeln("");
            }
            Statement::Block(block) => {
                self.write_indent();
                self.block(block);
                self.writeln("");
            }
            Statement::Break(brk) => {
                self.write_indent();
                match &brk.label {
                    Some(label) => {
                        self.write("break ");
                        self.write(label);
                        self.writeln(";");
                    }
                    None => self.writeln("break;"),
                }
            }
            Statement::Labeled(labeled) => {
                self.write_indent();
                self.write(&labeled.label);
                self.writeln(":");
                self.statement(&labeled.body);
            }
        }
    }

    fn declaration(&mut self, group: &DeclarationGroup) {
        self.write_indent();
        self.write("let ");
        for (i, binding) in group.bindings.iter().enumerate() {
            if i > 0 {
                self.write(", ");
            }
            self.write(&binding.name.node);
            if let Some(init) = &binding.init {
                self.write(" = ");
                self.expression(init);
            }
        }
        self.writeln(";");
    }

    fn function(&mut self, def: &FunctionDef) {
        self.write("function");
        if let Some(name) = &def.name {
            self.write(" ");
            self.write(&name.node);
        }
        self.write("(");
        for (i, param) in def.params.iter().enumerate() {
            if i > 0 {
                self.write(", ");
            }
            self.write(&param.name.node);
            if let Some(default) = &param.default {
                self.write(" = ");
                self.expression(default);
            }
        }
        self.write(") ");
        self.block(&def.body);
    }

    fn block(&mut self, block: &Block) {
        if block.statements.is_empty() {
            self.write("{}");
            return;
        }
        self.writeln("{");
        self.indent += 1;
        for stmt in &block.statements {
            self.statement(stmt);
        }
        self.indent -= 1;
        self.write_indent();
        self.write("}");
    }

    fn expression(&mut self, e: &Expression) {
        match &e.kind {
            ExpressionKind::Identifier(name) => self.write(name),
            ExpressionKind::Literal(lit) => self.literal(lit),
            ExpressionKind::Binary(op, left, right) => {
                self.write("(");
                self.expression(left);
                self.write(" ");
                self.write(binary_op(*op));
                self.write(" ");
                self.expression(right);
                self.write(")");
            }
            ExpressionKind::Unary(op, operand) => {
                self.write(match op {
                    UnaryOp::Not => "!",
                    UnaryOp::Negate => "-",
                });
                self.expression(operand);
            }
            ExpressionKind::Assign(target, value) => {
                self.expression(target);
                self.write(" = ");
                self.expression(value);
            }
            ExpressionKind::Conditional(cond, then, other) => {
                self.write("(");
                self.expression(cond);
                self.write(" ? ");
                self.expression(then);
                self.write(" : ");
                self.expression(other);
                self.write(")");
            }
            ExpressionKind::Call(call) => {
                self.expression(&call.callee);
                self.arguments(&call.args);
            }
            ExpressionKind::New(new) => {
                self.write("new ");
                self.expression(&new.callee);
                self.arguments(&new.args);
            }
            ExpressionKind::Member(object, property) => {
                self.expression(object);
                self.write(".");
                self.write(&property.node);
            }
            ExpressionKind::Index(object, key) => {
                self.expression(object);
                self.write("[");
                self.expression(key);
                self.write("]");
            }
            ExpressionKind::Function(def) => self.function(def),
        }
    }

    fn arguments(&mut self, args: &[Expression]) {
        self.write("(");
        for (i, arg) in args.iter().enumerate() {
            if i > 0 {
                self.write(", ");
            }
            self.expression(arg);
        }
        self.write(")");
    }

    fn literal(&mut self, lit: &Literal) {
        match lit {
            Literal::Nil => self.write("nil"),
            Literal::Boolean(true) => self.write("true"),
            Literal::Boolean(false) => self.write("false"),
            Literal::Number(n) => {
                let text = n.to_string();
                self.write(&text);
            }
            Literal::Integer(i) => {
                let text = i.to_string();
                self.write(&text);
            }
            Literal::String(s) => {
                self.write("\"");
                for c in s.chars() {
                    match c {
                        '"' => self.write("\\\""),
                        '\\' => self.write("\\\\"),
                        '\n' => self.write("\\n"),
                        _ => self.output.push(c),
                    }
                }
                self.write("\"");
            }
        }
    }
}

impl Default for Printer {
    fn default() -> Self {
        Printer::new()
    }
}

fn binary_op(op: BinaryOp) -> &'static str {
    match op {
        BinaryOp::Add => "+",
        BinaryOp::Subtract => "-",
        BinaryOp::Multiply => "*",
        BinaryOp::Divide => "/",
        BinaryOp::Modulo => "%",
        BinaryOp::Equal => "==",
        BinaryOp::NotEqual => "!=",
        BinaryOp::LessThan => "<",
        BinaryOp::LessThanOrEqual => "<=",
        BinaryOp::GreaterThan => ">",
        BinaryOp::GreaterThanOrEqual => ">=",
        BinaryOp::And => "&&",
        BinaryOp::Or => "||",
    }
}

#[cfg(test)]
mod tests {
    use crate::ast::build::*;

    #[test]
    fn prints_declaration_groups() {
        let prog = program(vec![let_group(vec![
            ("a".into(), Some(int(1))),
            ("b".into(), None),
        ])]);
        assert_eq!(super::print_program(&prog), "let a = 1, b;\n");
    }

    #[test]
    fn prints_functions_and_calls() {
        let prog = program(vec![
            func("add", vec!["a", "b"], vec![ret(add(ident("a"), ident("b")))]),
            let_("x", call("add", vec![int(1), int(2)])),
        ]);
        let text = super::print_program(&prog);
        assert!(text.contains("function add(a, b) {"));
        assert!(text.contains("    return (a + b);"));
        assert!(text.contains("let x = add(1, 2);"));
    }
}
