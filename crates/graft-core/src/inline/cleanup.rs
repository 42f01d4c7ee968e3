//! Dead-definition cleanup.
//!
//! A function whose every call site was expanded leaves a definition with no
//! remaining references. Those are removed: per function body when the
//! walker leaves it, and once at top level after the whole tree is done.
//! Only functions the pass actually inlined somewhere are touched — an
//! uncalled function that was never an inline target is someone else's
//! business.

use rustc_hash::FxHashMap;
use tracing::debug;

use crate::ast::expression::ExpressionKind;
use crate::ast::statement::{Block, Statement};
use crate::ast::Program;

use super::{collect, FunctionRegistry, Inliner};

impl Inliner<'_> {
    /// Runs when the walker leaves a function body.
    pub(crate) fn cleanup_local_functions(&mut self, body: &mut Block) {
        let mut counts = FxHashMap::default();
        collect::count_name_references(&body.statements, &mut counts);
        let removed = remove_dead_functions(&mut body.statements, &counts, &self.registry);
        if removed > 0 {
            self.changed = true;
            debug!(removed, "removed unreferenced local function declarations");
        }
    }

    /// Runs once, after the whole tree has been walked.
    pub(crate) fn remove_unused_definitions(&mut self, program: &mut Program) {
        let mut counts = FxHashMap::default();
        collect::count_name_references(&program.statements, &mut counts);
        let removed = remove_dead_functions(&mut program.statements, &counts, &self.registry);
        if removed > 0 {
            self.changed = true;
            debug!(removed, "removed unreferenced function definitions");
        }
    }
}

/// Remove function statements and function-valued bindings whose name is
/// unreferenced and whose body was inlined at least once. Nested function
/// bodies are not entered; they were cleaned when the walker left them.
fn remove_dead_functions(
    stmts: &mut Vec<Statement>,
    counts: &FxHashMap<String, usize>,
    registry: &FunctionRegistry,
) -> usize {
    let mut removed = 0;
    let mut index = 0;
    while index < stmts.len() {
        let drop = match &mut stmts[index] {
            Statement::Function(def) => match (&def.name, def.uid) {
                (Some(name), Some(id)) => is_dead(&name.node, id, counts, registry),
                _ => false,
            },
            Statement::Declaration(group) => {
                let before = group.bindings.len();
                group.bindings.retain(|binding| {
                    let dead = match &binding.init {
                        Some(init) => match &init.kind {
                            ExpressionKind::Function(def) => def
                                .uid
                                .map(|id| is_dead(&binding.name.node, id, counts, registry))
                                .unwrap_or(false),
                            _ => false,
                        },
                        None => false,
                    };
                    !dead
                });
                removed += before - group.bindings.len();
                group.bindings.is_empty()
            }
            Statement::If(if_stmt) => {
                removed +=
                    remove_dead_functions(&mut if_stmt.then_block.statements, counts, registry);
                if let Some(else_block) = &mut if_stmt.else_block {
                    removed += remove_dead_functions(&mut else_block.statements, counts, registry);
                }
                false
            }
            Statement::While(while_stmt) => {
                removed += remove_dead_functions(&mut while_stmt.body.statements, counts, registry);
                false
            }
            Statement::Block(block) => {
                removed += remove_dead_functions(&mut block.statements, counts, registry);
                false
            }
            _ => false,
        };
        if drop {
            stmts.remove(index);
            removed += 1;
        } else {
            index += 1;
        }
    }
    removed
}

fn is_dead(
    name: &str,
    id: crate::ast::FunctionId,
    counts: &FxHashMap<String, usize>,
    registry: &FunctionRegistry,
) -> bool {
    registry.was_inlined(id) && counts.get(name).copied().unwrap_or(0) == 0
}
