//! Per-activation state of the walker.

use rustc_hash::FxHashSet;

use crate::ast::expression::{CallExpression, CalleeDescriptor, Expression, ExpressionKind};
use crate::ast::statement::Statement;
use crate::ast::FunctionId;
use crate::span::Span;

use super::naming::{NameSupply, NamingContext};
use super::registry::{FunctionRegistry, FunctionSource};

/// How a call resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallTarget {
    /// A named function held by the registry (local or fetched).
    Registered(FunctionId),
    /// An immediately applied function expression; the definition is the
    /// call's own callee.
    Direct(FunctionId),
}

impl CallTarget {
    pub fn id(self) -> FunctionId {
        match self {
            CallTarget::Registered(id) | CallTarget::Direct(id) => id,
        }
    }
}

/// Resolution facade for one activation. Also records which arguments of the
/// call currently being expanded are constructor expressions; those must be
/// bound to a temporary, never copied into the body.
#[derive(Debug, Default)]
pub struct FunctionContext {
    constructor_args: FxHashSet<usize>,
}

impl FunctionContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// True only if the call carries the inline flag and a definition is
    /// resolvable. A provider miss makes the call ineligible, never an
    /// error.
    pub fn is_inline_eligible(
        call: &CallExpression,
        registry: &mut FunctionRegistry,
        source: &mut dyn FunctionSource,
        names: &mut NameSupply,
    ) -> bool {
        call.inline.strategy.is_inline()
            && Self::resolve(call, registry, source, names).is_some()
    }

    /// Resolve a call to its definition: a direct function-expression
    /// callee, a name known to this unit, or a cross-unit fetch (memoized).
    pub fn resolve(
        call: &CallExpression,
        registry: &mut FunctionRegistry,
        source: &mut dyn FunctionSource,
        names: &mut NameSupply,
    ) -> Option<CallTarget> {
        match &call.callee.kind {
            ExpressionKind::Function(def) => {
                let id = def.uid.expect("function expression was never labeled");
                return Some(CallTarget::Direct(id));
            }
            ExpressionKind::Identifier(name) => {
                if let Some(id) = registry.lookup_local(name) {
                    return Some(CallTarget::Registered(id));
                }
            }
            _ => {}
        }
        let target = call.inline.target.as_ref()?;
        if target.unit.is_some() {
            return registry
                .resolve_external(target, source, names)
                .map(CallTarget::Registered);
        }
        None
    }

    pub fn declare_constructor_args(&mut self, args: &[Expression]) {
        self.constructor_args.clear();
        for (index, arg) in args.iter().enumerate() {
            if matches!(arg.kind, ExpressionKind::New(_)) {
                self.constructor_args.insert(index);
            }
        }
    }

    pub fn is_constructor_arg(&self, index: usize) -> bool {
        self.constructor_args.contains(&index)
    }
}

/// One open function activation. Created when the walker enters a function
/// body (the program root counts as one), dropped when it leaves, however
/// the subtree was processed.
#[derive(Debug)]
pub struct InliningContext {
    /// `None` for the program root.
    pub function: Option<FunctionId>,
    pub functions: FunctionContext,
    pub naming: NamingContext,
}

impl InliningContext {
    pub fn root() -> Self {
        InliningContext {
            function: None,
            functions: FunctionContext::new(),
            naming: NamingContext::new(),
        }
    }

    pub fn for_function(id: FunctionId) -> Self {
        InliningContext {
            function: Some(id),
            functions: FunctionContext::new(),
            naming: NamingContext::new(),
        }
    }
}

/// Recorded while an eligible call inside a named function is open; used
/// only to reconstruct the diagnostic path when a cycle is found.
#[derive(Debug, Clone)]
pub struct CallInfo {
    pub span: Span,
    pub target: Option<CalleeDescriptor>,
    pub containing: FunctionId,
}

/// Where a call sits relative to its enclosing statement. Statement-level
/// sites can receive an expansion's statement prelude; a plain
/// subexpression cannot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallSite {
    /// `f();`
    ExpressionStatement,
    /// `x = f();` with a simple name on the left.
    AssignRhs,
    /// `let …, x = f(), …;`
    BindingInit,
    /// `return f();`
    ReturnValue,
    /// Anywhere else.
    Subexpression,
}

impl CallSite {
    pub fn is_statement_level(self) -> bool {
        !matches!(self, CallSite::Subexpression)
    }

    pub fn result_needed(self) -> bool {
        !matches!(self, CallSite::ExpressionStatement)
    }
}

/// The statement insertion cursor: statements to splice in before the
/// statement currently being visited, and whether that statement should be
/// dropped afterwards.
#[derive(Debug, Default)]
pub struct StatementCursor {
    pub before: Vec<Statement>,
    pub remove: bool,
}

impl StatementCursor {
    pub fn new() -> Self {
        Self::default()
    }
}

/// Split state of the declaration group currently being visited. `cut` only
/// ever advances, and bindings below it are removed exactly once, when the
/// group is left.
#[derive(Debug, Clone, Copy)]
pub struct GroupFrame {
    pub cut: usize,
}
