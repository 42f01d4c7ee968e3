//! Resolution of calls to function definitions.
//!
//! The registry owns the canonical copy of every named function in the unit
//! plus every body fetched from other units. Call sites are expanded from
//! these canonical copies, which are processed (their own inline calls
//! resolved) before the first expansion. Identity is a generated
//! [`FunctionId`], never node addresses.

use indexmap::IndexMap;
use rustc_hash::{FxHashMap, FxHashSet};

use crate::ast::expression::CalleeDescriptor;
use crate::ast::statement::FunctionDef;
use crate::ast::FunctionId;

use super::collect;
use super::naming::NameSupply;

/// Lazily supplies function bodies that originate in other compilation
/// units. A failed lookup means "not resolvable", never an error; the pass
/// falls back to leaving the call un-inlined.
pub trait FunctionSource {
    fn lookup(&mut self, target: &CalleeDescriptor) -> Option<FunctionDef>;
}

/// A source with no cross-unit functions at all.
pub struct NoExternalFunctions;

impl FunctionSource for NoExternalFunctions {
    fn lookup(&mut self, _target: &CalleeDescriptor) -> Option<FunctionDef> {
        None
    }
}

#[derive(Default)]
pub struct FunctionRegistry {
    next_id: u32,
    /// Lookup name -> id, for callees defined in this unit.
    by_name: FxHashMap<String, FunctionId>,
    /// Memoized cross-unit fetches, including misses.
    external: FxHashMap<CalleeDescriptor, Option<FunctionId>>,
    /// Canonical definition copies. A slot is `None` while its function is
    /// checked out for processing.
    defs: IndexMap<FunctionId, Option<FunctionDef>>,
    named: FxHashSet<FunctionId>,
    in_process: FxHashSet<FunctionId>,
    processed: FxHashSet<FunctionId>,
    inlined: FxHashSet<FunctionId>,
}

impl FunctionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn alloc_id(&mut self) -> FunctionId {
        let id = FunctionId(self.next_id);
        self.next_id += 1;
        id
    }

    /// Register the canonical copy of a function defined in this unit under
    /// its lookup name. A later definition with the same name shadows an
    /// earlier one, like redefinition at runtime would.
    pub fn register_named(&mut self, name: &str, def: FunctionDef) {
        let id = def.uid.expect("registering a function that was never labeled");
        self.by_name.insert(name.to_string(), id);
        self.named.insert(id);
        self.defs.insert(id, Some(def));
    }

    pub fn lookup_local(&self, name: &str) -> Option<FunctionId> {
        self.by_name.get(name).copied()
    }

    /// Resolve a cross-unit callee, fetching its body through `source` on
    /// first use. Both hits and misses are memoized. Names mentioned by a
    /// fetched body are reserved so fresh names cannot collide with them.
    pub fn resolve_external(
        &mut self,
        target: &CalleeDescriptor,
        source: &mut dyn FunctionSource,
        names: &mut NameSupply,
    ) -> Option<FunctionId> {
        if let Some(cached) = self.external.get(target) {
            return *cached;
        }

        let resolved = source.lookup(target).map(|mut def| {
            let id = self.alloc_id();
            def.uid = Some(id);
            collect::label_function_tree(&mut def, self);
            collect::reserve_function_names(&def, names);
            self.named.insert(id);
            self.defs.insert(id, Some(def));
            id
        });
        self.external.insert(target.clone(), resolved);
        resolved
    }

    pub fn def(&self, id: FunctionId) -> Option<&FunctionDef> {
        self.defs.get(&id).and_then(|slot| slot.as_ref())
    }

    /// Check a definition out for processing. The slot stays allocated so
    /// resolution keeps seeing the id; the body is temporarily owned by the
    /// walker.
    pub fn take_def(&mut self, id: FunctionId) -> Option<FunctionDef> {
        self.defs.get_mut(&id).and_then(|slot| slot.take())
    }

    pub fn put_def(&mut self, id: FunctionId, def: FunctionDef) {
        let slot = self
            .defs
            .get_mut(&id)
            .expect("returning a function the registry never held");
        assert!(slot.is_none(), "function slot was filled while checked out");
        *slot = Some(def);
    }

    pub fn is_named(&self, id: FunctionId) -> bool {
        self.named.contains(&id)
    }

    pub fn is_registered(&self, id: FunctionId) -> bool {
        self.defs.contains_key(&id)
    }

    pub fn begin_processing(&mut self, id: FunctionId) {
        assert!(
            self.in_process.insert(id),
            "inliner revisited a function that is still being processed"
        );
    }

    pub fn finish_processing(&mut self, id: FunctionId) {
        assert!(
            self.in_process.remove(&id),
            "finished processing a function that was never started"
        );
        self.processed.insert(id);
    }

    pub fn is_in_process(&self, id: FunctionId) -> bool {
        self.in_process.contains(&id)
    }

    pub fn is_processed(&self, id: FunctionId) -> bool {
        self.processed.contains(&id)
    }

    pub fn mark_inlined(&mut self, id: FunctionId) {
        self.inlined.insert(id);
    }

    pub fn was_inlined(&self, id: FunctionId) -> bool {
        self.inlined.contains(&id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::build::*;
    use crate::ast::statement::Statement;

    struct CountingSource {
        lookups: usize,
    }

    impl FunctionSource for CountingSource {
        fn lookup(&mut self, target: &CalleeDescriptor) -> Option<FunctionDef> {
            self.lookups += 1;
            if target.name == "known" {
                let Statement::Function(mut def) =
                    func("known", vec!["n"], vec![ret(ident("n"))])
                else {
                    unreachable!()
                };
                def.name = None;
                Some(def)
            } else {
                None
            }
        }
    }

    #[test]
    fn external_lookups_are_memoized() {
        let mut registry = FunctionRegistry::new();
        let mut source = CountingSource { lookups: 0 };
        let mut names = NameSupply::new();

        let hit = CalleeDescriptor::external("other", "known");
        let miss = CalleeDescriptor::external("other", "unknown");

        let id = registry.resolve_external(&hit, &mut source, &mut names);
        assert!(id.is_some());
        assert_eq!(registry.resolve_external(&hit, &mut source, &mut names), id);
        assert_eq!(source.lookups, 1);

        assert!(registry
            .resolve_external(&miss, &mut source, &mut names)
            .is_none());
        assert!(registry
            .resolve_external(&miss, &mut source, &mut names)
            .is_none());
        assert_eq!(source.lookups, 2);
    }

    #[test]
    #[should_panic(expected = "revisited")]
    fn double_begin_processing_is_fatal() {
        let mut registry = FunctionRegistry::new();
        let id = registry.alloc_id();
        registry.begin_processing(id);
        registry.begin_processing(id);
    }
}
