//! Collision-free identifier generation for inlined expansions.

use rustc_hash::FxHashMap;
use rustc_hash::FxHashSet;

/// Every name visible or mentioned anywhere in the unit, plus every name the
/// pass has generated so far. Shared across the whole pass; fresh names are
/// checked against it so an expansion can never capture or shadow anything.
#[derive(Debug, Default)]
pub struct NameSupply {
    taken: FxHashSet<String>,
    generated: FxHashSet<String>,
}

impl NameSupply {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reserve(&mut self, name: impl Into<String>) {
        self.taken.insert(name.into());
    }

    pub fn is_taken(&self, name: &str) -> bool {
        self.taken.contains(name)
    }

    fn reserve_generated(&mut self, name: String) {
        self.generated.insert(name.clone());
        self.taken.insert(name);
    }

    /// Whether the pass itself minted this name. Generated names are
    /// assigned only at their defining statement, so reading one can never
    /// observe a later side effect.
    pub fn is_generated(&self, name: &str) -> bool {
        self.generated.contains(name)
    }
}

/// Per-activation fresh-name generator. Counters are monotonic per base
/// name, so output names depend only on the order of requests, never on
/// hash iteration or addresses.
#[derive(Debug, Default)]
pub struct NamingContext {
    counters: FxHashMap<String, u32>,
}

impl NamingContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// A name derived from `base` that collides with nothing visible in the
    /// unit and nothing generated before it.
    pub fn fresh(&mut self, supply: &mut NameSupply, base: &str) -> String {
        loop {
            let counter = self.counters.entry(base.to_string()).or_insert(0);
            *counter += 1;
            let candidate = format!("{}_{}", base, counter);
            if !supply.is_taken(&candidate) {
                supply.reserve_generated(candidate.clone());
                return candidate;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_names_count_up_per_base() {
        let mut supply = NameSupply::new();
        let mut naming = NamingContext::new();

        assert_eq!(naming.fresh(&mut supply, "a"), "a_1");
        assert_eq!(naming.fresh(&mut supply, "a"), "a_2");
        assert_eq!(naming.fresh(&mut supply, "b"), "b_1");
    }

    #[test]
    fn fresh_names_skip_taken_names() {
        let mut supply = NameSupply::new();
        supply.reserve("tmp_1");
        supply.reserve("tmp_2");
        let mut naming = NamingContext::new();

        assert_eq!(naming.fresh(&mut supply, "tmp"), "tmp_3");
    }

    #[test]
    fn separate_contexts_share_the_supply() {
        let mut supply = NameSupply::new();
        let mut outer = NamingContext::new();
        let mut inner = NamingContext::new();

        assert_eq!(outer.fresh(&mut supply, "x"), "x_1");
        // the inner activation restarts its counter but still cannot reuse x_1
        assert_eq!(inner.fresh(&mut supply, "x"), "x_2");
    }
}
