//! Per-key dependency registry owned by one model generation.

use super::dependency::Dependency;
use std::collections::HashMap;

/// Maps field names to their [`Dependency`].
#[derive(Default)]
pub struct DependencyRegistry {
    keys: HashMap<String, Dependency>,
}

impl DependencyRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the dependency for `key`, creating it on first use.
    pub fn entry(&mut self, key: &str) -> Dependency {
        self.keys.entry(key.to_string()).or_default().clone()
    }

    pub fn get(&self, key: &str) -> Option<Dependency> {
        self.keys.get(key).cloned()
    }

    /// Notifies every key at once.
    pub fn changed_all(&self) {
        for dependency in self.keys.values() {
            dependency.changed();
        }
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::DependencyRegistry;
    use crate::reactive::Computation;

    #[test]
    fn keys_are_notified_independently() {
        let mut registry = DependencyRegistry::new();
        let name_watcher = Computation::new();
        let age_watcher = Computation::new();

        let name = registry.entry("name");
        let age = registry.entry("age");
        name_watcher.run(|| name.depend());
        age_watcher.run(|| age.depend());

        if let Some(dep) = registry.get("name") {
            dep.changed();
        }

        assert!(name_watcher.is_invalidated());
        assert!(!age_watcher.is_invalidated());
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn changed_all_reaches_every_key() {
        let mut registry = DependencyRegistry::new();
        let watcher = Computation::new();
        let first = registry.entry("a");
        let second = registry.entry("b");
        watcher.run(|| {
            first.depend();
            second.depend();
        });

        registry.changed_all();

        assert_eq!(watcher.invalidation_count(), 1);
        assert!(registry.get("missing").is_none());
    }
}
