//! Dirty tracking: undo log since the last successful commit.

use super::Value;
use std::collections::BTreeMap;

/// Previous value of every field written since the last commit.
///
/// `None` records that the field was absent before the write.
#[derive(Debug, Clone, Default)]
pub struct ChangeLog {
    original: BTreeMap<String, Option<Value>>,
}

impl ChangeLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records `old` unless the field already has an entry; the first
    /// recorded value is the one a revert restores.
    pub fn record_will_change(&mut self, field: &str, old: Option<Value>) {
        self.original.entry(field.to_string()).or_insert(old);
    }

    pub fn contains(&self, field: &str) -> bool {
        self.original.contains_key(field)
    }

    /// Value before the first write since the last commit.
    pub fn was(&self, field: &str) -> Option<&Value> {
        self.original.get(field).and_then(Option::as_ref)
    }

    pub fn changed_fields(&self) -> Vec<String> {
        self.original.keys().cloned().collect()
    }

    pub fn is_empty(&self) -> bool {
        self.original.is_empty()
    }

    /// Drains the log for a revert.
    pub fn take(&mut self) -> BTreeMap<String, Option<Value>> {
        std::mem::take(&mut self.original)
    }

    pub fn clear(&mut self) {
        self.original.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::ChangeLog;
    use crate::model::Value;

    #[test]
    fn first_recorded_value_wins() {
        let mut log = ChangeLog::new();
        log.record_will_change("age", Some(Value::Int(20)));
        log.record_will_change("age", Some(Value::Int(10)));
        log.record_will_change("name", None);

        assert_eq!(log.was("age"), Some(&Value::Int(20)));
        assert_eq!(log.was("name"), None);
        assert!(log.contains("name"));
        assert_eq!(log.changed_fields(), vec!["age".to_string(), "name".to_string()]);
    }

    #[test]
    fn take_drains_and_clear_empties() {
        let mut log = ChangeLog::new();
        log.record_will_change("age", Some(Value::Int(1)));

        let drained = log.take();
        assert_eq!(drained.len(), 1);
        assert!(log.is_empty());

        log.record_will_change("age", None);
        log.clear();
        assert!(log.is_empty());
    }
}
