//! Per-path schemas: validator plus typed accessor map.
//!
//! # Responsibility
//! - Bind a validator and custom getters/setters to a logical model location.
//! - Resolve the schema for a model path once, at construction.
//!
//! # Invariants
//! - Accessors are looked up by field name; there is no dynamic dispatch on
//!   method names.
//! - Among matching patterns, the one with the fewest wildcards wins.

use super::{Model, ModelError, Value};
use crate::persistor::Completion;
use crate::validation::Validator;
use std::collections::HashMap;
use std::fmt::{Debug, Formatter};
use std::rc::Rc;

/// Custom setter; usually transforms the value and calls `assign_attribute`.
pub type Setter = Rc<dyn Fn(&Model, Value) -> Result<Option<Completion>, ModelError>>;
/// Computed getter.
pub type Getter = Rc<dyn Fn(&Model) -> Result<Value, ModelError>>;

/// Path segment matching any single segment.
pub const WILDCARD: &str = "*";

#[derive(Clone, Default)]
pub struct Schema {
    name: String,
    validator: Option<Rc<dyn Validator>>,
    setters: HashMap<String, Setter>,
    getters: HashMap<String, Getter>,
}

impl Schema {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn with_validator(mut self, validator: impl Validator + 'static) -> Self {
        self.validator = Some(Rc::new(validator));
        self
    }

    pub fn with_setter(
        mut self,
        field: &str,
        setter: impl Fn(&Model, Value) -> Result<Option<Completion>, ModelError> + 'static,
    ) -> Self {
        self.setters.insert(field.to_string(), Rc::new(setter));
        self
    }

    pub fn with_getter(
        mut self,
        field: &str,
        getter: impl Fn(&Model) -> Result<Value, ModelError> + 'static,
    ) -> Self {
        self.getters.insert(field.to_string(), Rc::new(getter));
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn validator(&self) -> Option<Rc<dyn Validator>> {
        self.validator.clone()
    }

    pub fn setter(&self, field: &str) -> Option<Setter> {
        self.setters.get(field).cloned()
    }

    pub fn getter(&self, field: &str) -> Option<Getter> {
        self.getters.get(field).cloned()
    }
}

impl Debug for Schema {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let mut setters: Vec<&String> = self.setters.keys().collect();
        setters.sort();
        let mut getters: Vec<&String> = self.getters.keys().collect();
        getters.sort();
        f.debug_struct("Schema")
            .field("name", &self.name)
            .field("validator", &self.validator.is_some())
            .field("setters", &setters)
            .field("getters", &getters)
            .finish()
    }
}

/// Registry from path pattern to schema.
#[derive(Debug, Clone, Default)]
pub struct ClassPaths {
    entries: Vec<(Vec<String>, Rc<Schema>)>,
}

impl ClassPaths {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `schema` for models whose path matches `pattern`.
    ///
    /// `&[]` targets root models; `*` matches any one segment, e.g.
    /// `&["people", "*"]` for every item of the `people` collection.
    pub fn register(mut self, pattern: &[&str], schema: Schema) -> Self {
        let pattern = pattern.iter().map(|segment| segment.to_string()).collect();
        self.entries.push((pattern, Rc::new(schema)));
        self
    }

    pub fn resolve(&self, path: &[String]) -> Option<Rc<Schema>> {
        self.entries
            .iter()
            .filter(|(pattern, _)| matches_path(pattern, path))
            .min_by_key(|(pattern, _)| {
                pattern
                    .iter()
                    .filter(|segment| segment.as_str() == WILDCARD)
                    .count()
            })
            .map(|(_, schema)| schema.clone())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn matches_path(pattern: &[String], path: &[String]) -> bool {
    pattern.len() == path.len()
        && pattern
            .iter()
            .zip(path)
            .all(|(expected, actual)| expected == WILDCARD || expected == actual)
}

#[cfg(test)]
mod tests {
    use super::{ClassPaths, Schema};

    fn path(segments: &[&str]) -> Vec<String> {
        segments.iter().map(|segment| segment.to_string()).collect()
    }

    #[test]
    fn resolves_exact_and_wildcard_patterns() {
        let class_paths = ClassPaths::new()
            .register(&[], Schema::new("root"))
            .register(&["people", "*"], Schema::new("person"))
            .register(&["people", "0"], Schema::new("first_person"));

        let root = class_paths.resolve(&[]).expect("root schema");
        assert_eq!(root.name(), "root");

        let first = class_paths.resolve(&path(&["people", "0"])).expect("first");
        assert_eq!(first.name(), "first_person");

        let other = class_paths.resolve(&path(&["people", "7"])).expect("person");
        assert_eq!(other.name(), "person");

        assert!(class_paths.resolve(&path(&["people"])).is_none());
        assert_eq!(class_paths.len(), 3);
    }

    #[test]
    fn accessors_are_found_by_name() {
        let schema = Schema::new("person")
            .with_setter("email", |model, value| model.assign_attribute("email", value))
            .with_getter("label", |_| Ok("fixed".into()));

        assert!(schema.setter("email").is_some());
        assert!(schema.setter("label").is_none());
        assert!(schema.getter("label").is_some());
        assert!(schema.validator().is_none());
    }
}
