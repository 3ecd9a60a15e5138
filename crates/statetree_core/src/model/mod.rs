//! Reactive hierarchical attribute container.
//!
//! # Responsibility
//! - Own one attribute store per model and expose read/write on it.
//! - Create nested children lazily and link them into their parent on write.
//! - Run the commit protocol after every mutation outside `no-validate`.
//!
//! # Invariants
//! - `attributes == None` means uninstantiated; `expand` promotes it.
//! - Stored keys never include a reserved name.
//! - `path.last()` is the key under which the parent stores this model.
//! - Exactly one dependency registry is live per model generation.
//! - `is_new()` holds until the first successful commit.

mod attributes;
mod buffer;
pub mod changes;
pub mod collection;
mod commit;
mod error;
pub mod options;
pub mod schema;
pub mod value;

use crate::events::ModelEvent;
use crate::persistor::{InitialState, Persistor};
use crate::reactive::{Dependency, DependencyRegistry};
use crate::validation::Errors;
use changes::ChangeLog;
use serde_json::{Map as JsonMap, Value as Json};
use std::cell::{Cell, RefCell};
use std::fmt::{Debug, Formatter};
use std::rc::Rc;
use uuid::Uuid;

pub use collection::Collection;
pub use error::ModelError;
pub use options::{ModelOptions, Parent};
pub use schema::{ClassPaths, Getter, Schema, Setter};
pub use value::{Attributes, Value};

/// Names that address model internals and can never be fields.
pub const RESERVED_FIELDS: &[&str] = &["attributes", "parent", "path", "options", "persistor"];

/// Field used for model identity.
pub const ID_FIELD: &str = "id";

/// Rejects reserved and empty field names.
pub fn check_valid_field_name(name: &str) -> Result<(), ModelError> {
    if name.trim().is_empty() {
        return Err(ModelError::InvalidFieldName(name.to_string()));
    }
    if RESERVED_FIELDS.contains(&name) {
        return Err(ModelError::ReservedField(name.to_string()));
    }
    Ok(())
}

struct ModelState {
    attributes: Option<Attributes>,
    /// Children materialized by reads while `attributes` is `None`.
    pending: Attributes,
    new: bool,
    changes: ChangeLog,
    errors: Errors,
    server_errors: Errors,
}

pub(crate) struct ModelInner {
    state: RefCell<ModelState>,
    deps: RefCell<DependencyRegistry>,
    size_dep: Dependency,
    generation: Cell<u64>,
    options: RefCell<ModelOptions>,
    schema: RefCell<Option<Rc<Schema>>>,
    persistor: RefCell<Option<Box<dyn Persistor>>>,
}

/// Shared handle to one node of a model tree.
///
/// Cloning the handle does not copy the model; equality between two handles
/// is identity.
#[derive(Clone)]
pub struct Model {
    inner: Rc<ModelInner>,
}

impl Model {
    /// Constructs a new (not yet persisted) model.
    ///
    /// `None` produces an uninstantiated model. The initial assignment runs
    /// validation once but never persists.
    pub fn new(attributes: Option<Attributes>, options: ModelOptions) -> Result<Self, ModelError> {
        Self::with_state(attributes, options, InitialState::New)
    }

    /// Constructs a model that mirrors already-persisted state.
    pub fn loaded(
        attributes: Option<Attributes>,
        options: ModelOptions,
    ) -> Result<Self, ModelError> {
        Self::with_state(attributes, options, InitialState::Loaded)
    }

    /// Builds a model from a JSON object (or `null` for an uninstantiated one).
    pub fn from_json(json: Json, options: ModelOptions) -> Result<Self, ModelError> {
        match Value::from(json) {
            Value::Map(attributes) => Self::new(Some(attributes), options),
            Value::Nil => Self::new(None, options),
            other => Err(ModelError::NotAMapping { kind: other.kind() }),
        }
    }

    /// Empty root model with default options.
    pub fn empty() -> Self {
        Self::bare(ModelOptions::default(), true)
    }

    pub fn with_state(
        attributes: Option<Attributes>,
        options: ModelOptions,
        state: InitialState,
    ) -> Result<Self, ModelError> {
        let model = Self::bare(options, state == InitialState::New);
        model.install_persistor();
        model.assign_all(attributes, true)?;

        {
            let persistor = model.inner.persistor.borrow();
            if let Some(persistor) = persistor.as_ref() {
                persistor.loaded(&model, state);
            }
        }
        model.trigger(ModelEvent::New);
        Ok(model)
    }

    fn bare(options: ModelOptions, new: bool) -> Self {
        let schema = options
            .class_paths
            .as_ref()
            .and_then(|class_paths| class_paths.resolve(&options.path));
        Self {
            inner: Rc::new(ModelInner {
                state: RefCell::new(ModelState {
                    attributes: Some(Attributes::new()),
                    pending: Attributes::new(),
                    new,
                    changes: ChangeLog::new(),
                    errors: Errors::new(),
                    server_errors: Errors::new(),
                }),
                deps: RefCell::new(DependencyRegistry::new()),
                size_dep: Dependency::new(),
                generation: Cell::new(0),
                options: RefCell::new(options),
                schema: RefCell::new(schema),
                persistor: RefCell::new(None),
            }),
        }
    }

    pub(crate) fn from_inner(inner: Rc<ModelInner>) -> Self {
        Self { inner }
    }

    fn install_persistor(&self) {
        let factory = self.inner.options.borrow().persistor.clone();
        if let Some(factory) = factory {
            let persistor = factory(self);
            *self.inner.persistor.borrow_mut() = Some(persistor);
        }
    }

    fn assign_generated_id(&self) {
        let auto_generate = self
            .inner
            .persistor
            .borrow()
            .as_ref()
            .is_some_and(|persistor| persistor.auto_generate_id());
        if !auto_generate {
            return;
        }

        let mut state = self.inner.state.borrow_mut();
        if let Some(attributes) = state.attributes.as_mut() {
            let missing = attributes.get(ID_FIELD).map_or(true, Value::is_nil);
            if missing {
                attributes.insert(
                    ID_FIELD.to_string(),
                    Value::Str(Uuid::new_v4().to_string()),
                );
            }
        }
    }

    /// True while the model has never been instantiated.
    pub fn is_nil(&self) -> bool {
        self.inner.state.borrow().attributes.is_none()
    }

    pub fn is_new(&self) -> bool {
        self.inner.state.borrow().new
    }

    /// Marks the model as not yet persisted.
    pub fn mark_new(&self) {
        self.inner.state.borrow_mut().new = true;
    }

    pub fn is_buffer(&self) -> bool {
        self.inner.options.borrow().buffer
    }

    pub fn path(&self) -> Vec<String> {
        self.inner.options.borrow().path.clone()
    }

    pub fn parent(&self) -> Option<Parent> {
        self.inner.options.borrow().parent()
    }

    /// Topmost model reachable through parent links.
    pub fn root(&self) -> Model {
        match self.parent() {
            Some(Parent::Model(parent)) => parent.root(),
            Some(Parent::Collection(collection)) => collection
                .owner()
                .map_or_else(|| self.clone(), |owner| owner.root()),
            None => self.clone(),
        }
    }

    /// Copy of the options this model was built with.
    pub fn options(&self) -> ModelOptions {
        self.inner.options.borrow().clone()
    }

    pub fn schema(&self) -> Option<Rc<Schema>> {
        self.inner.schema.borrow().clone()
    }

    /// Number of registry replacements (one per mass assignment).
    pub fn generation(&self) -> u64 {
        self.inner.generation.get()
    }

    /// Count of populated attributes; registers the caller on the size dependency.
    pub fn len(&self) -> usize {
        self.inner.size_dep.depend();
        let state = self.inner.state.borrow();
        state.attributes.as_ref().map_or(0, |attributes| {
            attributes.values().filter(|value| !value.is_nil()).count()
        })
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Aggregate "has populated attributes" dependency.
    pub fn size_dependency(&self) -> Dependency {
        self.inner.size_dep.clone()
    }

    /// Stored field names, without registering a dependency.
    pub fn attribute_names(&self) -> Vec<String> {
        let state = self.inner.state.borrow();
        state
            .attributes
            .as_ref()
            .map(|attributes| attributes.keys().cloned().collect())
            .unwrap_or_default()
    }

    /// Fields written since the last successful commit.
    pub fn changed_attributes(&self) -> Vec<String> {
        self.inner.state.borrow().changes.changed_fields()
    }

    /// Value a field held before the first uncommitted write.
    pub fn was(&self, field: &str) -> Option<Value> {
        self.inner.state.borrow().changes.was(field).cloned()
    }

    pub fn ptr_eq(&self, other: &Model) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    /// Snapshot as JSON; uninstantiated children are omitted.
    pub fn to_json(&self) -> Json {
        let state = self.inner.state.borrow();
        match state.attributes.as_ref() {
            Some(attributes) => Json::Object(
                attributes
                    .iter()
                    .filter(|(_, value)| !is_placeholder(value))
                    .map(|(key, value)| (key.clone(), value.to_json()))
                    .collect::<JsonMap<String, Json>>(),
            ),
            None => Json::Null,
        }
    }

    /// Deep plain copy of the attribute store.
    pub fn to_plain(&self) -> Option<Attributes> {
        let state = self.inner.state.borrow();
        state.attributes.as_ref().map(|attributes| {
            attributes
                .iter()
                .filter(|(_, value)| !is_placeholder(value))
                .map(|(key, value)| (key.clone(), value.to_plain()))
                .collect()
        })
    }

    pub(crate) fn attributes_eq(&self, other: &Value) -> bool {
        let state = self.inner.state.borrow();
        match (state.attributes.as_ref(), other) {
            (None, Value::Nil) => true,
            (Some(attributes), Value::Map(map)) => {
                attributes.len() == map.len()
                    && attributes
                        .iter()
                        .all(|(key, value)| map.get(key).is_some_and(|other| value == other))
            }
            _ => false,
        }
    }

    pub(crate) fn path_label(&self) -> String {
        let options = self.inner.options.borrow();
        if options.path.is_empty() {
            "<root>".to_string()
        } else {
            options.path.join(".")
        }
    }

    fn trigger(&self, event: ModelEvent) {
        let events = self.inner.options.borrow().events.clone();
        if let Some(events) = events {
            events.trigger(&event, self);
        }
    }
}

impl Default for Model {
    fn default() -> Self {
        Self::empty()
    }
}

impl Debug for Model {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let mut debug = f.debug_struct("Model");
        debug.field("path", &self.path());
        match self.inner.state.try_borrow() {
            Ok(state) => {
                debug.field("new", &state.new);
                debug.field("attributes", &state.attributes);
            }
            Err(_) => {
                debug.field("attributes", &"<borrowed>");
            }
        }
        debug.finish()
    }
}

fn is_placeholder(value: &Value) -> bool {
    matches!(value, Value::Model(model) if model.is_nil())
}

/// Pluralized names materialize collections when read.
pub(crate) fn is_plural(name: &str) -> bool {
    name.len() > 1
        && name.ends_with('s')
        && !name.ends_with("ss")
        && !name.ends_with("us")
        && !name.ends_with("is")
}
