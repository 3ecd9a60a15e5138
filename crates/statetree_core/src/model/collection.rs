//! Ordered child collection stored under a model field.
//!
//! # Invariants
//! - Items are stored wrapped; item `i` has path `collection.path + [i]`.
//! - A push commits the owning model's field unless `no-validate` is active.

use super::options::{ModelOptions, ParentLink};
use super::{Model, ModelError, Value};
use crate::modes::{self, Mode};
use crate::persistor::Completion;
use crate::reactive::Dependency;
use serde_json::Value as Json;
use std::cell::RefCell;
use std::fmt::{Debug, Formatter};
use std::rc::Rc;

pub(crate) struct CollectionInner {
    items: RefCell<Vec<Value>>,
    options: ModelOptions,
    size_dep: Dependency,
}

/// Shared handle to an ordered list of values.
#[derive(Clone)]
pub struct Collection {
    inner: Rc<CollectionInner>,
}

impl Collection {
    /// Builds a collection, wrapping plain items into models/collections.
    pub fn new(items: Vec<Value>, options: ModelOptions) -> Result<Self, ModelError> {
        let collection = Self {
            inner: Rc::new(CollectionInner {
                items: RefCell::new(Vec::with_capacity(items.len())),
                options,
                size_dep: Dependency::new(),
            }),
        };
        for item in items {
            let wrapped = collection.wrap_item(item)?;
            collection.inner.items.borrow_mut().push(wrapped);
        }
        Ok(collection)
    }

    pub(crate) fn from_inner(inner: Rc<CollectionInner>) -> Self {
        Self { inner }
    }

    fn wrap_item(&self, value: Value) -> Result<Value, ModelError> {
        let index = self.inner.items.borrow().len();
        let options = self.inner.options.for_child(
            ParentLink::Collection(Rc::downgrade(&self.inner)),
            &index.to_string(),
        );
        match value {
            Value::Map(attributes) => Model::new(Some(attributes), options).map(Value::Model),
            Value::List(items) => Collection::new(items, options).map(Value::Collection),
            other => Ok(other),
        }
    }

    /// Appends one item and commits the owning field.
    pub fn push(&self, value: impl Into<Value>) -> Result<Option<Completion>, ModelError> {
        let wrapped = self.wrap_item(value.into())?;
        self.inner.items.borrow_mut().push(wrapped);
        self.inner.size_dep.changed();

        let Some(owner) = self.owner() else {
            return Ok(None);
        };
        owner.expand()?;
        if modes::in_mode(Mode::NoValidate) {
            return Ok(None);
        }
        let field = self.inner.options.path.last().cloned();
        Ok(owner.run_changed(field.as_deref()))
    }

    /// Item at `index`; registers the caller on the size dependency.
    pub fn get(&self, index: usize) -> Option<Value> {
        self.inner.size_dep.depend();
        self.inner.items.borrow().get(index).cloned()
    }

    pub fn len(&self) -> usize {
        self.inner.size_dep.depend();
        self.inner.items.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn items(&self) -> Vec<Value> {
        self.inner.size_dep.depend();
        self.inner.items.borrow().clone()
    }

    pub fn path(&self) -> Vec<String> {
        self.inner.options.path.clone()
    }

    /// Model whose field holds this collection.
    pub fn owner(&self) -> Option<Model> {
        match self.inner.options.parent() {
            Some(super::Parent::Model(model)) => Some(model),
            _ => None,
        }
    }

    pub fn size_dependency(&self) -> Dependency {
        self.inner.size_dep.clone()
    }

    pub fn ptr_eq(&self, other: &Collection) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    pub(crate) fn items_eq(&self, other: &[Value]) -> bool {
        let items = self.inner.items.borrow();
        items.len() == other.len() && items.iter().zip(other).all(|(left, right)| left == right)
    }

    pub fn to_plain(&self) -> Value {
        Value::List(self.inner.items.borrow().iter().map(Value::to_plain).collect())
    }

    pub fn to_json(&self) -> Json {
        Json::Array(self.inner.items.borrow().iter().map(Value::to_json).collect())
    }
}

impl Debug for Collection {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let mut debug = f.debug_struct("Collection");
        debug.field("path", &self.inner.options.path);
        match self.inner.items.try_borrow() {
            Ok(items) => {
                debug.field("items", &*items);
            }
            Err(_) => {
                debug.field("items", &"<borrowed>");
            }
        }
        debug.finish()
    }
}
