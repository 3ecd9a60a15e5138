//! Field access: reads with lazy children, writes, expansion and mass assignment.

use super::options::{ParentLink, Parent};
use super::{
    check_valid_field_name, is_plural, Attributes, Collection, Model, ModelError, ModelOptions,
    Value, ID_FIELD,
};
use crate::modes::{self, Mode};
use crate::persistor::{Completion, InitialState};
use crate::reactive::tick;
use log::debug;
use std::rc::Rc;

impl Model {
    /// Reads a field and registers the running computation on it.
    ///
    /// An absent field is materialized as an uninstantiated child model, or a
    /// collection for pluralized names, and stored so later reads return the
    /// same instance. The size notification for that insert is deferred to
    /// the end of the current tick. An uninstantiated model keeps such
    /// children aside and stays uninstantiated until a write expands it.
    ///
    /// # Errors
    /// - `ReservedField` / `InvalidFieldName` for unusable names.
    pub fn read_attribute(&self, name: &str) -> Result<Value, ModelError> {
        check_valid_field_name(name)?;

        if let Some(value) = self.peek(name).or_else(|| self.pending_child(name)) {
            self.depend_key(name);
            return Ok(value);
        }

        let child = self.read_new_model(name)?;
        {
            let mut state = self.inner.state.borrow_mut();
            let state = &mut *state;
            match state.attributes.as_mut() {
                Some(attributes) => attributes.insert(name.to_string(), child.clone()),
                None => state.pending.insert(name.to_string(), child.clone()),
            };
        }

        let size_dep = self.inner.size_dep.clone();
        tick::defer(move || size_dep.changed());
        self.depend_key(name);
        Ok(child)
    }

    /// Stored value without dependency registration or lazy creation.
    pub fn peek(&self, name: &str) -> Option<Value> {
        let state = self.inner.state.borrow();
        state
            .attributes
            .as_ref()
            .and_then(|attributes| attributes.get(name).cloned())
    }

    fn pending_child(&self, name: &str) -> Option<Value> {
        self.inner.state.borrow().pending.get(name).cloned()
    }

    /// Writes one field and runs the commit protocol for it.
    ///
    /// Returns the persistence completion, or `None` when nothing was
    /// persisted (unchanged value, suppressed mode, buffer, or reverted).
    ///
    /// # Errors
    /// - `ReservedField` / `InvalidFieldName` for unusable names.
    pub fn assign_attribute(
        &self,
        name: &str,
        value: impl Into<Value>,
    ) -> Result<Option<Completion>, ModelError> {
        check_valid_field_name(name)?;
        self.expand()?;

        let new_value = self.wrap_value(value.into(), name)?;
        let old_value = self.peek(name);
        if old_value.as_ref().unwrap_or(&Value::Nil) == &new_value {
            return Ok(None);
        }

        let size_changed = old_value.as_ref().map_or(true, Value::is_nil) || new_value.is_nil();
        {
            let mut state = self.inner.state.borrow_mut();
            if !modes::in_mode(Mode::NoChangeTracking) {
                state.changes.record_will_change(name, old_value);
            }
            state
                .attributes
                .get_or_insert_with(Attributes::new)
                .insert(name.to_string(), new_value);
            state.server_errors.remove(name);
        }

        self.notify_key(name);
        if size_changed {
            self.inner.size_dep.changed();
        }

        if modes::in_mode(Mode::NoValidate) {
            return Ok(None);
        }
        Ok(self.run_changed(Some(name)))
    }

    /// Reads through the schema's getter when one is registered.
    pub fn get(&self, name: &str) -> Result<Value, ModelError> {
        match self.schema().and_then(|schema| schema.getter(name)) {
            Some(getter) => getter(self),
            None => self.read_attribute(name),
        }
    }

    /// Writes through the schema's setter when one is registered.
    pub fn set(
        &self,
        name: &str,
        value: impl Into<Value>,
    ) -> Result<Option<Completion>, ModelError> {
        match self.schema().and_then(|schema| schema.setter(name)) {
            Some(setter) => setter(self, value.into()),
            None => self.assign_attribute(name, value),
        }
    }

    /// Replaces the attribute store from `attributes` as one batch.
    ///
    /// `id` is assigned first, then every other field through [`Model::set`]
    /// under `no-validate`; fields missing from the input are removed. One
    /// aggregate notification fires and a fresh dependency registry is
    /// installed before the commit protocol runs once for the whole batch.
    pub fn set_attributes(&self, attributes: Attributes) -> Result<Option<Completion>, ModelError> {
        self.assign_all(Some(attributes), false)
    }

    pub(crate) fn assign_all(
        &self,
        attributes: Option<Attributes>,
        initial: bool,
    ) -> Result<Option<Completion>, ModelError> {
        if let Some(attributes) = attributes.as_ref() {
            for key in attributes.keys() {
                check_valid_field_name(key)?;
            }
        }

        if attributes.is_some() && !initial {
            self.expand()?;
        }

        self.inner.size_dep.changed();
        modes::run_in_mode(Mode::NoValidate, || match attributes {
            Some(attributes) if initial => {
                modes::run_in_mode(Mode::NoChangeTracking, || self.assign_each(attributes))
            }
            Some(attributes) => {
                self.remove_absent(&attributes);
                self.assign_each(attributes)
            }
            None => {
                self.inner.state.borrow_mut().attributes = None;
                Ok(())
            }
        })?;

        if initial && self.is_new() {
            self.assign_generated_id();
        }
        self.replace_registry();

        if initial {
            self.run_initial_validation();
            Ok(None)
        } else {
            Ok(self.run_changed(None))
        }
    }

    fn assign_each(&self, mut attributes: Attributes) -> Result<(), ModelError> {
        if let Some(id) = attributes.remove(ID_FIELD) {
            self.set(ID_FIELD, id)?;
        }
        for (key, value) in attributes {
            self.set(&key, value)?;
        }
        Ok(())
    }

    fn remove_absent(&self, keep: &Attributes) {
        let removed = {
            let mut state = self.inner.state.borrow_mut();
            let state = &mut *state;
            let Some(current) = state.attributes.as_mut() else {
                return;
            };
            let stale: Vec<String> = current
                .keys()
                .filter(|key| key.as_str() != ID_FIELD && !keep.contains_key(*key))
                .cloned()
                .collect();
            for key in &stale {
                let old = current.remove(key);
                if !modes::in_mode(Mode::NoChangeTracking) {
                    state.changes.record_will_change(key, old);
                }
            }
            stale
        };

        for key in &removed {
            self.notify_key(key);
        }
    }

    /// Promotes an uninstantiated model to an empty live one and links it,
    /// and every uninstantiated ancestor, into its parent.
    ///
    /// Children read while uninstantiated move into the store as placeholders.
    pub fn expand(&self) -> Result<(), ModelError> {
        let promoted = {
            let mut state = self.inner.state.borrow_mut();
            if state.attributes.is_none() {
                let pending = std::mem::take(&mut state.pending);
                state.attributes = Some(pending);
                true
            } else {
                false
            }
        };
        if !promoted {
            return Ok(());
        }
        debug!(
            "event=model_expand module=model status=ok path={}",
            self.path_label()
        );

        match self.parent() {
            Some(Parent::Model(parent)) => {
                parent.expand()?;
                if let Some(key) = self.path().last() {
                    self.reattach(&parent, key)?;
                }
            }
            Some(Parent::Collection(collection)) => {
                if let Some(owner) = collection.owner() {
                    owner.expand()?;
                }
            }
            None => {}
        }
        Ok(())
    }

    /// Stores this model in `parent` under `key`.
    ///
    /// When the parent already holds this instance, its observers are told
    /// the placeholder became live instead of running a redundant commit.
    pub fn reattach(&self, parent: &Model, key: &str) -> Result<(), ModelError> {
        let holds_self = matches!(parent.peek(key), Some(Value::Model(ref held)) if held.ptr_eq(self));
        if holds_self {
            parent.notify_key(key);
            parent.inner.size_dep.changed();
            return Ok(());
        }
        parent.assign_attribute(key, Value::Model(self.clone()))?;
        Ok(())
    }

    /// Appends to the collection stored in the parent under this model's key.
    ///
    /// Used on placeholders: the collection is created in the parent when the
    /// field does not hold one yet.
    ///
    /// # Errors
    /// - `NoParent` when this model is not held by a parent model.
    /// - `NotACollection` when the parent field holds another value.
    pub fn append(&self, value: impl Into<Value>) -> Result<Collection, ModelError> {
        let parent = match self.parent() {
            Some(Parent::Model(parent)) => parent,
            _ => return Err(ModelError::NoParent { path: self.path() }),
        };
        let key = self
            .path()
            .last()
            .cloned()
            .ok_or_else(|| ModelError::NoParent { path: self.path() })?;

        parent.expand()?;
        let collection = parent.collection_at(&key)?;
        collection.push(value)?;
        Ok(collection)
    }

    /// Appends to the collection under `field`, creating it when absent.
    pub fn append_to(&self, field: &str, value: impl Into<Value>) -> Result<Collection, ModelError> {
        self.expand()?;
        let collection = self.collection_at(field)?;
        collection.push(value)?;
        Ok(collection)
    }

    fn collection_at(&self, key: &str) -> Result<Collection, ModelError> {
        match self.read_attribute(key)? {
            Value::Collection(collection) => Ok(collection),
            value if value.is_nil() => {
                self.assign_attribute(key, Value::List(Vec::new()))?;
                match self.peek(key) {
                    Some(Value::Collection(collection)) => Ok(collection),
                    _ => Err(ModelError::NotACollection {
                        field: key.to_string(),
                    }),
                }
            }
            _ => Err(ModelError::NotACollection {
                field: key.to_string(),
            }),
        }
    }

    fn read_new_model(&self, name: &str) -> Result<Value, ModelError> {
        {
            let persistor = self.inner.persistor.borrow();
            if let Some(reader) = persistor
                .as_ref()
                .and_then(|persistor| persistor.as_lazy_reader())
            {
                return Ok(reader.read_new_model(self, name));
            }
        }

        let options = self.child_options(name);
        if is_plural(name) {
            Collection::new(Vec::new(), options).map(Value::Collection)
        } else {
            Model::with_state(None, options, InitialState::New).map(Value::Model)
        }
    }

    fn wrap_value(&self, value: Value, key: &str) -> Result<Value, ModelError> {
        let state = if self.is_new() {
            InitialState::New
        } else {
            InitialState::Loaded
        };
        match value {
            Value::Map(attributes) => {
                Model::with_state(Some(attributes), self.child_options(key), state)
                    .map(Value::Model)
            }
            Value::List(items) => {
                Collection::new(items, self.child_options(key)).map(Value::Collection)
            }
            other => Ok(other),
        }
    }

    /// Options for a child created under `key`.
    pub fn child_options(&self, key: &str) -> ModelOptions {
        self.inner
            .options
            .borrow()
            .for_child(ParentLink::Model(Rc::downgrade(&self.inner)), key)
    }

    fn depend_key(&self, name: &str) {
        let dependency = self.inner.deps.borrow_mut().entry(name);
        dependency.depend();
    }

    pub(crate) fn notify_key(&self, name: &str) {
        let dependency = self.inner.deps.borrow().get(name);
        if let Some(dependency) = dependency {
            dependency.changed();
        }
    }

    fn replace_registry(&self) {
        let previous = std::mem::take(&mut *self.inner.deps.borrow_mut());
        self.inner.generation.set(self.inner.generation.get() + 1);
        previous.changed_all();
    }
}
