//! Model configuration and its specialization for children.

use super::collection::CollectionInner;
use super::schema::ClassPaths;
use super::{Collection, Model, ModelInner};
use crate::events::EventEmitter;
use crate::persistor::PersistorFactory;
use std::fmt::{Debug, Formatter};
use std::rc::{Rc, Weak};

/// Weak back-reference to the container of a model.
#[derive(Clone)]
pub(crate) enum ParentLink {
    Model(Weak<ModelInner>),
    Collection(Weak<CollectionInner>),
}

/// Upgraded parent of a model.
#[derive(Debug, Clone)]
pub enum Parent {
    Model(Model),
    Collection(Collection),
}

/// Options shared by a model and, specialized, by every child it creates.
#[derive(Clone, Default)]
pub struct ModelOptions {
    pub(crate) parent: Option<ParentLink>,
    pub(crate) path: Vec<String>,
    pub(crate) class_paths: Option<Rc<ClassPaths>>,
    pub(crate) persistor: Option<PersistorFactory>,
    pub(crate) events: Option<Rc<dyn EventEmitter>>,
    pub(crate) buffer: bool,
    pub(crate) save_to: Option<Weak<ModelInner>>,
}

impl ModelOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Logical location of a root model (for example a collection name).
    pub fn with_path<I, S>(mut self, path: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.path = path.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_class_paths(mut self, class_paths: Rc<ClassPaths>) -> Self {
        self.class_paths = Some(class_paths);
        self
    }

    pub fn with_persistor(mut self, factory: PersistorFactory) -> Self {
        self.persistor = Some(factory);
        self
    }

    pub fn with_events(mut self, events: Rc<dyn EventEmitter>) -> Self {
        self.events = Some(events);
        self
    }

    pub fn path(&self) -> &[String] {
        &self.path
    }

    pub fn is_buffer(&self) -> bool {
        self.buffer
    }

    pub fn has_persistor(&self) -> bool {
        self.persistor.is_some()
    }

    pub fn parent(&self) -> Option<Parent> {
        match self.parent.as_ref()? {
            ParentLink::Model(weak) => weak
                .upgrade()
                .map(|inner| Parent::Model(Model::from_inner(inner))),
            ParentLink::Collection(weak) => weak
                .upgrade()
                .map(|inner| Parent::Collection(Collection::from_inner(inner))),
        }
    }

    /// Options for a child stored under `key`: parent relinked, path extended.
    ///
    /// Children of a buffer are buffers too; only the top buffer saves.
    pub(crate) fn for_child(&self, parent: ParentLink, key: &str) -> Self {
        let mut options = self.clone();
        options.parent = Some(parent);
        options.path.push(key.to_string());
        options.save_to = None;
        options
    }
}

impl Debug for ModelOptions {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelOptions")
            .field("path", &self.path)
            .field("has_parent", &self.parent.is_some())
            .field("class_paths", &self.class_paths.as_ref().map(|paths| paths.len()))
            .field("persistor", &self.persistor.is_some())
            .field("events", &self.events.is_some())
            .field("buffer", &self.buffer)
            .finish()
    }
}
