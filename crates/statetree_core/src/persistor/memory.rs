//! In-memory persistence delegate.
//!
//! Stores one JSON snapshot per root model and records every commit it
//! receives. Useful as a reference delegate and as a test double.

use super::{Completion, InitialState, PersistError, Persistor, PersistorFactory};
use crate::model::{Model, Value, ID_FIELD};
use log::debug;
use serde_json::Value as Json;
use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;

/// One commit observed by the store.
#[derive(Debug, Clone, PartialEq)]
pub struct ChangeRecord {
    pub path: Vec<String>,
    pub field: Option<String>,
    pub new: bool,
}

#[derive(Default)]
struct StoreState {
    documents: BTreeMap<String, Json>,
    changes: Vec<ChangeRecord>,
    loaded: usize,
    fail_next: Option<PersistError>,
}

/// Shared in-memory document store.
#[derive(Clone, Default)]
pub struct MemoryStore {
    state: Rc<RefCell<StoreState>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Factory handing every model a delegate bound to this store.
    pub fn factory(&self) -> PersistorFactory {
        let store = self.clone();
        Rc::new(move |_model: &Model| -> Box<dyn Persistor> {
            Box::new(MemoryPersistor {
                store: store.clone(),
            })
        })
    }

    pub fn documents(&self) -> BTreeMap<String, Json> {
        self.state.borrow().documents.clone()
    }

    pub fn document(&self, key: &str) -> Option<Json> {
        self.state.borrow().documents.get(key).cloned()
    }

    pub fn changes(&self) -> Vec<ChangeRecord> {
        self.state.borrow().changes.clone()
    }

    /// Number of `loaded` hooks received.
    pub fn loaded_count(&self) -> usize {
        self.state.borrow().loaded
    }

    /// Makes the next commit settle with `error` instead of writing.
    pub fn fail_next(&self, error: PersistError) {
        self.state.borrow_mut().fail_next = Some(error);
    }
}

struct MemoryPersistor {
    store: MemoryStore,
}

impl Persistor for MemoryPersistor {
    fn loaded(&self, _model: &Model, _state: InitialState) {
        self.store.state.borrow_mut().loaded += 1;
    }

    fn changed(&self, model: &Model, field: Option<&str>) -> Completion {
        let mut state = self.store.state.borrow_mut();
        state.changes.push(ChangeRecord {
            path: model.path(),
            field: field.map(str::to_string),
            new: model.is_new(),
        });

        if let Some(error) = state.fail_next.take() {
            debug!(
                "event=persist_changed module=persistor store=memory status=rejected error={error}"
            );
            return Completion::rejected(error);
        }

        let root = model.root();
        let key = match root.peek(ID_FIELD) {
            Some(Value::Str(id)) => id,
            Some(Value::Int(id)) => id.to_string(),
            _ => "root".to_string(),
        };
        debug!("event=persist_changed module=persistor store=memory status=ok key={key}");
        state.documents.insert(key, root.to_json());
        Completion::resolved()
    }

    fn auto_generate_id(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::MemoryStore;
    use crate::model::{Model, ModelOptions};
    use crate::persistor::PersistError;
    use serde_json::json;

    fn model_with(store: &MemoryStore) -> Model {
        Model::from_json(
            json!({"id": "m1", "name": "a"}),
            ModelOptions::new().with_persistor(store.factory()),
        )
        .expect("model builds")
    }

    #[test]
    fn commit_snapshots_root_document() {
        let store = MemoryStore::new();
        let model = model_with(&store);
        assert_eq!(store.loaded_count(), 1);
        assert!(store.documents().is_empty());

        let completion = model
            .assign_attribute("name", "b")
            .expect("assign")
            .expect("persisted");
        assert!(completion.is_resolved());
        assert_eq!(store.document("m1"), Some(json!({"id": "m1", "name": "b"})));

        let changes = store.changes();
        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].field.as_deref(), Some("name"));
        assert!(changes[0].new);
    }

    #[test]
    fn fail_next_rejects_once() {
        let store = MemoryStore::new();
        let model = model_with(&store);
        store.fail_next(PersistError::Storage("offline".to_string()));

        let first = model.assign_attribute("name", "b").expect("assign");
        assert!(first.expect("completion").is_rejected());
        assert!(store.document("m1").is_none());

        let second = model.assign_attribute("name", "c").expect("assign");
        assert!(second.expect("completion").is_resolved());
        assert_eq!(store.document("m1"), Some(json!({"id": "m1", "name": "c"})));
    }
}
