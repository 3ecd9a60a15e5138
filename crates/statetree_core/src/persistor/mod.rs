//! Persistence delegate capability.
//!
//! # Responsibility
//! - Define the hooks a model calls on load, on commit and on lazy reads.
//! - Ship two stores: an in-memory recorder and a SQLite document store.
//!
//! # Invariants
//! - A delegate is created per model through its [`PersistorFactory`].
//! - `changed` is only called after validation passed.

mod completion;
pub mod memory;
pub mod sqlite;

use crate::model::{Model, Value};
use crate::validation::Errors;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::rc::Rc;

pub use completion::{Completion, CompletionState, Resolver};
pub use memory::{ChangeRecord, MemoryStore};
pub use sqlite::{SqliteStore, StoreError};

/// Whether a model was constructed fresh or from stored state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InitialState {
    New,
    Loaded,
}

/// Hooks a model calls into its persistence layer.
pub trait Persistor {
    /// Called once after construction finished its initial assignment.
    fn loaded(&self, model: &Model, state: InitialState);

    /// Called after a successful validation of `field` (`None` for a mass
    /// assignment).
    fn changed(&self, model: &Model, field: Option<&str>) -> Completion;

    /// Whether new models get a generated `id`.
    fn auto_generate_id(&self) -> bool {
        false
    }

    /// Optional hook that supplies values for absent fields.
    fn as_lazy_reader(&self) -> Option<&dyn LazyReader> {
        None
    }
}

/// Supplies the value materialized when an absent field is read.
pub trait LazyReader {
    fn read_new_model(&self, model: &Model, name: &str) -> Value;
}

/// Builds the delegate for a freshly constructed model.
pub type PersistorFactory = Rc<dyn Fn(&Model) -> Box<dyn Persistor>>;

/// Failure reported through a [`Completion`].
#[derive(Debug, Clone, PartialEq)]
pub enum PersistError {
    Rejected(Errors),
    Storage(String),
}

impl Display for PersistError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Rejected(errors) => write!(f, "store rejected the write: {errors}"),
            Self::Storage(message) => write!(f, "storage failure: {message}"),
        }
    }
}

impl Error for PersistError {}
