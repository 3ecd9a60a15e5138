//! Reactive hierarchical attribute models.
//!
//! A [`Model`] owns a tree of attributes, creates nested children lazily,
//! notifies reactive computations on change and runs a validate, revert or
//! persist commit protocol after each write.

pub mod config;
pub mod db;
pub mod events;
pub mod logging;
pub mod model;
pub mod modes;
pub mod persistor;
pub mod reactive;
pub mod validation;

pub use config::{ConfigError, CoreConfig};
pub use events::{EventEmitter, Listeners, ModelEvent};
pub use logging::{default_log_level, init_logging, logging_status, LogConfig};
pub use model::{
    Attributes, ClassPaths, Collection, Model, ModelError, ModelOptions, Parent, Schema, Value,
};
pub use modes::{in_mode, run_in_mode, Mode};
pub use persistor::{
    Completion, InitialState, LazyReader, MemoryStore, PersistError, Persistor, PersistorFactory,
    SqliteStore, StoreError,
};
pub use reactive::{tick, Computation, Dependency, DependencyRegistry};
pub use validation::{Errors, RuleSet, Validator};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::core_version;

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }
}
