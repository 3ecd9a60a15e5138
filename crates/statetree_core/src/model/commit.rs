//! Commit protocol: validate, then revert on error or persist on success.
//!
//! # Invariants
//! - Nothing runs inside a `no-validate` scope.
//! - Buffers never validate, revert or persist on write.
//! - A revert restores the values recorded since the last successful commit
//!   and never reaches the persistence delegate.
//! - A successful commit clears the change log and the `new` flag, unless
//!   `no-save` is active.

use super::Model;
use crate::events::ModelEvent;
use crate::modes::{self, Mode};
use crate::persistor::Completion;
use crate::validation::Errors;
use log::{debug, info};

impl Model {
    pub(crate) fn run_changed(&self, field: Option<&str>) -> Option<Completion> {
        if modes::in_mode(Mode::NoValidate) {
            return None;
        }
        if self.is_buffer() {
            debug!(
                "event=model_commit module=model status=skipped reason=buffer path={}",
                self.path_label()
            );
            return None;
        }

        let errors = self.validate();
        if self.has_errors_in_changed_fields() {
            let changed = self.changed_attributes();
            let rejected = errors.retain_fields(&changed);
            let reverted = self.revert_changes();

            let mut regenerated = self.validate();
            regenerated.merge(&rejected);
            self.inner.state.borrow_mut().errors = regenerated;

            info!(
                "event=model_commit module=model status=reverted path={} fields={}",
                self.path_label(),
                reverted.join(",")
            );
            self.trigger(ModelEvent::Reverted(reverted));
            return None;
        }

        self.persist_changes(field)
    }

    fn persist_changes(&self, field: Option<&str>) -> Option<Completion> {
        if modes::in_mode(Mode::NoSave) {
            debug!(
                "event=model_commit module=model status=skipped reason=no_save path={}",
                self.path_label()
            );
            return None;
        }

        let completion = {
            let persistor = self.inner.persistor.borrow();
            match persistor.as_ref() {
                Some(persistor) => persistor.changed(self, field),
                None => Completion::resolved(),
            }
        };

        {
            let mut state = self.inner.state.borrow_mut();
            state.new = false;
            state.changes.clear();
        }

        info!(
            "event=model_commit module=model status=ok path={} field={}",
            self.path_label(),
            field.unwrap_or("*")
        );
        self.trigger(ModelEvent::Changed(field.map(str::to_string)));
        Some(completion)
    }

    /// Construction-time validation: reports errors, never reverts or persists.
    pub(crate) fn run_initial_validation(&self) {
        if modes::in_mode(Mode::NoValidate) || self.is_nil() {
            return;
        }
        let errors = self.validate();
        if !errors.is_empty() {
            debug!(
                "event=model_validate module=model status=invalid path={} fields={}",
                self.path_label(),
                errors.fields().collect::<Vec<_>>().join(",")
            );
        }
    }

    /// Evaluates the schema's validator and stores the result.
    pub fn validate(&self) -> Errors {
        let validator = self.schema().and_then(|schema| schema.validator());
        let errors = match validator {
            Some(validator) => validator.validate(self),
            None => Errors::new(),
        };
        self.inner.state.borrow_mut().errors = errors.clone();
        errors
    }

    /// Validation errors merged with server-side annotations.
    pub fn errors(&self) -> Errors {
        let state = self.inner.state.borrow();
        let mut errors = state.errors.clone();
        errors.merge(&state.server_errors);
        errors
    }

    /// Whether any field with a validation error was written since the last commit.
    pub fn has_errors_in_changed_fields(&self) -> bool {
        let state = self.inner.state.borrow();
        let result = state.errors.fields().any(|field| state.changes.contains(field));
        result
    }

    /// Attaches errors reported by a remote store; each is cleared when its
    /// field is written.
    pub fn set_server_errors(&self, errors: Errors) {
        self.inner.state.borrow_mut().server_errors = errors;
    }

    /// Restores every field recorded since the last commit.
    ///
    /// Returns the reverted field names. Observers of those fields are
    /// notified; the commit protocol is not re-run.
    pub fn revert_changes(&self) -> Vec<String> {
        let original = self.inner.state.borrow_mut().changes.take();
        if original.is_empty() {
            return Vec::new();
        }

        let fields: Vec<String> = original.keys().cloned().collect();
        {
            let mut state = self.inner.state.borrow_mut();
            let attributes = state.attributes.get_or_insert_with(Default::default);
            for (field, old) in original {
                match old {
                    Some(value) => {
                        attributes.insert(field, value);
                    }
                    None => {
                        attributes.remove(&field);
                    }
                }
            }
        }

        for field in &fields {
            self.notify_key(field);
        }
        self.inner.size_dep.changed();
        debug!(
            "event=model_revert module=model status=ok path={} fields={}",
            self.path_label(),
            fields.join(",")
        );
        fields
    }

    /// Drops the change log without reverting.
    pub fn clear_tracked_changes(&self) {
        self.inner.state.borrow_mut().changes.clear();
    }
}
