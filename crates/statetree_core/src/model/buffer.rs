//! Buffers: detached copies that may hold invalid state until saved.

use super::{Model, ModelError};
use crate::persistor::{Completion, InitialState};
use log::info;
use std::rc::Rc;

impl Model {
    /// Returns a buffer holding a deep copy of this model's attributes.
    ///
    /// Writes to the buffer skip validation and persistence; [`Model::save`]
    /// validates and mass-assigns the buffer into this model.
    pub fn buffer(&self) -> Result<Model, ModelError> {
        let mut options = self.options();
        options.parent = None;
        options.persistor = None;
        options.buffer = true;
        options.save_to = Some(Rc::downgrade(&self.inner));

        let state = if self.is_new() {
            InitialState::New
        } else {
            InitialState::Loaded
        };
        Model::with_state(self.to_plain(), options, state)
    }

    /// Commits a buffer into the model it was created from.
    ///
    /// # Errors
    /// - `NotABuffer` when called on a regular model.
    /// - `DetachedBuffer` when the target model was dropped.
    /// - `Validation` when the buffer, or the target after assignment, is invalid.
    pub fn save(&self) -> Result<Option<Completion>, ModelError> {
        let target = {
            let options = self.inner.options.borrow();
            if !options.buffer {
                return Err(ModelError::NotABuffer);
            }
            options.save_to.clone()
        };
        let target = target
            .and_then(|weak| weak.upgrade())
            .map(Model::from_inner)
            .ok_or(ModelError::DetachedBuffer)?;

        let errors = self.validate();
        if !errors.is_empty() {
            return Err(ModelError::Validation(errors));
        }

        let completion = target.set_attributes(self.to_plain().unwrap_or_default())?;
        if completion.is_none() {
            let errors = target.errors();
            if !errors.is_empty() {
                return Err(ModelError::Validation(errors));
            }
        }
        info!(
            "event=buffer_save module=model status=ok path={}",
            target.path_label()
        );
        Ok(completion)
    }
}
