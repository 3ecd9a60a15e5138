//! Model lifecycle events.
//!
//! # Invariants
//! - `New` fires once per constructed model, after its initial assignment.
//! - `Changed` fires after a successful commit, `Reverted` after a rejected one.

use crate::model::Model;
use std::cell::RefCell;
use std::rc::Rc;

/// Lifecycle notification emitted by a model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModelEvent {
    New,
    /// Committed field, `None` for a mass assignment.
    Changed(Option<String>),
    /// Fields restored by a revert.
    Reverted(Vec<String>),
}

impl ModelEvent {
    pub fn name(&self) -> &'static str {
        match self {
            Self::New => "new",
            Self::Changed(_) => "changed",
            Self::Reverted(_) => "reverted",
        }
    }
}

/// Receiver for model events, shared through [`crate::model::ModelOptions`].
pub trait EventEmitter {
    fn trigger(&self, event: &ModelEvent, model: &Model);
}

type Handler = Rc<dyn Fn(&ModelEvent, &Model)>;

/// Simple listener registry keyed by event name.
#[derive(Default)]
pub struct Listeners {
    handlers: RefCell<Vec<(Option<&'static str>, Handler)>>,
}

impl Listeners {
    pub fn new() -> Rc<Self> {
        Rc::new(Self::default())
    }

    /// Registers `handler` for events whose [`ModelEvent::name`] is `name`.
    pub fn on(&self, name: &'static str, handler: impl Fn(&ModelEvent, &Model) + 'static) {
        self.handlers
            .borrow_mut()
            .push((Some(name), Rc::new(handler)));
    }

    pub fn on_any(&self, handler: impl Fn(&ModelEvent, &Model) + 'static) {
        self.handlers.borrow_mut().push((None, Rc::new(handler)));
    }

    pub fn len(&self) -> usize {
        self.handlers.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl EventEmitter for Listeners {
    fn trigger(&self, event: &ModelEvent, model: &Model) {
        // Handlers may register further listeners while running.
        let handlers = self.handlers.borrow().clone();
        for (name, handler) in &handlers {
            if name.map_or(true, |name| name == event.name()) {
                handler(event, model);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{EventEmitter, Listeners, ModelEvent};
    use crate::model::Model;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[test]
    fn filters_by_event_name() {
        let listeners = Listeners::new();
        let seen = Rc::new(RefCell::new(Vec::new()));

        let sink = seen.clone();
        listeners.on("changed", move |event, _| sink.borrow_mut().push(event.clone()));
        let sink = seen.clone();
        listeners.on_any(move |event, _| sink.borrow_mut().push(event.clone()));
        assert_eq!(listeners.len(), 2);

        let model = Model::empty();
        listeners.trigger(&ModelEvent::New, &model);
        listeners.trigger(&ModelEvent::Changed(Some("age".to_string())), &model);

        assert_eq!(
            *seen.borrow(),
            vec![
                ModelEvent::New,
                ModelEvent::Changed(Some("age".to_string())),
                ModelEvent::Changed(Some("age".to_string())),
            ]
        );
    }

    #[test]
    fn handlers_can_register_listeners_while_running() {
        let listeners = Listeners::new();
        let registry = Rc::downgrade(&listeners);
        let late_calls = Rc::new(RefCell::new(0));

        let counter = late_calls.clone();
        listeners.on("new", move |_, _| {
            if let Some(listeners) = registry.upgrade() {
                let counter = counter.clone();
                listeners.on_any(move |_, _| *counter.borrow_mut() += 1);
            }
        });

        let model = Model::empty();
        listeners.trigger(&ModelEvent::New, &model);
        assert_eq!(listeners.len(), 2);
        assert_eq!(*late_calls.borrow(), 0);

        listeners.trigger(&ModelEvent::Changed(None), &model);
        assert_eq!(*late_calls.borrow(), 1);
    }
}
