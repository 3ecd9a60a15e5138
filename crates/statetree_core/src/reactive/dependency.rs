//! Observer registration primitives.
//!
//! A [`Computation`] is the observer: while it runs, every
//! [`Dependency::depend`] call registers it. [`Dependency::changed`]
//! invalidates each registered computation once and forgets it, so the
//! observer has to run again to re-subscribe.

use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

type InvalidateCallback = Rc<dyn Fn()>;

thread_local! {
    static ACTIVE: RefCell<Vec<Computation>> = const { RefCell::new(Vec::new()) };
}

struct ComputationInner {
    invalidated: Cell<bool>,
    stopped: Cell<bool>,
    invalidations: Cell<usize>,
    callbacks: RefCell<Vec<InvalidateCallback>>,
}

/// Observer that collects dependencies while it runs.
#[derive(Clone)]
pub struct Computation {
    inner: Rc<ComputationInner>,
}

struct ActiveGuard;

impl Drop for ActiveGuard {
    fn drop(&mut self) {
        let _ = ACTIVE.try_with(|active| active.borrow_mut().pop());
    }
}

impl Computation {
    pub fn new() -> Self {
        Self {
            inner: Rc::new(ComputationInner {
                invalidated: Cell::new(false),
                stopped: Cell::new(false),
                invalidations: Cell::new(0),
                callbacks: RefCell::new(Vec::new()),
            }),
        }
    }

    /// Innermost computation currently running on this thread.
    pub fn current() -> Option<Self> {
        ACTIVE.with(|active| active.borrow().last().cloned())
    }

    /// Runs `f` with this computation active and clears its invalidated flag.
    pub fn run<R>(&self, f: impl FnOnce() -> R) -> R {
        self.inner.invalidated.set(false);
        ACTIVE.with(|active| active.borrow_mut().push(self.clone()));
        let _guard = ActiveGuard;
        f()
    }

    /// Registers a callback invoked on every invalidation.
    pub fn on_invalidate(&self, callback: impl Fn() + 'static) {
        self.inner.callbacks.borrow_mut().push(Rc::new(callback));
    }

    /// Marks the computation stale. Repeated calls before the next run are ignored.
    pub fn invalidate(&self) {
        if self.inner.stopped.get() || self.inner.invalidated.replace(true) {
            return;
        }
        self.inner
            .invalidations
            .set(self.inner.invalidations.get() + 1);

        let callbacks = self.inner.callbacks.borrow().clone();
        for callback in callbacks {
            callback();
        }
    }

    /// Stops reacting to invalidations permanently.
    pub fn stop(&self) {
        self.inner.stopped.set(true);
    }

    pub fn is_invalidated(&self) -> bool {
        self.inner.invalidated.get()
    }

    pub fn is_stopped(&self) -> bool {
        self.inner.stopped.get()
    }

    /// Number of invalidations delivered since creation.
    pub fn invalidation_count(&self) -> usize {
        self.inner.invalidations.get()
    }
}

impl Default for Computation {
    fn default() -> Self {
        Self::new()
    }
}

/// Observer-registration object for one observable value.
#[derive(Clone, Default)]
pub struct Dependency {
    dependents: Rc<RefCell<Vec<Weak<ComputationInner>>>>,
}

impl Dependency {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers the running computation, if any.
    ///
    /// Returns `true` when a computation was active.
    pub fn depend(&self) -> bool {
        let Some(computation) = Computation::current() else {
            return false;
        };

        let mut dependents = self.dependents.borrow_mut();
        dependents.retain(|dependent| dependent.strong_count() > 0);
        let target = Rc::as_ptr(&computation.inner);
        if !dependents
            .iter()
            .any(|dependent| dependent.as_ptr() == target)
        {
            dependents.push(Rc::downgrade(&computation.inner));
        }
        true
    }

    /// Invalidates and forgets every registered computation.
    pub fn changed(&self) {
        let dependents = std::mem::take(&mut *self.dependents.borrow_mut());
        for dependent in dependents {
            if let Some(inner) = dependent.upgrade() {
                Computation { inner }.invalidate();
            }
        }
    }

    /// Number of live registered computations.
    pub fn dependent_count(&self) -> usize {
        self.dependents
            .borrow()
            .iter()
            .filter(|dependent| dependent.strong_count() > 0)
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::{Computation, Dependency};
    use std::cell::Cell;
    use std::rc::Rc;

    #[test]
    fn depend_outside_computation_registers_nothing() {
        let dep = Dependency::new();
        assert!(!dep.depend());
        assert_eq!(dep.dependent_count(), 0);
    }

    #[test]
    fn changed_invalidates_once_and_requires_rerun() {
        let dep = Dependency::new();
        let computation = Computation::new();

        computation.run(|| {
            dep.depend();
            dep.depend();
        });
        assert_eq!(dep.dependent_count(), 1);

        dep.changed();
        dep.changed();
        assert!(computation.is_invalidated());
        assert_eq!(computation.invalidation_count(), 1);
        assert_eq!(dep.dependent_count(), 0);

        computation.run(|| dep.depend());
        assert!(!computation.is_invalidated());
        dep.changed();
        assert_eq!(computation.invalidation_count(), 2);
    }

    #[test]
    fn callbacks_fire_on_invalidate() {
        let dep = Dependency::new();
        let computation = Computation::new();
        let hits = Rc::new(Cell::new(0));
        let counter = hits.clone();
        computation.on_invalidate(move || counter.set(counter.get() + 1));

        computation.run(|| dep.depend());
        dep.changed();

        assert_eq!(hits.get(), 1);
    }

    #[test]
    fn stopped_computation_ignores_changes() {
        let dep = Dependency::new();
        let computation = Computation::new();
        computation.run(|| dep.depend());
        computation.stop();

        dep.changed();

        assert!(computation.is_stopped());
        assert_eq!(computation.invalidation_count(), 0);
    }

    #[test]
    fn nested_runs_register_innermost_only() {
        let dep = Dependency::new();
        let outer = Computation::new();
        let inner = Computation::new();

        outer.run(|| {
            inner.run(|| dep.depend());
            assert!(Computation::current().is_some());
        });
        assert!(Computation::current().is_none());

        dep.changed();
        assert!(inner.is_invalidated());
        assert!(!outer.is_invalidated());
    }

    #[test]
    fn dropped_computation_is_pruned() {
        let dep = Dependency::new();
        {
            let computation = Computation::new();
            computation.run(|| dep.depend());
        }
        assert_eq!(dep.dependent_count(), 0);
    }
}
