//! Deferred completion handle returned by a persistence delegate.
//!
//! # Invariants
//! - A completion settles at most once; later resolve/reject calls are ignored.
//! - Callbacks registered after settlement run immediately.

use super::PersistError;
use std::cell::RefCell;
use std::future::Future;
use std::pin::Pin;
use std::rc::Rc;
use std::task::{Context, Poll, Waker};

type SettledCallback = Box<dyn FnOnce(&Result<(), PersistError>)>;

/// Observable state of a [`Completion`].
#[derive(Debug, Clone, PartialEq)]
pub enum CompletionState {
    Pending,
    Resolved,
    Rejected(PersistError),
}

struct Shared {
    state: CompletionState,
    callbacks: Vec<SettledCallback>,
    waker: Option<Waker>,
}

/// Handle the caller may inspect, subscribe to, or `.await`.
#[derive(Clone)]
pub struct Completion {
    shared: Rc<RefCell<Shared>>,
}

/// Write side of a pending [`Completion`].
pub struct Resolver {
    shared: Rc<RefCell<Shared>>,
}

impl Completion {
    /// Creates a pending completion and the resolver that settles it.
    pub fn pending() -> (Completion, Resolver) {
        let shared = Rc::new(RefCell::new(Shared {
            state: CompletionState::Pending,
            callbacks: Vec::new(),
            waker: None,
        }));
        (
            Completion {
                shared: shared.clone(),
            },
            Resolver { shared },
        )
    }

    pub fn resolved() -> Completion {
        let (completion, resolver) = Self::pending();
        resolver.resolve();
        completion
    }

    pub fn rejected(error: PersistError) -> Completion {
        let (completion, resolver) = Self::pending();
        resolver.reject(error);
        completion
    }

    pub fn state(&self) -> CompletionState {
        self.shared.borrow().state.clone()
    }

    pub fn is_pending(&self) -> bool {
        matches!(self.shared.borrow().state, CompletionState::Pending)
    }

    pub fn is_resolved(&self) -> bool {
        matches!(self.shared.borrow().state, CompletionState::Resolved)
    }

    pub fn is_rejected(&self) -> bool {
        matches!(self.shared.borrow().state, CompletionState::Rejected(_))
    }

    pub fn error(&self) -> Option<PersistError> {
        match &self.shared.borrow().state {
            CompletionState::Rejected(error) => Some(error.clone()),
            _ => None,
        }
    }

    /// Runs `callback` once the completion settles.
    pub fn on_settled(&self, callback: impl FnOnce(&Result<(), PersistError>) + 'static) {
        let outcome = {
            let mut shared = self.shared.borrow_mut();
            match &shared.state {
                CompletionState::Pending => {
                    shared.callbacks.push(Box::new(callback));
                    return;
                }
                CompletionState::Resolved => Ok(()),
                CompletionState::Rejected(error) => Err(error.clone()),
            }
        };
        callback(&outcome);
    }
}

impl Resolver {
    pub fn resolve(self) {
        self.settle(CompletionState::Resolved);
    }

    pub fn reject(self, error: PersistError) {
        self.settle(CompletionState::Rejected(error));
    }

    fn settle(self, state: CompletionState) {
        let (callbacks, waker, outcome) = {
            let mut shared = self.shared.borrow_mut();
            if shared.state != CompletionState::Pending {
                return;
            }
            let outcome = match &state {
                CompletionState::Rejected(error) => Err(error.clone()),
                _ => Ok(()),
            };
            shared.state = state;
            (
                std::mem::take(&mut shared.callbacks),
                shared.waker.take(),
                outcome,
            )
        };

        for callback in callbacks {
            callback(&outcome);
        }
        if let Some(waker) = waker {
            waker.wake();
        }
    }
}

impl Future for Completion {
    type Output = Result<(), PersistError>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let mut shared = self.shared.borrow_mut();
        match &shared.state {
            CompletionState::Pending => {
                shared.waker = Some(cx.waker().clone());
                Poll::Pending
            }
            CompletionState::Resolved => Poll::Ready(Ok(())),
            CompletionState::Rejected(error) => Poll::Ready(Err(error.clone())),
        }
    }
}

impl std::fmt::Debug for Completion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Completion")
            .field("state", &self.shared.borrow().state)
            .finish()
    }
}
