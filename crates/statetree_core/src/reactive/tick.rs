//! Cooperative tick used to defer notifications.
//!
//! # Responsibility
//! - Queue deferred actions while a [`batch`] is open.
//! - Run queued actions when the outermost batch closes.
//!
//! # Invariants
//! - Outside a batch, [`defer`] runs its action synchronously.
//! - Actions queued before an unwind stay queued until the next batch closes.

use std::cell::RefCell;
use std::collections::VecDeque;

type Deferred = Box<dyn FnOnce()>;

#[derive(Default)]
struct TickState {
    depth: usize,
    queue: VecDeque<Deferred>,
}

thread_local! {
    static TICK: RefCell<TickState> = RefCell::new(TickState::default());
}

struct BatchGuard;

impl Drop for BatchGuard {
    fn drop(&mut self) {
        let outermost = TICK.with(|tick| {
            let mut tick = tick.borrow_mut();
            tick.depth = tick.depth.saturating_sub(1);
            tick.depth == 0
        });
        if outermost && !std::thread::panicking() {
            flush();
        }
    }
}

/// Runs `f` as one tick; deferred work executes after it returns.
pub fn batch<R>(f: impl FnOnce() -> R) -> R {
    TICK.with(|tick| tick.borrow_mut().depth += 1);
    let guard = BatchGuard;
    let result = f();
    drop(guard);
    result
}

/// Schedules `action` for the end of the current tick.
pub fn defer(action: impl FnOnce() + 'static) {
    let action: Deferred = Box::new(action);
    let immediate = TICK.with(|tick| {
        let mut tick = tick.borrow_mut();
        if tick.depth > 0 {
            tick.queue.push_back(action);
            None
        } else {
            Some(action)
        }
    });
    if let Some(action) = immediate {
        action();
    }
}

/// Returns whether a batch is open on this thread.
pub fn in_batch() -> bool {
    TICK.with(|tick| tick.borrow().depth > 0)
}

/// Number of queued actions.
pub fn pending() -> usize {
    TICK.with(|tick| tick.borrow().queue.len())
}

fn flush() {
    loop {
        let next = TICK.with(|tick| tick.borrow_mut().queue.pop_front());
        match next {
            Some(action) => action(),
            None => break,
        }
    }
}
