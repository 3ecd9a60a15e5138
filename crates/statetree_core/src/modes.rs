//! Scoped execution modes that suppress parts of the commit protocol.
//!
//! # Responsibility
//! - Provide `no-validate`, `no-save` and `no-change-tracking` flags.
//! - Scope every flag to a callback and restore the stack on every exit path.
//!
//! # Invariants
//! - The stack is per thread; a model graph is driven from one thread.
//! - Leaving a scope (return or unwind) truncates the stack to its depth on entry.

use std::cell::RefCell;

/// Flag pushed for the duration of one [`run_in_mode`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Mode {
    /// Field writes skip the commit protocol (used for batched assignment).
    NoValidate,
    /// Successful commits skip the persistence delegate.
    NoSave,
    /// Field writes are not recorded in the change log.
    NoChangeTracking,
}

impl Mode {
    /// Stable id used in log events.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::NoValidate => "no_validate",
            Self::NoSave => "no_save",
            Self::NoChangeTracking => "no_change_tracking",
        }
    }
}

thread_local! {
    static ACTIVE_MODES: RefCell<Vec<Mode>> = const { RefCell::new(Vec::new()) };
}

struct ModeGuard {
    depth: usize,
}

impl Drop for ModeGuard {
    fn drop(&mut self) {
        let _ = ACTIVE_MODES.try_with(|modes| modes.borrow_mut().truncate(self.depth));
    }
}

/// Runs `f` with `mode` active.
///
/// The mode is popped when `f` returns or unwinds, so a failing callback
/// never leaves the stack imbalanced.
pub fn run_in_mode<R>(mode: Mode, f: impl FnOnce() -> R) -> R {
    let depth = ACTIVE_MODES.with(|modes| {
        let mut modes = modes.borrow_mut();
        let depth = modes.len();
        modes.push(mode);
        depth
    });
    let _guard = ModeGuard { depth };
    f()
}

/// Returns whether `mode` is active anywhere on the current stack.
pub fn in_mode(mode: Mode) -> bool {
    ACTIVE_MODES.with(|modes| modes.borrow().contains(&mode))
}

/// Returns the active modes, innermost last.
pub fn active_modes() -> Vec<Mode> {
    ACTIVE_MODES.with(|modes| modes.borrow().clone())
}
