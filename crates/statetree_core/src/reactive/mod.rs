//! Reactive primitives shared by models and collections.
//!
//! # Responsibility
//! - Track which computations observe which values.
//! - Defer aggregate notifications to the end of a cooperative tick.
//!
//! # Invariants
//! - All primitives are single-threaded (`Rc`-based) and thread-local.

pub mod dependency;
pub mod registry;
pub mod tick;

pub use dependency::{Computation, Dependency};
pub use registry::DependencyRegistry;
