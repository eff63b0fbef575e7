//! Semaphores: awaitable rendezvous with the action stream.
//!
//! A caller registers a wait with resolve and reject patterns and gets an
//! [`Outcome`] back. The [`Interceptor`] installed in the dispatch pipeline
//! offers each action to every pending waiter, settling the ones it matches,
//! before passing the action on untouched.

/// Pipeline stage feeding actions to waiters.
pub mod interceptor;
/// Awaitable outcome handle.
pub mod outcome;
/// Waiter storage, settlement and configuration.
pub mod registry;
/// Waiter records and identifiers.
pub mod waiter;

pub use interceptor::Interceptor;
pub use outcome::Outcome;
pub use registry::{PatternPolicy, RegistryStats, SemaphoreConfig, SemaphoreRegistry, WaitBuilder};
pub use waiter::{WaiterId, WaiterInfo};
