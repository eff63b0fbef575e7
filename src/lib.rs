//! # action-semaphore
//!
//! Await the next action in a dispatch pipeline that matches a pattern.
//!
//! A [`SemaphoreRegistry`] tracks pending waits. Its [`Interceptor`] is
//! installed as a stage in the host's dispatch pipeline: every action is
//! offered to all pending waiters, exactly once and in dispatch order, and
//! then forwarded downstream unchanged.
//!
//! ## Core Concepts
//!
//! - **Action**: a record with a `type` discriminant ([`Action`], [`JsonAction`])
//! - **Pattern**: an exact type, a set of types, or a predicate ([`Pattern`])
//! - **Outcome**: the awaitable result of a wait ([`Outcome`])
//! - **Precedence**: reject patterns are checked before resolve patterns
//!
//! ## Usage
//!
//! ```rust,ignore
//! use action_semaphore::{JsonAction, Pipeline, SemaphoreRegistry};
//!
//! let semaphores = SemaphoreRegistry::<JsonAction>::default();
//! let pipeline = Pipeline::new(|action: JsonAction| action.action_type.len())
//!     .with_stage(semaphores.install_interceptor());
//!
//! let login = semaphores.await_event_or_reject("LOGIN_OK", "LOGIN_FAIL");
//! pipeline.dispatch(JsonAction::new("LOGIN_FAIL"));
//!
//! let err = login.wait().unwrap_err();
//! assert_eq!(err.rejected_action().unwrap().action_type, "LOGIN_FAIL");
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod action;
pub mod error;
pub mod pattern;
pub mod pipeline;
pub mod semaphore;

// Re-export primary types at crate root for convenience
pub use action::{Action, JsonAction};
pub use error::{SemaphoreError, SemaphoreResult, ValidationError, WaitError};
pub use pattern::{normalize, Pattern, Predicate};
pub use pipeline::{middleware_fn, FnMiddleware, Middleware, Next, Pipeline};
pub use semaphore::{
    Interceptor, Outcome, PatternPolicy, RegistryStats, SemaphoreConfig, SemaphoreRegistry,
    WaitBuilder, WaiterId, WaiterInfo,
};
