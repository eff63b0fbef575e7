use std::sync::Arc;

use crate::action::Action;
use crate::pipeline::{Middleware, Next};

use super::registry::RegistryInner;

/// Pipeline stage that offers every action to the registry's waiters.
///
/// Purely observational: the action reaches the next stage unchanged, and
/// the next stage's result is returned as-is. All waiters are notified
/// before the action is forwarded.
#[derive(Debug)]
pub struct Interceptor<A: Action> {
    registry: Arc<RegistryInner<A>>,
}

impl<A: Action> Clone for Interceptor<A> {
    fn clone(&self) -> Self {
        Self {
            registry: Arc::clone(&self.registry),
        }
    }
}

impl<A: Action> Interceptor<A> {
    pub(crate) fn new(registry: Arc<RegistryInner<A>>) -> Self {
        Self { registry }
    }

    /// Notify waiters without forwarding, for hosts that drive their own chain.
    pub fn notify(&self, action: &A) {
        self.registry.notify(action);
    }

    /// Notify waiters, then hand the action to `next` and return its result.
    pub fn intercept<R, F>(&self, action: A, next: F) -> R
    where
        F: FnOnce(A) -> R,
    {
        self.registry.notify(&action);
        next(action)
    }
}

impl<A: Action, R> Middleware<A, R> for Interceptor<A> {
    fn handle(&self, action: A, next: Next<'_, A, R>) -> R {
        self.registry.notify(&action);
        next.run(action)
    }
}
