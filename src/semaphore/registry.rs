//! Waiter registry.
//!
//! This module owns live waiters and settles them. Registration is
//! synchronous and never blocks on the pipeline; notification happens from
//! the interceptor, in-line with dispatch.

use std::collections::HashMap;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crossbeam_channel::bounded;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, trace, warn};

use crate::action::Action;
use crate::error::SemaphoreResult;
use crate::pattern::{normalize, Pattern, Predicate};

use super::interceptor::Interceptor;
use super::outcome::Outcome;
use super::waiter::{Settlement, Verdict, Waiter, WaiterId, WaiterInfo, WakerSlot};

/// How dynamic (JSON) match specs are validated.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PatternPolicy {
    /// Malformed specs are treated as "no pattern supplied".
    #[default]
    Lenient,
    /// Malformed specs fail registration.
    Strict,
}

#[allow(missing_docs)]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SemaphoreConfig {
    /// Name attached to log records from this registry.
    pub name: String,
    /// Validation applied by `await_json`.
    pub pattern_policy: PatternPolicy,
    /// Contain panics raised by predicates during notification.
    pub catch_predicate_panics: bool,
}

impl Default for SemaphoreConfig {
    fn default() -> Self {
        Self {
            name: "semaphore".to_string(),
            pattern_policy: PatternPolicy::Lenient,
            catch_predicate_panics: true,
        }
    }
}

/// Point-in-time registry counters.
#[allow(missing_docs)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistryStats {
    pub registered: u64,
    pub resolved: u64,
    pub rejected: u64,
    pub cancelled: u64,
    pub actions_observed: u64,
    pub predicate_panics: u64,
}

#[derive(Debug, Default)]
struct Counters {
    registered: AtomicU64,
    resolved: AtomicU64,
    rejected: AtomicU64,
    cancelled: AtomicU64,
    actions_observed: AtomicU64,
    predicate_panics: AtomicU64,
}

pub(crate) struct RegistryInner<A: Action> {
    cfg: SemaphoreConfig,
    waiters: Mutex<HashMap<WaiterId, Arc<Waiter<A>>>>,
    counters: Counters,
}

impl<A: Action> std::fmt::Debug for RegistryInner<A> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegistryInner")
            .field("name", &self.cfg.name)
            .field("pending", &self.lock().len())
            .finish()
    }
}

impl<A: Action> RegistryInner<A> {
    // The lock is never held while user code runs, so poisoning cannot leave
    // the map half-updated.
    fn lock(&self) -> MutexGuard<'_, HashMap<WaiterId, Arc<Waiter<A>>>> {
        self.waiters.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn register(
        self: &Arc<Self>,
        resolve: Option<Pattern<A>>,
        reject: Option<Pattern<A>>,
        label: Option<String>,
    ) -> Outcome<A> {
        let resolve_on = normalize(resolve, Predicate::any());
        let reject_on = normalize(reject, Predicate::never());

        let (tx, rx) = bounded::<Settlement<A>>(1);
        let waker = Arc::new(WakerSlot::default());
        let waiter = Arc::new(Waiter::new(label, resolve_on, reject_on, tx, Arc::clone(&waker)));
        let id = waiter.id;

        debug!(
            registry = %self.cfg.name,
            waiter_id = %id,
            label = waiter.label.as_deref().unwrap_or(""),
            "semaphore registered"
        );

        self.lock().insert(id, waiter);
        self.counters.registered.fetch_add(1, Ordering::Relaxed);

        Outcome::new(id, rx, waker, Arc::downgrade(self))
    }

    /// Evaluates every waiter present at the start of the pass.
    pub(crate) fn notify(&self, action: &A) {
        self.counters.actions_observed.fetch_add(1, Ordering::Relaxed);

        let snapshot: Vec<Arc<Waiter<A>>> = self.lock().values().cloned().collect();
        trace!(
            registry = %self.cfg.name,
            action_type = action.action_type(),
            waiters = snapshot.len(),
            "semaphore notify pass"
        );

        for waiter in snapshot {
            // Settled earlier in this pass (e.g. cancelled by a continuation).
            if waiter.is_settled() {
                continue;
            }

            let Some(verdict) = self.evaluate(&waiter, action) else {
                continue;
            };

            match verdict {
                Verdict::Pending => {}
                Verdict::Resolve => {
                    self.settle(&waiter, Settlement::Resolved(action.clone()));
                }
                Verdict::Reject => {
                    self.settle(&waiter, Settlement::Rejected(action.clone()));
                }
            }
        }
    }

    fn evaluate(&self, waiter: &Waiter<A>, action: &A) -> Option<Verdict> {
        if !self.cfg.catch_predicate_panics {
            return Some(waiter.evaluate(action));
        }

        match panic::catch_unwind(AssertUnwindSafe(|| waiter.evaluate(action))) {
            Ok(verdict) => Some(verdict),
            Err(_) => {
                self.counters.predicate_panics.fetch_add(1, Ordering::Relaxed);
                warn!(
                    registry = %self.cfg.name,
                    waiter_id = %waiter.id,
                    action_type = action.action_type(),
                    "semaphore predicate panicked; treating as no match"
                );
                None
            }
        }
    }

    /// Settles a waiter at most once.
    ///
    /// The waiter leaves the registry before the outcome becomes observable.
    fn settle(&self, waiter: &Waiter<A>, settlement: Settlement<A>) -> bool {
        if !waiter.claim() {
            return false;
        }

        self.lock().remove(&waiter.id);

        let (counter, outcome) = match &settlement {
            Settlement::Resolved(_) => (&self.counters.resolved, "resolved"),
            Settlement::Rejected(_) => (&self.counters.rejected, "rejected"),
            Settlement::Cancelled => (&self.counters.cancelled, "cancelled"),
        };
        counter.fetch_add(1, Ordering::Relaxed);

        debug!(
            registry = %self.cfg.name,
            waiter_id = %waiter.id,
            label = waiter.label.as_deref().unwrap_or(""),
            outcome,
            "semaphore settled"
        );

        waiter.deliver(settlement);
        true
    }

    pub(crate) fn cancel(&self, id: WaiterId) -> bool {
        let waiter = self.lock().get(&id).cloned();
        match waiter {
            Some(w) => self.settle(&w, Settlement::Cancelled),
            None => false,
        }
    }
}

impl<A: Action> Drop for RegistryInner<A> {
    fn drop(&mut self) {
        // Drop each waiter (and its sender) before waking, so a woken task
        // observes a disconnected channel rather than an empty one.
        let waiters: Vec<Arc<Waiter<A>>> = self
            .waiters
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner)
            .drain()
            .map(|(_, w)| w)
            .collect();

        if !waiters.is_empty() {
            debug!(
                registry = %self.cfg.name,
                pending = waiters.len(),
                "semaphore registry dropped with pending waiters"
            );
        }

        for waiter in waiters {
            let waker = Arc::clone(&waiter.waker);
            drop(waiter);
            waker.wake();
        }
    }
}

/// Registry of pending waits over a stream of actions.
///
/// Cloning yields another handle to the same registry. Pair it with the
/// pipeline through [`install_interceptor`](Self::install_interceptor);
/// every action the interceptor sees is offered to each pending waiter
/// exactly once.
///
/// ```rust,ignore
/// let semaphores = SemaphoreRegistry::<JsonAction>::default();
/// let pipeline = Pipeline::new(|a: JsonAction| reducer(a))
///     .with_stage(semaphores.install_interceptor());
///
/// let login = semaphores.await_event_or_reject("LOGIN_OK", "LOGIN_FAIL");
/// pipeline.dispatch(JsonAction::new("LOGIN_OK"));
/// assert!(login.wait().is_ok());
/// ```
#[derive(Debug)]
pub struct SemaphoreRegistry<A: Action> {
    inner: Arc<RegistryInner<A>>,
}

impl<A: Action> Clone for SemaphoreRegistry<A> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<A: Action> Default for SemaphoreRegistry<A> {
    fn default() -> Self {
        Self::new(SemaphoreConfig::default())
    }
}

impl<A: Action> SemaphoreRegistry<A> {
    /// Creates an empty registry.
    #[must_use]
    pub fn new(cfg: SemaphoreConfig) -> Self {
        Self {
            inner: Arc::new(RegistryInner {
                cfg,
                waiters: Mutex::new(HashMap::new()),
                counters: Counters::default(),
            }),
        }
    }

    /// The configuration this registry was built with.
    #[must_use]
    pub fn config(&self) -> &SemaphoreConfig {
        &self.inner.cfg
    }

    /// Wait for the next action matching `resolve`.
    ///
    /// Only actions dispatched after this call are considered.
    pub fn await_event(&self, resolve: impl Into<Pattern<A>>) -> Outcome<A> {
        self.inner.register(Some(resolve.into()), None, None)
    }

    /// Wait for the next action matching `resolve`, failing on `reject`.
    ///
    /// Reject is checked first: an action matching both patterns rejects.
    pub fn await_event_or_reject(
        &self,
        resolve: impl Into<Pattern<A>>,
        reject: impl Into<Pattern<A>>,
    ) -> Outcome<A> {
        self.inner.register(Some(resolve.into()), Some(reject.into()), None)
    }

    /// Wait using dynamic JSON match specs (string or array of strings).
    ///
    /// Under [`PatternPolicy::Lenient`] any other value means "not supplied"
    /// and the default applies (resolve on anything, never reject). Under
    /// [`PatternPolicy::Strict`] such values are a validation error.
    pub fn await_json(
        &self,
        resolve: &Value,
        reject: Option<&Value>,
    ) -> SemaphoreResult<Outcome<A>> {
        let (resolve, reject) = match self.inner.cfg.pattern_policy {
            PatternPolicy::Lenient => (
                Pattern::<A>::from_json(resolve),
                reject.and_then(Pattern::<A>::from_json),
            ),
            PatternPolicy::Strict => (
                Pattern::<A>::from_json_strict(resolve)?,
                reject.map(Pattern::<A>::from_json_strict).transpose()?.flatten(),
            ),
        };
        Ok(self.inner.register(resolve, reject, None))
    }

    /// Start building a wait with optional reject pattern and label.
    #[must_use]
    pub fn builder(&self) -> WaitBuilder<'_, A> {
        WaitBuilder {
            registry: self,
            resolve: None,
            reject: None,
            label: None,
        }
    }

    /// Pipeline stage that feeds every action to this registry.
    #[must_use]
    pub fn install_interceptor(&self) -> Interceptor<A> {
        Interceptor::new(Arc::clone(&self.inner))
    }

    /// Number of pending waiters.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.lock().len()
    }

    /// Returns true if no waiter is pending.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.lock().is_empty()
    }

    /// Snapshot of pending waiters.
    #[must_use]
    pub fn pending(&self) -> Vec<WaiterInfo> {
        let mut out: Vec<WaiterInfo> = self.inner.lock().values().map(|w| w.info()).collect();
        out.sort_by_key(|info| info.registered_at);
        out
    }

    /// Current counters.
    #[must_use]
    pub fn stats(&self) -> RegistryStats {
        let c = &self.inner.counters;
        RegistryStats {
            registered: c.registered.load(Ordering::Relaxed),
            resolved: c.resolved.load(Ordering::Relaxed),
            rejected: c.rejected.load(Ordering::Relaxed),
            cancelled: c.cancelled.load(Ordering::Relaxed),
            actions_observed: c.actions_observed.load(Ordering::Relaxed),
            predicate_panics: c.predicate_panics.load(Ordering::Relaxed),
        }
    }

    /// Cancel a pending wait by id. Returns false if it was not pending.
    pub fn cancel(&self, id: WaiterId) -> bool {
        self.inner.cancel(id)
    }
}

/// Builder for a labelled wait.
#[derive(Debug)]
pub struct WaitBuilder<'a, A: Action> {
    registry: &'a SemaphoreRegistry<A>,
    resolve: Option<Pattern<A>>,
    reject: Option<Pattern<A>>,
    label: Option<String>,
}

impl<A: Action> WaitBuilder<'_, A> {
    /// Resolve on actions matching `pattern`. Defaults to any action.
    #[must_use]
    pub fn resolve_on(mut self, pattern: impl Into<Pattern<A>>) -> Self {
        self.resolve = Some(pattern.into());
        self
    }

    /// Reject on actions matching `pattern`. Defaults to none.
    #[must_use]
    pub fn reject_on(mut self, pattern: impl Into<Pattern<A>>) -> Self {
        self.reject = Some(pattern.into());
        self
    }

    /// Label shown in logs and [`SemaphoreRegistry::pending`].
    #[must_use]
    pub fn label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// Register the wait.
    pub fn register(self) -> Outcome<A> {
        self.registry.inner.register(self.resolve, self.reject, self.label)
    }
}
