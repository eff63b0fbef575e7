//! Waiter records and their identifiers.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::task::Waker;

use chrono::{DateTime, Utc};
use crossbeam_channel::Sender;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::action::Action;
use crate::pattern::Predicate;

/// Unique identifier for a waiter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WaiterId(Uuid);

impl WaiterId {
    /// Create a new random waiter id.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for WaiterId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for WaiterId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Diagnostic view of a pending waiter.
#[allow(missing_docs)]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WaiterInfo {
    pub id: WaiterId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    pub registered_at: DateTime<Utc>,
}

/// Terminal state delivered to an outcome handle.
#[derive(Debug)]
pub(crate) enum Settlement<A> {
    Resolved(A),
    Rejected(A),
    Cancelled,
}

/// Result of evaluating one waiter against one action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Verdict {
    Pending,
    Resolve,
    Reject,
}

/// Waker storage shared between a waiter and its outcome handle.
#[derive(Debug, Default)]
pub(crate) struct WakerSlot(Mutex<Option<Waker>>);

impl WakerSlot {
    pub(crate) fn register(&self, waker: &Waker) {
        let mut slot = self.0.lock().unwrap_or_else(PoisonError::into_inner);
        match slot.as_ref() {
            Some(existing) if existing.will_wake(waker) => {}
            _ => *slot = Some(waker.clone()),
        }
    }

    pub(crate) fn wake(&self) {
        let waker = self.0.lock().unwrap_or_else(PoisonError::into_inner).take();
        if let Some(waker) = waker {
            waker.wake();
        }
    }
}

/// One outstanding wait.
///
/// The registry owns the only long-lived reference; notify passes hold
/// short-lived clones from their snapshot.
pub(crate) struct Waiter<A> {
    pub(crate) id: WaiterId,
    pub(crate) label: Option<String>,
    pub(crate) registered_at: DateTime<Utc>,
    resolve_on: Predicate<A>,
    reject_on: Predicate<A>,
    settled: AtomicBool,
    tx: Sender<Settlement<A>>,
    pub(crate) waker: Arc<WakerSlot>,
}

impl<A: Action> Waiter<A> {
    pub(crate) fn new(
        label: Option<String>,
        resolve_on: Predicate<A>,
        reject_on: Predicate<A>,
        tx: Sender<Settlement<A>>,
        waker: Arc<WakerSlot>,
    ) -> Self {
        Self {
            id: WaiterId::new(),
            label,
            registered_at: Utc::now(),
            resolve_on,
            reject_on,
            settled: AtomicBool::new(false),
            tx,
            waker,
        }
    }

    /// Reject is consulted before resolve: an action matching both rejects.
    pub(crate) fn evaluate(&self, action: &A) -> Verdict {
        if self.reject_on.matches(action) {
            Verdict::Reject
        } else if self.resolve_on.matches(action) {
            Verdict::Resolve
        } else {
            Verdict::Pending
        }
    }

    pub(crate) fn is_settled(&self) -> bool {
        self.settled.load(Ordering::Acquire)
    }

    /// Claims the single settlement. Returns false if already settled.
    pub(crate) fn claim(&self) -> bool {
        !self.settled.swap(true, Ordering::AcqRel)
    }

    /// Publishes the settlement to the outcome handle.
    ///
    /// Must only be called by the thread that won `claim`.
    pub(crate) fn deliver(&self, settlement: Settlement<A>) {
        // Capacity 1 and a single winner: this cannot be full. A dropped
        // outcome handle just discards the value.
        let _ = self.tx.try_send(settlement);
        self.waker.wake();
    }

    pub(crate) fn info(&self) -> WaiterInfo {
        WaiterInfo {
            id: self.id,
            label: self.label.clone(),
            registered_at: self.registered_at,
        }
    }
}
