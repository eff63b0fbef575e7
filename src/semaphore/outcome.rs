use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Weak};
use std::task::{Context, Poll};
use std::time::Duration;

use crossbeam_channel::{Receiver, RecvTimeoutError, TryRecvError};

use crate::action::Action;
use crate::error::WaitError;

use super::registry::RegistryInner;
use super::waiter::{Settlement, WaiterId, WakerSlot};

/// Handle to the pending result of a wait.
///
/// Resolves with the matching action, or fails with [`WaitError::Rejected`]
/// carrying the rejecting action. Can be awaited or blocked on.
///
/// Dropping an unsettled handle cancels the wait.
#[derive(Debug)]
pub struct Outcome<A: Action> {
    id: WaiterId,
    rx: Receiver<Settlement<A>>,
    waker: Arc<WakerSlot>,
    registry: Weak<RegistryInner<A>>,
    taken: bool,
}

impl<A: Action> Outcome<A> {
    pub(crate) fn new(
        id: WaiterId,
        rx: Receiver<Settlement<A>>,
        waker: Arc<WakerSlot>,
        registry: Weak<RegistryInner<A>>,
    ) -> Self {
        Self {
            id,
            rx,
            waker,
            registry,
            taken: false,
        }
    }

    /// The waiter id backing this handle.
    #[must_use]
    pub const fn id(&self) -> WaiterId {
        self.id
    }

    /// Block until the wait settles.
    pub fn wait(mut self) -> Result<A, WaitError<A>> {
        let res = self.rx.recv();
        self.taken = true;
        match res {
            Ok(settlement) => into_result(settlement),
            Err(_) => Err(WaitError::Closed),
        }
    }

    /// Block until the wait settles or the timeout elapses.
    ///
    /// A timeout leaves the waiter registered; the call can be repeated.
    pub fn wait_timeout(&mut self, timeout: Duration) -> Result<A, WaitError<A>> {
        match self.rx.recv_timeout(timeout) {
            Ok(settlement) => {
                self.taken = true;
                into_result(settlement)
            }
            Err(RecvTimeoutError::Timeout) => Err(WaitError::Timeout {
                duration_ms: timeout.as_millis().min(u128::from(u64::MAX)) as u64,
            }),
            Err(RecvTimeoutError::Disconnected) => {
                self.taken = true;
                Err(WaitError::Closed)
            }
        }
    }

    /// Non-blocking check. `None` while the wait is still pending.
    pub fn try_outcome(&mut self) -> Option<Result<A, WaitError<A>>> {
        match self.rx.try_recv() {
            Ok(settlement) => {
                self.taken = true;
                Some(into_result(settlement))
            }
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Disconnected) => {
                self.taken = true;
                Some(Err(WaitError::Closed))
            }
        }
    }

    /// Cancel the wait.
    ///
    /// Idempotent; a no-op if the wait already settled. A subsequent
    /// `wait` yields [`WaitError::Cancelled`].
    pub fn cancel(&self) {
        if let Some(registry) = self.registry.upgrade() {
            registry.cancel(self.id);
        }
    }
}

// `Receiver<T>` is only `Unpin` when `T` is. Nothing here is structurally
// pinned; the action only lives inside the channel.
impl<A: Action> Unpin for Outcome<A> {}

impl<A: Action> Future for Outcome<A> {
    type Output = Result<A, WaitError<A>>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.get_mut();
        if let Some(res) = this.try_outcome() {
            return Poll::Ready(res);
        }

        // Register before re-checking so a settlement racing with this poll
        // either lands in the channel or finds the waker.
        this.waker.register(cx.waker());
        match this.try_outcome() {
            Some(res) => Poll::Ready(res),
            None => Poll::Pending,
        }
    }
}

impl<A: Action> Drop for Outcome<A> {
    fn drop(&mut self) {
        if !self.taken {
            self.cancel();
        }
    }
}

fn into_result<A: Action>(settlement: Settlement<A>) -> Result<A, WaitError<A>> {
    match settlement {
        Settlement::Resolved(action) => Ok(action),
        Settlement::Rejected(action) => Err(WaitError::Rejected(action)),
        Settlement::Cancelled => Err(WaitError::Cancelled),
    }
}
