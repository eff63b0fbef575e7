use std::marker::PhantomPinned;
use std::sync::Arc;
use std::time::Duration;

use action_semaphore::{Action, JsonAction, Pipeline, SemaphoreRegistry, WaitError};

fn act(t: &str) -> JsonAction {
    JsonAction::new(t)
}

/// An action type that is not `Unpin`.
#[derive(Debug, Clone)]
struct Pinned {
    kind: &'static str,
    _pin: PhantomPinned,
}

impl Pinned {
    const fn new(kind: &'static str) -> Self {
        Self {
            kind,
            _pin: PhantomPinned,
        }
    }
}

impl Action for Pinned {
    fn action_type(&self) -> &str {
        self.kind
    }
}

fn assert_unpin<T: Unpin>(_: &T) {}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn outcome_can_be_awaited() {
    let semaphores = SemaphoreRegistry::<JsonAction>::default();
    let pipeline =
        Arc::new(Pipeline::new(|_: JsonAction| ()).with_stage(semaphores.install_interceptor()));

    let wait = semaphores.await_event_or_reject("LOGIN_OK", "LOGIN_FAIL");

    let p = Arc::clone(&pipeline);
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(10)).await;
        p.dispatch(act("NOISE"));
        p.dispatch(act("LOGIN_OK").with("user", "ada"));
    });

    let action = wait.await.unwrap();
    assert_eq!(action.action_type, "LOGIN_OK");
    assert!(semaphores.is_empty());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn awaited_rejection_carries_action() {
    let semaphores = SemaphoreRegistry::<JsonAction>::default();
    let interceptor = semaphores.install_interceptor();

    let wait = semaphores.await_event_or_reject("LOGIN_OK", "LOGIN_FAIL");
    let handle = tokio::spawn(wait);

    tokio::task::yield_now().await;
    interceptor.notify(&act("LOGIN_FAIL"));

    let err = handle.await.unwrap().unwrap_err();
    assert_eq!(err, WaitError::Rejected(act("LOGIN_FAIL")));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn many_tasks_await_one_action() {
    let semaphores = SemaphoreRegistry::<JsonAction>::default();
    let interceptor = semaphores.install_interceptor();

    let handles: Vec<_> = (0..16)
        .map(|_| tokio::spawn(semaphores.await_event("GO")))
        .collect();

    tokio::time::sleep(Duration::from_millis(10)).await;
    interceptor.notify(&act("GO"));

    for h in handles {
        assert_eq!(h.await.unwrap().unwrap(), act("GO"));
    }
    assert_eq!(semaphores.stats().resolved, 16);
}

#[tokio::test]
async fn dropping_registry_wakes_pending_task() {
    let semaphores = SemaphoreRegistry::<JsonAction>::default();
    let wait = semaphores.await_event("NEVER");
    let handle = tokio::spawn(wait);

    tokio::task::yield_now().await;
    drop(semaphores);

    assert_eq!(handle.await.unwrap().unwrap_err(), WaitError::Closed);
}

#[tokio::test]
async fn cancelled_wait_resolves_to_cancelled() {
    let semaphores = SemaphoreRegistry::<JsonAction>::default();
    let wait = semaphores.await_event("NEVER");
    let id = wait.id();

    assert!(semaphores.cancel(id));
    assert_eq!(wait.await.unwrap_err(), WaitError::Cancelled);
}

#[tokio::test]
async fn timed_out_future_cancels_waiter() {
    let semaphores = SemaphoreRegistry::<JsonAction>::default();
    let wait = semaphores.await_event("NEVER");

    let res = tokio::time::timeout(Duration::from_millis(10), wait).await;
    assert!(res.is_err());
    assert!(semaphores.is_empty());
    assert_eq!(semaphores.stats().cancelled, 1);
}

#[tokio::test]
async fn outcome_of_pinned_action_is_awaitable() {
    let semaphores = SemaphoreRegistry::<Pinned>::default();
    let interceptor = semaphores.install_interceptor();

    let wait = semaphores.await_event("READY");
    assert_unpin(&wait);
    let handle = tokio::spawn(wait);

    tokio::task::yield_now().await;
    interceptor.notify(&Pinned::new("READY"));

    assert_eq!(handle.await.unwrap().unwrap().kind, "READY");
}
