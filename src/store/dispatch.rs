use crate::error::StoreError;
use futures::channel::oneshot;
use futures::future::LocalBoxFuture;
use futures::stream::{FuturesUnordered, StreamExt};
use futures::task::{waker, ArcWake, LocalSpawn, LocalSpawnExt, SpawnError};
use std::cell::RefCell;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::rc::{Rc, Weak};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::task::{Context, Poll};
use tracing::warn;

type Task = LocalBoxFuture<'static, ()>;

/// Store-owned set of running actions.
///
/// Unlike a `LocalPool` it never enters an executor of its own, so it can be
/// driven from `dispatch`, from `Store::run_pending` or from whatever executor
/// is awaiting a [`Dispatched`] handle.
#[derive(Default)]
pub(crate) struct ActionQueue {
    running: RefCell<FuturesUnordered<Task>>,
    incoming: RefCell<Vec<Task>>,
}

impl ActionQueue {
    fn push(&self, task: Task) {
        self.incoming.borrow_mut().push(task);
    }

    /// Poll every runnable action, picking up actions spawned meanwhile.
    ///
    /// `Ready` once no action is left. Re-entrant calls return `Pending`
    /// right away: the outer poll drains what they queued.
    fn poll(&self, cx: &mut Context<'_>) -> Poll<()> {
        let Ok(mut running) = self.running.try_borrow_mut() else {
            return Poll::Pending;
        };
        loop {
            running.extend(self.incoming.borrow_mut().drain(..));
            let polled = running.poll_next_unpin(cx);

            if !self.incoming.borrow().is_empty() {
                continue;
            }
            match polled {
                Poll::Ready(Some(())) => continue,
                Poll::Ready(None) => return Poll::Ready(()),
                Poll::Pending => return Poll::Pending,
            }
        }
    }

    /// Poll until no action can make progress without outside input.
    fn run_until_stalled(&self) {
        let woken = Arc::new(Woken::default());
        let waker = waker(Arc::clone(&woken));
        let mut cx = Context::from_waker(&waker);

        while self.poll(&mut cx).is_pending() {
            if !woken.0.swap(false, Ordering::Acquire) {
                break;
            }
        }
    }
}

/// Records wake-ups that happen while the queue is being polled.
#[derive(Default)]
struct Woken(AtomicBool);

impl ArcWake for Woken {
    fn wake_by_ref(arc_self: &Arc<Self>) {
        arc_self.0.store(true, Ordering::Release);
    }
}

/// Where a store runs its actions.
pub(crate) enum Executor {
    /// Store-owned queue, driven by `dispatch`, `Store::run_pending` and
    /// awaited handles.
    Owned(Rc<ActionQueue>),
    /// Host event loop; the host drives it.
    Host(Rc<dyn LocalSpawn>),
}

impl Executor {
    pub(crate) fn owned() -> Self {
        Self::Owned(Rc::default())
    }

    /// Whether an action spawned now would be accepted.
    pub(crate) fn status(&self) -> Result<(), SpawnError> {
        match self {
            Self::Owned(_) => Ok(()),
            Self::Host(spawner) => spawner.status_local(),
        }
    }

    pub(crate) fn spawn(&self, task: Task) -> Result<(), SpawnError> {
        match self {
            Self::Owned(queue) => {
                queue.push(task);
                Ok(())
            }
            Self::Host(spawner) => spawner.spawn_local(task),
        }
    }

    /// Poll owned actions until none can make progress.
    ///
    /// No-op when already running further up the stack: the outer run picks
    /// up newly spawned actions.
    pub(crate) fn run_until_stalled(&self) {
        if let Self::Owned(queue) = self {
            queue.run_until_stalled();
        }
    }

    /// The queue an awaited handle should drive, if the store owns one.
    fn driver(&self) -> Option<Weak<ActionQueue>> {
        match self {
            Self::Owned(queue) => Some(Rc::downgrade(queue)),
            Self::Host(_) => None,
        }
    }
}

/// Completion handle of a dispatched action.
///
/// Dropping the handle does not cancel the action: dispatch stays
/// fire-and-forget unless the caller awaits the handle, which resolves to the
/// action's result. Failures of actions nobody awaits are logged.
///
/// Awaiting the handle from any executor also drives the store's own
/// actions, so an action suspended inside `dispatch` resumes without a call
/// to `Store::run_pending`.
pub struct Dispatched {
    name: String,
    outcome: oneshot::Receiver<anyhow::Result<()>>,
    driver: Option<Weak<ActionQueue>>,
}

impl Dispatched {
    /// Wrap an action future so its outcome reaches the returned handle.
    pub(crate) fn track(
        name: &str,
        action: LocalBoxFuture<'static, anyhow::Result<()>>,
        executor: &Executor,
    ) -> (Self, Task) {
        let (tx, rx) = oneshot::channel();
        let action_name = name.to_owned();
        let task = Box::pin(async move {
            let outcome = action.await;
            if let Err(Err(err)) = tx.send(outcome) {
                warn!(action = %action_name, error = %err, "action failed");
            }
        });

        let handle = Self {
            name: name.to_owned(),
            outcome: rx,
            driver: executor.driver(),
        };
        (handle, task)
    }

    /// Name of the dispatched action.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Take the action's result if it has already finished.
    ///
    /// The result is handed out once; after that the handle reports the
    /// action as cancelled.
    pub fn try_result(&mut self) -> Option<anyhow::Result<()>> {
        match self.outcome.try_recv() {
            Ok(outcome) => outcome,
            Err(oneshot::Canceled) => Some(Err(self.cancelled())),
        }
    }

    fn cancelled(&self) -> anyhow::Error {
        StoreError::ActionCancelled(self.name.clone()).into()
    }
}

impl fmt::Debug for Dispatched {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dispatched")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

impl Future for Dispatched {
    type Output = anyhow::Result<()>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        if let Some(queue) = self.driver.as_ref().and_then(Weak::upgrade) {
            let _ = queue.poll(cx);
        }
        let polled = Pin::new(&mut self.outcome).poll(cx);
        match polled {
            Poll::Ready(Ok(outcome)) => Poll::Ready(outcome),
            Poll::Ready(Err(oneshot::Canceled)) => Poll::Ready(Err(self.cancelled())),
            Poll::Pending => Poll::Pending,
        }
    }
}
