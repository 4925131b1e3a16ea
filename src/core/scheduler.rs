//! # Scheduler: public handle over the admission loop.
//!
//! The [`Scheduler`] owns the event bus, the command channel into the loop and
//! the runtime cancellation token. Every method is a message to the loop, so
//! callers never touch the queue, the registry or the capacity counter.
//!
//! ```text
//! submit / cancel / flush / status
//!         │
//!         ▼
//!   mpsc::Sender<Command> ──► SchedulerActor::run()  (owns queue, registry, in_flight)
//!                                    │
//!                                    ├──► JoinSet<run_once(task)>  (≤ max_active)
//!                                    └──► Bus ──► subscriber listener ──► SubscriberSet
//!                                             └─► Scheduler::subscribe()
//! ```
//!
//! ## Example
//! ```rust
//! use tokio_util::sync::CancellationToken;
//! use ctxvisor::{Resource, ResourceError, ResourceHandle, Scheduler, SchedulerConfig, TaskFn, TaskRef, TaskError};
//!
//! struct Ctx;
//! impl Resource for Ctx {
//!     fn destroy(&mut self) -> Result<(), ResourceError> { Ok(()) }
//! }
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let scheduler = Scheduler::new(SchedulerConfig::default().with_max_active(2));
//!
//!     let task: TaskRef = TaskFn::arc("mol-1", "canvas-1", |_ctx: CancellationToken| async {
//!         Ok::<_, TaskError>(Some(Box::new(Ctx) as ResourceHandle))
//!     });
//!     scheduler.submit(task).await?;
//!
//!     scheduler.cancel("mol-1").await?;
//!     scheduler.shutdown().await?;
//!     Ok(())
//! }
//! ```

use tokio::sync::{Mutex, broadcast, mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::core::actor::Command;
use crate::core::builder::SchedulerBuilder;
use crate::core::config::SchedulerConfig;
use crate::core::status::Status;
use crate::error::{RuntimeError, SchedulerError};
use crate::events::{Bus, Event};
use crate::subscribers::SubscriberSet;
use crate::tasks::TaskRef;

/// Background tasks joined by [`Scheduler::shutdown`].
pub(crate) struct Workers {
    pub actor: JoinHandle<Result<(), RuntimeError>>,
    pub listener: Option<JoinHandle<()>>,
}

/// Bounded-concurrency scheduler for explicitly destroyed resources.
///
/// Build with [`Scheduler::new`] or [`Scheduler::builder`] inside a tokio runtime.
/// Dropping the scheduler without calling [`shutdown`](Self::shutdown) still
/// tears down every handle once the loop notices the closed channel.
pub struct Scheduler {
    cfg: SchedulerConfig,
    bus: Bus,
    tx: mpsc::Sender<Command>,
    runtime_token: CancellationToken,
    listener_stop: CancellationToken,
    workers: Mutex<Option<Workers>>,
}

impl Scheduler {
    /// Creates a scheduler without subscribers.
    pub fn new(cfg: SchedulerConfig) -> Self {
        SchedulerBuilder::new(cfg).build()
    }

    /// Returns a builder for a scheduler with subscribers.
    pub fn builder(cfg: SchedulerConfig) -> SchedulerBuilder {
        SchedulerBuilder::new(cfg)
    }

    pub(crate) fn from_parts(
        cfg: SchedulerConfig,
        bus: Bus,
        tx: mpsc::Sender<Command>,
        runtime_token: CancellationToken,
        listener_stop: CancellationToken,
        workers: Workers,
    ) -> Self {
        Self {
            cfg,
            bus,
            tx,
            runtime_token,
            listener_stop,
            workers: Mutex::new(Some(workers)),
        }
    }

    /// Returns the configuration this scheduler was built with.
    pub fn config(&self) -> &SchedulerConfig {
        &self.cfg
    }

    /// Queues a task; waits only if the command channel is full.
    ///
    /// A queued task with the same id is replaced and the new one goes to the back.
    /// Admission happens after every command already waiting has been taken, so a
    /// burst of submissions coalesces before the first admission. The outcome is
    /// reported only on the event bus.
    pub async fn submit(&self, task: TaskRef) -> Result<(), SchedulerError> {
        self.tx
            .send(Command::Submit(task))
            .await
            .map_err(|_| SchedulerError::Closed)
    }

    /// Queues a task without waiting (fails with `Full` if the channel is full).
    pub fn try_submit(&self, task: TaskRef) -> Result<(), SchedulerError> {
        self.tx.try_send(Command::Submit(task)).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => SchedulerError::Full,
            mpsc::error::TrySendError::Closed(_) => SchedulerError::Closed,
        })
    }

    /// Removes `id` from the queue and destroys its active handle, if any.
    ///
    /// An operation already in flight is not interrupted; its result is
    /// registered normally when it settles. Idempotent.
    pub async fn cancel(&self, id: &str) -> Result<(), SchedulerError> {
        let (ack, done) = oneshot::channel();
        self.send(Command::Cancel {
            id: id.to_owned(),
            ack,
        })
        .await?;
        done.await.map_err(|_| SchedulerError::Closed)
    }

    /// Clears the queue and destroys every active handle.
    ///
    /// Handles produced later by operations in flight during the flush are
    /// destroyed on arrival instead of registered. Idempotent.
    pub async fn flush(&self) -> Result<(), SchedulerError> {
        let (ack, done) = oneshot::channel();
        self.send(Command::Flush { ack }).await?;
        done.await.map_err(|_| SchedulerError::Closed)
    }

    /// Returns `{ pending, active, in_flight }`.
    pub async fn status(&self) -> Result<Status, SchedulerError> {
        let (reply, rx) = oneshot::channel();
        self.send(Command::Status { reply }).await?;
        rx.await.map_err(|_| SchedulerError::Closed)
    }

    /// Creates a receiver for every event published from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.bus.subscribe()
    }

    /// True once shutdown started or the loop has stopped.
    pub fn is_closed(&self) -> bool {
        self.runtime_token.is_cancelled() || self.tx.is_closed()
    }

    /// Stops the scheduler.
    ///
    /// Clears the queue, destroys every active handle, cancels the context given
    /// to in-flight operations and waits up to [`SchedulerConfig::grace`] for them.
    /// Handles that arrive during the grace period are destroyed. Returns
    /// [`RuntimeError::GraceExceeded`] with the ids still running when time runs out.
    /// Subsequent calls return `Ok(())`.
    pub async fn shutdown(&self) -> Result<(), RuntimeError> {
        let Some(workers) = self.workers.lock().await.take() else {
            return Ok(());
        };
        self.runtime_token.cancel();

        let res = match workers.actor.await {
            Ok(res) => res,
            Err(e) => {
                tracing::error!(error = %e, "scheduler loop terminated abnormally");
                Ok(())
            }
        };

        self.listener_stop.cancel();
        if let Some(listener) = workers.listener {
            let _ = listener.await;
        }
        res
    }

    async fn send(&self, cmd: Command) -> Result<(), SchedulerError> {
        self.tx.send(cmd).await.map_err(|_| SchedulerError::Closed)
    }
}

impl Drop for Scheduler {
    fn drop(&mut self) {
        self.listener_stop.cancel();
    }
}

/// Forwards bus events to the subscriber set until `stop` is cancelled.
///
/// Events already buffered when `stop` fires are still delivered.
pub(crate) fn spawn_listener(
    mut rx: broadcast::Receiver<Event>,
    set: SubscriberSet,
    stop: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            tokio::select! {
                biased;

                msg = rx.recv() => match msg {
                    Ok(ev) => set.emit(&ev),
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        tracing::warn!(skipped = n, "subscriber listener lagged");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                },
                _ = stop.cancelled() => break,
            }
        }

        set.shutdown().await;
    })
}
