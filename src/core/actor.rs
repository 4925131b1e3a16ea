//! # Scheduler loop: the single owner of queue, registry and capacity.
//!
//! All bookkeeping happens inside [`SchedulerActor::run`], one tokio task that
//! waits on three sources and handles each wake-up to completion before the
//! next `select!`:
//!
//! ```text
//! loop {
//!   select! {
//!     runtime_token.cancelled()  ─► break → shutdown sequence
//!     cmd = commands.recv()      ─► handle cmd, then every command already waiting
//!                                   (bursts coalesce, dedup spans the burst)
//!                                   ─► drain()
//!     done = operations.join()   ─► complete(done) ─► drain()
//!   }
//! }
//!
//! drain():     while in_flight < max_active && queue not empty:
//!                pop front ─► TaskAdmitted ─► spawn run_once(task, ctx)
//! complete():  Ok(Some(h)), same generation ─► registry.register ─► TaskActivated
//!              Ok(Some(h)), older generation ─► destroy h        ─► TaskDiscarded
//!              Ok(None)                      ─► TaskDropped
//!              Err(e) / panic                ─► TaskFailed
//! ```
//!
//! ## Rules
//! - Capacity check and admission are never separated by an `.await`, so
//!   `in_flight ≤ max_active` holds under any interleaving.
//! - `in_flight` is the number of spawned operations not yet joined; a slot is
//!   released as soon as the loop reconciles the settled operation.
//! - In-flight operations are never interrupted by cancel or flush. Flush bumps
//!   the generation so their late handles are destroyed instead of registered.
//! - `status` replies after a drain, so it reflects every command sent before it.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, oneshot};
use tokio::task::{self, JoinError, JoinSet};
use tokio::time;
use tokio_util::sync::CancellationToken;

use crate::core::config::SchedulerConfig;
use crate::core::queue::PendingQueue;
use crate::core::registry::{ActiveRegistry, destroy_handle};
use crate::core::runner::{Completion, run_once};
use crate::core::status::Status;
use crate::error::RuntimeError;
use crate::events::{Bus, Event, EventKind};
use crate::tasks::{TaskId, TaskRef};

/// Requests sent from [`Scheduler`](crate::Scheduler) handles to the loop.
pub(crate) enum Command {
    Submit(TaskRef),
    Cancel {
        id: String,
        ack: oneshot::Sender<()>,
    },
    Flush {
        ack: oneshot::Sender<()>,
    },
    Status {
        reply: oneshot::Sender<Status>,
    },
}

/// State owned by the scheduler loop.
pub(crate) struct SchedulerActor {
    max_active: usize,
    grace: Duration,
    bus: Bus,
    queue: PendingQueue,
    registry: ActiveRegistry,
    operations: JoinSet<Completion>,
    /// Operation id → task id, for operations not yet reconciled.
    running: HashMap<task::Id, TaskId>,
    generation: u64,
    runtime_token: CancellationToken,
}

impl SchedulerActor {
    pub fn new(cfg: &SchedulerConfig, bus: Bus, runtime_token: CancellationToken) -> Self {
        Self {
            max_active: cfg.max_active_clamped(),
            grace: cfg.grace,
            registry: ActiveRegistry::new(bus.clone()),
            bus,
            queue: PendingQueue::new(),
            operations: JoinSet::new(),
            running: HashMap::new(),
            generation: 0,
            runtime_token,
        }
    }

    /// Runs until the runtime token is cancelled or every handle is dropped,
    /// then performs the shutdown sequence.
    pub async fn run(mut self, mut commands: mpsc::Receiver<Command>) -> Result<(), RuntimeError> {
        let token = self.runtime_token.clone();

        loop {
            tokio::select! {
                biased;

                _ = token.cancelled() => break,

                cmd = commands.recv() => {
                    let Some(cmd) = cmd else { break };
                    self.handle(cmd);
                    while let Ok(cmd) = commands.try_recv() {
                        self.handle(cmd);
                    }
                    self.drain();
                }

                Some(joined) = self.operations.join_next_with_id(), if !self.operations.is_empty() => {
                    self.complete(joined);
                    self.drain();
                }
            }
        }

        commands.close();
        self.shutdown().await
    }

    fn handle(&mut self, cmd: Command) {
        match cmd {
            Command::Submit(task) => self.enqueue(task),
            Command::Cancel { id, ack } => {
                self.cancel(&id);
                let _ = ack.send(());
            }
            Command::Flush { ack } => {
                self.flush();
                let _ = ack.send(());
            }
            Command::Status { reply } => {
                self.drain();
                let _ = reply.send(self.status());
            }
        }
    }

    fn enqueue(&mut self, task: TaskRef) {
        let kind = if self.queue.enqueue(Arc::clone(&task)) {
            EventKind::TaskRequeued
        } else {
            EventKind::TaskQueued
        };
        tracing::debug!(task = task.id(), surface = %task.target(), kind = kind.as_label(), "task enqueued");
        self.bus.publish(
            Event::new(kind)
                .with_task(task.id())
                .with_surface(task.target().clone()),
        );
    }

    /// Removes a queued task and destroys an active handle, independently.
    fn cancel(&mut self, id: &str) {
        if self.queue.remove_by_id(id) {
            tracing::debug!(task = id, "queued task removed");
            self.bus
                .publish(Event::new(EventKind::TaskRemoved).with_task(id));
        }
        let _ = self.registry.destroy(id);
    }

    fn flush(&mut self) {
        let dropped = self.queue.clear();
        let destroyed = self.registry.destroy_all();
        self.generation += 1;
        tracing::info!(
            dropped,
            destroyed,
            in_flight = self.in_flight(),
            generation = self.generation,
            "scheduler flushed"
        );
        self.bus
            .publish(Event::new(EventKind::Flushed).with_generation(self.generation));
    }

    fn status(&self) -> Status {
        Status {
            pending: self.queue.len(),
            active: self.registry.len(),
            in_flight: self.in_flight(),
        }
    }

    fn in_flight(&self) -> usize {
        self.operations.len()
    }

    /// Admits queued tasks while capacity allows.
    fn drain(&mut self) {
        while self.in_flight() < self.max_active {
            let Some(task) = self.queue.dequeue_front() else {
                break;
            };
            self.admit(task);
        }
        debug_assert!(self.in_flight() <= self.max_active);
    }

    fn admit(&mut self, task: TaskRef) {
        let id = TaskId::from(task.id());
        self.bus.publish(
            Event::new(EventKind::TaskAdmitted)
                .with_task(task.id())
                .with_surface(task.target().clone())
                .with_generation(self.generation),
        );

        let ctx = self.runtime_token.child_token();
        let op = self
            .operations
            .spawn(run_once(task, self.generation, ctx));
        tracing::debug!(task = %id, op = %op.id(), generation = self.generation, "task admitted");
        self.running.insert(op.id(), id);
    }

    /// Reconciles one settled operation.
    fn complete(&mut self, joined: Result<(task::Id, Completion), JoinError>) {
        let done = match joined {
            Ok((op, done)) => {
                self.running.remove(&op);
                done
            }
            Err(e) => {
                let task = self.running.remove(&e.id());
                tracing::error!(task = ?task, error = %e, "operation task aborted");
                return;
            }
        };

        match done.outcome {
            Ok(Some(handle)) if done.generation == self.generation => {
                tracing::debug!(task = %done.id, "task activated");
                self.registry.register(done.id.clone(), handle);
                self.bus.publish(
                    Event::new(EventKind::TaskActivated)
                        .with_task(done.id)
                        .with_surface(done.surface)
                        .with_generation(done.generation),
                );
            }
            Ok(Some(handle)) => {
                tracing::debug!(
                    task = %done.id,
                    admitted = done.generation,
                    current = self.generation,
                    "discarding handle from stale generation"
                );
                self.bus.publish(
                    Event::new(EventKind::TaskDiscarded)
                        .with_task(done.id.clone())
                        .with_surface(done.surface)
                        .with_generation(done.generation),
                );
                let _ = destroy_handle(&self.bus, &done.id, handle);
            }
            Ok(None) => {
                tracing::debug!(task = %done.id, "task settled without a resource");
                self.bus.publish(
                    Event::new(EventKind::TaskDropped)
                        .with_task(done.id)
                        .with_surface(done.surface),
                );
            }
            Err(e) => {
                tracing::warn!(task = %done.id, error = %e, "render operation failed");
                self.bus.publish(
                    Event::new(EventKind::TaskFailed)
                        .with_task(done.id)
                        .with_surface(done.surface)
                        .with_reason(e.as_message()),
                );
            }
        }
    }

    /// Clears the queue, destroys every handle, cancels in-flight operations and
    /// waits up to `grace` for them; late handles are destroyed on arrival.
    async fn shutdown(mut self) -> Result<(), RuntimeError> {
        self.bus.publish(Event::new(EventKind::ShutdownRequested));

        let dropped = self.queue.clear();
        let destroyed = self.registry.destroy_all();
        self.generation += 1;
        self.runtime_token.cancel();
        tracing::info!(dropped, destroyed, in_flight = self.in_flight(), "scheduler shutting down");

        let grace = self.grace;
        if time::timeout(grace, self.settle_all()).await.is_ok() {
            self.bus.publish(Event::new(EventKind::AllStoppedWithin));
            return Ok(());
        }

        let mut stuck: Vec<String> = self.running.values().map(|id| id.to_string()).collect();
        stuck.sort_unstable();
        tracing::warn!(?grace, ?stuck, "in-flight operations did not settle in time");
        self.bus.publish(
            Event::new(EventKind::GraceExceeded).with_reason(stuck.join(",")),
        );
        self.operations.abort_all();
        Err(RuntimeError::GraceExceeded { grace, stuck })
    }

    async fn settle_all(&mut self) {
        while let Some(joined) = self.operations.join_next_with_id().await {
            self.complete(joined);
        }
    }
}
