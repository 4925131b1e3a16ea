//! # ctxvisor
//!
//! **ctxvisor** is a bounded-concurrency scheduler for scarce, explicitly
//! destroyed resources such as WebGL or GPU rendering contexts.
//!
//! Callers submit render tasks. The scheduler runs at most `max_active` of them
//! at once, keeps the handle each one produces, and destroys those handles on
//! cancel, flush or shutdown. It never renders anything itself: the render
//! operation is an opaque async callback.
//!
//! ## Architecture
//! ```text
//!     ┌──────────────┐   ┌──────────────┐   ┌──────────────┐
//!     │   TaskRef    │   │   TaskRef    │   │   TaskRef    │
//!     │ (id, target, │   │ (id, target, │   │ (id, target, │
//!     │  operation)  │   │  operation)  │   │  operation)  │
//!     └──────┬───────┘   └──────┬───────┘   └──────┬───────┘
//!            ▼ submit           ▼ submit           ▼ submit
//! ┌───────────────────────────────────────────────────────────────────┐
//! │  Scheduler (handle)  ── mpsc::Sender<Command> ──┐                 │
//! └─────────────────────────────────────────────────┼─────────────────┘
//!                                                   ▼
//! ┌───────────────────────────────────────────────────────────────────┐
//! │  SchedulerActor (single loop, owns all state)                     │
//! │  - PendingQueue   FIFO, dedup by id                               │
//! │  - ActiveRegistry id → ResourceHandle                             │
//! │  - in_flight      ≤ max_active                                    │
//! │  - generation     bumped by flush                                 │
//! └──────┬──────────────────┬──────────────────┬──────────────────────┘
//!        ▼                  ▼                  ▼
//!   run_once(A)        run_once(B)        (C waits in queue)
//!        │                  │
//!        └──── Completion ──┴──► register / drop / discard ──► drain()
//!
//!   every transition ──► Bus (broadcast) ──► SubscriberSet ──► LogWriter, ...
//!                                       └──► Scheduler::subscribe()
//! ```
//!
//! ### Task lifecycle
//! ```text
//! Queued ──► InFlight ──► Active ──► Destroyed   (cancel / flush / shutdown)
//!   │            ├──────► Dropped                (no handle, error or panic)
//!   │            └──────► Discarded              (handle from before a flush)
//!   └──► Removed                                 (cancel before admission)
//! ```
//!
//! ## Features
//! | Area              | Description                                             | Key types                               |
//! |-------------------|---------------------------------------------------------|-----------------------------------------|
//! | **Scheduling**    | Capacity-bounded FIFO admission with dedup and teardown | [`Scheduler`], [`Status`]               |
//! | **Tasks**         | Render requests as closures or custom types             | [`Task`], [`TaskFn`], [`TaskRef`]       |
//! | **Resources**     | Explicitly destroyed handles                            | [`Resource`], [`ResourceHandle`]        |
//! | **Events**        | Lifecycle events on a broadcast bus                     | [`Event`], [`EventKind`], [`Subscribe`] |
//! | **Errors**        | Typed errors with stable labels                         | [`TaskError`], [`ResourceError`]        |
//! | **Configuration** | Capacity, channel sizes, shutdown grace                 | [`SchedulerConfig`]                     |
//!
//! ## Optional features
//! - `logging`: exports the built-in [`LogWriter`] subscriber, which writes events through `tracing`.
//!
//! ## Example
//! ```rust
//! use tokio_util::sync::CancellationToken;
//! use ctxvisor::{
//!     EventKind, Resource, ResourceError, ResourceHandle, Scheduler, SchedulerConfig,
//!     TaskError, TaskFn, TaskRef,
//! };
//!
//! struct GlContext;
//!
//! impl Resource for GlContext {
//!     fn destroy(&mut self) -> Result<(), ResourceError> {
//!         Ok(())
//!     }
//! }
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let scheduler = Scheduler::new(SchedulerConfig::default().with_max_active(3));
//!     let mut events = scheduler.subscribe();
//!
//!     let render: TaskRef = TaskFn::arc("mol-1", "canvas-1", |_ctx: CancellationToken| async {
//!         Ok::<_, TaskError>(Some(Box::new(GlContext) as ResourceHandle))
//!     });
//!     scheduler.submit(render).await?;
//!
//!     while let Ok(ev) = events.recv().await {
//!         if ev.kind == EventKind::TaskActivated {
//!             break;
//!         }
//!     }
//!     assert_eq!(scheduler.status().await?.active, 1);
//!
//!     scheduler.flush().await?;
//!     scheduler.shutdown().await?;
//!     Ok(())
//! }
//! ```
mod core;
mod error;
mod events;
mod subscribers;
mod tasks;

// ---- Public re-exports ----

pub use core::{Scheduler, SchedulerBuilder, SchedulerConfig, Status};
pub use error::{ResourceError, RuntimeError, SchedulerError, TaskError};
pub use events::{Bus, Event, EventKind};
pub use subscribers::{Subscribe, SubscriberSet};
pub use tasks::{BoxTaskFuture, Resource, ResourceHandle, SurfaceRef, Task, TaskFn, TaskId, TaskRef};

// Optional: expose a simple built-in logger subscriber.
// Enable with: `--features logging`
#[cfg(feature = "logging")]
pub use subscribers::LogWriter;
