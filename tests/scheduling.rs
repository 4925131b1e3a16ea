use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use ctxvisor::{
    Event, EventKind, Resource, ResourceError, ResourceHandle, RuntimeError, Scheduler,
    SchedulerConfig, SchedulerError, Status, Subscribe, TaskError, TaskFn, TaskRef,
};
use tokio::sync::{Notify, broadcast};
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;

const WAIT: Duration = Duration::from_secs(2);

/// Fake rendering context that records its own teardown.
struct FakeContext {
    id: String,
    destroyed: Arc<Mutex<Vec<String>>>,
}

impl Resource for FakeContext {
    fn destroy(&mut self) -> Result<(), ResourceError> {
        self.destroyed.lock().unwrap().push(self.id.clone());
        Ok(())
    }
}

#[derive(Clone, Copy)]
enum Outcome {
    Context,
    Nothing,
    Fail,
}

/// Builds tasks whose operation waits on a per-task gate.
#[derive(Default)]
struct Harness {
    destroyed: Arc<Mutex<Vec<String>>>,
    gates: Mutex<HashMap<String, Arc<Notify>>>,
    started: Mutex<Vec<String>>,
    running: Arc<AtomicUsize>,
    peak: Arc<AtomicUsize>,
}

impl Harness {
    fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Task that settles with `outcome` once [`Harness::release`] is called for `id`.
    fn gated(self: &Arc<Self>, id: &'static str, surface: &'static str, outcome: Outcome) -> TaskRef {
        let gate = Arc::new(Notify::new());
        self.gates.lock().unwrap().insert(id.to_string(), Arc::clone(&gate));
        let me = Arc::clone(self);

        TaskFn::arc(id, surface, move |_ctx: CancellationToken| {
            let gate = Arc::clone(&gate);
            let me = Arc::clone(&me);
            async move {
                me.enter(id);
                gate.notified().await;
                me.leave();
                me.settle(id, outcome)
            }
        })
    }

    /// Task that settles with `outcome` immediately.
    fn ready(self: &Arc<Self>, id: &'static str, outcome: Outcome) -> TaskRef {
        let me = Arc::clone(self);
        TaskFn::arc(id, "canvas", move |_ctx: CancellationToken| {
            let me = Arc::clone(&me);
            async move {
                me.enter(id);
                me.leave();
                me.settle(id, outcome)
            }
        })
    }

    fn release(&self, id: &str) {
        let gates = self.gates.lock().unwrap();
        gates.get(id).expect("known gate").notify_one();
    }

    fn enter(&self, id: &str) {
        self.started.lock().unwrap().push(id.to_string());
        let now = self.running.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
    }

    fn leave(&self) {
        self.running.fetch_sub(1, Ordering::SeqCst);
    }

    fn settle(&self, id: &str, outcome: Outcome) -> Result<Option<ResourceHandle>, TaskError> {
        match outcome {
            Outcome::Context => Ok(Some(self.context(id))),
            Outcome::Nothing => Ok(None),
            Outcome::Fail => Err(TaskError::fail("webgl unavailable")),
        }
    }

    fn context(&self, id: &str) -> ResourceHandle {
        Box::new(FakeContext {
            id: id.to_string(),
            destroyed: Arc::clone(&self.destroyed),
        })
    }

    fn destroyed(&self) -> Vec<String> {
        let mut v = self.destroyed.lock().unwrap().clone();
        v.sort();
        v
    }

    fn started(&self) -> Vec<String> {
        self.started.lock().unwrap().clone()
    }
}

fn scheduler(max_active: usize) -> Scheduler {
    Scheduler::new(SchedulerConfig::default().with_max_active(max_active))
}

fn status(pending: usize, active: usize, in_flight: usize) -> Status {
    Status {
        pending,
        active,
        in_flight,
    }
}

/// Next event of `kind` for task `id`, skipping everything else.
async fn next_for(rx: &mut broadcast::Receiver<Event>, kind: EventKind, id: &str) -> Event {
    timeout(WAIT, async {
        loop {
            let ev = rx.recv().await.expect("bus open");
            if ev.kind == kind && ev.task.as_deref() == Some(id) {
                return ev;
            }
        }
    })
    .await
    .unwrap_or_else(|_| panic!("no {kind:?} for {id} in time"))
}

/// Next event of `kind` for any task.
async fn next_of(rx: &mut broadcast::Receiver<Event>, kind: EventKind) -> Event {
    timeout(WAIT, async {
        loop {
            let ev = rx.recv().await.expect("bus open");
            if ev.kind == kind {
                return ev;
            }
        }
    })
    .await
    .unwrap_or_else(|_| panic!("no {kind:?} in time"))
}

#[tokio::test]
async fn example_scenario_two_slots() {
    let h = Harness::new();
    let sched = scheduler(2);
    let mut rx = sched.subscribe();

    sched.submit(h.gated("A", "c-a", Outcome::Context)).await.unwrap();
    sched.submit(h.gated("B", "c-b", Outcome::Fail)).await.unwrap();
    sched.submit(h.gated("C", "c-c", Outcome::Context)).await.unwrap();
    assert_eq!(sched.status().await.unwrap(), status(1, 0, 2));

    h.release("A");
    next_for(&mut rx, EventKind::TaskActivated, "A").await;
    next_for(&mut rx, EventKind::TaskAdmitted, "C").await;
    assert_eq!(sched.status().await.unwrap(), status(0, 1, 2));

    h.release("B");
    let failed = next_for(&mut rx, EventKind::TaskFailed, "B").await;
    assert_eq!(failed.reason.as_deref(), Some("error: webgl unavailable"));
    assert_eq!(sched.status().await.unwrap(), status(0, 1, 1));

    h.release("C");
    next_for(&mut rx, EventKind::TaskActivated, "C").await;
    assert_eq!(sched.status().await.unwrap(), status(0, 2, 0));

    sched.shutdown().await.unwrap();
    assert_eq!(h.destroyed(), ["A", "C"]);
}

#[tokio::test]
async fn shutdown_names_gated_operation_as_stuck() {
    let h = Harness::new();
    let sched = Scheduler::new(
        SchedulerConfig::default()
            .with_max_active(2)
            .with_grace(Duration::from_millis(50)),
    );
    let mut rx = sched.subscribe();

    sched.submit(h.ready("A", Outcome::Context)).await.unwrap();
    sched.submit(h.gated("C", "c-c", Outcome::Context)).await.unwrap();
    next_for(&mut rx, EventKind::TaskActivated, "A").await;
    next_for(&mut rx, EventKind::TaskAdmitted, "C").await;

    match sched.shutdown().await {
        Err(RuntimeError::GraceExceeded { stuck, .. }) => assert_eq!(stuck, ["C"]),
        other => panic!("expected GraceExceeded, got {other:?}"),
    }
    assert_eq!(h.destroyed(), ["A"]);
}

#[tokio::test]
async fn admits_in_fifo_order_with_one_slot() {
    let h = Harness::new();
    let sched = scheduler(1);
    let mut rx = sched.subscribe();

    for id in ["A", "B", "C"] {
        sched.submit(h.gated(id, "canvas", Outcome::Nothing)).await.unwrap();
    }

    let first = next_of(&mut rx, EventKind::TaskAdmitted).await;
    assert_eq!(first.task.as_deref(), Some("A"));

    h.release("A");
    let second = next_of(&mut rx, EventKind::TaskAdmitted).await;
    assert_eq!(second.task.as_deref(), Some("B"));

    h.release("B");
    let third = next_of(&mut rx, EventKind::TaskAdmitted).await;
    assert_eq!(third.task.as_deref(), Some("C"));

    h.release("C");
    next_for(&mut rx, EventKind::TaskDropped, "C").await;
    assert_eq!(h.started(), ["A", "B", "C"]);
    assert!(sched.status().await.unwrap().is_idle());
}

#[tokio::test]
async fn resubmission_replaces_payload_and_moves_to_back() {
    let h = Harness::new();
    let sched = scheduler(1);
    let mut rx = sched.subscribe();

    sched.submit(h.gated("X", "blocker", Outcome::Nothing)).await.unwrap();
    next_for(&mut rx, EventKind::TaskAdmitted, "X").await;

    sched.submit(h.gated("A", "old-canvas", Outcome::Nothing)).await.unwrap();
    sched.submit(h.gated("B", "canvas-b", Outcome::Nothing)).await.unwrap();
    sched.submit(h.gated("A", "new-canvas", Outcome::Context)).await.unwrap();

    let requeued = next_for(&mut rx, EventKind::TaskRequeued, "A").await;
    assert_eq!(requeued.surface.map(|s| s.to_string()).as_deref(), Some("new-canvas"));
    assert_eq!(sched.status().await.unwrap(), status(2, 0, 1));

    h.release("X");
    let next = next_of(&mut rx, EventKind::TaskAdmitted).await;
    assert_eq!(next.task.as_deref(), Some("B"));

    h.release("B");
    let last = next_of(&mut rx, EventKind::TaskAdmitted).await;
    assert_eq!(last.task.as_deref(), Some("A"));
    assert_eq!(last.surface.map(|s| s.to_string()).as_deref(), Some("new-canvas"));

    h.release("A");
    next_for(&mut rx, EventKind::TaskActivated, "A").await;
    assert_eq!(h.started(), ["X", "B", "A"]);
}

#[tokio::test]
async fn cancelled_queued_task_is_never_admitted() {
    let h = Harness::new();
    let sched = scheduler(1);
    let mut rx = sched.subscribe();

    sched.submit(h.gated("X", "blocker", Outcome::Nothing)).await.unwrap();
    sched.submit(h.gated("A", "canvas", Outcome::Context)).await.unwrap();
    next_for(&mut rx, EventKind::TaskAdmitted, "X").await;

    sched.cancel("A").await.unwrap();
    next_for(&mut rx, EventKind::TaskRemoved, "A").await;
    assert_eq!(sched.status().await.unwrap(), status(0, 0, 1));

    h.release("X");
    next_for(&mut rx, EventKind::TaskDropped, "X").await;
    assert!(sched.status().await.unwrap().is_idle());
    assert_eq!(h.started(), ["X"]);
}

#[tokio::test]
async fn cancel_destroys_active_handle_once() {
    let h = Harness::new();
    let sched = scheduler(2);
    let mut rx = sched.subscribe();

    sched.submit(h.ready("A", Outcome::Context)).await.unwrap();
    next_for(&mut rx, EventKind::TaskActivated, "A").await;
    assert_eq!(sched.status().await.unwrap(), status(0, 1, 0));

    sched.cancel("A").await.unwrap();
    next_for(&mut rx, EventKind::ResourceDestroyed, "A").await;
    assert_eq!(h.destroyed(), ["A"]);
    assert_eq!(sched.status().await.unwrap(), status(0, 0, 0));

    sched.cancel("A").await.unwrap();
    sched.cancel("never-submitted").await.unwrap();
    assert_eq!(h.destroyed(), ["A"]);
}

#[tokio::test]
async fn in_flight_task_survives_cancel_and_registers() {
    let h = Harness::new();
    let sched = scheduler(1);
    let mut rx = sched.subscribe();

    sched.submit(h.gated("A", "canvas", Outcome::Context)).await.unwrap();
    next_for(&mut rx, EventKind::TaskAdmitted, "A").await;

    sched.cancel("A").await.unwrap();
    h.release("A");
    next_for(&mut rx, EventKind::TaskActivated, "A").await;

    assert_eq!(sched.status().await.unwrap(), status(0, 1, 0));
    assert!(h.destroyed().is_empty());
}

#[tokio::test]
async fn flush_clears_everything_and_discards_late_handles() {
    let h = Harness::new();
    let sched = scheduler(1);
    let mut rx = sched.subscribe();

    sched.submit(h.ready("A", Outcome::Context)).await.unwrap();
    next_for(&mut rx, EventKind::TaskActivated, "A").await;

    sched.submit(h.gated("X", "canvas-x", Outcome::Context)).await.unwrap();
    sched.submit(h.gated("Y", "canvas-y", Outcome::Context)).await.unwrap();
    next_for(&mut rx, EventKind::TaskAdmitted, "X").await;

    sched.flush().await.unwrap();
    let flushed = next_of(&mut rx, EventKind::Flushed).await;
    assert_eq!(flushed.generation, Some(1));
    assert_eq!(sched.status().await.unwrap(), status(0, 0, 1));
    assert_eq!(h.destroyed(), ["A"]);

    h.release("X");
    let discarded = next_for(&mut rx, EventKind::TaskDiscarded, "X").await;
    assert_eq!(discarded.generation, Some(0));
    next_for(&mut rx, EventKind::ResourceDestroyed, "X").await;

    assert!(sched.status().await.unwrap().is_idle());
    assert_eq!(h.destroyed(), ["A", "X"]);
    assert_eq!(h.started(), ["A", "X"]);

    sched.flush().await.unwrap();
    assert!(sched.status().await.unwrap().is_idle());
}

#[tokio::test]
async fn failures_and_panics_release_capacity() {
    let h = Harness::new();
    let sched = scheduler(1);
    let mut rx = sched.subscribe();

    let panicking: TaskRef = TaskFn::arc("P", "canvas", |_ctx: CancellationToken| async {
        if true {
            panic!("context creation aborted");
        }
        Ok(None)
    });

    sched.submit(h.ready("F", Outcome::Fail)).await.unwrap();
    sched.submit(panicking).await.unwrap();
    sched.submit(h.ready("OK", Outcome::Context)).await.unwrap();

    next_for(&mut rx, EventKind::TaskFailed, "F").await;
    let panicked = next_for(&mut rx, EventKind::TaskFailed, "P").await;
    assert!(panicked.reason.as_deref().unwrap_or_default().contains("context creation aborted"));
    next_for(&mut rx, EventKind::TaskActivated, "OK").await;

    assert_eq!(sched.status().await.unwrap(), status(0, 1, 0));
}

#[tokio::test]
async fn destroy_failure_still_clears_entry() {
    struct Stubborn;
    impl Resource for Stubborn {
        fn destroy(&mut self) -> Result<(), ResourceError> {
            Err(ResourceError::destroy("context busy"))
        }
    }

    let sched = scheduler(1);
    let mut rx = sched.subscribe();
    let task: TaskRef = TaskFn::arc("S", "canvas", |_ctx: CancellationToken| async {
        Ok(Some(Box::new(Stubborn) as ResourceHandle))
    });

    sched.submit(task).await.unwrap();
    next_for(&mut rx, EventKind::TaskActivated, "S").await;

    sched.cancel("S").await.unwrap();
    let failed = next_for(&mut rx, EventKind::DestroyFailed, "S").await;
    assert_eq!(failed.reason.as_deref(), Some("destroy: context busy"));
    assert!(sched.status().await.unwrap().is_idle());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn never_exceeds_capacity_under_load() {
    const TASKS: usize = 24;
    let h = Harness::new();
    let sched = scheduler(3);
    let mut rx = sched.subscribe();

    for i in 0..TASKS {
        let me = Arc::clone(&h);
        let id = format!("mol-{i}");
        let task: TaskRef = TaskFn::arc(id.clone(), format!("canvas-{i}"), move |_ctx: CancellationToken| {
            let me = Arc::clone(&me);
            let id = id.clone();
            async move {
                me.enter(&id);
                tokio::time::sleep(Duration::from_millis(1 + (i as u64 * 7) % 5)).await;
                me.leave();
                Ok(Some(me.context(&id)))
            }
        });
        sched.submit(task).await.unwrap();
    }

    for _ in 0..TASKS {
        next_of(&mut rx, EventKind::TaskActivated).await;
    }

    assert!(h.peak.load(Ordering::SeqCst) <= 3);
    assert_eq!(sched.status().await.unwrap(), status(0, TASKS, 0));

    sched.shutdown().await.unwrap();
    assert_eq!(h.destroyed().len(), TASKS);
}

#[tokio::test]
async fn shutdown_destroys_active_and_late_handles() {
    let h = Harness::new();
    let sched = scheduler(1);
    let mut rx = sched.subscribe();

    sched.submit(h.ready("A", Outcome::Context)).await.unwrap();
    next_for(&mut rx, EventKind::TaskActivated, "A").await;

    let destroyed = Arc::clone(&h.destroyed);
    let late: TaskRef = TaskFn::arc("L", "canvas", move |ctx: CancellationToken| {
        let destroyed = Arc::clone(&destroyed);
        async move {
            ctx.cancelled().await;
            Ok(Some(Box::new(FakeContext {
                id: "L".into(),
                destroyed,
            }) as ResourceHandle))
        }
    });
    sched.submit(late).await.unwrap();
    sched.submit(h.gated("Q", "canvas", Outcome::Context)).await.unwrap();
    next_for(&mut rx, EventKind::TaskAdmitted, "L").await;
    assert_eq!(sched.status().await.unwrap(), status(1, 1, 1));

    sched.shutdown().await.unwrap();
    next_for(&mut rx, EventKind::TaskDiscarded, "L").await;
    next_of(&mut rx, EventKind::AllStoppedWithin).await;

    assert_eq!(h.destroyed(), ["A", "L"]);
    assert_eq!(h.started(), ["A"]);
    assert!(sched.is_closed());
    assert_eq!(
        sched.submit(h.ready("Z", Outcome::Context)).await,
        Err(SchedulerError::Closed)
    );
    assert_eq!(sched.status().await, Err(SchedulerError::Closed));
    sched.shutdown().await.unwrap();
}

#[tokio::test]
async fn shutdown_reports_stuck_operations() {
    let sched = Scheduler::new(
        SchedulerConfig::default()
            .with_max_active(1)
            .with_grace(Duration::from_millis(50)),
    );
    let mut rx = sched.subscribe();

    let forever = Arc::new(Notify::new());
    let stuck: TaskRef = TaskFn::arc("stuck", "canvas", move |_ctx: CancellationToken| {
        let forever = Arc::clone(&forever);
        async move {
            forever.notified().await;
            Ok(None)
        }
    });
    sched.submit(stuck).await.unwrap();
    next_for(&mut rx, EventKind::TaskAdmitted, "stuck").await;

    match sched.shutdown().await {
        Err(RuntimeError::GraceExceeded { stuck, .. }) => assert_eq!(stuck, ["stuck"]),
        other => panic!("expected GraceExceeded, got {other:?}"),
    }
}

#[tokio::test]
async fn try_submit_reports_full_channel() {
    let h = Harness::new();
    let sched = Scheduler::new(
        SchedulerConfig::default()
            .with_max_active(1)
            .with_command_capacity(1),
    );

    assert_eq!(sched.try_submit(h.ready("A", Outcome::Nothing)), Ok(()));
    assert_eq!(
        sched.try_submit(h.ready("B", Outcome::Nothing)),
        Err(SchedulerError::Full)
    );
}

#[tokio::test]
async fn dropping_scheduler_tears_down_handles() {
    let h = Harness::new();
    let sched = scheduler(1);
    let mut rx = sched.subscribe();

    sched.submit(h.ready("A", Outcome::Context)).await.unwrap();
    next_for(&mut rx, EventKind::TaskActivated, "A").await;

    drop(sched);
    next_for(&mut rx, EventKind::ResourceDestroyed, "A").await;
    assert_eq!(h.destroyed(), ["A"]);
}

#[tokio::test]
async fn independent_schedulers_do_not_share_state() {
    let h = Harness::new();
    let first = scheduler(1);
    let second = scheduler(1);
    let mut rx = first.subscribe();

    first.submit(h.ready("A", Outcome::Context)).await.unwrap();
    next_for(&mut rx, EventKind::TaskActivated, "A").await;

    assert_eq!(first.status().await.unwrap(), status(0, 1, 0));
    assert!(second.status().await.unwrap().is_idle());
    second.cancel("A").await.unwrap();
    assert_eq!(first.status().await.unwrap(), status(0, 1, 0));
}

#[derive(Default)]
struct Recorder(Mutex<Vec<EventKind>>);

#[async_trait]
impl Subscribe for Recorder {
    async fn on_event(&self, ev: &Event) {
        self.0.lock().unwrap().push(ev.kind);
    }

    fn name(&self) -> &'static str {
        "recorder"
    }
}

#[tokio::test]
async fn subscribers_receive_lifecycle_events() {
    let h = Harness::new();
    let recorder = Arc::new(Recorder::default());
    let sched = Scheduler::builder(SchedulerConfig::default().with_max_active(1))
        .with_subscribers(vec![recorder.clone() as Arc<dyn Subscribe>])
        .build();
    let mut rx = sched.subscribe();

    sched.submit(h.ready("A", Outcome::Context)).await.unwrap();
    next_for(&mut rx, EventKind::TaskActivated, "A").await;
    sched.shutdown().await.unwrap();

    let seen = recorder.0.lock().unwrap().clone();
    assert_eq!(
        seen,
        [
            EventKind::TaskQueued,
            EventKind::TaskAdmitted,
            EventKind::TaskActivated,
            EventKind::ShutdownRequested,
            EventKind::ResourceDestroyed,
            EventKind::AllStoppedWithin,
        ]
    );
}
