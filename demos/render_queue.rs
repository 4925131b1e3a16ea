//! # Demo: render_queue
//!
//! A molecule gallery with more thumbnails than the browser allows live WebGL
//! contexts. Each thumbnail is a render task; the scheduler keeps at most
//! three contexts in creation at once and tears them down on scroll-away
//! (cancel), on filter change (flush) and on page exit (shutdown).
//!
//! ## Flow
//! ```text
//! submit(mol-0..mol-7) ──► queue ──► ≤3 in flight ──► FakeGlContext registered
//! cancel(mol-1)        ──► context destroyed
//! submit(mol-3)        ──► resubmitted while queued: replaced, moved to back
//! flush()              ──► queue cleared, contexts destroyed, late ones discarded
//! shutdown()           ──► everything torn down
//! ```
//!
//! ## Run
//! ```bash
//! RUST_LOG=ctxvisor=debug cargo run --example render_queue --features logging
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use ctxvisor::{
    EventKind, LogWriter, Resource, ResourceError, ResourceHandle, Scheduler, SchedulerConfig,
    Subscribe, TaskError, TaskFn, TaskRef,
};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

static LIVE_CONTEXTS: AtomicUsize = AtomicUsize::new(0);

/// Stand-in for a WebGL rendering context.
struct FakeGlContext {
    canvas: String,
}

impl FakeGlContext {
    fn create(canvas: &str) -> Self {
        LIVE_CONTEXTS.fetch_add(1, Ordering::SeqCst);
        Self {
            canvas: canvas.to_string(),
        }
    }
}

impl Resource for FakeGlContext {
    fn destroy(&mut self) -> Result<(), ResourceError> {
        LIVE_CONTEXTS.fetch_sub(1, Ordering::SeqCst);
        println!("[gl] lost context on {}", self.canvas);
        Ok(())
    }
}

fn thumbnail(idx: usize, delay_ms: u64) -> TaskRef {
    let canvas = format!("canvas-{idx}");
    let surface = canvas.clone();

    TaskFn::arc(format!("mol-{idx}"), surface, move |ctx: CancellationToken| {
        let canvas = canvas.clone();
        async move {
            tokio::select! {
                _ = tokio::time::sleep(Duration::from_millis(delay_ms)) => {}
                _ = ctx.cancelled() => return Err(TaskError::Canceled),
            }
            if idx == 5 {
                return Err(TaskError::fail("shader compile error"));
            }
            Ok(Some(Box::new(FakeGlContext::create(&canvas)) as ResourceHandle))
        }
    })
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("ctxvisor=info")),
        )
        .init();

    let subs: Vec<Arc<dyn Subscribe>> = vec![Arc::new(LogWriter::new())];
    let scheduler = Scheduler::builder(SchedulerConfig::default().with_max_active(3))
        .with_subscribers(subs)
        .build();
    let mut events = scheduler.subscribe();

    for idx in 0..8 {
        scheduler.submit(thumbnail(idx, 40 + 15 * idx as u64)).await?;
    }
    // Re-rendered before admission: replaces the queued entry.
    scheduler.submit(thumbnail(3, 10)).await?;
    println!("[demo] after submit: {}", scheduler.status().await?);

    let mut settled = 0;
    while settled < 2 {
        let ev = events.recv().await?;
        if ev.kind == EventKind::TaskActivated {
            settled += 1;
        }
    }

    scheduler.cancel("mol-1").await?;
    println!("[demo] after cancel(mol-1): {}", scheduler.status().await?);

    tokio::time::sleep(Duration::from_millis(60)).await;
    scheduler.flush().await?;
    println!("[demo] after flush: {}", scheduler.status().await?);

    scheduler.submit(thumbnail(7, 20)).await?;
    tokio::time::sleep(Duration::from_millis(100)).await;
    println!("[demo] before shutdown: {}", scheduler.status().await?);

    scheduler.shutdown().await?;
    println!(
        "[demo] done, live contexts: {}",
        LIVE_CONTEXTS.load(Ordering::SeqCst)
    );
    Ok(())
}
