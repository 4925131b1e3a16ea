use std::sync::Arc;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use super::{
    actor::SchedulerActor,
    scheduler::{Scheduler, Workers, spawn_listener},
};
use crate::{
    core::SchedulerConfig,
    events::Bus,
    subscribers::{Subscribe, SubscriberSet},
};

/// Builder for constructing a [`Scheduler`] with optional subscribers.
pub struct SchedulerBuilder {
    cfg: SchedulerConfig,
    subscribers: Vec<Arc<dyn Subscribe>>,
}

impl SchedulerBuilder {
    /// Creates a new builder with the given configuration.
    pub fn new(cfg: SchedulerConfig) -> Self {
        Self {
            cfg,
            subscribers: Vec::new(),
        }
    }

    /// Sets event subscribers for observability.
    ///
    /// Subscribers receive scheduler events through dedicated workers with
    /// bounded queues; a slow subscriber never stalls admission.
    pub fn with_subscribers(mut self, subscribers: Vec<Arc<dyn Subscribe>>) -> Self {
        self.subscribers = subscribers;
        self
    }

    /// Builds the scheduler and spawns its loop.
    ///
    /// Must be called from within a tokio runtime.
    pub fn build(self) -> Scheduler {
        let bus = Bus::new(self.cfg.bus_capacity_clamped());
        let runtime_token = CancellationToken::new();
        let listener_stop = CancellationToken::new();
        let (tx, rx) = mpsc::channel(self.cfg.command_capacity_clamped());

        // Subscribe before the loop starts so no event is missed.
        let listener = (!self.subscribers.is_empty()).then(|| {
            let set = SubscriberSet::new(self.subscribers, bus.clone());
            spawn_listener(bus.subscribe(), set, listener_stop.clone())
        });

        let actor = SchedulerActor::new(&self.cfg, bus.clone(), runtime_token.clone());
        let actor = tokio::spawn(actor.run(rx));

        tracing::debug!(
            max_active = self.cfg.max_active_clamped(),
            subscribers = listener.is_some(),
            "scheduler started"
        );

        Scheduler::from_parts(
            self.cfg,
            bus,
            tx,
            runtime_token,
            listener_stop,
            Workers { actor, listener },
        )
    }
}
