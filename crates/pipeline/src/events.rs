//! Lifecycle events emitted by the pipeline, one per observable step.

use haul_core::{Order, Status};
use parking_lot::Mutex;
use serde::Serialize;
use tracing::info;

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum PipelineEvent {
    GeneratorStarted,
    /// Order built at its initial status and handed to the buffer.
    Dispatched { order_id: String, destination: String, status: Status },
    GeneratorFinished { dispatched: usize },
    ProcessorStarted { total: usize },
    PickedUp { order_id: String, destination: String },
    Advanced { order_id: String, destination: String, from: Status, to: Status },
    Offloaded { order_id: String, destination: String, processed: usize, total: usize },
    ProcessorFinished { processed: usize },
}

impl PipelineEvent {
    pub(crate) fn dispatched(order: &Order) -> Self {
        Self::Dispatched {
            order_id: order.id.clone(),
            destination: order.destination.clone(),
            status: order.status(),
        }
    }

    pub(crate) fn picked_up(order: &Order) -> Self {
        Self::PickedUp { order_id: order.id.clone(), destination: order.destination.clone() }
    }

    /// Order id the event refers to, if any.
    pub fn order_id(&self) -> Option<&str> {
        match self {
            Self::Dispatched { order_id, .. }
            | Self::PickedUp { order_id, .. }
            | Self::Advanced { order_id, .. }
            | Self::Offloaded { order_id, .. } => Some(order_id),
            _ => None,
        }
    }
}

/// Receiver of pipeline events. Called from the generator and processor
/// threads, so implementations must be cheap and thread-safe.
pub trait EventSink: Send + Sync {
    fn emit(&self, event: &PipelineEvent);
}

/// Default sink: structured `tracing` records at INFO.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl EventSink for TracingSink {
    fn emit(&self, event: &PipelineEvent) {
        match event {
            PipelineEvent::GeneratorStarted => info!("order generator started"),
            PipelineEvent::Dispatched { order_id, destination, status } => {
                info!(order_id = %order_id, destination = %destination, status = %status, "dispatched")
            }
            PipelineEvent::GeneratorFinished { dispatched } => {
                info!(dispatched, "all orders dispatched")
            }
            PipelineEvent::ProcessorStarted { total } => info!(total, "order processor started"),
            PipelineEvent::PickedUp { order_id, destination } => {
                info!(order_id = %order_id, destination = %destination, "picked up")
            }
            PipelineEvent::Advanced { order_id, destination, from, to } => {
                info!(order_id = %order_id, destination = %destination, from = %from, to = %to, "status updated")
            }
            PipelineEvent::Offloaded { order_id, destination, processed, total } => {
                info!(order_id = %order_id, destination = %destination, processed, total, "offloaded")
            }
            PipelineEvent::ProcessorFinished { processed } => {
                info!(processed, "all orders offloaded")
            }
        }
    }
}

/// Keeps every event in memory; handy for tests and post-run summaries.
#[derive(Debug, Default)]
pub struct RecordingSink {
    events: Mutex<Vec<PipelineEvent>>,
}

impl RecordingSink {
    pub fn new() -> Self { Self::default() }
    pub fn events(&self) -> Vec<PipelineEvent> { self.events.lock().clone() }
}

impl EventSink for RecordingSink {
    fn emit(&self, event: &PipelineEvent) { self.events.lock().push(event.clone()); }
}

/// Fans out to several sinks in order.
pub struct Tee(pub Vec<std::sync::Arc<dyn EventSink>>);

impl EventSink for Tee {
    fn emit(&self, event: &PipelineEvent) {
        for s in &self.0 { s.emit(event); }
    }
}
