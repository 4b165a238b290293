//! Console renderers for pipeline events.

use haul_pipeline::{EventSink, PipelineEvent};

pub const SEPARATOR: &str = "-------------------------------------------------------";

/// Human-readable board lines for one event.
pub fn render(event: &PipelineEvent) -> String {
    match event {
        PipelineEvent::GeneratorStarted => format!("{SEPARATOR}\n ORDER GENERATOR STARTED\n{SEPARATOR}"),
        PipelineEvent::Dispatched { order_id, destination, status } => {
            format!("[DISPATCH] ORD-{} | {} | Status: {}", order_id, destination, status)
        }
        PipelineEvent::GeneratorFinished { dispatched } => {
            format!("\n[GENERATOR] All {} orders dispatched.\n", dispatched)
        }
        PipelineEvent::ProcessorStarted { .. } => format!("{SEPARATOR}\n ORDER PROCESSOR STARTED\n{SEPARATOR}"),
        PipelineEvent::PickedUp { order_id, destination } => {
            format!("\n[PROCESS ] Picked up ORD-{} -> destination: {}", order_id, destination)
        }
        PipelineEvent::Advanced { order_id, destination, to, .. } => {
            format!("[UPDATE] ORD-{} | {} | Status: {}", order_id, destination, to)
        }
        PipelineEvent::Offloaded { order_id, destination, .. } => {
            format!("[DONE    ] ORD-{} successfully offloaded at {}.\n{SEPARATOR}", order_id, destination)
        }
        PipelineEvent::ProcessorFinished { processed } => {
            format!("\nAll {} orders have been delivered and offloaded.", processed)
        }
    }
}

pub struct HumanSink;

impl EventSink for HumanSink {
    fn emit(&self, event: &PipelineEvent) { println!("{}", render(event)); }
}

/// One JSON object per line.
pub struct JsonLinesSink;

impl EventSink for JsonLinesSink {
    fn emit(&self, event: &PipelineEvent) {
        match serde_json::to_string(event) {
            Ok(line) => println!("{}", line),
            Err(e) => tracing::warn!(error = %e, "failed to encode event"),
        }
    }
}
