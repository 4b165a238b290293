//! Haul pipeline: a generator thread feeds shipment orders into a shared
//! buffer while a processor thread drives each one to `Offloaded`.
//!
//! ```text
//! records ─► Generator ─► OrderBuffer ─► Processor ─► RunReport
//!               │                          │
//!               └──────── RunSignal ───────┘   (cancel on first failure)
//! ```

#![forbid(unsafe_code)]

use std::any::Any;
use std::sync::Arc;
use std::thread;
use std::time::Instant;

use chrono::{DateTime, Utc};
use haul_core::{OrderRecord, UnknownStatusError};
use haul_store::OrderBuffer;
use serde::Serialize;
use tracing::{error, info, info_span};
use uuid::Uuid;

mod config;
pub mod events;
mod generator;
mod processor;
mod signal;

pub use config::PipelineConfig;
pub use events::{EventSink, PipelineEvent, RecordingSink, Tee, TracingSink};
pub use generator::Generator;
pub use processor::{Processor, ProcessorOutcome};
pub use signal::RunSignal;

pub const GENERATOR_THREAD: &str = "order-generator";
pub const PROCESSOR_THREAD: &str = "order-processor";

#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// Not raised by [`Pipeline::run`]; orders carry a typed [`Status`](haul_core::Status).
    /// Lets callers that parse status strings use `?` into this error.
    #[error(transparent)]
    UnknownStatus(#[from] UnknownStatusError),
    #[error("pipeline cancelled")]
    Cancelled,
    #[error("buffer closed after {processed} of {total} orders; producer stopped early")]
    Starved { processed: usize, total: usize },
    #[error("thread {thread} panicked: {message}")]
    ThreadPanicked { thread: &'static str, message: String },
    #[error("spawning thread: {0}")]
    Spawn(#[from] std::io::Error),
}

/// Summary of one completed run.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub run_id: Uuid,
    pub total_orders: usize,
    pub dispatched: usize,
    pub processed_count: usize,
    /// Order ids in completion order.
    pub completed: Vec<String>,
    pub started_at: DateTime<Utc>,
    pub elapsed_ms: u64,
}

/// Pipeline driver. Each [`run`](Self::run) builds its own buffer, so one
/// `Pipeline` (or several) can be run repeatedly in the same process.
pub struct Pipeline {
    config: PipelineConfig,
    sink: Arc<dyn EventSink>,
    signal: RunSignal,
}

impl Pipeline {
    pub fn new(config: PipelineConfig) -> Self {
        Self { config, sink: Arc::new(TracingSink), signal: RunSignal::new() }
    }

    pub fn with_sink(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.sink = sink;
        self
    }

    /// Handle that cancels the current (and any later) run of this pipeline.
    /// A failure inside one run cancels only that run, never this handle.
    pub fn signal(&self) -> RunSignal { self.signal.clone() }

    pub fn config(&self) -> &PipelineConfig { &self.config }

    /// Run the generator and processor on their own threads until every order
    /// is offloaded. A failure on either side cancels the other.
    pub fn run(&self, orders: Vec<OrderRecord>) -> Result<RunReport, PipelineError> {
        let run_id = Uuid::new_v4();
        let span = info_span!("pipeline", %run_id);
        let _enter = span.enter();

        let total = orders.len();
        let started_at = Utc::now();
        let clock = Instant::now();
        let buffer = Arc::new(OrderBuffer::new());
        let signal = self.signal.child();
        info!(total, "pipeline starting");

        let generator = Generator::new(buffer.clone(), self.sink.clone(), signal.clone(), self.config.dispatch_interval);
        let processor = Processor::new(buffer.clone(), self.sink.clone(), signal.clone(), self.config);

        let gen_handle = thread::Builder::new().name(GENERATOR_THREAD.into()).spawn({
            let span = span.clone();
            let abort = AbortOnFailure::new(&signal, &buffer);
            move || span.in_scope(|| abort.watch(|| generator.run(orders)))
        })?;
        let proc_handle = thread::Builder::new().name(PROCESSOR_THREAD.into()).spawn({
            let span = span.clone();
            let abort = AbortOnFailure::new(&signal, &buffer);
            move || span.in_scope(|| abort.watch(|| processor.run(total)))
        });
        let proc_handle = match proc_handle {
            Ok(h) => h,
            Err(e) => {
                // Generator is already running; stop it before reporting.
                signal.cancel();
                let _ = gen_handle.join();
                return Err(PipelineError::Spawn(e));
            }
        };

        let gen_res = join(GENERATOR_THREAD, gen_handle);
        let proc_res = join(PROCESSOR_THREAD, proc_handle);

        let (dispatched, outcome) = match (gen_res, proc_res) {
            (Ok(d), Ok(o)) => (d, o),
            (g, p) => {
                let err = first_cause(g.err(), p.err());
                error!(error = %err, "pipeline failed");
                return Err(err);
            }
        };

        let report = RunReport {
            run_id,
            total_orders: total,
            dispatched,
            processed_count: outcome.processed,
            completed: outcome.completed,
            started_at,
            elapsed_ms: clock.elapsed().as_millis() as u64,
        };
        info!(processed = report.processed_count, elapsed_ms = report.elapsed_ms, "pipeline finished");
        Ok(report)
    }
}

/// Armed for the lifetime of a worker closure; on error or unwind it cancels
/// the run's own signal and closes the buffer so the sibling thread stops.
struct AbortOnFailure {
    signal: RunSignal,
    buffer: Arc<OrderBuffer>,
    armed: bool,
}

impl AbortOnFailure {
    fn new(signal: &RunSignal, buffer: &Arc<OrderBuffer>) -> Self {
        Self { signal: signal.clone(), buffer: buffer.clone(), armed: true }
    }

    fn watch<T>(mut self, f: impl FnOnce() -> Result<T, PipelineError>) -> Result<T, PipelineError> {
        let res = f();
        self.armed = res.is_err();
        res
    }
}

impl Drop for AbortOnFailure {
    fn drop(&mut self) {
        if self.armed {
            self.signal.cancel();
            self.buffer.close();
        }
    }
}

fn join<T>(thread: &'static str, handle: thread::JoinHandle<Result<T, PipelineError>>) -> Result<T, PipelineError> {
    handle
        .join()
        .unwrap_or_else(|payload| Err(PipelineError::ThreadPanicked { thread, message: panic_message(payload.as_ref()) }))
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

/// Prefer the error that caused the abort over the `Cancelled` it triggered
/// in the sibling.
fn first_cause(producer: Option<PipelineError>, consumer: Option<PipelineError>) -> PipelineError {
    match (producer, consumer) {
        (Some(PipelineError::Cancelled), Some(other)) => other,
        (Some(e), _) | (None, Some(e)) => e,
        (None, None) => PipelineError::Cancelled,
    }
}
