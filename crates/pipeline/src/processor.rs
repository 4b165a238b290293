use std::sync::Arc;
use std::time::{Duration, Instant};

use haul_core::Order;
use haul_store::OrderBuffer;
use metrics::{counter, histogram};
use tracing::{debug, warn};

use crate::events::{EventSink, PipelineEvent};
use crate::{PipelineConfig, PipelineError, RunSignal};

/// Shortest idle wait, so a zero poll interval does not spin.
const MIN_IDLE_WAIT: Duration = Duration::from_millis(1);

/// Consumer half: takes orders off the buffer one at a time and drives each to
/// its terminal status before taking the next.
pub struct Processor {
    buffer: Arc<OrderBuffer>,
    sink: Arc<dyn EventSink>,
    signal: RunSignal,
    config: PipelineConfig,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProcessorOutcome {
    pub processed: usize,
    /// Order ids in the order they reached the terminal status.
    pub completed: Vec<String>,
}

impl Processor {
    pub fn new(buffer: Arc<OrderBuffer>, sink: Arc<dyn EventSink>, signal: RunSignal, config: PipelineConfig) -> Self {
        Self { buffer, sink, signal, config }
    }

    /// Process until `total` orders are offloaded.
    ///
    /// Fails with [`PipelineError::Starved`] if the buffer is closed and drained
    /// first, and with [`PipelineError::Cancelled`] at the next pause after the
    /// run signal fires.
    pub fn run(&self, total: usize) -> Result<ProcessorOutcome, PipelineError> {
        let mut out = ProcessorOutcome { processed: 0, completed: Vec::with_capacity(total) };
        if total == 0 {
            self.sink.emit(&PipelineEvent::ProcessorStarted { total });
            self.sink.emit(&PipelineEvent::ProcessorFinished { processed: 0 });
            return Ok(out);
        }

        self.signal.pause(self.config.start_delay)?;
        self.sink.emit(&PipelineEvent::ProcessorStarted { total });

        let idle_wait = self.config.poll_interval.max(MIN_IDLE_WAIT);
        while out.processed < total {
            self.signal.check()?;
            let Some(order) = self.buffer.dequeue_timeout(idle_wait) else {
                self.signal.check()?;
                if self.buffer.is_closed() && self.buffer.is_empty() {
                    warn!(processed = out.processed, total, "buffer closed before all orders arrived");
                    return Err(PipelineError::Starved { processed: out.processed, total });
                }
                continue;
            };

            let order = self.drive(order)?;
            out.processed += 1;
            self.sink.emit(&PipelineEvent::Offloaded {
                order_id: order.id.clone(),
                destination: order.destination.clone(),
                processed: out.processed,
                total,
            });
            out.completed.push(order.id);
        }

        self.sink.emit(&PipelineEvent::ProcessorFinished { processed: out.processed });
        Ok(out)
    }

    /// Walk one order through every remaining transition.
    fn drive(&self, mut order: Order) -> Result<Order, PipelineError> {
        let started = Instant::now();
        self.sink.emit(&PipelineEvent::picked_up(&order));
        debug!(order_id = %order.id, status = %order.status(), "drive");

        while let Some(step) = order.advance() {
            self.sink.emit(&PipelineEvent::Advanced {
                order_id: order.id.clone(),
                destination: order.destination.clone(),
                from: step.from,
                to: step.to,
            });
            self.signal.pause(self.config.stage_interval)?;
        }

        counter!("haul_orders_offloaded_total", 1u64);
        histogram!("haul_order_lifecycle_ms", started.elapsed().as_secs_f64() * 1000.0);
        Ok(order)
    }
}
