use std::sync::Arc;
use std::time::Duration;

use haul_core::{Order, OrderRecord};
use haul_store::OrderBuffer;
use metrics::counter;
use tracing::debug;

use crate::events::{EventSink, PipelineEvent};
use crate::{PipelineError, RunSignal};

/// Producer half: turns records into orders and feeds the buffer at a fixed cadence.
pub struct Generator {
    buffer: Arc<OrderBuffer>,
    sink: Arc<dyn EventSink>,
    signal: RunSignal,
    interval: Duration,
}

/// Closes the buffer however the generator exits, unwinding included, so the
/// processor never waits on a producer that is gone.
struct CloseOnDrop<'a>(&'a OrderBuffer);

impl Drop for CloseOnDrop<'_> {
    fn drop(&mut self) { self.0.close(); }
}

impl Generator {
    pub fn new(buffer: Arc<OrderBuffer>, sink: Arc<dyn EventSink>, signal: RunSignal, interval: Duration) -> Self {
        Self { buffer, sink, signal, interval }
    }

    /// Dispatch every record in source order. Returns how many were enqueued.
    pub fn run<I>(&self, source: I) -> Result<usize, PipelineError>
    where
        I: IntoIterator<Item = OrderRecord>,
    {
        let _close = CloseOnDrop(&self.buffer);
        self.sink.emit(&PipelineEvent::GeneratorStarted);

        let mut dispatched = 0usize;
        let mut source = source.into_iter().peekable();
        while let Some(rec) = source.next() {
            self.signal.check()?;
            let order = Order::from_record(rec);
            self.sink.emit(&PipelineEvent::dispatched(&order));
            debug!(order_id = %order.id, depth = self.buffer.len(), "enqueue");
            self.buffer.enqueue(order);
            dispatched += 1;
            counter!("haul_orders_dispatched_total", 1u64);
            // Nothing left to pace once the last record is out.
            if source.peek().is_some() {
                self.signal.pause(self.interval)?;
            }
        }

        self.sink.emit(&PipelineEvent::GeneratorFinished { dispatched });
        Ok(dispatched)
    }
}
