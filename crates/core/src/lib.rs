//! Haul core types: shipment orders and their lifecycle.

#![forbid(unsafe_code)]

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

pub mod dataset;
mod status;

pub use status::{next_status, Status, UnknownStatusError};

/// Raw order as it arrives from a data source, before it enters the pipeline.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct OrderRecord {
    #[serde(alias = "order_id")]
    pub id: String,
    pub destination: String,
}

impl OrderRecord {
    pub fn new(id: impl Into<String>, destination: impl Into<String>) -> Self {
        Self { id: id.into(), destination: destination.into() }
    }
}

/// A single forward step applied to an order.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
pub struct Transition {
    pub from: Status,
    pub to: Status,
}

/// A shipment order moving through the pipeline.
///
/// `status` can only change through [`Order::advance`], so it never regresses
/// and never skips a state.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct Order {
    pub id: String,
    pub destination: String,
    status: Status,
    /// Every status held so far, oldest first.
    history: SmallVec<[Status; 4]>,
}

impl Order {
    /// Attach the initial lifecycle state to a record.
    pub fn from_record(rec: OrderRecord) -> Self {
        let mut history = SmallVec::new();
        history.push(Status::INITIAL);
        Self { id: rec.id, destination: rec.destination, status: Status::INITIAL, history }
    }

    pub fn status(&self) -> Status { self.status }
    pub fn history(&self) -> &[Status] { &self.history }
    pub fn is_offloaded(&self) -> bool { self.status.is_terminal() }

    /// Move to the successor state. Returns `None` (and changes nothing) once terminal.
    pub fn advance(&mut self) -> Option<Transition> {
        let to = self.status.next()?;
        let from = std::mem::replace(&mut self.status, to);
        self.history.push(to);
        Some(Transition { from, to })
    }
}

pub mod prelude {
    pub use super::{next_status, Order, OrderRecord, Status, Transition, UnknownStatusError};
}
