//! Order lifecycle state machine.
//!
//! ```text
//! NotShipped ──► InTransit ──► WaitingToOffload ──► Offloaded (terminal)
//! ```
//!
//! [`Status::next`] is the only place a transition is defined; everything that
//! moves an order forward goes through it.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Lifecycle state of a shipment order, in progression order.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Status {
    #[serde(rename = "Not Shipped", alias = "NotShipped")]
    NotShipped,
    #[serde(rename = "In-Transit", alias = "InTransit")]
    InTransit,
    #[serde(rename = "Waiting to Offload", alias = "WaitingToOffload")]
    WaitingToOffload,
    /// **Terminal.**
    #[serde(rename = "Offloaded")]
    Offloaded,
}

impl Status {
    /// Every state, initial first, terminal last.
    pub const ALL: [Status; 4] = [
        Status::NotShipped,
        Status::InTransit,
        Status::WaitingToOffload,
        Status::Offloaded,
    ];

    /// State every new order starts in.
    pub const INITIAL: Status = Status::NotShipped;

    /// Unique successor, or `None` once terminal.
    pub const fn next(self) -> Option<Status> {
        match self {
            Status::NotShipped => Some(Status::InTransit),
            Status::InTransit => Some(Status::WaitingToOffload),
            Status::WaitingToOffload => Some(Status::Offloaded),
            Status::Offloaded => None,
        }
    }

    pub const fn is_terminal(self) -> bool { self.next().is_none() }

    /// Human label, as printed on dispatch boards.
    pub const fn label(self) -> &'static str {
        match self {
            Status::NotShipped => "Not Shipped",
            Status::InTransit => "In-Transit",
            Status::WaitingToOffload => "Waiting to Offload",
            Status::Offloaded => "Offloaded",
        }
    }

    const fn ident(self) -> &'static str {
        match self {
            Status::NotShipped => "NotShipped",
            Status::InTransit => "InTransit",
            Status::WaitingToOffload => "WaitingToOffload",
            Status::Offloaded => "Offloaded",
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.label()) }
}

/// Raised for a status value outside the lifecycle enumeration.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown status: '{status}'")]
pub struct UnknownStatusError {
    pub status: String,
}

impl FromStr for Status {
    type Err = UnknownStatusError;

    /// Accepts the human label (`"In-Transit"`) or the identifier (`"InTransit"`).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Status::ALL
            .into_iter()
            .find(|st| st.label() == s || st.ident() == s)
            .ok_or_else(|| UnknownStatusError { status: s.to_string() })
    }
}

/// String-level transition: successor of `raw`, `None` if `raw` is terminal.
pub fn next_status(raw: &str) -> Result<Option<Status>, UnknownStatusError> {
    let current: Status = raw.parse()?;
    Ok(current.next())
}
