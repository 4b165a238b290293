//! Built-in demo dataset.

use crate::OrderRecord;

const BUILTIN: [(&str, &str); 5] = [
    ("68862131", "Cairo"),
    ("68862132", "Dubai"),
    ("68862133", "Jeddah"),
    ("68862134", "Ryadh"),
    ("68862135", "Luxor"),
];

/// Five orders with sequential ids and distinct destinations.
pub fn builtin_orders() -> Vec<OrderRecord> {
    BUILTIN.iter().map(|(id, dest)| OrderRecord::new(*id, *dest)).collect()
}
