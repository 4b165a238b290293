#![forbid(unsafe_code)]

use haul_core::{dataset::builtin_orders, Order, Status};
use haul_store::{Buffer, OrderBuffer};

#[test]
fn dequeue_order_matches_enqueue_order() {
    let b = Buffer::new();
    for n in 0..100u32 { b.enqueue(n); }
    assert_eq!(b.len(), 100);
    let out: Vec<u32> = std::iter::from_fn(|| b.dequeue()).collect();
    assert_eq!(out, (0..100).collect::<Vec<_>>());
    assert!(b.is_empty());
}

#[test]
fn interleaved_ops_keep_fifo() {
    let b = Buffer::new();
    b.enqueue('a');
    b.enqueue('b');
    assert_eq!(b.dequeue(), Some('a'));
    b.enqueue('c');
    assert_eq!(b.dequeue(), Some('b'));
    assert_eq!(b.dequeue(), Some('c'));
    assert_eq!(b.dequeue(), None);

    let s = b.stats();
    assert_eq!((s.len, s.enqueued, s.dequeued), (0, 3, 3));
}

#[test]
fn orders_come_back_untouched() {
    let b = OrderBuffer::new();
    for rec in builtin_orders() { b.enqueue(Order::from_record(rec)); }

    let ids: Vec<String> = std::iter::from_fn(|| b.dequeue())
        .inspect(|o| assert_eq!(o.status(), Status::NotShipped))
        .map(|o| o.id)
        .collect();
    assert_eq!(ids, ["68862131", "68862132", "68862133", "68862134", "68862135"]);
}
