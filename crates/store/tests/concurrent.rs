#![forbid(unsafe_code)]

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use haul_store::Buffer;

const PRODUCERS: u64 = 4;
const PER_PRODUCER: u64 = 2_000;

#[test]
fn many_producers_many_consumers_lose_and_duplicate_nothing() {
    let buf: Arc<Buffer<u64>> = Arc::new(Buffer::new());
    let done = Arc::new(AtomicBool::new(false));

    // Watcher: depth must always equal enqueued - dequeued.
    let watcher = {
        let buf = Arc::clone(&buf);
        let done = Arc::clone(&done);
        thread::spawn(move || {
            let mut samples = 0u32;
            while !done.load(Ordering::Acquire) {
                let s = buf.stats();
                assert!(s.dequeued <= s.enqueued);
                assert_eq!(s.len as u64, s.enqueued - s.dequeued);
                samples += 1;
                thread::yield_now();
            }
            samples
        })
    };

    let producers: Vec<_> = (0..PRODUCERS)
        .map(|p| {
            let buf = Arc::clone(&buf);
            thread::spawn(move || {
                for i in 0..PER_PRODUCER { buf.enqueue(p * PER_PRODUCER + i); }
            })
        })
        .collect();

    let consumers: Vec<_> = (0..3)
        .map(|_| {
            let buf = Arc::clone(&buf);
            thread::spawn(move || {
                let mut got = Vec::new();
                while let Some(v) = buf.dequeue_timeout(Duration::from_secs(5)) { got.push(v); }
                got
            })
        })
        .collect();

    for p in producers { p.join().unwrap(); }
    buf.close();

    let mut seen = HashSet::new();
    let mut total = 0u64;
    for c in consumers {
        let got = c.join().unwrap();
        // Each consumer sees every producer's items in that producer's order.
        for p in 0..PRODUCERS {
            let mine: Vec<u64> = got.iter().copied().filter(|v| v / PER_PRODUCER == p).collect();
            assert!(mine.windows(2).all(|w| w[0] < w[1]), "per-producer order broken");
        }
        for v in got {
            assert!(seen.insert(v), "item {} dequeued twice", v);
            total += 1;
        }
    }
    done.store(true, Ordering::Release);
    assert!(watcher.join().unwrap() > 0);

    assert_eq!(total, PRODUCERS * PER_PRODUCER);
    let s = buf.stats();
    assert_eq!((s.len, s.enqueued, s.dequeued), (0, total, total));
}

#[test]
fn blocked_consumer_wakes_on_enqueue() {
    let buf: Arc<Buffer<&'static str>> = Arc::new(Buffer::new());
    let consumer = {
        let buf = Arc::clone(&buf);
        thread::spawn(move || buf.dequeue_timeout(Duration::from_secs(10)))
    };
    thread::sleep(Duration::from_millis(20));
    buf.enqueue("order");
    assert_eq!(consumer.join().unwrap(), Some("order"));
}

#[test]
fn close_releases_every_waiter() {
    let buf: Arc<Buffer<u8>> = Arc::new(Buffer::new());
    let waiters: Vec<_> = (0..4)
        .map(|_| {
            let buf = Arc::clone(&buf);
            thread::spawn(move || buf.dequeue_timeout(Duration::from_secs(30)))
        })
        .collect();
    thread::sleep(Duration::from_millis(20));
    buf.close();
    for w in waiters { assert_eq!(w.join().unwrap(), None); }
}
