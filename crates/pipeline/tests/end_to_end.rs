#![forbid(unsafe_code)]

use std::sync::Arc;
use std::time::Duration;

use haul_core::{dataset::builtin_orders, OrderRecord, Status};
use haul_pipeline::{Pipeline, PipelineConfig, PipelineEvent, RecordingSink};

fn fast() -> PipelineConfig {
    PipelineConfig {
        dispatch_interval: Duration::from_millis(2),
        stage_interval: Duration::from_millis(1),
        poll_interval: Duration::from_millis(5),
        start_delay: Duration::from_millis(3),
    }
}

fn ids(records: &[OrderRecord]) -> Vec<String> {
    records.iter().map(|r| r.id.clone()).collect()
}

#[test]
fn five_orders_all_offloaded_in_enqueue_order() {
    let sink = Arc::new(RecordingSink::new());
    let pipeline = Pipeline::new(fast()).with_sink(sink.clone());
    let orders = builtin_orders();

    let report = pipeline.run(orders.clone()).unwrap();
    assert_eq!(report.total_orders, 5);
    assert_eq!(report.processed_count, 5);
    assert_eq!(report.dispatched, 5);
    assert_eq!(report.completed, ids(&orders));

    let events = sink.events();

    // Dispatch order == source order.
    let dispatched: Vec<&str> = events
        .iter()
        .filter(|e| matches!(e, PipelineEvent::Dispatched { .. }))
        .filter_map(|e| e.order_id())
        .collect();
    assert_eq!(dispatched, ids(&orders));

    // Every order visits exactly the full lifecycle once.
    for rec in &orders {
        let mut visited = vec![];
        for e in events.iter().filter(|e| e.order_id() == Some(rec.id.as_str())) {
            match e {
                PipelineEvent::Dispatched { status, .. } => visited.push(*status),
                PipelineEvent::Advanced { from, to, .. } => {
                    assert_eq!(visited.last(), Some(from));
                    visited.push(*to);
                }
                _ => {}
            }
        }
        assert_eq!(visited, Status::ALL, "lifecycle of {}", rec.id);
    }

    // An order is fully offloaded before the next is picked up.
    let handling: Vec<(&str, &str)> = events
        .iter()
        .filter_map(|e| match e {
            PipelineEvent::PickedUp { order_id, .. } => Some(("pick", order_id.as_str())),
            PipelineEvent::Offloaded { order_id, .. } => Some(("done", order_id.as_str())),
            _ => None,
        })
        .collect();
    let expected: Vec<(&str, &str)> = orders
        .iter()
        .flat_map(|r| [("pick", r.id.as_str()), ("done", r.id.as_str())])
        .collect();
    assert_eq!(handling, expected);

    let last_offload = events.iter().rev().find_map(|e| match e {
        PipelineEvent::Offloaded { processed, total, .. } => Some((*processed, *total)),
        _ => None,
    });
    assert_eq!(last_offload, Some((5, 5)));
    assert!(events.contains(&PipelineEvent::ProcessorFinished { processed: 5 }));
    assert!(events.contains(&PipelineEvent::GeneratorFinished { dispatched: 5 }));
}

#[test]
fn empty_source_finishes_with_zero_counts() {
    let sink = Arc::new(RecordingSink::new());
    let report = Pipeline::new(PipelineConfig::default()).with_sink(sink.clone()).run(Vec::new()).unwrap();
    assert_eq!((report.total_orders, report.processed_count, report.dispatched), (0, 0, 0));
    assert!(report.completed.is_empty());
    // Default pacing would take seconds; an empty run must not wait for any of it.
    assert!(report.elapsed_ms < 1_000, "took {} ms", report.elapsed_ms);
    assert!(sink.events().contains(&PipelineEvent::GeneratorFinished { dispatched: 0 }));
}

#[test]
fn zero_delays_are_still_correct() {
    let orders: Vec<OrderRecord> =
        (0..200).map(|n| OrderRecord::new(format!("ORD{:04}", n), format!("dock-{}", n % 7))).collect();
    let report = Pipeline::new(PipelineConfig::immediate()).run(orders.clone()).unwrap();
    assert_eq!(report.processed_count, 200);
    assert_eq!(report.completed, ids(&orders));
}

#[test]
fn independent_runs_get_distinct_ids() {
    let pipeline = Pipeline::new(PipelineConfig::immediate());
    let a = pipeline.run(builtin_orders()).unwrap();
    let b = pipeline.run(builtin_orders()).unwrap();
    assert_ne!(a.run_id, b.run_id);
    assert_eq!(a.completed, b.completed);
}

#[test]
fn report_serializes_counts_and_completion_order() {
    let report = Pipeline::new(PipelineConfig::immediate()).run(builtin_orders()).unwrap();
    let v = serde_json::to_value(&report).unwrap();
    assert_eq!(v["total_orders"], 5);
    assert_eq!(v["processed_count"], 5);
    assert_eq!(v["completed"][0], "68862131");
    assert_eq!(v["completed"][4], "68862135");
}
