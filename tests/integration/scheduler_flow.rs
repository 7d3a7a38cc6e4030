//! End-to-end scheduler behavior: capped admission, urgency-ordered
//! draining, and all-settled batch semantics.

use crate::fixtures::{submission, RecordingProcessor};
use keel::orchestration::StageScheduler;
use keel::{DispatchOptions, SchedulerConfig, StageId, VentureId};
use std::sync::Arc;
use std::time::Duration;

async fn wait_for_active(scheduler: &StageScheduler, n: usize) {
    for _ in 0..500 {
        if scheduler.status().await.active_count == n {
            return;
        }
        tokio::time::sleep(Duration::from_millis(2)).await;
    }
    panic!("timed out waiting for {} active dispatches", n);
}

#[tokio::test]
async fn test_cap_two_with_late_arrivals() {
    let processor = Arc::new(RecordingProcessor::new(Duration::from_millis(30)));
    let scheduler = StageScheduler::new(SchedulerConfig::new(2), processor.clone());

    let a = VentureId::new();
    let b = VentureId::new();
    let c = VentureId::new();
    let d = VentureId::new();

    let ta = scheduler
        .enqueue(a, StageId(1), None, DispatchOptions::default())
        .await;
    let tb = scheduler
        .enqueue(b, StageId(1), None, DispatchOptions::default())
        .await;
    wait_for_active(&scheduler, 2).await;

    // C and D arrive while A and B are active. C is planned backlog
    // work; D reacts to a failed gate and outranks it.
    let tc = scheduler
        .enqueue(c, StageId(1), None, DispatchOptions::default())
        .await;
    let td = scheduler
        .enqueue(d, StageId(1), Some("gate.failed"), DispatchOptions::default())
        .await;

    let status = scheduler.status().await;
    assert_eq!(status.active_count, 2);
    assert_eq!(status.pending_count, 2);

    for ticket in [ta, tb, tc, td] {
        ticket.settled().await.unwrap();
    }

    // The urgent arrival dispatched before the earlier planned one, and
    // the cap held throughout.
    let order = processor.dispatch_order();
    assert_eq!(order.len(), 4);
    assert!(order[..2].contains(&a));
    assert!(order[..2].contains(&b));
    assert_eq!(order[2], d);
    assert_eq!(order[3], c);
    assert!(processor.peak_concurrency() <= 2);

    let status = scheduler.status().await;
    assert_eq!(status.totals.dispatched, 4);
    assert_eq!(status.totals.completed, 4);
    assert_eq!(status.active_count, 0);
    assert_eq!(status.pending_count, 0);
}

#[tokio::test]
async fn test_batch_reports_each_item() {
    let processor = Arc::new(RecordingProcessor::new(Duration::from_millis(5)));
    let scheduler = StageScheduler::new(SchedulerConfig::new(3), processor.clone());

    let a = VentureId::new();
    let b = VentureId::new();
    let c = VentureId::new();
    processor.fail_for(b);

    let outcomes = scheduler
        .process_batch(vec![
            submission(a, StageId(2), None),
            submission(b, StageId(2), None),
            submission(c, StageId(2), Some("decision.approved")),
        ])
        .await;

    assert_eq!(outcomes.len(), 3);
    let rejected: Vec<_> = outcomes.iter().filter(|o| !o.is_fulfilled()).collect();
    assert_eq!(rejected.len(), 1);
    assert_eq!(rejected[0].venture_id, b);
    assert!(rejected[0]
        .outcome
        .as_ref()
        .unwrap_err()
        .to_string()
        .contains("stage 2"));

    let status = scheduler.status().await;
    assert_eq!(status.totals.completed, 2);
    assert_eq!(status.totals.failed, 1);
}

#[tokio::test]
async fn test_many_ventures_respect_cap_and_settle() {
    let processor = Arc::new(RecordingProcessor::new(Duration::from_millis(3)));
    let scheduler = StageScheduler::new(SchedulerConfig::new(3), processor.clone());

    let submissions: Vec<_> = (0..15)
        .map(|_| submission(VentureId::new(), StageId(1), None))
        .collect();
    let outcomes = scheduler.process_batch(submissions).await;

    assert_eq!(outcomes.len(), 15);
    assert!(outcomes.iter().all(|o| o.is_fulfilled()));
    assert!(processor.peak_concurrency() <= 3);

    let status = scheduler.status().await;
    assert_eq!(status.totals.completed, 15);
    assert_eq!(status.pending_count, 0);
}
