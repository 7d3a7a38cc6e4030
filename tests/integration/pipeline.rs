//! The full control flow from inbound signal to settled dispatch:
//! classify, gate on dependencies, submit, drain.

use crate::fixtures::RecordingProcessor;
use keel::core::trigger::{self, TriggerType};
use keel::orchestration::{DependencyGraph, DependencyType, InMemoryEdgeStore, StageScheduler};
use keel::{Error, SchedulerConfig, StageId, VentureId};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;

#[tokio::test]
async fn test_signal_to_settle() {
    let graph = DependencyGraph::new(Arc::new(InMemoryEdgeStore::new()));
    let processor = Arc::new(RecordingProcessor::new(Duration::from_millis(2)));
    let scheduler = StageScheduler::new(SchedulerConfig::new(2), processor);

    let dependent = VentureId::new();
    let provider = VentureId::new();
    let edge = graph
        .add_dependency(dependent, provider, StageId(3), DependencyType::Hard)
        .await
        .unwrap();

    // An inbound gate failure targets the dependent venture.
    let request = trigger::create_dispatch_request(
        "gate.failed",
        json!({ "venture_id": dependent.to_string() }),
        None,
        None,
    );
    assert_eq!(request.trigger, TriggerType::Event);

    // The transition to stage 3 is gated until the provider delivers.
    let err = graph
        .ensure_unblocked(&dependent, StageId(3))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::DependencyBlocked { blocking: 1, .. }));

    graph.resolve_dependency(&edge.id).await.unwrap();
    graph.ensure_unblocked(&dependent, StageId(3)).await.unwrap();

    let ticket = scheduler.enqueue_request(request, StageId(3)).await.unwrap();
    let outcome = ticket.settled().await.unwrap();
    assert_eq!(outcome.venture_id, dependent);
    assert_eq!(outcome.stage_id, StageId(3));
}

#[tokio::test]
async fn test_unknown_signal_flows_as_planned_work() {
    let processor = Arc::new(RecordingProcessor::new(Duration::from_millis(2)));
    let scheduler = StageScheduler::new(SchedulerConfig::new(1), processor);

    let venture = VentureId::new();
    let request = trigger::create_dispatch_request(
        "totally.unknown",
        json!({ "venture_id": venture.to_string() }),
        None,
        None,
    );
    assert_eq!(request.trigger, TriggerType::PriorityQueue);
    assert_eq!(request.priority, 2);

    let ticket = scheduler.enqueue_request(request, StageId(1)).await.unwrap();
    assert!(ticket.settled().await.is_ok());
}

#[tokio::test]
async fn test_soft_dependency_never_gates() {
    let graph = DependencyGraph::new(Arc::new(InMemoryEdgeStore::new()));
    let dependent = VentureId::new();

    graph
        .add_dependency(dependent, VentureId::new(), StageId(2), DependencyType::Soft)
        .await
        .unwrap();

    let checks = graph.ensure_unblocked(&dependent, StageId(5)).await.unwrap();
    assert_eq!(checks.len(), 1);
    assert!(!checks[0].blocking);
}
