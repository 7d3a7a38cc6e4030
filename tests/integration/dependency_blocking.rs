//! Dependency graph behavior under the conditions the orchestration
//! loop actually produces: cycle attempts, stage gating, and concurrent
//! edge additions.

use keel::orchestration::graph::DependencyEdge;
use keel::orchestration::{DependencyGraph, DependencyType, EdgeStore, InMemoryEdgeStore};
use keel::{Error, StageId, VentureId};
use proptest::prelude::*;
use std::collections::HashMap;
use std::sync::Arc;

fn graph() -> DependencyGraph<InMemoryEdgeStore> {
    DependencyGraph::new(Arc::new(InMemoryEdgeStore::new()))
}

#[tokio::test]
async fn test_cycle_rejected_and_edges_unchanged() {
    let g = graph();
    let a = VentureId::new();
    let b = VentureId::new();
    let c = VentureId::new();

    g.add_dependency(a, b, StageId(2), DependencyType::Hard)
        .await
        .unwrap();
    g.add_dependency(b, c, StageId(2), DependencyType::Hard)
        .await
        .unwrap();

    let err = g
        .add_dependency(c, a, StageId(2), DependencyType::Hard)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Cycle { .. }));

    let edges = g.store().all_edges().await.unwrap();
    assert_eq!(edges.len(), 2);
    assert!(!edges.iter().any(|e| e.dependent == c));
}

#[tokio::test]
async fn test_stage_gating_reports_hard_and_soft() {
    let g = graph();
    let v = VentureId::new();
    let hard_provider = VentureId::new();
    let soft_provider = VentureId::new();

    g.add_dependency(v, hard_provider, StageId(3), DependencyType::Hard)
        .await
        .unwrap();
    g.add_dependency(v, soft_provider, StageId(4), DependencyType::Soft)
        .await
        .unwrap();

    let checks = g.check_dependencies(&v, StageId(5)).await.unwrap();
    assert_eq!(checks.len(), 2);
    for check in &checks {
        if check.provider == hard_provider {
            assert!(check.blocking);
        } else {
            assert_eq!(check.provider, soft_provider);
            assert!(!check.blocking);
        }
    }
}

#[tokio::test]
async fn test_concurrent_opposing_adds_cannot_close_cycle() {
    let g = graph();
    let a = VentureId::new();
    let b = VentureId::new();

    let (first, second) = tokio::join!(
        g.add_dependency(a, b, StageId(1), DependencyType::Hard),
        g.add_dependency(b, a, StageId(1), DependencyType::Hard),
    );

    // Exactly one side wins; the other is rejected as a cycle.
    assert_ne!(first.is_ok(), second.is_ok());
    assert_eq!(g.store().all_edges().await.unwrap().len(), 1);
}

/// Kahn's algorithm over the stored edge set.
fn is_acyclic(edges: &[DependencyEdge]) -> bool {
    let mut adjacency: HashMap<VentureId, Vec<VentureId>> = HashMap::new();
    let mut indegree: HashMap<VentureId, usize> = HashMap::new();
    for edge in edges {
        adjacency.entry(edge.dependent).or_default().push(edge.provider);
        *indegree.entry(edge.provider).or_insert(0) += 1;
        indegree.entry(edge.dependent).or_insert(0);
    }

    let mut ready: Vec<VentureId> = indegree
        .iter()
        .filter(|(_, degree)| **degree == 0)
        .map(|(v, _)| *v)
        .collect();
    let mut visited = 0usize;
    while let Some(v) = ready.pop() {
        visited += 1;
        for next in adjacency.get(&v).into_iter().flatten() {
            let degree = indegree.get_mut(next).expect("all nodes have a degree");
            *degree -= 1;
            if *degree == 0 {
                ready.push(*next);
            }
        }
    }
    visited == indegree.len()
}

proptest! {
    /// Randomized edge-addition sequences never leave a back-edge in the
    /// graph: every add either passes the cycle check or changes nothing.
    #[test]
    fn prop_graph_stays_acyclic(
        attempts in proptest::collection::vec((0usize..8, 0usize..8), 0..40)
    ) {
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .expect("runtime");
        rt.block_on(async move {
            let nodes: Vec<VentureId> = (0..8).map(|_| VentureId::new()).collect();
            let g = graph();
            for (dependent, provider) in attempts {
                let _ = g
                    .add_dependency(
                        nodes[dependent],
                        nodes[provider],
                        StageId(1),
                        DependencyType::Hard,
                    )
                    .await;
            }
            let edges = g.store().all_edges().await.expect("edge snapshot");
            prop_assert!(is_acyclic(&edges));
            Ok(())
        })?;
    }
}
