//! Orchestration layer for the venture core.
//!
//! This module provides the components that coordinate venture
//! progression: the concurrency-bounded stage scheduler, the
//! inter-venture dependency graph, and the collaborator seams they
//! depend on (stage processing and edge persistence).

pub mod graph;
pub mod processor;
pub mod scheduler;
pub mod store;

pub use graph::{
    DependencyCheck, DependencyEdge, DependencyGraph, DependencyType, EdgeId, EdgeStatus,
    EdgeSummary, VentureDependencies,
};
pub use processor::{StageContext, StageOutcome, StageProcessor};
pub use scheduler::{
    BatchOutcome, DispatchTicket, DispatchTotals, DrainPolicy, SchedulerConfig, SchedulerStatus,
    StageScheduler, StageSubmission,
};
pub use store::{EdgeStore, InMemoryEdgeStore};
