//! Inter-venture dependency graph.
//!
//! Maintains directed "depends-on" edges between ventures and answers the
//! two questions the orchestration loop cares about: would a proposed
//! edge close a cycle, and which unresolved edges gate a venture's next
//! stage transition. Edges live in an injected `EdgeStore`; this module
//! owns the graph semantics, not the persistence.

use crate::core::venture::{StageId, VentureId};
use crate::error::{Error, Result};
use crate::klog_debug;
use crate::orchestration::store::EdgeStore;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::Mutex;
use uuid::Uuid;

/// Unique identifier for a dependency edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EdgeId(pub Uuid);

impl EdgeId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for EdgeId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for EdgeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Whether an edge blocks the dependent venture's progression.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum DependencyType {
    /// Blocking: the dependent cannot cross the required stage until resolved.
    #[default]
    Hard,
    /// Advisory only, never blocks a transition.
    Soft,
}

impl std::fmt::Display for DependencyType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DependencyType::Hard => write!(f, "hard"),
            DependencyType::Soft => write!(f, "soft"),
        }
    }
}

/// Resolution state of an edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum EdgeStatus {
    #[default]
    Pending,
    Resolved,
}

/// A directed constraint: `dependent` needs `provider` to have reached
/// `required_stage` before crossing it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DependencyEdge {
    pub id: EdgeId,
    pub dependent: VentureId,
    pub provider: VentureId,
    pub required_stage: StageId,
    pub dependency_type: DependencyType,
    pub status: EdgeStatus,
    pub created_at: DateTime<Utc>,
    pub resolved_at: Option<DateTime<Utc>>,
}

impl DependencyEdge {
    pub fn new(
        dependent: VentureId,
        provider: VentureId,
        required_stage: StageId,
        dependency_type: DependencyType,
    ) -> Self {
        Self {
            id: EdgeId::new(),
            dependent,
            provider,
            required_stage,
            dependency_type,
            status: EdgeStatus::Pending,
            created_at: Utc::now(),
            resolved_at: None,
        }
    }
}

/// One edge normalized from a specific venture's point of view.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EdgeSummary {
    pub edge_id: EdgeId,
    pub counterpart: VentureId,
    pub required_stage: StageId,
    pub dependency_type: DependencyType,
    pub status: EdgeStatus,
    pub resolved_at: Option<DateTime<Utc>>,
}

impl EdgeSummary {
    fn outgoing(edge: &DependencyEdge) -> Self {
        Self {
            edge_id: edge.id,
            counterpart: edge.provider,
            required_stage: edge.required_stage,
            dependency_type: edge.dependency_type,
            status: edge.status,
            resolved_at: edge.resolved_at,
        }
    }

    fn incoming(edge: &DependencyEdge) -> Self {
        Self {
            edge_id: edge.id,
            counterpart: edge.dependent,
            required_stage: edge.required_stage,
            dependency_type: edge.dependency_type,
            status: edge.status,
            resolved_at: edge.resolved_at,
        }
    }
}

/// Both directions of a venture's dependency picture.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VentureDependencies {
    /// Edges where this venture is the dependent.
    pub depends_on: Vec<EdgeSummary>,
    /// Edges where this venture is the provider.
    pub provides_to: Vec<EdgeSummary>,
}

/// One unresolved edge gating a stage transition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DependencyCheck {
    pub edge_id: EdgeId,
    pub provider: VentureId,
    pub required_stage: StageId,
    pub dependency_type: DependencyType,
    /// Only hard dependencies block; soft entries are informational.
    pub blocking: bool,
}

/// Cycle-safe dependency graph over an injected edge store.
pub struct DependencyGraph<S> {
    store: Arc<S>,
    /// Serializes add operations so two concurrent adds cannot jointly
    /// close a cycle that neither one alone would have created.
    write_lock: Mutex<()>,
}

impl<S: EdgeStore> DependencyGraph<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self {
            store,
            write_lock: Mutex::new(()),
        }
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    /// Both directions of a venture's dependency picture, read via two
    /// concurrent store calls. Fails if either read fails.
    pub async fn get_dependency_graph(&self, venture: &VentureId) -> Result<VentureDependencies> {
        let (outgoing, incoming) = tokio::join!(
            self.store.edges_from(venture),
            self.store.edges_to(venture)
        );
        let outgoing = outgoing?;
        let incoming = incoming?;

        Ok(VentureDependencies {
            depends_on: outgoing.iter().map(EdgeSummary::outgoing).collect(),
            provides_to: incoming.iter().map(EdgeSummary::incoming).collect(),
        })
    }

    /// Would adding `dependent -> provider` close a cycle?
    ///
    /// Walks existing depends-on edges from `provider` with an explicit
    /// stack (no recursion, so graph depth never threatens the call
    /// stack). Reaching `dependent` means the proposed edge would close
    /// a loop. O(V+E) over one snapshot of the edge set.
    pub async fn would_create_cycle(
        &self,
        dependent: &VentureId,
        provider: &VentureId,
    ) -> Result<bool> {
        if dependent == provider {
            return Ok(true);
        }

        let edges = self.store.all_edges().await?;
        let mut adjacency: HashMap<VentureId, Vec<VentureId>> = HashMap::new();
        for edge in &edges {
            adjacency.entry(edge.dependent).or_default().push(edge.provider);
        }

        let mut stack = vec![*provider];
        let mut visited: HashSet<VentureId> = HashSet::new();
        while let Some(current) = stack.pop() {
            if current == *dependent {
                return Ok(true);
            }
            if !visited.insert(current) {
                continue;
            }
            if let Some(providers) = adjacency.get(&current) {
                stack.extend(providers.iter().copied());
            }
        }
        Ok(false)
    }

    /// Unresolved edges gating `venture`'s transition to `target_stage`.
    ///
    /// Returns every outgoing pending edge whose required stage is at or
    /// below the target; only hard edges are flagged blocking.
    pub async fn check_dependencies(
        &self,
        venture: &VentureId,
        target_stage: StageId,
    ) -> Result<Vec<DependencyCheck>> {
        let outgoing = self.store.edges_from(venture).await?;
        Ok(outgoing
            .iter()
            .filter(|e| e.required_stage <= target_stage && e.status != EdgeStatus::Resolved)
            .map(|e| DependencyCheck {
                edge_id: e.id,
                provider: e.provider,
                required_stage: e.required_stage,
                dependency_type: e.dependency_type,
                blocking: e.dependency_type == DependencyType::Hard,
            })
            .collect())
    }

    /// Like `check_dependencies`, but fails when any hard edge gates the
    /// transition. Callers run this before submitting to the scheduler.
    pub async fn ensure_unblocked(
        &self,
        venture: &VentureId,
        target_stage: StageId,
    ) -> Result<Vec<DependencyCheck>> {
        let checks = self.check_dependencies(venture, target_stage).await?;
        let blocking = checks.iter().filter(|c| c.blocking).count();
        if blocking > 0 {
            return Err(Error::DependencyBlocked {
                venture: *venture,
                stage: target_stage,
                blocking,
            });
        }
        Ok(checks)
    }

    /// Insert a new pending edge after proving it closes no cycle.
    ///
    /// The cycle check and the insert happen under one internal lock;
    /// state is left unchanged on rejection.
    pub async fn add_dependency(
        &self,
        dependent: VentureId,
        provider: VentureId,
        required_stage: StageId,
        dependency_type: DependencyType,
    ) -> Result<DependencyEdge> {
        let _guard = self.write_lock.lock().await;

        if self.would_create_cycle(&dependent, &provider).await? {
            klog_debug!(
                "dependency rejected: {} -> {} would create a cycle",
                dependent.short(),
                provider.short()
            );
            return Err(Error::Cycle {
                dependent,
                provider,
            });
        }

        let edge = DependencyEdge::new(dependent, provider, required_stage, dependency_type);
        let edge = self.store.insert(edge).await?;
        klog_debug!(
            "dependency added: {} -> {} at stage {} ({})",
            dependent.short(),
            provider.short(),
            required_stage,
            edge.dependency_type
        );
        Ok(edge)
    }

    /// Mark an edge resolved.
    ///
    /// Idempotent: resolving an already-resolved edge returns it
    /// unchanged and keeps the original resolved-at timestamp.
    pub async fn resolve_dependency(&self, edge_id: &EdgeId) -> Result<DependencyEdge> {
        let mut edge = self
            .store
            .get(edge_id)
            .await?
            .ok_or(Error::EdgeNotFound(*edge_id))?;

        if edge.status == EdgeStatus::Resolved {
            return Ok(edge);
        }

        edge.status = EdgeStatus::Resolved;
        edge.resolved_at = Some(Utc::now());
        self.store.update(&edge).await?;
        Ok(edge)
    }

    /// Delete an edge permanently.
    pub async fn remove_dependency(&self, edge_id: &EdgeId) -> Result<()> {
        self.store.delete(edge_id).await
    }
}
