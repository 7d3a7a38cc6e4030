//! Persistence seam for dependency edges.
//!
//! The graph logic never touches storage directly; it speaks to an
//! `EdgeStore` collaborator. Deployments back this with their database;
//! `InMemoryEdgeStore` serves tests and single-process setups.

use crate::core::venture::VentureId;
use crate::error::{Error, Result};
use crate::orchestration::graph::{DependencyEdge, EdgeId};
use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;

/// CRUD over dependency-edge records.
///
/// Store failures surface as `Error::Store` and propagate to the caller
/// of the specific operation; retry policy belongs to the deployment.
#[async_trait]
pub trait EdgeStore: Send + Sync {
    async fn insert(&self, edge: DependencyEdge) -> Result<DependencyEdge>;

    async fn get(&self, id: &EdgeId) -> Result<Option<DependencyEdge>>;

    async fn update(&self, edge: &DependencyEdge) -> Result<()>;

    async fn delete(&self, id: &EdgeId) -> Result<()>;

    /// Outgoing edges: everything `dependent` depends on.
    async fn edges_from(&self, dependent: &VentureId) -> Result<Vec<DependencyEdge>>;

    /// Incoming edges: everything that depends on `provider`.
    async fn edges_to(&self, provider: &VentureId) -> Result<Vec<DependencyEdge>>;

    /// Snapshot of the full edge set, used by cycle detection.
    async fn all_edges(&self) -> Result<Vec<DependencyEdge>>;
}

/// Reference store keeping edges in process memory.
#[derive(Debug, Default)]
pub struct InMemoryEdgeStore {
    edges: RwLock<HashMap<EdgeId, DependencyEdge>>,
}

impl InMemoryEdgeStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl EdgeStore for InMemoryEdgeStore {
    async fn insert(&self, edge: DependencyEdge) -> Result<DependencyEdge> {
        let mut edges = self.edges.write().await;
        edges.insert(edge.id, edge.clone());
        Ok(edge)
    }

    async fn get(&self, id: &EdgeId) -> Result<Option<DependencyEdge>> {
        Ok(self.edges.read().await.get(id).cloned())
    }

    async fn update(&self, edge: &DependencyEdge) -> Result<()> {
        let mut edges = self.edges.write().await;
        if !edges.contains_key(&edge.id) {
            return Err(Error::EdgeNotFound(edge.id));
        }
        edges.insert(edge.id, edge.clone());
        Ok(())
    }

    async fn delete(&self, id: &EdgeId) -> Result<()> {
        let mut edges = self.edges.write().await;
        if edges.remove(id).is_none() {
            return Err(Error::EdgeNotFound(*id));
        }
        Ok(())
    }

    async fn edges_from(&self, dependent: &VentureId) -> Result<Vec<DependencyEdge>> {
        Ok(self
            .edges
            .read()
            .await
            .values()
            .filter(|e| e.dependent == *dependent)
            .cloned()
            .collect())
    }

    async fn edges_to(&self, provider: &VentureId) -> Result<Vec<DependencyEdge>> {
        Ok(self
            .edges
            .read()
            .await
            .values()
            .filter(|e| e.provider == *provider)
            .cloned()
            .collect())
    }

    async fn all_edges(&self) -> Result<Vec<DependencyEdge>> {
        Ok(self.edges.read().await.values().cloned().collect())
    }
}
