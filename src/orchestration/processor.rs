//! Stage-processing collaborator seam.
//!
//! The scheduler is agnostic to what a stage actually does; the owning
//! deployment injects a `StageProcessor` at construction time and the
//! scheduler invokes it exactly once per dispatch.

use crate::core::venture::{DispatchOptions, StageId, VentureId};
use crate::error::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Context handed to the processor for one dispatch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageContext {
    pub venture_id: VentureId,
    pub stage_id: StageId,
    /// Fresh id stamped per dispatch, for correlating collaborator logs.
    pub correlation_id: Uuid,
    pub options: DispatchOptions,
}

impl StageContext {
    pub fn new(venture_id: VentureId, stage_id: StageId, options: DispatchOptions) -> Self {
        Self {
            venture_id,
            stage_id,
            correlation_id: Uuid::new_v4(),
            options,
        }
    }
}

/// Result of one stage-processing call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageOutcome {
    pub venture_id: VentureId,
    pub stage_id: StageId,
    pub payload: serde_json::Value,
    pub completed_at: DateTime<Utc>,
}

impl StageOutcome {
    pub fn new(venture_id: VentureId, stage_id: StageId, payload: serde_json::Value) -> Self {
        Self {
            venture_id,
            stage_id,
            payload,
            completed_at: Utc::now(),
        }
    }
}

/// External collaborator that executes the business logic of one stage.
#[async_trait]
pub trait StageProcessor: Send + Sync {
    /// Execute stage processing for a venture. May fail with any error;
    /// the scheduler records the failure and propagates it only to the
    /// waiter for this unit of work.
    async fn process(&self, ctx: &StageContext) -> Result<StageOutcome>;
}
