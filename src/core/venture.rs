//! Venture identifiers and per-submission dispatch options.
//!
//! Venture lifecycles are owned by the surrounding platform; this core
//! only observes ids and the ordinal stage a submission targets.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for a venture.
///
/// Uses UUID v4 for generation and provides a short form display
/// for human-readable output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VentureId(pub Uuid);

impl VentureId {
    /// Create a new unique venture identifier.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Return first 8 characters of the UUID for display.
    pub fn short(&self) -> String {
        self.0.to_string()[..8].to_string()
    }
}

impl Default for VentureId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for VentureId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for VentureId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

/// Ordinal identifier of a stage in a venture's progression.
///
/// Stages are totally ordered; dependency gating compares the required
/// stage of an edge against the target stage of a transition.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
#[serde(transparent)]
pub struct StageId(pub u32);

impl StageId {
    /// The stage that follows this one.
    pub fn next(&self) -> Self {
        Self(self.0 + 1)
    }
}

impl std::fmt::Display for StageId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Per-submission knobs carried opaquely through the scheduler to the
/// stage processor.
///
/// `timeout_ms` overrides the configured stage timeout for this unit of
/// work; when neither is set, the processor call is not bounded.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct DispatchOptions {
    pub payload: Option<serde_json::Value>,
    pub timeout_ms: Option<u64>,
}

impl DispatchOptions {
    pub fn with_payload(payload: serde_json::Value) -> Self {
        Self {
            payload: Some(payload),
            timeout_ms: None,
        }
    }
}
