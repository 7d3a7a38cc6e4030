use crate::core::venture::{StageId, VentureId};
use crate::orchestration::graph::EdgeId;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("TOML serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    #[error("No home directory")]
    NoHomeDir,

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Dependency from {dependent} to {provider} would create a cycle")]
    Cycle {
        dependent: VentureId,
        provider: VentureId,
    },

    #[error("Venture {venture} is blocked at stage {stage} by {blocking} unresolved hard dependencies")]
    DependencyBlocked {
        venture: VentureId,
        stage: StageId,
        blocking: usize,
    },

    #[error("Dependency edge not found: {0}")]
    EdgeNotFound(EdgeId),

    #[error("Stage processing failed: {0}")]
    Dispatch(String),

    #[error("Stage processing timed out after {0:?}")]
    Timeout(std::time::Duration),

    #[error("Store error: {0}")]
    Store(String),

    #[error("Scheduler shut down before the dispatch settled")]
    SchedulerGone,
}

pub type Result<T> = std::result::Result<T, Error>;
