//! keel: a concurrency-bounded orchestration core for ventures
//! progressing through ordered stages.
//!
//! Three components, leaves first:
//!
//! - `core::trigger`: classifies inbound signals into urgency channels
//!   and builds normalized dispatch envelopes.
//! - `orchestration::graph`: cycle-safe directed dependency edges
//!   between ventures, gating stage transitions.
//! - `orchestration::scheduler`: admits stage work under a global
//!   concurrency cap with per-venture exclusivity, draining a
//!   priority-ordered queue as capacity frees.
//!
//! Stage business logic and edge persistence are injected collaborators;
//! the core owns coordination, not execution or storage.

pub mod config;
pub mod core;
pub mod error;
pub mod log;
pub mod orchestration;

pub use self::core::trigger::TriggerType;
pub use self::core::venture::{DispatchOptions, StageId, VentureId};
pub use config::Config;
pub use error::{Error, Result};
pub use orchestration::{
    DependencyGraph, DependencyType, EdgeStore, InMemoryEdgeStore, SchedulerConfig,
    StageProcessor, StageScheduler,
};
