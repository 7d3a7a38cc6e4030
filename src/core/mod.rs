//! Core domain models for the venture orchestration core.
//!
//! This module contains the fundamental data structures used throughout
//! the orchestration system: venture and stage identifiers, dispatch
//! options, and the trigger classifier.

pub mod trigger;
pub mod venture;

pub use trigger::{DispatchRequest, TriggerDefinition, TriggerType};
pub use venture::{DispatchOptions, StageId, VentureId};
