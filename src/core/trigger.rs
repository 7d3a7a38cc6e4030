//! Trigger classification for inbound orchestration signals.
//!
//! Every inbound event is routed into one of three urgency channels:
//! event-driven (immediate), round-driven (scheduled cadence work such as
//! ops cycles and portfolio sweeps), or priority-queue (planned backlog).
//! Classification is a pure lookup over static tables; there is no
//! internal state.
//!
//! Unknown event types deliberately fall through to the priority-queue
//! channel: an unrecognized signal must never masquerade as critical.

use crate::core::venture::VentureId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The three urgency channels a signal can be routed into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TriggerType {
    /// Event-driven: reacts immediately to a state change.
    #[serde(rename = "EVENT")]
    Event,
    /// Round-driven: cadence work executed on a schedule.
    #[serde(rename = "ROUND")]
    Round,
    /// Planned backlog work drained opportunistically.
    #[serde(rename = "PRIORITY_QUEUE")]
    PriorityQueue,
}

impl TriggerType {
    /// Urgency rank of this channel. Lower dispatches first.
    pub fn rank(&self) -> u8 {
        match self {
            TriggerType::Event => 0,
            TriggerType::Round => 1,
            TriggerType::PriorityQueue => 2,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TriggerType::Event => "EVENT",
            TriggerType::Round => "ROUND",
            TriggerType::PriorityQueue => "PRIORITY_QUEUE",
        }
    }
}

impl std::fmt::Display for TriggerType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for TriggerType {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "EVENT" => Ok(TriggerType::Event),
            "ROUND" => Ok(TriggerType::Round),
            "PRIORITY_QUEUE" => Ok(TriggerType::PriorityQueue),
            other => Err(format!("unknown trigger type: {}", other)),
        }
    }
}

/// Static SLA metadata for one trigger channel.
#[derive(Debug, Clone, Serialize)]
pub struct TriggerDefinition {
    pub label: &'static str,
    pub max_latency_ms: u64,
    pub interruptible: bool,
    pub examples: &'static [&'static str],
}

const EVENT_DEFINITION: TriggerDefinition = TriggerDefinition {
    label: "immediate",
    max_latency_ms: 5_000,
    interruptible: true,
    examples: &["gate.failed", "decision.approved", "dependency.resolved"],
};

const ROUND_DEFINITION: TriggerDefinition = TriggerDefinition {
    label: "scheduled",
    max_latency_ms: 60_000,
    interruptible: false,
    examples: &["round.ops_cycle", "round.portfolio_sweep"],
};

const PRIORITY_QUEUE_DEFINITION: TriggerDefinition = TriggerDefinition {
    label: "planned",
    max_latency_ms: 300_000,
    interruptible: false,
    examples: &["backlog.enqueued", "backlog.reprioritized"],
};

/// Rank reported for a trigger label that names no known channel.
pub const UNRECOGNIZED_RANK: u8 = 3;

/// Fixed mapping from event type to urgency channel.
///
/// Event types not present in this table classify as planned backlog.
const EVENT_TYPE_TABLE: &[(&str, TriggerType)] = &[
    // Realtime signals: a venture's state just changed.
    ("gate.failed", TriggerType::Event),
    ("gate.passed", TriggerType::Event),
    ("decision.approved", TriggerType::Event),
    ("decision.rejected", TriggerType::Event),
    ("artifact.created", TriggerType::Event),
    ("dependency.resolved", TriggerType::Event),
    // Cadence signals: cron-style recurring sweeps.
    ("round.ops_cycle", TriggerType::Round),
    ("round.portfolio_sweep", TriggerType::Round),
    ("round.release_check", TriggerType::Round),
    // Backlog admission.
    ("backlog.enqueued", TriggerType::PriorityQueue),
    ("backlog.reprioritized", TriggerType::PriorityQueue),
];

/// Classify an event type string into its urgency channel.
///
/// Unknown event types default to the lowest-urgency channel.
pub fn classify(event_type: &str) -> TriggerType {
    EVENT_TYPE_TABLE
        .iter()
        .find(|(name, _)| *name == event_type)
        .map(|(_, trigger)| *trigger)
        .unwrap_or(TriggerType::PriorityQueue)
}

/// Urgency rank for a trigger channel label.
///
/// 0 = immediate, 1 = scheduled, 2 = planned, 3 = unrecognized input.
pub fn urgency_rank(trigger_label: &str) -> u8 {
    trigger_label
        .parse::<TriggerType>()
        .map(|t| t.rank())
        .unwrap_or(UNRECOGNIZED_RANK)
}

/// Static SLA metadata for a channel.
pub fn definition(trigger: TriggerType) -> &'static TriggerDefinition {
    match trigger {
        TriggerType::Event => &EVENT_DEFINITION,
        TriggerType::Round => &ROUND_DEFINITION,
        TriggerType::PriorityQueue => &PRIORITY_QUEUE_DEFINITION,
    }
}

/// Normalized dispatch envelope built from an inbound signal.
#[derive(Debug, Clone, Serialize)]
pub struct DispatchRequest {
    pub trigger: TriggerType,
    pub urgency: &'static str,
    pub max_latency_ms: u64,
    pub interruptible: bool,
    pub venture_id: Option<VentureId>,
    pub payload: serde_json::Value,
    pub priority: u8,
    pub created_at: DateTime<Utc>,
}

/// Build a normalized dispatch request from an inbound event.
///
/// The venture id falls back to a `venture_id` field embedded in the
/// payload; an explicit `priority` override wins over the channel's
/// computed urgency rank.
pub fn create_dispatch_request(
    event_type: &str,
    payload: serde_json::Value,
    venture_id: Option<VentureId>,
    priority: Option<u8>,
) -> DispatchRequest {
    let trigger = classify(event_type);
    let def = definition(trigger);

    let venture_id = venture_id.or_else(|| {
        payload
            .get("venture_id")
            .and_then(|v| v.as_str())
            .and_then(|s| s.parse().ok())
    });

    DispatchRequest {
        trigger,
        urgency: def.label,
        max_latency_ms: def.max_latency_ms,
        interruptible: def.interruptible,
        venture_id,
        payload,
        priority: priority.unwrap_or_else(|| trigger.rank()),
        created_at: Utc::now(),
    }
}

/// Return a new sequence sorted by ascending urgency rank.
///
/// Stable: equal-rank items keep their relative input order. The input
/// is not mutated.
pub fn sort_by_urgency(items: &[DispatchRequest]) -> Vec<DispatchRequest> {
    let mut sorted = items.to_vec();
    sorted.sort_by_key(|req| req.trigger.rank());
    sorted
}
