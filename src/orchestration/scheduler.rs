//! Concurrency-bounded stage dispatcher.
//!
//! The scheduler admits stage-processing work for ventures, enforcing a
//! global concurrency cap and per-venture exclusivity. Work that cannot
//! start immediately waits in a priority queue ordered by trigger urgency;
//! every settle drains the queue so capacity never sits idle while work
//! is pending.
//!
//! All bookkeeping (the active map and the pending queue) lives behind a
//! single async mutex. Admission, settle, and drain decisions each happen
//! inside one lock scope with no suspension point, so the coordinator's
//! view of its own state is always consistent; only the dispatched stage
//! work itself runs concurrently.

use crate::core::trigger::{self, DispatchRequest, TriggerType};
use crate::core::venture::{DispatchOptions, StageId, VentureId};
use crate::error::{Error, Result};
use crate::orchestration::processor::{StageContext, StageOutcome, StageProcessor};
use crate::{klog_debug, klog_warn};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{oneshot, Mutex};
use uuid::Uuid;

/// What a drain pass does when the head of the queue turns out to belong
/// to a venture that is already active again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum DrainPolicy {
    /// Leave the raced entry at the head and end the pass. Conservative:
    /// other queued ventures wait until the next settle.
    #[default]
    HaltOnRace,
    /// Leave the raced entry in place but keep admitting other ventures.
    SkipRaced,
}

/// Scheduler tuning. The concurrency cap has no default; deployments
/// must supply it explicitly.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerConfig {
    pub max_concurrent: usize,
    #[serde(default)]
    pub drain_policy: DrainPolicy,
    /// Bound on each stage-processing call, unless overridden per
    /// submission. When the bound elapses the in-flight call is dropped
    /// and the unit settles with a timeout error.
    pub stage_timeout_ms: Option<u64>,
    /// Upper bound on admissions per drain pass.
    pub max_dispatch_per_drain: Option<usize>,
}

impl SchedulerConfig {
    pub fn new(max_concurrent: usize) -> Self {
        Self {
            max_concurrent,
            drain_policy: DrainPolicy::default(),
            stage_timeout_ms: None,
            max_dispatch_per_drain: None,
        }
    }
}

/// Terminal-transition counters. Every admitted unit of work eventually
/// increments exactly one of `completed` or `failed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct DispatchTotals {
    pub dispatched: u64,
    pub completed: u64,
    pub failed: u64,
}

/// A dispatch currently in flight for a venture.
#[derive(Debug)]
struct ActiveDispatch {
    stage_id: StageId,
    correlation_id: Uuid,
    started_at: DateTime<Utc>,
}

/// A submission waiting for capacity or for its venture to go idle.
struct QueueEntry {
    venture_id: VentureId,
    stage_id: StageId,
    trigger: TriggerType,
    priority: u8,
    options: DispatchOptions,
    tx: oneshot::Sender<Result<StageOutcome>>,
}

/// Coordinator state. Guarded by one mutex; never held across an await.
struct Inner {
    active: HashMap<VentureId, ActiveDispatch>,
    /// Kept ordered by ascending priority, insertion order within a rank.
    pending: Vec<QueueEntry>,
    totals: DispatchTotals,
}

/// Completion handle for one submitted unit of work.
///
/// Resolves only when the unit is eventually dispatched and settles, not
/// when it is admitted to the queue.
#[derive(Debug)]
pub struct DispatchTicket {
    rx: oneshot::Receiver<Result<StageOutcome>>,
}

impl DispatchTicket {
    /// Wait for this unit of work to settle.
    pub async fn settled(self) -> Result<StageOutcome> {
        match self.rx.await {
            Ok(result) => result,
            Err(_) => Err(Error::SchedulerGone),
        }
    }
}

/// One item of a batch submission.
#[derive(Debug, Clone)]
pub struct StageSubmission {
    pub venture_id: VentureId,
    pub stage_id: StageId,
    pub event_type: Option<String>,
    pub options: DispatchOptions,
}

/// Per-item outcome of a batch submission.
#[derive(Debug)]
pub struct BatchOutcome {
    pub venture_id: VentureId,
    pub stage_id: StageId,
    pub outcome: Result<StageOutcome>,
}

impl BatchOutcome {
    pub fn is_fulfilled(&self) -> bool {
        self.outcome.is_ok()
    }
}

/// Snapshot of one in-flight dispatch.
#[derive(Debug, Clone, Serialize)]
pub struct ActiveSnapshot {
    pub venture_id: VentureId,
    pub stage_id: StageId,
    pub correlation_id: Uuid,
    pub elapsed_ms: u64,
}

/// Read-only scheduler snapshot.
#[derive(Debug, Clone, Serialize)]
pub struct SchedulerStatus {
    pub active_count: usize,
    pub pending_count: usize,
    pub max_concurrent: usize,
    pub totals: DispatchTotals,
    pub active: Vec<ActiveSnapshot>,
}

/// Concurrency-bounded dispatcher for venture stage processing.
pub struct StageScheduler {
    inner: Arc<Mutex<Inner>>,
    processor: Arc<dyn StageProcessor>,
    config: SchedulerConfig,
}

impl StageScheduler {
    pub fn new(config: SchedulerConfig, processor: Arc<dyn StageProcessor>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Inner {
                active: HashMap::new(),
                pending: Vec::new(),
                totals: DispatchTotals::default(),
            })),
            processor,
            config,
        }
    }

    /// Submit a stage transition for a venture.
    ///
    /// Dispatches immediately when the venture is idle and the global cap
    /// has headroom; otherwise queues by trigger urgency (planned/lowest
    /// when no event type is given). The returned ticket resolves when
    /// the unit settles.
    pub async fn enqueue(
        &self,
        venture_id: VentureId,
        stage_id: StageId,
        event_type: Option<&str>,
        options: DispatchOptions,
    ) -> DispatchTicket {
        let trigger = event_type
            .map(trigger::classify)
            .unwrap_or(TriggerType::PriorityQueue);
        self.admit(venture_id, stage_id, trigger, trigger.rank(), options)
            .await
    }

    /// Submit from a normalized dispatch envelope.
    ///
    /// Uses the envelope's effective priority (which may carry an
    /// explicit override) and its payload. Fails if the envelope names
    /// no venture.
    pub async fn enqueue_request(
        &self,
        request: DispatchRequest,
        stage_id: StageId,
    ) -> Result<DispatchTicket> {
        let venture_id = request.venture_id.ok_or_else(|| {
            Error::Validation("dispatch request names no venture".to_string())
        })?;
        let options = DispatchOptions::with_payload(request.payload);
        Ok(self
            .admit(venture_id, stage_id, request.trigger, request.priority, options)
            .await)
    }

    /// Submit many stage transitions concurrently and join all-settled.
    ///
    /// One submission's failure is reported per item and never prevents
    /// the batch from returning results for the others.
    pub async fn process_batch(&self, submissions: Vec<StageSubmission>) -> Vec<BatchOutcome> {
        let pending = submissions.into_iter().map(|s| async move {
            let ticket = self
                .enqueue(s.venture_id, s.stage_id, s.event_type.as_deref(), s.options)
                .await;
            BatchOutcome {
                venture_id: s.venture_id,
                stage_id: s.stage_id,
                outcome: ticket.settled().await,
            }
        });
        futures::future::join_all(pending).await
    }

    /// Read-only snapshot of the scheduler's state.
    pub async fn status(&self) -> SchedulerStatus {
        let inner = self.inner.lock().await;
        let now = Utc::now();
        SchedulerStatus {
            active_count: inner.active.len(),
            pending_count: inner.pending.len(),
            max_concurrent: self.config.max_concurrent,
            totals: inner.totals,
            active: inner
                .active
                .iter()
                .map(|(venture_id, dispatch)| ActiveSnapshot {
                    venture_id: *venture_id,
                    stage_id: dispatch.stage_id,
                    correlation_id: dispatch.correlation_id,
                    elapsed_ms: (now - dispatch.started_at).num_milliseconds().max(0) as u64,
                })
                .collect(),
        }
    }

    async fn admit(
        &self,
        venture_id: VentureId,
        stage_id: StageId,
        trigger: TriggerType,
        priority: u8,
        options: DispatchOptions,
    ) -> DispatchTicket {
        let (tx, rx) = oneshot::channel();
        let mut inner = self.inner.lock().await;

        let venture_busy = inner.active.contains_key(&venture_id);
        let has_capacity = inner.active.len() < self.config.max_concurrent;

        if !venture_busy && has_capacity {
            Self::dispatch_locked(
                &self.inner,
                &self.processor,
                &self.config,
                &mut inner,
                venture_id,
                stage_id,
                options,
                tx,
            );
        } else {
            // Keep the queue ordered by ascending priority; entries of
            // equal priority stay in insertion order.
            let pos = inner.pending.partition_point(|e| e.priority <= priority);
            inner.pending.insert(
                pos,
                QueueEntry {
                    venture_id,
                    stage_id,
                    trigger,
                    priority,
                    options,
                    tx,
                },
            );
            klog_debug!(
                "queued venture {} stage {} ({}, priority {}), {} pending",
                venture_id.short(),
                stage_id,
                trigger,
                priority,
                inner.pending.len()
            );
        }

        DispatchTicket { rx }
    }

    /// Record an active dispatch and spawn its stage-processing task.
    /// Must be called with the coordinator lock held (`inner` is the
    /// guarded state).
    #[allow(clippy::too_many_arguments)]
    fn dispatch_locked(
        shared: &Arc<Mutex<Inner>>,
        processor: &Arc<dyn StageProcessor>,
        config: &SchedulerConfig,
        inner: &mut Inner,
        venture_id: VentureId,
        stage_id: StageId,
        options: DispatchOptions,
        tx: oneshot::Sender<Result<StageOutcome>>,
    ) {
        let timeout = options
            .timeout_ms
            .or(config.stage_timeout_ms)
            .map(Duration::from_millis);
        let ctx = StageContext::new(venture_id, stage_id, options);
        let correlation_id = ctx.correlation_id;

        inner.totals.dispatched += 1;
        inner.active.insert(
            venture_id,
            ActiveDispatch {
                stage_id,
                correlation_id,
                started_at: Utc::now(),
            },
        );
        klog_debug!(
            "dispatching venture {} stage {} [{}]",
            venture_id.short(),
            stage_id,
            correlation_id
        );

        let shared = Arc::clone(shared);
        let processor = Arc::clone(processor);
        let config = config.clone();
        tokio::spawn(async move {
            let result = match timeout {
                Some(limit) => match tokio::time::timeout(limit, processor.process(&ctx)).await {
                    Ok(result) => result,
                    Err(_) => Err(Error::Timeout(limit)),
                },
                None => processor.process(&ctx).await,
            };

            // Settle: remove the active entry, count the terminal
            // transition, and drain — one lock scope, regardless of how
            // processing ended. A failure must never stall the queue.
            {
                let mut inner = shared.lock().await;
                inner.active.remove(&venture_id);
                match &result {
                    Ok(_) => inner.totals.completed += 1,
                    Err(err) => {
                        inner.totals.failed += 1;
                        klog_warn!(
                            "venture {} stage {} failed: {}",
                            venture_id.short(),
                            stage_id,
                            err
                        );
                    }
                }
                Self::drain_locked(&shared, &processor, &config, &mut inner);
            }

            // The waiter may be gone; that is not an error.
            let _ = tx.send(result);
        });
    }

    /// Admit queued entries while capacity remains. Pops strictly in
    /// priority-then-insertion order; two concurrent settles cannot pop
    /// the same entry because the pop and the dispatch share one lock
    /// scope.
    fn drain_locked(
        shared: &Arc<Mutex<Inner>>,
        processor: &Arc<dyn StageProcessor>,
        config: &SchedulerConfig,
        inner: &mut Inner,
    ) {
        let mut admitted = 0usize;
        loop {
            if inner.active.len() >= config.max_concurrent {
                break;
            }
            if config
                .max_dispatch_per_drain
                .is_some_and(|cap| admitted >= cap)
            {
                break;
            }
            if inner.pending.is_empty() {
                break;
            }

            let idx = if !inner.active.contains_key(&inner.pending[0].venture_id) {
                0
            } else {
                match config.drain_policy {
                    DrainPolicy::HaltOnRace => {
                        // The head's venture re-activated under us; leave
                        // it at the head and end this pass.
                        klog_debug!(
                            "drain halted: venture {} already active",
                            inner.pending[0].venture_id.short()
                        );
                        break;
                    }
                    DrainPolicy::SkipRaced => {
                        match inner
                            .pending
                            .iter()
                            .position(|e| !inner.active.contains_key(&e.venture_id))
                        {
                            Some(idx) => idx,
                            None => break,
                        }
                    }
                }
            };

            let entry = inner.pending.remove(idx);
            klog_debug!(
                "drain admitting venture {} stage {} ({})",
                entry.venture_id.short(),
                entry.stage_id,
                entry.trigger
            );
            Self::dispatch_locked(
                shared,
                processor,
                config,
                inner,
                entry.venture_id,
                entry.stage_id,
                entry.options,
                entry.tx,
            );
            admitted += 1;
        }
        if admitted > 0 {
            klog_debug!(
                "drain admitted {} ({} active, {} pending)",
                admitted,
                inner.active.len(),
                inner.pending.len()
            );
        }
    }
}
