//! Coalesces mutation records into batches and drains them.
//!
//! ```text
//!            added nodes               deadline reached
//!   Idle ───────────────▶ Collecting ───────────────────▶ Draining
//!    ▲                      │  ▲                              │
//!    │                      └──┘ more records                 │
//!    └────────────────────────────────────────────────────────┘
//! ```
//!
//! The scheduler only owns the state and the deadline. Waiting for the
//! deadline is the caller's job ([`crate::runtime::Runtime`] sleeps on it),
//! which keeps every transition here synchronous and testable.

use std::collections::HashSet;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::time::Instant;

use crate::dom::{Document, MutationRecord, NodeId};
use crate::engine::{Engine, PassReport};

/// Records collected within one coalescing window.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MutationBatch {
    records: Vec<MutationRecord>,
}

impl MutationBatch {
    pub fn push(&mut self, record: MutationRecord) {
        self.records.push(record);
    }

    /// Distinct added nodes, in record order.
    pub fn added_roots(&self) -> Vec<NodeId> {
        let mut seen = HashSet::new();
        self.records
            .iter()
            .flat_map(|r| r.added_nodes.iter().copied())
            .filter(|n| seen.insert(*n))
            .collect()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CoalesceMode {
    /// Every new record pushes the deadline out by the full delay.
    #[default]
    Debounce,
    /// The deadline is fixed by the first record of the window.
    Throttle,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct SchedulerSettings {
    pub coalesce_ms: u64,
    pub mode: CoalesceMode,
}

impl Default for SchedulerSettings {
    fn default() -> Self {
        SchedulerSettings {
            coalesce_ms: 100,
            mode: CoalesceMode::Debounce,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Collecting,
    Draining,
}

#[derive(Debug)]
enum State {
    Idle,
    Collecting { batch: MutationBatch, deadline: Instant },
    Draining,
}

#[derive(Debug)]
pub struct Scheduler {
    state: State,
    delay: Duration,
    mode: CoalesceMode,
}

impl Scheduler {
    pub fn new(settings: &SchedulerSettings) -> Self {
        Scheduler {
            state: State::Idle,
            delay: Duration::from_millis(settings.coalesce_ms),
            mode: settings.mode,
        }
    }

    pub fn phase(&self) -> Phase {
        match self.state {
            State::Idle => Phase::Idle,
            State::Collecting { .. } => Phase::Collecting,
            State::Draining => Phase::Draining,
        }
    }

    pub fn deadline(&self) -> Option<Instant> {
        match &self.state {
            State::Collecting { deadline, .. } => Some(*deadline),
            _ => None,
        }
    }

    /// Number of records waiting in the open window.
    pub fn pending(&self) -> usize {
        match &self.state {
            State::Collecting { batch, .. } => batch.records.len(),
            _ => 0,
        }
    }

    /// Feeds observer records in. Only records that add nodes open or
    /// extend a window; removals and attribute changes are dropped.
    pub fn observe(&mut self, records: Vec<MutationRecord>, now: Instant) -> Option<Instant> {
        let mut relevant = records.into_iter().filter(|r| !r.added_nodes.is_empty()).peekable();
        if relevant.peek().is_none() {
            return self.deadline();
        }

        let next = now + self.delay;
        match &mut self.state {
            State::Collecting { batch, deadline } => {
                batch.records.extend(relevant);
                if self.mode == CoalesceMode::Debounce {
                    *deadline = next;
                }
            }
            State::Idle | State::Draining => {
                let mut batch = MutationBatch::default();
                batch.records.extend(relevant);
                self.state = State::Collecting { batch, deadline: next };
            }
        }
        self.deadline()
    }

    /// Drains the open batch if its deadline has passed.
    pub fn fire<D: Document + ?Sized>(&mut self, now: Instant, engine: &Engine, doc: &mut D) -> Option<PassReport> {
        match &self.state {
            State::Collecting { deadline, .. } if *deadline <= now => {}
            _ => return None,
        }

        let State::Collecting { batch, .. } = std::mem::replace(&mut self.state, State::Draining) else {
            return None;
        };
        let report = engine.drain(doc, &batch);
        tracing::debug!(
            records = batch.records.len(),
            visited = report.visited,
            marked = report.marked,
            neutralized = report.neutralized,
            detached = report.detached,
            "drained mutation batch"
        );
        self.state = State::Idle;
        Some(report)
    }
}
