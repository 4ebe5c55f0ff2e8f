#![forbid(unsafe_code)]

//! Bounded decision trace for input debugging.
//!
//! Every dispatch, schedule, commit and composition transition can be
//! recorded into a fixed-capacity ring and drained as JSONL. Records carry
//! key lengths, never key contents, so traces can be attached to bug reports
//! without leaking typed text.

use core::time::Duration;
use std::collections::VecDeque;

use serde::Serialize;

use crate::error::InputError;

/// One coordinator decision.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "decision", rename_all = "snake_case")]
pub enum TraceRecord {
    Dispatched {
        event: &'static str,
        outcome: &'static str,
    },
    Scheduled {
        seq: u64,
        key_len: usize,
        deadline_ms: u64,
    },
    Committed {
        seq: u64,
        key_len: usize,
    },
    Stale {
        fired: u64,
        pending: u64,
    },
    Discarded {
        seq: u64,
        reason: &'static str,
    },
    CompositionStarted {
        restarted: bool,
        overlay: bool,
    },
    CompositionEnded {
        interrupted: bool,
        text_len: usize,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TraceEntry {
    pub idx: u64,
    pub at: Duration,
    pub record: TraceRecord,
}

#[derive(Serialize)]
struct TraceLine<'a> {
    #[serde(rename = "type")]
    kind: &'static str,
    run_id: &'a str,
    idx: u64,
    ts_ms: u64,
    #[serde(flatten)]
    record: &'a TraceRecord,
}

/// Fixed-capacity ring of [`TraceEntry`] values. Capacity `0` disables it.
#[derive(Debug, Clone, Default)]
pub struct InputTrace {
    capacity: usize,
    next_idx: u64,
    dropped: u64,
    entries: VecDeque<TraceEntry>,
}

impl InputTrace {
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            next_idx: 0,
            dropped: 0,
            entries: VecDeque::with_capacity(capacity.min(1024)),
        }
    }

    #[must_use]
    pub const fn is_enabled(&self) -> bool {
        self.capacity > 0
    }

    pub fn record(&mut self, at: Duration, record: TraceRecord) {
        if self.capacity == 0 {
            return;
        }
        if self.entries.len() == self.capacity {
            self.entries.pop_front();
            self.dropped += 1;
        }
        self.entries.push_back(TraceEntry {
            idx: self.next_idx,
            at,
            record,
        });
        self.next_idx += 1;
    }

    pub fn entries(&self) -> impl Iterator<Item = &TraceEntry> {
        self.entries.iter()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries evicted because the ring was full.
    #[must_use]
    pub const fn dropped(&self) -> u64 {
        self.dropped
    }

    /// Drain buffered entries as JSONL lines tagged with `run_id`.
    pub fn drain_jsonl(&mut self, run_id: &str) -> Result<Vec<String>, InputError> {
        let mut lines = Vec::with_capacity(self.entries.len());
        for entry in self.entries.drain(..) {
            let line = TraceLine {
                kind: "input_decision",
                run_id,
                idx: entry.idx,
                ts_ms: u64::try_from(entry.at.as_millis()).unwrap_or(u64::MAX),
                record: &entry.record,
            };
            lines.push(serde_json::to_string(&line)?);
        }
        Ok(lines)
    }
}
