#![forbid(unsafe_code)]

//! Identity-gated commit debouncing.
//!
//! Browsers report one keystroke through several listeners, so a decoded key
//! is not committed immediately. [`CommitDebouncer`] keeps at most one
//! pending commit and arms a one-shot timer for it. A timer carries the
//! [`CommitTicket`] it was armed with; when it fires, the commit only happens
//! if that ticket is still the pending one.
//!
//! # Invariants
//!
//! - At most one pending commit. Scheduling replaces it; nothing cancels the
//!   older timer, whose fire becomes inert because its ticket no longer
//!   matches.
//! - Every ticket commits at most once: a successful attempt takes the
//!   pending slot.
//! - Tickets compare by sequence number and key, so re-scheduling the same
//!   text still yields a distinct identity.
//!
//! Time is host-driven. Timers are due once the clock passed to
//! [`CommitDebouncer::pop_due`] reaches their deadline.

use core::time::Duration;
use std::collections::VecDeque;

/// Identity of one scheduled commit.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CommitTicket {
    seq: u64,
    key: Box<str>,
}

impl CommitTicket {
    /// Monotonic sequence number assigned at scheduling time.
    #[must_use]
    pub const fn seq(&self) -> u64 {
        self.seq
    }

    #[must_use]
    pub fn key(&self) -> &str {
        &self.key
    }
}

/// Result of one commit attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommitAttempt {
    /// Nothing was pending.
    Idle,
    /// A newer commit replaced the one this attempt was armed with.
    Stale { fired: u64, pending: u64 },
    /// The ticket matched; its key must be delivered now.
    Committed(CommitTicket),
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct ArmedTimer {
    deadline: Duration,
    ticket: CommitTicket,
}

#[derive(Debug, Clone)]
pub struct CommitDebouncer {
    delay: Duration,
    next_seq: u64,
    pending: Option<CommitTicket>,
    /// Armed timers in deadline order. Deadlines are monotonic because the
    /// delay is fixed and callers never move time backwards.
    timers: VecDeque<ArmedTimer>,
}

impl CommitDebouncer {
    #[must_use]
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            next_seq: 0,
            pending: None,
            timers: VecDeque::new(),
        }
    }

    #[must_use]
    pub const fn delay(&self) -> Duration {
        self.delay
    }

    /// Store `key` as the pending commit and arm a timer for it.
    ///
    /// Any previously pending commit is superseded, not cancelled.
    pub fn schedule(&mut self, key: impl Into<Box<str>>, now: Duration) -> CommitTicket {
        let ticket = CommitTicket {
            seq: self.next_seq,
            key: key.into(),
        };
        self.next_seq += 1;
        self.pending = Some(ticket.clone());
        self.timers.push_back(ArmedTimer {
            deadline: now.saturating_add(self.delay),
            ticket: ticket.clone(),
        });
        ticket
    }

    /// Commit `ticket` if it is still the pending one.
    pub fn attempt_commit(&mut self, ticket: &CommitTicket) -> CommitAttempt {
        let Some(pending) = &self.pending else {
            return CommitAttempt::Idle;
        };
        if pending != ticket {
            return CommitAttempt::Stale {
                fired: ticket.seq,
                pending: pending.seq,
            };
        }
        self.pending
            .take()
            .map_or(CommitAttempt::Idle, CommitAttempt::Committed)
    }

    /// Commit whatever is pending right now, ahead of its timer.
    pub fn flush(&mut self) -> CommitAttempt {
        match self.pending.clone() {
            Some(ticket) => self.attempt_commit(&ticket),
            None => CommitAttempt::Idle,
        }
    }

    /// Drop the pending commit without delivering it.
    pub fn discard(&mut self) -> Option<CommitTicket> {
        self.pending.take()
    }

    /// Pop the earliest timer whose deadline is at or before `now`.
    pub fn pop_due(&mut self, now: Duration) -> Option<CommitTicket> {
        if self.timers.front()?.deadline > now {
            return None;
        }
        self.timers.pop_front().map(|timer| timer.ticket)
    }

    #[must_use]
    pub fn pending(&self) -> Option<&CommitTicket> {
        self.pending.as_ref()
    }

    /// Deadline of the earliest armed timer, stale or not.
    #[must_use]
    pub fn next_deadline(&self) -> Option<Duration> {
        self.timers.front().map(|timer| timer.deadline)
    }

    #[must_use]
    pub fn armed_timers(&self) -> usize {
        self.timers.len()
    }
}

impl Default for CommitDebouncer {
    fn default() -> Self {
        Self::new(crate::config::DEFAULT_COMMIT_DELAY)
    }
}
