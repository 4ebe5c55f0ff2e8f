#![forbid(unsafe_code)]

//! Input coordinator: dispatch gate, composition handling, blur interrupt.
//!
//! [`InputHandler`] owns the only mutable input state (the composition flag
//! and the pending-commit slot) and is driven from a single event thread:
//!
//! - [`InputHandler::handle_at`] for every raw event, in arrival order, with
//!   the event's timestamp on the host's monotonic clock.
//! - [`InputHandler::tick`] with the same clock so armed commit timers can
//!   fire between events.
//! - [`InputHandler::on_refresh`] after the terminal redraws.
//!
//! Every key dispatch first flushes the pending commit through the same
//! identity-checked path the timer uses, so at most one key is ever waiting.

use core::time::Duration;

use crate::composition::{self, CompositionTracker};
use crate::config::InputConfig;
use crate::debounce::{CommitAttempt, CommitDebouncer, CommitTicket};
use crate::error::InputError;
use crate::event::{CompositionEvent, CompositionPhase, KeyEvent, KeyEventKind, RawInputEvent};
use crate::host::{InputSurface, Terminal};
use crate::shift::is_third_level_shift;
use crate::trace::{InputTrace, TraceRecord};

/// Outcome of handling one raw event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Dispatch {
    /// A key event arrived while composing; nothing happened.
    Suppressed,
    /// Composition or blur event consumed.
    Observed,
    /// The browser default is kept.
    PassThrough,
    /// The viewport scrolled instead of committing a key.
    Scrolled { canceled: bool },
    /// A key was scheduled for commit.
    Scheduled { canceled: bool },
    /// The event carried nothing committable.
    Dropped,
}

impl Dispatch {
    /// Value a DOM listener should return for this outcome.
    #[must_use]
    pub const fn listener_return(self) -> Option<bool> {
        match self {
            Self::Suppressed | Self::Observed => None,
            Self::PassThrough => Some(true),
            Self::Scrolled { canceled } | Self::Scheduled { canceled } => Some(canceled),
            Self::Dropped => Some(false),
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Suppressed => "suppressed",
            Self::Observed => "observed",
            Self::PassThrough => "pass_through",
            Self::Scrolled { .. } => "scrolled",
            Self::Scheduled { .. } => "scheduled",
            Self::Dropped => "dropped",
        }
    }
}

/// Coordinates raw key and composition events into debounced commits.
#[derive(Debug)]
pub struct InputHandler<T: Terminal, S: InputSurface> {
    terminal: T,
    surface: S,
    config: InputConfig,
    composition: CompositionTracker,
    debouncer: CommitDebouncer,
    trace: InputTrace,
    now: Duration,
}

impl<T: Terminal, S: InputSurface> InputHandler<T, S> {
    #[must_use]
    pub fn new(terminal: T, surface: S, config: InputConfig) -> Self {
        Self {
            terminal,
            surface,
            debouncer: CommitDebouncer::new(config.commit_delay),
            trace: InputTrace::new(config.trace_capacity),
            composition: CompositionTracker::default(),
            config,
            now: Duration::ZERO,
        }
    }

    /// Like [`new`](Self::new), rejecting an invalid configuration.
    pub fn try_new(terminal: T, surface: S, config: InputConfig) -> Result<Self, InputError> {
        config.validate()?;
        Ok(Self::new(terminal, surface, config))
    }

    /// Advance the clock to the event's timestamp, fire timers due before it,
    /// then route the event.
    ///
    /// Commit deadlines are measured from the current clock, so hosts that do
    /// not tick continuously must pass the event time here.
    pub fn handle_at(&mut self, event: &RawInputEvent, now: Duration) -> Dispatch {
        self.tick(now);
        self.handle(event)
    }

    /// Route one raw event at the current clock.
    pub fn handle(&mut self, event: &RawInputEvent) -> Dispatch {
        let outcome = match event {
            RawInputEvent::Key(key) => self.dispatch(key),
            RawInputEvent::Composition(comp) => {
                match comp.phase {
                    CompositionPhase::Start => self.composition_start(),
                    CompositionPhase::Update => self.composition_update(),
                    CompositionPhase::End => self.composition_end(Some(comp)),
                }
                Dispatch::Observed
            }
            RawInputEvent::Blur => {
                self.blur();
                Dispatch::Observed
            }
        };
        self.record(TraceRecord::Dispatched {
            event: event.event_type().as_str(),
            outcome: outcome.as_str(),
        });
        outcome
    }

    /// Decode a JSON-encoded event and route it.
    pub fn handle_json(&mut self, json: &str) -> Result<Dispatch, InputError> {
        let event = RawInputEvent::from_json_str(json)?;
        Ok(self.handle(&event))
    }

    /// Keyboard entry point. A no-op while composing.
    pub fn dispatch(&mut self, event: &KeyEvent) -> Dispatch {
        if self.composition.is_composing() {
            tracing::trace!(event = event.event_type().as_str(), "key suppressed while composing");
            return Dispatch::Suppressed;
        }
        self.flush_pending();
        match event.kind {
            KeyEventKind::Down => self.key_down(event),
            KeyEventKind::Press => self.key_press(event),
        }
    }

    fn key_down(&mut self, event: &KeyEvent) -> Dispatch {
        let result = self.terminal.evaluate_key_escape_sequence(event);

        if let Some(delta) = result.scroll_disp.filter(|delta| *delta != 0) {
            self.terminal.scroll_disp(delta);
            let canceled = self.terminal.cancel(event, true);
            return Dispatch::Scrolled { canceled };
        }

        if is_third_level_shift(self.config.platform, event) {
            return Dispatch::PassThrough;
        }

        if result.cancel {
            self.terminal.cancel(event, true);
        }

        let Some(key) = result.key.filter(|key| !key.is_empty()) else {
            return Dispatch::PassThrough;
        };

        self.terminal.show_cursor();
        self.schedule(key);
        let canceled = self.terminal.cancel(event, true);
        Dispatch::Scheduled { canceled }
    }

    fn key_press(&mut self, event: &KeyEvent) -> Dispatch {
        self.terminal.cancel(event, false);

        let Some(code) = keypress_char_code(event) else {
            return Dispatch::Dropped;
        };
        if code == 0
            || (event.mods.has_command_modifier() && !is_third_level_shift(self.config.platform, event))
        {
            return Dispatch::Dropped;
        }
        let Some(ch) = char::from_u32(code) else {
            tracing::debug!(code, "keypress code is not a scalar value");
            return Dispatch::Dropped;
        };

        self.terminal.show_cursor();
        self.schedule(ch.to_string());
        Dispatch::Scheduled { canceled: false }
    }

    /// Begin a composition session, discarding any uncommitted key.
    pub fn composition_start(&mut self) {
        if let Some(ticket) = self.debouncer.discard() {
            tracing::debug!(seq = ticket.seq(), "pending commit discarded by composition");
            self.record(TraceRecord::Discarded {
                seq: ticket.seq(),
                reason: "composition_start",
            });
            if self.config.clear_buffer_on_discard {
                self.surface.clear_buffer();
            }
        }
        let restarted = self.composition.begin();
        let overlay = composition::position_overlay(&mut self.terminal, &mut self.surface);
        tracing::debug!(restarted, overlay, "composition started");
        self.record(TraceRecord::CompositionStarted { restarted, overlay });
    }

    /// Intermediate composition text. Starts a session if none is active.
    pub fn composition_update(&mut self) {
        if !self.composition.is_composing() {
            self.composition_start();
            return;
        }
        composition::position_overlay(&mut self.terminal, &mut self.surface);
    }

    /// End the session and schedule its final text.
    ///
    /// Without an event, or when the event carries no data, the text is read
    /// from the input surface.
    pub fn composition_end(&mut self, event: Option<&CompositionEvent>) {
        let data = event.and_then(|ev| ev.data.as_deref()).map(str::to_owned);
        self.end_composition(data, false);
    }

    fn end_composition(&mut self, data: Option<String>, interrupted: bool) {
        self.composition.finish();
        let text = data.unwrap_or_else(|| self.surface.buffered_text());
        let text_len = text.len();
        self.schedule(text);
        composition::clear_overlay(&mut self.terminal, &mut self.surface);
        tracing::debug!(interrupted, text_len, "composition ended");
        self.record(TraceRecord::CompositionEnded {
            interrupted,
            text_len,
        });
    }

    /// Focus loss. Ends an active composition with the surface's text.
    pub fn blur(&mut self) {
        if self.composition.is_composing() {
            tracing::debug!("blur interrupted composition");
            self.end_composition(None, true);
        }
    }

    /// The terminal redrew; keep the overlay on the cursor while composing.
    pub fn on_refresh(&mut self) {
        if self.composition.is_composing() {
            composition::position_overlay(&mut self.terminal, &mut self.surface);
        }
    }

    /// Advance the clock to `now` and fire due commit timers.
    ///
    /// Time never moves backwards; an earlier `now` is ignored. Returns the
    /// number of keys committed.
    pub fn tick(&mut self, now: Duration) -> usize {
        self.now = self.now.max(now);
        let mut committed = 0;
        while let Some(ticket) = self.debouncer.pop_due(self.now) {
            let attempt = self.debouncer.attempt_commit(&ticket);
            if self.settle(attempt) {
                committed += 1;
            }
        }
        committed
    }

    /// Commit the pending key immediately, if any.
    pub fn flush_pending(&mut self) -> bool {
        let attempt = self.debouncer.flush();
        self.settle(attempt)
    }

    fn schedule(&mut self, key: String) -> CommitTicket {
        let key_len = key.len();
        let ticket = self.debouncer.schedule(key, self.now);
        let deadline = self.now.saturating_add(self.debouncer.delay());
        tracing::trace!(seq = ticket.seq(), key_len, "commit scheduled");
        self.record(TraceRecord::Scheduled {
            seq: ticket.seq(),
            key_len,
            deadline_ms: u64::try_from(deadline.as_millis()).unwrap_or(u64::MAX),
        });
        ticket
    }

    fn settle(&mut self, attempt: CommitAttempt) -> bool {
        match attempt {
            CommitAttempt::Idle => false,
            CommitAttempt::Stale { fired, pending } => {
                tracing::trace!(fired, pending, "superseded commit timer ignored");
                self.record(TraceRecord::Stale { fired, pending });
                false
            }
            CommitAttempt::Committed(ticket) => {
                self.deliver(&ticket);
                true
            }
        }
    }

    fn deliver(&mut self, ticket: &CommitTicket) {
        let key = ticket.key();
        self.terminal.handler(key);
        self.surface.clear_buffer();
        tracing::debug!(seq = ticket.seq(), key_len = key.len(), "commit delivered");
        self.record(TraceRecord::Committed {
            seq: ticket.seq(),
            key_len: key.len(),
        });
    }

    fn record(&mut self, record: TraceRecord) {
        self.trace.record(self.now, record);
    }

    #[must_use]
    pub fn terminal(&self) -> &T {
        &self.terminal
    }

    pub fn terminal_mut(&mut self) -> &mut T {
        &mut self.terminal
    }

    #[must_use]
    pub fn surface(&self) -> &S {
        &self.surface
    }

    pub fn surface_mut(&mut self) -> &mut S {
        &mut self.surface
    }

    #[must_use]
    pub fn config(&self) -> &InputConfig {
        &self.config
    }

    #[must_use]
    pub const fn now(&self) -> Duration {
        self.now
    }

    #[must_use]
    pub const fn is_composing(&self) -> bool {
        self.composition.is_composing()
    }

    /// Key waiting for its commit timer, if any.
    #[must_use]
    pub fn pending_commit(&self) -> Option<&str> {
        self.debouncer.pending().map(CommitTicket::key)
    }

    /// When the host should next call [`tick`](Self::tick).
    #[must_use]
    pub fn next_deadline(&self) -> Option<Duration> {
        self.debouncer.next_deadline()
    }

    #[must_use]
    pub fn trace(&self) -> &InputTrace {
        &self.trace
    }

    pub fn trace_mut(&mut self) -> &mut InputTrace {
        &mut self.trace
    }

    #[must_use]
    pub fn into_parts(self) -> (T, S) {
        (self.terminal, self.surface)
    }
}

/// Character code of a `keypress`, following legacy DOM field precedence.
///
/// `None` when no field is usable.
#[must_use]
pub fn keypress_char_code(event: &KeyEvent) -> Option<u32> {
    match (event.char_code, event.which) {
        (Some(code), _) if code != 0 => Some(code),
        (_, None) => Some(event.key_code.unwrap_or(0)),
        (char_code, Some(which)) if which != 0 && char_code != Some(0) => Some(which),
        _ => None,
    }
}
