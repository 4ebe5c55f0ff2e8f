#![forbid(unsafe_code)]

//! Keyboard and IME input coordination for FrankenTerm web hosts.
//!
//! Browsers report one keystroke through several listeners (`keydown`, then
//! `keypress`) and stream transient text while an IME composes. This crate
//! collapses that traffic into exactly one committed key per user intent:
//!
//! - [`InputHandler`] gates every raw event, suppresses keys while composing,
//!   and ends a composition on blur.
//! - [`CommitDebouncer`] holds at most one pending key behind a short timer and
//!   commits it only if nothing superseded it.
//! - [`is_third_level_shift`] keeps AltGr-style chords on the browser's path.
//!
//! The terminal side is abstracted by [`Terminal`] and the text-entry element
//! by [`InputSurface`]; on wasm32 the `FrankenTermInput` binding wires both to
//! a DOM `<textarea>`. Time is host-driven through event timestamps
//! ([`InputHandler::handle_at`]) and [`InputHandler::tick`], so native tests
//! run deterministically.

pub mod composition;
pub mod config;
pub mod debounce;
pub mod error;
pub mod event;
pub mod handler;
pub mod host;
pub mod resolver;
pub mod shift;
#[cfg(any(test, feature = "testing"))]
pub mod testing;
pub mod trace;

#[cfg(target_arch = "wasm32")]
mod wasm;

pub use composition::{CompositionState, CompositionTracker};
pub use config::InputConfig;
pub use debounce::{CommitAttempt, CommitDebouncer, CommitTicket};
pub use error::InputError;
pub use event::{
    CompositionEvent, CompositionPhase, EventType, KeyEvent, KeyEventKind, Modifiers,
    RawInputEvent, RawInputEventJson,
};
pub use handler::{Dispatch, InputHandler};
pub use host::{CursorGeometry, InputSurface, LayoutBox, OverlayStyle, Platform, Terminal};
pub use resolver::{KeyEscapeResult, ResolverOptions, XtermKeyResolver};
pub use shift::is_third_level_shift;
pub use trace::{InputTrace, TraceRecord};

#[cfg(target_arch = "wasm32")]
pub use wasm::FrankenTermInput;
