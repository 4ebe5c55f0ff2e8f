#![forbid(unsafe_code)]

//! Recording doubles for [`Terminal`] and [`InputSurface`].
//!
//! Used by this crate's tests and benches, and by embedders that want to
//! drive an [`InputHandler`](crate::InputHandler) deterministically without a
//! browser. Outside unit tests this module needs the `testing` feature.

use crate::event::KeyEvent;
use crate::host::{CursorGeometry, InputSurface, LayoutBox, OverlayStyle, Platform, Terminal};
use crate::resolver::{KeyEscapeResult, ResolverOptions, XtermKeyResolver};

/// One call observed by [`RecordingTerminal`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TerminalCall {
    ScrollDisp(i32),
    Cancel { force: bool },
    ShowCursor,
    Handler(String),
    CursorConcealed(bool),
}

/// Cursor at column 8, row 2 of an 80-column grid with 9x17 cells.
#[must_use]
pub const fn sample_cursor_geometry() -> CursorGeometry {
    CursorGeometry {
        cursor: LayoutBox {
            offset_top: 34,
            offset_left: 72,
            offset_width: 9,
            offset_height: 17,
        },
        rows: LayoutBox {
            offset_top: 2,
            offset_left: 0,
            offset_width: 720,
            offset_height: 408,
        },
    }
}

/// Terminal double backed by [`XtermKeyResolver`], recording every call.
#[derive(Debug, Clone)]
pub struct RecordingTerminal {
    resolver: XtermKeyResolver,
    fixed_result: Option<KeyEscapeResult>,
    cursor: Option<CursorGeometry>,
    cancel_return: bool,
    calls: Vec<TerminalCall>,
}

impl RecordingTerminal {
    #[must_use]
    pub fn new(platform: Platform) -> Self {
        Self {
            resolver: XtermKeyResolver::new(ResolverOptions {
                platform,
                ..ResolverOptions::default()
            }),
            fixed_result: None,
            cursor: Some(sample_cursor_geometry()),
            cancel_return: false,
            calls: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_resolver(mut self, options: ResolverOptions) -> Self {
        self.resolver = XtermKeyResolver::new(options);
        self
    }

    /// Answer every `keydown` with `result` instead of resolving it.
    #[must_use]
    pub fn with_fixed_result(mut self, result: KeyEscapeResult) -> Self {
        self.fixed_result = Some(result);
        self
    }

    /// Value [`Terminal::cancel`] returns (the DOM listener return value).
    #[must_use]
    pub fn with_cancel_return(mut self, value: bool) -> Self {
        self.cancel_return = value;
        self
    }

    #[must_use]
    pub fn with_cursor(mut self, cursor: Option<CursorGeometry>) -> Self {
        self.cursor = cursor;
        self
    }

    #[must_use]
    pub fn calls(&self) -> &[TerminalCall] {
        &self.calls
    }

    /// Keys delivered through [`Terminal::handler`], in order.
    #[must_use]
    pub fn commits(&self) -> Vec<&str> {
        self.calls
            .iter()
            .filter_map(|call| match call {
                TerminalCall::Handler(key) => Some(key.as_str()),
                _ => None,
            })
            .collect()
    }

    #[must_use]
    pub fn cancel_count(&self) -> usize {
        self.calls
            .iter()
            .filter(|call| matches!(call, TerminalCall::Cancel { .. }))
            .count()
    }

    pub fn clear_calls(&mut self) {
        self.calls.clear();
    }
}

impl Terminal for RecordingTerminal {
    fn evaluate_key_escape_sequence(&self, event: &KeyEvent) -> KeyEscapeResult {
        match &self.fixed_result {
            Some(result) => result.clone(),
            None => self.resolver.resolve(event),
        }
    }

    fn scroll_disp(&mut self, delta: i32) {
        self.calls.push(TerminalCall::ScrollDisp(delta));
    }

    fn cancel(&mut self, _event: &KeyEvent, force: bool) -> bool {
        self.calls.push(TerminalCall::Cancel { force });
        self.cancel_return
    }

    fn show_cursor(&mut self) {
        self.calls.push(TerminalCall::ShowCursor);
    }

    fn handler(&mut self, key: &str) {
        self.calls.push(TerminalCall::Handler(key.to_string()));
    }

    fn cursor_geometry(&self) -> Option<CursorGeometry> {
        self.cursor
    }

    fn set_cursor_concealed(&mut self, concealed: bool) {
        self.calls.push(TerminalCall::CursorConcealed(concealed));
    }
}

/// In-memory stand-in for the hidden textarea.
#[derive(Debug, Default, Clone)]
pub struct RecordingSurface {
    text: String,
    overlay: Option<OverlayStyle>,
    clear_count: usize,
    overlay_count: usize,
}

impl RecordingSurface {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Simulate the browser writing into the element (typing or IME).
    pub fn type_text(&mut self, text: &str) {
        self.text.push_str(text);
    }

    /// Replace the buffered text, as an IME does on each update.
    pub fn set_text(&mut self, text: &str) {
        self.text.clear();
        self.text.push_str(text);
    }

    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    #[must_use]
    pub const fn overlay(&self) -> Option<OverlayStyle> {
        self.overlay
    }

    #[must_use]
    pub const fn clear_count(&self) -> usize {
        self.clear_count
    }

    /// Number of overlay placements applied so far.
    #[must_use]
    pub const fn overlay_count(&self) -> usize {
        self.overlay_count
    }
}

impl InputSurface for RecordingSurface {
    fn buffered_text(&self) -> String {
        self.text.clone()
    }

    fn clear_buffer(&mut self) {
        self.text.clear();
        self.clear_count += 1;
    }

    fn apply_overlay(&mut self, style: &OverlayStyle) {
        self.overlay = Some(*style);
        self.overlay_count += 1;
    }

    fn clear_overlay(&mut self) {
        self.overlay = None;
    }
}
