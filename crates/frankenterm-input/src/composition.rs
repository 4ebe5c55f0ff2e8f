#![forbid(unsafe_code)]

//! IME composition session tracking and overlay placement.
//!
//! While a composition is active the composition events alone describe the
//! evolving text, so key dispatch is suppressed. To keep the IME's inline
//! preview where the user is typing, the input surface is moved over the
//! terminal cursor cell and made visible for the duration of the session.

use crate::host::{CursorGeometry, InputSurface, OverlayStyle, Terminal};

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CompositionState {
    #[default]
    Idle,
    Composing,
}

/// Composition session flag owned by the input coordinator.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CompositionTracker {
    state: CompositionState,
}

impl CompositionTracker {
    #[must_use]
    pub const fn state(&self) -> CompositionState {
        self.state
    }

    #[must_use]
    pub const fn is_composing(&self) -> bool {
        matches!(self.state, CompositionState::Composing)
    }

    /// Enter `Composing`. Returns true when a session was already active.
    pub fn begin(&mut self) -> bool {
        let restarted = self.is_composing();
        self.state = CompositionState::Composing;
        restarted
    }

    /// Return to `Idle`. Returns whether a session was active.
    pub fn finish(&mut self) -> bool {
        let was_composing = self.is_composing();
        self.state = CompositionState::Idle;
        was_composing
    }
}

/// Overlay covering the cursor cell through the right edge of its row.
#[must_use]
pub fn overlay_for_cursor(geometry: &CursorGeometry) -> OverlayStyle {
    let cursor = geometry.cursor;
    let rows = geometry.rows;
    OverlayStyle {
        top: rows.offset_top.saturating_add(cursor.offset_top),
        left: cursor.offset_left,
        width: rows.offset_width.saturating_sub(cursor.offset_left).max(0),
        height: cursor.offset_height,
        line_height: cursor.offset_height,
    }
}

/// Move the surface over the cursor cell and conceal the cursor glyph.
///
/// Returns false, touching nothing, when no cursor glyph is rendered.
pub fn position_overlay<T, S>(terminal: &mut T, surface: &mut S) -> bool
where
    T: Terminal + ?Sized,
    S: InputSurface + ?Sized,
{
    let Some(geometry) = terminal.cursor_geometry() else {
        return false;
    };
    terminal.set_cursor_concealed(true);
    surface.apply_overlay(&overlay_for_cursor(&geometry));
    true
}

/// Undo [`position_overlay`]. Like placement, requires a rendered cursor glyph.
pub fn clear_overlay<T, S>(terminal: &mut T, surface: &mut S) -> bool
where
    T: Terminal + ?Sized,
    S: InputSurface + ?Sized,
{
    if terminal.cursor_geometry().is_none() {
        return false;
    }
    terminal.set_cursor_concealed(false);
    surface.clear_overlay();
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::{LayoutBox, Platform};
    use crate::testing::{RecordingSurface, RecordingTerminal, TerminalCall, sample_cursor_geometry};

    #[test]
    fn tracker_transitions() {
        let mut tracker = CompositionTracker::default();
        assert_eq!(tracker.state(), CompositionState::Idle);
        assert!(!tracker.begin());
        assert!(tracker.is_composing());
        assert!(tracker.begin(), "second start reports restart");
        assert!(tracker.finish());
        assert!(!tracker.finish());
        assert_eq!(tracker.state(), CompositionState::Idle);
    }

    #[test]
    fn overlay_spans_cursor_to_row_end() {
        let style = overlay_for_cursor(&sample_cursor_geometry());
        assert_eq!(
            style,
            OverlayStyle {
                top: 36,
                left: 72,
                width: 648,
                height: 17,
                line_height: 17,
            }
        );
    }

    #[test]
    fn overlay_width_never_negative() {
        let geometry = CursorGeometry {
            cursor: LayoutBox {
                offset_left: 900,
                offset_height: 17,
                ..LayoutBox::default()
            },
            rows: LayoutBox {
                offset_width: 720,
                ..LayoutBox::default()
            },
        };
        assert_eq!(overlay_for_cursor(&geometry).width, 0);
    }

    #[test]
    fn placement_conceals_cursor_and_clear_restores() {
        let mut terminal = RecordingTerminal::new(Platform::default());
        let mut surface = RecordingSurface::new();

        assert!(position_overlay(&mut terminal, &mut surface));
        assert!(surface.overlay().is_some());
        assert!(clear_overlay(&mut terminal, &mut surface));
        assert!(surface.overlay().is_none());
        assert_eq!(
            terminal.calls(),
            &[
                TerminalCall::CursorConcealed(true),
                TerminalCall::CursorConcealed(false)
            ]
        );
    }

    #[test]
    fn missing_cursor_glyph_is_a_noop() {
        let mut terminal = RecordingTerminal::new(Platform::default()).with_cursor(None);
        let mut surface = RecordingSurface::new();

        assert!(!position_overlay(&mut terminal, &mut surface));
        assert!(!clear_overlay(&mut terminal, &mut surface));
        assert!(terminal.calls().is_empty());
        assert_eq!(surface.overlay_count(), 0);
    }
}
