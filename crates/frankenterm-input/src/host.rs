#![forbid(unsafe_code)]

//! Collaborator interfaces the coordinator drives.
//!
//! [`Terminal`] is the consumer side: key-escape resolution, scrolling,
//! browser-default cancellation, cursor visibility, commit delivery, and the
//! read-only cursor layout used to place the composition overlay.
//! [`InputSurface`] is the hidden text-entry element the browser types into.

use serde::{Deserialize, Serialize};

use crate::event::KeyEvent;
use crate::resolver::KeyEscapeResult;

/// Platform capability flags supplied by the host.
///
/// Detection is the host's job; both flags may be false on other platforms.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Platform {
    #[serde(default)]
    pub is_mac: bool,
    #[serde(default)]
    pub is_ms_windows: bool,
}

impl Platform {
    #[must_use]
    pub const fn mac() -> Self {
        Self {
            is_mac: true,
            is_ms_windows: false,
        }
    }

    #[must_use]
    pub const fn windows() -> Self {
        Self {
            is_mac: false,
            is_ms_windows: true,
        }
    }
}

/// Layout box of a rendered element, in CSS pixels relative to its offset parent.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LayoutBox {
    pub offset_top: i32,
    pub offset_left: i32,
    pub offset_width: i32,
    pub offset_height: i32,
}

/// Geometry of the rendered cursor glyph and the rows container holding it.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CursorGeometry {
    pub cursor: LayoutBox,
    pub rows: LayoutBox,
}

/// Inline style override placing the input surface over the cursor cell.
///
/// While applied, the surface is fully opaque; clearing the override restores
/// every property to the stylesheet value.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub struct OverlayStyle {
    pub top: i32,
    pub left: i32,
    pub width: i32,
    pub height: i32,
    pub line_height: i32,
}

/// CSS properties an overlay writes; clearing resets exactly these.
pub const OVERLAY_PROPERTIES: [&str; 6] = ["top", "left", "width", "height", "line-height", "opacity"];

impl OverlayStyle {
    /// CSS declarations in [`OVERLAY_PROPERTIES`] order.
    #[must_use]
    pub fn css_declarations(&self) -> [(&'static str, String); 6] {
        [
            ("top", format!("{}px", self.top)),
            ("left", format!("{}px", self.left)),
            ("width", format!("{}px", self.width)),
            ("height", format!("{}px", self.height)),
            ("line-height", format!("{}px", self.line_height)),
            ("opacity", "1".to_string()),
        ]
    }
}

/// Terminal consumer of committed keys.
pub trait Terminal {
    /// Translate a `keydown` into a scroll request, a cancel hint and/or a key.
    fn evaluate_key_escape_sequence(&self, event: &KeyEvent) -> KeyEscapeResult;

    /// Scroll the viewport by `delta` rows.
    fn scroll_disp(&mut self, delta: i32);

    /// Cancel the browser default for `event`. Returns the value the DOM
    /// listener should return.
    fn cancel(&mut self, event: &KeyEvent, force: bool) -> bool;

    /// Make the cursor visible (typing resets blink/hidden state).
    fn show_cursor(&mut self);

    /// Deliver one committed key or text unit.
    fn handler(&mut self, key: &str);

    /// Cursor glyph layout, or `None` when no cursor glyph is rendered.
    fn cursor_geometry(&self) -> Option<CursorGeometry>;

    /// Hide or restore the cursor glyph while the overlay covers it.
    fn set_cursor_concealed(&mut self, concealed: bool);
}

/// Host text-entry element that receives raw typing and IME text.
pub trait InputSurface {
    /// Text currently buffered in the element.
    fn buffered_text(&self) -> String;

    fn clear_buffer(&mut self);

    fn apply_overlay(&mut self, style: &OverlayStyle);

    fn clear_overlay(&mut self);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn overlay_declarations_use_pixels() {
        let style = OverlayStyle {
            top: 34,
            left: 72,
            width: 568,
            height: 17,
            line_height: 17,
        };
        let decls = style.css_declarations();
        assert_eq!(decls[0], ("top", "34px".to_string()));
        assert_eq!(decls[4], ("line-height", "17px".to_string()));
        assert_eq!(decls[5], ("opacity", "1".to_string()));
        let names: Vec<&str> = decls.iter().map(|(name, _)| *name).collect();
        assert_eq!(names, OVERLAY_PROPERTIES);
    }

    #[test]
    fn platform_json_defaults_missing_flags() {
        let platform: Platform = serde_json::from_str(r#"{"is_mac":true}"#).expect("decode");
        assert_eq!(platform, Platform::mac());
    }
}
