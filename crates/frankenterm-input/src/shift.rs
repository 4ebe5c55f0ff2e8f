#![forbid(unsafe_code)]

//! Third-level shift (AltGr-equivalent) classification.
//!
//! On macOS, Option produces characters on its own; on Windows, AltGr is
//! reported as Ctrl+Alt. Such combinations must reach the OS untouched so it
//! can produce its own character, instead of being cancelled or treated as
//! terminal shortcuts.

use crate::event::{KeyEvent, KeyEventKind, Modifiers};
use crate::host::Platform;

/// Highest `keyCode` of the navigation/editing block (arrows, Home, Delete, ...).
const LAST_NAVIGATION_KEY_CODE: u32 = 47;

/// Whether `event` is a platform third-level shift combination.
///
/// For `keydown`, navigation and editing keys never qualify, so Option+Left
/// on a Mac still reaches the key-escape resolver.
#[must_use]
pub fn is_third_level_shift(platform: Platform, event: &KeyEvent) -> bool {
    let alt = event.mods.contains(Modifiers::ALT);
    let ctrl = event.mods.contains(Modifiers::CTRL);
    let meta = event.mods.contains(Modifiers::META);

    let third_level = (platform.is_mac && alt && !ctrl && !meta)
        || (platform.is_ms_windows && alt && ctrl && !meta);

    match event.kind {
        KeyEventKind::Press => third_level,
        KeyEventKind::Down => {
            third_level
                && event
                    .key_code
                    .is_none_or(|code| code == 0 || code > LAST_NAVIGATION_KEY_CODE)
        }
    }
}
