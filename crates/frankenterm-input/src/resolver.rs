#![forbid(unsafe_code)]

//! Key-escape resolution for `keydown` events.
//!
//! [`KeyEscapeResult`] is the contract between the dispatch gate and whatever
//! resolver the terminal uses. [`XtermKeyResolver`] is the reference resolver:
//! it maps legacy DOM `keyCode`s to the byte sequences an xterm-compatible
//! application expects. Printable keys without command modifiers resolve to
//! nothing, leaving them to the following `keypress`.

use crate::event::{KeyEvent, Modifiers};
use crate::host::Platform;

/// Outcome of resolving one `keydown`.
#[derive(Debug, Default, Clone, PartialEq, Eq, Hash)]
pub struct KeyEscapeResult {
    /// Scroll the viewport instead of sending anything.
    pub scroll_disp: Option<i32>,
    /// The browser default should be cancelled even if no key results.
    pub cancel: bool,
    /// Sequence to commit.
    pub key: Option<String>,
}

impl KeyEscapeResult {
    #[must_use]
    pub fn key(key: impl Into<String>) -> Self {
        Self {
            key: Some(key.into()),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn scroll(delta: i32) -> Self {
        Self {
            scroll_disp: Some(delta),
            ..Self::default()
        }
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.scroll_disp.is_none() && !self.cancel && self.key.is_none()
    }
}

/// Options controlling [`XtermKeyResolver`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ResolverOptions {
    pub platform: Platform,
    /// DECCKM: arrows and Home/End use SS3 instead of CSI.
    pub application_cursor: bool,
    /// Treat Option as Meta on macOS (ESC-prefix alt+letter).
    pub mac_option_is_meta: bool,
    /// Visible rows; Shift+PageUp/PageDown scroll by `rows - 1`.
    pub rows: u16,
}

impl Default for ResolverOptions {
    fn default() -> Self {
        Self {
            platform: Platform::default(),
            application_cursor: false,
            mac_option_is_meta: false,
            rows: 24,
        }
    }
}

/// Reference xterm key-escape resolver keyed on DOM `keyCode`.
#[derive(Debug, Default, Clone)]
pub struct XtermKeyResolver {
    pub options: ResolverOptions,
}

impl XtermKeyResolver {
    #[must_use]
    pub const fn new(options: ResolverOptions) -> Self {
        Self { options }
    }

    #[must_use]
    pub fn resolve(&self, event: &KeyEvent) -> KeyEscapeResult {
        let Some(code) = event.key_code.filter(|code| *code != 0) else {
            return KeyEscapeResult::default();
        };
        let mods = event.mods;
        let shift = mods.contains(Modifiers::SHIFT);
        let ctrl = mods.contains(Modifiers::CTRL);
        let app = self.options.application_cursor;
        let page = i32::from(self.options.rows.saturating_sub(1));

        let mut result = KeyEscapeResult::default();
        match code {
            // Backspace
            8 => {
                let key = if shift { "\x08" } else { "\x7f" };
                result.key = Some(key.to_string());
            }
            // Tab
            9 => {
                if shift {
                    result.key = Some("\x1b[Z".to_string());
                } else {
                    result.key = Some("\t".to_string());
                    result.cancel = true;
                }
            }
            13 => {
                result.key = Some("\r".to_string());
                result.cancel = true;
            }
            27 => {
                result.key = Some("\x1b".to_string());
                result.cancel = true;
            }
            37 => result.key = Some(cursor_key('D', mods, app, true)),
            38 => result.key = Some(cursor_key('A', mods, app, false)),
            39 => result.key = Some(cursor_key('C', mods, app, true)),
            40 => result.key = Some(cursor_key('B', mods, app, false)),
            // Shift+Insert and Ctrl+Insert belong to the clipboard.
            45 if !shift && !ctrl => result.key = Some(csi_tilde_with_mod(2, Modifiers::empty())),
            45 => {}
            46 => result.key = Some(csi_tilde_with_mod(3, mods)),
            36 => result.key = Some(cursor_key('H', mods, app, false)),
            35 => result.key = Some(cursor_key('F', mods, app, false)),
            33 if shift => result.scroll_disp = Some(-page),
            33 => result.key = Some(csi_tilde_with_mod(5, mods)),
            34 if shift => result.scroll_disp = Some(page),
            34 => result.key = Some(csi_tilde_with_mod(6, mods)),
            112..=123 => result.key = Some(function_key(code - 111, mods)),
            _ => result.key = self.modified_char(code, mods),
        }
        result
    }

    /// Ctrl/Alt chords on printable keys.
    fn modified_char(&self, code: u32, mods: Modifiers) -> Option<String> {
        let alt = mods.contains(Modifiers::ALT);
        let meta = mods.contains(Modifiers::META);
        let platform = self.options.platform;

        if mods == Modifiers::CTRL {
            let byte = match code {
                65..=90 => code - 64,
                32 => 0,
                51..=55 => code - 51 + 27,
                56 => 0x7f,
                219 => 0x1b,
                220 => 0x1c,
                221 => 0x1d,
                _ => return None,
            };
            return char::from_u32(byte).map(String::from);
        }

        let alt_is_meta = !platform.is_mac || self.options.mac_option_is_meta;
        if alt_is_meta && alt && !mods.contains(Modifiers::CTRL) && !meta {
            let ch = match code {
                65..=90 => char::from_u32(code + 32)?,
                48..=57 => char::from_u32(code)?,
                192 => '`',
                _ => return None,
            };
            return Some(format!("\x1b{ch}"));
        }
        None
    }
}

/// Arrows and Home/End.
///
/// Alt+Left/Right are rewritten to their Ctrl form so shells move by word.
fn cursor_key(
    final_byte: char,
    mods: Modifiers,
    application_cursor: bool,
    word_motion: bool,
) -> String {
    if mods.is_empty() {
        return if application_cursor {
            format!("\x1bO{final_byte}")
        } else {
            format!("\x1b[{final_byte}")
        };
    }
    let mods = if word_motion && mods == Modifiers::ALT {
        Modifiers::CTRL
    } else {
        mods
    };
    csi_with_mod_or_plain(final_byte, mods)
}

fn function_key(n: u32, mods: Modifiers) -> String {
    match n {
        1..=4 => {
            let ss3 = match n {
                1 => 'P',
                2 => 'Q',
                3 => 'R',
                _ => 'S',
            };
            if mods.is_empty() {
                format!("\x1bO{ss3}")
            } else {
                csi_with_mod_or_plain(ss3, mods)
            }
        }
        5 => csi_tilde_with_mod(15, mods),
        6 => csi_tilde_with_mod(17, mods),
        7 => csi_tilde_with_mod(18, mods),
        8 => csi_tilde_with_mod(19, mods),
        9 => csi_tilde_with_mod(20, mods),
        10 => csi_tilde_with_mod(21, mods),
        11 => csi_tilde_with_mod(23, mods),
        _ => csi_tilde_with_mod(24, mods),
    }
}

fn csi_with_mod_or_plain(final_byte: char, mods: Modifiers) -> String {
    if mods.is_empty() {
        format!("\x1b[{final_byte}")
    } else {
        let mod_value = xterm_modifier_value(mods);
        format!("\x1b[1;{mod_value}{final_byte}")
    }
}

fn csi_tilde_with_mod(code: u16, mods: Modifiers) -> String {
    if mods.is_empty() {
        format!("\x1b[{code}~")
    } else {
        let mod_value = xterm_modifier_value(mods);
        format!("\x1b[{code};{mod_value}~")
    }
}

fn xterm_modifier_value(mods: Modifiers) -> u8 {
    // xterm encoding is `1 + bits`, with bits matching our bitflag layout.
    1 + mods.bits()
}
