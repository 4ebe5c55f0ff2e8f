#![forbid(unsafe_code)]

//! Raw input event model for the textarea input path.
//!
//! The web host hands the coordinator one [`RawInputEvent`] per DOM listener
//! call (`keydown`, `keypress`, `compositionstart`, `compositionupdate`,
//! `compositionend`, `blur`). Key fields mirror the legacy DOM keyboard API
//! (`keyCode`/`charCode`/`which`) because keypress decoding depends on their
//! exact precedence, including the difference between an absent field and a
//! field that is present but zero.
//!
//! [`RawInputEventJson`] is the wire schema shared by the wasm binding and
//! recorded traces: a `type` tag plus the minimum fields needed for replay.

use core::fmt;
use core::str::FromStr;

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

use crate::error::InputError;

bitflags! {
    /// Modifier keys held during a keyboard event.
    ///
    /// These flags are encoded as a compact `u8` bitset in JSON (`mods`). The
    /// layout matches xterm's modifier parameter, which is `1 + bits`.
    #[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct Modifiers: u8 {
        const SHIFT = 0b0001;
        const ALT   = 0b0010;
        const CTRL  = 0b0100;
        const META  = 0b1000;
    }
}

impl Modifiers {
    #[must_use]
    pub const fn from_bits_truncate_u8(bits: u8) -> Self {
        Self::from_bits_truncate(bits)
    }

    /// Build from the DOM `shiftKey`/`altKey`/`ctrlKey`/`metaKey` booleans.
    #[must_use]
    pub fn from_dom_flags(shift: bool, alt: bool, ctrl: bool, meta: bool) -> Self {
        let mut mods = Self::empty();
        mods.set(Self::SHIFT, shift);
        mods.set(Self::ALT, alt);
        mods.set(Self::CTRL, ctrl);
        mods.set(Self::META, meta);
        mods
    }

    /// Whether alt, ctrl or meta is held. Shift alone never counts.
    #[must_use]
    pub const fn has_command_modifier(self) -> bool {
        self.intersects(Self::ALT.union(Self::CTRL).union(Self::META))
    }
}

/// DOM event type observed on the input surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventType {
    KeyDown,
    KeyPress,
    CompositionStart,
    CompositionUpdate,
    CompositionEnd,
    Blur,
}

impl EventType {
    /// DOM spelling of the event type.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::KeyDown => "keydown",
            Self::KeyPress => "keypress",
            Self::CompositionStart => "compositionstart",
            Self::CompositionUpdate => "compositionupdate",
            Self::CompositionEnd => "compositionend",
            Self::Blur => "blur",
        }
    }
}

impl FromStr for EventType {
    type Err = InputError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "keydown" => Self::KeyDown,
            "keypress" => Self::KeyPress,
            "compositionstart" => Self::CompositionStart,
            "compositionupdate" => Self::CompositionUpdate,
            "compositionend" => Self::CompositionEnd,
            "blur" => Self::Blur,
            other => return Err(InputError::UnknownEventType(other.to_string())),
        })
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which keyboard listener produced a [`KeyEvent`].
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KeyEventKind {
    #[default]
    Down,
    Press,
}

/// A `keydown` or `keypress` event as reported by the browser.
///
/// Numeric fields are `None` when the host did not supply them, which is
/// distinct from `Some(0)`.
#[derive(Debug, Default, Clone, PartialEq, Eq, Hash)]
pub struct KeyEvent {
    pub kind: KeyEventKind,
    pub mods: Modifiers,
    pub key_code: Option<u32>,
    pub char_code: Option<u32>,
    pub which: Option<u32>,
    pub key: Option<Box<str>>,
    pub code: Option<Box<str>>,
    pub repeat: bool,
}

impl KeyEvent {
    /// A `keydown` carrying only a `keyCode`.
    #[must_use]
    pub fn keydown(key_code: u32) -> Self {
        Self {
            kind: KeyEventKind::Down,
            key_code: Some(key_code),
            which: Some(key_code),
            ..Self::default()
        }
    }

    /// A `keypress` carrying `charCode` and `which`, the way current browsers
    /// report printable keys.
    #[must_use]
    pub fn keypress(char_code: u32) -> Self {
        Self {
            kind: KeyEventKind::Press,
            char_code: Some(char_code),
            which: Some(char_code),
            key_code: Some(char_code),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_mods(mut self, mods: Modifiers) -> Self {
        self.mods = mods;
        self
    }

    #[must_use]
    pub fn with_key(mut self, key: &str) -> Self {
        self.key = Some(key.into());
        self
    }

    #[must_use]
    pub const fn event_type(&self) -> EventType {
        match self.kind {
            KeyEventKind::Down => EventType::KeyDown,
            KeyEventKind::Press => EventType::KeyPress,
        }
    }
}

/// Phase for IME composition events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompositionPhase {
    Start,
    Update,
    /// Final text of the composition session.
    End,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CompositionEvent {
    pub phase: CompositionPhase,
    pub data: Option<Box<str>>,
}

/// One raw event observed on the input surface.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum RawInputEvent {
    Key(KeyEvent),
    Composition(CompositionEvent),
    Blur,
}

impl RawInputEvent {
    #[must_use]
    pub fn composition_start() -> Self {
        Self::Composition(CompositionEvent {
            phase: CompositionPhase::Start,
            data: None,
        })
    }

    #[must_use]
    pub fn composition_update(data: &str) -> Self {
        Self::Composition(CompositionEvent {
            phase: CompositionPhase::Update,
            data: Some(data.into()),
        })
    }

    #[must_use]
    pub fn composition_end(data: Option<&str>) -> Self {
        Self::Composition(CompositionEvent {
            phase: CompositionPhase::End,
            data: data.map(Into::into),
        })
    }

    #[must_use]
    pub const fn event_type(&self) -> EventType {
        match self {
            Self::Key(key) => key.event_type(),
            Self::Composition(comp) => match comp.phase {
                CompositionPhase::Start => EventType::CompositionStart,
                CompositionPhase::Update => EventType::CompositionUpdate,
                CompositionPhase::End => EventType::CompositionEnd,
            },
            Self::Blur => EventType::Blur,
        }
    }

    /// Encode this event as a stable JSON string.
    pub fn to_json_string(&self) -> Result<String, InputError> {
        Ok(serde_json::to_string(&RawInputEventJson::from(self))?)
    }

    /// Decode a host-supplied or recorded event.
    ///
    /// Errors occur if the JSON does not match [`RawInputEventJson`].
    pub fn from_json_str(s: &str) -> Result<Self, InputError> {
        let json: RawInputEventJson = serde_json::from_str(s)?;
        Ok(Self::from(json))
    }
}

/// Keyboard fields of the JSON wire schema.
#[derive(Debug, Default, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct KeyFieldsJson {
    #[serde(default)]
    pub mods: u8,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key_code: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub char_code: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub which: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    #[serde(default)]
    pub repeat: bool,
}

/// JSON encoding of [`RawInputEvent`], tagged by the DOM event type.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum RawInputEventJson {
    KeyDown(KeyFieldsJson),
    KeyPress(KeyFieldsJson),
    CompositionStart,
    CompositionUpdate {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        data: Option<String>,
    },
    CompositionEnd {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        data: Option<String>,
    },
    Blur,
}

impl From<&KeyEvent> for KeyFieldsJson {
    fn from(key: &KeyEvent) -> Self {
        Self {
            mods: key.mods.bits(),
            key_code: key.key_code,
            char_code: key.char_code,
            which: key.which,
            key: key.key.as_deref().map(str::to_string),
            code: key.code.as_deref().map(str::to_string),
            repeat: key.repeat,
        }
    }
}

fn key_from_fields(kind: KeyEventKind, fields: KeyFieldsJson) -> KeyEvent {
    KeyEvent {
        kind,
        mods: Modifiers::from_bits_truncate_u8(fields.mods),
        key_code: fields.key_code,
        char_code: fields.char_code,
        which: fields.which,
        key: fields.key.map(Into::into),
        code: fields.code.map(Into::into),
        repeat: fields.repeat,
    }
}

impl From<&RawInputEvent> for RawInputEventJson {
    fn from(value: &RawInputEvent) -> Self {
        match value {
            RawInputEvent::Key(key) => match key.kind {
                KeyEventKind::Down => Self::KeyDown(key.into()),
                KeyEventKind::Press => Self::KeyPress(key.into()),
            },
            RawInputEvent::Composition(comp) => {
                let data = comp.data.as_deref().map(str::to_string);
                match comp.phase {
                    CompositionPhase::Start => Self::CompositionStart,
                    CompositionPhase::Update => Self::CompositionUpdate { data },
                    CompositionPhase::End => Self::CompositionEnd { data },
                }
            }
            RawInputEvent::Blur => Self::Blur,
        }
    }
}

impl From<RawInputEventJson> for RawInputEvent {
    fn from(value: RawInputEventJson) -> Self {
        match value {
            RawInputEventJson::KeyDown(fields) => {
                Self::Key(key_from_fields(KeyEventKind::Down, fields))
            }
            RawInputEventJson::KeyPress(fields) => {
                Self::Key(key_from_fields(KeyEventKind::Press, fields))
            }
            RawInputEventJson::CompositionStart => Self::composition_start(),
            RawInputEventJson::CompositionUpdate { data } => Self::Composition(CompositionEvent {
                phase: CompositionPhase::Update,
                data: data.map(Into::into),
            }),
            RawInputEventJson::CompositionEnd { data } => Self::Composition(CompositionEvent {
                phase: CompositionPhase::End,
                data: data.map(Into::into),
            }),
            RawInputEventJson::Blur => Self::Blur,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dom_flags_map_to_bits() {
        let mods = Modifiers::from_dom_flags(false, true, true, false);
        assert_eq!(mods, Modifiers::ALT | Modifiers::CTRL);
        assert!(mods.has_command_modifier());
        assert!(!Modifiers::SHIFT.has_command_modifier());
    }

    #[test]
    fn host_keypress_payload_decodes() {
        let ev = RawInputEvent::from_json_str(
            r#"{"type":"keypress","mods":0,"char_code":97,"which":97,"key":"a"}"#,
        )
        .expect("decode");
        let RawInputEvent::Key(key) = ev else {
            panic!("expected key event");
        };
        assert_eq!(key.kind, KeyEventKind::Press);
        assert_eq!(key.char_code, Some(97));
        assert_eq!(key.key_code, None);
        assert_eq!(key.key.as_deref(), Some("a"));
    }

    #[test]
    fn missing_and_zero_fields_stay_distinct() {
        let ev = RawInputEvent::Key(KeyEvent {
            kind: KeyEventKind::Press,
            char_code: Some(0),
            which: None,
            key_code: Some(13),
            ..KeyEvent::default()
        });
        let json = ev.to_json_string().expect("serialize");
        assert!(json.contains("\"char_code\":0"));
        assert!(!json.contains("which"));
        assert_eq!(RawInputEvent::from_json_str(&json).expect("decode"), ev);
    }

    #[test]
    fn composition_end_without_data_decodes() {
        let ev = RawInputEvent::from_json_str(r#"{"type":"compositionend"}"#).expect("decode");
        assert_eq!(ev, RawInputEvent::composition_end(None));
        assert_eq!(ev.event_type(), EventType::CompositionEnd);
    }

    #[test]
    fn unknown_event_type_is_rejected() {
        assert!(matches!(
            RawInputEvent::from_json_str(r#"{"type":"keyup"}"#),
            Err(InputError::Json(_))
        ));
        assert!(matches!(
            "input".parse::<EventType>(),
            Err(InputError::UnknownEventType(ref t)) if t == "input"
        ));
    }

    #[test]
    fn event_type_names_roundtrip() {
        for ty in [
            EventType::KeyDown,
            EventType::KeyPress,
            EventType::CompositionStart,
            EventType::CompositionUpdate,
            EventType::CompositionEnd,
            EventType::Blur,
        ] {
            assert_eq!(ty.as_str().parse::<EventType>().expect("parse"), ty);
        }
    }

    #[test]
    fn string_and_json_decoders_share_vocabulary() {
        for name in [
            "keydown",
            "keypress",
            "compositionstart",
            "compositionupdate",
            "compositionend",
            "blur",
            "focusout",
            "keyup",
        ] {
            let json = format!(r#"{{"type":"{name}"}}"#);
            assert_eq!(
                name.parse::<EventType>().is_ok(),
                RawInputEvent::from_json_str(&json).is_ok(),
                "{name}"
            );
        }
    }
}
