#![forbid(unsafe_code)]

//! Error type for the fallible edges of the input path.
//!
//! Dispatch itself never fails: unusable events are dropped silently. Errors
//! only arise when decoding host-supplied JSON, parsing event type names, or
//! validating configuration.

use core::fmt;

#[derive(Debug)]
pub enum InputError {
    /// Host JSON did not match the event or config schema.
    Json(serde_json::Error),
    /// DOM event type this crate does not observe.
    UnknownEventType(String),
    /// Configuration value out of range.
    InvalidConfig(&'static str),
}

impl fmt::Display for InputError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Json(err) => write!(f, "invalid input json: {err}"),
            Self::UnknownEventType(ty) => write!(f, "unknown input event type: {ty}"),
            Self::InvalidConfig(msg) => write!(f, "invalid input config: {msg}"),
        }
    }
}

impl std::error::Error for InputError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Json(err) => Some(err),
            Self::UnknownEventType(_) | Self::InvalidConfig(_) => None,
        }
    }
}

impl From<serde_json::Error> for InputError {
    fn from(err: serde_json::Error) -> Self {
        Self::Json(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn json_errors_keep_their_source() {
        let err: InputError = serde_json::from_str::<u8>("nope").unwrap_err().into();
        assert!(err.to_string().starts_with("invalid input json"));
        assert!(err.source().is_some());
    }

    #[test]
    fn config_errors_have_no_source() {
        let err = InputError::InvalidConfig("commit delay too long");
        assert_eq!(err.to_string(), "invalid input config: commit delay too long");
        assert!(err.source().is_none());
    }
}
