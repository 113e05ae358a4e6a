//! The normalised page-turn command and its classification.

use std::fmt;
use std::num::NonZeroU32;

/// One page-turn trigger event decoded from a bridge request.
///
/// The command value is never zero: zero is reserved on every wire format
/// and decoding it fails instead of producing a command.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Command {
    value: NonZeroU32,
    timestamp: i64,
    source: String,
}

impl Command {
    /// Builds a command from its decoded fields.
    #[must_use]
    pub fn new(value: NonZeroU32, timestamp: i64, source: impl Into<String>) -> Self {
        Self {
            value,
            timestamp,
            source: source.into(),
        }
    }

    /// Integer command code carried on the wire.
    #[must_use]
    pub const fn value(&self) -> u32 {
        self.value.get()
    }

    /// Milliseconds since the Unix epoch, or `0` when the wire format carries
    /// no timestamp.
    #[must_use]
    pub const fn timestamp(&self) -> i64 {
        self.timestamp
    }

    /// Free-text origin tag.
    #[must_use]
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Classifies the command from its value.
    #[must_use]
    pub const fn kind(&self) -> CommandKind {
        CommandKind::from_value(self.value.get())
    }

    /// Renders the command as a form-encoded body (`v=..&ts=..&source=..`).
    #[must_use]
    pub fn to_form_body(&self) -> String {
        url::form_urlencoded::Serializer::new(String::new())
            .append_pair("v", &self.value.to_string())
            .append_pair("ts", &self.timestamp.to_string())
            .append_pair("source", &self.source)
            .finish()
    }
}

/// Derived classification of a [`Command`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CommandKind {
    /// Turn to the previous page (`v == 1`).
    Prev,
    /// Turn to the next page (`v == 2`).
    Next,
    /// Any other command code.
    Unknown(u32),
}

impl CommandKind {
    /// Maps a command code onto its classification. Total over `u32`.
    #[must_use]
    pub const fn from_value(value: u32) -> Self {
        match value {
            1 => Self::Prev,
            2 => Self::Next,
            other => Self::Unknown(other),
        }
    }

    /// Command code a synthetic command of this kind should carry.
    #[must_use]
    pub const fn value(self) -> u32 {
        match self {
            Self::Prev => 1,
            Self::Next => 2,
            Self::Unknown(value) => value,
        }
    }
}

impl fmt::Display for CommandKind {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Prev => formatter.write_str("PREV"),
            Self::Next => formatter.write_str("NEXT"),
            Self::Unknown(value) => write!(formatter, "UNKNOWN({value})"),
        }
    }
}
