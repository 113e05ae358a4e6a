//! Wire-level types shared by the page-turn command bridge.
//!
//! The crate holds everything that is pure data or pure computation:
//!
//! - [`Command`] and its three wire decoders (structured text, form-encoded
//!   text and raw binary), selected explicitly through [`BodyEncoding`]
//! - [`CommandKind`] classification and the [`CommandStats`] aggregator
//! - the [`HttpEnvelope`] returned by every bridge endpoint
//! - the [`LogLevel`] attached to operator log lines
//! - the tap dispatch messages ([`TapMessage`]) and the coordinate maths
//!   used by gesture executors
//!
//! Nothing here performs I/O, so every type can be exercised directly from
//! unit tests.

mod command;
mod decode;
mod envelope;
mod log_level;
mod stats;
mod tap;

pub use command::{Command, CommandKind};
pub use decode::{
    BINARY_SOURCE, BodyEncoding, BodyEncodingParseError, DecodeError, FORM_DEFAULT_SOURCE,
    WireFormat, decode,
};
pub use envelope::{APP_ID, HttpEnvelope};
pub use log_level::LogLevel;
pub use stats::CommandStats;
pub use tap::{
    CENTER_Y_PERMILLE, LEFT_X_PERMILLE, RIGHT_X_PERMILLE, ScreenBounds, TAP_DURATION, TapMessage,
    TapOutcome, TapPoint, TapSide, tap_point,
};
