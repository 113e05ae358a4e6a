//! Decoding of `/cmd` request bodies into [`Command`] values.
//!
//! Three wire formats exist. A deployment picks one [`BodyEncoding`] up
//! front: the `text` deployment accepts structured-text objects and
//! form-encoded bodies, the `binary` deployment accepts a single command
//! byte. Exactly one [`WireFormat`] is attempted per request; a body that
//! fails its format is rejected rather than retried under another.

use std::num::NonZeroU32;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use strum::{Display, EnumString};
use thiserror::Error;

use crate::command::Command;

/// Source tag assigned to binary commands, which carry no metadata.
pub const BINARY_SOURCE: &str = "bridge";

/// Source tag assigned to form-encoded commands that omit `source`.
pub const FORM_DEFAULT_SOURCE: &str = "unknown";

/// Deployment-time selection of the `/cmd` body decoder.
#[derive(
    Debug, Clone, Copy, Default, Deserialize, Serialize, PartialEq, Eq, EnumString, Display,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum BodyEncoding {
    /// Structured-text object or form-encoded text.
    #[default]
    Text,
    /// First byte of the body is the command code.
    Binary,
}

/// Errors encountered while parsing a [`BodyEncoding`] from text.
pub type BodyEncodingParseError = strum::ParseError;

/// Concrete wire format chosen for a single request body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WireFormat {
    /// `{"v":1,"ts":1730000000000,"source":"bridge"}`
    StructuredText,
    /// `v=1&ts=1730000000000&source=bridge`
    FormEncoded,
    /// A single command byte.
    RawBinary,
}

impl WireFormat {
    /// Selects the wire format for `body` under the given deployment.
    ///
    /// Text deployments use the structured-text decoder when the first
    /// non-whitespace byte is `{` and the form decoder otherwise.
    #[must_use]
    pub fn select(encoding: BodyEncoding, body: &[u8]) -> Self {
        match encoding {
            BodyEncoding::Binary => Self::RawBinary,
            BodyEncoding::Text => {
                let first = body.iter().find(|byte| !byte.is_ascii_whitespace());
                if first == Some(&b'{') {
                    Self::StructuredText
                } else {
                    Self::FormEncoded
                }
            }
        }
    }
}

/// Reasons a request body fails to decode into a [`Command`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    /// The body was empty (or only whitespace for text formats).
    #[error("empty body")]
    EmptyBody,
    /// A text body was not valid UTF-8.
    #[error("body is not valid UTF-8")]
    InvalidUtf8,
    /// The structured-text body could not be parsed.
    #[error("malformed structured body: {message}")]
    Malformed {
        /// Parser diagnostic.
        message: String,
    },
    /// A required field was absent.
    #[error("missing field '{field}'")]
    MissingField {
        /// Name of the absent field.
        field: &'static str,
    },
    /// A field was present with the wrong type or an out-of-range value.
    #[error("invalid value for field '{field}': {value}")]
    InvalidField {
        /// Name of the offending field.
        field: &'static str,
        /// Rendering of the rejected value.
        value: String,
    },
    /// The command code was zero, which is reserved.
    #[error("command code 0 is reserved")]
    ZeroCommand,
}

impl DecodeError {
    fn malformed(message: impl Into<String>) -> Self {
        Self::Malformed {
            message: message.into(),
        }
    }

    fn invalid_field(field: &'static str, value: impl Into<String>) -> Self {
        Self::InvalidField {
            field,
            value: value.into(),
        }
    }
}

/// Decodes a request body using the decoder selected by `encoding`.
///
/// # Errors
///
/// Returns a [`DecodeError`] describing the first violation found. A zero
/// command code is always rejected, whichever format carried it.
pub fn decode(body: &[u8], encoding: BodyEncoding) -> Result<Command, DecodeError> {
    match WireFormat::select(encoding, body) {
        WireFormat::StructuredText => decode_structured(body),
        WireFormat::FormEncoded => decode_form(body),
        WireFormat::RawBinary => decode_binary(body),
    }
}

fn decode_structured(body: &[u8]) -> Result<Command, DecodeError> {
    let text = text_body(body)?;
    let parsed: Value =
        serde_json::from_str(text).map_err(|error| DecodeError::malformed(error.to_string()))?;
    let Value::Object(fields) = parsed else {
        return Err(DecodeError::malformed("expected an object"));
    };

    let value = match fields.get("v") {
        None => return Err(DecodeError::MissingField { field: "v" }),
        Some(raw) => raw
            .as_u64()
            .ok_or_else(|| DecodeError::invalid_field("v", raw.to_string()))
            .and_then(|code| command_code(code, &raw.to_string()))?,
    };
    let timestamp = match fields.get("ts") {
        None => return Err(DecodeError::MissingField { field: "ts" }),
        Some(raw) => raw
            .as_i64()
            .ok_or_else(|| DecodeError::invalid_field("ts", raw.to_string()))?,
    };
    let source = match fields.get("source") {
        None => return Err(DecodeError::MissingField { field: "source" }),
        Some(Value::String(source)) => source.clone(),
        Some(raw) => return Err(DecodeError::invalid_field("source", raw.to_string())),
    };

    Ok(Command::new(value, timestamp, source))
}

fn decode_form(body: &[u8]) -> Result<Command, DecodeError> {
    text_body(body)?;

    let mut value = None;
    let mut timestamp = None;
    let mut source = None;
    for (key, raw) in url::form_urlencoded::parse(body) {
        match key.as_ref() {
            "v" if value.is_none() => value = Some(raw.into_owned()),
            "ts" if timestamp.is_none() => timestamp = Some(raw.into_owned()),
            "source" if source.is_none() => source = Some(raw.into_owned()),
            _ => {}
        }
    }

    let raw_value = value.ok_or(DecodeError::MissingField { field: "v" })?;
    let code = raw_value
        .trim()
        .parse::<u64>()
        .map_err(|_| DecodeError::invalid_field("v", raw_value.as_str()))?;
    let command_value = command_code(code, &raw_value)?;

    let raw_timestamp = timestamp.ok_or(DecodeError::MissingField { field: "ts" })?;
    let ts = raw_timestamp
        .trim()
        .parse::<i64>()
        .map_err(|_| DecodeError::invalid_field("ts", raw_timestamp.as_str()))?;

    Ok(Command::new(
        command_value,
        ts,
        source.unwrap_or_else(|| FORM_DEFAULT_SOURCE.to_owned()),
    ))
}

fn decode_binary(body: &[u8]) -> Result<Command, DecodeError> {
    let first = body.first().ok_or(DecodeError::EmptyBody)?;
    let value = NonZeroU32::new(u32::from(*first)).ok_or(DecodeError::ZeroCommand)?;
    Ok(Command::new(value, 0, BINARY_SOURCE))
}

fn text_body(body: &[u8]) -> Result<&str, DecodeError> {
    let text = std::str::from_utf8(body).map_err(|_| DecodeError::InvalidUtf8)?;
    if text.trim().is_empty() {
        return Err(DecodeError::EmptyBody);
    }
    Ok(text)
}

fn command_code(code: u64, raw: &str) -> Result<NonZeroU32, DecodeError> {
    let narrowed = u32::try_from(code).map_err(|_| DecodeError::invalid_field("v", raw))?;
    NonZeroU32::new(narrowed).ok_or(DecodeError::ZeroCommand)
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;
    use crate::command::CommandKind;

    #[rstest]
    #[case(br#"{"v":1,"ts":1730000000000,"source":"bridge"}"#, CommandKind::Prev)]
    #[case(br#"{"v":2,"ts":1730000000000,"source":"bridge"}"#, CommandKind::Next)]
    #[case(br#"{"v":9,"ts":1,"source":"remote"}"#, CommandKind::Unknown(9))]
    #[case(b"  \n{\"v\":1,\"ts\":0,\"source\":\"x\"}", CommandKind::Prev)]
    fn structured_text_classifies(#[case] body: &[u8], #[case] expected: CommandKind) {
        let command = decode(body, BodyEncoding::Text).expect("structured body decodes");
        assert_eq!(command.kind(), expected);
    }

    #[test]
    fn structured_text_keeps_all_fields() {
        let command = decode(
            br#"{"v":2,"ts":1730000000000,"source":"mbbridge"}"#,
            BodyEncoding::Text,
        )
        .expect("decodes");
        assert_eq!(command.value(), 2);
        assert_eq!(command.timestamp(), 1_730_000_000_000);
        assert_eq!(command.source(), "mbbridge");
    }

    #[rstest]
    #[case(br#"{"ts":1,"source":"x"}"#, DecodeError::MissingField { field: "v" })]
    #[case(br#"{"v":1,"source":"x"}"#, DecodeError::MissingField { field: "ts" })]
    #[case(br#"{"v":1,"ts":1}"#, DecodeError::MissingField { field: "source" })]
    #[case(br#"{"v":0,"ts":1,"source":"x"}"#, DecodeError::ZeroCommand)]
    fn structured_text_rejects_missing_or_zero(#[case] body: &[u8], #[case] expected: DecodeError) {
        assert_eq!(decode(body, BodyEncoding::Text), Err(expected));
    }

    #[rstest]
    #[case(br#"{"v":"1","ts":1,"source":"x"}"#, "v")]
    #[case(br#"{"v":-1,"ts":1,"source":"x"}"#, "v")]
    #[case(br#"{"v":1.5,"ts":1,"source":"x"}"#, "v")]
    #[case(br#"{"v":4294967296,"ts":1,"source":"x"}"#, "v")]
    #[case(br#"{"v":1,"ts":"now","source":"x"}"#, "ts")]
    #[case(br#"{"v":1,"ts":1,"source":7}"#, "source")]
    fn structured_text_rejects_wrong_types(#[case] body: &[u8], #[case] expected: &str) {
        match decode(body, BodyEncoding::Text) {
            Err(DecodeError::InvalidField { field, .. }) => assert_eq!(field, expected),
            other => panic!("expected invalid field {expected}, got {other:?}"),
        }
    }

    #[rstest]
    #[case(b"{not json")]
    #[case(b"{\"v\":1")]
    fn structured_text_rejects_malformed(#[case] body: &[u8]) {
        assert!(matches!(
            decode(body, BodyEncoding::Text),
            Err(DecodeError::Malformed { .. })
        ));
    }

    #[rstest]
    #[case(b"")]
    #[case(b"   \r\n")]
    fn text_rejects_blank_bodies(#[case] body: &[u8]) {
        assert_eq!(decode(body, BodyEncoding::Text), Err(DecodeError::EmptyBody));
    }

    #[test]
    fn text_rejects_invalid_utf8() {
        assert_eq!(
            decode(&[0xff, 0xfe], BodyEncoding::Text),
            Err(DecodeError::InvalidUtf8)
        );
    }

    #[test]
    fn form_defaults_missing_source() {
        let command = decode(b"v=2&ts=1730000000000", BodyEncoding::Text).expect("decodes");
        assert_eq!(command.kind(), CommandKind::Next);
        assert_eq!(command.source(), FORM_DEFAULT_SOURCE);
    }

    #[test]
    fn form_percent_decodes_values() {
        let command =
            decode(b"source=page%20turner&ts=42&v=1", BodyEncoding::Text).expect("decodes");
        assert_eq!(command.source(), "page turner");
        assert_eq!(command.timestamp(), 42);
        assert_eq!(command.kind(), CommandKind::Prev);
    }

    #[rstest]
    #[case(b"ts=1&source=x", DecodeError::MissingField { field: "v" })]
    #[case(b"v=1&source=x", DecodeError::MissingField { field: "ts" })]
    #[case(b"v=0&ts=1", DecodeError::ZeroCommand)]
    fn form_rejects_missing_or_zero(#[case] body: &[u8], #[case] expected: DecodeError) {
        assert_eq!(decode(body, BodyEncoding::Text), Err(expected));
    }

    #[rstest]
    #[case(b"v=one&ts=1")]
    #[case(b"v=1&ts=soon")]
    #[case(b"v=-2&ts=1")]
    fn form_rejects_non_integers(#[case] body: &[u8]) {
        assert!(matches!(
            decode(body, BodyEncoding::Text),
            Err(DecodeError::InvalidField { .. })
        ));
    }

    #[rstest]
    #[case(1, "bridge")]
    #[case(2, "page turner & co")]
    #[case(200, "ünïcode/σ=1")]
    fn form_round_trips_through_encoding(#[case] value: u32, #[case] source: &str) {
        let code = NonZeroU32::new(value).expect("nonzero");
        let sent = Command::new(code, 1_730_000_000_000, source);
        let body = sent.to_form_body();
        let decoded = decode(body.as_bytes(), BodyEncoding::Text).expect("round trip decodes");
        assert_eq!(decoded, sent);
    }

    #[rstest]
    #[case(&[1], 1)]
    #[case(&[2, 0, 0], 2)]
    #[case(&[0x7f], 0x7f)]
    #[case(&[0xff, 1], 0xff)]
    fn binary_uses_first_byte(#[case] body: &[u8], #[case] expected: u32) {
        let command = decode(body, BodyEncoding::Binary).expect("binary decodes");
        assert_eq!(command.value(), expected);
        assert_eq!(command.timestamp(), 0);
        assert_eq!(command.source(), BINARY_SOURCE);
    }

    #[test]
    fn binary_succeeds_iff_first_byte_nonzero() {
        for first in 0_u8..=255 {
            let result = decode(&[first, 0x10], BodyEncoding::Binary);
            if first == 0 {
                assert_eq!(result, Err(DecodeError::ZeroCommand));
            } else {
                let command = result.expect("nonzero byte decodes");
                assert_eq!(command.value(), u32::from(first));
            }
        }
    }

    #[test]
    fn binary_rejects_empty_body() {
        assert_eq!(decode(b"", BodyEncoding::Binary), Err(DecodeError::EmptyBody));
    }

    #[test]
    fn binary_deployment_never_parses_text() {
        let command = decode(br#"{"v":2,"ts":1,"source":"x"}"#, BodyEncoding::Binary)
            .expect("first byte is nonzero");
        assert_eq!(command.value(), u32::from(b'{'));
    }

    #[rstest]
    #[case("text", BodyEncoding::Text)]
    #[case("BINARY", BodyEncoding::Binary)]
    fn body_encoding_parses_case_insensitively(#[case] raw: &str, #[case] expected: BodyEncoding) {
        assert_eq!(raw.parse::<BodyEncoding>().expect("parses"), expected);
    }
}
