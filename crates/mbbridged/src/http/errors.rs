//! Request-boundary failures and their HTTP mapping.

use hyper::StatusCode;
use mbbridge_protocol::{DecodeError, LogLevel};
use thiserror::Error;

/// Failures recovered at the request boundary.
///
/// None of these escape the connection handler: each one becomes a status
/// code plus an `{"ok":0,"err":..}` envelope and a log line.
#[derive(Debug, Error)]
pub enum RequestError {
    /// The method and path matched no route.
    #[error("no route for {method} {path}")]
    NotFound {
        /// Request method.
        method: String,
        /// Request path without query.
        path: String,
    },
    /// The token header was absent or wrong.
    #[error("token verification failed")]
    Unauthorized,
    /// `Content-Length` was missing or zero.
    #[error("request body is empty")]
    EmptyBody,
    /// The connection failed, stalled or closed before the declared body
    /// arrived.
    #[error("failed to read request body: {reason}")]
    BodyRead {
        /// Transport diagnostic.
        reason: String,
    },
    /// The declared body exceeds the accepted limit.
    #[error("declared body of {length} bytes exceeds {limit} bytes")]
    BodyTooLarge {
        /// Declared length.
        length: usize,
        /// Accepted limit.
        limit: usize,
    },
    /// The body did not decode into a command.
    #[error("invalid command body: {0}")]
    InvalidFormat(#[from] DecodeError),
    /// The connection did not carry a parsable HTTP/1.1 request. The HTTP
    /// layer answers these itself, so this variant only feeds the log.
    #[error("malformed HTTP request: {reason}")]
    Malformed {
        /// What was wrong with the head.
        reason: String,
    },
    /// Request processing failed unexpectedly.
    #[error("internal error: {reason}")]
    Internal {
        /// Diagnostic for the log.
        reason: String,
    },
}

impl RequestError {
    pub(crate) fn malformed(reason: impl Into<String>) -> Self {
        Self::Malformed {
            reason: reason.into(),
        }
    }

    pub(crate) fn body_read(reason: impl Into<String>) -> Self {
        Self::BodyRead {
            reason: reason.into(),
        }
    }

    pub(crate) fn internal(reason: impl Into<String>) -> Self {
        Self::Internal {
            reason: reason.into(),
        }
    }

    /// Status code for the error response.
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::NotFound { .. } => StatusCode::NOT_FOUND,
            Self::Unauthorized => StatusCode::UNAUTHORIZED,
            Self::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            Self::EmptyBody
            | Self::BodyRead { .. }
            | Self::BodyTooLarge { .. }
            | Self::InvalidFormat(_)
            | Self::Malformed { .. } => StatusCode::BAD_REQUEST,
        }
    }

    /// Short text placed in the envelope's `err` field.
    #[must_use]
    pub const fn client_message(&self) -> &'static str {
        match self {
            Self::NotFound { .. } => "Not found",
            Self::Unauthorized => "Unauthorized: Invalid or missing token",
            Self::EmptyBody | Self::InvalidFormat(DecodeError::EmptyBody) => {
                "Bad request: Empty body"
            }
            Self::BodyRead { .. } => "Bad request: Failed to read body",
            Self::BodyTooLarge { .. } => "Bad request: Body too large",
            Self::InvalidFormat(_) => "Bad request: Invalid format",
            Self::Malformed { .. } => "Bad request: Malformed HTTP request",
            Self::Internal { .. } => "Internal error",
        }
    }

    /// Level of the operator log line emitted for this failure.
    #[must_use]
    pub const fn log_level(&self) -> LogLevel {
        match self {
            Self::Internal { .. } | Self::BodyRead { .. } => LogLevel::Error,
            _ => LogLevel::Warn,
        }
    }
}
