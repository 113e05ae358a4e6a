//! JSON envelope returned by every bridge endpoint.

use serde::Serialize;

/// Application identifier reported by `GET /health`.
pub const APP_ID: &str = "MBBridgeCtrl";

/// Response body shared by all routes: `{"ok":1}`, `{"ok":1,"app":".."}` or
/// `{"ok":0,"err":".."}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HttpEnvelope {
    /// `1` on success, `0` on failure.
    pub ok: u8,
    /// Short human-readable failure description.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub err: Option<String>,
    /// Application identifier, present on health responses.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub app: Option<String>,
}

impl HttpEnvelope {
    /// Plain success envelope.
    #[must_use]
    pub const fn success() -> Self {
        Self {
            ok: 1,
            err: None,
            app: None,
        }
    }

    /// Success envelope carrying the application identifier.
    #[must_use]
    pub fn health(app: impl Into<String>) -> Self {
        Self {
            ok: 1,
            err: None,
            app: Some(app.into()),
        }
    }

    /// Failure envelope with a human-readable message.
    #[must_use]
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            ok: 0,
            err: Some(message.into()),
            app: None,
        }
    }

    /// Serialises the envelope to compact JSON.
    ///
    /// # Errors
    ///
    /// Propagates `serde_json` failures, which cannot occur for this shape in
    /// practice but are surfaced rather than hidden.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}
