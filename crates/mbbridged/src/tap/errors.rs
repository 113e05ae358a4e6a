//! Errors raised on the executor side of tap dispatch.

use std::io;

use mbbridge_protocol::TapSide;
use thiserror::Error;

/// Failures recovered inside the tap executor.
///
/// They are logged and reflected in the `TAP_RESULT` success flag; none of
/// them reach the requester as an error.
#[derive(Debug, Error)]
pub enum TapError {
    /// The screen geometry provider could not report bounds.
    #[error("screen geometry unavailable: {reason}")]
    GeometryUnavailable {
        /// Provider diagnostic.
        reason: String,
    },
    /// The input subsystem refused the gesture.
    #[error("gesture for {side} tap was rejected")]
    GestureRejected {
        /// Side that was requested.
        side: TapSide,
    },
    /// A bus worker thread could not be spawned.
    #[error("failed to spawn {name} worker: {source}")]
    WorkerSpawn {
        /// Worker thread name.
        name: String,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
    /// A bus worker thread panicked before it could be joined.
    #[error("{name} worker panicked")]
    WorkerPanicked {
        /// Worker thread name.
        name: String,
    },
}

impl TapError {
    /// Builds a [`TapError::GeometryUnavailable`].
    #[must_use]
    pub fn geometry_unavailable(reason: impl Into<String>) -> Self {
        Self::GeometryUnavailable {
            reason: reason.into(),
        }
    }
}
