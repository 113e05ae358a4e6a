//! Requesting side of tap dispatch.

use mbbridge_protocol::{TapMessage, TapOutcome, TapSide};
use tracing::debug;

use super::{TAP_TARGET, TapBus, TapError, WorkerHandle};

/// Publishes tap requests and watches their results.
#[derive(Debug, Clone)]
pub struct TapRequester {
    bus: TapBus,
}

impl TapRequester {
    /// Creates a requester on `bus`.
    #[must_use]
    pub const fn new(bus: TapBus) -> Self {
        Self { bus }
    }

    /// Fires a `TAP` request for `side` without waiting for its result.
    pub fn request(&self, side: TapSide) {
        let delivered = self.bus.publish(&TapMessage::Tap { side });
        debug!(
            target: TAP_TARGET,
            side = %side,
            delivered,
            "tap requested"
        );
    }

    /// Calls `on_result` for every `TAP_RESULT` seen on the bus.
    ///
    /// Results are observed for logging only; nothing waits on them.
    ///
    /// # Errors
    ///
    /// Returns [`TapError::WorkerSpawn`] if the watcher thread cannot start.
    pub fn watch_results<F>(&self, on_result: F) -> Result<WorkerHandle, TapError>
    where
        F: Fn(TapOutcome) + Send + 'static,
    {
        self.bus
            .spawn_worker("mbbridge-tap-results", move |message| {
                if let TapMessage::TapResult(outcome) = message {
                    on_result(outcome);
                }
            })
    }
}
