//! Turns `TAP` requests into synthesised gestures.

use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Duration;

use mbbridge_config::Config;
use mbbridge_protocol::{
    ScreenBounds, TAP_DURATION, TapMessage, TapOutcome, TapPoint, TapSide, tap_point,
};
use thiserror::Error;
use tracing::{error, info, warn};

use super::{TAP_TARGET, TapBus, TapError, WorkerHandle};

/// Source of the current screen rectangle.
pub trait ScreenGeometry: Send + Sync {
    /// Current bounds of the screen the tap lands on.
    ///
    /// # Errors
    ///
    /// Returns [`TapError::GeometryUnavailable`] when bounds cannot be read.
    fn bounds(&self) -> Result<ScreenBounds, TapError>;
}

/// A single-point, zero-travel touch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TapGesture {
    /// Side the request named.
    pub side: TapSide,
    /// Where the touch lands.
    pub point: TapPoint,
    /// How long the touch is held.
    pub duration: Duration,
}

/// Input-injection primitive.
pub trait GestureDispatcher: Send + Sync {
    /// Submits `gesture`.
    ///
    /// On acceptance the dispatcher owns `completion` and must settle it
    /// from its own completion or cancellation callback. On rejection it
    /// hands `completion` back inside the [`Rejection`].
    ///
    /// # Errors
    ///
    /// Returns a [`Rejection`] when the input subsystem refuses the gesture.
    fn dispatch(&self, gesture: TapGesture, completion: GestureCompletion)
    -> Result<(), Rejection>;
}

/// A gesture the input subsystem refused.
#[derive(Debug, Error)]
#[error("gesture rejected: {reason}")]
pub struct Rejection {
    /// Completion handed back to the executor.
    pub completion: GestureCompletion,
    /// Subsystem diagnostic.
    pub reason: String,
}

impl Rejection {
    /// Wraps a returned completion with a reason.
    #[must_use]
    pub fn new(completion: GestureCompletion, reason: impl Into<String>) -> Self {
        Self {
            completion,
            reason: reason.into(),
        }
    }
}

/// One-shot reporter for a dispatched gesture.
///
/// Settling publishes the `TAP_RESULT` for the request. It happens exactly
/// once: through [`complete`](Self::complete), through
/// [`cancel`](Self::cancel), or as a failure when the completion is dropped
/// unsettled.
#[derive(Debug)]
pub struct GestureCompletion {
    bus: TapBus,
    side: TapSide,
    point: TapPoint,
    settled: bool,
}

impl GestureCompletion {
    pub(crate) const fn new(bus: TapBus, side: TapSide, point: TapPoint) -> Self {
        Self {
            bus,
            side,
            point,
            settled: false,
        }
    }

    /// Coordinate this completion reports.
    #[must_use]
    pub const fn point(&self) -> TapPoint {
        self.point
    }

    /// Reports the gesture as performed.
    pub fn complete(mut self) {
        self.settle(true);
    }

    /// Reports the gesture as cancelled.
    pub fn cancel(mut self) {
        self.settle(false);
    }

    fn settle(&mut self, success: bool) {
        if self.settled {
            return;
        }
        self.settled = true;
        let outcome = TapOutcome {
            side: self.side,
            success,
            point: self.point,
        };
        info!(
            target: TAP_TARGET,
            side = %outcome.side,
            success,
            x = outcome.point.x,
            y = outcome.point.y,
            "tap settled"
        );
        self.bus.publish(&TapMessage::TapResult(outcome));
    }
}

impl Drop for GestureCompletion {
    fn drop(&mut self) {
        self.settle(false);
    }
}

/// Executes tap requests against the injected geometry and dispatcher.
pub struct TapExecutor {
    bus: TapBus,
    geometry: Arc<dyn ScreenGeometry>,
    dispatcher: Arc<dyn GestureDispatcher>,
}

impl TapExecutor {
    /// Creates an executor publishing results on `bus`.
    #[must_use]
    pub fn new(
        bus: TapBus,
        geometry: Arc<dyn ScreenGeometry>,
        dispatcher: Arc<dyn GestureDispatcher>,
    ) -> Self {
        Self {
            bus,
            geometry,
            dispatcher,
        }
    }

    /// Performs one tap and returns the targeted point.
    ///
    /// A `TAP_RESULT` is published whatever the outcome. When bounds are
    /// unavailable no point was computed and the result reports `(0, 0)`.
    ///
    /// # Errors
    ///
    /// Returns the [`TapError`] that made the tap fail; it has already been
    /// reported on the bus.
    pub fn perform_tap(&self, side: TapSide) -> Result<TapPoint, TapError> {
        let bounds = match self.read_bounds() {
            Ok(bounds) => bounds,
            Err(error) => {
                warn!(target: TAP_TARGET, side = %side, error = %error, "cannot compute tap");
                GestureCompletion::new(self.bus.clone(), side, TapPoint::default()).cancel();
                return Err(error);
            }
        };

        let point = tap_point(bounds, side);
        let gesture = TapGesture {
            side,
            point,
            duration: TAP_DURATION,
        };
        info!(
            target: TAP_TARGET,
            side = %side,
            x = point.x,
            y = point.y,
            "dispatching tap"
        );
        let completion = GestureCompletion::new(self.bus.clone(), side, point);
        match self.dispatcher.dispatch(gesture, completion) {
            Ok(()) => Ok(point),
            Err(rejection) => {
                warn!(
                    target: TAP_TARGET,
                    side = %side,
                    reason = %rejection.reason,
                    "gesture rejected"
                );
                rejection.completion.cancel();
                Err(TapError::GestureRejected { side })
            }
        }
    }

    fn read_bounds(&self) -> Result<ScreenBounds, TapError> {
        panic::catch_unwind(AssertUnwindSafe(|| self.geometry.bounds()))
            .unwrap_or_else(|_| Err(TapError::geometry_unavailable("geometry provider panicked")))
    }

    /// Serves `TAP` requests from the bus on a worker thread.
    ///
    /// # Errors
    ///
    /// Returns [`TapError::WorkerSpawn`] if the thread cannot be started.
    pub fn spawn(self) -> Result<WorkerHandle, TapError> {
        let bus = self.bus.clone();
        bus.spawn_worker("mbbridge-tap-executor", move |message| {
            let TapMessage::Tap { side } = message else {
                return;
            };
            // A panicking dispatcher drops its completion, which reports failure.
            let outcome = panic::catch_unwind(AssertUnwindSafe(|| self.perform_tap(side)));
            if outcome.is_err() {
                error!(target: TAP_TARGET, side = %side, "gesture dispatcher panicked");
            }
        })
    }
}

/// Geometry provider reporting a fixed screen size.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StaticScreenGeometry {
    bounds: ScreenBounds,
}

impl StaticScreenGeometry {
    /// Reports `bounds` on every call.
    #[must_use]
    pub const fn new(bounds: ScreenBounds) -> Self {
        Self { bounds }
    }

    /// Uses the configured screen size anchored at the origin.
    #[must_use]
    pub const fn from_config(config: &Config) -> Self {
        Self::new(ScreenBounds::from_size(
            config.screen_width,
            config.screen_height,
        ))
    }
}

impl ScreenGeometry for StaticScreenGeometry {
    fn bounds(&self) -> Result<ScreenBounds, TapError> {
        if self.bounds.width == 0 || self.bounds.height == 0 {
            return Err(TapError::geometry_unavailable("screen size is not configured"));
        }
        Ok(self.bounds)
    }
}

/// Dispatcher for hosts without an input subsystem: records the gesture in
/// the log and completes it straight away.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingGestureDispatcher;

impl GestureDispatcher for TracingGestureDispatcher {
    fn dispatch(
        &self,
        gesture: TapGesture,
        completion: GestureCompletion,
    ) -> Result<(), Rejection> {
        info!(
            target: TAP_TARGET,
            side = %gesture.side,
            x = gesture.point.x,
            y = gesture.point.y,
            duration_ms = u64::try_from(gesture.duration.as_millis()).unwrap_or(u64::MAX),
            "synthesised tap"
        );
        completion.complete();
        Ok(())
    }
}
