//! Tap dispatch between the bridge's consumer and the gesture executor.
//!
//! Requests and results travel over an in-process [`TapBus`] instead of
//! direct calls, because the requester and the executor have independent
//! lifecycles. A `TAP` request produces exactly one `TAP_RESULT`, emitted
//! when the executor's gesture settles. The requester never waits for it.

mod bus;
mod errors;
mod executor;
mod requester;

pub use self::bus::{TapBus, TapSubscription, WorkerHandle};
pub use self::errors::TapError;
pub use self::executor::{
    GestureCompletion, GestureDispatcher, Rejection, ScreenGeometry, StaticScreenGeometry,
    TapExecutor, TapGesture, TracingGestureDispatcher,
};
pub use self::requester::TapRequester;

const TAP_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::tap");
