//! Gesture dispatcher double that records what it is asked to perform.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use crate::tap::{GestureCompletion, GestureDispatcher, Rejection, TapGesture};

/// Completes or rejects gestures and keeps a copy of each one.
#[derive(Debug, Default)]
pub struct RecordingGestureDispatcher {
    gestures: Mutex<Vec<TapGesture>>,
    rejecting: AtomicBool,
}

impl RecordingGestureDispatcher {
    /// Makes every later dispatch fail.
    pub fn reject_gestures(&self) {
        self.rejecting.store(true, Ordering::SeqCst);
    }

    pub fn gestures(&self) -> Vec<TapGesture> {
        self.gestures
            .lock()
            .expect("dispatcher mutex poisoned")
            .clone()
    }
}

impl GestureDispatcher for RecordingGestureDispatcher {
    fn dispatch(
        &self,
        gesture: TapGesture,
        completion: GestureCompletion,
    ) -> Result<(), Rejection> {
        self.gestures
            .lock()
            .expect("dispatcher mutex poisoned")
            .push(gesture);
        if self.rejecting.load(Ordering::SeqCst) {
            return Err(Rejection::new(completion, "input subsystem busy"));
        }
        completion.complete();
        Ok(())
    }
}
