//! Single-slot observer registration.
//!
//! The bridge serves one controlling consumer at a time. Registering an
//! observer replaces whatever was in the slot and registering `None` empties
//! it. A notification captures the observer at its start, so a swap during
//! delivery never tears the in-flight call.

use std::sync::{Arc, PoisonError, RwLock};

use mbbridge_protocol::{Command, LogLevel};

/// Receives every successfully decoded command.
pub trait CommandObserver: Send + Sync {
    /// Called once per accepted `/cmd` request, on a request worker thread.
    fn on_command(&self, command: &Command);
}

impl<F> CommandObserver for F
where
    F: Fn(&Command) + Send + Sync,
{
    fn on_command(&self, command: &Command) {
        self(command);
    }
}

/// Receives operator log lines raised by the bridge.
pub trait LogObserver: Send + Sync {
    /// Called for every bridge log line, including handled errors.
    fn on_log(&self, level: LogLevel, message: &str);
}

impl<F> LogObserver for F
where
    F: Fn(LogLevel, &str) + Send + Sync,
{
    fn on_log(&self, level: LogLevel, message: &str) {
        self(level, message);
    }
}

/// Atomically swappable optional observer.
pub(crate) struct ObserverSlot<T: ?Sized> {
    current: RwLock<Option<Arc<T>>>,
}

impl<T: ?Sized> ObserverSlot<T> {
    pub(crate) const fn empty() -> Self {
        Self {
            current: RwLock::new(None),
        }
    }

    /// Installs `observer`, returning the one it displaced.
    pub(crate) fn replace(&self, observer: Option<Arc<T>>) -> Option<Arc<T>> {
        let mut slot = self
            .current
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        std::mem::replace(&mut *slot, observer)
    }

    /// Snapshot of the registered observer.
    pub(crate) fn current(&self) -> Option<Arc<T>> {
        self.current
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl<T: ?Sized> Default for ObserverSlot<T> {
    fn default() -> Self {
        Self::empty()
    }
}

#[cfg(test)]
mod tests {
    use std::num::NonZeroU32;
    use std::sync::Mutex;

    use super::*;

    fn command(code: u32) -> Command {
        Command::new(
            NonZeroU32::new(code).expect("nonzero code"),
            0,
            "test",
        )
    }

    #[test]
    fn registration_replaces_rather_than_stacks() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let slot: ObserverSlot<dyn CommandObserver> = ObserverSlot::empty();

        let first_seen = Arc::clone(&seen);
        slot.replace(Some(Arc::new(move |command: &Command| {
            first_seen.lock().expect("lock").push(("first", command.value()));
        })));
        let second_seen = Arc::clone(&seen);
        let displaced = slot.replace(Some(Arc::new(move |command: &Command| {
            second_seen.lock().expect("lock").push(("second", command.value()));
        })));
        assert!(displaced.is_some());

        if let Some(observer) = slot.current() {
            observer.on_command(&command(2));
        }
        assert_eq!(*seen.lock().expect("lock"), vec![("second", 2)]);
    }

    #[test]
    fn clearing_empties_the_slot() {
        let slot: ObserverSlot<dyn LogObserver> = ObserverSlot::default();
        slot.replace(Some(Arc::new(|_: LogLevel, _: &str| {})));
        slot.replace(None);
        assert!(slot.current().is_none());
    }

    #[test]
    fn captured_observer_survives_unregistration() {
        let hits = Arc::new(Mutex::new(0_u32));
        let slot: ObserverSlot<dyn CommandObserver> = ObserverSlot::empty();
        let counter = Arc::clone(&hits);
        slot.replace(Some(Arc::new(move |_: &Command| {
            *counter.lock().expect("lock") += 1;
        })));

        let in_flight = slot.current().expect("observer registered");
        slot.replace(None);
        in_flight.on_command(&command(1));
        assert_eq!(*hits.lock().expect("lock"), 1);
    }
}
