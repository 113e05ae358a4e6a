//! In-process broadcast bus for tap messages.

use std::sync::{Arc, Mutex, PoisonError};
use std::thread;
use std::time::Duration;

use crossbeam::channel::{self, Receiver, Sender};
use mbbridge_protocol::TapMessage;

use super::TapError;

/// Broadcast channel scoped to one bridge instance.
///
/// Every subscriber receives every message published after it subscribed.
/// Only holders of a clone of the bus can publish or subscribe, so messages
/// never leave the owning process.
#[derive(Debug, Clone, Default)]
pub struct TapBus {
    subscribers: Arc<Mutex<Vec<Sender<TapMessage>>>>,
}

impl TapBus {
    /// Creates a bus with no subscribers.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a new subscriber.
    #[must_use]
    pub fn subscribe(&self) -> TapSubscription {
        let (sender, receiver) = channel::unbounded();
        self.lock().push(sender);
        TapSubscription { receiver }
    }

    /// Delivers `message` to every live subscriber and returns how many
    /// received it. Dropped subscriptions are pruned.
    pub fn publish(&self, message: &TapMessage) -> usize {
        let mut subscribers = self.lock();
        subscribers.retain(|sender| sender.send(message.clone()).is_ok());
        subscribers.len()
    }

    /// Runs `on_message` for every message on a dedicated thread until the
    /// returned handle is shut down.
    ///
    /// The subscription is taken before the thread starts, so nothing
    /// published after this call returns is missed.
    pub fn spawn_worker<F>(&self, name: &str, mut on_message: F) -> Result<WorkerHandle, TapError>
    where
        F: FnMut(TapMessage) + Send + 'static,
    {
        let messages = self.subscribe().receiver;
        let (stop_tx, stop_rx) = channel::bounded::<()>(1);
        let handle = thread::Builder::new()
            .name(name.to_owned())
            .spawn(move || {
                loop {
                    channel::select! {
                        recv(messages) -> message => match message {
                            Ok(message) => on_message(message),
                            Err(_) => break,
                        },
                        recv(stop_rx) -> _ => break,
                    }
                }
            })
            .map_err(|source| TapError::WorkerSpawn {
                name: name.to_owned(),
                source,
            })?;
        Ok(WorkerHandle {
            name: name.to_owned(),
            stop: stop_tx,
            handle: Some(handle),
        })
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<Sender<TapMessage>>> {
        self.subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

/// Receiving end of a bus subscription.
#[derive(Debug)]
pub struct TapSubscription {
    receiver: Receiver<TapMessage>,
}

impl TapSubscription {
    /// Waits up to `timeout` for the next message.
    #[must_use]
    pub fn recv_timeout(&self, timeout: Duration) -> Option<TapMessage> {
        self.receiver.recv_timeout(timeout).ok()
    }

    /// Returns the next message if one is already queued.
    #[must_use]
    pub fn try_recv(&self) -> Option<TapMessage> {
        self.receiver.try_recv().ok()
    }
}

/// Handle to a bus worker thread.
#[derive(Debug)]
pub struct WorkerHandle {
    name: String,
    stop: Sender<()>,
    handle: Option<thread::JoinHandle<()>>,
}

impl WorkerHandle {
    /// Asks the worker to exit after its current message.
    pub fn shutdown(&self) {
        // A full slot means a stop is already pending.
        let _ = self.stop.try_send(());
    }

    /// Waits for the worker thread to exit.
    ///
    /// # Errors
    ///
    /// Returns [`TapError::WorkerPanicked`] if the thread panicked.
    pub fn join(mut self) -> Result<(), TapError> {
        self.shutdown();
        match self.handle.take() {
            Some(handle) => handle.join().map_err(|_| TapError::WorkerPanicked {
                name: self.name.clone(),
            }),
            None => Ok(()),
        }
    }
}

impl Drop for WorkerHandle {
    fn drop(&mut self) {
        self.shutdown();
    }
}
