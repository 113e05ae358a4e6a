//! Recording observers and polling helpers.

use std::sync::Mutex;
use std::time::{Duration, Instant};

use mbbridge_protocol::{Command, LogLevel};

use crate::server::{CommandObserver, LogObserver};

/// Captures every command it is notified of.
#[derive(Debug, Default)]
pub struct RecordingCommandObserver {
    commands: Mutex<Vec<Command>>,
}

impl RecordingCommandObserver {
    pub fn commands(&self) -> Vec<Command> {
        self.commands
            .lock()
            .expect("command observer mutex poisoned")
            .clone()
    }
}

impl CommandObserver for RecordingCommandObserver {
    fn on_command(&self, command: &Command) {
        self.commands
            .lock()
            .expect("command observer mutex poisoned")
            .push(command.clone());
    }
}

/// Captures every log line it is notified of.
#[derive(Debug, Default)]
pub struct RecordingLogObserver {
    lines: Mutex<Vec<(LogLevel, String)>>,
}

impl RecordingLogObserver {
    pub fn lines(&self) -> Vec<(LogLevel, String)> {
        self.lines
            .lock()
            .expect("log observer mutex poisoned")
            .clone()
    }
}

impl LogObserver for RecordingLogObserver {
    fn on_log(&self, level: LogLevel, message: &str) {
        self.lines
            .lock()
            .expect("log observer mutex poisoned")
            .push((level, message.to_owned()));
    }
}

/// Polls `condition` for up to two seconds.
pub fn wait_until(mut condition: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + Duration::from_secs(2);
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        std::thread::sleep(Duration::from_millis(10));
    }
    condition()
}
