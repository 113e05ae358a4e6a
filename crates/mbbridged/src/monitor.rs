//! The bridge's consumer.
//!
//! [`CommandMonitor`] is registered as both observers. It keeps running
//! statistics, remembers the last command, holds a bounded operator log and
//! forwards page turns to the tap requester: `PREV` taps the left side and
//! `NEXT` the right.

use std::collections::VecDeque;
use std::num::NonZeroU32;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use mbbridge_protocol::{Command, CommandKind, CommandStats, LogLevel, TapOutcome, TapSide};
use time::OffsetDateTime;
use time::macros::format_description;
use tracing::{debug, warn};

use crate::server::{CommandObserver, LogObserver};
use crate::tap::{TapError, TapRequester, WorkerHandle};

/// Number of operator log lines retained.
pub const DEFAULT_LOG_CAPACITY: usize = 80;

/// Source tag of commands injected through [`CommandMonitor::simulate`].
pub const SIMULATE_SOURCE: &str = "simulate";

const MONITOR_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::monitor");

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Bounded, newest-wins operator log.
#[derive(Debug)]
pub struct LogBuffer {
    lines: Mutex<VecDeque<String>>,
    capacity: usize,
}

impl LogBuffer {
    /// Creates a buffer keeping at most `capacity` lines.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            lines: Mutex::new(VecDeque::with_capacity(capacity)),
            capacity,
        }
    }

    /// Appends a line, evicting the oldest when full.
    pub fn push(&self, line: String) {
        if self.capacity == 0 {
            return;
        }
        let mut lines = lock(&self.lines);
        while lines.len() >= self.capacity {
            lines.pop_front();
        }
        lines.push_back(line);
    }

    /// Retained lines, oldest first.
    #[must_use]
    pub fn lines(&self) -> Vec<String> {
        lock(&self.lines).iter().cloned().collect()
    }

    /// Drops every line.
    pub fn clear(&self) {
        lock(&self.lines).clear();
    }
}

/// Observer that aggregates commands and forwards them as taps.
pub struct CommandMonitor {
    stats: Mutex<CommandStats>,
    last_command: Mutex<Option<Command>>,
    log: Arc<LogBuffer>,
    tap: Option<TapRequester>,
    watcher: Mutex<Option<WorkerHandle>>,
}

impl CommandMonitor {
    /// Monitor that records commands without forwarding taps.
    #[must_use]
    pub fn new() -> Self {
        Self {
            stats: Mutex::new(CommandStats::default()),
            last_command: Mutex::new(None),
            log: Arc::new(LogBuffer::new(DEFAULT_LOG_CAPACITY)),
            tap: None,
            watcher: Mutex::new(None),
        }
    }

    /// Monitor that forwards page turns through `requester` and logs every
    /// tap result it observes.
    ///
    /// # Errors
    ///
    /// Returns [`TapError::WorkerSpawn`] if the result watcher cannot start.
    pub fn with_tap(requester: TapRequester) -> Result<Self, TapError> {
        let log = Arc::new(LogBuffer::new(DEFAULT_LOG_CAPACITY));
        let sink = Arc::clone(&log);
        let watcher = requester.watch_results(move |outcome| {
            sink.push(result_line(now(), &outcome));
        })?;
        Ok(Self {
            stats: Mutex::new(CommandStats::default()),
            last_command: Mutex::new(None),
            log,
            tap: Some(requester),
            watcher: Mutex::new(Some(watcher)),
        })
    }

    /// Latest statistics snapshot.
    #[must_use]
    pub fn stats(&self) -> CommandStats {
        *lock(&self.stats)
    }

    /// Most recent command, if any.
    #[must_use]
    pub fn last_command(&self) -> Option<Command> {
        lock(&self.last_command).clone()
    }

    /// Operator log, oldest first.
    #[must_use]
    pub fn log_lines(&self) -> Vec<String> {
        self.log.lines()
    }

    /// Empties the operator log.
    pub fn clear_logs(&self) {
        self.log.clear();
    }

    /// Resets every counter to zero.
    pub fn reset_stats(&self) {
        *lock(&self.stats) = CommandStats::default();
    }

    /// Injects a synthetic command as if it had arrived over HTTP.
    ///
    /// Returns `None` for `UNKNOWN(0)`, which no wire format can carry.
    pub fn simulate(&self, kind: CommandKind) -> Option<Command> {
        let value = NonZeroU32::new(kind.value())?;
        let timestamp = i64::try_from(now().unix_timestamp_nanos() / 1_000_000).unwrap_or(0);
        let command = Command::new(value, timestamp, SIMULATE_SOURCE);
        self.record(&command);
        Some(command)
    }

    /// Stops the tap result watcher.
    pub fn shutdown(&self) {
        let watcher = lock(&self.watcher).take();
        if let Some(watcher) = watcher {
            watcher.shutdown();
            if let Err(error) = watcher.join() {
                warn!(target: MONITOR_TARGET, error = %error, "result watcher failed");
            }
        }
    }

    fn record(&self, command: &Command) {
        let kind = command.kind();
        {
            let mut stats = lock(&self.stats);
            let next = stats.increment(kind);
            *stats = next;
        }
        *lock(&self.last_command) = Some(command.clone());
        self.log.push(command_line(command));

        let side = match kind {
            CommandKind::Prev => TapSide::Left,
            CommandKind::Next => TapSide::Right,
            CommandKind::Unknown(_) => {
                debug!(target: MONITOR_TARGET, %kind, "no tap for command");
                return;
            }
        };
        if let Some(requester) = &self.tap {
            requester.request(side);
            self.log
                .push(log_line(now(), LogLevel::Info, &format!("TAP {side}")));
        }
    }
}

impl Default for CommandMonitor {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for CommandMonitor {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl CommandObserver for CommandMonitor {
    fn on_command(&self, command: &Command) {
        self.record(command);
    }
}

impl LogObserver for CommandMonitor {
    fn on_log(&self, level: LogLevel, message: &str) {
        self.log.push(log_line(now(), level, message));
    }
}

fn now() -> OffsetDateTime {
    OffsetDateTime::now_utc()
}

fn clock(at: OffsetDateTime) -> String {
    at.format(format_description!("[hour]:[minute]:[second]"))
        .unwrap_or_else(|_| "--:--:--".to_owned())
}

fn log_line(at: OffsetDateTime, level: LogLevel, message: &str) -> String {
    format!("[{}] [{level}] {message}", clock(at))
}

fn result_line(at: OffsetDateTime, outcome: &TapOutcome) -> String {
    let level = if outcome.success {
        LogLevel::Info
    } else {
        LogLevel::Warn
    };
    log_line(
        at,
        level,
        &format!(
            "TAP_RESULT {} success={} x={} y={}",
            outcome.side, outcome.success, outcome.point.x, outcome.point.y
        ),
    )
}

fn command_line(command: &Command) -> String {
    let at = OffsetDateTime::from_unix_timestamp_nanos(i128::from(command.timestamp()) * 1_000_000)
        .unwrap_or(OffsetDateTime::UNIX_EPOCH);
    let stamp = at
        .format(format_description!(
            "[year]-[month]-[day] [hour]:[minute]:[second]"
        ))
        .unwrap_or_else(|_| "----------".to_owned());
    format!(
        "[{stamp}] {} v={} source={}",
        command.kind(),
        command.value(),
        command.source()
    )
}

#[cfg(test)]
mod tests {
    use std::time::{Duration, Instant};

    use mbbridge_protocol::{TapMessage, TapPoint};
    use rstest::{fixture, rstest};

    use super::*;
    use crate::tap::TapBus;

    fn command(code: u32, timestamp: i64) -> Command {
        Command::new(NonZeroU32::new(code).expect("nonzero"), timestamp, "bridge")
    }

    #[fixture]
    fn monitor() -> CommandMonitor {
        CommandMonitor::new()
    }

    #[rstest]
    fn counts_each_classification(monitor: CommandMonitor) {
        for code in [1, 2, 2, 9] {
            monitor.on_command(&command(code, 0));
        }
        let stats = monitor.stats();
        assert_eq!(stats.prev_count, 1);
        assert_eq!(stats.next_count, 2);
        assert_eq!(stats.total_count, 4);
        assert_eq!(stats.unknown_count(), 1);
        assert_eq!(monitor.last_command(), Some(command(9, 0)));
    }

    #[rstest]
    fn reset_and_clear_are_explicit(monitor: CommandMonitor) {
        monitor.on_command(&command(1, 0));
        monitor.on_log(LogLevel::Info, "hello");
        monitor.reset_stats();
        monitor.clear_logs();
        assert_eq!(monitor.stats(), CommandStats::default());
        assert!(monitor.log_lines().is_empty());
    }

    #[test]
    fn command_lines_use_the_command_timestamp() {
        assert_eq!(
            command_line(&command(1, 1_730_000_000_000)),
            "[2024-10-27 03:33:20] PREV v=1 source=bridge"
        );
    }

    #[test]
    fn log_lines_carry_level_and_clock() {
        let at = OffsetDateTime::UNIX_EPOCH;
        assert_eq!(
            log_line(at, LogLevel::Warn, "HTTP 401: token verification failed"),
            "[00:00:00] [WARN] HTTP 401: token verification failed"
        );
    }

    #[test]
    fn log_keeps_only_the_newest_lines() {
        let buffer = LogBuffer::new(3);
        for index in 0..5 {
            buffer.push(format!("line {index}"));
        }
        assert_eq!(buffer.lines(), vec!["line 2", "line 3", "line 4"]);
    }

    #[rstest]
    fn operator_log_is_bounded(monitor: CommandMonitor) {
        for index in 0..(DEFAULT_LOG_CAPACITY + 20) {
            monitor.on_log(LogLevel::Debug, &format!("entry {index}"));
        }
        let lines = monitor.log_lines();
        assert_eq!(lines.len(), DEFAULT_LOG_CAPACITY);
        assert!(lines[0].ends_with("entry 20"));
    }

    #[rstest]
    #[case(CommandKind::Prev, 1)]
    #[case(CommandKind::Next, 2)]
    fn simulate_records_a_synthetic_command(
        monitor: CommandMonitor,
        #[case] kind: CommandKind,
        #[case] value: u32,
    ) {
        let simulated = monitor.simulate(kind).expect("simulated command");
        assert_eq!(simulated.value(), value);
        assert_eq!(simulated.source(), SIMULATE_SOURCE);
        assert_eq!(monitor.stats().total_count, 1);
        assert!(monitor.simulate(CommandKind::Unknown(0)).is_none());
    }

    #[rstest]
    #[case(1, Some(TapSide::Left))]
    #[case(2, Some(TapSide::Right))]
    #[case(3, None)]
    fn page_turns_become_tap_requests(#[case] code: u32, #[case] expected: Option<TapSide>) {
        let bus = TapBus::new();
        let subscription = bus.subscribe();
        let monitor = CommandMonitor::with_tap(TapRequester::new(bus)).expect("monitor");
        monitor.on_command(&command(code, 0));
        let requested = std::iter::from_fn(|| subscription.try_recv()).find_map(|message| {
            match message {
                TapMessage::Tap { side } => Some(side),
                TapMessage::TapResult(_) => None,
            }
        });
        assert_eq!(requested, expected);
    }

    #[test]
    fn tap_results_are_logged() {
        let bus = TapBus::new();
        let monitor = CommandMonitor::with_tap(TapRequester::new(bus.clone())).expect("monitor");
        bus.publish(&TapMessage::TapResult(TapOutcome {
            side: TapSide::Left,
            success: true,
            point: TapPoint { x: 180, y: 1000 },
        }));

        let deadline = Instant::now() + Duration::from_secs(2);
        let expected = "TAP_RESULT left success=true x=180 y=1000";
        while Instant::now() < deadline {
            if monitor
                .log_lines()
                .iter()
                .any(|line| line.ends_with(expected))
            {
                return;
            }
            std::thread::sleep(Duration::from_millis(10));
        }
        panic!("tap result never logged: {:?}", monitor.log_lines());
    }
}
