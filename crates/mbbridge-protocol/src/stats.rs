//! Running command totals.

use serde::Serialize;

use crate::command::CommandKind;

/// Immutable snapshot of command counters.
///
/// `total_count` always equals `prev_count + next_count` plus the number of
/// unknown commands seen. Counters only grow; a reset is a fresh
/// [`CommandStats::default`] published by the owner.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CommandStats {
    /// Number of `PREV` commands.
    pub prev_count: u64,
    /// Number of `NEXT` commands.
    pub next_count: u64,
    /// Number of commands of any kind.
    pub total_count: u64,
}

impl CommandStats {
    /// Returns the snapshot that follows this one after a command of `kind`.
    #[must_use]
    pub const fn increment(self, kind: CommandKind) -> Self {
        match kind {
            CommandKind::Prev => Self {
                prev_count: self.prev_count.saturating_add(1),
                total_count: self.total_count.saturating_add(1),
                ..self
            },
            CommandKind::Next => Self {
                next_count: self.next_count.saturating_add(1),
                total_count: self.total_count.saturating_add(1),
                ..self
            },
            CommandKind::Unknown(_) => Self {
                total_count: self.total_count.saturating_add(1),
                ..self
            },
        }
    }

    /// Number of commands that were neither `PREV` nor `NEXT`.
    #[must_use]
    pub const fn unknown_count(&self) -> u64 {
        self.total_count
            .saturating_sub(self.prev_count)
            .saturating_sub(self.next_count)
    }
}
