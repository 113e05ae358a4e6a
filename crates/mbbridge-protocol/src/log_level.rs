//! Severity attached to operator log lines.

use strum::{Display, EnumString};

/// Level of a bridge log line delivered to the log observer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, EnumString, Display)]
#[strum(serialize_all = "UPPERCASE", ascii_case_insensitive)]
pub enum LogLevel {
    /// Very detailed tracing output.
    Verbose,
    /// Diagnostic detail.
    Debug,
    /// Normal operation.
    Info,
    /// A request or gesture was rejected.
    Warn,
    /// A failure the operator should look at.
    Error,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_uppercase_names() {
        assert_eq!(LogLevel::Warn.to_string(), "WARN");
        assert_eq!(LogLevel::Verbose.to_string(), "VERBOSE");
    }

    #[test]
    fn levels_are_ordered_by_severity() {
        assert!(LogLevel::Verbose < LogLevel::Debug);
        assert!(LogLevel::Warn < LogLevel::Error);
    }
}
