//! Test suites for the command bridge.

mod support;
