//! Test suites for the daemon controller.

mod support;
