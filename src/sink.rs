//! Failure reporting.
//!
//! The engine only reports failures; a tick that reports nothing succeeded.

use std::sync::Mutex;

/// Report severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// The tick (or part of it) failed.
    Error,
    /// A fallback was applied and the tick carried on.
    Warning,
}

/// Receives `(severity, message, event id)` reports.
///
/// The event id is the scheduler's tick counter and exists only to
/// correlate reports from the same tick.
pub trait ReportSink: Send + Sync {
    /// Records one report.
    fn report(&self, severity: Severity, message: &str, event_id: u64);
}

/// Forwards reports to `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl ReportSink for TracingSink {
    fn report(&self, severity: Severity, message: &str, event_id: u64) {
        match severity {
            Severity::Error => tracing::error!(event_id, "{message}"),
            Severity::Warning => tracing::warn!(event_id, "{message}"),
        }
    }
}

/// A report captured by [`MemorySink`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Report {
    pub severity: Severity,
    pub message: String,
    pub event_id: u64,
}

/// Keeps every report in memory.
#[derive(Debug, Default)]
pub struct MemorySink {
    reports: Mutex<Vec<Report>>,
}

impl MemorySink {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a copy of all reports so far.
    #[must_use]
    pub fn reports(&self) -> Vec<Report> {
        self.reports
            .lock()
            .map(|r| r.clone())
            .unwrap_or_default()
    }

    /// Returns `true` if any report message starts with `prefix`.
    #[must_use]
    pub fn has_message(&self, prefix: &str) -> bool {
        self.reports().iter().any(|r| r.message.starts_with(prefix))
    }
}

impl ReportSink for MemorySink {
    fn report(&self, severity: Severity, message: &str, event_id: u64) {
        if let Ok(mut reports) = self.reports.lock() {
            reports.push(Report {
                severity,
                message: message.to_string(),
                event_id,
            });
        }
    }
}

impl<T: ReportSink + ?Sized> ReportSink for std::sync::Arc<T> {
    fn report(&self, severity: Severity, message: &str, event_id: u64) {
        (**self).report(severity, message, event_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_sink_records_in_order() {
        let sink = MemorySink::new();
        sink.report(Severity::Error, "first", 1);
        sink.report(Severity::Warning, "second", 2);

        let reports = sink.reports();
        assert_eq!(reports.len(), 2);
        assert_eq!(reports[0].message, "first");
        assert_eq!(reports[1].severity, Severity::Warning);
        assert_eq!(reports[1].event_id, 2);
        assert!(sink.has_message("sec"));
        assert!(!sink.has_message("third"));
    }
}
