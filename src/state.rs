//! Persisted daemon settings: the tick interval and the first-merge flag.
//!
//! Both live as values in the service namespace of the registry store,
//! next to (but separate from) the namespace holding host entries.

use crate::error::Result;
use crate::sink::{ReportSink, Severity};
use crate::store::{KeyValueStore, Value};
use std::time::Duration;

/// Value name of the tick interval, in minutes.
pub const INTERVAL_VALUE: &str = "Interval";

/// Value name of the first-merge flag (`0` or `1`).
pub const CONFIGURED_VALUE: &str = "Configured";

/// Interval used when none is stored.
pub const DEFAULT_INTERVAL_MINUTES: f64 = 1.0;

/// Snapshot of the persisted settings.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConfiguredState {
    /// Minutes between ticks.
    pub interval_minutes: f64,
    /// `true` once the first merge has succeeded.
    pub configured: bool,
}

impl ConfiguredState {
    /// The interval as a timer period.
    #[must_use]
    pub fn period(&self) -> Duration {
        minutes_to_period(self.interval_minutes)
    }
}

/// Converts minutes to a timer period, falling back to the default for
/// values a timer cannot use.
#[must_use]
pub fn minutes_to_period(minutes: f64) -> Duration {
    Duration::try_from_secs_f64(minutes * 60.0)
        .ok()
        .filter(|d| !d.is_zero())
        .unwrap_or_else(|| Duration::from_secs_f64(DEFAULT_INTERVAL_MINUTES * 60.0))
}

/// Reads and writes [`ConfiguredState`] fields.
#[derive(Debug, Clone)]
pub struct StateStore<S> {
    store: S,
    namespace: String,
}

impl<S: KeyValueStore> StateStore<S> {
    #[must_use]
    pub fn new(store: S, namespace: impl Into<String>) -> Self {
        Self {
            store,
            namespace: namespace.into(),
        }
    }

    /// Returns the service namespace.
    #[must_use]
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Reads the interval in minutes.
    ///
    /// Creates the namespace and stores the default when the value is
    /// absent. A stored value that is not a positive finite number is
    /// reported as a warning and the default is used instead (the stored
    /// value is left as is).
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read or written.
    pub fn interval_minutes(&self, sink: &dyn ReportSink, event_id: u64) -> Result<f64> {
        self.store.create_namespace(&self.namespace)?;

        let Some(value) = self.store.get(&self.namespace, INTERVAL_VALUE)? else {
            self.store.set(
                &self.namespace,
                INTERVAL_VALUE,
                Value::Float(DEFAULT_INTERVAL_MINUTES),
            )?;
            tracing::info!(
                minutes = DEFAULT_INTERVAL_MINUTES,
                "Stored default tick interval"
            );
            return Ok(DEFAULT_INTERVAL_MINUTES);
        };

        match value.as_f64() {
            Some(minutes) if minutes.is_finite() && minutes > 0.0 => Ok(minutes),
            _ => {
                sink.report(
                    Severity::Warning,
                    &format!(
                        "Invalid {INTERVAL_VALUE} value {value:?}, using {DEFAULT_INTERVAL_MINUTES} minute(s)"
                    ),
                    event_id,
                );
                Ok(DEFAULT_INTERVAL_MINUTES)
            }
        }
    }

    /// Returns `true` once the first merge has been recorded.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read.
    pub fn is_configured(&self) -> Result<bool> {
        Ok(self
            .store
            .get(&self.namespace, CONFIGURED_VALUE)?
            .and_then(|v| v.as_f64())
            .is_some_and(|n| n != 0.0))
    }

    /// Records that the first merge succeeded.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be written.
    pub fn mark_configured(&self) -> Result<()> {
        self.store
            .set(&self.namespace, CONFIGURED_VALUE, Value::Dword(1))
    }

    /// Reads both fields.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read or written.
    pub fn load(&self, sink: &dyn ReportSink, event_id: u64) -> Result<ConfiguredState> {
        Ok(ConfiguredState {
            interval_minutes: self.interval_minutes(sink, event_id)?,
            configured: self.is_configured()?,
        })
    }
}
