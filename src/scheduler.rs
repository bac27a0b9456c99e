//! Scheduler adapter: runs a tick now, then once per stored interval.
//!
//! The interval is re-read after every tick, so changing the stored value
//! takes effect without a restart. Ticks run inline in the [`Scheduler::run`]
//! loop, one after another; the next period only starts once the previous
//! tick is done.

use crate::engine::{Reconciler, TickOutcome};
use crate::error::Result;
use crate::sink::{ReportSink, Severity};
use crate::store::KeyValueStore;
use std::time::Duration;
use tokio::time::{Instant, Interval, MissedTickBehavior};

/// Result of one scheduled tick.
#[derive(Debug)]
pub struct TickReport {
    /// Correlation id reported with any failure of this tick.
    pub event_id: u64,
    /// Engine result.
    pub outcome: Result<TickOutcome>,
    /// Period until the next tick.
    pub period: Duration,
    /// `true` if the period changed because of this tick.
    pub rescheduled: bool,
}

/// Owns the reconciler and the timer state.
pub struct Scheduler<S, R> {
    engine: Reconciler<S, R>,
    event_id: u64,
    period: Duration,
}

impl<S: KeyValueStore, R: ReportSink> Scheduler<S, R> {
    /// Reads the interval (storing the default if absent) without ticking.
    ///
    /// # Errors
    ///
    /// Returns an error if the interval cannot be read or stored.
    pub fn new(engine: Reconciler<S, R>) -> Result<Self> {
        let event_id = 1;
        let state = engine.state().load(engine.sink(), event_id)?;
        tracing::debug!(
            interval_minutes = state.interval_minutes,
            configured = state.configured,
            "Loaded scheduler state"
        );
        Ok(Self {
            engine,
            event_id,
            period: state.period(),
        })
    }

    /// Creates the scheduler and runs the startup tick.
    ///
    /// # Errors
    ///
    /// Returns an error if the interval cannot be read or stored. A failed
    /// tick is reported, not returned.
    pub fn start(engine: Reconciler<S, R>) -> Result<(Self, TickReport)> {
        let mut scheduler = Self::new(engine)?;
        let outcome = scheduler.engine.tick(scheduler.event_id);
        let report = TickReport {
            event_id: scheduler.event_id,
            outcome,
            period: scheduler.period,
            rescheduled: false,
        };
        Ok((scheduler, report))
    }

    /// Current period between ticks.
    #[must_use]
    pub const fn period(&self) -> Duration {
        self.period
    }

    /// Last event id handed to the engine.
    #[must_use]
    pub const fn event_id(&self) -> u64 {
        self.event_id
    }

    /// The reconciler being driven.
    #[must_use]
    pub const fn engine(&self) -> &Reconciler<S, R> {
        &self.engine
    }

    /// One timer firing: bump the event id, reconcile, re-read the interval.
    ///
    /// If the interval cannot be read the current period is kept; the
    /// failure is reported to the sink.
    pub fn tick(&mut self) -> TickReport {
        self.event_id += 1;
        let event_id = self.event_id;
        let outcome = self.engine.tick(event_id);

        let mut rescheduled = false;
        match self.engine.state().load(self.engine.sink(), event_id) {
            Ok(state) => {
                let period = state.period();
                if period != self.period {
                    tracing::info!(
                        event_id,
                        old_secs = self.period.as_secs_f64(),
                        new_secs = period.as_secs_f64(),
                        "Tick interval changed, rescheduling"
                    );
                    self.period = period;
                    rescheduled = true;
                }
            }
            Err(e) => self.engine.sink().report(
                Severity::Error,
                &format!("Unable to read interval: {e}"),
                event_id,
            ),
        }

        TickReport {
            event_id,
            outcome,
            period: self.period,
            rescheduled,
        }
    }

    /// Ticks once per period until `shutdown` resolves.
    ///
    /// The first tick fires one period from now, since [`start`](Self::start)
    /// already ran the immediate one. A shutdown that arrives mid-tick is
    /// honoured once that tick returns.
    pub async fn run<F: Future<Output = ()>>(&mut self, shutdown: F) {
        tokio::pin!(shutdown);
        let mut ticker = interval_from_now(self.period);
        tracing::info!(period_secs = self.period.as_secs_f64(), "Scheduler running");

        loop {
            tokio::select! {
                biased;
                () = &mut shutdown => break,
                _ = ticker.tick() => {
                    if self.tick().rescheduled {
                        ticker = interval_from_now(self.period);
                    }
                }
            }
        }

        tracing::info!(event_id = self.event_id, "Scheduler stopped");
    }
}

/// Interval whose first tick is one `period` away. A tick that runs long
/// pushes the following ones back instead of bunching them up.
fn interval_from_now(period: Duration) -> Interval {
    let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    ticker
}
