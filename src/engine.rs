//! Reconciliation engine.
//!
//! Each tick runs one of two modes, picked by the persisted `Configured`
//! flag:
//!
//! - **Merge** (flag unset): union of hosts-file and registry entries,
//!   written back to both. Sets the flag on success, so it runs until it
//!   succeeds once.
//! - **Update** (flag set): registry is authoritative. The hosts file is
//!   rewritten with the registry entries only when the two differ as sets.

use crate::config::SyncConfig;
use crate::entry::EntrySet;
use crate::error::{Result, SyncError};
use crate::hosts_file::HostsFile;
use crate::registry::HostRegistry;
use crate::sink::{ReportSink, Severity};
use crate::state::StateStore;
use crate::store::KeyValueStore;
use std::sync::atomic::{AtomicBool, Ordering};

/// What a successful tick did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// First merge completed; both stores now hold `entries` entries.
    Merged { entries: usize },
    /// The hosts file differed and was rewritten with `entries` entries.
    Rewrote { entries: usize },
    /// The hosts file already matched the registry.
    InSync,
}

/// Drives Merge and Update against a hosts file and a registry store.
///
/// Ticks never overlap: a tick started while another is running fails with
/// [`SyncError::TickInFlight`] without touching either store.
pub struct Reconciler<S, R> {
    hosts: HostsFile,
    registry: HostRegistry<S>,
    state: StateStore<S>,
    sink: R,
    in_flight: AtomicBool,
}

impl<S: KeyValueStore, R: ReportSink> Reconciler<S, R> {
    #[must_use]
    pub const fn new(
        hosts: HostsFile,
        registry: HostRegistry<S>,
        state: StateStore<S>,
        sink: R,
    ) -> Self {
        Self {
            hosts,
            registry,
            state,
            sink,
            in_flight: AtomicBool::new(false),
        }
    }

    /// Builds a reconciler whose registry and settings share `store`.
    #[must_use]
    pub fn from_config(config: &SyncConfig, store: S, sink: R) -> Self
    where
        S: Clone,
    {
        Self::new(
            HostsFile::with_path(&config.hosts_file),
            HostRegistry::new(store.clone(), &config.hosts_namespace),
            StateStore::new(store, &config.service_namespace),
            sink,
        )
    }

    /// The persisted settings used by this reconciler.
    #[must_use]
    pub const fn state(&self) -> &StateStore<S> {
        &self.state
    }

    /// The sink failures are reported to.
    #[must_use]
    pub const fn sink(&self) -> &R {
        &self.sink
    }

    /// Runs one reconciliation.
    ///
    /// Every failure is reported to the sink under `event_id` before being
    /// returned; nothing is retried until the next tick.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::MergeFailed`] if the merged entries could not be
    /// written, [`SyncError::TickInFlight`] if another tick is running, or
    /// the underlying store error otherwise.
    pub fn tick(&self, event_id: u64) -> Result<TickOutcome> {
        let Some(_guard) = InFlight::acquire(&self.in_flight) else {
            let err = SyncError::TickInFlight;
            self.sink
                .report(Severity::Error, &format!("Unable to Update: {err}"), event_id);
            return Err(err);
        };

        let result = self.state.is_configured().and_then(|configured| {
            if configured {
                self.update(event_id)
            } else {
                self.merge(event_id)
            }
        });

        match &result {
            Ok(outcome) => tracing::debug!(event_id, ?outcome, "Tick complete"),
            Err(SyncError::MergeFailed(cause)) => {
                self.sink
                    .report(Severity::Error, &format!("Merge Failed: {cause}"), event_id);
            }
            Err(e) => {
                self.sink
                    .report(Severity::Error, &format!("Unable to Update: {e}"), event_id);
            }
        }
        result
    }

    /// First-run merge. Unreadable sources count as empty.
    fn merge(&self, event_id: u64) -> Result<TickOutcome> {
        let file_entries = self.or_empty("hosts file", self.hosts.read_entries(), event_id);
        let registry_entries = self.or_empty("registry", self.registry.read_entries(), event_id);

        let master = file_entries.union(&registry_entries);

        self.registry
            .write(&master)
            .and_then(|()| self.hosts.write(&master))
            .map_err(|e| SyncError::MergeFailed(Box::new(e)))?;

        self.state.mark_configured()?;
        tracing::info!(
            event_id,
            entries = master.len(),
            "Merged hosts file and registry"
        );
        Ok(TickOutcome::Merged {
            entries: master.len(),
        })
    }

    /// Steady-state update, registry to hosts file.
    ///
    /// An unreadable registry fails the tick rather than counting as empty,
    /// which would blank the hosts file. An unreadable hosts file counts as
    /// empty and gets rewritten.
    fn update(&self, event_id: u64) -> Result<TickOutcome> {
        let registry_entries = self.registry.read_entries()?;
        let file_entries = self.or_empty("hosts file", self.hosts.read_entries(), event_id);

        if registry_entries.same_members(&file_entries) {
            return Ok(TickOutcome::InSync);
        }

        tracing::info!(
            event_id,
            registry = registry_entries.len(),
            file = file_entries.len(),
            "Hosts file diverged from registry"
        );
        self.hosts.write(&registry_entries)?;
        Ok(TickOutcome::Rewrote {
            entries: registry_entries.len(),
        })
    }

    fn or_empty(&self, source: &str, read: Result<EntrySet>, event_id: u64) -> EntrySet {
        read.unwrap_or_else(|e| {
            self.sink.report(
                Severity::Error,
                &format!("The {source} could not be read: {e}"),
                event_id,
            );
            EntrySet::new()
        })
    }
}

/// Holds the in-flight flag for the duration of a tick.
struct InFlight<'a>(&'a AtomicBool);

impl<'a> InFlight<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::Acquire, Ordering::Relaxed)
            .ok()
            .map(|_| Self(flag))
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}
