//! # hostfile-sync
//!
//! Keep a hosts file in sync with an authoritative key-value registry.
//!
//! The registry holds one value per host entry, named
//! `<address>,<name1>[,<name2>...]`. A daemon ticks on a configurable
//! interval and reconciles the hosts file against it:
//!
//! - On the very first successful tick it **merges**: entries from the
//!   hosts file and the registry are unioned and written back to both.
//! - From then on it **updates**: the registry wins, and the hosts file is
//!   rewritten whenever its entries differ from the registry's as a set.
//!
//! Comment lines in the hosts file survive every rewrite, and a managed-file
//! banner is appended once so readers know where entries come from.
//!
//! ## Quick start
//!
//! ```rust,ignore
//! use hostfile_sync::{JsonFileStore, Reconciler, Scheduler, SyncConfig, TracingSink};
//! use std::sync::Arc;
//!
//! let config = SyncConfig::new();
//! let store = Arc::new(JsonFileStore::new(&config.store_path));
//! let engine = Reconciler::from_config(&config, store, TracingSink);
//!
//! let (mut scheduler, _first) = Scheduler::start(engine)?;
//! // Inside a tokio runtime; returns on SIGTERM or SIGINT.
//! scheduler.run(hostfile_sync::util::shutdown_signal()?).await;
//! ```
//!
//! ## Adding a host
//!
//! Add a value named `10.0.0.5,build,build.lan` with empty data to the
//! `HostFileSync/hosts` namespace of the store. The next tick writes
//! `10.0.0.5	build	build.lan` to the hosts file.
//!
//! ## Permissions
//!
//! Writing `/etc/hosts` requires root. A read-only hosts file is made
//! writable for the rewrite and restored afterwards.

#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions)]

pub mod config;
pub mod engine;
pub mod entry;
pub mod error;
pub mod hosts_file;
pub mod registry;
pub mod scheduler;
pub mod sink;
pub mod state;
pub mod store;
pub mod util;

pub use config::SyncConfig;
pub use engine::{Reconciler, TickOutcome};
pub use entry::{EntrySet, HostEntry};
pub use error::{Result, SyncError};
pub use hosts_file::{HostsFile, MANAGED_BANNER};
pub use registry::HostRegistry;
pub use scheduler::{Scheduler, TickReport};
pub use sink::{MemorySink, ReportSink, Severity, TracingSink};
pub use state::{ConfiguredState, StateStore};
pub use store::{JsonFileStore, KeyValueStore, MemoryStore, Value};
