//! Daemon configuration.
//!
//! Only locations live here. The tick interval and the first-merge flag
//! are persisted in the registry store itself (see [`crate::state`]).

use std::path::PathBuf;

/// Default hosts file.
pub const DEFAULT_HOSTS_FILE: &str = "/etc/hosts";

/// Default registry store document.
pub const DEFAULT_STORE_PATH: &str = "/var/lib/hostfile-sync/registry.json";

/// Default service namespace.
pub const DEFAULT_NAMESPACE: &str = "HostFileSync";

/// Where the daemon reads and writes.
///
/// # Example
///
/// ```
/// use hostfile_sync::SyncConfig;
///
/// let config = SyncConfig::new()
///     .with_hosts_file("/tmp/hosts")
///     .with_namespace("Lab");
///
/// assert_eq!(config.hosts_file.to_str(), Some("/tmp/hosts"));
/// assert_eq!(config.service_namespace, "Lab");
/// assert_eq!(config.hosts_namespace, "Lab/hosts");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncConfig {
    /// Hosts file kept in sync.
    pub hosts_file: PathBuf,

    /// JSON document backing the registry store.
    pub store_path: PathBuf,

    /// Namespace holding `Interval` and `Configured`.
    pub service_namespace: String,

    /// Namespace holding one value per host entry.
    pub hosts_namespace: String,
}

impl SyncConfig {
    /// Creates a config with the system defaults.
    #[must_use]
    pub fn new() -> Self {
        Self {
            hosts_file: PathBuf::from(DEFAULT_HOSTS_FILE),
            store_path: PathBuf::from(DEFAULT_STORE_PATH),
            service_namespace: DEFAULT_NAMESPACE.to_string(),
            hosts_namespace: hosts_namespace_of(DEFAULT_NAMESPACE),
        }
    }

    /// Overrides the hosts file.
    #[must_use]
    pub fn with_hosts_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.hosts_file = path.into();
        self
    }

    /// Overrides the store document.
    #[must_use]
    pub fn with_store_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.store_path = path.into();
        self
    }

    /// Overrides the service namespace. The hosts namespace follows it.
    #[must_use]
    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.service_namespace = namespace.into();
        self.hosts_namespace = hosts_namespace_of(&self.service_namespace);
        self
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self::new()
    }
}

fn hosts_namespace_of(service: &str) -> String {
    format!("{service}/hosts")
}
