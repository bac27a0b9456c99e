//! Integration tests for `hostfile-sync`.
//!
//! Tests marked `#[ignore]` require root:
//!
//! ```bash
//! sudo cargo test -- --ignored
//! ```

use hostfile_sync::{
    EntrySet, HostRegistry, HostsFile, JsonFileStore, KeyValueStore, MANAGED_BANNER, MemorySink,
    MemoryStore, Reconciler, Scheduler, SyncConfig, TickOutcome, Value, entry::parse_registry_key,
    state::{CONFIGURED_VALUE, INTERVAL_VALUE},
};
use std::path::Path;
use std::sync::Arc;

fn set(keys: &[&str]) -> EntrySet {
    keys.iter().map(|k| parse_registry_key(k).unwrap()).collect()
}

fn config_in(dir: &Path) -> SyncConfig {
    SyncConfig::new()
        .with_hosts_file(dir.join("hosts"))
        .with_store_path(dir.join("registry.json"))
        .with_namespace("Test")
}

// ---------------------------------------------------------------------------
// Tempdir tests (no root required)
// ---------------------------------------------------------------------------

#[test]
fn full_lifecycle_with_json_store() {
    let dir = tempfile::tempdir().unwrap();
    let config = config_in(dir.path());
    std::fs::write(
        &config.hosts_file,
        "# Local overrides\n127.0.0.1\tlocalhost\n10.0.0.1 a\n",
    )
    .unwrap();

    let store = Arc::new(JsonFileStore::new(&config.store_path));
    let registry = HostRegistry::new(store.clone(), &config.hosts_namespace);
    registry.write(&set(&["10.0.0.1,a", "10.0.0.3,c"])).unwrap();

    let engine = Reconciler::from_config(&config, store.clone(), MemorySink::new());
    let (mut scheduler, first) = Scheduler::start(engine).unwrap();

    // Merge: file order, then registry-only entries.
    assert_eq!(first.outcome.unwrap(), TickOutcome::Merged { entries: 3 });
    let hosts = HostsFile::with_path(&config.hosts_file);
    assert_eq!(
        hosts.read_entries().unwrap(),
        set(&["127.0.0.1,localhost", "10.0.0.1,a", "10.0.0.3,c"])
    );
    assert_eq!(
        store.get(&config.service_namespace, CONFIGURED_VALUE).unwrap(),
        Some(Value::Dword(1))
    );
    assert_eq!(
        store.get(&config.service_namespace, INTERVAL_VALUE).unwrap(),
        Some(Value::Float(1.0))
    );

    // Steady state, nothing to do.
    let before = std::fs::read_to_string(&config.hosts_file).unwrap();
    assert_eq!(scheduler.tick().outcome.unwrap(), TickOutcome::InSync);
    assert_eq!(std::fs::read_to_string(&config.hosts_file).unwrap(), before);

    // A new registry entry reaches the file.
    registry.write(&set(&["10.0.0.4,d,d.lan"])).unwrap();
    assert_eq!(
        scheduler.tick().outcome.unwrap(),
        TickOutcome::Rewrote { entries: 4 }
    );
    let content = std::fs::read_to_string(&config.hosts_file).unwrap();
    assert!(content.starts_with("# Local overrides\n"));
    assert!(content.contains("10.0.0.4\td\td.lan\n"));
    assert_eq!(content.matches(MANAGED_BANNER[1]).count(), 1);

    assert!(scheduler.engine().sink().reports().is_empty());
}

#[test]
fn divergence_is_resolved_from_registry() {
    let dir = tempfile::tempdir().unwrap();
    let config = config_in(dir.path());
    std::fs::write(&config.hosts_file, "10.0.0.1 a\n").unwrap();

    let store = Arc::new(MemoryStore::new());
    store
        .set(&config.service_namespace, CONFIGURED_VALUE, Value::Dword(1))
        .unwrap();
    HostRegistry::new(store.clone(), &config.hosts_namespace)
        .write(&set(&["10.0.0.2,b", "10.0.0.1,a"]))
        .unwrap();

    let engine = Reconciler::from_config(&config, store, MemorySink::new());
    assert_eq!(engine.tick(1).unwrap(), TickOutcome::Rewrote { entries: 2 });

    let file = HostsFile::with_path(&config.hosts_file).read_entries().unwrap();
    assert!(file.same_members(&set(&["10.0.0.1,a", "10.0.0.2,b"])));
    assert_eq!(file.len(), 2);
}

#[test]
fn update_idempotent_when_order_differs() {
    let dir = tempfile::tempdir().unwrap();
    let config = config_in(dir.path());
    std::fs::write(&config.hosts_file, "10.0.0.2 b\n10.0.0.1 a\n").unwrap();

    let store = Arc::new(MemoryStore::new());
    store
        .set(&config.service_namespace, CONFIGURED_VALUE, Value::Dword(1))
        .unwrap();
    HostRegistry::new(store.clone(), &config.hosts_namespace)
        .write(&set(&["10.0.0.1,a", "10.0.0.2,b"]))
        .unwrap();

    let engine = Reconciler::from_config(&config, store, MemorySink::new());
    assert_eq!(engine.tick(1).unwrap(), TickOutcome::InSync);
    assert_eq!(
        std::fs::read_to_string(&config.hosts_file).unwrap(),
        "10.0.0.2 b\n10.0.0.1 a\n"
    );
}

#[test]
fn failed_merge_is_retried_on_next_tick() {
    let dir = tempfile::tempdir().unwrap();
    let config = config_in(dir.path()).with_hosts_file(dir.path().join("etc/hosts"));
    let store = Arc::new(MemoryStore::new());
    let engine = Reconciler::from_config(&config, store, MemorySink::new());
    let (mut scheduler, first) = Scheduler::start(engine).unwrap();

    assert!(first.outcome.is_err());
    assert!(!scheduler.engine().state().is_configured().unwrap());
    assert!(scheduler.engine().sink().has_message("Merge Failed"));

    std::fs::create_dir(dir.path().join("etc")).unwrap();
    let report = scheduler.tick();
    assert_eq!(report.outcome.unwrap(), TickOutcome::Merged { entries: 0 });
    assert!(scheduler.engine().state().is_configured().unwrap());
}

#[test]
fn merge_twice_adds_nothing_new() {
    let dir = tempfile::tempdir().unwrap();
    let config = config_in(dir.path());
    std::fs::write(&config.hosts_file, "10.0.0.1 a\n10.0.0.2 b\n").unwrap();

    let store = Arc::new(MemoryStore::new());
    let registry = HostRegistry::new(store.clone(), &config.hosts_namespace);
    registry.write(&set(&["10.0.0.2,b", "10.0.0.3,c"])).unwrap();

    let engine = Reconciler::from_config(&config, store.clone(), MemorySink::new());
    let first = engine.tick(1).unwrap();

    // Force a second merge over the merged state.
    store
        .set(&config.service_namespace, CONFIGURED_VALUE, Value::Dword(0))
        .unwrap();
    let second = engine.tick(2).unwrap();

    assert_eq!(first, second);
    assert_eq!(
        HostsFile::with_path(&config.hosts_file).read_entries().unwrap(),
        set(&["10.0.0.1,a", "10.0.0.2,b", "10.0.0.3,c"])
    );
}

#[test]
fn corrupt_store_fails_tick_without_touching_hosts() {
    let dir = tempfile::tempdir().unwrap();
    let config = config_in(dir.path());
    std::fs::write(&config.hosts_file, "10.0.0.1 a\n").unwrap();
    std::fs::write(&config.store_path, "{ not json").unwrap();

    let engine = Reconciler::from_config(
        &config,
        Arc::new(JsonFileStore::new(&config.store_path)),
        MemorySink::new(),
    );
    assert!(engine.tick(1).is_err());
    assert!(engine.sink().has_message("Unable to Update"));
    assert_eq!(
        std::fs::read_to_string(&config.hosts_file).unwrap(),
        "10.0.0.1 a\n"
    );
}

// ---------------------------------------------------------------------------
// Root-only tests
// ---------------------------------------------------------------------------

#[test]
#[ignore = "requires root to rewrite /etc/hosts"]
fn real_hosts_file_round_trip() {
    let hosts = HostsFile::new();
    let original = std::fs::read_to_string(hosts.path()).unwrap();
    let entries = hosts.read_entries().unwrap();

    hosts.write(&entries).unwrap();
    assert!(hosts.read_entries().unwrap().same_members(&entries));

    std::fs::write(hosts.path(), original).unwrap();
}
