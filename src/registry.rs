//! Host entries held in the key-value registry.
//!
//! Each entry is one value whose name is the entry's canonical form and
//! whose data is an empty string. Only the presence of the name matters.

use crate::entry::{EntrySet, parse_registry_key, to_registry_key};
use crate::error::Result;
use crate::store::{KeyValueStore, Value};

/// Registry Store: reads and writes entries under one namespace.
#[derive(Debug, Clone)]
pub struct HostRegistry<S> {
    store: S,
    namespace: String,
}

impl<S: KeyValueStore> HostRegistry<S> {
    #[must_use]
    pub fn new(store: S, namespace: impl Into<String>) -> Self {
        Self {
            store,
            namespace: namespace.into(),
        }
    }

    /// Returns the namespace holding the entries.
    #[must_use]
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Reads all entries in store enumeration order.
    ///
    /// A missing namespace yields an empty set. Names that do not decode
    /// to a valid entry are skipped.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read.
    pub fn read_entries(&self) -> Result<EntrySet> {
        let Some(names) = self.store.names(&self.namespace)? else {
            return Ok(EntrySet::new());
        };

        Ok(names
            .iter()
            .filter_map(|name| {
                let entry = parse_registry_key(name);
                if entry.is_none() {
                    tracing::debug!(key = %name, "Skipping registry value that is not a host entry");
                }
                entry
            })
            .collect())
    }

    /// Upserts one value per entry.
    ///
    /// Names absent from `entries` are left untouched; this never removes
    /// anything from the registry.
    ///
    /// # Errors
    ///
    /// Returns the store error. Whether earlier entries stay written depends
    /// on the store.
    pub fn write(&self, entries: &EntrySet) -> Result<()> {
        let values = entries
            .iter()
            .map(|entry| (to_registry_key(entry), Value::Text(String::new())))
            .collect();
        self.store.set_many(&self.namespace, values)?;
        tracing::debug!(
            namespace = %self.namespace,
            count = entries.len(),
            "Wrote host entries to registry"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    fn set(keys: &[&str]) -> EntrySet {
        keys.iter().map(|k| parse_registry_key(k).unwrap()).collect()
    }

    #[test]
    fn missing_namespace_reads_empty() {
        let registry = HostRegistry::new(MemoryStore::new(), "svc/hosts");
        assert!(registry.read_entries().unwrap().is_empty());
    }

    #[test]
    fn write_then_read() {
        let registry = HostRegistry::new(MemoryStore::new(), "svc/hosts");
        let entries = set(&["10.0.0.1,a", "10.0.0.2,b,b.lan"]);

        registry.write(&entries).unwrap();
        assert!(registry.read_entries().unwrap().same_members(&entries));
    }

    #[test]
    fn write_is_additive() {
        let registry = HostRegistry::new(MemoryStore::new(), "svc/hosts");
        registry.write(&set(&["10.0.0.1,a"])).unwrap();
        registry.write(&set(&["10.0.0.2,b"])).unwrap();

        let read = registry.read_entries().unwrap();
        assert!(read.same_members(&set(&["10.0.0.1,a", "10.0.0.2,b"])));
    }

    #[test]
    fn writes_empty_values_and_skips_foreign_names() {
        let store = std::sync::Arc::new(MemoryStore::new());
        let registry = HostRegistry::new(store.clone(), "svc/hosts");
        registry.write(&set(&["10.0.0.1,a"])).unwrap();
        store.set("svc/hosts", "garbage", Value::Dword(7)).unwrap();

        assert_eq!(
            store.get("svc/hosts", "10.0.0.1,a").unwrap(),
            Some(Value::Text(String::new()))
        );
        assert_eq!(registry.read_entries().unwrap(), set(&["10.0.0.1,a"]));
    }
}
