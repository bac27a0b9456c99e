//! Key-value registry port.
//!
//! A store holds named namespaces, each mapping value names to [`Value`]s.
//! Host entries and the daemon's own settings live in two namespaces of the
//! same store.

use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// A stored value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Dword(u32),
    Float(f64),
    Text(String),
}

impl Value {
    /// Numeric view of the value, if it has one.
    #[must_use]
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Dword(n) => Some(f64::from(*n)),
            Self::Float(f) => Some(*f),
            Self::Text(s) => s.trim().parse().ok(),
        }
    }
}

/// Persistent key-value storage.
///
/// Implementations use interior mutability so one store can be shared by
/// the host registry and the settings accessor.
pub trait KeyValueStore: Send + Sync {
    /// Reads a value. Missing namespaces and names yield `None`.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing storage cannot be read.
    fn get(&self, namespace: &str, name: &str) -> Result<Option<Value>>;

    /// Inserts or replaces a value, creating the namespace if needed.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing storage cannot be written.
    fn set(&self, namespace: &str, name: &str, value: Value) -> Result<()>;

    /// Inserts or replaces several values in one namespace, creating it if
    /// needed (even when `values` is empty).
    ///
    /// The default calls [`set`](Self::set) per value; persistent stores
    /// override it to write once.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing storage cannot be written.
    fn set_many(&self, namespace: &str, values: Vec<(String, Value)>) -> Result<()> {
        self.create_namespace(namespace)?;
        for (name, value) in values {
            self.set(namespace, &name, value)?;
        }
        Ok(())
    }

    /// Lists value names in enumeration order, or `None` if the namespace
    /// does not exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing storage cannot be read.
    fn names(&self, namespace: &str) -> Result<Option<Vec<String>>>;

    /// Creates an empty namespace if it does not exist yet.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing storage cannot be written.
    fn create_namespace(&self, namespace: &str) -> Result<()>;
}

impl<T: KeyValueStore + ?Sized> KeyValueStore for std::sync::Arc<T> {
    fn get(&self, namespace: &str, name: &str) -> Result<Option<Value>> {
        (**self).get(namespace, name)
    }

    fn set(&self, namespace: &str, name: &str, value: Value) -> Result<()> {
        (**self).set(namespace, name, value)
    }

    fn set_many(&self, namespace: &str, values: Vec<(String, Value)>) -> Result<()> {
        (**self).set_many(namespace, values)
    }

    fn names(&self, namespace: &str) -> Result<Option<Vec<String>>> {
        (**self).names(namespace)
    }

    fn create_namespace(&self, namespace: &str) -> Result<()> {
        (**self).create_namespace(namespace)
    }
}

type Document = BTreeMap<String, BTreeMap<String, Value>>;

fn lock<T>(m: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    m.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
}

// ---------------------------------------------------------------------------
// In-memory store
// ---------------------------------------------------------------------------

/// In-process store. Contents are lost when dropped.
#[derive(Debug, Default)]
pub struct MemoryStore {
    doc: Mutex<Document>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, namespace: &str, name: &str) -> Result<Option<Value>> {
        Ok(lock(&self.doc)
            .get(namespace)
            .and_then(|ns| ns.get(name))
            .cloned())
    }

    fn set(&self, namespace: &str, name: &str, value: Value) -> Result<()> {
        lock(&self.doc)
            .entry(namespace.to_string())
            .or_default()
            .insert(name.to_string(), value);
        Ok(())
    }

    fn names(&self, namespace: &str) -> Result<Option<Vec<String>>> {
        Ok(lock(&self.doc)
            .get(namespace)
            .map(|ns| ns.keys().cloned().collect()))
    }

    fn create_namespace(&self, namespace: &str) -> Result<()> {
        lock(&self.doc).entry(namespace.to_string()).or_default();
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// JSON file store
// ---------------------------------------------------------------------------

/// Store persisted as a single JSON document.
///
/// ```json
/// { "HostFileSync": { "Configured": 1, "Interval": 1.0 },
///   "HostFileSync/hosts": { "10.0.0.1,web": "" } }
/// ```
///
/// Every mutation rewrites the document through a temporary file in the
/// same directory followed by a rename, so readers never see a partial
/// document. A missing file reads as an empty store.
#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
    guard: Mutex<()>,
}

impl JsonFileStore {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            guard: Mutex::new(()),
        }
    }

    /// Returns the document path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load(&self) -> Result<Document> {
        match std::fs::read(&self.path) {
            Ok(bytes) if bytes.iter().all(u8::is_ascii_whitespace) => Ok(Document::new()),
            Ok(bytes) => Ok(serde_json::from_slice(&bytes)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Document::new()),
            Err(e) => Err(e.into()),
        }
    }

    fn save(&self, doc: &Document) -> Result<()> {
        let dir = match self.path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p,
            _ => Path::new("."),
        };
        std::fs::create_dir_all(dir)?;

        let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
        serde_json::to_writer_pretty(&mut tmp, doc)?;
        tmp.write_all(b"\n")?;
        tmp.as_file().sync_all()?;
        tmp.persist(&self.path).map_err(|e| e.error)?;
        Ok(())
    }

    fn modify(&self, f: impl FnOnce(&mut Document) -> bool) -> Result<()> {
        let _guard = lock(&self.guard);
        let mut doc = self.load()?;
        if f(&mut doc) {
            self.save(&doc)?;
        }
        Ok(())
    }
}

impl KeyValueStore for JsonFileStore {
    fn get(&self, namespace: &str, name: &str) -> Result<Option<Value>> {
        let _guard = lock(&self.guard);
        Ok(self
            .load()?
            .get(namespace)
            .and_then(|ns| ns.get(name))
            .cloned())
    }

    fn set(&self, namespace: &str, name: &str, value: Value) -> Result<()> {
        self.modify(|doc| {
            let ns = doc.entry(namespace.to_string()).or_default();
            if ns.get(name) == Some(&value) {
                return false;
            }
            ns.insert(name.to_string(), value);
            true
        })
    }

    fn set_many(&self, namespace: &str, values: Vec<(String, Value)>) -> Result<()> {
        self.modify(|doc| {
            let mut changed = !doc.contains_key(namespace);
            let ns = doc.entry(namespace.to_string()).or_default();
            for (name, value) in values {
                if ns.get(&name) != Some(&value) {
                    ns.insert(name, value);
                    changed = true;
                }
            }
            changed
        })
    }

    fn names(&self, namespace: &str) -> Result<Option<Vec<String>>> {
        let _guard = lock(&self.guard);
        Ok(self
            .load()?
            .get(namespace)
            .map(|ns| ns.keys().cloned().collect()))
    }

    fn create_namespace(&self, namespace: &str) -> Result<()> {
        self.modify(|doc| {
            if doc.contains_key(namespace) {
                return false;
            }
            doc.insert(namespace.to_string(), BTreeMap::new());
            true
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn exercise(store: &dyn KeyValueStore) {
        assert_eq!(store.names("svc").unwrap(), None);
        assert_eq!(store.get("svc", "Interval").unwrap(), None);

        store.create_namespace("svc").unwrap();
        assert_eq!(store.names("svc").unwrap(), Some(vec![]));

        store.set("svc", "Interval", Value::Float(2.5)).unwrap();
        store.set("svc/hosts", "10.0.0.1,web", Value::Text(String::new())).unwrap();
        store.set("svc/hosts", "10.0.0.1,web", Value::Text(String::new())).unwrap();

        assert_eq!(store.get("svc", "Interval").unwrap(), Some(Value::Float(2.5)));
        assert_eq!(
            store.names("svc/hosts").unwrap(),
            Some(vec!["10.0.0.1,web".to_string()])
        );
    }

    #[test]
    fn memory_store_contract() {
        exercise(&MemoryStore::new());
    }

    #[test]
    fn json_store_contract() {
        let dir = tempfile::tempdir().unwrap();
        exercise(&JsonFileStore::new(dir.path().join("nested/registry.json")));
    }

    #[test]
    fn set_many_creates_namespace_and_merges() {
        let dir = tempfile::tempdir().unwrap();
        let stores: [Box<dyn KeyValueStore>; 2] = [
            Box::new(MemoryStore::new()),
            Box::new(JsonFileStore::new(dir.path().join("registry.json"))),
        ];
        for store in &stores {
            store.set_many("hosts", Vec::new()).unwrap();
            assert_eq!(store.names("hosts").unwrap(), Some(vec![]));

            store.set("hosts", "a", Value::Dword(1)).unwrap();
            store
                .set_many(
                    "hosts",
                    vec![("b".into(), Value::Dword(2)), ("a".into(), Value::Dword(3))],
                )
                .unwrap();
            assert_eq!(
                store.names("hosts").unwrap(),
                Some(vec!["a".to_string(), "b".to_string()])
            );
            assert_eq!(store.get("hosts", "a").unwrap(), Some(Value::Dword(3)));
        }
    }

    #[test]
    fn json_set_many_is_a_single_rewrite() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("registry.json");
        let store = JsonFileStore::new(&path);
        store.set_many("hosts", vec![("a".into(), Value::Dword(1))]).unwrap();
        let before = std::fs::metadata(&path).unwrap().modified().unwrap();

        // Unchanged values leave the document alone.
        store.set_many("hosts", vec![("a".into(), Value::Dword(1))]).unwrap();
        assert_eq!(std::fs::metadata(&path).unwrap().modified().unwrap(), before);
    }

    #[test]
    fn json_store_persists_across_instances() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("registry.json");

        JsonFileStore::new(&path)
            .set("svc", "Configured", Value::Dword(1))
            .unwrap();

        let reopened = JsonFileStore::new(&path);
        assert_eq!(reopened.get("svc", "Configured").unwrap(), Some(Value::Dword(1)));
    }

    #[test]
    fn json_store_rejects_garbage() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("registry.json");
        std::fs::write(&path, "not json").unwrap();

        assert!(JsonFileStore::new(&path).names("svc").is_err());
    }

    #[test]
    fn json_store_reads_empty_file_as_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("registry.json");
        std::fs::write(&path, "\n").unwrap();

        assert_eq!(JsonFileStore::new(&path).names("svc").unwrap(), None);
    }

    #[test]
    fn value_numeric_view() {
        assert_eq!(Value::Dword(3).as_f64(), Some(3.0));
        assert_eq!(Value::Float(0.5).as_f64(), Some(0.5));
        assert_eq!(Value::Text(" 4 ".into()).as_f64(), Some(4.0));
        assert_eq!(Value::Text("x".into()).as_f64(), None);
    }

    #[test]
    fn untagged_values_decode_by_shape() {
        let v: Value = serde_json::from_str("1").unwrap();
        assert_eq!(v, Value::Dword(1));
        let v: Value = serde_json::from_str("1.5").unwrap();
        assert_eq!(v, Value::Float(1.5));
        let v: Value = serde_json::from_str("\"\"").unwrap();
        assert_eq!(v, Value::Text(String::new()));
    }
}
