//! Host entries and their two external encodings.
//!
//! An entry is identified by its canonical form `address,name1,name2,...`,
//! which doubles as the registry key. Hosts-file lines use the same tokens
//! joined by a tab. No normalization is applied: `127.0.0.1` and
//! `127.000.000.001` are different entries, and so are `a b` and `b a`
//! name orderings.

use crate::error::{Result, SyncError};
use std::fmt;

/// Separator between tokens of a registry key.
const KEY_SEPARATOR: char = ',';

/// Separator between tokens of a hosts-file line written by this crate.
const LINE_SEPARATOR: char = '\t';

/// An address paired with one or more host names.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct HostEntry {
    address: String,
    names: Vec<String>,
}

impl HostEntry {
    /// Creates a validated entry.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::InvalidEntry`] if there are no names, or if any
    /// token is empty or contains a comma or whitespace. Such tokens could
    /// not survive a trip through both encodings.
    pub fn new<I, S>(address: impl Into<String>, names: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let address = address.into();
        let names: Vec<String> = names.into_iter().map(Into::into).collect();

        if names.is_empty() {
            return Err(SyncError::InvalidEntry(format!("{address}: no host names")));
        }
        if let Some(bad) = std::iter::once(&address)
            .chain(&names)
            .find(|t| !is_valid_token(t))
        {
            return Err(SyncError::InvalidEntry(format!("bad token {bad:?}")));
        }

        Ok(Self { address, names })
    }

    /// The address token, unmodified.
    #[must_use]
    pub fn address(&self) -> &str {
        &self.address
    }

    /// The host names, in their original order.
    #[must_use]
    pub fn names(&self) -> &[String] {
        &self.names
    }

    fn tokens(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.address.as_str()).chain(self.names.iter().map(String::as_str))
    }
}

/// Displays the canonical form, `address,name1,name2,...`.
impl fmt::Display for HostEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&to_registry_key(self))
    }
}

fn is_valid_token(token: &str) -> bool {
    !token.is_empty() && !token.contains(KEY_SEPARATOR) && !token.contains(char::is_whitespace)
}

fn from_tokens<'a>(mut tokens: impl Iterator<Item = &'a str>) -> Option<HostEntry> {
    let address = tokens.next()?;
    HostEntry::new(address, tokens).ok()
}

// ---------------------------------------------------------------------------
// Codec
// ---------------------------------------------------------------------------

/// Parses one hosts-file line.
///
/// Tokens are separated by any run of whitespace. Returns `None` when fewer
/// than two tokens remain.
#[must_use]
pub fn parse_file_line(line: &str) -> Option<HostEntry> {
    from_tokens(line.split_whitespace())
}

/// Parses a registry key of the form `address,name1,name2,...`.
///
/// Keys are written by this crate, so no trimming is done. Keys with empty
/// tokens are rejected.
#[must_use]
pub fn parse_registry_key(key: &str) -> Option<HostEntry> {
    from_tokens(key.split(KEY_SEPARATOR))
}

/// Encodes an entry as a hosts-file line (tab separated).
#[must_use]
pub fn to_file_line(entry: &HostEntry) -> String {
    join(entry, LINE_SEPARATOR)
}

/// Encodes an entry as its registry key, which is also its canonical form.
#[must_use]
pub fn to_registry_key(entry: &HostEntry) -> String {
    join(entry, KEY_SEPARATOR)
}

fn join(entry: &HostEntry, sep: char) -> String {
    let mut out = String::new();
    for (i, token) in entry.tokens().enumerate() {
        if i > 0 {
            out.push(sep);
        }
        out.push_str(token);
    }
    out
}

// ---------------------------------------------------------------------------
// Entry sets
// ---------------------------------------------------------------------------

/// Ordered sequence of entries read from a single source.
///
/// Duplicates are allowed; membership is by canonical form.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EntrySet {
    entries: Vec<HostEntry>,
}

impl EntrySet {
    /// Creates an empty set.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Number of entries, duplicates included.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if there are no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Appends an entry, even if an equal one is already present.
    pub fn push(&mut self, entry: HostEntry) {
        self.entries.push(entry);
    }

    /// Returns `true` if an entry with the same canonical form is present.
    #[must_use]
    pub fn contains(&self, entry: &HostEntry) -> bool {
        self.entries.contains(entry)
    }

    /// Iterates entries in order.
    pub fn iter(&self) -> std::slice::Iter<'_, HostEntry> {
        self.entries.iter()
    }

    /// Merge union: `self` in order, followed by each entry of `other` not
    /// already present in the running result.
    ///
    /// Duplicates inside `self` are kept; only appended entries are checked.
    #[must_use]
    pub fn union(mut self, other: &Self) -> Self {
        for entry in other {
            if !self.contains(entry) {
                self.entries.push(entry.clone());
            }
        }
        self
    }

    /// Update comparison: same length and every entry of `self` present in
    /// `other`. Order is ignored.
    #[must_use]
    pub fn same_members(&self, other: &Self) -> bool {
        self.len() == other.len() && self.iter().all(|e| other.contains(e))
    }
}

impl FromIterator<HostEntry> for EntrySet {
    fn from_iter<T: IntoIterator<Item = HostEntry>>(iter: T) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}

impl<'a> IntoIterator for &'a EntrySet {
    type Item = &'a HostEntry;
    type IntoIter = std::slice::Iter<'a, HostEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

impl IntoIterator for EntrySet {
    type Item = HostEntry;
    type IntoIter = std::vec::IntoIter<HostEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}
