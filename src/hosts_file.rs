//! Hosts-file management.
//!
//! Comment lines are preserved verbatim across rewrites. The first rewrite
//! appends [`MANAGED_BANNER`] so anyone opening the file knows where its
//! entries come from.

use crate::config::DEFAULT_HOSTS_FILE;
use crate::entry::{EntrySet, parse_file_line, to_file_line};
use crate::error::{Result, SyncError};
use std::fs::{File, Permissions};
use std::borrow::Cow;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

/// Lines starting with this byte are comments.
const COMMENT_MARKER: u8 = b'#';

/// Block appended to the comments of a managed hosts file.
pub const MANAGED_BANNER: [&str; 7] = [
    "# *+*+*+*+*+*+*+*+*+*+*+*+*+*+*+*+*+*+*+*+*+*+*",
    "# THIS HOST FILE IS MANAGED BY hostfile-sync!",
    "# Entries come from the hosts namespace of the hostfile-sync registry store.",
    "# To add a host, add a value named <IP>,<hostname>[,<hostname>...]. No data is needed.",
    "# Host file will be updated within set interval, at service restart, or reboot.",
    "# See the hostfile-sync README for more information.",
    "# *+*+*+*+*+*+*+*+*+*+*+*+*+*+*+*+*+*+*+*+*+*+*",
];

/// Banner line whose exact presence marks the file as already managed.
const BANNER_MARKER: &str = MANAGED_BANNER[1];

/// Mapping-File Store for a hosts-style file.
///
/// # Encoding
///
/// Lines are handled as bytes. Entry lines are decoded lossily (invalid
/// UTF-8 becomes U+FFFD), comment lines are written back byte for byte.
///
/// # Write semantics
///
/// [`write`](Self::write) truncates the file and rewrites it in place. A
/// failure midway can leave the file truncated; the next successful tick
/// rewrites it in full.
///
/// # Permissions
///
/// `/etc/hosts` requires root. A file without write permission is made
/// writable for the duration of the write and its permissions restored
/// afterwards.
#[derive(Debug, Clone)]
pub struct HostsFile {
    path: PathBuf,
}

impl HostsFile {
    /// Targets the system `/etc/hosts`.
    #[must_use]
    pub fn new() -> Self {
        Self {
            path: PathBuf::from(DEFAULT_HOSTS_FILE),
        }
    }

    /// Targets a custom file (useful for testing).
    #[must_use]
    pub fn with_path(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Returns the file path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads all entry lines in file order.
    ///
    /// Comment lines and blank lines are skipped, as are lines with fewer
    /// than two tokens.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::Io`](crate::SyncError::Io) if the file cannot be
    /// opened or read.
    pub fn read_entries(&self) -> Result<EntrySet> {
        let mut entries = EntrySet::new();
        for raw in self.read_lines()? {
            if is_comment(&raw) {
                continue;
            }
            let line = String::from_utf8_lossy(&raw);
            if line.trim().is_empty() {
                continue;
            }
            match parse_file_line(&line) {
                Some(entry) => entries.push(entry),
                None => tracing::debug!(line = %line, "Skipping hosts line without a host name"),
            }
        }
        Ok(entries)
    }

    /// Reads the comment lines in file order, decoded lossily.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::Io`](crate::SyncError::Io) if the file cannot be
    /// opened or read.
    pub fn read_comments(&self) -> Result<Vec<String>> {
        Ok(self
            .raw_comments()?
            .iter()
            .map(|line| String::from_utf8_lossy(line).into_owned())
            .collect())
    }

    /// Replaces the file with its comments, the banner (if missing), and
    /// one line per entry in the given order.
    ///
    /// A missing file is created with just the banner and the entries.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::Io`](crate::SyncError::Io) if an existing file
    /// cannot be read, its permissions cannot be changed, or it cannot be
    /// written. The file is left untouched when it cannot be read.
    pub fn write(&self, entries: &EntrySet) -> Result<()> {
        self.write_with(entries, write_lines)
    }

    fn write_with<F>(&self, entries: &EntrySet, write: F) -> Result<()>
    where
        F: FnOnce(&Path, &[Cow<'_, [u8]>]) -> Result<()>,
    {
        let comments = match self.raw_comments() {
            Ok(comments) => comments,
            Err(SyncError::Io(e)) if e.kind() == std::io::ErrorKind::NotFound => Vec::new(),
            Err(e) => return Err(e),
        };
        let content = compose(&comments, entries);

        let saved = match std::fs::metadata(&self.path) {
            Ok(meta) if meta.permissions().readonly() => Some(meta.permissions()),
            Ok(_) => None,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => None,
            Err(e) => return Err(e.into()),
        };

        if let Some(original) = &saved {
            std::fs::set_permissions(&self.path, writable(original))?;
            tracing::debug!(path = %self.path.display(), "Cleared read-only permission");
        }

        let written = write(&self.path, &content);

        if let Some(original) = saved {
            if let Err(restore) = std::fs::set_permissions(&self.path, original) {
                if let Err(e) = &written {
                    tracing::error!(
                        path = %self.path.display(),
                        error = %e,
                        "Hosts file write failed before permissions could be restored"
                    );
                }
                return Err(restore.into());
            }
        }
        written?;

        tracing::info!(
            path = %self.path.display(),
            entries = entries.len(),
            "Rewrote hosts file"
        );
        Ok(())
    }

    fn raw_comments(&self) -> Result<Vec<Vec<u8>>> {
        Ok(self
            .read_lines()?
            .into_iter()
            .filter(|line| is_comment(line))
            .collect())
    }

    /// Raw lines without their `\n` or `\r\n` terminator.
    fn read_lines(&self) -> Result<Vec<Vec<u8>>> {
        let reader = BufReader::new(File::open(&self.path)?);
        reader
            .split(b'\n')
            .map(|line| -> Result<Vec<u8>> {
                let mut line = line?;
                if line.last() == Some(&b'\r') {
                    line.pop();
                }
                Ok(line)
            })
            .collect()
    }
}

impl Default for HostsFile {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Content helpers
// ---------------------------------------------------------------------------

fn is_comment(line: &[u8]) -> bool {
    line.first() == Some(&COMMENT_MARKER)
}

/// Builds the full file content.
///
/// ```text
/// # user comment
/// # *+*+*+ ... (banner, only if line 2 of it is missing)
/// 10.0.0.1	web	web.lan
/// ```
fn compose<'a>(comments: &'a [Vec<u8>], entries: &EntrySet) -> Vec<Cow<'a, [u8]>> {
    let mut lines: Vec<Cow<'a, [u8]>> = comments
        .iter()
        .map(|l| Cow::Borrowed(l.as_slice()))
        .collect();
    if !comments.iter().any(|l| l == BANNER_MARKER.as_bytes()) {
        lines.extend(MANAGED_BANNER.iter().map(|l| Cow::Borrowed(l.as_bytes())));
    }
    lines.extend(entries.iter().map(|e| Cow::Owned(to_file_line(e).into_bytes())));
    lines
}

fn write_lines(path: &Path, lines: &[Cow<'_, [u8]>]) -> Result<()> {
    let mut writer = BufWriter::new(File::create(path)?);
    for line in lines {
        writer.write_all(line)?;
        writer.write_all(b"\n")?;
    }
    writer.flush()?;
    Ok(())
}

#[cfg(unix)]
fn writable(original: &Permissions) -> Permissions {
    use std::os::unix::fs::PermissionsExt;
    Permissions::from_mode(original.mode() | 0o200)
}

#[cfg(not(unix))]
#[allow(clippy::permissions_set_readonly_false)]
fn writable(original: &Permissions) -> Permissions {
    let mut perms = original.clone();
    perms.set_readonly(false);
    perms
}
