use std::{fs::Metadata, time::SystemTime};

use log::{debug, trace};

/// A snapshot of a files size and the markers telling whether it is still the same file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileIdentity {
    pub len: u64,
    pub modified: Option<SystemTime>,
    /// Device and inode number, where the platform provides them
    pub file_id: Option<(u64, u64)>,
}

impl FileIdentity {
    /// An identity carrying nothing but the size, eg. for in-memory data.
    #[inline]
    pub fn from_len(len: u64) -> Self {
        Self {
            len,
            modified: None,
            file_id: None,
        }
    }

    pub fn from_metadata(meta: &Metadata) -> Self {
        Self {
            len: meta.len(),
            modified: meta.modified().ok(),
            file_id: file_id(meta),
        }
    }
}

#[cfg(unix)]
fn file_id(meta: &Metadata) -> Option<(u64, u64)> {
    use std::os::unix::fs::MetadataExt;
    Some((meta.dev(), meta.ino()))
}

#[cfg(not(unix))]
fn file_id(_meta: &Metadata) -> Option<(u64, u64)> {
    None
}

/// The outcome of comparing a file against its last snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Change {
    Unchanged,
    /// Data was appended. Everything indexed so far stays valid.
    Grown { from: u64, to: u64 },
    /// The file was truncated or replaced, the index has to be rebuilt.
    Invalidated,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    /// Nothing observed yet
    Fresh,
    Valid,
    /// Waiting for the index to be reset
    Invalidated,
}

/// Detects whether a file changed in a way that makes an existing index stale.
#[derive(Debug, Clone)]
pub struct Monitor {
    last: Option<FileIdentity>,
    state: State,
}

impl Default for Monitor {
    #[inline]
    fn default() -> Self {
        Self::new()
    }
}

impl Monitor {
    #[inline]
    pub fn new() -> Self {
        Self {
            last: None,
            state: State::Fresh,
        }
    }

    #[inline]
    pub fn state(&self) -> State {
        self.state
    }

    /// The snapshot taken on the last check.
    #[inline]
    pub fn last(&self) -> Option<&FileIdentity> {
        self.last.as_ref()
    }

    /// Compares `current` against the last snapshot. `scanned` is the amount of bytes the index
    /// already covers.
    pub fn check(&mut self, current: FileIdentity, scanned: u64) -> Change {
        let change = match self.last {
            // Nothing indexed yet can't be stale
            None if scanned == 0 => Change::Unchanged,
            None => Change::Invalidated,
            Some(last) => classify(&last, &current, scanned),
        };

        match change {
            Change::Invalidated => {
                debug!(
                    "file changed: {:?} -> {:?}, {} bytes indexed",
                    self.last, current, scanned
                );
                self.state = State::Invalidated;
            }
            Change::Grown { from, to } => {
                trace!("file grew from {} to {} bytes", from, to);
                self.state = State::Valid;
            }
            Change::Unchanged => {
                // An invalidation has to be acknowledged first
                if self.state != State::Invalidated {
                    self.state = State::Valid;
                }
            }
        }

        self.last = Some(current);
        change
    }

    /// Marks the index as rebuilt after an invalidation.
    #[inline]
    pub fn mark_reset(&mut self) {
        self.state = State::Valid;
    }
}

fn classify(last: &FileIdentity, current: &FileIdentity, scanned: u64) -> Change {
    if current.len < scanned || current.file_id != last.file_id {
        return Change::Invalidated;
    }

    // Same size but touched: rewritten in place
    if current.len == last.len && current.modified != last.modified {
        return Change::Invalidated;
    }

    if current.len > last.len {
        return Change::Grown {
            from: last.len,
            to: current.len,
        };
    }

    Change::Unchanged
}
