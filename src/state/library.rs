use std::ops::Range;
use std::sync::Arc;
use tokio::sync::watch;

use super::data::{ImageRecord, RecordPatch};
use crate::error::StoreError;

/// Immutable view of the library at one point in time
pub type Records = Vec<Arc<ImageRecord>>;

/// The Library is the in-memory, append-only collection of image records.
///
/// Indices are dense (0..len) and stable. Every mutation publishes a fresh
/// snapshot to subscribers; records are copy-on-write, so a snapshot a
/// reader holds never changes underneath it.
pub struct Library {
    records: watch::Sender<Records>,
}

impl Library {
    /// Create an empty library
    pub fn new() -> Self {
        let (records, _) = watch::channel(Vec::new());
        Library { records }
    }

    /// Number of records
    pub fn len(&self) -> usize {
        self.records.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Append placeholder records, one per name, keeping their order.
    /// Returns the indices they were assigned.
    pub fn append<I, S>(&self, names: I) -> Range<usize>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut assigned = 0..0;
        self.records.send_modify(|records| {
            let start = records.len();
            records.extend(
                names
                    .into_iter()
                    .enumerate()
                    .map(|(offset, name)| Arc::new(ImageRecord::placeholder(start + offset, name))),
            );
            assigned = start..records.len();
        });
        assigned
    }

    /// Apply a partial update to the record at `index` only
    pub fn merge_at(&self, index: usize, patch: RecordPatch) -> Result<bool, StoreError> {
        if index >= self.len() {
            return Err(StoreError::NotFound(index));
        }

        let mut applied = false;
        self.records.send_if_modified(|records| {
            applied = Arc::make_mut(&mut records[index]).merge(patch);
            applied
        });
        Ok(applied)
    }

    /// Get one record
    pub fn get(&self, index: usize) -> Option<Arc<ImageRecord>> {
        self.records.borrow().get(index).cloned()
    }

    /// Get all records in index order
    pub fn snapshot(&self) -> Records {
        self.records.borrow().clone()
    }

    /// Observe every append and merge
    pub fn subscribe(&self) -> watch::Receiver<Records> {
        self.records.subscribe()
    }
}

impl Default for Library {
    fn default() -> Self {
        Self::new()
    }
}

// Implement Debug for better error messages
impl std::fmt::Debug for Library {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Library")
            .field("records", &self.len())
            .finish()
    }
}
