use anyformat_protocol::{HistoryRecord, NewHistoryRecord};
use thiserror::Error;
use tracing::{debug, error, warn};

use crate::clock::{Clock, SystemClock};
use crate::preview::truncate_with_ellipsis;
use crate::storage::{KeyValueStorage, StorageError};

/// Key holding the whole serialized collection.
pub const STORAGE_KEY: &str = "anyformat_file_history";
pub const MAX_HISTORY_ITEMS: usize = 50;
pub const MAX_HISTORY_BYTES: usize = 50 * 1024 * 1024;
pub const PREVIEW_MAX_CHARS: usize = 2000;
/// Records kept when a write fails and the tracker falls back to a smaller list.
pub const RECOVERY_ITEMS: usize = 10;

#[derive(Debug, Error)]
pub enum HistoryError {
    #[error("History storage failed: {0}")]
    Storage(#[from] StorageError),
    #[error("History serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Bounds applied to the persisted collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HistoryLimits {
    /// Maximum number of records kept.
    pub max_items: usize,
    /// Ceiling on the serialized collection, in bytes.
    pub max_bytes: usize,
    /// Longest preview stored, in characters (before the ellipsis).
    pub preview_chars: usize,
    /// Records kept by the recovery write after a failed `add`.
    pub recovery_items: usize,
}

impl Default for HistoryLimits {
    fn default() -> Self {
        Self {
            max_items: MAX_HISTORY_ITEMS,
            max_bytes: MAX_HISTORY_BYTES,
            preview_chars: PREVIEW_MAX_CHARS,
            recovery_items: RECOVERY_ITEMS,
        }
    }
}

/// Recently opened documents, persisted as one value in a [`KeyValueStorage`].
///
/// Every mutation reads the whole collection, edits it and writes it back.
/// A tracker built with [`FileHistory::detached`] has no storage at all:
/// reads are empty and writes do nothing.
pub struct FileHistory<S, C = SystemClock> {
    storage: Option<S>,
    clock: C,
    limits: HistoryLimits,
}

impl<S: KeyValueStorage> FileHistory<S> {
    pub fn new(storage: S) -> Self {
        Self::with_clock(Some(storage), SystemClock)
    }

    pub fn detached() -> Self {
        Self::with_clock(None, SystemClock)
    }
}

impl<S: KeyValueStorage, C: Clock> FileHistory<S, C> {
    pub fn with_clock(storage: Option<S>, clock: C) -> Self {
        Self {
            storage,
            clock,
            limits: HistoryLimits::default(),
        }
    }

    pub fn with_limits(mut self, limits: HistoryLimits) -> Self {
        self.limits = limits;
        self
    }

    pub fn limits(&self) -> HistoryLimits {
        self.limits
    }

    /// Whether a storage handle is present.
    pub fn is_attached(&self) -> bool {
        self.storage.is_some()
    }

    /// All records, most recently accessed first.
    ///
    /// Missing, unreadable or malformed data reads as an empty history.
    pub fn list(&self) -> Vec<HistoryRecord> {
        match self.try_list() {
            Ok(mut records) => {
                records.sort_by(|a, b| b.last_accessed.cmp(&a.last_accessed));
                records
            }
            Err(e) => {
                error!(error = %e, "Failed to load file history");
                Vec::new()
            }
        }
    }

    fn try_list(&self) -> Result<Vec<HistoryRecord>, HistoryError> {
        let Some(storage) = self.storage.as_ref() else {
            return Ok(Vec::new());
        };
        match storage.get(STORAGE_KEY)? {
            Some(stored) if !stored.is_empty() => Ok(serde_json::from_str(&stored)?),
            _ => Ok(Vec::new()),
        }
    }

    /// Insert `candidate` at the front, replacing any record with the same id.
    pub fn add(&mut self, candidate: NewHistoryRecord) {
        if self.storage.is_none() {
            return;
        }

        let id = candidate.id.clone();
        if let Err(e) = self.try_add(candidate) {
            error!(id = %id, error = %e, "Failed to save to file history");
            if let Err(e) = self.recover() {
                error!(error = %e, "Failed to shrink file history");
            }
        }
    }

    fn try_add(&mut self, mut candidate: NewHistoryRecord) -> Result<(), HistoryError> {
        let limits = self.limits;
        let mut records = self.list();
        records.retain(|r| r.id != candidate.id);

        candidate.preview = candidate
            .preview
            .map(|p| truncate_with_ellipsis(&p, limits.preview_chars));

        records.insert(0, candidate.into_record(self.clock.now()));
        records.truncate(limits.max_items);

        let mut data = serde_json::to_string(&records)?;
        if data.len() > limits.max_bytes {
            warn!(
                bytes = data.len(),
                limit = limits.max_bytes,
                "File history too large, removing oldest items"
            );
            records.truncate(limits.max_items / 2);
            data = serde_json::to_string(&records)?;
        }

        self.write(&data)?;
        debug!(count = records.len(), "File history updated");
        Ok(())
    }

    /// Fall back to the newest few records of what is already stored.
    fn recover(&mut self) -> Result<(), HistoryError> {
        let mut records = self.list();
        records.truncate(self.limits.recovery_items);
        let data = serde_json::to_string(&records)?;
        self.write(&data)?;
        warn!(count = records.len(), "File history shrunk after failed write");
        Ok(())
    }

    /// Mark the record `id` as accessed now. Unknown ids are ignored.
    pub fn update_last_accessed(&mut self, id: &str) {
        if let Err(e) = self.try_update_last_accessed(id) {
            error!(id = %id, error = %e, "Failed to update last accessed");
        }
    }

    fn try_update_last_accessed(&mut self, id: &str) -> Result<(), HistoryError> {
        let mut records = self.list();
        let Some(record) = records.iter_mut().find(|r| r.id == id) else {
            return Ok(());
        };
        record.last_accessed = self.clock.now();
        self.persist(&records)
    }

    pub fn remove(&mut self, id: &str) {
        if let Err(e) = self.try_remove(id) {
            error!(id = %id, error = %e, "Failed to remove from file history");
        }
    }

    fn try_remove(&mut self, id: &str) -> Result<(), HistoryError> {
        if self.storage.is_none() {
            return Ok(());
        }
        let mut records = self.list();
        records.retain(|r| r.id != id);
        self.persist(&records)
    }

    /// Drop the whole collection.
    pub fn clear(&mut self) {
        let Some(storage) = self.storage.as_mut() else {
            return;
        };
        if let Err(e) = storage.remove(STORAGE_KEY) {
            error!(error = %e, "Failed to clear file history");
        }
    }

    fn persist(&mut self, records: &[HistoryRecord]) -> Result<(), HistoryError> {
        let data = serde_json::to_string(records)?;
        self.write(&data)
    }

    fn write(&mut self, data: &str) -> Result<(), HistoryError> {
        if let Some(storage) = self.storage.as_mut() {
            storage.set(STORAGE_KEY, data)?;
        }
        Ok(())
    }
}
