//! anyformat History — Tracks recently opened documents.
//!
//! The tracker keeps a deduplicated, size-bounded list of [`HistoryRecord`]s
//! serialized under a single key of an injected [`KeyValueStorage`]. Every
//! public operation is infallible from the caller's point of view: failures
//! are logged and degrade to "history does less".
//!
//! [`HistoryRecord`]: anyformat_protocol::HistoryRecord

mod clock;
mod history;
mod preview;
mod storage;

pub use clock::{Clock, SystemClock};
pub use history::{
    FileHistory, HistoryError, HistoryLimits, MAX_HISTORY_BYTES, MAX_HISTORY_ITEMS,
    PREVIEW_MAX_CHARS, RECOVERY_ITEMS, STORAGE_KEY,
};
pub use preview::{estimate_size, generate_preview, truncate_with_ellipsis, ELLIPSIS};
pub use storage::{FileStorage, KeyValueStorage, MemoryStorage, StorageError};
