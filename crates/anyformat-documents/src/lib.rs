//! anyformat Documents — Creates and stores JSON documents behind a key-value store.

mod detect;
mod documents;
mod fetch;
mod store;

pub use detect::{is_json, is_likely_html, is_url};
pub use documents::{create_id, CreateJsonOptions, DocumentLimits, DocumentService};
pub use fetch::{FetchError, Fetcher, HttpFetcher};
pub use store::{DocumentStore, MemoryDocumentStore, PutOptions, StoreError};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum DocumentError {
    #[error("Content too large. Maximum size is {limit_mb}MB. Your content is {actual_mb:.1}MB")]
    TooLarge { limit_mb: u64, actual_mb: f64 },

    #[error("Input must be a valid URL, JSON, or XML content")]
    UnsupportedInput,

    #[error("Invalid JSON format")]
    InvalidJson(#[source] serde_json::Error),

    #[error("Failed to ingest {0}")]
    Ingest(String, #[source] FetchError),

    #[error("Failed to store document: {0}")]
    Store(#[from] StoreError),

    #[error("Failed to retrieve document: {0}")]
    Corrupt(#[source] serde_json::Error),
}

impl DocumentError {
    /// Whether the error stems from what the caller sent rather than from the backend.
    pub fn is_input_error(&self) -> bool {
        matches!(
            self,
            Self::TooLarge { .. } | Self::UnsupportedInput | Self::InvalidJson(_)
        )
    }
}
