use anyformat_protocol::{DocumentSource, JsonDocument};
use reqwest::Url;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info};

use crate::detect::is_json;
use crate::fetch::Fetcher;
use crate::store::{DocumentStore, PutOptions};
use crate::DocumentError;

const ID_ALPHABET: &[u8] = b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz";
const ID_LENGTH: usize = 12;
const UNTITLED: &str = "Untitled";
const MIB: u64 = 1024 * 1024;

/// Limits applied when accepting new content.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DocumentLimits {
    /// Largest accepted input, in bytes.
    pub max_content_bytes: u64,
}

impl Default for DocumentLimits {
    fn default() -> Self {
        Self {
            max_content_bytes: 1024 * MIB,
        }
    }
}

/// Per-document creation options.
#[derive(Debug, Clone, Default)]
pub struct CreateJsonOptions {
    pub ttl: Option<Duration>,
    pub read_only: bool,
    /// Fetch a URL's body and store it as a raw document instead of a reference.
    pub ingest: bool,
    pub metadata: Option<Value>,
}

impl CreateJsonOptions {
    fn put_options(&self) -> PutOptions {
        PutOptions {
            expiration_ttl: self.ttl,
            metadata: self.metadata.clone(),
        }
    }
}

/// Random 12-character alphanumeric document id.
pub fn create_id() -> String {
    // Bytes 6 and 8 carry the UUID version and variant bits.
    uuid::Uuid::new_v4()
        .as_bytes()
        .iter()
        .enumerate()
        .filter(|(i, _)| *i != 6 && *i != 8)
        .take(ID_LENGTH)
        .map(|(_, b)| ID_ALPHABET[*b as usize % ID_ALPHABET.len()] as char)
        .collect()
}

/// Creates, reads and edits documents held in a [`DocumentStore`].
pub struct DocumentService {
    store: Arc<dyn DocumentStore>,
    fetcher: Arc<dyn Fetcher>,
    limits: DocumentLimits,
    defaults: CreateJsonOptions,
}

impl DocumentService {
    pub fn new(store: Arc<dyn DocumentStore>, fetcher: Arc<dyn Fetcher>) -> Self {
        Self {
            store,
            fetcher,
            limits: DocumentLimits::default(),
            defaults: CreateJsonOptions::default(),
        }
    }

    pub fn with_limits(mut self, limits: DocumentLimits) -> Self {
        self.limits = limits;
        self
    }

    /// Options used by [`DocumentService::create_from_url_or_raw_json`].
    pub fn with_default_options(mut self, options: CreateJsonOptions) -> Self {
        self.defaults = options;
        self
    }

    pub fn default_options(&self) -> &CreateJsonOptions {
        &self.defaults
    }

    /// Accept user input that is either a URL or raw JSON text.
    pub async fn create_from_url_or_raw_json(
        &self,
        input: &str,
        title: Option<&str>,
    ) -> Result<JsonDocument, DocumentError> {
        debug!(length = input.len(), title = ?title, "Processing input");

        let size = input.len() as u64;
        if size > self.limits.max_content_bytes {
            let err = DocumentError::TooLarge {
                limit_mb: self.limits.max_content_bytes / MIB,
                actual_mb: (size as f64 / MIB as f64 * 10.0).round() / 10.0,
            };
            error!(error = %err, "Size limit exceeded");
            return Err(err);
        }

        if let Ok(url) = Url::parse(input) {
            debug!("Creating from URL");
            return self.create_from_url(&url, title, &self.defaults).await;
        }

        if is_json(input) {
            debug!("Creating from JSON");
            return self
                .create_from_raw_json(title.unwrap_or(UNTITLED), input, &self.defaults)
                .await;
        }

        error!(length = input.len(), "No valid format detected for input");
        Err(DocumentError::UnsupportedInput)
    }

    /// Store a reference to `url`, or with `ingest` fetch it and store its body.
    pub async fn create_from_url(
        &self,
        url: &Url,
        title: Option<&str>,
        options: &CreateJsonOptions,
    ) -> Result<JsonDocument, DocumentError> {
        if options.ingest {
            let body = self
                .fetcher
                .fetch_text(url)
                .await
                .map_err(|e| DocumentError::Ingest(url.to_string(), e))?;
            let title = title.unwrap_or(url.as_str());
            return self.create_from_raw_json(title, &body, options).await;
        }

        let doc = JsonDocument {
            id: create_id(),
            title: title
                .map(str::to_string)
                .unwrap_or_else(|| url.host_str().unwrap_or_default().to_string()),
            read_only: options.read_only,
            source: DocumentSource::Url {
                url: url.to_string(),
            },
        };

        self.put(&doc, options).await?;
        info!(id = %doc.id, url = %url, "URL document created");
        Ok(doc)
    }

    /// Validate `contents` as JSON and store it under a fresh id.
    pub async fn create_from_raw_json(
        &self,
        filename: &str,
        contents: &str,
        options: &CreateJsonOptions,
    ) -> Result<JsonDocument, DocumentError> {
        debug!(filename = %filename, length = contents.len(), "Creating raw JSON document");

        if let Err(e) = serde_json::from_str::<serde::de::IgnoredAny>(contents) {
            error!(error = %e, "JSON parsing failed");
            return Err(DocumentError::InvalidJson(e));
        }

        let doc = JsonDocument {
            id: create_id(),
            title: filename.to_string(),
            read_only: options.read_only,
            source: DocumentSource::Raw {
                contents: contents.to_string(),
            },
        };

        if let Err(e) = self.put(&doc, options).await {
            error!(id = %doc.id, error = %e, "Failed to store document");
            return Err(e);
        }
        info!(id = %doc.id, "Document stored");
        Ok(doc)
    }

    pub async fn get(&self, id: &str) -> Result<Option<JsonDocument>, DocumentError> {
        let Some(raw) = self.store.get(id).await? else {
            debug!(id = %id, "Document not found");
            return Ok(None);
        };
        let doc = serde_json::from_str(&raw).map_err(DocumentError::Corrupt)?;
        Ok(Some(doc))
    }

    /// Rename a document. Returns `None` when it does not exist.
    pub async fn update_title(
        &self,
        id: &str,
        title: &str,
    ) -> Result<Option<JsonDocument>, DocumentError> {
        let Some(mut doc) = self.get(id).await? else {
            return Ok(None);
        };
        doc.title = title.to_string();
        self.put(&doc, &CreateJsonOptions::default()).await?;
        Ok(Some(doc))
    }

    pub async fn delete(&self, id: &str) -> Result<(), DocumentError> {
        self.store.delete(id).await?;
        Ok(())
    }

    async fn put(&self, doc: &JsonDocument, options: &CreateJsonOptions) -> Result<(), DocumentError> {
        let value = serde_json::to_string(doc).map_err(DocumentError::Corrupt)?;
        self.store.put(&doc.id, value, options.put_options()).await?;
        Ok(())
    }
}
