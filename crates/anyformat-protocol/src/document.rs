use serde::{Deserialize, Serialize};

/// A stored JSON document, either holding its contents or pointing at a URL.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct JsonDocument {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub read_only: bool,
    #[serde(flatten)]
    pub source: DocumentSource,
}

/// Payload of a document, tagged by `type` on the wire.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DocumentSource {
    Raw { contents: String },
    Url { url: String },
}

impl JsonDocument {
    pub fn is_url(&self) -> bool {
        matches!(self.source, DocumentSource::Url { .. })
    }

    /// Raw contents, when the document carries them.
    pub fn contents(&self) -> Option<&str> {
        match &self.source {
            DocumentSource::Raw { contents } => Some(contents),
            DocumentSource::Url { .. } => None,
        }
    }
}

/// Params for `document/create`: a URL or raw JSON text.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentCreateRequest {
    pub input: String,
    #[serde(default)]
    pub title: Option<String>,
}

/// Params for `document/create_from_file`, mirroring an upload form.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CreateFromFileRequest {
    #[serde(default)]
    pub filename: Option<String>,
    #[serde(default, rename = "rawJson")]
    pub raw_json: Option<String>,
}

/// Per-field validation flags for `document/create_from_file`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct CreateFromFileErrors {
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub filename: bool,
    #[serde(default, rename = "rawJson", skip_serializing_if = "std::ops::Not::not")]
    pub raw_json: bool,
}

impl CreateFromFileRequest {
    /// Check that both fields are present and non-empty.
    pub fn validate(&self) -> Result<(&str, &str), CreateFromFileErrors> {
        let filename = self.filename.as_deref().filter(|s| !s.is_empty());
        let raw_json = self.raw_json.as_deref().filter(|s| !s.is_empty());

        match (filename, raw_json) {
            (Some(filename), Some(raw_json)) => Ok((filename, raw_json)),
            _ => Err(CreateFromFileErrors {
                filename: filename.is_none(),
                raw_json: raw_json.is_none(),
            }),
        }
    }
}

/// Params for methods addressed by document id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentIdRequest {
    pub id: String,
}

/// Params for `document/update`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentUpdateRequest {
    pub id: String,
    pub title: String,
}

/// Params for `content/classify`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassifyRequest {
    pub content: String,
}

/// What the classifiers make of a piece of content.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ClassifyResponse {
    pub url: bool,
    pub json: bool,
    pub html: bool,
    /// UTF-8 byte length.
    pub size: u64,
    pub preview: String,
}
