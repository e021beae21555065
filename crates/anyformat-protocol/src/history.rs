use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Where a tracked document came from.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum HistoryKind {
    /// Raw JSON pasted, dropped or uploaded as a file.
    File,
    /// A document that references (or was ingested from) a URL.
    Url,
}

/// One entry in the recently-opened document list.
///
/// Field names on the wire match the persisted collection format
/// (`type`, `createdAt`, `lastAccessed`, `size`).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct HistoryRecord {
    /// Document identifier. Unique within the list.
    pub id: String,
    /// Display name.
    pub title: String,
    #[serde(rename = "type")]
    pub kind: HistoryKind,
    /// Set once, when the record is first inserted.
    pub created_at: DateTime<Utc>,
    /// Updated every time the document is revisited.
    pub last_accessed: DateTime<Utc>,
    /// Byte length of the content, when known.
    #[serde(rename = "size", default, skip_serializing_if = "Option::is_none")]
    pub size_bytes: Option<u64>,
    /// Truncated textual preview.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preview: Option<String>,
}

/// A record as supplied by callers; timestamps are assigned on insertion.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct NewHistoryRecord {
    pub id: String,
    pub title: String,
    #[serde(rename = "type")]
    pub kind: HistoryKind,
    #[serde(rename = "size", default, skip_serializing_if = "Option::is_none")]
    pub size_bytes: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preview: Option<String>,
}

impl NewHistoryRecord {
    pub fn new(id: impl Into<String>, title: impl Into<String>, kind: HistoryKind) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            kind,
            size_bytes: None,
            preview: None,
        }
    }

    pub fn with_size(mut self, size_bytes: u64) -> Self {
        self.size_bytes = Some(size_bytes);
        self
    }

    pub fn with_preview(mut self, preview: impl Into<String>) -> Self {
        self.preview = Some(preview.into());
        self
    }

    /// Stamp the candidate into a full record.
    pub fn into_record(self, now: DateTime<Utc>) -> HistoryRecord {
        HistoryRecord {
            id: self.id,
            title: self.title,
            kind: self.kind,
            created_at: now,
            last_accessed: now,
            size_bytes: self.size_bytes,
            preview: self.preview,
        }
    }
}

/// Params for history methods addressed by document id (`history/touch`, `history/remove`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryIdRequest {
    pub id: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn record_uses_persisted_field_names() {
        let now = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
        let record = NewHistoryRecord::new("abc", "data.json", HistoryKind::File)
            .with_size(42)
            .into_record(now);

        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["type"], "file");
        assert_eq!(json["size"], 42);
        assert!(json.get("createdAt").is_some());
        assert!(json.get("lastAccessed").is_some());
        assert!(json.get("preview").is_none());
    }

    #[test]
    fn parses_record_without_optional_fields() {
        let json = r#"{
            "id": "x1",
            "title": "https://example.com",
            "type": "url",
            "createdAt": "2024-05-01T12:00:00.000Z",
            "lastAccessed": "2024-05-02T08:30:00.000Z"
        }"#;
        let record: HistoryRecord = serde_json::from_str(json).unwrap();
        assert_eq!(record.kind, HistoryKind::Url);
        assert_eq!(record.size_bytes, None);
        assert!(record.last_accessed > record.created_at);
    }
}
