use anyformat_documents::{CreateJsonOptions, DocumentLimits};
use anyformat_history::{
    HistoryLimits, MAX_HISTORY_BYTES, MAX_HISTORY_ITEMS, PREVIEW_MAX_CHARS, RECOVERY_ITEMS,
};
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

/// Top-level daemon configuration.
#[derive(Debug, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub daemon: DaemonConfig,
    #[serde(default)]
    pub history: HistoryConfig,
    #[serde(default)]
    pub documents: DocumentsConfig,
}

#[derive(Debug, Deserialize)]
pub struct DaemonConfig {
    #[serde(default = "default_socket_path")]
    pub socket_path: String,
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

#[derive(Debug, Deserialize)]
pub struct HistoryConfig {
    /// When off, history requests succeed but nothing is stored.
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default)]
    pub storage_dir: Option<String>,
    #[serde(default = "default_max_items")]
    pub max_items: usize,
    #[serde(default = "default_max_bytes")]
    pub max_bytes: usize,
    #[serde(default = "default_preview_chars")]
    pub preview_chars: usize,
    #[serde(default = "default_recovery_items")]
    pub recovery_items: usize,
    /// Total bytes the storage directory may hold (0 = unlimited).
    #[serde(default)]
    pub quota_bytes: usize,
}

#[derive(Debug, Deserialize)]
pub struct DocumentsConfig {
    #[serde(default = "default_max_content_bytes")]
    pub max_content_bytes: u64,
    /// Document lifetime in seconds (0 = keep forever).
    #[serde(default)]
    pub ttl_secs: u64,
    #[serde(default = "default_fetch_timeout_ms")]
    pub fetch_timeout_ms: u64,
    /// Fetch URL inputs and store their body instead of a reference.
    #[serde(default)]
    pub ingest_urls: bool,
    #[serde(default)]
    pub read_only: bool,
}

fn default_socket_path() -> String {
    "/tmp/anyformat.sock".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_true() -> bool {
    true
}

fn default_max_items() -> usize {
    MAX_HISTORY_ITEMS
}

fn default_max_bytes() -> usize {
    MAX_HISTORY_BYTES
}

fn default_preview_chars() -> usize {
    PREVIEW_MAX_CHARS
}

fn default_recovery_items() -> usize {
    RECOVERY_ITEMS
}

fn default_max_content_bytes() -> u64 {
    DocumentLimits::default().max_content_bytes
}

fn default_fetch_timeout_ms() -> u64 {
    10_000
}

fn home_dir() -> String {
    std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string())
}

impl Default for DaemonConfig {
    fn default() -> Self {
        Self {
            socket_path: default_socket_path(),
            log_level: default_log_level(),
        }
    }
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            enabled: default_true(),
            storage_dir: None,
            max_items: default_max_items(),
            max_bytes: default_max_bytes(),
            preview_chars: default_preview_chars(),
            recovery_items: default_recovery_items(),
            quota_bytes: 0,
        }
    }
}

impl Default for DocumentsConfig {
    fn default() -> Self {
        Self {
            max_content_bytes: default_max_content_bytes(),
            ttl_secs: 0,
            fetch_timeout_ms: default_fetch_timeout_ms(),
            ingest_urls: false,
            read_only: false,
        }
    }
}

impl HistoryConfig {
    pub fn limits(&self) -> HistoryLimits {
        HistoryLimits {
            max_items: self.max_items,
            max_bytes: self.max_bytes,
            preview_chars: self.preview_chars,
            recovery_items: self.recovery_items,
        }
    }

    /// Directory holding the history file, with a leading `~/` expanded.
    pub fn storage_dir(&self) -> PathBuf {
        match self.storage_dir.as_deref() {
            Some(dir) => match dir.strip_prefix("~/") {
                Some(rest) => PathBuf::from(home_dir()).join(rest),
                None => PathBuf::from(dir),
            },
            None => PathBuf::from(format!("{}/.local/share/anyformat", home_dir())),
        }
    }
}

impl DocumentsConfig {
    pub fn limits(&self) -> DocumentLimits {
        DocumentLimits {
            max_content_bytes: self.max_content_bytes,
        }
    }

    pub fn ttl(&self) -> Option<Duration> {
        (self.ttl_secs > 0).then(|| Duration::from_secs(self.ttl_secs))
    }

    pub fn create_options(&self) -> CreateJsonOptions {
        CreateJsonOptions {
            ttl: self.ttl(),
            read_only: self.read_only,
            ingest: self.ingest_urls,
            metadata: None,
        }
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_millis(self.fetch_timeout_ms)
    }
}

impl Config {
    /// Load config from the default path (~/.config/anyformat/config.toml).
    pub fn load() -> anyhow::Result<Self> {
        let path = Self::config_path();
        if path.exists() {
            Self::load_from(&path)
        } else {
            Ok(Config::default())
        }
    }

    /// Load config from a specific path.
    pub fn load_from(path: &std::path::Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    pub fn config_path() -> PathBuf {
        PathBuf::from(format!("{}/.config/anyformat/config.toml", home_dir()))
    }

    pub fn pid_path() -> PathBuf {
        PathBuf::from("/tmp/anyformat.pid")
    }
}
