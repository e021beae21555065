use anyformat_documents::{DocumentService, HttpFetcher, MemoryDocumentStore};
use anyformat_history::{FileHistory, FileStorage};
use anyformat_protocol::{methods, JsonRpcRequest, JsonRpcResponse, RequestId, PARSE_ERROR};
use anyhow::Result;
use std::sync::{Arc, Mutex};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::UnixListener;
use tracing::{error, info, warn};

use crate::config::Config;
use crate::handler::{RequestHandler, SharedHistory};

/// The main daemon server.
pub struct Server {
    config: Arc<Config>,
    handler: Arc<RequestHandler>,
}

impl Server {
    pub fn new(config: Config) -> Self {
        let config = Arc::new(config);

        let documents = DocumentService::new(
            Arc::new(MemoryDocumentStore::new()),
            Arc::new(HttpFetcher::new(config.documents.fetch_timeout())),
        )
        .with_limits(config.documents.limits())
        .with_default_options(config.documents.create_options());

        let history: SharedHistory = Arc::new(Mutex::new(open_history(&config)));
        let handler = Arc::new(RequestHandler::new(config.clone(), documents, history));

        Self { config, handler }
    }

    /// Run the daemon server, listening on Unix socket.
    pub async fn run(&self) -> Result<()> {
        let socket_path = &self.config.daemon.socket_path;

        // Clean up stale socket file
        if std::path::Path::new(socket_path).exists() {
            std::fs::remove_file(socket_path)?;
        }

        let listener = UnixListener::bind(socket_path)?;
        info!(socket = %socket_path, "anyformat daemon listening");

        let pid = std::process::id();
        std::fs::write(Config::pid_path(), pid.to_string())?;
        info!(pid = pid, "PID file written");

        loop {
            match listener.accept().await {
                Ok((stream, _addr)) => {
                    let handler = self.handler.clone();
                    tokio::spawn(async move {
                        if let Err(e) = handle_connection(stream, handler).await {
                            error!(error = %e, "Connection handler error");
                        }
                    });
                }
                Err(e) => {
                    error!(error = %e, "Failed to accept connection");
                }
            }
        }
    }
}

/// History tracker for the configured storage, or a detached one when disabled.
fn open_history(config: &Config) -> FileHistory<FileStorage> {
    let history = if config.history.enabled {
        let mut storage = FileStorage::new(config.history.storage_dir());
        if config.history.quota_bytes > 0 {
            storage = storage.with_quota(config.history.quota_bytes);
        }
        info!(dir = %storage.dir().display(), "File history enabled");
        FileHistory::new(storage)
    } else {
        info!("File history disabled");
        FileHistory::detached()
    };
    history.with_limits(config.history.limits())
}

async fn handle_connection(
    stream: tokio::net::UnixStream,
    handler: Arc<RequestHandler>,
) -> Result<()> {
    let (reader, mut writer) = stream.into_split();
    let mut reader = BufReader::new(reader);
    let mut line = String::new();

    while reader.read_line(&mut line).await? > 0 {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            line.clear();
            continue;
        }

        let response = match serde_json::from_str::<JsonRpcRequest>(trimmed) {
            Ok(request) => {
                let is_shutdown = request.method == methods::SHUTDOWN;
                let response = handler.handle(request).await;

                if is_shutdown {
                    let json = serde_json::to_string(&response)?;
                    writer.write_all(json.as_bytes()).await?;
                    writer.write_all(b"\n").await?;
                    writer.flush().await?;

                    // Clean up and exit
                    info!("Shutting down");
                    let _ = std::fs::remove_file(Config::pid_path());
                    std::process::exit(0);
                }

                response
            }
            Err(e) => {
                warn!(error = %e, "Failed to parse request");
                JsonRpcResponse::error(
                    PARSE_ERROR,
                    format!("Parse error: {e}"),
                    RequestId::Number(0),
                )
            }
        };

        let json = serde_json::to_string(&response)?;
        writer.write_all(json.as_bytes()).await?;
        writer.write_all(b"\n").await?;
        writer.flush().await?;

        line.clear();
    }

    Ok(())
}

/// Initialize tracing subscriber.
pub fn init_tracing(log_level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}
