use anyformat_documents::{is_json, is_likely_html, is_url, DocumentError, DocumentService};
use anyformat_history::{estimate_size, generate_preview, FileHistory, FileStorage};
use anyformat_protocol::*;
use anyhow::Context;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::sync::{Arc, Mutex};
use tracing::{debug, error, info, warn};

use crate::config::Config;

/// History tracker shared by all connections.
///
/// The tracker does blocking file I/O, so it is only touched from
/// [`tokio::task::spawn_blocking`] through [`RequestHandler::with_history`].
pub type SharedHistory = Arc<Mutex<FileHistory<FileStorage>>>;

/// Handles incoming JSON-RPC requests.
pub struct RequestHandler {
    config: Arc<Config>,
    documents: DocumentService,
    history: SharedHistory,
}

impl RequestHandler {
    pub fn new(config: Arc<Config>, documents: DocumentService, history: SharedHistory) -> Self {
        Self {
            config,
            documents,
            history,
        }
    }

    /// Process a JSON-RPC request and return a response.
    pub async fn handle(&self, request: JsonRpcRequest) -> JsonRpcResponse {
        debug!(method = %request.method, "Handling request");

        match request.method.as_str() {
            methods::STATUS => self.handle_status(request).await,
            methods::SHUTDOWN => self.handle_shutdown(request).await,
            methods::DOCUMENT_CREATE => self.handle_document_create(request).await,
            methods::DOCUMENT_CREATE_FROM_FILE => self.handle_create_from_file(request).await,
            methods::DOCUMENT_GET => self.handle_document_get(request).await,
            methods::DOCUMENT_UPDATE => self.handle_document_update(request).await,
            methods::DOCUMENT_DELETE => self.handle_document_delete(request).await,
            methods::HISTORY_LIST => self.handle_history_list(request).await,
            methods::HISTORY_ADD => self.handle_history_add(request).await,
            methods::HISTORY_TOUCH => self.handle_history_touch(request).await,
            methods::HISTORY_REMOVE => self.handle_history_remove(request).await,
            methods::HISTORY_CLEAR => self.handle_history_clear(request).await,
            methods::CONTENT_CLASSIFY => self.handle_classify(request),
            _ => JsonRpcResponse::error(
                METHOD_NOT_FOUND,
                format!("Unknown method: {}", request.method),
                request.id,
            ),
        }
    }

    async fn handle_status(&self, request: JsonRpcRequest) -> JsonRpcResponse {
        let (enabled, items) = match self
            .with_history(|history| (history.is_attached(), history.list().len()))
            .await
        {
            Ok(state) => state,
            Err(e) => return history_error(e, request.id),
        };
        let status = serde_json::json!({
            "status": "running",
            "documents_ttl_secs": self.config.documents.ttl_secs,
            "history_enabled": enabled,
            "history_items": items,
        });
        JsonRpcResponse::success(status, request.id)
    }

    async fn handle_shutdown(&self, request: JsonRpcRequest) -> JsonRpcResponse {
        info!("Shutdown requested");
        JsonRpcResponse::success(Value::String("shutting down".to_string()), request.id)
    }

    async fn handle_document_create(&self, request: JsonRpcRequest) -> JsonRpcResponse {
        let params: DocumentCreateRequest = match parse_params(request.params, &request.id) {
            Ok(p) => p,
            Err(response) => return response,
        };

        match self
            .documents
            .create_from_url_or_raw_json(&params.input, params.title.as_deref())
            .await
        {
            Ok(doc) => {
                self.record(&doc).await;
                success(&doc, request.id)
            }
            Err(e) => document_error(e, request.id),
        }
    }

    async fn handle_create_from_file(&self, request: JsonRpcRequest) -> JsonRpcResponse {
        let params: CreateFromFileRequest = match parse_params(request.params, &request.id) {
            Ok(p) => p,
            Err(response) => return response,
        };

        let (filename, raw_json) = match params.validate() {
            Ok(fields) => fields,
            Err(errors) => {
                debug!(?errors, "Validation errors");
                return JsonRpcResponse::error_with_data(
                    INVALID_PARAMS,
                    "Missing required fields",
                    serde_json::to_value(&errors).ok(),
                    request.id,
                );
            }
        };

        match self
            .documents
            .create_from_raw_json(filename, raw_json, self.documents.default_options())
            .await
        {
            Ok(doc) => {
                info!(id = %doc.id, "Document created from file upload");
                self.record(&doc).await;
                success(&doc, request.id)
            }
            Err(e) => document_error(e, request.id),
        }
    }

    async fn handle_document_get(&self, request: JsonRpcRequest) -> JsonRpcResponse {
        let params: DocumentIdRequest = match parse_params(request.params, &request.id) {
            Ok(p) => p,
            Err(response) => return response,
        };

        match self.documents.get(&params.id).await {
            Ok(Some(doc)) => {
                self.record(&doc).await;
                success(&doc, request.id)
            }
            Ok(None) => JsonRpcResponse::success(Value::Null, request.id),
            Err(e) => document_error(e, request.id),
        }
    }

    async fn handle_document_update(&self, request: JsonRpcRequest) -> JsonRpcResponse {
        let params: DocumentUpdateRequest = match parse_params(request.params, &request.id) {
            Ok(p) => p,
            Err(response) => return response,
        };

        match self.documents.update_title(&params.id, &params.title).await {
            Ok(updated) => success(&updated, request.id),
            Err(e) => document_error(e, request.id),
        }
    }

    async fn handle_document_delete(&self, request: JsonRpcRequest) -> JsonRpcResponse {
        let params: DocumentIdRequest = match parse_params(request.params, &request.id) {
            Ok(p) => p,
            Err(response) => return response,
        };

        match self.documents.delete(&params.id).await {
            Ok(()) => JsonRpcResponse::success(Value::Null, request.id),
            Err(e) => document_error(e, request.id),
        }
    }

    async fn handle_history_list(&self, request: JsonRpcRequest) -> JsonRpcResponse {
        match self.with_history(|history| history.list()).await {
            Ok(records) => success(&records, request.id),
            Err(e) => history_error(e, request.id),
        }
    }

    async fn handle_history_add(&self, request: JsonRpcRequest) -> JsonRpcResponse {
        let params: NewHistoryRecord = match parse_params(request.params, &request.id) {
            Ok(p) => p,
            Err(response) => return response,
        };
        self.history_update(request.id, move |history| history.add(params))
            .await
    }

    async fn handle_history_touch(&self, request: JsonRpcRequest) -> JsonRpcResponse {
        let params: HistoryIdRequest = match parse_params(request.params, &request.id) {
            Ok(p) => p,
            Err(response) => return response,
        };
        self.history_update(request.id, move |history| {
            history.update_last_accessed(&params.id)
        })
        .await
    }

    async fn handle_history_remove(&self, request: JsonRpcRequest) -> JsonRpcResponse {
        let params: HistoryIdRequest = match parse_params(request.params, &request.id) {
            Ok(p) => p,
            Err(response) => return response,
        };
        self.history_update(request.id, move |history| history.remove(&params.id))
            .await
    }

    async fn handle_history_clear(&self, request: JsonRpcRequest) -> JsonRpcResponse {
        self.history_update(request.id, |history| history.clear())
            .await
    }

    fn handle_classify(&self, request: JsonRpcRequest) -> JsonRpcResponse {
        let params: ClassifyRequest = match parse_params(request.params, &request.id) {
            Ok(p) => p,
            Err(response) => return response,
        };

        let content = &params.content;
        let response = ClassifyResponse {
            url: is_url(content),
            json: is_json(content),
            html: is_likely_html(content),
            size: estimate_size(content) as u64,
            preview: generate_preview(content),
        };
        success(&response, request.id)
    }

    /// Add a viewed document to the recent-items list.
    async fn record(&self, doc: &JsonDocument) {
        let kind = if doc.is_url() {
            HistoryKind::Url
        } else {
            HistoryKind::File
        };
        let mut entry = NewHistoryRecord::new(&doc.id, &doc.title, kind);
        if let Some(contents) = doc.contents() {
            entry = entry
                .with_size(estimate_size(contents) as u64)
                .with_preview(generate_preview(contents));
        }
        if let Err(e) = self.with_history(move |history| history.add(entry)).await {
            error!(error = %e, "Failed to record document in history");
        }
    }

    /// Run `op` against the tracker on the blocking thread pool.
    async fn with_history<T, F>(&self, op: F) -> anyhow::Result<T>
    where
        F: FnOnce(&mut FileHistory<FileStorage>) -> T + Send + 'static,
        T: Send + 'static,
    {
        let history = self.history.clone();
        tokio::task::spawn_blocking(move || -> anyhow::Result<T> {
            let mut history = history
                .lock()
                .map_err(|_| anyhow::anyhow!("History lock poisoned"))?;
            Ok(op(&mut history))
        })
        .await
        .context("History task failed")?
    }

    /// Apply a history mutation and answer with `null`.
    async fn history_update<F>(&self, id: RequestId, op: F) -> JsonRpcResponse
    where
        F: FnOnce(&mut FileHistory<FileStorage>) + Send + 'static,
    {
        match self.with_history(op).await {
            Ok(()) => JsonRpcResponse::success(Value::Null, id),
            Err(e) => history_error(e, id),
        }
    }
}

fn parse_params<T: DeserializeOwned>(
    params: Option<Value>,
    id: &RequestId,
) -> Result<T, JsonRpcResponse> {
    let Some(params) = params else {
        return Err(JsonRpcResponse::error(
            INVALID_PARAMS,
            "Missing params",
            id.clone(),
        ));
    };
    serde_json::from_value(params).map_err(|e| {
        JsonRpcResponse::error(INVALID_PARAMS, format!("Invalid params: {e}"), id.clone())
    })
}

fn success<T: Serialize>(value: &T, id: RequestId) -> JsonRpcResponse {
    match serde_json::to_value(value) {
        Ok(result) => JsonRpcResponse::success(result, id),
        Err(e) => JsonRpcResponse::error(INTERNAL_ERROR, format!("Serialization failed: {e}"), id),
    }
}

fn history_error(error: anyhow::Error, id: RequestId) -> JsonRpcResponse {
    error!(error = %error, "History operation failed");
    JsonRpcResponse::error(INTERNAL_ERROR, format!("{error:#}"), id)
}

fn document_error(error: DocumentError, id: RequestId) -> JsonRpcResponse {
    let code = if error.is_input_error() {
        INVALID_PARAMS
    } else {
        warn!(error = %error, "Document operation failed");
        INTERNAL_ERROR
    };
    JsonRpcResponse::error(code, error.to_string(), id)
}
