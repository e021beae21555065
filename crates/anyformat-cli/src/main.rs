use anyhow::{bail, Context, Result};
use anyformat_daemon::config::Config;
use anyformat_daemon::server::{self, Server};
use anyformat_protocol::{
    methods, HistoryRecord, JsonDocument, JsonRpcRequest, JsonRpcResponse, RequestId,
};
use clap::{Parser, Subcommand};
use serde_json::Value;
use std::path::Path;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::UnixStream;
use tracing::debug;

#[derive(Parser)]
#[command(name = "anyformat", about = "View and keep track of JSON documents")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the anyformat daemon
    Start {
        /// Run in foreground (don't daemonize)
        #[arg(long)]
        foreground: bool,
        /// Path to config file
        #[arg(long)]
        config: Option<String>,
    },
    /// Stop the running daemon
    Stop,
    /// Show daemon status
    Status,
    /// Open a JSON file, a URL, or raw JSON text
    Open {
        input: String,
        /// Title to store the document under
        #[arg(long)]
        title: Option<String>,
    },
    /// Inspect or edit the recently opened documents
    History {
        #[command(subcommand)]
        action: HistoryCommand,
    },
    /// Report whether a file looks like a URL, JSON or HTML
    Classify { path: String },
}

#[derive(Subcommand)]
enum HistoryCommand {
    /// List recent documents, most recently accessed first
    List,
    /// Mark a document as accessed now
    Touch { id: String },
    /// Forget a single document
    Remove { id: String },
    /// Forget all documents
    Clear,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Start { foreground, config } => cmd_start(foreground, config).await,
        Commands::Stop => cmd_stop().await,
        Commands::Status => cmd_status().await,
        Commands::Open { input, title } => cmd_open(&input, title).await,
        Commands::History { action } => cmd_history(action).await,
        Commands::Classify { path } => cmd_classify(&path).await,
    }
}

async fn cmd_start(foreground: bool, config_path: Option<String>) -> Result<()> {
    if is_daemon_running() {
        println!("anyformat daemon is already running.");
        return Ok(());
    }

    let config = match &config_path {
        Some(path) => Config::load_from(Path::new(path))?,
        None => Config::load()?,
    };

    if foreground {
        server::init_tracing(&config.daemon.log_level);
        println!("Starting anyformat daemon (foreground)...");
        let server = Server::new(config);
        server.run().await?;
    } else {
        let exe = std::env::current_exe()?;
        let mut args = vec!["start".to_string(), "--foreground".to_string()];
        if let Some(path) = config_path {
            args.push("--config".to_string());
            args.push(path);
        }

        let child = std::process::Command::new(exe)
            .args(&args)
            .stdin(std::process::Stdio::null())
            .stdout(std::process::Stdio::null())
            .stderr(std::process::Stdio::null())
            .spawn()
            .context("Failed to spawn daemon process")?;

        println!("anyformat daemon started (PID: {})", child.id());
    }

    Ok(())
}

async fn cmd_stop() -> Result<()> {
    if !is_daemon_running() {
        println!("anyformat daemon is not running.");
        return Ok(());
    }

    let config = Config::load().unwrap_or_default();
    match send_request(&config.daemon.socket_path, methods::SHUTDOWN, None).await {
        Ok(_) => println!("anyformat daemon stopped."),
        Err(_) => {
            // Fallback: kill via PID
            if let Some(pid) = read_pid() {
                unsafe {
                    libc::kill(pid, libc::SIGTERM);
                }
                let _ = std::fs::remove_file(Config::pid_path());
                println!("anyformat daemon stopped (via signal).");
            }
        }
    }

    Ok(())
}

async fn cmd_status() -> Result<()> {
    if !is_daemon_running() {
        println!("anyformat daemon is not running.");
        return Ok(());
    }

    let result = call(methods::STATUS, None).await?;
    println!("anyformat daemon status:");
    println!("{}", serde_json::to_string_pretty(&result)?);
    Ok(())
}

async fn cmd_open(input: &str, title: Option<String>) -> Result<()> {
    let path = Path::new(input);
    let result = if path.is_file() {
        let raw_json = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let filename = title.unwrap_or_else(|| {
            path.file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| input.to_string())
        });
        let params = serde_json::json!({"filename": filename, "rawJson": raw_json});
        call(methods::DOCUMENT_CREATE_FROM_FILE, Some(params)).await?
    } else {
        let params = serde_json::json!({"input": input, "title": title});
        call(methods::DOCUMENT_CREATE, Some(params)).await?
    };

    let doc: JsonDocument = serde_json::from_value(result)?;
    let kind = if doc.is_url() { "url" } else { "raw" };
    println!("{}  {kind}  {}", doc.id, doc.title);
    Ok(())
}

async fn cmd_history(action: HistoryCommand) -> Result<()> {
    match action {
        HistoryCommand::List => {
            let result = call(methods::HISTORY_LIST, None).await?;
            let records: Vec<HistoryRecord> = serde_json::from_value(result)?;
            if records.is_empty() {
                println!("No recent documents.");
            }
            for record in records {
                let size = record
                    .size_bytes
                    .map(|s| format!("{s} B"))
                    .unwrap_or_else(|| "-".to_string());
                println!(
                    "{}  {:<4}  {:>10}  {}  {}",
                    record.id,
                    format!("{:?}", record.kind).to_lowercase(),
                    size,
                    record.last_accessed.format("%Y-%m-%d %H:%M"),
                    record.title,
                );
            }
        }
        HistoryCommand::Touch { id } => {
            call(methods::HISTORY_TOUCH, Some(serde_json::json!({"id": id}))).await?;
        }
        HistoryCommand::Remove { id } => {
            call(methods::HISTORY_REMOVE, Some(serde_json::json!({"id": id}))).await?;
            println!("Removed {id} from history.");
        }
        HistoryCommand::Clear => {
            call(methods::HISTORY_CLEAR, None).await?;
            println!("History cleared.");
        }
    }
    Ok(())
}

async fn cmd_classify(path: &str) -> Result<()> {
    let content =
        std::fs::read_to_string(path).with_context(|| format!("Failed to read {path}"))?;
    let result = call(
        methods::CONTENT_CLASSIFY,
        Some(serde_json::json!({"content": content})),
    )
    .await?;
    println!("{}", serde_json::to_string_pretty(&result)?);
    Ok(())
}

/// Send a request to the configured daemon and unwrap its result.
async fn call(method: &str, params: Option<Value>) -> Result<Value> {
    let config = Config::load().unwrap_or_default();
    let response = send_request(&config.daemon.socket_path, method, params)
        .await
        .context("Could not reach the anyformat daemon (is it running?)")?;

    if let Some(error) = response.error {
        match error.data {
            Some(data) => bail!("{} ({data})", error.message),
            None => bail!("{}", error.message),
        }
    }
    Ok(response.result.unwrap_or(Value::Null))
}

/// Send a JSON-RPC request to the daemon and return the response.
async fn send_request(
    socket_path: &str,
    method: &str,
    params: Option<Value>,
) -> Result<JsonRpcResponse> {
    debug!(method, socket = socket_path, "Sending request");
    let stream = UnixStream::connect(socket_path).await?;
    let (reader, mut writer) = stream.into_split();

    let request = JsonRpcRequest::new(method, params, RequestId::Number(1));
    let json = serde_json::to_string(&request)?;

    writer.write_all(json.as_bytes()).await?;
    writer.write_all(b"\n").await?;
    writer.flush().await?;

    let mut reader = BufReader::new(reader);
    let mut line = String::new();
    reader.read_line(&mut line).await?;

    let response: JsonRpcResponse = serde_json::from_str(&line)?;
    Ok(response)
}

fn read_pid() -> Option<i32> {
    std::fs::read_to_string(Config::pid_path())
        .ok()?
        .trim()
        .parse()
        .ok()
}

fn is_daemon_running() -> bool {
    match read_pid() {
        // Check if process is alive
        Some(pid) => unsafe { libc::kill(pid, 0) == 0 },
        None => false,
    }
}
