//! Line-oriented prediction server.
//!
//! Usage: `hotswap-serve [config.json]`
//!
//! Reads one JSON object of feature values per line on stdin and writes one
//! JSON response per line on stdout. The line `info` prints model information.

use std::process::ExitCode;
use std::sync::Arc;

use tokio::io::{AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use hotswap::{FileRegistry, JsonArtifactLoader, PredictionServer, ServingApi, ServingConfig};

fn respond(api: &ServingApi, line: &str) -> String {
    let body = if line == "info" {
        serde_json::to_string(&api.model_info())
    } else {
        match api.predict_json(line) {
            Ok(response) => serde_json::to_string(&response),
            Err(err) => Ok(serde_json::json!({ "status": "invalid", "error": err.to_string() }).to_string()),
        }
    };
    body.unwrap_or_else(|err| serde_json::json!({ "status": "error", "error": err.to_string() }).to_string())
}

/// Write one response line and flush it so the client sees it immediately
async fn write_line<W: AsyncWrite + Unpin>(out: &mut W, body: &str) -> std::io::Result<()> {
    out.write_all(body.as_bytes()).await?;
    out.write_all(b"\n").await?;
    out.flush().await
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let config = match std::env::args().nth(1) {
        Some(path) => ServingConfig::from_json_file(path),
        None => Ok(ServingConfig::default()),
    };
    let config = match config {
        Ok(config) => config,
        Err(err) => {
            error!(error = %err, "failed to load configuration");
            return ExitCode::FAILURE;
        }
    };

    let Some(registry_dir) = config.registry_dir.clone() else {
        error!("registry_dir must be set in the configuration");
        return ExitCode::FAILURE;
    };
    let artifact_dir = config.artifact_dir.clone().unwrap_or_else(|| registry_dir.clone());

    let server = Arc::new(PredictionServer::new(
        config,
        Arc::new(FileRegistry::new(registry_dir)),
        Arc::new(JsonArtifactLoader::new(artifact_dir)),
    ));
    server.initialize().await;
    let api = ServingApi::new(Arc::clone(&server));

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = tokio::io::stdout();

    loop {
        tokio::select! {
            line = lines.next_line() => match line {
                Ok(Some(line)) => {
                    let line = line.trim();
                    if line.is_empty() {
                        continue;
                    }
                    if let Err(err) = write_line(&mut stdout, &respond(&api, line)).await {
                        error!(error = %err, "failed to write response");
                        break;
                    }
                }
                Ok(None) => break,
                Err(err) => {
                    error!(error = %err, "failed to read request");
                    break;
                }
            },
            _ = tokio::signal::ctrl_c() => {
                info!("interrupted");
                break;
            }
        }
    }

    server.shutdown().await;
    info!(stats = %server.stats().format_stats(), "shut down");
    ExitCode::SUCCESS
}
