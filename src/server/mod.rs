//! Batch HTTP endpoint.
//!
//! `POST /api/check` takes `{ "urls": [...] }` and streams one JSON object
//! per line as groups complete. `GET /healthz` answers with the crate version.

use std::convert::Infallible;
use std::path::PathBuf;
use std::sync::Arc;

use axum::Router;
use axum::body::{Body, Bytes};
use axum::extract::State;
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use clap::Parser;
use futures::stream::{self, StreamExt};
use serde_json::{Value, json};
use thiserror::Error;
use tokio::net::TcpListener;
use tokio::sync::mpsc;

use crate::batch::{cap_urls, spawn_batch};
use crate::config::{ConfigError, ProbeConfig};
use crate::normalize::normalize_all;
use crate::prober::{ProbeError, StoreProber};
use crate::probe::core::CheckResult;

/// Command line of the batch server.
#[derive(Debug, Parser)]
#[command(name = "store-check-server", version)]
#[command(about = "Serve the storefront account checker over HTTP", long_about = None)]
pub struct ServerArgs {
    /// Settings file (.toml or .json). `STOREFRONT_PROBE_*` variables override it.
    #[arg(value_name = "CONFIG")]
    pub config: Option<PathBuf>,
}

impl ServerArgs {
    /// Load the config file (or defaults) and apply environment overrides.
    pub fn load_config(&self) -> Result<ProbeConfig, ConfigError> {
        let config = match &self.config {
            Some(path) => ProbeConfig::load(path)?,
            None => ProbeConfig::default(),
        };
        config.with_env_overrides()
    }
}

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("failed to build prober: {0}")]
    Prober(#[from] ProbeError),
    #[error("failed to bind {address}: {source}")]
    Bind {
        address: String,
        source: std::io::Error,
    },
    #[error("server error: {0}")]
    Serve(#[from] std::io::Error),
}

/// Shared handler state.
#[derive(Clone)]
pub struct AppState {
    prober: Arc<StoreProber>,
    max_batch_urls: usize,
}

impl AppState {
    pub fn new(prober: Arc<StoreProber>) -> Self {
        let max_batch_urls = prober.config().max_batch_urls;
        Self {
            prober,
            max_batch_urls,
        }
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/check", post(check_batch))
        .route("/healthz", get(healthz))
        .with_state(state)
}

/// Bind `config.bind_address` and serve until the process is stopped.
pub async fn serve(config: ProbeConfig) -> Result<(), ServerError> {
    let address = config.bind_address.clone();
    let prober = Arc::new(StoreProber::with_config(config)?);
    let listener = TcpListener::bind(&address)
        .await
        .map_err(|source| ServerError::Bind {
            address: address.clone(),
            source,
        })?;

    log::info!("listening on http://{}", listener.local_addr()?);
    axum::serve(listener, router(AppState::new(prober))).await?;
    Ok(())
}

async fn healthz() -> String {
    format!("ok {}", crate::VERSION)
}

async fn check_batch(State(state): State<AppState>, body: Bytes) -> Response {
    let urls = match parse_urls(&body) {
        Ok(urls) => urls,
        Err(message) => return bad_request(message),
    };

    let (urls, dropped) = cap_urls(urls, state.max_batch_urls);
    let urls = normalize_all(urls);
    if urls.is_empty() {
        return bad_request("No valid URLs provided");
    }
    if dropped > 0 {
        log::info!("batch capped at {} URL(s), dropped {dropped}", state.max_batch_urls);
    }
    log::info!("checking {} store(s)", urls.len());

    let results = spawn_batch(state.prober.clone(), urls);
    (
        [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
        Body::from_stream(ndjson_stream(results)),
    )
        .into_response()
}

/// Extract the `urls` array; anything else is a client error.
fn parse_urls(body: &[u8]) -> Result<Vec<String>, &'static str> {
    let value: Value = serde_json::from_slice(body).map_err(|_| "Request body must be JSON")?;
    let entries = value
        .get("urls")
        .and_then(Value::as_array)
        .ok_or("Field 'urls' must be an array of URLs")?;
    if entries.is_empty() {
        return Err("Field 'urls' must not be empty");
    }
    Ok(entries
        .iter()
        .filter_map(Value::as_str)
        .map(str::to_owned)
        .collect())
}

fn bad_request(message: &str) -> Response {
    (StatusCode::BAD_REQUEST, axum::Json(json!({ "error": message }))).into_response()
}

fn ndjson_stream(
    rx: mpsc::Receiver<CheckResult>,
) -> impl futures::Stream<Item = Result<String, Infallible>> {
    stream::unfold(rx, |mut rx| async move {
        rx.recv().await.map(|result| (result, rx))
    })
    .filter_map(|result| async move {
        match result.to_ndjson_line() {
            Ok(line) => Some(Ok(line)),
            Err(err) => {
                log::warn!("dropping unserializable result for {}: {err}", result.url());
                None
            }
        }
    })
}
