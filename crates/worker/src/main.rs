//! umbra worker entry point.
//!
//! Boots the worker runtime and speaks the line-delimited JSON event
//! protocol on stdio: the hosting environment writes events to stdin
//! and reads replies from stdout. Logging goes to stderr to avoid
//! interfering with the protocol stream.

use std::sync::Arc;

use anyhow::Result;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing_subscriber::EnvFilter;

use umbra_client::{FetchClient, FetchConfig, FetchRequest, Method};
use umbra_core::{CacheStore, WorkerConfig};

mod clients;
mod error;
mod events;
mod lifecycle;
mod runtime;
mod worker;

#[cfg(test)]
mod testing;

use events::{HostEvent, WorkerReply};
use runtime::WorkerHandle;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .json()
        .init();

    let config = WorkerConfig::load()?;
    let origin = url::Url::parse(&config.origin)?;

    tracing::info!(cache = %config.cache_name, origin = %origin, "starting offline cache worker");

    let store = CacheStore::open(&config.db_path).await?;
    let network = FetchClient::new(FetchConfig {
        user_agent: config.user_agent.clone(),
        max_bytes: config.max_bytes,
        timeout: config.timeout(),
        ..Default::default()
    })?;

    let worker = worker::Worker::new(config, store, Arc::new(network))?;
    let handle = runtime::spawn(worker);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = tokio::io::stdout();

    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let reply = match serde_json::from_str::<HostEvent>(line) {
            Ok(event) => dispatch(&handle, &origin, event).await,
            Err(e) => {
                tracing::debug!(error = %e, "malformed event");
                WorkerReply::Error { message: format!("malformed event: {e}") }
            }
        };

        let mut out = serde_json::to_string(&reply)?;
        out.push('\n');
        stdout.write_all(out.as_bytes()).await?;
        stdout.flush().await?;
    }

    tracing::info!("host closed stdin, shutting down");

    Ok(())
}

/// Route one host event to the worker and shape its reply.
async fn dispatch(handle: &WorkerHandle, origin: &url::Url, event: HostEvent) -> WorkerReply {
    match event {
        HostEvent::Install => match handle.install().await {
            Ok(report) => WorkerReply::Installed {
                cache_name: report.cache_name,
                cached: report.cached,
                skipped: report.skipped,
            },
            Err(e) => WorkerReply::Error { message: e.to_string() },
        },
        HostEvent::Activate => match handle.activate().await {
            Ok(report) => WorkerReply::Activated { deleted: report.deleted, claimed: report.claimed },
            Err(e) => WorkerReply::Error { message: e.to_string() },
        },
        HostEvent::Fetch { method, url } => {
            let request = match build_request(origin, &method, &url) {
                Ok(request) => request,
                Err(message) => return WorkerReply::Error { message },
            };
            match handle.fetch(request).await {
                Ok(response) => WorkerReply::FetchResult {
                    url: response.url,
                    status: response.status,
                    content_type: response.content_type,
                    source: response.source,
                    body_hex: hex::encode(&response.body),
                },
                Err(e) => WorkerReply::Error { message: e.to_string() },
            }
        }
        HostEvent::Message { data } => match handle.post_message(data.action).await {
            Ok(ack) => WorkerReply::MessageAck {
                recognized: ack.recognized,
                skip_waiting_requested: ack.skip_waiting_requested,
            },
            Err(e) => WorkerReply::Error { message: e.to_string() },
        },
        HostEvent::Sync { tag } => match handle.sync(tag).await {
            Ok(ack) => WorkerReply::SyncAck { recognized: ack.recognized },
            Err(e) => WorkerReply::Error { message: e.to_string() },
        },
        HostEvent::ClientConnected { id } => match handle.client_connected(id.clone()).await {
            Ok(registered) => WorkerReply::ClientRegistered { id, registered },
            Err(e) => WorkerReply::Error { message: e.to_string() },
        },
        HostEvent::State => match handle.state().await {
            Ok(status) => WorkerReply::State {
                state: status.state,
                skip_waiting_requested: status.skip_waiting_requested,
                known_clients: status.known_clients,
                controlled_clients: status.controlled_clients,
            },
            Err(e) => WorkerReply::Error { message: e.to_string() },
        },
    }
}

/// Build a `FetchRequest` from wire fields, resolving relative URLs
/// against the configured origin.
fn build_request(origin: &url::Url, method: &str, url: &str) -> Result<FetchRequest, String> {
    let method: Method = method.parse().map_err(|_| format!("invalid method: {method}"))?;
    let url = umbra_client::fetch::resolve_asset(origin, url).map_err(|e| e.to_string())?;
    Ok(FetchRequest::new(method, url))
}
