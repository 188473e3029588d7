//! Event handlers for the offline cache worker.
//!
//! One file per event, mirroring the events the host delivers:
//! install, activate, fetch, message, sync.

pub mod activate;
pub mod fetch;
pub mod install;
pub mod message;
pub mod sync;

pub use activate::ActivateReport;
pub use fetch::{InterceptedResponse, ResponseSource};
pub use install::InstallReport;
pub use message::MessageAck;
pub use sync::SyncAck;

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use umbra_client::{FetchRequest, FetchResponse, Network};
use umbra_core::{CacheEntry, CacheStore, WorkerConfig};

use crate::clients::ClientRegistry;
use crate::error::WorkerError;
use crate::lifecycle::{Lifecycle, LifecycleState};

/// The offline cache worker.
///
/// Owns the cache store, the network seam, the lifecycle state machine
/// and the client registry. One instance lives on the runtime task for
/// the life of the process.
pub struct Worker {
    pub(crate) config: WorkerConfig,
    pub(crate) origin: url::Url,
    pub(crate) store: CacheStore,
    pub(crate) network: Arc<dyn Network>,
    pub(crate) lifecycle: Lifecycle,
    pub(crate) clients: ClientRegistry,
}

impl Worker {
    /// Build a worker from validated configuration.
    pub fn new(config: WorkerConfig, store: CacheStore, network: Arc<dyn Network>) -> Result<Self, WorkerError> {
        let origin = url::Url::parse(&config.origin)
            .map_err(|e| umbra_core::Error::InvalidUrl(format!("origin: {}", e)))?;

        Ok(Self {
            config,
            origin,
            store,
            network,
            lifecycle: Lifecycle::new(),
            clients: ClientRegistry::new(),
        })
    }

    pub fn state(&self) -> LifecycleState {
        self.lifecycle.state()
    }

    /// Snapshot of the worker's observable state.
    pub fn status(&self) -> WorkerStatus {
        WorkerStatus {
            state: self.lifecycle.state(),
            skip_waiting_requested: self.lifecycle.skip_waiting_requested(),
            known_clients: self.clients.known_count(),
            controlled_clients: self.clients.controlled_count(),
        }
    }

    /// Record a newly connected client page.
    pub fn handle_client_connected(&mut self, id: &str) -> bool {
        let registered = self.clients.register(id);
        if registered {
            tracing::debug!(client = id, "client connected");
        }
        registered
    }
}

/// Snapshot of lifecycle and client state, reported to the host.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkerStatus {
    pub state: LifecycleState,
    pub skip_waiting_requested: bool,
    pub known_clients: usize,
    pub controlled_clients: usize,
}

/// Build a storable entry from a network response.
///
/// Headers are flattened to a JSON object of string values; headers with
/// non-UTF-8 values are dropped.
pub(crate) fn entry_from_response(request: &FetchRequest, response: &FetchResponse) -> CacheEntry {
    let mut headers = serde_json::Map::new();
    for (name, value) in response.headers.iter() {
        if let Ok(v) = value.to_str() {
            headers.insert(name.as_str().to_string(), serde_json::Value::String(v.to_string()));
        }
    }
    let headers_json = Some(serde_json::Value::Object(headers).to_string());

    CacheEntry::new(
        request.method.as_str(),
        request.url.as_str(),
        response.status.as_u16(),
        headers_json,
        response.body.to_vec(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::worker_with_network;
    use umbra_client::StatusCode;

    #[tokio::test]
    async fn test_new_rejects_bad_origin() {
        let (worker, _network) = worker_with_network(WorkerConfig { origin: "nope".into(), ..Default::default() }).await;
        assert!(worker.is_err());
    }

    #[tokio::test]
    async fn test_entry_from_response_flattens_headers() {
        let url = url::Url::parse("https://example.com/app.html").unwrap();
        let request = FetchRequest::get(url.clone());

        let mut headers = umbra_client::fetch::header::HeaderMap::new();
        headers.insert("content-type", "text/html".parse().unwrap());

        let response = FetchResponse {
            url: url.clone(),
            final_url: url,
            status: StatusCode::OK,
            content_type: Some("text/html".to_string()),
            body: bytes::Bytes::from_static(b"<html>"),
            headers,
            fetch_ms: 1,
        };

        let entry = entry_from_response(&request, &response);
        assert_eq!(entry.method, "GET");
        assert_eq!(entry.status, 200);
        assert_eq!(entry.body, b"<html>");

        let parsed: serde_json::Value = serde_json::from_str(entry.headers_json.as_deref().unwrap()).unwrap();
        assert_eq!(parsed["content-type"], "text/html");
    }
}
