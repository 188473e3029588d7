//! Shared test support: a scriptable in-memory network.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use bytes::Bytes;
use umbra_client::fetch::header::{HeaderMap, HeaderValue};
use umbra_client::{FetchRequest, FetchResponse, Network, StatusCode};
use umbra_core::{CacheStore, Error, WorkerConfig};

use crate::error::WorkerError;
use crate::worker::Worker;

#[derive(Clone)]
struct StubResponse {
    status: u16,
    body: Vec<u8>,
    content_type: Option<String>,
}

/// A network that answers only what tests script into it.
///
/// Unscripted URLs fail like an unreachable host, and every request is
/// counted so tests can assert the network was (not) touched.
#[derive(Default)]
pub(crate) struct StubNetwork {
    responses: Mutex<HashMap<String, StubResponse>>,
    calls: Mutex<HashMap<String, usize>>,
}

impl StubNetwork {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn respond(&self, url: &str, status: u16, body: &[u8]) {
        self.responses
            .lock()
            .unwrap()
            .insert(url.to_string(), StubResponse { status, body: body.to_vec(), content_type: None });
    }

    pub fn respond_with_type(&self, url: &str, status: u16, body: &[u8], content_type: &str) {
        self.responses.lock().unwrap().insert(
            url.to_string(),
            StubResponse { status, body: body.to_vec(), content_type: Some(content_type.to_string()) },
        );
    }

    pub fn calls_for(&self, url: &str) -> usize {
        self.calls.lock().unwrap().get(url).copied().unwrap_or(0)
    }

    pub fn total_calls(&self) -> usize {
        self.calls.lock().unwrap().values().sum()
    }
}

#[async_trait::async_trait]
impl Network for StubNetwork {
    async fn fetch(&self, request: &FetchRequest) -> Result<FetchResponse, Error> {
        let url = request.url.as_str().to_string();
        *self.calls.lock().unwrap().entry(url.clone()).or_insert(0) += 1;

        let stub = self
            .responses
            .lock()
            .unwrap()
            .get(&url)
            .cloned()
            .ok_or_else(|| Error::HttpError(format!("connection refused: {url}")))?;

        let mut headers = HeaderMap::new();
        if let Some(ct) = &stub.content_type {
            headers.insert("content-type", HeaderValue::from_str(ct).unwrap());
        }

        Ok(FetchResponse {
            url: request.url.clone(),
            final_url: request.url.clone(),
            status: StatusCode::from_u16(stub.status).unwrap(),
            content_type: stub.content_type,
            body: Bytes::from(stub.body),
            headers,
            fetch_ms: 0,
        })
    }
}

/// Config pointing at the stub origin with the given manifest.
pub(crate) fn test_config(manifest: &[&str]) -> WorkerConfig {
    WorkerConfig {
        cache_name: "v1".into(),
        origin: "http://origin.test".into(),
        precache_manifest: manifest.iter().map(|s| s.to_string()).collect(),
        ..Default::default()
    }
}

/// A worker over an in-memory store and a fresh stub network.
pub(crate) async fn worker_with_network(config: WorkerConfig) -> (Result<Worker, WorkerError>, Arc<StubNetwork>) {
    let store = CacheStore::open_in_memory().await.unwrap();
    let network = Arc::new(StubNetwork::new());
    (Worker::new(config, store, network.clone()), network)
}
