//! Fetch handler: cache-first interception with network fallback.
//!
//! Lookup searches every generation by request identity, so an entry
//! cached under an older generation keeps being served until activation
//! deletes that generation. Only 200-status GET responses are persisted,
//! and persistence never delays the caller.

use std::sync::Arc;

use bytes::Bytes;
use serde::{Deserialize, Serialize};

use umbra_client::{FetchRequest, FetchResponse, Network};
use umbra_core::{CacheEntry, CacheStore};

use super::entry_from_response;
use crate::error::WorkerError;

/// Where an intercepted response came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ResponseSource {
    Cache,
    Network,
}

/// The response handed back to the intercepted caller.
#[derive(Debug, Clone)]
pub struct InterceptedResponse {
    pub url: String,
    pub status: u16,
    pub content_type: Option<String>,
    pub body: Bytes,
    pub source: ResponseSource,
}

impl InterceptedResponse {
    fn from_entry(entry: CacheEntry) -> Self {
        let content_type = entry.header("content-type");

        Self {
            url: entry.url,
            status: entry.status,
            content_type,
            body: Bytes::from(entry.body),
            source: ResponseSource::Cache,
        }
    }

    fn from_network(response: &FetchResponse) -> Self {
        Self {
            url: response.url.to_string(),
            status: response.status.as_u16(),
            content_type: response.content_type.clone(),
            body: response.body.clone(),
            source: ResponseSource::Network,
        }
    }
}

/// Resolve one intercepted request.
///
/// Runs detached from the worker task so interceptions interleave
/// freely. The caller gets the response as soon as it is available;
/// cache population happens behind it.
pub(crate) async fn intercept(
    store: CacheStore, network: Arc<dyn Network>, cache_name: String, request: FetchRequest,
) -> Result<InterceptedResponse, WorkerError> {
    if let Some(entry) = store.match_entry(&request.cache_key()).await? {
        tracing::debug!(url = %request.url, "serving from cache");
        return Ok(InterceptedResponse::from_entry(entry));
    }

    tracing::debug!(url = %request.url, "fetching from network");
    let response = network.fetch(&request).await?;

    if !request.is_get() || response.status.as_u16() != 200 {
        return Ok(InterceptedResponse::from_network(&response));
    }

    let entry = entry_from_response(&request, &response);
    tokio::spawn(async move {
        if let Err(e) = store.put_entry(&cache_name, &entry).await {
            tracing::warn!(url = %entry.url, error = %e, "failed to store fetched response");
        }
    });

    Ok(InterceptedResponse::from_network(&response))
}
