//! Install handler: pre-populate the current cache generation.
//!
//! Population is all-or-nothing: the first asset that fails to fetch or
//! store fails the whole install. Assets already present in the current
//! generation are skipped, so re-running install against a populated
//! generation is a no-op.

use serde::{Deserialize, Serialize};

use umbra_client::{FetchRequest, fetch::resolve_asset};
use umbra_core::Error;

use super::{Worker, entry_from_response};
use crate::error::WorkerError;
use crate::lifecycle::LifecycleState;

/// Outcome of a successful install.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InstallReport {
    pub cache_name: String,
    /// Assets fetched and stored by this install.
    pub cached: usize,
    /// Assets already present and left untouched.
    pub skipped: usize,
}

impl Worker {
    /// Populate the current generation with the configured manifest.
    ///
    /// On success the worker requests immediate activation, so a waiting
    /// worker version does not linger behind an older one.
    pub async fn handle_install(&mut self) -> Result<InstallReport, WorkerError> {
        let cache_name = self.config.cache_name.clone();
        tracing::info!(cache = %cache_name, assets = self.config.precache_manifest.len(), "installing worker");

        self.store.create_cache(&cache_name).await?;

        let mut cached = 0;
        let mut skipped = 0;

        for asset in &self.config.precache_manifest {
            let url = resolve_asset(&self.origin, asset)?;
            let request = FetchRequest::get(url);

            if self.store.match_entry_in(&cache_name, &request.cache_key()).await?.is_some() {
                tracing::debug!(asset = %asset, "asset already cached");
                skipped += 1;
                continue;
            }

            let response = self
                .network
                .fetch(&request)
                .await
                .map_err(|e| Error::PrecacheFailed { asset: asset.clone(), reason: e.to_string() })?;

            if response.status.as_u16() != 200 {
                return Err(Error::PrecacheFailed {
                    asset: asset.clone(),
                    reason: format!("status {}", response.status.as_u16()),
                }
                .into());
            }

            let entry = entry_from_response(&request, &response);
            self.store.put_entry(&cache_name, &entry).await?;
            cached += 1;
        }

        if self.lifecycle.state() == LifecycleState::Installing {
            self.lifecycle.installed()?;
        }
        self.lifecycle.request_skip_waiting();

        tracing::info!(cache = %cache_name, cached, skipped, "install complete");

        Ok(InstallReport { cache_name, cached, skipped })
    }
}
