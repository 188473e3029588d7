//! Activate handler: garbage-collect stale generations and claim clients.
//!
//! Deleting a superseded generation is irreversible. Cleanup is
//! best-effort: a failed deletion is logged and skipped, and never
//! blocks claiming clients.

use serde::{Deserialize, Serialize};

use super::Worker;
use crate::error::WorkerError;

/// Outcome of a successful activation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActivateReport {
    /// Stale generations deleted during cleanup.
    pub deleted: Vec<String>,
    /// Clients newly taken control of.
    pub claimed: usize,
}

impl Worker {
    /// Delete every generation except the current one, then take control
    /// of all connected clients without waiting for them to reload.
    pub async fn handle_activate(&mut self) -> Result<ActivateReport, WorkerError> {
        self.lifecycle.activating()?;

        let current = self.config.cache_name.as_str();
        let mut deleted = Vec::new();

        for name in self.store.cache_names().await? {
            if name == current {
                continue;
            }
            match self.store.delete_cache(&name).await {
                Ok(true) => {
                    tracing::info!(cache = %name, "deleted stale generation");
                    deleted.push(name);
                }
                Ok(false) => {}
                Err(e) => {
                    tracing::warn!(cache = %name, error = %e, "failed to delete stale generation");
                }
            }
        }

        let claimed = self.clients.claim();
        self.lifecycle.activated()?;

        tracing::info!(cache = %current, claimed, deleted = deleted.len(), "worker activated");

        Ok(ActivateReport { deleted, claimed })
    }
}

#[cfg(test)]
mod tests {
    use crate::lifecycle::LifecycleState;
    use crate::testing::{test_config, worker_with_network};
    use umbra_core::CacheEntry;

    #[tokio::test]
    async fn test_activate_deletes_stale_generations() {
        let config = test_config(&[]);
        let (worker, _network) = worker_with_network(config).await;
        let mut worker = worker.unwrap();

        // leftovers from older deployments
        worker.store.create_cache("v0").await.unwrap();
        let entry = CacheEntry::new("GET", "http://origin.test/old.js", 200, None, b"old".to_vec());
        worker.store.put_entry("v0", &entry).await.unwrap();

        worker.handle_install().await.unwrap();
        let report = worker.handle_activate().await.unwrap();

        assert_eq!(report.deleted, vec!["v0".to_string()]);
        assert_eq!(worker.store.cache_names().await.unwrap(), vec!["v1".to_string()]);
        assert_eq!(worker.state(), LifecycleState::Activated);
    }

    #[tokio::test]
    async fn test_activate_keeps_current_generation() {
        let config = test_config(&["app.html"]);
        let (worker, network) = worker_with_network(config).await;
        let mut worker = worker.unwrap();

        network.respond("http://origin.test/app.html", 200, b"<html>");
        worker.handle_install().await.unwrap();

        let report = worker.handle_activate().await.unwrap();
        assert!(report.deleted.is_empty());
        assert_eq!(worker.store.count_entries("v1").await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_activate_claims_connected_clients() {
        let config = test_config(&[]);
        let (worker, _network) = worker_with_network(config).await;
        let mut worker = worker.unwrap();

        worker.handle_client_connected("page-1");
        worker.handle_client_connected("page-2");
        worker.handle_install().await.unwrap();

        let report = worker.handle_activate().await.unwrap();
        assert_eq!(report.claimed, 2);
        assert!(worker.clients.is_controlled("page-1"));
    }

    #[tokio::test]
    async fn test_activate_before_install_rejected() {
        let config = test_config(&[]);
        let (worker, _network) = worker_with_network(config).await;
        let mut worker = worker.unwrap();

        assert!(worker.handle_activate().await.is_err());
        assert_eq!(worker.state(), LifecycleState::Installing);
    }
}
