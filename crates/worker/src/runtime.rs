//! Task-per-event dispatch for the worker.
//!
//! One tokio task owns the `Worker`; events arrive over an mpsc channel
//! and answer through oneshot replies. Lifecycle and control events run
//! on the worker task in arrival order. Fetch interceptions are spawned
//! as their own tasks so they interleave freely: two concurrent misses
//! for the same resource both hit the network and both store, last
//! write wins.

use tokio::sync::{mpsc, oneshot};

use umbra_client::FetchRequest;

use crate::error::WorkerError;
use crate::worker::{
    ActivateReport, InstallReport, InterceptedResponse, MessageAck, SyncAck, Worker, WorkerStatus, fetch,
};

enum Command {
    Install(oneshot::Sender<Result<InstallReport, WorkerError>>),
    Activate(oneshot::Sender<Result<ActivateReport, WorkerError>>),
    Fetch(FetchRequest, oneshot::Sender<Result<InterceptedResponse, WorkerError>>),
    Message(Option<String>, oneshot::Sender<MessageAck>),
    Sync(String, oneshot::Sender<SyncAck>),
    ClientConnected(String, oneshot::Sender<bool>),
    State(oneshot::Sender<WorkerStatus>),
}

/// Handle for delivering events to a running worker.
#[derive(Clone)]
pub struct WorkerHandle {
    tx: mpsc::Sender<Command>,
}

/// Spawn the worker task and return a handle to it.
///
/// The task lives until every handle is dropped.
pub fn spawn(worker: Worker) -> WorkerHandle {
    let (tx, rx) = mpsc::channel(64);
    tokio::spawn(run(worker, rx));
    WorkerHandle { tx }
}

async fn run(mut worker: Worker, mut rx: mpsc::Receiver<Command>) {
    while let Some(command) = rx.recv().await {
        match command {
            Command::Install(reply) => {
                let _ = reply.send(worker.handle_install().await);
            }
            Command::Activate(reply) => {
                let _ = reply.send(worker.handle_activate().await);
            }
            Command::Fetch(request, reply) => {
                let store = worker.store.clone();
                let network = worker.network.clone();
                let cache_name = worker.config.cache_name.clone();
                tokio::spawn(async move {
                    let _ = reply.send(fetch::intercept(store, network, cache_name, request).await);
                });
            }
            Command::Message(action, reply) => {
                let _ = reply.send(worker.handle_message(action.as_deref()));
            }
            Command::Sync(tag, reply) => {
                let _ = reply.send(worker.handle_sync(&tag));
            }
            Command::ClientConnected(id, reply) => {
                let _ = reply.send(worker.handle_client_connected(&id));
            }
            Command::State(reply) => {
                let _ = reply.send(worker.status());
            }
        }
    }
}

impl WorkerHandle {
    async fn send<T>(&self, command: Command, rx: oneshot::Receiver<T>) -> Result<T, WorkerError> {
        self.tx.send(command).await.map_err(|_| WorkerError::Terminated)?;
        rx.await.map_err(|_| WorkerError::Terminated)
    }

    pub async fn install(&self) -> Result<InstallReport, WorkerError> {
        let (tx, rx) = oneshot::channel();
        self.send(Command::Install(tx), rx).await?
    }

    pub async fn activate(&self) -> Result<ActivateReport, WorkerError> {
        let (tx, rx) = oneshot::channel();
        self.send(Command::Activate(tx), rx).await?
    }

    pub async fn fetch(&self, request: FetchRequest) -> Result<InterceptedResponse, WorkerError> {
        let (tx, rx) = oneshot::channel();
        self.send(Command::Fetch(request, tx), rx).await?
    }

    pub async fn post_message(&self, action: Option<String>) -> Result<MessageAck, WorkerError> {
        let (tx, rx) = oneshot::channel();
        self.send(Command::Message(action, tx), rx).await
    }

    pub async fn sync(&self, tag: String) -> Result<SyncAck, WorkerError> {
        let (tx, rx) = oneshot::channel();
        self.send(Command::Sync(tag, tx), rx).await
    }

    pub async fn client_connected(&self, id: String) -> Result<bool, WorkerError> {
        let (tx, rx) = oneshot::channel();
        self.send(Command::ClientConnected(id, tx), rx).await
    }

    pub async fn state(&self) -> Result<WorkerStatus, WorkerError> {
        let (tx, rx) = oneshot::channel();
        self.send(Command::State(tx), rx).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lifecycle::LifecycleState;
    use crate::testing::{StubNetwork, test_config};
    use crate::worker::ResponseSource;
    use std::sync::Arc;
    use umbra_core::{CacheStore, WorkerConfig};

    fn get(url: &str) -> FetchRequest {
        FetchRequest::get(url::Url::parse(url).unwrap())
    }

    async fn spawn_worker(config: WorkerConfig, store: CacheStore) -> (WorkerHandle, Arc<StubNetwork>) {
        let network = Arc::new(StubNetwork::new());
        let worker = Worker::new(config, store, network.clone()).unwrap();
        (spawn(worker), network)
    }

    #[tokio::test]
    async fn test_full_lifecycle_scenario() {
        // the reference scenario: install, hit, populate-on-miss, cleanup
        let store = CacheStore::open_in_memory().await.unwrap();
        let (handle, network) = spawn_worker(test_config(&["/app.html", "/manifest.json"]), store.clone()).await;

        network.respond("http://origin.test/app.html", 200, b"<html>app</html>");
        network.respond("http://origin.test/manifest.json", 200, b"{}");

        let report = handle.install().await.unwrap();
        assert_eq!(report.cache_name, "v1");
        assert_eq!(report.cached, 2);

        let status = handle.state().await.unwrap();
        assert_eq!(status.state, LifecycleState::Waiting);
        assert!(status.skip_waiting_requested);

        // cached asset: served without touching the network again
        let response = handle.fetch(get("http://origin.test/app.html")).await.unwrap();
        assert_eq!(response.source, ResponseSource::Cache);
        assert_eq!(response.body, bytes::Bytes::from_static(b"<html>app</html>"));
        assert_eq!(network.calls_for("http://origin.test/app.html"), 1);

        // unknown asset: network, then opportunistically cached
        network.respond("http://origin.test/unknown.png", 200, b"png");
        let response = handle.fetch(get("http://origin.test/unknown.png")).await.unwrap();
        assert_eq!(response.source, ResponseSource::Network);

        let key = get("http://origin.test/unknown.png").cache_key();
        for _ in 0..50 {
            if store.match_entry_in("v1", &key).await.unwrap().is_some() {
                break;
            }
            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        }
        assert!(store.match_entry_in("v1", &key).await.unwrap().is_some());

        // activation with an unchanged generation deletes nothing
        handle.client_connected("page-1".into()).await.unwrap();
        let report = handle.activate().await.unwrap();
        assert!(report.deleted.is_empty());
        assert_eq!(report.claimed, 1);

        let status = handle.state().await.unwrap();
        assert_eq!(status.state, LifecycleState::Activated);
        assert_eq!(status.controlled_clients, 1);
    }

    #[tokio::test]
    async fn test_new_generation_deletes_old() {
        let store = CacheStore::open_in_memory().await.unwrap();

        // v1 deployment
        let (v1, network) = spawn_worker(test_config(&["/app.html"]), store.clone()).await;
        network.respond("http://origin.test/app.html", 200, b"v1");
        v1.install().await.unwrap();
        v1.activate().await.unwrap();

        // v2 deployment over the same store
        let config = WorkerConfig { cache_name: "v2".into(), ..test_config(&["/app.html"]) };
        let (v2, network) = spawn_worker(config, store.clone()).await;
        network.respond("http://origin.test/app.html", 200, b"v2");
        v2.install().await.unwrap();

        let report = v2.activate().await.unwrap();
        assert_eq!(report.deleted, vec!["v1".to_string()]);
        assert_eq!(store.cache_names().await.unwrap(), vec!["v2".to_string()]);
    }

    #[tokio::test]
    async fn test_concurrent_fetches_interleave() {
        let store = CacheStore::open_in_memory().await.unwrap();
        let (handle, network) = spawn_worker(test_config(&[]), store.clone()).await;
        handle.install().await.unwrap();

        for i in 0..8 {
            network.respond(&format!("http://origin.test/asset-{i}"), 200, b"data");
        }

        let mut tasks = Vec::new();
        for i in 0..8 {
            let handle = handle.clone();
            tasks.push(tokio::spawn(async move {
                handle.fetch(get(&format!("http://origin.test/asset-{i}"))).await
            }));
        }

        for task in tasks {
            let response = task.await.unwrap().unwrap();
            assert_eq!(response.status, 200);
        }
    }

    #[tokio::test]
    async fn test_fetch_failure_does_not_poison_worker() {
        let store = CacheStore::open_in_memory().await.unwrap();
        let (handle, network) = spawn_worker(test_config(&[]), store).await;
        handle.install().await.unwrap();

        assert!(handle.fetch(get("http://origin.test/offline.html")).await.is_err());

        // the worker keeps serving other events
        network.respond("http://origin.test/alive.html", 200, b"ok");
        let response = handle.fetch(get("http://origin.test/alive.html")).await.unwrap();
        assert_eq!(response.status, 200);
        assert!(handle.sync("sync-data".into()).await.unwrap().recognized);
    }

    #[tokio::test]
    async fn test_on_disk_store_roundtrip() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("cache.sqlite");

        let store = CacheStore::open(&path).await.unwrap();
        let (handle, network) = spawn_worker(test_config(&["/app.html"]), store).await;
        network.respond("http://origin.test/app.html", 200, b"<html>");
        handle.install().await.unwrap();

        // a fresh handle over the same file sees the populated generation
        let reopened = CacheStore::open(&path).await.unwrap();
        assert_eq!(reopened.count_entries("v1").await.unwrap(), 1);
    }
}
