//! Message handler: control-channel instructions from the page.
//!
//! The only recognized action is "skipWaiting"; anything else is
//! ignored silently.

use serde::{Deserialize, Serialize};

use super::Worker;

/// The action that forces a waiting worker toward activation.
pub const SKIP_WAITING_ACTION: &str = "skipWaiting";

/// Acknowledgement of a control message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageAck {
    pub recognized: bool,
    pub skip_waiting_requested: bool,
}

impl Worker {
    /// Handle a control message carrying an optional action.
    pub fn handle_message(&mut self, action: Option<&str>) -> MessageAck {
        match action {
            Some(SKIP_WAITING_ACTION) => {
                if self.lifecycle.request_skip_waiting() {
                    tracing::info!("skip waiting requested via message");
                }
                MessageAck { recognized: true, skip_waiting_requested: self.lifecycle.skip_waiting_requested() }
            }
            other => {
                tracing::debug!(action = ?other, "ignoring unrecognized message");
                MessageAck { recognized: false, skip_waiting_requested: self.lifecycle.skip_waiting_requested() }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::testing::{test_config, worker_with_network};

    #[tokio::test]
    async fn test_skip_waiting_recognized() {
        let (worker, _network) = worker_with_network(test_config(&[])).await;
        let mut worker = worker.unwrap();
        worker.handle_install().await.unwrap();

        let ack = worker.handle_message(Some("skipWaiting"));
        assert!(ack.recognized);
        assert!(ack.skip_waiting_requested);
    }

    #[tokio::test]
    async fn test_unknown_action_ignored() {
        let (worker, _network) = worker_with_network(test_config(&[])).await;
        let mut worker = worker.unwrap();

        let ack = worker.handle_message(Some("selfDestruct"));
        assert!(!ack.recognized);
    }

    #[tokio::test]
    async fn test_missing_action_ignored() {
        let (worker, _network) = worker_with_network(test_config(&[])).await;
        let mut worker = worker.unwrap();

        let ack = worker.handle_message(None);
        assert!(!ack.recognized);
        assert!(!ack.skip_waiting_requested);
    }
}
