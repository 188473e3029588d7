//! Line-delimited JSON event protocol between host and worker.
//!
//! The host writes one `HostEvent` per line on the worker's stdin and
//! reads one `WorkerReply` per line from its stdout. Response bodies
//! cross the wire hex-encoded so the stream stays valid JSON for any
//! payload.

use serde::{Deserialize, Serialize};

use crate::lifecycle::LifecycleState;
use crate::worker::ResponseSource;

/// An event delivered by the hosting environment.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "kebab-case")]
pub enum HostEvent {
    Install,
    Activate,
    Fetch {
        #[serde(default = "default_method")]
        method: String,
        url: String,
    },
    Message {
        #[serde(default)]
        data: MessageData,
    },
    Sync {
        tag: String,
    },
    ClientConnected {
        id: String,
    },
    State,
}

fn default_method() -> String {
    "GET".into()
}

/// Payload of a control message.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MessageData {
    #[serde(default)]
    pub action: Option<String>,
}

/// Reply written for each processed event.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "reply", rename_all = "kebab-case")]
pub enum WorkerReply {
    Installed {
        cache_name: String,
        cached: usize,
        skipped: usize,
    },
    Activated {
        deleted: Vec<String>,
        claimed: usize,
    },
    FetchResult {
        url: String,
        status: u16,
        content_type: Option<String>,
        source: ResponseSource,
        body_hex: String,
    },
    MessageAck {
        recognized: bool,
        skip_waiting_requested: bool,
    },
    SyncAck {
        recognized: bool,
    },
    ClientRegistered {
        id: String,
        registered: bool,
    },
    State {
        state: LifecycleState,
        skip_waiting_requested: bool,
        known_clients: usize,
        controlled_clients: usize,
    },
    Error {
        message: String,
    },
}
