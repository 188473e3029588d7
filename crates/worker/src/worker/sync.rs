//! Sync handler: tagged background-synchronization events.

use serde::{Deserialize, Serialize};

use super::Worker;

/// The only tag the worker recognizes.
pub const SYNC_DATA_TAG: &str = "sync-data";

/// Acknowledgement of a sync event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncAck {
    pub recognized: bool,
}

impl Worker {
    /// Handle a background-sync event.
    ///
    /// The "sync-data" tag is recognized but currently performs no work;
    /// data synchronization hooks attach here. Any other tag is ignored.
    pub fn handle_sync(&mut self, tag: &str) -> SyncAck {
        if tag == SYNC_DATA_TAG {
            tracing::info!("background sync triggered");
            return SyncAck { recognized: true };
        }

        tracing::debug!(tag, "ignoring unrecognized sync tag");
        SyncAck { recognized: false }
    }
}
