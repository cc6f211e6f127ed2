//! Mirroring of remote content into the object store
//!
//! Two entry points share the same fetch → digest → compare → put step:
//! - [`DirectorySync`] mirrors every file of an HTML directory listing and
//!   removes store keys whose file disappeared upstream.
//! - [`ResourcePublisher`] mirrors a single JSON resource in canonical form.
//!
//! Every call runs sequentially on the caller's task. Concurrent runs
//! against the same prefix are not coordinated: HEAD-then-PUT and DELETE
//! are independent calls, so the last writer wins.

mod directory;
mod resource;

pub use directory::{plan_deletions, DirectorySync, SyncResult};
pub use resource::{PublishResult, ResourcePublisher};

use serde::{Deserialize, Serialize};

/// Step of a sync run an item failed in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncStage {
    Fetch,
    Put,
    Delete,
}

/// What happened to one key during a run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ItemStatus {
    Uploaded { digest: String },
    Skipped,
    Deleted,
    Failed {
        stage: SyncStage,
        kind: String,
        reason: String,
    },
}

/// Per-key record collected into a [`SyncResult`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemOutcome {
    pub key: String,
    #[serde(flatten)]
    pub status: ItemStatus,
}

impl ItemOutcome {
    pub fn is_failure(&self) -> bool {
        matches!(self.status, ItemStatus::Failed { .. })
    }
}
