//! Reconciliation, webhook and renewal bookkeeping types

use std::fmt;

use serde::{Deserialize, Serialize};

use super::ids::TenantId;
use crate::impl_str_enum;

/// Counters produced by one reconciliation pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconcileSummary {
    pub created: usize,
    pub updated: usize,
    pub removed: usize,
    /// Events ignored as orphans (marker without a matching local appointment).
    pub skipped: usize,
}

impl ReconcileSummary {
    pub const fn total_changes(&self) -> usize {
        self.created + self.updated + self.removed
    }
}

impl fmt::Display for ReconcileSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} created, {} updated, {} removed, {} skipped",
            self.created, self.updated, self.removed, self.skipped
        )
    }
}

/// Outcome of reconciling one tenant.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconcileOutcome {
    pub next_cursor: Option<String>,
    pub summary: ReconcileSummary,
    /// True when an expired cursor forced a fallback to a full pull.
    pub full_resync: bool,
}

/// Whether a sync pass should honour the stored cursor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SyncMode {
    #[default]
    Incremental,
    Full,
}

/// Unit of work placed on the reconciliation queue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconcileJob {
    pub tenant_id: TenantId,
    /// Cursor snapshot taken when the job was enqueued.
    pub cursor: Option<String>,
    /// Channel whose notification triggered the job, if any.
    pub channel_id: Option<String>,
}

/// `X-Goog-Resource-State` values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceState {
    /// Handshake sent right after channel creation.
    Sync,
    /// The watched collection changed.
    Exists,
    /// The watched resource was deleted.
    NotExists,
}

impl_str_enum!(ResourceState {
    Sync => "sync",
    Exists => "exists",
    NotExists => "not_exists",
});

/// Parsed push notification headers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WebhookNotification {
    pub channel_id: String,
    pub resource_id: Option<String>,
    /// Raw state header; unknown values are kept verbatim for logging.
    pub resource_state: String,
    pub channel_token: Option<String>,
    pub message_number: Option<u64>,
}

impl WebhookNotification {
    pub fn state(&self) -> Option<ResourceState> {
        self.resource_state.parse().ok()
    }
}

/// What the ingress did with a notification. Every variant is acknowledged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IngressOutcome {
    Handshake,
    Enqueued { tenant_id: TenantId },
    UnknownChannel,
    Rejected { reason: &'static str },
    Ignored,
}

impl IngressOutcome {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Handshake => "handshake",
            Self::Enqueued { .. } => "enqueued",
            Self::UnknownChannel => "unknown_channel",
            Self::Rejected { .. } => "rejected",
            Self::Ignored => "ignored",
        }
    }
}

/// A tenant that failed inside a batch sync or unregistration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TenantSyncFailure {
    pub tenant_id: TenantId,
    pub error: String,
}

/// Result of a channel renewal sweep.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RenewalReport {
    pub renewed: usize,
    pub failed: Vec<String>,
}
