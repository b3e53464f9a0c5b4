//! Domain types and models

pub mod appointment;
pub mod channel;
pub mod ids;
pub mod remote;
pub mod sync;
pub mod tenant;

pub use appointment::{Appointment, AppointmentDraft, Provenance, WriteOrigin};
pub use channel::SyncChannel;
pub use ids::{AppointmentId, TenantId};
pub use remote::{ChangeSet, ChannelDescriptor, EventTime, RemoteEvent, RemoteEventStatus};
pub use sync::{
    IngressOutcome, ReconcileJob, ReconcileOutcome, ReconcileSummary, RenewalReport,
    ResourceState, SyncMode, TenantSyncFailure, WebhookNotification,
};
pub use tenant::Tenant;
