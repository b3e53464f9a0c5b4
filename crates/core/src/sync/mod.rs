//! Calendar synchronization: reconciliation, propagation, channels, ingress

pub mod channels;
pub mod ingress;
pub mod locks;
pub mod ports;
pub mod propagator;
pub mod reconciler;
pub mod retry;
pub mod service;

pub use channels::{ChannelLifecycleManager, ChannelRegistration, UnregisterReport};
pub use ingress::WebhookIngress;
pub use locks::TenantLocks;
pub use propagator::{OutboundPropagator, PropagationOutcome};
pub use reconciler::Reconciler;
pub use retry::RetryPolicy;
pub use service::{BatchSyncReport, CalendarSyncService, TenantSyncReport};
