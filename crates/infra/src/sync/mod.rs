//! Background reconciliation plumbing: the in-process job queue fed by the
//! webhook ingress and the worker that drains it.

pub mod job_queue;

pub use job_queue::{ChannelJobQueue, JobReceiver, ReconcileWorker, ReconcileWorkerConfig};
