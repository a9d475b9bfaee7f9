//! Feed monitoring core
//!
//! - [`store`] - last known state per feed and the refresh-if-changed rule
//! - [`worker`] - periodic refresh loop of one feed
//! - [`registry`] - capacity-bounded set of tracked feeds, worker supervision
//! - [`query`] - lookup entry point used by the HTTP surface
//!
//! Lock order is registry before store. No lock is held across a fetch.

pub mod query;
pub mod registry;
pub mod store;
pub mod worker;

pub use query::{FeedLookup, FeedMonitor};
pub use registry::{Admission, AdmissionError, RegistryStats, TrackedFeed, TrackingRegistry};
pub use store::{FeedState, FeedStateStore, RefreshError, RefreshOutcome};
pub use worker::{RefreshWorker, WorkerExit, WorkerSettings, WorkerState};
