//! Kubereg Core
//!
//! Reconciliation bookkeeper that keeps a service registry consistent with
//! cluster membership: every ready node is registered for every known
//! service, and nothing else is.
//!
//! ## Architecture
//!
//! ```text
//! node/service watchers, sync ticker
//!        ↓  (unbounded, FIFO)
//!   run_bookkeeper ── Bookkeeper ── StateStore
//!        ↓  (bounded, FIFO)
//!   registry writer
//! ```
//!
//! All state lives in one [`Bookkeeper`] driven by a single task, so the store
//! needs no locks.

pub mod bookkeeper;
pub mod engine;
pub mod error;
pub mod events;
pub mod lister;
pub mod metrics;
pub mod model;
pub mod readiness;
pub mod store;
pub mod worker;

pub use bookkeeper::Bookkeeper;
pub use engine::CommandSink;
pub use error::BookkeeperError;
pub use lister::NodeLister;
pub use model::{
    KubeWork, NodeAddress, NodeCondition, NodeSnapshot, RegistrationId, RegistryAction,
    RegistryCommand, ServiceDefinition, ServicePort, WorkKind,
};
pub use readiness::{ReadinessCheck, ReadyCondition};
pub use store::{StateStore, TrackedNode};
pub use worker::run_bookkeeper;
