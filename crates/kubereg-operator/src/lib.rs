//! Kubereg Operator
//!
//! Watches cluster nodes and NodePort services, feeds them through the
//! `kubereg-core` bookkeeper and writes the resulting registrations to etcd.

pub mod api;
pub mod config;
pub mod lister;
pub mod observability;
pub mod registry;
pub mod ticker;
pub mod version;
pub mod watch;
