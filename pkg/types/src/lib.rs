//! Shared data types for infra-bot: config files, leases, alerts,
//! health snapshots and the subset of Kubernetes objects the bot reads.

pub mod alert;
pub mod config;
pub mod health;
pub mod kube;
pub mod lease;
pub mod validate;
