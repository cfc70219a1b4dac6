//! Shared state for infra-bot: the lease stores that elect the report
//! sender, and the in-memory active-alert cache.

pub mod alerts;
pub mod client;
pub mod leader;
pub mod lease_store;
