//! Minimal Kubernetes API client for infra-bot.
//!
//! Speaks plain JSON over HTTPS with the pod's service account, or over
//! HTTP to an explicit API URL (e.g. `kubectl proxy`) for local runs.

pub mod client;
pub mod lease;

pub use client::{KubeClient, KubeConfig, KubeError};
pub use lease::KubeLeaseStore;
