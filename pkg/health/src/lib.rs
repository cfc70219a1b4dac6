//! Cluster health collection: node/pod summaries, Prometheus I/O rates,
//! per-service status and logs, and network reachability checks.

pub mod netcheck;
pub mod prometheus;
pub mod quantity;
pub mod services;
pub mod snapshot;

pub use snapshot::HealthCollector;
pub use netcheck::NetChecker;
pub use prometheus::PrometheusClient;
pub use services::ServiceMap;
