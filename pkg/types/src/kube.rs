//! The subset of Kubernetes API objects the bot reads and writes.
//!
//! Every field is optional or defaulted so that objects from any cluster
//! version deserialize; unknown fields are ignored.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::lease::Lease;

// --- Common ---

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectMeta {
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub labels: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub annotations: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource_version: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct List<T> {
    #[serde(default = "Vec::new")]
    pub items: Vec<T>,
}

/// `type`/`status` pair used by node and pod conditions.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Condition {
    #[serde(rename = "type", default)]
    pub type_: String,
    #[serde(default)]
    pub status: String,
}

fn is_ready(conditions: &[Condition]) -> bool {
    conditions
        .iter()
        .any(|c| c.type_ == "Ready" && c.status == "True")
}

// --- Nodes ---

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Node {
    #[serde(default)]
    pub metadata: ObjectMeta,
    #[serde(default)]
    pub status: NodeStatus,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NodeStatus {
    #[serde(default)]
    pub conditions: Vec<Condition>,
    /// Quantities such as `cpu: "4"`, `memory: "16Gi"`
    #[serde(default)]
    pub capacity: BTreeMap<String, String>,
}

impl Node {
    pub fn is_ready(&self) -> bool {
        is_ready(&self.status.conditions)
    }
}

/// `metrics.k8s.io/v1beta1` NodeMetrics.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NodeMetrics {
    #[serde(default)]
    pub metadata: ObjectMeta,
    #[serde(default)]
    pub usage: BTreeMap<String, String>,
}

// --- Pods ---

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Pod {
    #[serde(default)]
    pub metadata: ObjectMeta,
    #[serde(default)]
    pub spec: PodSpec,
    #[serde(default)]
    pub status: PodStatus,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PodSpec {
    #[serde(default)]
    pub node_name: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PodStatus {
    #[serde(default)]
    pub phase: Option<String>,
    #[serde(default)]
    pub conditions: Vec<Condition>,
    #[serde(default)]
    pub container_statuses: Vec<ContainerStatus>,
    #[serde(default)]
    pub start_time: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContainerStatus {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub ready: bool,
    #[serde(default)]
    pub restart_count: i32,
    #[serde(default)]
    pub state: Option<ContainerState>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ContainerState {
    #[serde(default)]
    pub waiting: Option<ContainerStateWaiting>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ContainerStateWaiting {
    #[serde(default)]
    pub reason: Option<String>,
}

impl Pod {
    pub fn phase(&self) -> &str {
        self.status.phase.as_deref().unwrap_or("Unknown")
    }

    pub fn is_ready(&self) -> bool {
        is_ready(&self.status.conditions)
    }

    pub fn restart_count(&self) -> i32 {
        self.status
            .container_statuses
            .iter()
            .map(|c| c.restart_count)
            .sum()
    }

    /// Reasons of containers currently stuck in a waiting state.
    pub fn waiting_reasons(&self) -> impl Iterator<Item = &str> {
        self.status
            .container_statuses
            .iter()
            .filter_map(|c| c.state.as_ref()?.waiting.as_ref()?.reason.as_deref())
    }
}

// --- Deployments / Services / Endpoints ---

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Deployment {
    #[serde(default)]
    pub metadata: ObjectMeta,
    #[serde(default)]
    pub spec: DeploymentSpec,
    #[serde(default)]
    pub status: DeploymentStatus,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DeploymentSpec {
    #[serde(default)]
    pub replicas: Option<i32>,
    #[serde(default)]
    pub selector: LabelSelector,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LabelSelector {
    #[serde(default)]
    pub match_labels: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeploymentStatus {
    #[serde(default)]
    pub ready_replicas: Option<i32>,
}

impl Deployment {
    /// Label selector string for the deployment's pods, falling back to
    /// `app=<name>` when the deployment declares no match labels.
    pub fn pod_selector(&self) -> String {
        if self.spec.selector.match_labels.is_empty() {
            format!("app={}", self.metadata.name)
        } else {
            self.spec
                .selector
                .match_labels
                .iter()
                .map(|(k, v)| format!("{}={}", k, v))
                .collect::<Vec<_>>()
                .join(",")
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Service {
    #[serde(default)]
    pub metadata: ObjectMeta,
    #[serde(default)]
    pub spec: ServiceSpec,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ServiceSpec {
    #[serde(default)]
    pub selector: BTreeMap<String, String>,
}

impl Service {
    /// A service selects the deployment when its (non-empty) selector is a
    /// subset of the deployment's pod labels.
    pub fn selects(&self, pod_labels: &BTreeMap<String, String>) -> bool {
        !self.spec.selector.is_empty()
            && self
                .spec
                .selector
                .iter()
                .all(|(k, v)| pod_labels.get(k) == Some(v))
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Endpoints {
    #[serde(default)]
    pub metadata: ObjectMeta,
    #[serde(default)]
    pub subsets: Vec<EndpointSubset>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EndpointSubset {
    #[serde(default)]
    pub addresses: Vec<EndpointAddress>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EndpointAddress {
    #[serde(default)]
    pub ip: String,
}

impl Endpoints {
    pub fn address_count(&self) -> usize {
        self.subsets.iter().map(|s| s.addresses.len()).sum()
    }
}

// --- Events ---

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    #[serde(default)]
    pub metadata: ObjectMeta,
    #[serde(default)]
    pub reason: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub involved_object: ObjectReference,
    #[serde(default)]
    pub last_timestamp: Option<DateTime<Utc>>,
    #[serde(default)]
    pub event_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub first_timestamp: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ObjectReference {
    #[serde(default)]
    pub kind: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
}

impl Event {
    /// Most specific timestamp the event carries.
    pub fn timestamp(&self) -> Option<DateTime<Utc>> {
        self.last_timestamp
            .or(self.event_time)
            .or(self.first_timestamp)
    }

    /// `Kind/name`, or whichever half is known.
    pub fn target(&self) -> String {
        match (&self.involved_object.kind, &self.involved_object.name) {
            (Some(kind), Some(name)) => format!("{}/{}", kind, name),
            (Some(kind), None) => kind.clone(),
            (None, Some(name)) => name.clone(),
            (None, None) => "unknown".to_string(),
        }
    }
}

// --- coordination.k8s.io/v1 Lease ---

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KubeLease {
    #[serde(default = "lease_api_version")]
    pub api_version: String,
    #[serde(default = "lease_kind")]
    pub kind: String,
    #[serde(default)]
    pub metadata: ObjectMeta,
    #[serde(default)]
    pub spec: KubeLeaseSpec,
}

fn lease_api_version() -> String {
    "coordination.k8s.io/v1".to_string()
}

fn lease_kind() -> String {
    "Lease".to_string()
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KubeLeaseSpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub holder_identity: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lease_duration_seconds: Option<i64>,
    #[serde(default, with = "micro_time", skip_serializing_if = "Option::is_none")]
    pub acquire_time: Option<DateTime<Utc>>,
    #[serde(default, with = "micro_time", skip_serializing_if = "Option::is_none")]
    pub renew_time: Option<DateTime<Utc>>,
}

impl KubeLease {
    pub fn from_lease(lease: &Lease, namespace: &str) -> Self {
        Self {
            api_version: lease_api_version(),
            kind: lease_kind(),
            metadata: ObjectMeta {
                name: lease.name.clone(),
                namespace: Some(namespace.to_string()),
                labels: BTreeMap::new(),
                annotations: lease.annotations.clone(),
                resource_version: lease.revision.clone(),
            },
            spec: KubeLeaseSpec {
                holder_identity: lease.holder_identity.clone(),
                lease_duration_seconds: Some(
                    i32::try_from(lease.lease_duration_seconds)
                        .map(i64::from)
                        .unwrap_or(i64::from(i32::MAX)),
                ),
                acquire_time: lease.acquire_time,
                renew_time: lease.renew_time,
            },
        }
    }

    /// Convert to the bot's lease view; a missing duration falls back to
    /// `default_duration_secs`.
    pub fn into_lease(self, default_duration_secs: u64) -> Lease {
        Lease {
            name: self.metadata.name,
            holder_identity: self.spec.holder_identity,
            lease_duration_seconds: self
                .spec
                .lease_duration_seconds
                .and_then(|d| u64::try_from(d).ok())
                .unwrap_or(default_duration_secs),
            acquire_time: self.spec.acquire_time,
            renew_time: self.spec.renew_time,
            annotations: self.metadata.annotations,
            revision: self.metadata.resource_version,
        }
    }
}

/// Kubernetes `MicroTime`: RFC 3339 with exactly six fractional digits.
mod micro_time {
    use chrono::{DateTime, SecondsFormat, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(
        value: &Option<DateTime<Utc>>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        match value {
            Some(dt) => serializer.serialize_str(&dt.to_rfc3339_opts(SecondsFormat::Micros, true)),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<DateTime<Utc>>, D::Error> {
        let raw: Option<String> = Option::deserialize(deserializer)?;
        match raw {
            Some(s) => DateTime::parse_from_rfc3339(&s)
                .map(|dt| Some(dt.with_timezone(&Utc)))
                .map_err(serde::de::Error::custom),
            None => Ok(None),
        }
    }
}
