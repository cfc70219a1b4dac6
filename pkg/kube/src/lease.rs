use async_trait::async_trait;

use pkg_state::lease_store::{LeaseError, LeaseStore};
use pkg_types::kube::KubeLease;
use pkg_types::lease::Lease;

use crate::client::{KubeClient, KubeError};

/// Lease store backed by `coordination.k8s.io/v1` Lease objects.
///
/// The API server provides the conditional writes: a PUT whose
/// `resourceVersion` is stale, or a POST for a name that exists, fails
/// with 409.
#[derive(Clone)]
pub struct KubeLeaseStore {
    client: KubeClient,
    default_duration_secs: u64,
}

impl KubeLeaseStore {
    pub fn new(client: KubeClient, default_duration_secs: u64) -> Self {
        Self {
            client,
            default_duration_secs,
        }
    }
}

fn to_lease_error(name: &str, err: KubeError) -> LeaseError {
    match err {
        KubeError::Conflict(_) => LeaseError::Conflict(name.to_string()),
        KubeError::NotFound(_) => LeaseError::NotFound(name.to_string()),
        other => LeaseError::Store(anyhow::Error::new(other)),
    }
}

#[async_trait]
impl LeaseStore for KubeLeaseStore {
    async fn get(&self, name: &str) -> Result<Option<Lease>, LeaseError> {
        match self.client.get_lease(name).await {
            Ok(lease) => Ok(Some(lease.into_lease(self.default_duration_secs))),
            Err(KubeError::NotFound(_)) => Ok(None),
            Err(e) => Err(to_lease_error(name, e)),
        }
    }

    async fn create(&self, lease: &Lease) -> Result<Lease, LeaseError> {
        let mut body = KubeLease::from_lease(lease, self.client.namespace());
        body.metadata.resource_version = None;
        self.client
            .create_lease(&body)
            .await
            .map(|stored| stored.into_lease(self.default_duration_secs))
            .map_err(|e| to_lease_error(&lease.name, e))
    }

    async fn replace(&self, lease: &Lease) -> Result<Lease, LeaseError> {
        let body = KubeLease::from_lease(lease, self.client.namespace());
        self.client
            .replace_lease(&body)
            .await
            .map(|stored| stored.into_lease(self.default_duration_secs))
            .map_err(|e| to_lease_error(&lease.name, e))
    }

    fn backend(&self) -> &'static str {
        "kubernetes"
    }
}
