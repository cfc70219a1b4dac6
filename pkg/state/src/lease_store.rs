use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::debug;

use pkg_constants::state::LEASE_KEY_PREFIX;
use pkg_types::lease::Lease;

use crate::client::StateStore;

#[derive(Debug, thiserror::Error)]
pub enum LeaseError {
    /// A conditional write lost against a concurrent writer.
    #[error("lease {0} was modified concurrently")]
    Conflict(String),

    #[error("lease {0} not found")]
    NotFound(String),

    #[error("lease {name} is held by {holder}")]
    NotHolder { name: String, holder: String },

    #[error("lease store error: {0}")]
    Store(#[from] anyhow::Error),
}

/// A store offering the conditional writes a lease needs.
///
/// `create` fails with [`LeaseError::Conflict`] if the lease already
/// exists; `replace` fails with [`LeaseError::Conflict`] if the stored
/// revision differs from `lease.revision`. Both return the lease as stored,
/// carrying its new revision.
#[async_trait]
pub trait LeaseStore: Send + Sync {
    async fn get(&self, name: &str) -> Result<Option<Lease>, LeaseError>;
    async fn create(&self, lease: &Lease) -> Result<Lease, LeaseError>;
    async fn replace(&self, lease: &Lease) -> Result<Lease, LeaseError>;
    /// Short backend name for logs.
    fn backend(&self) -> &'static str;
}

fn next_revision(current: Option<&str>) -> String {
    let n = current.and_then(|r| r.parse::<u64>().ok()).unwrap_or(0);
    (n + 1).to_string()
}

// --- In-memory ---

/// Process-local lease store. Only coordinates tasks within one process.
#[derive(Clone, Default)]
pub struct MemoryLeaseStore {
    leases: Arc<Mutex<HashMap<String, Lease>>>,
}

impl MemoryLeaseStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl LeaseStore for MemoryLeaseStore {
    async fn get(&self, name: &str) -> Result<Option<Lease>, LeaseError> {
        Ok(self.leases.lock().await.get(name).cloned())
    }

    async fn create(&self, lease: &Lease) -> Result<Lease, LeaseError> {
        let mut leases = self.leases.lock().await;
        if leases.contains_key(&lease.name) {
            return Err(LeaseError::Conflict(lease.name.clone()));
        }
        let mut stored = lease.clone();
        stored.revision = Some(next_revision(None));
        leases.insert(stored.name.clone(), stored.clone());
        Ok(stored)
    }

    async fn replace(&self, lease: &Lease) -> Result<Lease, LeaseError> {
        let mut leases = self.leases.lock().await;
        let current = leases
            .get(&lease.name)
            .ok_or_else(|| LeaseError::NotFound(lease.name.clone()))?;
        if current.revision != lease.revision {
            return Err(LeaseError::Conflict(lease.name.clone()));
        }
        let mut stored = lease.clone();
        stored.revision = Some(next_revision(current.revision.as_deref()));
        leases.insert(stored.name.clone(), stored.clone());
        Ok(stored)
    }

    fn backend(&self) -> &'static str {
        "memory"
    }
}

// --- SlateDB ---

/// Lease store persisted in SlateDB under `/registry/leases/<name>`.
///
/// SlateDB has no compare-and-swap, so read-check-write sequences are
/// serialized by a process-wide mutex. A SlateDB directory can only be
/// opened by one process, which makes that mutex sufficient.
#[derive(Clone)]
pub struct SlateLeaseStore {
    store: StateStore,
    write_lock: Arc<Mutex<()>>,
}

impl SlateLeaseStore {
    pub fn new(store: StateStore) -> Self {
        Self {
            store,
            write_lock: Arc::new(Mutex::new(())),
        }
    }

    fn key(name: &str) -> String {
        format!("{}{}", LEASE_KEY_PREFIX, name)
    }
}

#[async_trait]
impl LeaseStore for SlateLeaseStore {
    async fn get(&self, name: &str) -> Result<Option<Lease>, LeaseError> {
        Ok(self.store.get_json(&Self::key(name)).await?)
    }

    async fn create(&self, lease: &Lease) -> Result<Lease, LeaseError> {
        let _guard = self.write_lock.lock().await;
        let key = Self::key(&lease.name);
        if self.store.get_json::<Lease>(&key).await?.is_some() {
            return Err(LeaseError::Conflict(lease.name.clone()));
        }
        let mut stored = lease.clone();
        stored.revision = Some(next_revision(None));
        self.store.put_json(&key, &stored).await?;
        debug!("Created lease {} in SlateDB", lease.name);
        Ok(stored)
    }

    async fn replace(&self, lease: &Lease) -> Result<Lease, LeaseError> {
        let _guard = self.write_lock.lock().await;
        let key = Self::key(&lease.name);
        let current: Lease = self
            .store
            .get_json(&key)
            .await?
            .ok_or_else(|| LeaseError::NotFound(lease.name.clone()))?;
        if current.revision != lease.revision {
            return Err(LeaseError::Conflict(lease.name.clone()));
        }
        let mut stored = lease.clone();
        stored.revision = Some(next_revision(current.revision.as_deref()));
        self.store.put_json(&key, &stored).await?;
        Ok(stored)
    }

    fn backend(&self) -> &'static str {
        "slatedb"
    }
}
