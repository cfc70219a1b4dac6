use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::{debug, info};

use pkg_types::lease::Lease;

use crate::lease_store::{LeaseError, LeaseStore};

/// Result of one acquisition attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Acquisition {
    /// We hold the lease; this is the stored copy after our write.
    Acquired(Lease),
    /// Another replica holds a lease that has not expired.
    HeldByOther { holder: String, lease: Lease },
    /// A concurrent writer won the race for this attempt.
    Contended,
}

impl Acquisition {
    pub fn is_acquired(&self) -> bool {
        matches!(self, Acquisition::Acquired(_))
    }
}

/// Distributed mutex over a single named lease.
///
/// Only one replica holds the lease at a time. A replica may take the lease
/// when none exists, when it already holds it, or when the holder stopped
/// renewing for longer than the lease duration. Every write is conditional
/// on the revision read, so racing replicas cannot both win.
#[derive(Clone)]
pub struct LeaseLock {
    store: Arc<dyn LeaseStore>,
    name: String,
    holder: String,
    duration_secs: u64,
}

impl LeaseLock {
    pub fn new(store: Arc<dyn LeaseStore>, name: &str, holder: &str, duration_secs: u64) -> Self {
        Self {
            store,
            name: name.to_string(),
            holder: holder.to_string(),
            duration_secs,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn holder(&self) -> &str {
        &self.holder
    }

    pub fn backend(&self) -> &'static str {
        self.store.backend()
    }

    /// Current lease as stored, if any.
    pub async fn current(&self) -> Result<Option<Lease>, LeaseError> {
        self.store.get(&self.name).await
    }

    /// Try to acquire or renew the lease as of `now`.
    pub async fn try_acquire(&self, now: DateTime<Utc>) -> Result<Acquisition, LeaseError> {
        match self.store.get(&self.name).await? {
            Some(lease) => {
                if !lease.can_acquire(&self.holder, now) {
                    let holder = lease.holder_identity.clone().unwrap_or_default();
                    debug!(
                        "Lease {} held by {} (renewed {:?})",
                        self.name, holder, lease.renew_time
                    );
                    return Ok(Acquisition::HeldByOther { holder, lease });
                }

                let previous = lease.holder_identity.clone();
                let mut next = lease;
                next.claim(&self.holder, self.duration_secs, now);
                match self.store.replace(&next).await {
                    Ok(stored) => {
                        if previous.as_deref() != Some(self.holder.as_str()) {
                            info!(
                                "Lease {} expired (held by {}), acquired by {}",
                                self.name,
                                previous.as_deref().unwrap_or("nobody"),
                                self.holder
                            );
                        }
                        Ok(Acquisition::Acquired(stored))
                    }
                    Err(LeaseError::Conflict(_)) | Err(LeaseError::NotFound(_)) => {
                        debug!("Lost race renewing lease {}", self.name);
                        Ok(Acquisition::Contended)
                    }
                    Err(e) => Err(e),
                }
            }
            None => {
                info!(
                    "No existing lease {} found, acquiring for {}",
                    self.name, self.holder
                );
                let lease = Lease::new(&self.name, &self.holder, self.duration_secs, now);
                match self.store.create(&lease).await {
                    Ok(stored) => Ok(Acquisition::Acquired(stored)),
                    Err(LeaseError::Conflict(_)) => {
                        debug!("Lost race creating lease {}", self.name);
                        Ok(Acquisition::Contended)
                    }
                    Err(e) => Err(e),
                }
            }
        }
    }

    /// Record `window_key` as the last report sent. Re-reads the lease and
    /// refuses if another replica has taken it over in the meantime.
    pub async fn record_sent(&self, window_key: &str) -> Result<Lease, LeaseError> {
        let mut lease = self
            .store
            .get(&self.name)
            .await?
            .ok_or_else(|| LeaseError::NotFound(self.name.clone()))?;
        if lease.holder_identity.as_deref() != Some(self.holder.as_str()) {
            return Err(LeaseError::NotHolder {
                name: self.name.clone(),
                holder: lease.holder_identity.unwrap_or_default(),
            });
        }
        lease.set_last_sent_window(window_key);
        self.store.replace(&lease).await
    }
}
