//! In-process lease table

use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use uuid::Uuid;

use super::{Lease, LockManager};
use crate::config::LockSettings;
use crate::error::LockError;
use crate::k8::Target;

/// Lease table for processes that never share a cluster
///
/// Leases do not expire; a holder keeps the lease until it releases it.
#[derive(Debug)]
pub struct LocalLockManager {
    leases: DashMap<Target, (Uuid, String)>,
    settings: LockSettings,
    holder: String,
}

impl LocalLockManager {
    /// Create empty lease table
    #[must_use]
    pub fn new(settings: LockSettings, holder: impl Into<String>) -> Self {
        Self {
            leases: DashMap::new(),
            settings,
            holder: holder.into(),
        }
    }

    /// Number of leases currently held
    #[inline]
    #[must_use]
    pub fn held(&self) -> usize {
        self.leases.len()
    }

    fn not_holder(lease: &Lease) -> LockError {
        LockError::NotHolder {
            namespace: lease.target.namespace.clone(),
            holder_id: lease.holder_id.to_string(),
        }
    }
}

#[async_trait]
impl LockManager for LocalLockManager {
    async fn acquire(&self, target: &Target) -> Result<Lease, LockError> {
        let holder_id = Uuid::new_v4();
        let attempts = self.settings.acquire_attempts.max(1);
        let mut current = String::new();

        for attempt in 1..=attempts {
            // entry guard must drop before the sleep
            let taken = match self.leases.entry(target.clone()) {
                Entry::Vacant(slot) => {
                    slot.insert((holder_id, self.holder.clone()));
                    None
                }
                Entry::Occupied(held) => Some(held.get().1.clone()),
            };
            match taken {
                None => {
                    tracing::debug!(namespace = %target.namespace, holder_id = %holder_id, "local lease acquired");
                    return Ok(Lease {
                        target: target.clone(),
                        holder: self.holder.clone(),
                        holder_id,
                        acquired_at: Utc::now(),
                    });
                }
                Some(holder) => current = holder,
            }
            if attempt < attempts {
                tokio::time::sleep(self.settings.acquire_delay()).await;
            }
        }

        Err(LockError::AcquireTimeout {
            namespace: target.namespace.clone(),
            holder: current,
            attempts,
        })
    }

    async fn renew(&self, lease: &Lease) -> Result<(), LockError> {
        match self.leases.get(&lease.target) {
            Some(held) if held.0 == lease.holder_id => Ok(()),
            _ => Err(Self::not_holder(lease)),
        }
    }

    async fn release(&self, lease: &Lease) -> Result<(), LockError> {
        match self.leases.remove_if(&lease.target, |_, held| held.0 == lease.holder_id) {
            Some(_) => Ok(()),
            None if self.leases.contains_key(&lease.target) => Err(Self::not_holder(lease)),
            None => Ok(()),
        }
    }

    fn renew_interval(&self) -> Duration {
        self.settings.renew_interval()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn quick() -> LockSettings {
        LockSettings {
            acquire_attempts: 3,
            acquire_delay_ms: 5,
            ..LockSettings::default()
        }
    }

    #[tokio::test]
    async fn second_holder_waits_then_times_out() {
        let locks = LocalLockManager::new(quick(), "first");
        let target = Target::new("ctx", "solo");
        let lease = locks.acquire(&target).await.unwrap();

        let err = locks.acquire(&target).await.unwrap_err();
        assert!(matches!(err, LockError::AcquireTimeout { attempts: 3, .. }));

        locks.release(&lease).await.unwrap();
        assert_eq!(locks.held(), 0);
        assert!(locks.acquire(&target).await.is_ok());
    }

    #[tokio::test]
    async fn waiting_holder_gets_lease_after_release() {
        let locks = Arc::new(LocalLockManager::new(
            LockSettings {
                acquire_attempts: 50,
                acquire_delay_ms: 2,
                ..LockSettings::default()
            },
            "solo",
        ));
        let target = Target::new("ctx", "solo");
        let first = locks.acquire(&target).await.unwrap();

        let waiter = {
            let locks = locks.clone();
            let target = target.clone();
            tokio::spawn(async move { locks.acquire(&target).await })
        };
        tokio::time::sleep(Duration::from_millis(10)).await;
        locks.release(&first).await.unwrap();

        let second = waiter.await.unwrap().unwrap();
        assert_ne!(second.holder_id, first.holder_id);
    }

    #[tokio::test]
    async fn stale_lease_cannot_renew_or_release() {
        let locks = LocalLockManager::new(quick(), "solo");
        let target = Target::new("ctx", "solo");
        let lease = locks.acquire(&target).await.unwrap();
        let stale = Lease {
            holder_id: Uuid::new_v4(),
            ..lease.clone()
        };

        assert!(locks.renew(&lease).await.is_ok());
        assert!(matches!(locks.renew(&stale).await, Err(LockError::NotHolder { .. })));
        assert!(matches!(locks.release(&stale).await, Err(LockError::NotHolder { .. })));
        assert_eq!(locks.held(), 1);
    }
}
