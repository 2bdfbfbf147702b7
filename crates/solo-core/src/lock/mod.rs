//! Deployment leases
//!
//! Every mutation of the remote config runs under a lease scoped to the
//! deployment namespace:
//! - [`ConfigMapLockManager`]: lease stored as a ConfigMap, shared by every
//!   process talking to the cluster
//! - [`LocalLockManager`]: in-process table for single-process use
//!
//! While a lease is held, [`LeaseRenewal`] keeps it fresh in the background
//! and records if renewal ever fails.

mod configmap;
mod local;

use std::fmt::Debug;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::{oneshot, watch};
use tokio::task::JoinHandle;
use uuid::Uuid;

use crate::error::LockError;
use crate::k8::Target;

pub use configmap::{ConfigMapLockManager, LEASE_LABEL_KEY, LEASE_LABEL_VALUE, LEASE_NAME};
pub use local::LocalLockManager;

/// Held lease
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Lease {
    /// Leased namespace
    pub target: Target,
    /// Human readable holder
    pub holder: String,
    /// Unique id of this acquisition
    pub holder_id: Uuid,
    /// Acquisition time
    pub acquired_at: DateTime<Utc>,
}

/// Lease provider
#[async_trait]
pub trait LockManager: Send + Sync + Debug {
    /// Acquire the lease for a namespace, retrying while someone else holds it
    async fn acquire(&self, target: &Target) -> Result<Lease, LockError>;

    /// Extend a held lease
    async fn renew(&self, lease: &Lease) -> Result<(), LockError>;

    /// Give up a held lease
    async fn release(&self, lease: &Lease) -> Result<(), LockError>;

    /// How often a held lease must be renewed
    fn renew_interval(&self) -> Duration;
}

/// Background renewal of a held lease
#[derive(Debug)]
pub struct LeaseRenewal {
    namespace: String,
    lost: watch::Receiver<Option<String>>,
    stop: Option<oneshot::Sender<()>>,
    handle: JoinHandle<()>,
}

impl LeaseRenewal {
    /// Start renewing `lease` every [`LockManager::renew_interval`]
    #[must_use]
    pub fn spawn(manager: Arc<dyn LockManager>, lease: Lease) -> Self {
        let interval = manager.renew_interval().max(Duration::from_millis(1));
        let namespace = lease.target.namespace.clone();
        let (stop_tx, mut stop_rx) = oneshot::channel();
        let (lost_tx, lost_rx) = watch::channel(None);

        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.tick().await;
            loop {
                tokio::select! {
                    _ = &mut stop_rx => break,
                    _ = ticker.tick() => {
                        if let Err(e) = manager.renew(&lease).await {
                            tracing::warn!(
                                namespace = %lease.target.namespace,
                                holder_id = %lease.holder_id,
                                error = %e,
                                "lease renewal failed"
                            );
                            let _ = lost_tx.send(Some(e.to_string()));
                            break;
                        }
                        tracing::trace!(namespace = %lease.target.namespace, "lease renewed");
                    }
                }
            }
        });

        Self {
            namespace,
            lost: lost_rx,
            stop: Some(stop_tx),
            handle,
        }
    }

    /// Check the lease is still held
    ///
    /// # Errors
    /// Returns `Lost` if a renewal has failed
    pub fn check(&self) -> Result<(), LockError> {
        match self.lost.borrow().as_ref() {
            Some(reason) => Err(LockError::Lost {
                namespace: self.namespace.clone(),
                reason: reason.clone(),
            }),
            None => Ok(()),
        }
    }

    /// Stop renewing and wait for the task to finish
    pub async fn stop(mut self) {
        if let Some(stop) = self.stop.take() {
            let _ = stop.send(());
        }
        if let Err(e) = (&mut self.handle).await {
            tracing::warn!(error = %e, "lease renewal task ended abnormally");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[derive(Debug)]
    struct CountingLocks {
        renewals: AtomicU32,
        fail_after: u32,
    }

    #[async_trait]
    impl LockManager for CountingLocks {
        async fn acquire(&self, target: &Target) -> Result<Lease, LockError> {
            Ok(Lease {
                target: target.clone(),
                holder: "test".into(),
                holder_id: Uuid::new_v4(),
                acquired_at: Utc::now(),
            })
        }

        async fn renew(&self, lease: &Lease) -> Result<(), LockError> {
            let n = self.renewals.fetch_add(1, Ordering::SeqCst) + 1;
            if n > self.fail_after {
                Err(LockError::NotHolder {
                    namespace: lease.target.namespace.clone(),
                    holder_id: lease.holder_id.to_string(),
                })
            } else {
                Ok(())
            }
        }

        async fn release(&self, _lease: &Lease) -> Result<(), LockError> {
            Ok(())
        }

        fn renew_interval(&self) -> Duration {
            Duration::from_millis(10)
        }
    }

    #[tokio::test]
    async fn renewal_runs_until_stopped() {
        let locks = Arc::new(CountingLocks {
            renewals: AtomicU32::new(0),
            fail_after: u32::MAX,
        });
        let lease = locks.acquire(&Target::new("ctx", "solo")).await.unwrap();
        let renewal = LeaseRenewal::spawn(locks.clone(), lease);
        tokio::time::sleep(Duration::from_millis(60)).await;
        renewal.check().unwrap();
        renewal.stop().await;

        let after_stop = locks.renewals.load(Ordering::SeqCst);
        assert!(after_stop >= 1);
        tokio::time::sleep(Duration::from_millis(30)).await;
        assert_eq!(locks.renewals.load(Ordering::SeqCst), after_stop);
    }

    #[tokio::test]
    async fn failed_renewal_marks_lease_lost() {
        let locks = Arc::new(CountingLocks {
            renewals: AtomicU32::new(0),
            fail_after: 1,
        });
        let lease = locks.acquire(&Target::new("ctx", "solo")).await.unwrap();
        let renewal = LeaseRenewal::spawn(locks.clone(), lease);
        tokio::time::sleep(Duration::from_millis(80)).await;
        assert!(matches!(renewal.check(), Err(LockError::Lost { .. })));
        renewal.stop().await;
    }
}
