//! Lease stored as a ConfigMap in the deployment namespace

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::{Lease, LockManager};
use crate::config::LockSettings;
use crate::error::{K8Error, LockError};
use crate::k8::{ConfigMap, K8Client, Target};

/// Lease ConfigMap name
pub const LEASE_NAME: &str = "solo-lease";

/// Lease label key
pub const LEASE_LABEL_KEY: &str = "solo.hedera.com/type";

/// Lease label value
pub const LEASE_LABEL_VALUE: &str = "lease";

const HOLDER: &str = "holder";
const HOLDER_ID: &str = "holderId";
const RENEWED_AT: &str = "renewedAt";
const DURATION_SECS: &str = "durationSecs";

#[derive(Debug, Clone, PartialEq, Eq)]
struct LeaseRecord {
    holder: String,
    holder_id: Uuid,
    renewed_at: DateTime<Utc>,
    duration_secs: u64,
}

impl LeaseRecord {
    fn parse(config_map: &ConfigMap) -> Result<Self, LockError> {
        let malformed = |reason: String| LockError::Malformed {
            namespace: config_map.namespace.clone(),
            reason,
        };
        let field = |key: &str| {
            config_map
                .data
                .get(key)
                .ok_or_else(|| malformed(format!("missing '{key}'")))
        };

        Ok(Self {
            holder: field(HOLDER)?.clone(),
            holder_id: field(HOLDER_ID)?
                .parse()
                .map_err(|e| malformed(format!("bad {HOLDER_ID}: {e}")))?,
            renewed_at: DateTime::parse_from_rfc3339(field(RENEWED_AT)?)
                .map_err(|e| malformed(format!("bad {RENEWED_AT}: {e}")))?
                .with_timezone(&Utc),
            duration_secs: field(DURATION_SECS)?
                .parse::<u64>()
                .map_err(|e| malformed(format!("bad {DURATION_SECS}: {e}")))
                .and_then(|secs| {
                    i64::try_from(secs)
                        .ok()
                        .and_then(chrono::Duration::try_seconds)
                        .map(|_| secs)
                        .ok_or_else(|| malformed(format!("{DURATION_SECS} {secs} out of range")))
                })?,
        })
    }

    fn to_config_map(&self, namespace: &str) -> ConfigMap {
        ConfigMap::new(LEASE_NAME, namespace)
            .with_label(LEASE_LABEL_KEY, LEASE_LABEL_VALUE)
            .with_data(HOLDER, self.holder.clone())
            .with_data(HOLDER_ID, self.holder_id.to_string())
            .with_data(RENEWED_AT, self.renewed_at.to_rfc3339())
            .with_data(DURATION_SECS, self.duration_secs.to_string())
    }

    /// A deadline past the representable range never expires
    fn is_expired(&self, now: DateTime<Utc>) -> bool {
        i64::try_from(self.duration_secs)
            .ok()
            .and_then(chrono::Duration::try_seconds)
            .and_then(|duration| self.renewed_at.checked_add_signed(duration))
            .is_some_and(|deadline| deadline < now)
    }
}

enum Attempt {
    Acquired(Lease),
    Held(String),
}

/// Lease lock shared through the cluster
///
/// Creation of the lease ConfigMap is atomic, so at most one holder wins.
/// A lease whose `renewedAt + durationSecs` has passed is taken over with a
/// version-guarded replace.
#[derive(Debug, Clone)]
pub struct ConfigMapLockManager {
    k8: Arc<dyn K8Client>,
    settings: LockSettings,
    holder: String,
}

impl ConfigMapLockManager {
    /// Create lock manager acting as `holder`
    #[must_use]
    pub fn new(k8: Arc<dyn K8Client>, settings: LockSettings, holder: impl Into<String>) -> Self {
        Self {
            k8,
            settings,
            holder: holder.into(),
        }
    }

    fn record(&self, holder_id: Uuid) -> LeaseRecord {
        LeaseRecord {
            holder: self.holder.clone(),
            holder_id,
            renewed_at: Utc::now(),
            duration_secs: self.settings.lease_duration_secs,
        }
    }

    fn lease(&self, target: &Target, record: &LeaseRecord) -> Lease {
        Lease {
            target: target.clone(),
            holder: record.holder.clone(),
            holder_id: record.holder_id,
            acquired_at: record.renewed_at,
        }
    }

    async fn try_acquire(&self, target: &Target, holder_id: Uuid) -> Result<Attempt, LockError> {
        let record = self.record(holder_id);
        match self
            .k8
            .create_config_map(&target.context, &record.to_config_map(&target.namespace))
            .await
        {
            Ok(_) => return Ok(Attempt::Acquired(self.lease(target, &record))),
            Err(e) if e.is_already_exists() => {}
            Err(e) => return Err(e.into()),
        }

        let existing = match self.k8.read_config_map(target, LEASE_NAME).await {
            Ok(existing) => existing,
            // released between our create and read; try again
            Err(e) if e.is_not_found() => return Ok(Attempt::Held("nobody".to_string())),
            Err(e) => return Err(e.into()),
        };

        let previous = match LeaseRecord::parse(&existing) {
            Ok(current) if !current.is_expired(Utc::now()) => return Ok(Attempt::Held(current.holder)),
            Ok(expired) => expired.holder,
            Err(e) => {
                tracing::warn!(namespace = %target.namespace, error = %e, "replacing unreadable lease");
                "unknown".to_string()
            }
        };

        let mut takeover = record.to_config_map(&target.namespace);
        takeover.resource_version = existing.resource_version;
        match self.k8.replace_config_map(&target.context, &takeover).await {
            Ok(_) => {
                tracing::info!(namespace = %target.namespace, previous = %previous, "took over expired lease");
                Ok(Attempt::Acquired(self.lease(target, &record)))
            }
            Err(e) if e.is_conflict() || e.is_not_found() => Ok(Attempt::Held(previous)),
            Err(e) => Err(e.into()),
        }
    }

    async fn read_own(&self, lease: &Lease) -> Result<Option<(ConfigMap, LeaseRecord)>, LockError> {
        let existing = match self.k8.read_config_map(&lease.target, LEASE_NAME).await {
            Ok(existing) => existing,
            Err(e) if e.is_not_found() => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let record = LeaseRecord::parse(&existing)?;
        if record.holder_id != lease.holder_id {
            return Err(LockError::NotHolder {
                namespace: lease.target.namespace.clone(),
                holder_id: lease.holder_id.to_string(),
            });
        }
        Ok(Some((existing, record)))
    }
}

#[async_trait]
impl LockManager for ConfigMapLockManager {
    #[tracing::instrument(skip(self), fields(context = %target.context, namespace = %target.namespace))]
    async fn acquire(&self, target: &Target) -> Result<Lease, LockError> {
        let holder_id = Uuid::new_v4();
        let attempts = self.settings.acquire_attempts.max(1);
        let mut holder = String::new();

        for attempt in 1..=attempts {
            match self.try_acquire(target, holder_id).await? {
                Attempt::Acquired(lease) => {
                    tracing::info!(holder_id = %holder_id, attempt, "lease acquired");
                    return Ok(lease);
                }
                Attempt::Held(current) => {
                    tracing::debug!(holder = %current, attempt, "lease held, waiting");
                    holder = current;
                }
            }
            if attempt < attempts {
                tokio::time::sleep(self.settings.acquire_delay()).await;
            }
        }

        Err(LockError::AcquireTimeout {
            namespace: target.namespace.clone(),
            holder,
            attempts,
        })
    }

    async fn renew(&self, lease: &Lease) -> Result<(), LockError> {
        let (existing, mut record) = self.read_own(lease).await?.ok_or_else(|| LockError::NotHolder {
            namespace: lease.target.namespace.clone(),
            holder_id: lease.holder_id.to_string(),
        })?;
        record.renewed_at = Utc::now();
        let mut renewed = record.to_config_map(&lease.target.namespace);
        renewed.resource_version = existing.resource_version;
        self.k8
            .replace_config_map(&lease.target.context, &renewed)
            .await
            .map_err(|e| match e {
                K8Error::Conflict { .. } | K8Error::NotFound { .. } => LockError::NotHolder {
                    namespace: lease.target.namespace.clone(),
                    holder_id: lease.holder_id.to_string(),
                },
                other => other.into(),
            })?;
        Ok(())
    }

    async fn release(&self, lease: &Lease) -> Result<(), LockError> {
        let Some((existing, _)) = self.read_own(lease).await? else {
            tracing::warn!(namespace = %lease.target.namespace, "lease already gone on release");
            return Ok(());
        };
        // the version guard keeps a lease taken over since the read
        match self
            .k8
            .delete_config_map(&lease.target, LEASE_NAME, existing.resource_version.as_deref())
            .await
        {
            Ok(()) => {
                tracing::info!(namespace = %lease.target.namespace, holder_id = %lease.holder_id, "lease released");
                Ok(())
            }
            Err(e) if e.is_not_found() => Ok(()),
            Err(e) if e.is_conflict() => Err(LockError::NotHolder {
                namespace: lease.target.namespace.clone(),
                holder_id: lease.holder_id.to_string(),
            }),
            Err(e) => Err(e.into()),
        }
    }

    fn renew_interval(&self) -> Duration {
        self.settings.renew_interval()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::k8::MockK8Client;

    fn settings() -> LockSettings {
        LockSettings {
            acquire_attempts: 2,
            acquire_delay_ms: 1,
            lease_duration_secs: 20,
            renew_interval_ms: 1_000,
        }
    }

    fn held_by_other(renewed_at: DateTime<Utc>) -> ConfigMap {
        let mut cm = LeaseRecord {
            holder: "jane@other".into(),
            holder_id: Uuid::new_v4(),
            renewed_at,
            duration_secs: 20,
        }
        .to_config_map("solo");
        cm.resource_version = Some("7".into());
        cm
    }

    #[test]
    fn record_round_trip_and_expiry() {
        let now = Utc::now();
        let record = LeaseRecord {
            holder: "john@host".into(),
            holder_id: Uuid::new_v4(),
            renewed_at: now - chrono::Duration::seconds(30),
            duration_secs: 20,
        };
        let parsed = LeaseRecord::parse(&record.to_config_map("solo")).unwrap();
        assert_eq!(parsed.holder_id, record.holder_id);
        assert!(parsed.is_expired(now));

        let mut bad = record.to_config_map("solo");
        bad.data.remove(HOLDER_ID);
        assert!(matches!(LeaseRecord::parse(&bad), Err(LockError::Malformed { .. })));
    }

    #[test]
    fn oversized_duration_is_malformed() {
        let mut record = LeaseRecord {
            holder: "jane@other".into(),
            holder_id: Uuid::new_v4(),
            renewed_at: Utc::now(),
            duration_secs: u64::MAX,
        };
        assert!(!record.is_expired(Utc::now()));
        assert!(matches!(
            LeaseRecord::parse(&record.to_config_map("solo")),
            Err(LockError::Malformed { .. })
        ));

        // fits a Duration but not a deadline
        record.duration_secs = u64::try_from(i64::MAX / 1_000).unwrap();
        assert!(!record.is_expired(Utc::now()));
    }

    #[tokio::test]
    async fn oversized_lease_is_taken_over() {
        let mut k8 = MockK8Client::new();
        k8.expect_create_config_map()
            .times(1)
            .returning(|_, cm| Err(K8Error::already_exists("ConfigMap", cm.namespace.clone(), cm.name.clone())));
        k8.expect_read_config_map().times(1).returning(|_, _| {
            let mut cm = held_by_other(Utc::now());
            cm.data.insert(DURATION_SECS.into(), u64::MAX.to_string());
            Ok(cm)
        });
        k8.expect_replace_config_map()
            .withf(|_, cm| cm.resource_version.as_deref() == Some("7"))
            .times(1)
            .returning(|_, cm| Ok(cm.clone()));

        let locks = ConfigMapLockManager::new(Arc::new(k8), settings(), "john@host");
        let lease = locks.acquire(&Target::new("ctx", "solo")).await.unwrap();
        assert_eq!(lease.holder, "john@host");
    }

    #[tokio::test]
    async fn live_lease_times_out() {
        let mut k8 = MockK8Client::new();
        k8.expect_create_config_map()
            .times(2)
            .returning(|_, cm| Err(K8Error::already_exists("ConfigMap", cm.namespace.clone(), cm.name.clone())));
        k8.expect_read_config_map()
            .times(2)
            .returning(|_, _| Ok(held_by_other(Utc::now())));

        let locks = ConfigMapLockManager::new(Arc::new(k8), settings(), "john@host");
        let err = locks.acquire(&Target::new("ctx", "solo")).await.unwrap_err();
        match err {
            LockError::AcquireTimeout { holder, attempts, .. } => {
                assert_eq!(holder, "jane@other");
                assert_eq!(attempts, 2);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn expired_lease_is_taken_over_with_version_guard() {
        let mut k8 = MockK8Client::new();
        k8.expect_create_config_map()
            .times(1)
            .returning(|_, cm| Err(K8Error::already_exists("ConfigMap", cm.namespace.clone(), cm.name.clone())));
        k8.expect_read_config_map()
            .times(1)
            .returning(|_, _| Ok(held_by_other(Utc::now() - chrono::Duration::seconds(60))));
        k8.expect_replace_config_map()
            .withf(|_, cm| cm.resource_version.as_deref() == Some("7") && cm.data[HOLDER] == "john@host")
            .times(1)
            .returning(|_, cm| Ok(cm.clone()));

        let locks = ConfigMapLockManager::new(Arc::new(k8), settings(), "john@host");
        let lease = locks.acquire(&Target::new("ctx", "solo")).await.unwrap();
        assert_eq!(lease.holder, "john@host");
    }

    #[tokio::test]
    async fn release_refuses_foreign_lease() {
        let mut k8 = MockK8Client::new();
        k8.expect_read_config_map()
            .returning(|_, _| Ok(held_by_other(Utc::now())));
        k8.expect_delete_config_map().never();

        let locks = ConfigMapLockManager::new(Arc::new(k8), settings(), "john@host");
        let lease = Lease {
            target: Target::new("ctx", "solo"),
            holder: "john@host".into(),
            holder_id: Uuid::new_v4(),
            acquired_at: Utc::now(),
        };
        assert!(matches!(locks.release(&lease).await, Err(LockError::NotHolder { .. })));
    }

    fn own_lease() -> (Lease, ConfigMap) {
        let lease = Lease {
            target: Target::new("ctx", "solo"),
            holder: "john@host".into(),
            holder_id: Uuid::new_v4(),
            acquired_at: Utc::now(),
        };
        let mut cm = LeaseRecord {
            holder: lease.holder.clone(),
            holder_id: lease.holder_id,
            renewed_at: lease.acquired_at,
            duration_secs: 20,
        }
        .to_config_map("solo");
        cm.resource_version = Some("7".into());
        (lease, cm)
    }

    #[tokio::test]
    async fn release_deletes_the_version_it_read() {
        let (lease, cm) = own_lease();
        let mut k8 = MockK8Client::new();
        k8.expect_read_config_map().returning(move |_, _| Ok(cm.clone()));
        k8.expect_delete_config_map()
            .withf(|_, name, version| name == LEASE_NAME && *version == Some("7"))
            .times(1)
            .returning(|_, _, _| Ok(()));

        let locks = ConfigMapLockManager::new(Arc::new(k8), settings(), "john@host");
        locks.release(&lease).await.unwrap();
    }

    #[tokio::test]
    async fn release_after_takeover_keeps_new_lease() {
        let (lease, cm) = own_lease();
        let mut k8 = MockK8Client::new();
        k8.expect_read_config_map().returning(move |_, _| Ok(cm.clone()));
        k8.expect_delete_config_map()
            .times(1)
            .returning(|target, name, _| Err(K8Error::conflict("ConfigMap", target.namespace.clone(), name.to_string())));

        let locks = ConfigMapLockManager::new(Arc::new(k8), settings(), "john@host");
        assert!(matches!(locks.release(&lease).await, Err(LockError::NotHolder { .. })));
    }
}
