//! Policy directory records, the batched read trait, and the in-memory
//! implementation.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::debug;

use crate::error::StoreResult;

/// A registered policy package, keyed by name.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PolicyRecord {
    /// npm package name of the policy.
    pub package_name: String,
    /// When the policy was registered.
    pub created_at: DateTime<Utc>,
    /// Soft-delete flag; deleted records never surface in lookups.
    pub is_deleted: bool,
}

/// A registered version of a policy package, keyed by (name, version).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PolicyVersionRecord {
    /// npm package name of the policy.
    pub package_name: String,
    /// Exact published version.
    pub version: String,
    /// When the version was registered.
    pub created_at: DateTime<Utc>,
    /// Soft-delete flag; deleted records never surface in lookups.
    pub is_deleted: bool,
}

/// Read-only, batch-shaped access to registered policies.
///
/// Both lookups exclude soft-deleted records. Implementations answer each
/// call with a single backend query; per-name round trips defeat the
/// purpose of the batch shape.
#[async_trait]
pub trait PolicyDirectory: Send + Sync {
    /// Fetch the policy records whose names appear in `names`.
    ///
    /// Names with no live record are simply absent from the result.
    ///
    /// # Errors
    ///
    /// Returns a [`crate::StoreError`] if the backend read fails.
    async fn find_policies(&self, names: &[String]) -> StoreResult<Vec<PolicyRecord>>;

    /// Fetch the policy version records matching the given
    /// (name, exact version) pairs.
    ///
    /// Pairs with no live record are simply absent from the result.
    ///
    /// # Errors
    ///
    /// Returns a [`crate::StoreError`] if the backend read fails.
    async fn find_policy_versions(
        &self,
        pairs: &[(String, String)],
    ) -> StoreResult<Vec<PolicyVersionRecord>>;
}

/// In-memory [`PolicyDirectory`] for tests and embedded use.
#[derive(Debug, Default)]
pub struct MemoryPolicyDirectory {
    policies: RwLock<HashMap<String, PolicyRecord>>,
    versions: RwLock<HashMap<(String, String), PolicyVersionRecord>>,
}

impl MemoryPolicyDirectory {
    /// Create an empty directory.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a policy by name.
    ///
    /// Re-registering an existing name revives a soft-deleted record.
    pub async fn register_policy(&self, package_name: impl Into<String>) {
        let package_name = package_name.into();
        debug!(policy = %package_name, "registering policy");
        self.policies.write().await.insert(
            package_name.clone(),
            PolicyRecord {
                package_name,
                created_at: Utc::now(),
                is_deleted: false,
            },
        );
    }

    /// Register a policy version by (name, exact version).
    pub async fn register_policy_version(
        &self,
        package_name: impl Into<String>,
        version: impl Into<String>,
    ) {
        let package_name = package_name.into();
        let version = version.into();
        debug!(policy = %package_name, version = %version, "registering policy version");
        self.versions.write().await.insert(
            (package_name.clone(), version.clone()),
            PolicyVersionRecord {
                package_name,
                version,
                created_at: Utc::now(),
                is_deleted: false,
            },
        );
    }

    /// Soft-delete a policy. Returns `false` when the name is unknown.
    pub async fn soft_delete_policy(&self, package_name: &str) -> bool {
        match self.policies.write().await.get_mut(package_name) {
            Some(record) => {
                record.is_deleted = true;
                true
            },
            None => false,
        }
    }

    /// Soft-delete a policy version. Returns `false` when the pair is
    /// unknown.
    pub async fn soft_delete_policy_version(&self, package_name: &str, version: &str) -> bool {
        let key = (package_name.to_string(), version.to_string());
        match self.versions.write().await.get_mut(&key) {
            Some(record) => {
                record.is_deleted = true;
                true
            },
            None => false,
        }
    }
}

#[async_trait]
impl PolicyDirectory for MemoryPolicyDirectory {
    async fn find_policies(&self, names: &[String]) -> StoreResult<Vec<PolicyRecord>> {
        let policies = self.policies.read().await;
        Ok(names
            .iter()
            .filter_map(|name| policies.get(name))
            .filter(|record| !record.is_deleted)
            .cloned()
            .collect())
    }

    async fn find_policy_versions(
        &self,
        pairs: &[(String, String)],
    ) -> StoreResult<Vec<PolicyVersionRecord>> {
        let versions = self.versions.read().await;
        Ok(pairs
            .iter()
            .filter_map(|pair| versions.get(pair))
            .filter(|record| !record.is_deleted)
            .cloned()
            .collect())
    }
}
