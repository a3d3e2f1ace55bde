//! Durable consent records.
//!
//! Consent is the long-lived counterpart of the ephemeral session: which
//! user attributes an app has been granted, keyed by (app, user). Grants
//! are idempotent upserts that union in new attributes.

use async_trait::async_trait;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::error::AuthError;

/// Shared reference to consent storage.
pub type DynConsentStorage = Arc<dyn ConsentStorage>;

/// Status of a consent record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConsentStatus {
    /// The user has granted the listed attributes.
    Granted,
    /// The user has withdrawn consent; attributes are kept for audit.
    Revoked,
}

/// A user's durable authorization of an app.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsentRecord {
    /// App the consent applies to.
    pub app_id: String,
    /// Consenting user.
    pub user_id: String,
    /// Attributes the app may read.
    pub granted_attributes: Vec<String>,
    /// Whether the consent is live.
    pub status: ConsentStatus,
}

impl ConsentRecord {
    /// Attributes in `requested` not covered by this record.
    #[must_use]
    pub fn missing(&self, requested: &[String]) -> Vec<String> {
        if self.status != ConsentStatus::Granted {
            return requested.to_vec();
        }
        requested
            .iter()
            .filter(|attr| !self.granted_attributes.contains(attr))
            .cloned()
            .collect()
    }
}

/// Storage for consent records, keyed by (app, user).
#[async_trait]
pub trait ConsentStorage: Send + Sync {
    /// Retrieves the consent record for an (app, user) pair.
    async fn get(&self, app_id: &str, user_id: &str) -> Result<Option<ConsentRecord>, AuthError>;

    /// Grants attributes, creating the record or unioning into an existing
    /// one. Re-granting already-held attributes is a no-op.
    async fn grant(
        &self,
        app_id: &str,
        user_id: &str,
        attributes: &[String],
    ) -> Result<ConsentRecord, AuthError>;

    /// Revokes a user's consent for an app.
    async fn revoke(&self, app_id: &str, user_id: &str) -> Result<(), AuthError>;
}

/// In-memory consent storage.
#[derive(Debug, Default)]
pub struct MemoryConsentStorage {
    records: DashMap<(String, String), ConsentRecord>,
}

impl MemoryConsentStorage {
    /// Creates empty consent storage.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ConsentStorage for MemoryConsentStorage {
    async fn get(&self, app_id: &str, user_id: &str) -> Result<Option<ConsentRecord>, AuthError> {
        Ok(self
            .records
            .get(&(app_id.to_string(), user_id.to_string()))
            .map(|entry| entry.clone()))
    }

    async fn grant(
        &self,
        app_id: &str,
        user_id: &str,
        attributes: &[String],
    ) -> Result<ConsentRecord, AuthError> {
        let key = (app_id.to_string(), user_id.to_string());
        let mut entry = self.records.entry(key).or_insert_with(|| ConsentRecord {
            app_id: app_id.to_string(),
            user_id: user_id.to_string(),
            granted_attributes: Vec::new(),
            status: ConsentStatus::Granted,
        });
        entry.status = ConsentStatus::Granted;
        for attr in attributes {
            if !entry.granted_attributes.contains(attr) {
                entry.granted_attributes.push(attr.clone());
            }
        }
        Ok(entry.clone())
    }

    async fn revoke(&self, app_id: &str, user_id: &str) -> Result<(), AuthError> {
        let key = (app_id.to_string(), user_id.to_string());
        if let Some(mut entry) = self.records.get_mut(&key) {
            entry.status = ConsentStatus::Revoked;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn attrs(names: &[&str]) -> Vec<String> {
        names.iter().map(ToString::to_string).collect()
    }

    #[tokio::test]
    async fn test_grant_is_idempotent_union() {
        let storage = MemoryConsentStorage::new();
        storage.grant("c1", "u1", &attrs(&["email"])).await.unwrap();
        storage
            .grant("c1", "u1", &attrs(&["email", "name"]))
            .await
            .unwrap();
        let record = storage.get("c1", "u1").await.unwrap().unwrap();
        assert_eq!(record.granted_attributes, attrs(&["email", "name"]));
        assert_eq!(record.status, ConsentStatus::Granted);
    }

    #[tokio::test]
    async fn test_missing_attributes() {
        let storage = MemoryConsentStorage::new();
        let record = storage.grant("c1", "u1", &attrs(&["email"])).await.unwrap();
        assert!(record.missing(&attrs(&["email"])).is_empty());
        assert_eq!(record.missing(&attrs(&["email", "name"])), attrs(&["name"]));
    }

    #[tokio::test]
    async fn test_revoked_consent_covers_nothing() {
        let storage = MemoryConsentStorage::new();
        storage.grant("c1", "u1", &attrs(&["email"])).await.unwrap();
        storage.revoke("c1", "u1").await.unwrap();

        let record = storage.get("c1", "u1").await.unwrap().unwrap();
        assert_eq!(record.status, ConsentStatus::Revoked);
        assert_eq!(record.missing(&attrs(&["email"])), attrs(&["email"]));

        // a fresh grant revives the record
        let record = storage.grant("c1", "u1", &attrs(&["email"])).await.unwrap();
        assert_eq!(record.status, ConsentStatus::Granted);
    }

    #[tokio::test]
    async fn test_pairs_are_independent() {
        let storage = MemoryConsentStorage::new();
        storage.grant("c1", "u1", &attrs(&["email"])).await.unwrap();
        assert!(storage.get("c1", "u2").await.unwrap().is_none());
        assert!(storage.get("c2", "u1").await.unwrap().is_none());
    }
}
