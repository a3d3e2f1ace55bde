//! Ephemeral authorization sessions.
//!
//! A session is a JSON blob in the TTL store, keyed by an opaque id. Every
//! write re-stores the blob and therefore re-arms the TTL; a session absent
//! from the store means the flow must restart from authorization.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use fidovault_storage::DynKeyValueStore;

use crate::error::AuthError;

/// State of one authorization flow.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionRecord {
    /// Opaque session id.
    pub id: String,
    /// App (client) the flow belongs to.
    pub app_id: String,
    /// Authenticated user, absent until authentication completes.
    pub user_id: Option<String>,
    /// Origin of the front-channel request.
    pub origin: String,
    /// Client IP recorded at flow start.
    pub client_ip: String,
    /// Bearer token attached once, at authentication completion.
    pub bearer_token: Option<String>,
    /// Server-issued opaque code bound at authentication completion.
    pub oidc_code: Option<String>,
    /// PKCE code challenge from the authorization request.
    pub oidc_challenge: Option<String>,
}

impl SessionRecord {
    /// Creates a fresh session for an authorization flow.
    #[must_use]
    pub fn new(app_id: impl Into<String>, origin: impl Into<String>, client_ip: impl Into<String>) -> Self {
        Self {
            id: fidovault_core::generate_opaque(32),
            app_id: app_id.into(),
            user_id: None,
            origin: origin.into(),
            client_ip: client_ip.into(),
            bearer_token: None,
            oidc_code: None,
            oidc_challenge: None,
        }
    }

    /// Returns `true` once authentication has completed and a bearer token
    /// is attached.
    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.user_id.is_some() && self.bearer_token.is_some()
    }
}

/// TTL-bound session persistence.
#[derive(Clone)]
pub struct SessionStore {
    kv: DynKeyValueStore,
    ttl: Duration,
}

impl SessionStore {
    /// Creates a session store with the given record TTL.
    #[must_use]
    pub fn new(kv: DynKeyValueStore, ttl: Duration) -> Self {
        Self { kv, ttl }
    }

    /// Persists a session and returns its id.
    pub async fn create(&self, record: &SessionRecord) -> Result<String, AuthError> {
        self.write(record).await?;
        Ok(record.id.clone())
    }

    /// Loads a session. Missing and expired are both `SessionNotFound`.
    pub async fn get(&self, id: &str) -> Result<SessionRecord, AuthError> {
        let bytes = self
            .kv
            .get(id)
            .await?
            .ok_or(AuthError::SessionNotFound)?;
        serde_json::from_slice(&bytes)
            .map_err(|e| AuthError::internal(format!("session blob is not valid JSON: {e}")))
    }

    /// Attaches the authenticated user and re-arms the TTL.
    pub async fn attach_user(&self, id: &str, user_id: &str) -> Result<SessionRecord, AuthError> {
        let mut record = self.get(id).await?;
        record.user_id = Some(user_id.to_string());
        self.write(&record).await?;
        Ok(record)
    }

    /// Attaches the bearer token and server-issued code, re-arming the TTL.
    ///
    /// The token is set at most once per flow; a second attempt is a
    /// retried completion, rejected rather than silently overwritten.
    pub async fn attach_token(
        &self,
        id: &str,
        bearer_token: &str,
        oidc_code: &str,
    ) -> Result<SessionRecord, AuthError> {
        let mut record = self.get(id).await?;
        if record.bearer_token.is_some() {
            return Err(AuthError::ReplayDetected);
        }
        record.bearer_token = Some(bearer_token.to_string());
        record.oidc_code = Some(oidc_code.to_string());
        self.write(&record).await?;
        Ok(record)
    }

    /// Stores the PKCE derived index: `key` resolves to the session id.
    pub async fn put_index(&self, key: &str, session_id: &str) -> Result<(), AuthError> {
        self.kv
            .put(key, session_id.as_bytes().to_vec(), self.ttl)
            .await?;
        Ok(())
    }

    /// Atomically consumes the derived index, returning the session id it
    /// pointed at. A second call with the same key observes nothing.
    pub async fn take_index(&self, key: &str) -> Result<Option<String>, AuthError> {
        let bytes = self.kv.take(key).await?;
        match bytes {
            Some(bytes) => {
                let id = String::from_utf8(bytes)
                    .map_err(|_| AuthError::internal("derived index value is not UTF-8"))?;
                Ok(Some(id))
            }
            None => Ok(None),
        }
    }

    /// Removes a session.
    pub async fn delete(&self, id: &str) -> Result<(), AuthError> {
        self.kv.delete(id).await?;
        Ok(())
    }

    async fn write(&self, record: &SessionRecord) -> Result<(), AuthError> {
        let bytes = serde_json::to_vec(record)
            .map_err(|e| AuthError::internal(format!("session serialization failed: {e}")))?;
        self.kv.put(&record.id, bytes, self.ttl).await?;
        Ok(())
    }
}

impl std::fmt::Debug for SessionStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionStore")
            .field("ttl", &self.ttl)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fidovault_storage::MemoryKv;
    use std::sync::Arc;

    fn store(ttl: Duration) -> SessionStore {
        SessionStore::new(Arc::new(MemoryKv::new()), ttl)
    }

    #[tokio::test]
    async fn test_create_and_get() {
        let store = store(Duration::from_secs(1800));
        let record = SessionRecord::new("app1", "https://a.example", "10.0.0.1");
        let id = store.create(&record).await.unwrap();
        let loaded = store.get(&id).await.unwrap();
        assert_eq!(loaded, record);
        assert!(!loaded.is_authenticated());

        let err = store.get("missing").await.unwrap_err();
        assert!(matches!(err, AuthError::SessionNotFound));
    }

    #[tokio::test]
    async fn test_attach_user_and_token() {
        let store = store(Duration::from_secs(1800));
        let record = SessionRecord::new("app1", "https://a.example", "10.0.0.1");
        let id = store.create(&record).await.unwrap();

        store.attach_user(&id, "u1").await.unwrap();
        let updated = store.attach_token(&id, "bearer", "code1").await.unwrap();
        assert!(updated.is_authenticated());
        assert_eq!(updated.oidc_code.as_deref(), Some("code1"));

        // token is write-once; a second attach is a retried completion
        let err = store.attach_token(&id, "other", "code2").await.unwrap_err();
        assert!(matches!(err, AuthError::ReplayDetected));
    }

    #[tokio::test(start_paused = true)]
    async fn test_ttl_expiry_and_touch() {
        let store = store(Duration::from_secs(60));
        let record = SessionRecord::new("app1", "https://a.example", "10.0.0.1");
        let id = store.create(&record).await.unwrap();

        // a write inside the window re-arms the full TTL
        tokio::time::advance(Duration::from_secs(40)).await;
        store.attach_user(&id, "u1").await.unwrap();
        tokio::time::advance(Duration::from_secs(40)).await;
        assert!(store.get(&id).await.is_ok());

        tokio::time::advance(Duration::from_secs(61)).await;
        let err = store.get(&id).await.unwrap_err();
        assert!(matches!(err, AuthError::SessionNotFound));
    }

    #[tokio::test]
    async fn test_index_is_single_use() {
        let store = store(Duration::from_secs(1800));
        store.put_index("c1/challenge", "session1").await.unwrap();

        let first = store.take_index("c1/challenge").await.unwrap();
        assert_eq!(first.as_deref(), Some("session1"));

        let second = store.take_index("c1/challenge").await.unwrap();
        assert!(second.is_none());
    }
}
