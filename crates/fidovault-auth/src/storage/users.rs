//! User directory.
//!
//! The authentication subsystem owns user records; this core only needs to
//! resolve a verified email address to a user when completing an
//! email-verified login.

use async_trait::async_trait;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::error::AuthError;

/// Shared reference to a user directory.
pub type DynUserDirectory = Arc<dyn UserDirectory>;

/// The slice of a user record this core consumes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// Internal user id.
    pub id: String,
    /// Primary email address.
    pub email: String,
    /// FIDO credential id, if one is registered.
    pub fido_id: Option<String>,
}

/// Read access to user records.
#[async_trait]
pub trait UserDirectory: Send + Sync {
    /// Resolves a user by verified email address.
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, AuthError>;
}

/// In-memory user directory.
#[derive(Debug, Default)]
pub struct MemoryUserDirectory {
    by_email: DashMap<String, User>,
}

impl MemoryUserDirectory {
    /// Creates an empty directory.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a user.
    pub fn insert(&self, user: User) {
        self.by_email.insert(user.email.clone(), user);
    }
}

#[async_trait]
impl UserDirectory for MemoryUserDirectory {
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, AuthError> {
        Ok(self.by_email.get(email).map(|entry| entry.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_find_by_email() {
        let dir = MemoryUserDirectory::new();
        dir.insert(User {
            id: "u1".to_string(),
            email: "a@b.com".to_string(),
            fido_id: None,
        });

        let found = dir.find_by_email("a@b.com").await.unwrap().unwrap();
        assert_eq!(found.id, "u1");
        assert!(dir.find_by_email("x@b.com").await.unwrap().is_none());
    }
}
