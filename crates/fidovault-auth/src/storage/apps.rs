//! App (OAuth client) directory.

use async_trait::async_trait;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::error::AuthError;

/// Shared reference to an app directory.
pub type DynAppDirectory = Arc<dyn AppDirectory>;

/// A registered app: the OAuth client on whose behalf flows run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct App {
    /// Client id.
    pub id: String,
    /// Account that owns the app; `"system"` for auto-provisioned ones.
    pub owner_id: String,
    /// Human-readable name.
    pub name: String,
    /// Origins allowed to start flows for this app.
    pub origins: Vec<String>,
    /// User attributes the app is entitled to request.
    pub attributes: Vec<String>,
}

impl App {
    /// Returns `true` if the given origin may start flows for this app.
    #[must_use]
    pub fn allows_origin(&self, origin: &str) -> bool {
        self.origins.iter().any(|o| o == origin)
    }
}

/// Lookup and provisioning for registered apps.
///
/// # Contract
///
/// - `upsert` replaces an existing record with the same id.
/// - `find_by_origin` returns the first app claiming the origin; origin
///   ownership is expected to be unique across apps.
#[async_trait]
pub trait AppDirectory: Send + Sync {
    /// Retrieves an app by client id.
    async fn get(&self, id: &str) -> Result<Option<App>, AuthError>;

    /// Retrieves the app registered for an origin.
    async fn find_by_origin(&self, origin: &str) -> Result<Option<App>, AuthError>;

    /// Inserts or replaces an app record.
    async fn upsert(&self, app: App) -> Result<(), AuthError>;
}

/// In-memory app directory.
#[derive(Debug, Default)]
pub struct MemoryAppDirectory {
    apps: DashMap<String, App>,
}

impl MemoryAppDirectory {
    /// Creates an empty directory.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl AppDirectory for MemoryAppDirectory {
    async fn get(&self, id: &str) -> Result<Option<App>, AuthError> {
        Ok(self.apps.get(id).map(|entry| entry.clone()))
    }

    async fn find_by_origin(&self, origin: &str) -> Result<Option<App>, AuthError> {
        Ok(self
            .apps
            .iter()
            .find(|entry| entry.allows_origin(origin))
            .map(|entry| entry.clone()))
    }

    async fn upsert(&self, app: App) -> Result<(), AuthError> {
        self.apps.insert(app.id.clone(), app);
        Ok(())
    }
}
