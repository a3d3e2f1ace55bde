//! Durable collaborators of the authorization flow: registered apps, user
//! lookup, and consent records. The traits are the seams production
//! deployments back with their own databases; in-memory implementations
//! serve tests and single-node setups.

pub mod apps;
pub mod consent;
pub mod users;

pub use apps::{App, AppDirectory, DynAppDirectory, MemoryAppDirectory};
pub use consent::{
    ConsentRecord, ConsentStatus, ConsentStorage, DynConsentStorage, MemoryConsentStorage,
};
pub use users::{DynUserDirectory, MemoryUserDirectory, User, UserDirectory};
