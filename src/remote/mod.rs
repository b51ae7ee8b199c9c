//! Remote document store seam.
//!
//! The managed backend stores one document per entity, keyed by the entity id, in a
//! handful of collections. Repositories only talk to it through [`RemoteStore`], so the
//! managed client, an HTTP bridge or the in-process [`MemoryRemoteStore`] can be swapped
//! without touching the use-cases.

mod memory;

pub use memory::MemoryRemoteStore;

use crate::errors::Result;
use async_trait::async_trait;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

/// Remote collections mirrored by the repositories
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Collection {
    /// User profiles, keyed by user id
    Users,
    /// Transactions
    Transactions,
    /// Monthly budgets
    Budgets,
    /// Savings goals
    SavingsGoals,
}

impl Collection {
    /// Collection name on the backend
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Users => "users",
            Self::Transactions => "transactions",
            Self::Budgets => "budgets",
            Self::SavingsGoals => "savingsGoals",
        }
    }

    /// Document field holding the owning user id
    #[must_use]
    pub const fn owner_field(self) -> &'static str {
        match self {
            Self::Users => "id",
            Self::Transactions | Self::Budgets | Self::SavingsGoals => "userId",
        }
    }
}

impl std::fmt::Display for Collection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Soft-delete flag used as a query filter
pub const DELETED_FIELD: &str = "isDeleted";

/// Interface to the managed document database.
///
/// Writes are whole-document upserts; concurrent writers resolve by last write wins.
#[async_trait]
pub trait RemoteStore: Send + Sync {
    /// Creates or replaces the document `id` in `collection`
    async fn put(&self, collection: Collection, id: &str, document: Value) -> Result<()>;

    /// Fetches one document
    async fn get(&self, collection: Collection, id: &str) -> Result<Option<Value>>;

    /// All documents owned by `user_id`, optionally including soft-deleted ones
    async fn query_by_user(
        &self,
        collection: Collection,
        user_id: &str,
        include_deleted: bool,
    ) -> Result<Vec<Value>>;
}

/// Serializes an entity into a remote document.
pub fn to_document<T: Serialize>(value: &T) -> Result<Value> {
    Ok(serde_json::to_value(value)?)
}

/// Deserializes a remote document into an entity.
pub fn from_document<T: DeserializeOwned>(document: Value) -> Result<T> {
    Ok(serde_json::from_value(document)?)
}
