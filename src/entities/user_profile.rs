//! User profile entity - Mirrored to the remote `users` collection.

use super::enums::SyncStatus;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// User profile database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "user_profiles")]
#[serde(rename_all = "camelCase")]
pub struct Model {
    /// User id issued by the auth backend
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    /// Name shown in the app
    pub display_name: String,
    /// Contact email
    pub email: String,
    /// Preferred ISO currency code
    pub currency: String,
    /// When the profile was created
    pub created_at: DateTimeUtc,
    /// Last local modification
    pub updated_at: DateTimeUtc,
    /// [`SyncStatus`] name; local bookkeeping only
    #[serde(skip_serializing, default)]
    pub sync_status: String,
}

/// Profiles have no relations
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    /// Parsed sync status
    #[must_use]
    pub fn sync_status(&self) -> SyncStatus {
        self.sync_status.as_str().into()
    }
}
