//! Custom category entity - User-defined categories next to the built-in ones.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Custom category database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "custom_categories")]
pub struct Model {
    /// UUID of the category
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    /// Owner
    pub user_id: String,
    /// Display name, unique per user ignoring case
    pub name: String,
    /// `TransactionType` name this category applies to
    pub transaction_type: String,
    /// Optional icon identifier
    pub icon: Option<String>,
}

/// Custom categories reference users by id only
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
