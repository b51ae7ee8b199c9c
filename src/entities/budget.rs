//! Budget entity - Per-month category allocations.
//!
//! The allocation list is stored as JSON text in a single column. A budget flagged
//! as a template can be copied onto other months.

use super::enums::{SyncStatus, TransactionCategory};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Amount set aside for one category within a budget
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CategoryAllocation {
    /// Category the allocation applies to
    pub category: TransactionCategory,
    /// Amount allocated for the month
    pub amount: f64,
}

/// Budget database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "budgets")]
#[serde(rename_all = "camelCase")]
pub struct Model {
    /// UUID of the budget
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    /// Owner of the budget
    pub user_id: String,
    /// Calendar month, 1-12
    pub month: i32,
    /// Calendar year
    pub year: i32,
    /// JSON-encoded `Vec<CategoryAllocation>`
    pub allocations: String,
    /// Whether this budget is a reusable template
    pub is_template: bool,
    /// Soft delete flag
    pub is_deleted: bool,
    /// [`SyncStatus`] name; local bookkeeping only
    #[serde(skip_serializing, default)]
    pub sync_status: String,
    /// Last local modification
    pub updated_at: DateTimeUtc,
}

/// Budgets reference users by id only
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    /// Decodes the allocation list.
    pub fn allocations(&self) -> crate::errors::Result<Vec<CategoryAllocation>> {
        Ok(serde_json::from_str(&self.allocations)?)
    }

    /// Sum of all allocations.
    pub fn total_allocated(&self) -> crate::errors::Result<f64> {
        Ok(self.allocations()?.iter().map(|a| a.amount).sum())
    }

    /// Parsed sync status
    #[must_use]
    pub fn sync_status(&self) -> SyncStatus {
        self.sync_status.as_str().into()
    }
}

/// Encodes an allocation list for the `allocations` column.
pub fn encode_allocations(allocations: &[CategoryAllocation]) -> crate::errors::Result<String> {
    Ok(serde_json::to_string(allocations)?)
}
