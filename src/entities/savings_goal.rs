//! Savings goal entity - A target amount the user is saving towards.

use super::enums::{GoalCategory, GoalPriority, SyncStatus};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Savings goal database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "savings_goals")]
#[serde(rename_all = "camelCase")]
pub struct Model {
    /// UUID of the goal
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    /// Owner of the goal
    pub user_id: String,
    /// Display name
    pub name: String,
    /// Amount to reach
    pub target_amount: f64,
    /// Amount saved so far
    pub current_amount: f64,
    /// Optional date the goal should be reached by
    pub deadline: Option<Date>,
    /// [`GoalPriority`] name
    pub priority: String,
    /// Planned monthly contribution
    pub monthly_contribution: f64,
    /// [`GoalCategory`] name
    pub category: String,
    /// Set once `current_amount` reaches `target_amount`
    pub is_completed: bool,
    /// Highest progress milestone (percent) already notified
    pub last_milestone: i32,
    /// Soft delete flag
    pub is_deleted: bool,
    /// [`SyncStatus`] name; local bookkeeping only
    #[serde(skip_serializing, default)]
    pub sync_status: String,
    /// Last local modification
    pub updated_at: DateTimeUtc,
}

/// Goals reference users by id only
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    /// Parsed priority
    #[must_use]
    pub fn priority(&self) -> GoalPriority {
        self.priority.as_str().into()
    }

    /// Parsed category
    #[must_use]
    pub fn category(&self) -> GoalCategory {
        self.category.as_str().into()
    }

    /// Parsed sync status
    #[must_use]
    pub fn sync_status(&self) -> SyncStatus {
        self.sync_status.as_str().into()
    }
}
