//! User settings entity - Preferences that drive alerts and display.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// User settings database model, one row per user
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "user_settings")]
pub struct Model {
    /// Owner
    #[sea_orm(primary_key, auto_increment = false)]
    pub user_id: String,
    /// Display currency
    pub currency: String,
    /// Balance below which a low-balance alert fires
    pub low_balance_threshold: f64,
    /// Master switch for notifications
    pub notifications_enabled: bool,
    /// Budget overrun alerts
    pub budget_alerts_enabled: bool,
    /// Savings milestone alerts
    pub goal_alerts_enabled: bool,
    /// Bill and subscription reminders
    pub bill_reminders_enabled: bool,
}

/// Settings have no relations
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
