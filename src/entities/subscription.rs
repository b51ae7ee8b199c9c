//! Subscription entity - A recurring charge such as a streaming service.

use super::enums::{BillingCycle, TransactionCategory};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Subscription database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "subscriptions")]
pub struct Model {
    /// UUID of the subscription
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    /// Owner
    pub user_id: String,
    /// Service name
    pub name: String,
    /// Charge per billing cycle
    pub amount: f64,
    /// [`BillingCycle`] name
    pub billing_cycle: String,
    /// Date of the next charge
    pub next_billing_date: Date,
    /// How many days ahead to remind
    pub reminder_days_before: i32,
    /// [`TransactionCategory`] name
    pub category: String,
    /// Cancelled subscriptions are kept but inactive
    pub is_active: bool,
    /// Day the last reminder went out for the current due date
    pub last_reminded: Option<Date>,
}

/// Subscriptions reference users by id only
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    /// Parsed billing cycle
    #[must_use]
    pub fn billing_cycle(&self) -> BillingCycle {
        self.billing_cycle.as_str().into()
    }

    /// Parsed category
    #[must_use]
    pub fn category(&self) -> TransactionCategory {
        self.category.as_str().into()
    }
}
