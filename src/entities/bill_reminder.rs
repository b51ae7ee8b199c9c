//! Bill reminder entity - A bill with a due date, optionally repeating.

use super::enums::RecurringPeriod;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Bill reminder database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "bill_reminders")]
pub struct Model {
    /// UUID of the bill
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    /// Owner
    pub user_id: String,
    /// Bill name
    pub name: String,
    /// Amount due
    pub amount: f64,
    /// Date the bill is due
    pub due_date: Date,
    /// [`RecurringPeriod`] name for repeating bills
    pub recurrence: Option<String>,
    /// How many days ahead to remind
    pub reminder_days_before: i32,
    /// Paid one-off bills stay paid; recurring bills roll forward instead
    pub is_paid: bool,
    /// Day the last reminder went out for the current due date
    pub last_reminded: Option<Date>,
}

/// Bills reference users by id only
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    /// Parsed recurrence, if any
    #[must_use]
    pub fn recurrence(&self) -> Option<RecurringPeriod> {
        self.recurrence.as_deref().map(RecurringPeriod::from)
    }
}
