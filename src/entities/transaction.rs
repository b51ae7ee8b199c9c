//! Transaction entity - A single income or expense entry.
//!
//! Transactions are soft-deleted so the deletion can be mirrored to the remote
//! `transactions` collection. Enum-valued fields are stored as their names.

use super::enums::{RecurringPeriod, SyncStatus, TransactionCategory, TransactionType};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Transaction database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "transactions")]
#[serde(rename_all = "camelCase")]
pub struct Model {
    /// UUID of the transaction, also the remote document id
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    /// Owner of the transaction
    pub user_id: String,
    /// Always positive; the direction comes from `transaction_type`
    pub amount: f64,
    /// [`TransactionCategory`] name
    pub category: String,
    /// [`TransactionType`] name
    pub transaction_type: String,
    /// Free-text description, also used for duplicate detection
    pub description: String,
    /// When the money moved
    pub date: DateTimeUtc,
    /// Whether this repeats
    pub is_recurring: bool,
    /// [`RecurringPeriod`] name when recurring
    pub recurring_period: Option<String>,
    /// Optional user notes
    pub notes: Option<String>,
    /// Soft delete flag
    pub is_deleted: bool,
    /// [`SyncStatus`] name; local bookkeeping only
    #[serde(skip_serializing, default)]
    pub sync_status: String,
    /// Last local modification, used for last-write-wins on pull
    pub updated_at: DateTimeUtc,
}

/// Transactions reference users by id only
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    /// Parsed category
    #[must_use]
    pub fn category(&self) -> TransactionCategory {
        self.category.as_str().into()
    }

    /// Parsed direction
    #[must_use]
    pub fn transaction_type(&self) -> TransactionType {
        self.transaction_type.as_str().into()
    }

    /// Parsed repeat interval, if any
    #[must_use]
    pub fn recurring_period(&self) -> Option<RecurringPeriod> {
        self.recurring_period.as_deref().map(RecurringPeriod::from)
    }

    /// Parsed sync status
    #[must_use]
    pub fn sync_status(&self) -> SyncStatus {
        self.sync_status.as_str().into()
    }

    /// Amount with sign applied: positive for income, negative for expenses.
    ///
    /// Rows of an unrecognised type count as zero, matching how totals skip them.
    #[must_use]
    pub fn signed_amount(&self) -> f64 {
        match self.transaction_type() {
            TransactionType::Income => self.amount,
            TransactionType::Expense => -self.amount,
            TransactionType::Unknown(_) => 0.0,
        }
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::float_cmp)]
    use super::*;
    use crate::test_utils::sample_transaction;

    #[test]
    fn test_signed_amount_by_type() {
        let mut row = sample_transaction("u1", 12.5, "Lunch");
        assert_eq!(row.signed_amount(), -12.5);

        row.transaction_type = TransactionType::Income.to_string();
        assert_eq!(row.signed_amount(), 12.5);

        row.transaction_type = "TRANSFER".to_string();
        assert_eq!(row.signed_amount(), 0.0);
    }
}
