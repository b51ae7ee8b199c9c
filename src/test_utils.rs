//! Shared test utilities for fintrack.
//!
//! This module provides helpers for setting up in-memory databases and a fake
//! remote store, and for building entities with sensible defaults.

use crate::{
    entities::{
        budget::{self, CategoryAllocation},
        enums::{GoalCategory, GoalPriority, SyncStatus, TransactionCategory, TransactionType},
        savings_goal, transaction, user_profile,
    },
    errors::Result,
    remote::MemoryRemoteStore,
};
use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use sea_orm::DatabaseConnection;
use std::sync::Arc;

/// Creates an in-memory `SQLite` database with all tables initialized.
pub async fn setup_test_db() -> Result<DatabaseConnection> {
    let db = sea_orm::Database::connect("sqlite::memory:").await?;
    crate::config::database::create_tables(&db).await?;
    Ok(db)
}

/// Creates a test database plus an online in-memory remote store.
pub async fn setup_test_env() -> Result<(DatabaseConnection, Arc<MemoryRemoteStore>)> {
    let db = setup_test_db().await?;
    Ok((db, Arc::new(MemoryRemoteStore::new())))
}

/// Midnight UTC on the given day.
///
/// # Panics
/// Panics on an invalid date; only meant for literals in tests.
#[must_use]
#[allow(clippy::unwrap_used)]
pub fn utc(year: i32, month: u32, day: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(year, month, day, 0, 0, 0).unwrap()
}

/// A calendar date.
///
/// # Panics
/// Panics on an invalid date; only meant for literals in tests.
#[must_use]
#[allow(clippy::unwrap_used)]
pub fn date(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).unwrap()
}

/// An expense transaction model ready to insert.
///
/// # Defaults
/// * `category`: FOOD
/// * `date`: 2024-03-15
#[must_use]
pub fn sample_transaction(user_id: &str, amount: f64, description: &str) -> transaction::Model {
    transaction::Model {
        id: uuid::Uuid::new_v4().to_string(),
        user_id: user_id.to_string(),
        amount,
        category: TransactionCategory::Food.to_string(),
        transaction_type: TransactionType::Expense.to_string(),
        description: description.to_string(),
        date: utc(2024, 3, 15),
        is_recurring: false,
        recurring_period: None,
        notes: None,
        is_deleted: false,
        sync_status: SyncStatus::Pending.to_string(),
        updated_at: Utc::now(),
    }
}

/// A budget with FOOD 400 and TRANSPORT 150 allocations.
///
/// # Panics
/// Never in practice; encoding a fixed list cannot fail.
#[must_use]
#[allow(clippy::unwrap_used)]
pub fn sample_budget(user_id: &str, month: i32, year: i32) -> budget::Model {
    let allocations = vec![
        CategoryAllocation {
            category: TransactionCategory::Food,
            amount: 400.0,
        },
        CategoryAllocation {
            category: TransactionCategory::Transport,
            amount: 150.0,
        },
    ];
    budget::Model {
        id: uuid::Uuid::new_v4().to_string(),
        user_id: user_id.to_string(),
        month,
        year,
        allocations: budget::encode_allocations(&allocations).unwrap(),
        is_template: false,
        is_deleted: false,
        sync_status: SyncStatus::Pending.to_string(),
        updated_at: Utc::now(),
    }
}

/// A savings goal with nothing saved yet.
#[must_use]
pub fn sample_goal(user_id: &str, name: &str, target_amount: f64) -> savings_goal::Model {
    savings_goal::Model {
        id: uuid::Uuid::new_v4().to_string(),
        user_id: user_id.to_string(),
        name: name.to_string(),
        target_amount,
        current_amount: 0.0,
        deadline: None,
        priority: GoalPriority::Medium.to_string(),
        monthly_contribution: 100.0,
        category: GoalCategory::Other.to_string(),
        is_completed: false,
        last_milestone: 0,
        is_deleted: false,
        sync_status: SyncStatus::Pending.to_string(),
        updated_at: Utc::now(),
    }
}

/// A user profile.
#[must_use]
pub fn sample_profile(user_id: &str) -> user_profile::Model {
    user_profile::Model {
        id: user_id.to_string(),
        display_name: "Test User".to_string(),
        email: "test@example.com".to_string(),
        currency: "USD".to_string(),
        created_at: Utc::now(),
        updated_at: Utc::now(),
        sync_status: SyncStatus::Pending.to_string(),
    }
}
