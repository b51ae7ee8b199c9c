//! Database configuration module for fintrack.
//!
//! This module handles the `SQLite` connection and table creation using `SeaORM`.
//! Tables are generated from the entity definitions with
//! `Schema::create_table_from_entity`, so the schema always matches the Rust structs.

use crate::entities::{
    BillReminder, Budget, CustomCategory, EmploymentSettings, Loan, LoanPayment, SavingsGoal,
    Subscription, Transaction, UserProfile, UserSettings,
};
use crate::errors::Result;
use sea_orm::{ConnectionTrait, Database, DatabaseConnection, EntityTrait, Schema};
use std::path::Path;
use tracing::{debug, info};

/// Default location of the local database when neither config nor env sets one.
pub const DEFAULT_DATABASE_URL: &str = "sqlite://data/fintrack.sqlite?mode=rwc";

/// Resolves the database URL: `DATABASE_URL` wins over the configured value.
#[must_use]
pub fn resolve_database_url(configured: Option<&str>) -> String {
    std::env::var("DATABASE_URL").unwrap_or_else(|_| {
        configured.map_or_else(|| DEFAULT_DATABASE_URL.to_string(), str::to_string)
    })
}

/// Creates the directory holding a file-backed `SQLite` database, if needed.
///
/// In-memory URLs and URLs without a parent directory are left alone.
pub fn ensure_parent_dir(database_url: &str) -> Result<()> {
    let Some(path) = database_url.strip_prefix("sqlite://") else {
        return Ok(());
    };
    let path = path.split('?').next().unwrap_or_default();
    if path.is_empty() || path.starts_with(':') {
        return Ok(());
    }
    if let Some(parent) = Path::new(path).parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
        debug!("Ensured database directory {}", parent.display());
    }
    Ok(())
}

/// Establishes a connection to the `SQLite` database at `database_url`.
pub async fn create_connection(database_url: &str) -> Result<DatabaseConnection> {
    debug!("Connecting to database at {database_url}");
    Database::connect(database_url).await.map_err(Into::into)
}

async fn create_table<E>(db: &DatabaseConnection, schema: &Schema, entity: E) -> Result<()>
where
    E: EntityTrait,
{
    let builder = db.get_database_backend();
    let mut statement = schema.create_table_from_entity(entity);
    statement.if_not_exists();
    db.execute(builder.build(&statement)).await?;
    Ok(())
}

/// Creates all local tables if they do not exist yet.
///
/// Covers transactions, budgets, savings goals, loans and their payments,
/// subscriptions, bill reminders, user profiles and the three settings tables.
pub async fn create_tables(db: &DatabaseConnection) -> Result<()> {
    let schema = Schema::new(db.get_database_backend());

    create_table(db, &schema, Transaction).await?;
    create_table(db, &schema, Budget).await?;
    create_table(db, &schema, SavingsGoal).await?;
    create_table(db, &schema, Loan).await?;
    create_table(db, &schema, LoanPayment).await?;
    create_table(db, &schema, Subscription).await?;
    create_table(db, &schema, BillReminder).await?;
    create_table(db, &schema, UserProfile).await?;
    create_table(db, &schema, UserSettings).await?;
    create_table(db, &schema, EmploymentSettings).await?;
    create_table(db, &schema, CustomCategory).await?;

    info!("Database tables ensured");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::{
        budget::Model as BudgetModel, loan_payment::Model as LoanPaymentModel,
        transaction::Model as TransactionModel, user_settings::Model as UserSettingsModel,
    };
    use sea_orm::QuerySelect;

    #[tokio::test]
    async fn test_create_tables() -> Result<()> {
        let db = Database::connect("sqlite::memory:").await?;
        create_tables(&db).await?;

        // Test that tables exist by querying them
        let _: Vec<TransactionModel> = Transaction::find().limit(1).all(&db).await?;
        let _: Vec<BudgetModel> = Budget::find().limit(1).all(&db).await?;
        let _: Vec<LoanPaymentModel> = LoanPayment::find().limit(1).all(&db).await?;
        let _: Vec<UserSettingsModel> = UserSettings::find().limit(1).all(&db).await?;

        Ok(())
    }

    #[tokio::test]
    async fn test_create_tables_is_idempotent() -> Result<()> {
        let db = Database::connect("sqlite::memory:").await?;
        create_tables(&db).await?;
        create_tables(&db).await?;
        Ok(())
    }

    #[test]
    fn test_ensure_parent_dir_creates_data_directory() -> Result<()> {
        let temp = tempfile::tempdir()?;
        let nested = temp.path().join("data").join("fintrack.sqlite");
        let url = format!("sqlite://{}?mode=rwc", nested.display());

        ensure_parent_dir(&url)?;
        assert!(temp.path().join("data").is_dir());

        // Nothing to create for in-memory databases
        ensure_parent_dir("sqlite::memory:")?;
        Ok(())
    }

    #[test]
    fn test_resolve_database_url_prefers_configured_over_default() {
        if std::env::var("DATABASE_URL").is_err() {
            assert_eq!(
                resolve_database_url(Some("sqlite::memory:")),
                "sqlite::memory:"
            );
            assert_eq!(resolve_database_url(None), DEFAULT_DATABASE_URL);
        }
    }
}
