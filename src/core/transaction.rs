//! Transaction business logic - logging income and expenses.
//!
//! All writes go through [`TransactionRepository`], which stores locally first and
//! mirrors to the remote store. Amounts are stored unsigned; the direction comes from
//! the transaction type.

use crate::{
    entities::{
        enums::{RecurringPeriod, SyncStatus, TransactionCategory, TransactionType},
        transaction,
    },
    errors::{Error, Result},
    repository::TransactionRepository,
};
use chrono::{DateTime, Datelike, NaiveDate, Utc};

/// Input for [`add_transaction`]
#[derive(Debug, Clone)]
pub struct NewTransaction {
    /// Owner
    pub user_id: String,
    /// Positive amount
    pub amount: f64,
    /// Category
    pub category: TransactionCategory,
    /// Income or expense
    pub transaction_type: TransactionType,
    /// Description, required
    pub description: String,
    /// When the money moved
    pub date: DateTime<Utc>,
    /// Repeat interval for recurring entries
    pub recurring_period: Option<RecurringPeriod>,
    /// Optional notes
    pub notes: Option<String>,
}

/// Income, expense and net over some set of transactions
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PeriodTotals {
    /// Sum of income amounts
    pub income: f64,
    /// Sum of expense amounts
    pub expense: f64,
    /// `income - expense`
    pub net: f64,
}

/// Checks the fields every stored transaction needs; returns the trimmed description.
pub(crate) fn validate_fields(amount: f64, description: &str, transaction_type: &TransactionType) -> Result<String> {
    super::ensure_positive(amount)?;
    if transaction_type.is_unknown() {
        return Err(Error::validation(format!(
            "unsupported transaction type {transaction_type}"
        )));
    }
    super::ensure_not_blank(description, "description")
}

/// Validates and stores a new transaction.
pub async fn add_transaction(
    repo: &TransactionRepository,
    input: NewTransaction,
) -> Result<transaction::Model> {
    let description = validate_fields(input.amount, &input.description, &input.transaction_type)?;

    let model = transaction::Model {
        id: super::new_id(),
        user_id: input.user_id,
        amount: input.amount,
        category: input.category.to_string(),
        transaction_type: input.transaction_type.to_string(),
        description,
        date: input.date,
        is_recurring: input.recurring_period.is_some(),
        recurring_period: input.recurring_period.map(String::from),
        notes: input.notes,
        is_deleted: false,
        sync_status: SyncStatus::Pending.to_string(),
        updated_at: Utc::now(),
    };
    repo.insert(model).await
}

/// Validates and saves changes to an existing, non-deleted transaction.
pub async fn update_transaction(
    repo: &TransactionRepository,
    model: transaction::Model,
) -> Result<transaction::Model> {
    let description = validate_fields(model.amount, &model.description, &model.transaction_type())?;

    let existing = repo
        .find_by_id(&model.id)
        .await?
        .filter(|t| !t.is_deleted)
        .ok_or_else(|| Error::not_found("transaction", model.id.as_str()))?;
    if existing.user_id != model.user_id {
        return Err(Error::validation("a transaction cannot change owner"));
    }

    repo.update(transaction::Model {
        description,
        is_recurring: model.recurring_period.is_some(),
        ..model
    })
    .await
}

/// Soft-deletes a transaction.
pub async fn delete_transaction(repo: &TransactionRepository, id: &str) -> Result<()> {
    repo.soft_delete(id).await?;
    Ok(())
}

/// Looks up a transaction, hiding soft-deleted ones.
pub async fn get_transaction(
    repo: &TransactionRepository,
    id: &str,
) -> Result<Option<transaction::Model>> {
    Ok(repo.find_by_id(id).await?.filter(|t| !t.is_deleted))
}

/// A user's transactions, newest first.
pub async fn list_transactions(
    repo: &TransactionRepository,
    user_id: &str,
) -> Result<Vec<transaction::Model>> {
    repo.list_for_user(user_id).await
}

/// Start (inclusive) and end (exclusive) of a calendar month in UTC.
pub fn month_bounds(year: i32, month: u32) -> Result<(DateTime<Utc>, DateTime<Utc>)> {
    let start = NaiveDate::from_ymd_opt(year, month, 1)
        .ok_or_else(|| Error::validation(format!("invalid month {year}-{month}")))?;
    let end = start
        .checked_add_months(chrono::Months::new(1))
        .ok_or_else(|| Error::validation(format!("month out of range {year}-{month}")))?;
    Ok((
        start.and_time(chrono::NaiveTime::MIN).and_utc(),
        end.and_time(chrono::NaiveTime::MIN).and_utc(),
    ))
}

/// Sums income and expenses. Rows with an unknown type are ignored.
#[must_use]
pub fn totals(transactions: &[transaction::Model]) -> PeriodTotals {
    let mut result = PeriodTotals::default();
    for t in transactions {
        match t.transaction_type() {
            TransactionType::Income => result.income += t.amount,
            TransactionType::Expense => result.expense += t.amount,
            TransactionType::Unknown(raw) => {
                tracing::warn!(id = %t.id, kind = %raw, "Skipping transaction with unknown type");
            }
        }
    }
    result.net = result.income - result.expense;
    result
}

/// Income, expense and net for one calendar month.
pub async fn monthly_totals(
    repo: &TransactionRepository,
    user_id: &str,
    year: i32,
    month: u32,
) -> Result<PeriodTotals> {
    let (start, end) = month_bounds(year, month)?;
    let transactions = repo.list_between(user_id, start, end).await?;
    Ok(totals(&transactions))
}

/// Income minus expenses over the user's whole history.
pub async fn current_balance(repo: &TransactionRepository, user_id: &str) -> Result<f64> {
    let transactions = repo.list_for_user(user_id).await?;
    Ok(totals(&transactions).net)
}

/// Totals for the month containing `today`.
pub async fn current_month_totals(
    repo: &TransactionRepository,
    user_id: &str,
    today: NaiveDate,
) -> Result<PeriodTotals> {
    monthly_totals(repo, user_id, today.year(), today.month()).await
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    #![allow(clippy::float_cmp)]
    use super::*;
    use crate::test_utils::*;

    fn expense(user_id: &str, amount: f64, description: &str) -> NewTransaction {
        NewTransaction {
            user_id: user_id.to_string(),
            amount,
            category: TransactionCategory::Food,
            transaction_type: TransactionType::Expense,
            description: description.to_string(),
            date: utc(2024, 3, 10),
            recurring_period: None,
            notes: None,
        }
    }

    fn income(user_id: &str, amount: f64) -> NewTransaction {
        NewTransaction {
            category: TransactionCategory::Salary,
            transaction_type: TransactionType::Income,
            ..expense(user_id, amount, "Salary")
        }
    }

    #[tokio::test]
    async fn test_add_transaction_validation() -> Result<()> {
        let (db, remote) = setup_test_env().await?;
        let repo = TransactionRepository::new(db, remote);

        let result = add_transaction(&repo, expense("u1", 0.0, "Nothing")).await;
        assert!(matches!(result, Err(Error::InvalidAmount { amount: 0.0 })));

        let result = add_transaction(&repo, expense("u1", -5.0, "Negative")).await;
        assert!(matches!(result, Err(Error::InvalidAmount { .. })));

        let result = add_transaction(&repo, expense("u1", f64::NAN, "NaN")).await;
        assert!(matches!(result, Err(Error::InvalidAmount { .. })));

        let result = add_transaction(&repo, expense("u1", 5.0, "   ")).await;
        assert!(matches!(result, Err(Error::Validation { .. })));

        let mut unknown = expense("u1", 5.0, "Odd");
        unknown.transaction_type = TransactionType::from("TRANSFER");
        let result = add_transaction(&repo, unknown).await;
        assert!(matches!(result, Err(Error::Validation { .. })));

        assert!(list_transactions(&repo, "u1").await?.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn test_add_transaction_integration() -> Result<()> {
        let (db, remote) = setup_test_env().await?;
        let repo = TransactionRepository::new(db, remote);

        let mut input = expense("u1", 42.0, "  Groceries ");
        input.recurring_period = Some(RecurringPeriod::Weekly);
        let stored = add_transaction(&repo, input).await?;

        assert_eq!(stored.description, "Groceries");
        assert!(stored.is_recurring);
        assert_eq!(stored.recurring_period(), Some(RecurringPeriod::Weekly));
        assert_eq!(stored.sync_status(), SyncStatus::Synced);
        assert_eq!(stored.signed_amount(), -42.0);
        Ok(())
    }

    #[tokio::test]
    async fn test_update_transaction_rejects_deleted_and_owner_change() -> Result<()> {
        let (db, remote) = setup_test_env().await?;
        let repo = TransactionRepository::new(db, remote);
        let stored = add_transaction(&repo, expense("u1", 10.0, "Taxi")).await?;

        let mut stolen = stored.clone();
        stolen.user_id = "u2".to_string();
        assert!(matches!(
            update_transaction(&repo, stolen).await,
            Err(Error::Validation { .. })
        ));

        let mut edited = stored.clone();
        edited.amount = 12.0;
        let edited = update_transaction(&repo, edited).await?;
        assert_eq!(edited.amount, 12.0);

        delete_transaction(&repo, &stored.id).await?;
        assert!(get_transaction(&repo, &stored.id).await?.is_none());
        assert!(matches!(
            update_transaction(&repo, edited).await,
            Err(Error::NotFound { .. })
        ));
        Ok(())
    }

    #[tokio::test]
    async fn test_monthly_totals_and_balance() -> Result<()> {
        let (db, remote) = setup_test_env().await?;
        let repo = TransactionRepository::new(db, remote);

        add_transaction(&repo, income("u1", 3000.0)).await?;
        add_transaction(&repo, expense("u1", 120.5, "Groceries")).await?;
        add_transaction(&repo, expense("u1", 79.5, "Fuel")).await?;
        let mut april = expense("u1", 50.0, "April");
        april.date = utc(2024, 4, 2);
        add_transaction(&repo, april).await?;
        add_transaction(&repo, expense("u2", 999.0, "Someone else")).await?;

        let march = monthly_totals(&repo, "u1", 2024, 3).await?;
        assert_eq!(march.income, 3000.0);
        assert_eq!(march.expense, 200.0);
        assert_eq!(march.net, 2800.0);

        assert_eq!(current_balance(&repo, "u1").await?, 2750.0);
        Ok(())
    }

    #[test]
    fn test_month_bounds() {
        let (start, end) = month_bounds(2024, 12).unwrap();
        assert_eq!(start, utc(2024, 12, 1));
        assert_eq!(end, utc(2025, 1, 1));
        assert!(month_bounds(2024, 13).is_err());
    }

    #[test]
    fn test_totals_skip_unknown_types() {
        let mut odd = sample_transaction("u1", 500.0, "Mystery");
        odd.transaction_type = "TRANSFER".to_string();
        let spent = sample_transaction("u1", 20.0, "Lunch");

        let result = totals(&[odd, spent]);
        assert_eq!(result.expense, 20.0);
        assert_eq!(result.income, 0.0);
        assert_eq!(result.net, -20.0);
    }
}
