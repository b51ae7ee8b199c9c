//! Loan business logic - payment breakdowns, payment recording and payoff tracking.
//!
//! A payment is split into interest (charged on the remaining balance at the monthly
//! rate) and principal (what reduces the balance). Every recorded payment must satisfy
//! `principal + interest == amount` to the cent; anything else is rejected before it
//! reaches the database.

use crate::{
    config::LoanSeed,
    entities::{Loan, LoanPayment, enums::LoanType, loan, loan_payment},
    errors::{Error, Result},
};
use chrono::{Months, NaiveDate};
use sea_orm::{QueryOrder, Set, TransactionTrait, prelude::*};
use tracing::{info, warn};

/// Largest allowed gap between `principal + interest` and the payment amount.
pub const SPLIT_TOLERANCE: f64 = 0.005;

/// Upper bound for payoff simulations (100 years).
const MAX_PAYOFF_MONTHS: u32 = 1200;

/// Interest and principal parts of one payment
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PaymentBreakdown {
    /// Interest accrued on the remaining balance for one month
    pub interest: f64,
    /// Portion of the payment that reduces the balance
    pub principal: f64,
}

/// Converts an annual percentage (6.66) into a monthly fraction (0.00555).
#[must_use]
pub fn monthly_rate(annual_percent: f64) -> f64 {
    annual_percent / 12.0 / 100.0
}

/// Splits `payment` into interest and principal.
///
/// `interest = remaining_balance * monthly_rate` and
/// `principal = min(payment - interest, remaining_balance)`.
/// Inputs are not validated; callers pass non-negative values.
#[must_use]
pub fn payment_breakdown(payment: f64, remaining_balance: f64, monthly_rate: f64) -> PaymentBreakdown {
    let interest = remaining_balance * monthly_rate;
    let principal = (payment - interest).min(remaining_balance);
    PaymentBreakdown {
        interest,
        principal,
    }
}

/// Rejects a payment whose principal and interest do not add up to its amount.
pub fn validate_payment_split(amount: f64, principal: f64, interest: f64) -> Result<()> {
    super::ensure_positive(amount)?;
    super::ensure_non_negative(principal)?;
    super::ensure_non_negative(interest)?;
    if (principal + interest - amount).abs() >= SPLIT_TOLERANCE {
        return Err(Error::PaymentMismatch {
            amount,
            principal,
            interest,
        });
    }
    Ok(())
}

/// Months until a balance is paid off at a fixed payment, or `None` if the payment
/// never covers the interest.
#[must_use]
pub fn estimate_payoff_months(balance: f64, annual_percent: f64, payment: f64) -> Option<u32> {
    let rate = monthly_rate(annual_percent);
    let mut remaining = balance;
    let mut months = 0;
    while remaining > SPLIT_TOLERANCE {
        let split = payment_breakdown(payment, remaining, rate);
        if split.principal <= 0.0 || months >= MAX_PAYOFF_MONTHS {
            return None;
        }
        remaining -= split.principal;
        months += 1;
    }
    Some(months)
}

fn round_cents(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Input for [`create_loan`]
#[derive(Debug, Clone)]
pub struct NewLoan {
    /// Owner
    pub user_id: String,
    /// Display name
    pub name: String,
    /// Principal borrowed
    pub original_amount: f64,
    /// Balance still owed; defaults to `original_amount`
    pub remaining_amount: Option<f64>,
    /// Annual rate in percent
    pub interest_rate: f64,
    /// Scheduled monthly payment
    pub monthly_payment: f64,
    /// ISO currency code
    pub currency: String,
    /// First day of the loan
    pub start_date: NaiveDate,
    /// Kind of loan
    pub loan_type: LoanType,
}

/// Validates and stores a new loan.
pub async fn create_loan(db: &DatabaseConnection, input: NewLoan) -> Result<loan::Model> {
    let name = super::ensure_not_blank(&input.name, "loan name")?;
    super::ensure_positive(input.original_amount)?;
    super::ensure_non_negative(input.interest_rate)?;
    super::ensure_positive(input.monthly_payment)?;
    let remaining = input.remaining_amount.unwrap_or(input.original_amount);
    super::ensure_non_negative(remaining)?;
    if remaining > input.original_amount {
        return Err(Error::validation(
            "remaining amount cannot exceed the original amount",
        ));
    }

    let loan = loan::ActiveModel {
        id: Set(super::new_id()),
        user_id: Set(input.user_id),
        name: Set(name),
        original_amount: Set(input.original_amount),
        remaining_amount: Set(remaining),
        interest_rate: Set(input.interest_rate),
        monthly_payment: Set(input.monthly_payment),
        currency: Set(input.currency),
        start_date: Set(input.start_date),
        payoff_date: Set(None),
        loan_type: Set(input.loan_type.to_string()),
    };
    Ok(loan.insert(db).await?)
}

/// Finds a loan by id.
pub async fn get_loan(db: &DatabaseConnection, loan_id: &str) -> Result<Option<loan::Model>> {
    Loan::find_by_id(loan_id.to_string())
        .one(db)
        .await
        .map_err(Into::into)
}

/// A user's loans, largest remaining balance first.
pub async fn list_loans(db: &DatabaseConnection, user_id: &str) -> Result<Vec<loan::Model>> {
    Loan::find()
        .filter(loan::Column::UserId.eq(user_id))
        .order_by_desc(loan::Column::RemainingAmount)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Deletes a loan together with its payments.
pub async fn delete_loan(db: &DatabaseConnection, loan_id: &str) -> Result<()> {
    let txn = db.begin().await?;
    LoanPayment::delete_many()
        .filter(loan_payment::Column::LoanId.eq(loan_id))
        .exec(&txn)
        .await?;
    let result = Loan::delete_by_id(loan_id.to_string()).exec(&txn).await?;
    if result.rows_affected == 0 {
        return Err(Error::not_found("loan", loan_id));
    }
    txn.commit().await?;
    Ok(())
}

/// Input for [`record_payment`]
#[derive(Debug, Clone)]
pub struct NewLoanPayment {
    /// Loan being paid
    pub loan_id: String,
    /// Total paid
    pub amount: f64,
    /// Principal portion
    pub principal: f64,
    /// Interest portion
    pub interest: f64,
    /// Date paid
    pub payment_date: NaiveDate,
    /// Paid on top of the schedule
    pub is_extra_payment: bool,
    /// Conversion rate when paid in another currency
    pub exchange_rate: f64,
    /// Optional note
    pub notes: Option<String>,
}

/// Inserts a payment and reduces the loan balance by its principal.
///
/// Must run inside a database transaction so both rows change together.
async fn apply_payment<C>(
    conn: &C,
    loan: loan::Model,
    payment_id: String,
    input: NewLoanPayment,
) -> Result<loan_payment::Model>
where
    C: ConnectionTrait,
{
    validate_payment_split(input.amount, input.principal, input.interest)?;
    if !input.exchange_rate.is_finite() || input.exchange_rate <= 0.0 {
        return Err(Error::validation("exchange rate must be positive"));
    }
    if input.principal > loan.remaining_amount + SPLIT_TOLERANCE {
        return Err(Error::validation(format!(
            "principal {:.2} exceeds remaining balance {:.2}",
            input.principal, loan.remaining_amount
        )));
    }

    let payment = loan_payment::ActiveModel {
        id: Set(payment_id),
        loan_id: Set(loan.id.clone()),
        amount: Set(input.amount),
        principal_amount: Set(input.principal),
        interest_amount: Set(input.interest),
        payment_date: Set(input.payment_date),
        is_extra_payment: Set(input.is_extra_payment),
        exchange_rate: Set(input.exchange_rate),
        notes: Set(input.notes),
    }
    .insert(conn)
    .await?;

    let remaining = round_cents((loan.remaining_amount - input.principal).max(0.0));
    let mut active: loan::ActiveModel = loan.into();
    active.remaining_amount = Set(remaining);
    if remaining <= 0.0 {
        active.payoff_date = Set(Some(input.payment_date));
    }
    active.update(conn).await?;

    Ok(payment)
}

/// Records a payment whose split the caller supplies.
///
/// Rejected with [`Error::PaymentMismatch`] when principal + interest differs from the
/// amount.
pub async fn record_payment(
    db: &DatabaseConnection,
    input: NewLoanPayment,
) -> Result<loan_payment::Model> {
    // Validate before touching the database
    validate_payment_split(input.amount, input.principal, input.interest)?;

    let txn = db.begin().await?;
    let loan = Loan::find_by_id(input.loan_id.clone())
        .one(&txn)
        .await?
        .ok_or_else(|| Error::not_found("loan", input.loan_id.as_str()))?;

    let payment = apply_payment(&txn, loan, super::new_id(), input).await?;
    txn.commit().await?;
    Ok(payment)
}

/// Records a payment, computing the split from the loan's balance and rate.
pub async fn record_payment_auto(
    db: &DatabaseConnection,
    loan_id: &str,
    amount: f64,
    payment_date: NaiveDate,
    is_extra_payment: bool,
) -> Result<loan_payment::Model> {
    super::ensure_positive(amount)?;
    let loan = get_loan(db, loan_id)
        .await?
        .ok_or_else(|| Error::not_found("loan", loan_id))?;

    let split = if is_extra_payment {
        // Extra payments go straight to principal
        PaymentBreakdown {
            interest: 0.0,
            principal: amount.min(loan.remaining_amount),
        }
    } else {
        payment_breakdown(amount, loan.remaining_amount, monthly_rate(loan.interest_rate))
    };
    let interest = round_cents(split.interest);
    let principal = round_cents(split.principal);

    record_payment(
        db,
        NewLoanPayment {
            loan_id: loan_id.to_string(),
            amount: round_cents(principal + interest),
            principal,
            interest,
            payment_date,
            is_extra_payment,
            exchange_rate: 1.0,
            notes: None,
        },
    )
    .await
}

/// Payments for a loan, oldest first.
pub async fn list_payments(
    db: &DatabaseConnection,
    loan_id: &str,
) -> Result<Vec<loan_payment::Model>> {
    LoanPayment::find()
        .filter(loan_payment::Column::LoanId.eq(loan_id))
        .order_by_asc(loan_payment::Column::PaymentDate)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Payoff progress for one loan
#[derive(Debug, Clone, PartialEq)]
pub struct LoanSummary {
    /// The loan
    pub loan: loan::Model,
    /// Number of payments recorded
    pub payment_count: usize,
    /// Sum of all payments
    pub total_paid: f64,
    /// Sum of interest portions
    pub interest_paid: f64,
    /// Sum of principal portions
    pub principal_paid: f64,
    /// Share of the original amount repaid, 0-100
    pub percent_paid: f64,
    /// Months left at the scheduled payment
    pub months_remaining: Option<u32>,
}

/// Aggregates a loan's payment history.
pub async fn loan_summary(db: &DatabaseConnection, loan_id: &str) -> Result<LoanSummary> {
    let loan = get_loan(db, loan_id)
        .await?
        .ok_or_else(|| Error::not_found("loan", loan_id))?;
    let payments = list_payments(db, loan_id).await?;

    let total_paid = payments.iter().map(|p| p.amount).sum();
    let interest_paid = payments.iter().map(|p| p.interest_amount).sum();
    let principal_paid = payments.iter().map(|p| p.principal_amount).sum();
    let percent_paid = if loan.original_amount > 0.0 {
        ((loan.original_amount - loan.remaining_amount) / loan.original_amount * 100.0)
            .clamp(0.0, 100.0)
    } else {
        0.0
    };
    let months_remaining =
        estimate_payoff_months(loan.remaining_amount, loan.interest_rate, loan.monthly_payment);

    Ok(LoanSummary {
        payment_count: payments.len(),
        total_paid,
        interest_paid,
        principal_paid,
        percent_paid,
        months_remaining,
        loan,
    })
}

/// Seeds configured loans and their literal schedules.
///
/// Loans that already exist are left alone, so this is safe to run on every start.
/// Returns the number of loans created.
pub async fn seed_loans(db: &DatabaseConnection, seeds: &[LoanSeed]) -> Result<usize> {
    let mut created = 0;
    for seed in seeds {
        if get_loan(db, &seed.id).await?.is_some() {
            continue;
        }
        let loan_type = LoanType::from(seed.loan_type.as_str());
        if loan_type.is_unknown() {
            warn!(loan = %seed.id, loan_type = %loan_type, "Seeding loan with unknown type");
        }

        let txn = db.begin().await?;
        let mut loan = loan::ActiveModel {
            id: Set(seed.id.clone()),
            user_id: Set(seed.user_id.clone()),
            name: Set(seed.name.clone()),
            original_amount: Set(seed.original_amount),
            remaining_amount: Set(seed.opening_balance),
            interest_rate: Set(seed.interest_rate),
            monthly_payment: Set(seed.monthly_payment),
            currency: Set(seed.currency.clone()),
            start_date: Set(seed.start_date),
            payoff_date: Set(None),
            loan_type: Set(loan_type.to_string()),
        }
        .insert(&txn)
        .await?;

        for row in &seed.schedule {
            let payment_date = seed
                .start_date
                .checked_add_months(Months::new(row.month.saturating_sub(1)))
                .ok_or_else(|| Error::Config {
                    message: format!("schedule month {} out of range", row.month),
                })?;
            apply_payment(
                &txn,
                loan.clone(),
                format!("{}-{:02}", seed.id, row.month),
                NewLoanPayment {
                    loan_id: seed.id.clone(),
                    amount: row.payment,
                    principal: row.principal,
                    interest: row.interest,
                    payment_date,
                    is_extra_payment: false,
                    exchange_rate: 1.0,
                    notes: Some(format!("Scheduled payment {}", row.month)),
                },
            )
            .await?;
            loan = Loan::find_by_id(seed.id.clone())
                .one(&txn)
                .await?
                .ok_or_else(|| Error::not_found("loan", seed.id.as_str()))?;
        }

        txn.commit().await?;
        info!(
            loan = %seed.id,
            payments = seed.schedule.len(),
            remaining = loan.remaining_amount,
            "Seeded loan schedule"
        );
        created += 1;
    }
    Ok(created)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    #![allow(clippy::float_cmp)]
    use super::*;
    use crate::config::ScheduleRow;
    use crate::test_utils::*;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 0.01
    }

    fn new_loan(remaining: f64) -> NewLoan {
        NewLoan {
            user_id: "u1".to_string(),
            name: "Car loan".to_string(),
            original_amount: 15_000.0,
            remaining_amount: Some(remaining),
            interest_rate: 6.66,
            monthly_payment: 900.0,
            currency: "USD".to_string(),
            start_date: date(2024, 1, 1),
            loan_type: LoanType::Auto,
        }
    }

    fn payment(loan_id: &str, amount: f64, principal: f64, interest: f64) -> NewLoanPayment {
        NewLoanPayment {
            loan_id: loan_id.to_string(),
            amount,
            principal,
            interest,
            payment_date: date(2024, 2, 1),
            is_extra_payment: false,
            exchange_rate: 1.0,
            notes: None,
        }
    }

    #[test]
    fn test_breakdown_matches_first_scheduled_row() {
        let rate = monthly_rate(6.66);
        assert!((rate - 0.00555).abs() < 1e-12);

        let split = payment_breakdown(900.0, 10_317.64, 0.00555);
        assert_eq!(split.interest, 10_317.64 * 0.00555);
        assert!(close(split.interest, 57.26));
        assert!(close(split.principal, 842.74));
    }

    #[test]
    fn test_breakdown_principal_is_payment_minus_interest() {
        let split = payment_breakdown(500.0, 2000.0, 0.01);
        assert_eq!(split.interest, 20.0);
        assert_eq!(split.principal, 480.0);
    }

    #[test]
    fn test_breakdown_caps_principal_at_balance() {
        let split = payment_breakdown(900.0, 785.96, 0.00555);
        assert_eq!(split.principal, 785.96);
        assert!(close(split.interest, 4.36));
    }

    #[test]
    fn test_breakdown_zero_rate_and_zero_balance() {
        let split = payment_breakdown(100.0, 1000.0, 0.0);
        assert_eq!(split.interest, 0.0);
        assert_eq!(split.principal, 100.0);

        let split = payment_breakdown(100.0, 0.0, 0.01);
        assert_eq!(split.interest, 0.0);
        assert_eq!(split.principal, 0.0);
    }

    #[test]
    fn test_validate_payment_split() {
        assert!(validate_payment_split(900.0, 842.74, 57.26).is_ok());
        assert!(matches!(
            validate_payment_split(900.0, 800.0, 57.26),
            Err(Error::PaymentMismatch { .. })
        ));
        assert!(matches!(
            validate_payment_split(0.0, 0.0, 0.0),
            Err(Error::InvalidAmount { .. })
        ));
    }

    #[test]
    fn test_estimate_payoff_months() {
        assert_eq!(estimate_payoff_months(10_317.64, 6.66, 900.0), Some(12));
        assert_eq!(estimate_payoff_months(0.0, 6.66, 900.0), Some(0));
        // Payment does not even cover the interest
        assert_eq!(estimate_payoff_months(100_000.0, 12.0, 500.0), None);
    }

    #[tokio::test]
    async fn test_record_payment_checks_split_before_lookup() -> Result<()> {
        let db = setup_test_db().await?;
        // The loan does not exist; the split is checked first
        let result = record_payment(&db, payment("loan", 900.0, 800.0, 57.26)).await;
        assert!(matches!(result, Err(Error::PaymentMismatch { .. })));
        Ok(())
    }

    #[tokio::test]
    async fn test_record_payment_reduces_balance() -> Result<()> {
        let db = setup_test_db().await?;
        let loan = create_loan(&db, new_loan(10_317.64)).await?;

        let paid = record_payment(&db, payment(&loan.id, 900.0, 842.74, 57.26)).await?;
        assert_eq!(paid.principal_amount, 842.74);

        let loan = get_loan(&db, &loan.id).await?.unwrap();
        assert_eq!(loan.remaining_amount, 9474.9);
        assert!(loan.payoff_date.is_none());
        Ok(())
    }

    #[tokio::test]
    async fn test_record_payment_rejects_principal_above_balance() -> Result<()> {
        let db = setup_test_db().await?;
        let loan = create_loan(&db, new_loan(100.0)).await?;

        let result = record_payment(&db, payment(&loan.id, 200.0, 200.0, 0.0)).await;
        assert!(matches!(result, Err(Error::Validation { .. })));
        assert!(list_payments(&db, &loan.id).await?.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn test_record_payment_auto_pays_off_loan() -> Result<()> {
        let db = setup_test_db().await?;
        let loan = create_loan(&db, new_loan(785.96)).await?;

        let paid = record_payment_auto(&db, &loan.id, 900.0, date(2024, 12, 1), false).await?;
        assert_eq!(paid.principal_amount, 785.96);
        assert_eq!(paid.interest_amount, 4.36);
        assert_eq!(paid.amount, 790.32);

        let loan = get_loan(&db, &loan.id).await?.unwrap();
        assert_eq!(loan.remaining_amount, 0.0);
        assert_eq!(loan.payoff_date, Some(date(2024, 12, 1)));
        Ok(())
    }

    #[tokio::test]
    async fn test_record_payment_missing_loan() -> Result<()> {
        let db = setup_test_db().await?;
        let result = record_payment(&db, payment("missing", 10.0, 10.0, 0.0)).await;
        assert!(matches!(result, Err(Error::NotFound { .. })));
        Ok(())
    }

    #[tokio::test]
    async fn test_create_loan_validation() -> Result<()> {
        let db = setup_test_db().await?;
        let result = create_loan(&db, new_loan(20_000.0)).await;
        assert!(matches!(result, Err(Error::Validation { .. })));

        let mut blank = new_loan(100.0);
        blank.name = " ".to_string();
        assert!(matches!(
            create_loan(&db, blank).await,
            Err(Error::Validation { .. })
        ));
        assert!(list_loans(&db, "u1").await?.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn test_seed_loans_is_idempotent_and_sums_schedule() -> Result<()> {
        let db = setup_test_db().await?;
        let seed = LoanSeed {
            id: "car-loan".to_string(),
            user_id: "u1".to_string(),
            name: "Car loan".to_string(),
            original_amount: 15_000.0,
            opening_balance: 10_317.64,
            interest_rate: 6.66,
            monthly_payment: 900.0,
            currency: "USD".to_string(),
            start_date: date(2024, 1, 1),
            loan_type: "AUTO".to_string(),
            schedule: vec![
                ScheduleRow {
                    month: 1,
                    payment: 900.0,
                    interest: 57.26,
                    principal: 842.74,
                },
                ScheduleRow {
                    month: 2,
                    payment: 900.0,
                    interest: 52.59,
                    principal: 847.41,
                },
            ],
        };

        assert_eq!(seed_loans(&db, std::slice::from_ref(&seed)).await?, 1);
        assert_eq!(seed_loans(&db, std::slice::from_ref(&seed)).await?, 0);

        let summary = loan_summary(&db, "car-loan").await?;
        assert_eq!(summary.payment_count, 2);
        assert!(close(summary.interest_paid, 109.85));
        assert_eq!(summary.loan.remaining_amount, 8627.49);
        assert_eq!(summary.loan.loan_type(), LoanType::Auto);

        let payments = list_payments(&db, "car-loan").await?;
        assert_eq!(payments[1].id, "car-loan-02");
        assert_eq!(payments[1].payment_date, date(2024, 2, 1));
        Ok(())
    }

    #[tokio::test]
    async fn test_seed_rejects_inconsistent_row() -> Result<()> {
        let db = setup_test_db().await?;
        let seed = LoanSeed {
            id: "bad".to_string(),
            user_id: "u1".to_string(),
            name: "Bad".to_string(),
            original_amount: 1000.0,
            opening_balance: 1000.0,
            interest_rate: 0.0,
            monthly_payment: 100.0,
            currency: "USD".to_string(),
            start_date: date(2024, 1, 1),
            loan_type: "PERSONAL".to_string(),
            schedule: vec![ScheduleRow {
                month: 1,
                payment: 100.0,
                interest: 0.0,
                principal: 90.0,
            }],
        };

        let result = seed_loans(&db, &[seed]).await;
        assert!(matches!(result, Err(Error::PaymentMismatch { .. })));
        // The whole seed rolled back
        assert!(get_loan(&db, "bad").await?.is_none());
        Ok(())
    }

    #[tokio::test]
    async fn test_delete_loan_removes_payments() -> Result<()> {
        let db = setup_test_db().await?;
        let loan = create_loan(&db, new_loan(1000.0)).await?;
        record_payment(&db, payment(&loan.id, 100.0, 100.0, 0.0)).await?;

        delete_loan(&db, &loan.id).await?;
        assert!(get_loan(&db, &loan.id).await?.is_none());
        assert!(list_payments(&db, &loan.id).await?.is_empty());
        assert!(matches!(
            delete_loan(&db, &loan.id).await,
            Err(Error::NotFound { .. })
        ));
        Ok(())
    }
}
