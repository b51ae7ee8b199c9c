//! Core business logic - framework-agnostic use-cases.
//!
//! Each public async function validates its input and then performs one repository
//! (or local table) operation. Pure calculations live next to the use-cases that
//! need them so they can be tested without a database.

/// Monthly budgets, templates and budget-vs-actual overviews
pub mod budget;
/// Savings goals, contributions and milestone tracking
pub mod goal;
/// Buffering and de-duplication of parsed transactions
pub mod import;
/// Loans, payment breakdowns and seeded schedules
pub mod loan;
/// Subscriptions, bills and upcoming reminders
pub mod reminder;
/// Profiles, user settings, employment settings and custom categories
pub mod settings;
/// Transaction logging and totals
pub mod transaction;

use crate::errors::{Error, Result};

/// Rejects zero, negative, NaN and infinite amounts.
pub fn ensure_positive(amount: f64) -> Result<()> {
    if !amount.is_finite() || amount <= 0.0 {
        return Err(Error::InvalidAmount { amount });
    }
    Ok(())
}

/// Rejects negative, NaN and infinite amounts; zero is allowed.
pub fn ensure_non_negative(amount: f64) -> Result<()> {
    if !amount.is_finite() || amount < 0.0 {
        return Err(Error::InvalidAmount { amount });
    }
    Ok(())
}

/// Rejects empty or whitespace-only text, returning it trimmed.
pub fn ensure_not_blank(value: &str, field: &str) -> Result<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(Error::validation(format!("{field} cannot be empty")));
    }
    Ok(trimmed.to_string())
}

/// New random record id.
#[must_use]
pub fn new_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_amount_guards() {
        assert!(ensure_positive(0.01).is_ok());
        assert!(matches!(
            ensure_positive(0.0),
            Err(Error::InvalidAmount { .. })
        ));
        assert!(ensure_positive(f64::NAN).is_err());
        assert!(ensure_non_negative(0.0).is_ok());
        assert!(ensure_non_negative(-1.0).is_err());
        assert!(ensure_non_negative(f64::INFINITY).is_err());
    }

    #[test]
    fn test_blank_guard_trims() {
        assert_eq!(ensure_not_blank("  Rent ", "name").ok().as_deref(), Some("Rent"));
        assert!(matches!(
            ensure_not_blank("   ", "name"),
            Err(Error::Validation { .. })
        ));
    }
}
