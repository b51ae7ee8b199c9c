//! Profiles, preferences, employment details and custom categories.

use crate::{
    entities::{
        CustomCategory, EmploymentSettings, UserSettings, custom_category,
        employment_settings,
        enums::{EmploymentType, SyncStatus, TransactionType},
        user_profile, user_settings,
    },
    errors::{Error, Result},
    repository::UserProfileRepository,
};
use chrono::Utc;
use sea_orm::{QueryOrder, Set, prelude::*};
use tracing::info;

/// Currency used when a user has not picked one
pub const DEFAULT_CURRENCY: &str = "USD";

fn validate_currency(code: &str) -> Result<String> {
    let code = code.trim().to_ascii_uppercase();
    if code.len() != 3 || !code.chars().all(|c| c.is_ascii_alphabetic()) {
        return Err(Error::validation(format!(
            "currency must be a 3-letter code, got {code:?}"
        )));
    }
    Ok(code)
}

fn validate_email(email: &str) -> Result<String> {
    let email = super::ensure_not_blank(email, "email")?;
    match email.split_once('@') {
        Some((local, domain)) if !local.is_empty() && !domain.is_empty() => Ok(email),
        _ => Err(Error::validation(format!("invalid email address {email:?}"))),
    }
}

/// Creates or replaces a user's profile.
pub async fn save_profile(
    repo: &UserProfileRepository,
    user_id: &str,
    display_name: &str,
    email: &str,
    currency: &str,
) -> Result<user_profile::Model> {
    let display_name = super::ensure_not_blank(display_name, "display name")?;
    let email = validate_email(email)?;
    let currency = validate_currency(currency)?;

    let created_at = repo
        .find_by_id(user_id)
        .await?
        .map_or_else(Utc::now, |existing| existing.created_at);

    repo.save(user_profile::Model {
        id: user_id.to_string(),
        display_name,
        email,
        currency,
        created_at,
        updated_at: Utc::now(),
        sync_status: SyncStatus::Pending.to_string(),
    })
    .await
}

/// A user's profile, if one was saved.
pub async fn get_profile(
    repo: &UserProfileRepository,
    user_id: &str,
) -> Result<Option<user_profile::Model>> {
    repo.find_by_id(user_id).await
}

/// Settings used for a user that never saved any
#[must_use]
pub fn default_settings(user_id: &str, low_balance_threshold: f64) -> user_settings::Model {
    user_settings::Model {
        user_id: user_id.to_string(),
        currency: DEFAULT_CURRENCY.to_string(),
        low_balance_threshold,
        notifications_enabled: true,
        budget_alerts_enabled: true,
        goal_alerts_enabled: true,
        bill_reminders_enabled: true,
    }
}

/// A user's settings, or defaults when none were saved.
pub async fn get_settings(
    db: &DatabaseConnection,
    user_id: &str,
    default_low_balance_threshold: f64,
) -> Result<user_settings::Model> {
    Ok(UserSettings::find_by_id(user_id.to_string())
        .one(db)
        .await?
        .unwrap_or_else(|| default_settings(user_id, default_low_balance_threshold)))
}

/// Inserts or replaces a user's settings.
pub async fn save_settings(
    db: &DatabaseConnection,
    settings: user_settings::Model,
) -> Result<user_settings::Model> {
    super::ensure_non_negative(settings.low_balance_threshold)?;
    let currency = validate_currency(&settings.currency)?;
    let settings = user_settings::Model {
        currency,
        ..settings
    };

    let exists = UserSettings::find_by_id(settings.user_id.clone())
        .one(db)
        .await?
        .is_some();
    let active = user_settings::ActiveModel::from(settings).reset_all();
    let saved = if exists {
        active.update(db).await?
    } else {
        active.insert(db).await?
    };
    info!(user_id = %saved.user_id, "User settings saved");
    Ok(saved)
}

/// A user's employment details, if saved.
pub async fn get_employment(
    db: &DatabaseConnection,
    user_id: &str,
) -> Result<Option<employment_settings::Model>> {
    Ok(EmploymentSettings::find_by_id(user_id.to_string())
        .one(db)
        .await?)
}

/// Inserts or replaces a user's employment details.
pub async fn save_employment(
    db: &DatabaseConnection,
    user_id: &str,
    employment_type: EmploymentType,
    employer: Option<String>,
    monthly_income: f64,
    pay_day: Option<i32>,
) -> Result<employment_settings::Model> {
    super::ensure_non_negative(monthly_income)?;
    if let Some(day) = pay_day.filter(|day| !(1..=31).contains(day)) {
        return Err(Error::validation(format!("pay day must be 1-31, got {day}")));
    }
    let employer = employer
        .map(|e| e.trim().to_string())
        .filter(|e| !e.is_empty());

    let exists = get_employment(db, user_id).await?.is_some();
    let active = employment_settings::ActiveModel {
        user_id: Set(user_id.to_string()),
        employment_type: Set(employment_type.to_string()),
        employer: Set(employer),
        monthly_income: Set(monthly_income),
        pay_day: Set(pay_day),
    };
    let saved = if exists {
        active.update(db).await?
    } else {
        active.insert(db).await?
    };
    Ok(saved)
}

/// Adds a user-defined category; names are unique per user ignoring case.
pub async fn create_custom_category(
    db: &DatabaseConnection,
    user_id: &str,
    name: &str,
    transaction_type: TransactionType,
    icon: Option<String>,
) -> Result<custom_category::Model> {
    let name = super::ensure_not_blank(name, "category name")?;
    let lowered = name.to_lowercase();
    let taken = list_custom_categories(db, user_id)
        .await?
        .iter()
        .any(|c| c.name.to_lowercase() == lowered);
    if taken {
        return Err(Error::validation(format!("category {name:?} already exists")));
    }

    let category = custom_category::ActiveModel {
        id: Set(super::new_id()),
        user_id: Set(user_id.to_string()),
        name: Set(name),
        transaction_type: Set(transaction_type.to_string()),
        icon: Set(icon),
    };
    Ok(category.insert(db).await?)
}

/// A user's custom categories by name.
pub async fn list_custom_categories(
    db: &DatabaseConnection,
    user_id: &str,
) -> Result<Vec<custom_category::Model>> {
    Ok(CustomCategory::find()
        .filter(custom_category::Column::UserId.eq(user_id))
        .order_by_asc(custom_category::Column::Name)
        .all(db)
        .await?)
}

/// Removes a custom category.
pub async fn delete_custom_category(db: &DatabaseConnection, id: &str) -> Result<()> {
    let result = CustomCategory::delete_by_id(id.to_string()).exec(db).await?;
    if result.rows_affected == 0 {
        return Err(Error::not_found("custom category", id));
    }
    Ok(())
}
