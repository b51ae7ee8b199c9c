//! Subscriptions and bill reminders.
//!
//! Neither is mirrored to the remote store; both live in local tables only. The
//! reminder check asks [`upcoming_reminders`] which items fall inside their
//! reminder window today.

use crate::{
    entities::{
        BillReminder, Subscription, bill_reminder,
        enums::{BillingCycle, RecurringPeriod, TransactionCategory},
        subscription,
    },
    errors::{Error, Result},
};
use chrono::NaiveDate;
use sea_orm::{QueryOrder, Set, prelude::*};
use tracing::{debug, info, warn};

/// Input for [`create_subscription`]
#[derive(Debug, Clone)]
pub struct NewSubscription {
    /// Owner
    pub user_id: String,
    /// Service name
    pub name: String,
    /// Charge per billing cycle
    pub amount: f64,
    /// Billing interval
    pub billing_cycle: BillingCycle,
    /// Date of the next charge
    pub next_billing_date: NaiveDate,
    /// Days of notice before the charge
    pub reminder_days_before: i32,
    /// Spending category
    pub category: TransactionCategory,
}

fn validate_lead_days(days: i32) -> Result<()> {
    if !(0..=365).contains(&days) {
        return Err(Error::validation(format!(
            "reminder lead time must be 0-365 days, got {days}"
        )));
    }
    Ok(())
}

/// Creates an active subscription.
pub async fn create_subscription(
    db: &DatabaseConnection,
    input: NewSubscription,
) -> Result<subscription::Model> {
    let name = super::ensure_not_blank(&input.name, "subscription name")?;
    super::ensure_positive(input.amount)?;
    validate_lead_days(input.reminder_days_before)?;
    if input.billing_cycle.is_unknown() {
        return Err(Error::validation(format!(
            "unsupported billing cycle {}",
            input.billing_cycle
        )));
    }

    let subscription = subscription::ActiveModel {
        id: Set(super::new_id()),
        user_id: Set(input.user_id),
        name: Set(name),
        amount: Set(input.amount),
        billing_cycle: Set(input.billing_cycle.to_string()),
        next_billing_date: Set(input.next_billing_date),
        reminder_days_before: Set(input.reminder_days_before),
        category: Set(input.category.to_string()),
        is_active: Set(true),
        last_reminded: Set(None),
    };
    Ok(subscription.insert(db).await?)
}

async fn find_subscription(db: &DatabaseConnection, id: &str) -> Result<subscription::Model> {
    Subscription::find_by_id(id.to_string())
        .one(db)
        .await?
        .ok_or_else(|| Error::not_found("subscription", id))
}

/// Saves edits to a subscription.
pub async fn update_subscription(
    db: &DatabaseConnection,
    model: subscription::Model,
) -> Result<subscription::Model> {
    let name = super::ensure_not_blank(&model.name, "subscription name")?;
    super::ensure_positive(model.amount)?;
    validate_lead_days(model.reminder_days_before)?;
    find_subscription(db, &model.id).await?;

    let active = subscription::ActiveModel::from(subscription::Model { name, ..model }).reset_all();
    Ok(active.update(db).await?)
}

/// Stops reminders for a subscription while keeping its history.
pub async fn cancel_subscription(db: &DatabaseConnection, id: &str) -> Result<subscription::Model> {
    let mut active: subscription::ActiveModel = find_subscription(db, id).await?.into();
    active.is_active = Set(false);
    Ok(active.update(db).await?)
}

/// Removes a subscription.
pub async fn delete_subscription(db: &DatabaseConnection, id: &str) -> Result<()> {
    let result = Subscription::delete_by_id(id.to_string()).exec(db).await?;
    if result.rows_affected == 0 {
        return Err(Error::not_found("subscription", id));
    }
    Ok(())
}

/// A user's subscriptions ordered by next billing date.
pub async fn list_subscriptions(
    db: &DatabaseConnection,
    user_id: &str,
    include_cancelled: bool,
) -> Result<Vec<subscription::Model>> {
    let mut query = Subscription::find().filter(subscription::Column::UserId.eq(user_id));
    if !include_cancelled {
        query = query.filter(subscription::Column::IsActive.eq(true));
    }
    Ok(query
        .order_by_asc(subscription::Column::NextBillingDate)
        .all(db)
        .await?)
}

/// Moves the next billing date forward by one billing cycle.
pub async fn advance_subscription(db: &DatabaseConnection, id: &str) -> Result<subscription::Model> {
    let current = find_subscription(db, id).await?;
    let next = current
        .billing_cycle()
        .advance(current.next_billing_date)
        .ok_or_else(|| {
            Error::validation(format!(
                "cannot advance billing cycle {}",
                current.billing_cycle
            ))
        })?;

    let mut active: subscription::ActiveModel = current.into();
    active.next_billing_date = Set(next);
    active.last_reminded = Set(None);
    let updated = active.update(db).await?;
    debug!(subscription_id = id, next_billing_date = %next, "Subscription advanced");
    Ok(updated)
}

/// Average monthly cost of a user's active subscriptions.
///
/// Subscriptions with an unrecognized billing cycle are left out.
pub async fn monthly_subscription_cost(db: &DatabaseConnection, user_id: &str) -> Result<f64> {
    let subscriptions = list_subscriptions(db, user_id, false).await?;
    Ok(monthly_cost(&subscriptions))
}

/// Sum of each subscription's amount normalized to one month.
#[must_use]
pub fn monthly_cost(subscriptions: &[subscription::Model]) -> f64 {
    let total: f64 = subscriptions
        .iter()
        .filter(|s| s.is_active)
        .filter_map(|s| match s.billing_cycle().monthly_factor() {
            Some(factor) => Some(s.amount * factor),
            None => {
                warn!(subscription_id = %s.id, cycle = %s.billing_cycle, "Skipping unknown billing cycle");
                None
            }
        })
        .sum();
    (total * 100.0).round() / 100.0
}

/// Input for [`create_bill`]
#[derive(Debug, Clone)]
pub struct NewBill {
    /// Owner
    pub user_id: String,
    /// Bill name
    pub name: String,
    /// Amount due
    pub amount: f64,
    /// Due date
    pub due_date: NaiveDate,
    /// Repeat interval, `None` for a one-off bill
    pub recurrence: Option<RecurringPeriod>,
    /// Days of notice before the due date
    pub reminder_days_before: i32,
}

/// Creates an unpaid bill.
pub async fn create_bill(db: &DatabaseConnection, input: NewBill) -> Result<bill_reminder::Model> {
    let name = super::ensure_not_blank(&input.name, "bill name")?;
    super::ensure_positive(input.amount)?;
    validate_lead_days(input.reminder_days_before)?;

    let bill = bill_reminder::ActiveModel {
        id: Set(super::new_id()),
        user_id: Set(input.user_id),
        name: Set(name),
        amount: Set(input.amount),
        due_date: Set(input.due_date),
        recurrence: Set(input.recurrence.map(String::from)),
        reminder_days_before: Set(input.reminder_days_before),
        is_paid: Set(false),
        last_reminded: Set(None),
    };
    Ok(bill.insert(db).await?)
}

/// A user's bills ordered by due date.
pub async fn list_bills(
    db: &DatabaseConnection,
    user_id: &str,
    include_paid: bool,
) -> Result<Vec<bill_reminder::Model>> {
    let mut query = BillReminder::find().filter(bill_reminder::Column::UserId.eq(user_id));
    if !include_paid {
        query = query.filter(bill_reminder::Column::IsPaid.eq(false));
    }
    Ok(query
        .order_by_asc(bill_reminder::Column::DueDate)
        .all(db)
        .await?)
}

async fn find_bill(db: &DatabaseConnection, id: &str) -> Result<bill_reminder::Model> {
    BillReminder::find_by_id(id.to_string())
        .one(db)
        .await?
        .ok_or_else(|| Error::not_found("bill", id))
}

/// Removes a bill.
pub async fn delete_bill(db: &DatabaseConnection, id: &str) -> Result<()> {
    let result = BillReminder::delete_by_id(id.to_string()).exec(db).await?;
    if result.rows_affected == 0 {
        return Err(Error::not_found("bill", id));
    }
    Ok(())
}

/// Marks a bill paid. A recurring bill rolls forward to its next due date instead.
pub async fn mark_bill_paid(db: &DatabaseConnection, id: &str) -> Result<bill_reminder::Model> {
    let bill = find_bill(db, id).await?;

    let next_due = bill
        .recurrence()
        .and_then(|period| period.advance(bill.due_date));
    let mut active: bill_reminder::ActiveModel = bill.into();
    match next_due {
        Some(next) => {
            active.due_date = Set(next);
            active.is_paid = Set(false);
            active.last_reminded = Set(None);
            info!(bill_id = id, next_due = %next, "Recurring bill paid, rolled forward");
        }
        None => {
            active.is_paid = Set(true);
            info!(bill_id = id, "Bill paid");
        }
    }
    Ok(active.update(db).await?)
}

/// What a reminder is about
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReminderKind {
    /// An upcoming subscription charge
    Subscription,
    /// An upcoming bill
    Bill,
}

/// One item due within its reminder window
#[derive(Debug, Clone, PartialEq)]
pub struct Reminder {
    /// Subscription or bill
    pub kind: ReminderKind,
    /// Id of the subscription or bill
    pub item_id: String,
    /// Display name
    pub name: String,
    /// Amount due
    pub amount: f64,
    /// Due date
    pub due_date: NaiveDate,
    /// Days from today until the due date
    pub days_until: i64,
    /// Day a reminder last went out for this due date
    pub last_reminded: Option<NaiveDate>,
}

impl Reminder {
    /// Whether a reminder already went out on `today`
    #[must_use]
    pub fn reminded_on(&self, today: NaiveDate) -> bool {
        self.last_reminded == Some(today)
    }
}

/// Whether `due` is today or later and at most `lead_days` away.
#[must_use]
pub fn is_due_for_reminder(due: NaiveDate, lead_days: i32, today: NaiveDate) -> bool {
    let days_until = (due - today).num_days();
    (0..=i64::from(lead_days)).contains(&days_until)
}

/// Active subscriptions and unpaid bills inside their reminder window, soonest first.
pub async fn upcoming_reminders(
    db: &DatabaseConnection,
    user_id: &str,
    today: NaiveDate,
) -> Result<Vec<Reminder>> {
    let subscriptions = list_subscriptions(db, user_id, false).await?;
    let bills = list_bills(db, user_id, false).await?;

    let mut reminders: Vec<Reminder> = subscriptions
        .into_iter()
        .filter(|s| is_due_for_reminder(s.next_billing_date, s.reminder_days_before, today))
        .map(|s| Reminder {
            kind: ReminderKind::Subscription,
            days_until: (s.next_billing_date - today).num_days(),
            item_id: s.id,
            name: s.name,
            amount: s.amount,
            due_date: s.next_billing_date,
            last_reminded: s.last_reminded,
        })
        .chain(
            bills
                .into_iter()
                .filter(|b| is_due_for_reminder(b.due_date, b.reminder_days_before, today))
                .map(|b| Reminder {
                    kind: ReminderKind::Bill,
                    days_until: (b.due_date - today).num_days(),
                    item_id: b.id,
                    name: b.name,
                    amount: b.amount,
                    due_date: b.due_date,
                    last_reminded: b.last_reminded,
                }),
        )
        .collect();

    reminders.sort_by(|a, b| a.due_date.cmp(&b.due_date).then_with(|| a.name.cmp(&b.name)));
    Ok(reminders)
}

/// Records that the reminder for `item_id` went out on `today`.
pub async fn mark_reminded(
    db: &DatabaseConnection,
    kind: ReminderKind,
    item_id: &str,
    today: NaiveDate,
) -> Result<()> {
    match kind {
        ReminderKind::Subscription => {
            let mut active: subscription::ActiveModel = find_subscription(db, item_id).await?.into();
            active.last_reminded = Set(Some(today));
            active.update(db).await?;
        }
        ReminderKind::Bill => {
            let mut active: bill_reminder::ActiveModel = find_bill(db, item_id).await?.into();
            active.last_reminded = Set(Some(today));
            active.update(db).await?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    #![allow(clippy::float_cmp)]
    use super::*;
    use crate::test_utils::*;

    fn netflix(next: NaiveDate) -> NewSubscription {
        NewSubscription {
            user_id: "u1".to_string(),
            name: "Streaming".to_string(),
            amount: 15.99,
            billing_cycle: BillingCycle::Monthly,
            next_billing_date: next,
            reminder_days_before: 3,
            category: TransactionCategory::Entertainment,
        }
    }

    fn rent(due: NaiveDate, recurrence: Option<RecurringPeriod>) -> NewBill {
        NewBill {
            user_id: "u1".to_string(),
            name: "Rent".to_string(),
            amount: 1200.0,
            due_date: due,
            recurrence,
            reminder_days_before: 5,
        }
    }

    #[test]
    fn test_reminder_window() {
        let today = date(2024, 5, 10);
        assert!(is_due_for_reminder(date(2024, 5, 10), 3, today));
        assert!(is_due_for_reminder(date(2024, 5, 13), 3, today));
        assert!(!is_due_for_reminder(date(2024, 5, 14), 3, today));
        assert!(!is_due_for_reminder(date(2024, 5, 9), 3, today));
    }

    #[tokio::test]
    async fn test_monthly_cost_normalizes_cycles() -> Result<()> {
        let db = setup_test_db().await?;
        create_subscription(&db, netflix(date(2024, 5, 1))).await?;
        let mut yearly = netflix(date(2024, 5, 1));
        yearly.name = "Cloud storage".to_string();
        yearly.amount = 120.0;
        yearly.billing_cycle = BillingCycle::Yearly;
        let cloud = create_subscription(&db, yearly).await?;

        assert_eq!(monthly_subscription_cost(&db, "u1").await?, 25.99);

        cancel_subscription(&db, &cloud.id).await?;
        assert_eq!(monthly_subscription_cost(&db, "u1").await?, 15.99);
        assert_eq!(list_subscriptions(&db, "u1", true).await?.len(), 2);
        Ok(())
    }

    #[tokio::test]
    async fn test_advance_subscription_moves_one_cycle() -> Result<()> {
        let db = setup_test_db().await?;
        let sub = create_subscription(&db, netflix(date(2024, 1, 31))).await?;
        let advanced = advance_subscription(&db, &sub.id).await?;
        assert_eq!(advanced.next_billing_date, date(2024, 2, 29));
        Ok(())
    }

    #[tokio::test]
    async fn test_mark_bill_paid_rolls_recurring_forward() -> Result<()> {
        let db = setup_test_db().await?;
        let monthly = create_bill(&db, rent(date(2024, 5, 1), Some(RecurringPeriod::Monthly))).await?;
        let one_off = create_bill(&db, rent(date(2024, 5, 2), None)).await?;

        let rolled = mark_bill_paid(&db, &monthly.id).await?;
        assert!(!rolled.is_paid);
        assert_eq!(rolled.due_date, date(2024, 6, 1));

        let paid = mark_bill_paid(&db, &one_off.id).await?;
        assert!(paid.is_paid);
        assert_eq!(list_bills(&db, "u1", false).await?.len(), 1);
        assert_eq!(list_bills(&db, "u1", true).await?.len(), 2);

        assert!(matches!(
            mark_bill_paid(&db, "missing").await,
            Err(Error::NotFound { .. })
        ));
        Ok(())
    }

    #[tokio::test]
    async fn test_upcoming_reminders_sorted_and_filtered() -> Result<()> {
        let db = setup_test_db().await?;
        let today = date(2024, 5, 10);
        create_subscription(&db, netflix(date(2024, 5, 12))).await?;
        create_subscription(&db, netflix(date(2024, 5, 20))).await?;
        create_bill(&db, rent(date(2024, 5, 11), None)).await?;
        create_bill(&db, rent(date(2024, 5, 9), None)).await?;

        let reminders = upcoming_reminders(&db, "u1", today).await?;
        assert_eq!(reminders.len(), 2);
        assert_eq!(reminders[0].kind, ReminderKind::Bill);
        assert_eq!(reminders[0].days_until, 1);
        assert_eq!(reminders[1].kind, ReminderKind::Subscription);
        assert_eq!(reminders[1].due_date, date(2024, 5, 12));

        assert!(upcoming_reminders(&db, "someone-else", today).await?.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn test_subscription_validation_and_delete() -> Result<()> {
        let db = setup_test_db().await?;
        let mut bad = netflix(date(2024, 5, 1));
        bad.reminder_days_before = -1;
        assert!(matches!(
            create_subscription(&db, bad).await,
            Err(Error::Validation { .. })
        ));

        let sub = create_subscription(&db, netflix(date(2024, 5, 1))).await?;
        let mut edited = sub.clone();
        edited.amount = 17.99;
        assert_eq!(update_subscription(&db, edited).await?.amount, 17.99);

        delete_subscription(&db, &sub.id).await?;
        assert!(matches!(
            delete_subscription(&db, &sub.id).await,
            Err(Error::NotFound { .. })
        ));
        Ok(())
    }

    #[tokio::test]
    async fn test_mark_reminded_resets_when_bill_rolls_forward() -> Result<()> {
        let db = setup_test_db().await?;
        let today = date(2024, 5, 28);
        let bill = create_bill(&db, rent(date(2024, 6, 1), Some(RecurringPeriod::Monthly))).await?;

        mark_reminded(&db, ReminderKind::Bill, &bill.id, today).await?;
        let reminders = upcoming_reminders(&db, "u1", today).await?;
        assert!(reminders[0].reminded_on(today));
        assert!(!reminders[0].reminded_on(date(2024, 5, 29)));

        let rolled = mark_bill_paid(&db, &bill.id).await?;
        assert_eq!(rolled.last_reminded, None);

        assert!(matches!(
            mark_reminded(&db, ReminderKind::Subscription, &bill.id, today).await,
            Err(Error::NotFound { .. })
        ));
        Ok(())
    }
}
