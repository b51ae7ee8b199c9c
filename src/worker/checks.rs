//! The periodic financial checks run by the background job.
//!
//! For every configured user: low balance, savings milestones, bill and
//! subscription reminders, budget overruns. Each check is gated by the user's
//! settings and fails on its own: an error is logged and counted, and the pass moves
//! on to the next check and the next user. After all users, unsynced rows are
//! retried against the remote store with backoff.
//!
//! A pass never fails as a whole, so the scheduler never repeats notifications that
//! already went out. Milestones and reminders are recorded before they are sent.

use super::{RetryPolicy, run_with_retry};
use crate::{
    config::AlertConfig,
    core::{budget, goal, reminder, settings, transaction},
    entities::{enums::NotificationType, user_settings},
    errors::{Error, Result},
    messaging::{LocalNotification, Notifier, PushPayload},
    repository::{Repositories, SyncReport},
};
use chrono::{DateTime, Datelike, NaiveDate, Utc};
use sea_orm::DatabaseConnection;
use std::sync::Arc;
use tracing::{debug, error, info, instrument};

/// Everything the checks need
#[derive(Clone)]
pub struct CheckContext {
    /// Local database
    pub db: DatabaseConnection,
    /// Synced repositories
    pub repos: Repositories,
    /// Where notifications go
    pub notifier: Arc<dyn Notifier>,
    /// Alert defaults
    pub alerts: AlertConfig,
    /// Backoff for the sync retry at the end of a pass
    pub sync_retry: RetryPolicy,
}

/// Outcome of one [`run_checks`] pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CheckReport {
    /// Notifications delivered
    pub notifications: usize,
    /// Users with at least one failed check
    pub failed_users: usize,
    /// Result of retrying unsynced rows
    pub sync: SyncReport,
    /// Whether the sync retry gave up; rows stay unsynced until the next pass
    pub sync_failed: bool,
}

async fn send(ctx: &CheckContext, payload: PushPayload) -> Result<usize> {
    let notification = LocalNotification::from_payload(&payload);
    ctx.notifier.notify(&notification).await?;
    Ok(1)
}

/// Notifications sent and checks failed for one user
#[derive(Debug, Default)]
struct UserOutcome {
    sent: usize,
    failed: usize,
}

impl UserOutcome {
    fn record(&mut self, user_id: &str, check: &'static str, result: Result<usize>) {
        match result {
            Ok(sent) => self.sent += sent,
            Err(e) => {
                error!(user_id = %user_id, check, error = %e, "Check failed");
                self.failed += 1;
            }
        }
    }
}

async fn check_user(ctx: &CheckContext, user_id: &str, today: NaiveDate) -> UserOutcome {
    let mut outcome = UserOutcome::default();
    let prefs = match settings::get_settings(
        &ctx.db,
        user_id,
        ctx.alerts.default_low_balance_threshold,
    )
    .await
    {
        Ok(prefs) => prefs,
        Err(e) => {
            outcome.record(user_id, "settings", Err(e));
            return outcome;
        }
    };
    if !prefs.notifications_enabled {
        debug!(user_id = %user_id, "Notifications disabled, skipping checks");
        return outcome;
    }

    outcome.record(user_id, "low_balance", check_low_balance(ctx, user_id, &prefs).await);
    if prefs.goal_alerts_enabled {
        outcome.record(user_id, "goal_milestones", check_goal_milestones(ctx, user_id).await);
    }
    if prefs.bill_reminders_enabled {
        outcome.record(user_id, "reminders", check_reminders(ctx, user_id, today).await);
    }
    if prefs.budget_alerts_enabled {
        outcome.record(user_id, "budget", check_budget(ctx, user_id, today).await);
    }
    outcome
}

/// Calendar day a pass started at `now` checks: the UTC date, the calendar stored
/// transaction dates and month bounds use.
#[must_use]
pub fn check_date(now: DateTime<Utc>) -> NaiveDate {
    now.date_naive()
}

/// Runs every enabled check for each user, then retries unsynced rows.
#[instrument(skip(ctx, users), fields(users = users.len()))]
pub async fn run_checks(ctx: &CheckContext, users: &[String], today: NaiveDate) -> CheckReport {
    let mut report = CheckReport::default();

    for user_id in users {
        let outcome = check_user(ctx, user_id, today).await;
        report.notifications += outcome.sent;
        if outcome.failed > 0 {
            report.failed_users += 1;
        }
    }

    match run_with_retry("sync", ctx.sync_retry, || ctx.repos.sync_pending()).await {
        Ok(sync) => report.sync = sync,
        Err(_) => report.sync_failed = true,
    }
    info!(
        notifications = report.notifications,
        failed_users = report.failed_users,
        synced = report.sync.synced,
        failed = report.sync.failed,
        sync_failed = report.sync_failed,
        "Periodic checks finished"
    );
    report
}

/// Alerts when the balance is below the user's threshold.
pub async fn check_low_balance(
    ctx: &CheckContext,
    user_id: &str,
    prefs: &user_settings::Model,
) -> Result<usize> {
    let balance = transaction::current_balance(&ctx.repos.transactions, user_id).await?;
    if balance >= prefs.low_balance_threshold {
        return Ok(0);
    }
    send(
        ctx,
        PushPayload::new(
            NotificationType::LowBalance,
            "Low balance",
            format!(
                "Your balance is {balance:.2} {}, below your {:.2} threshold",
                prefs.currency, prefs.low_balance_threshold
            ),
        )
        .with_amount(balance),
    )
    .await
}

/// Notifies each goal that crossed a new milestone and records it.
pub async fn check_goal_milestones(ctx: &CheckContext, user_id: &str) -> Result<usize> {
    let mut sent = 0;
    for g in ctx.repos.goals.list_for_user(user_id).await? {
        let Some(milestone) = goal::reached_milestone(&g, &ctx.alerts.goal_milestones) else {
            continue;
        };
        let body = if milestone >= 100 {
            format!("You reached your {} goal!", g.name)
        } else {
            format!("{} is {milestone}% funded", g.name)
        };
        goal::mark_milestone(&ctx.repos.goals, &g.id, milestone).await?;
        sent += send(
            ctx,
            PushPayload::new(NotificationType::GoalMilestone, "Savings milestone", body)
                .with_amount(g.current_amount)
                .with_item(g.id.as_str()),
        )
        .await?;
    }
    Ok(sent)
}

/// Reminds about bills and subscription charges inside their reminder window, at most
/// once a day per item.
pub async fn check_reminders(ctx: &CheckContext, user_id: &str, today: NaiveDate) -> Result<usize> {
    let mut sent = 0;
    for item in reminder::upcoming_reminders(&ctx.db, user_id, today).await? {
        if item.reminded_on(today) {
            continue;
        }
        let (kind, title) = match item.kind {
            reminder::ReminderKind::Bill => (NotificationType::BillReminder, "Bill due"),
            reminder::ReminderKind::Subscription => {
                (NotificationType::SubscriptionReminder, "Upcoming charge")
            }
        };
        let when = match item.days_until {
            0 => "today".to_string(),
            1 => "tomorrow".to_string(),
            n => format!("in {n} days"),
        };
        reminder::mark_reminded(&ctx.db, item.kind, &item.item_id, today).await?;
        sent += send(
            ctx,
            PushPayload::new(kind, title, format!("{} ({:.2}) is due {when}", item.name, item.amount))
                .with_amount(item.amount)
                .with_item(item.item_id.as_str()),
        )
        .await?;
    }
    Ok(sent)
}

/// Alerts for each category of this month's budget that is over its allocation.
pub async fn check_budget(ctx: &CheckContext, user_id: &str, today: NaiveDate) -> Result<usize> {
    let month = i32::try_from(today.month())
        .map_err(|_| Error::validation(format!("invalid month in {today}")))?;
    let Some(overview) = budget::budget_overview(
        &ctx.repos.budgets,
        &ctx.repos.transactions,
        user_id,
        month,
        today.year(),
    )
    .await?
    else {
        return Ok(0);
    };

    let mut sent = 0;
    for status in overview.over_budget() {
        sent += send(
            ctx,
            PushPayload::new(
                NotificationType::BudgetAlert,
                "Over budget",
                format!(
                    "{} spending is {:.2} over the {:.2} budget",
                    status.category, -status.remaining, status.allocated
                ),
            )
            .with_amount(status.spent)
            .with_item(overview.budget_id.as_str()),
        )
        .await?;
    }
    Ok(sent)
}
