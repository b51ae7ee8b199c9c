//! Savings goal business logic - targets, contributions and milestones.

use crate::{
    entities::{
        enums::{GoalCategory, GoalPriority, SyncStatus},
        savings_goal,
    },
    errors::{Error, Result},
    repository::SavingsGoalRepository,
};
use chrono::{Datelike, NaiveDate, Utc};
use tracing::info;

/// Input for [`create_goal`]
#[derive(Debug, Clone)]
pub struct NewGoal {
    /// Owner
    pub user_id: String,
    /// Display name
    pub name: String,
    /// Amount to reach, must be positive
    pub target_amount: f64,
    /// Optional target date
    pub deadline: Option<NaiveDate>,
    /// Priority
    pub priority: GoalPriority,
    /// Planned monthly contribution, zero when unplanned
    pub monthly_contribution: f64,
    /// Category
    pub category: GoalCategory,
}

fn round_cents(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Creates a goal with nothing saved yet.
pub async fn create_goal(repo: &SavingsGoalRepository, input: NewGoal) -> Result<savings_goal::Model> {
    super::ensure_positive(input.target_amount)?;
    super::ensure_non_negative(input.monthly_contribution)?;
    let name = super::ensure_not_blank(&input.name, "name")?;

    let goal = repo
        .insert(savings_goal::Model {
            id: super::new_id(),
            user_id: input.user_id,
            name,
            target_amount: input.target_amount,
            current_amount: 0.0,
            deadline: input.deadline,
            priority: input.priority.to_string(),
            monthly_contribution: input.monthly_contribution,
            category: input.category.to_string(),
            is_completed: false,
            last_milestone: 0,
            is_deleted: false,
            sync_status: SyncStatus::Pending.to_string(),
            updated_at: Utc::now(),
        })
        .await?;
    info!(goal_id = %goal.id, user_id = %goal.user_id, "Savings goal created");
    Ok(goal)
}

async fn find_active(repo: &SavingsGoalRepository, goal_id: &str) -> Result<savings_goal::Model> {
    repo.find_by_id(goal_id)
        .await?
        .filter(|g| !g.is_deleted)
        .ok_or_else(|| Error::not_found("savings goal", goal_id))
}

/// Saves edits to a goal, re-deriving the completed flag.
pub async fn update_goal(
    repo: &SavingsGoalRepository,
    model: savings_goal::Model,
) -> Result<savings_goal::Model> {
    super::ensure_positive(model.target_amount)?;
    super::ensure_non_negative(model.current_amount)?;
    super::ensure_non_negative(model.monthly_contribution)?;
    let name = super::ensure_not_blank(&model.name, "name")?;

    let existing = find_active(repo, &model.id).await?;
    if existing.user_id != model.user_id {
        return Err(Error::validation("a savings goal cannot change owner"));
    }

    repo.update(savings_goal::Model {
        name,
        is_completed: model.current_amount >= model.target_amount,
        ..model
    })
    .await
}

/// Soft-deletes a goal.
pub async fn delete_goal(repo: &SavingsGoalRepository, goal_id: &str) -> Result<()> {
    repo.soft_delete(goal_id).await?;
    Ok(())
}

/// A user's active goals, nearest deadline first.
pub async fn list_goals(repo: &SavingsGoalRepository, user_id: &str) -> Result<Vec<savings_goal::Model>> {
    repo.list_for_user(user_id).await
}

/// Adds money to a goal; the goal completes once the target is reached.
pub async fn contribute(
    repo: &SavingsGoalRepository,
    goal_id: &str,
    amount: f64,
) -> Result<savings_goal::Model> {
    super::ensure_positive(amount)?;
    let mut goal = find_active(repo, goal_id).await?;

    goal.current_amount = round_cents(goal.current_amount + amount);
    let newly_completed = !goal.is_completed && goal.current_amount >= goal.target_amount;
    goal.is_completed = goal.current_amount >= goal.target_amount;

    let saved = repo.update(goal).await?;
    if newly_completed {
        info!(goal_id, "Savings goal completed");
    }
    Ok(saved)
}

/// Progress snapshot of a goal
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GoalProgress {
    /// Saved share of the target, capped at 100
    pub percent: f64,
    /// Amount still to save, never negative
    pub remaining: f64,
    /// Months left at the planned contribution; `None` without a contribution
    pub months_to_target: Option<u32>,
    /// Whether the plan reaches the target by the deadline; `None` without a deadline
    pub on_track: Option<bool>,
}

fn percent_saved(goal: &savings_goal::Model) -> f64 {
    if goal.target_amount <= 0.0 {
        return 0.0;
    }
    goal.current_amount / goal.target_amount * 100.0
}

/// Whole calendar months from `from` until `to`; zero when `to` is not after `from`.
fn whole_months_between(from: NaiveDate, to: NaiveDate) -> u32 {
    if to <= from {
        return 0;
    }
    let mut months = (to.year() - from.year()) * 12 + to.month() as i32 - from.month() as i32;
    if to.day() < from.day() {
        months -= 1;
    }
    u32::try_from(months).unwrap_or_default()
}

/// Computes progress as of `today`.
#[must_use]
pub fn goal_progress(goal: &savings_goal::Model, today: NaiveDate) -> GoalProgress {
    let remaining = round_cents((goal.target_amount - goal.current_amount).max(0.0));

    let months_to_target = if remaining <= 0.0 {
        Some(0)
    } else if goal.monthly_contribution > 0.0 {
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let months = (remaining / goal.monthly_contribution).ceil() as u32;
        Some(months)
    } else {
        None
    };

    let on_track = goal.deadline.map(|deadline| match months_to_target {
        Some(0) => true,
        Some(needed) => needed <= whole_months_between(today, deadline),
        None => false,
    });

    GoalProgress {
        percent: percent_saved(goal).min(100.0),
        remaining,
        months_to_target,
        on_track,
    }
}

/// The highest milestone (percent) reached but not yet notified, if any.
#[must_use]
pub fn reached_milestone(goal: &savings_goal::Model, milestones: &[i32]) -> Option<i32> {
    let percent = percent_saved(goal);
    milestones
        .iter()
        .copied()
        .filter(|m| *m > goal.last_milestone && f64::from(*m) <= percent)
        .max()
}

/// Records that `milestone` has been notified.
pub async fn mark_milestone(
    repo: &SavingsGoalRepository,
    goal_id: &str,
    milestone: i32,
) -> Result<savings_goal::Model> {
    let mut goal = find_active(repo, goal_id).await?;
    if milestone <= goal.last_milestone {
        return Ok(goal);
    }
    goal.last_milestone = milestone;
    repo.update(goal).await
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    #![allow(clippy::float_cmp)]
    use super::*;
    use crate::test_utils::*;

    fn new_goal(target: f64, deadline: Option<NaiveDate>) -> NewGoal {
        NewGoal {
            user_id: "u1".to_string(),
            name: " Holiday ".to_string(),
            target_amount: target,
            deadline,
            priority: GoalPriority::High,
            monthly_contribution: 250.0,
            category: GoalCategory::Vacation,
        }
    }

    #[test]
    fn test_progress_months_and_deadline() {
        let mut goal = sample_goal("u1", "Car", 1000.0);
        goal.current_amount = 250.0;
        goal.monthly_contribution = 200.0;
        goal.deadline = Some(date(2024, 6, 1));

        let progress = goal_progress(&goal, date(2024, 1, 15));
        assert_eq!(progress.percent, 25.0);
        assert_eq!(progress.remaining, 750.0);
        assert_eq!(progress.months_to_target, Some(4));
        assert_eq!(progress.on_track, Some(true));

        let late = goal_progress(&goal, date(2024, 3, 2));
        assert_eq!(late.on_track, Some(false));
    }

    #[test]
    fn test_progress_without_plan_or_deadline() {
        let mut goal = sample_goal("u1", "Someday", 500.0);
        goal.monthly_contribution = 0.0;
        let progress = goal_progress(&goal, date(2024, 1, 1));
        assert_eq!(progress.months_to_target, None);
        assert_eq!(progress.on_track, None);

        goal.current_amount = 600.0;
        let done = goal_progress(&goal, date(2024, 1, 1));
        assert_eq!(done.percent, 100.0);
        assert_eq!(done.remaining, 0.0);
        assert_eq!(done.months_to_target, Some(0));
    }

    #[test]
    fn test_reached_milestone_picks_highest_new_one() {
        let milestones = [25, 50, 75, 100];
        let mut goal = sample_goal("u1", "Fund", 1000.0);
        assert_eq!(reached_milestone(&goal, &milestones), None);

        goal.current_amount = 600.0;
        assert_eq!(reached_milestone(&goal, &milestones), Some(50));

        goal.last_milestone = 50;
        assert_eq!(reached_milestone(&goal, &milestones), None);

        goal.current_amount = 1000.0;
        assert_eq!(reached_milestone(&goal, &milestones), Some(100));
    }

    #[test]
    fn test_whole_months_between() {
        assert_eq!(whole_months_between(date(2024, 1, 15), date(2024, 6, 1)), 4);
        assert_eq!(whole_months_between(date(2024, 1, 15), date(2024, 6, 15)), 5);
        assert_eq!(whole_months_between(date(2024, 6, 1), date(2024, 1, 1)), 0);
    }

    #[tokio::test]
    async fn test_contribute_completes_goal() -> Result<()> {
        let (db, remote) = setup_test_env().await?;
        let repo = SavingsGoalRepository::new(db, remote);
        let goal = create_goal(&repo, new_goal(300.0, None)).await?;
        assert_eq!(goal.name, "Holiday");

        let partial = contribute(&repo, &goal.id, 120.5).await?;
        assert_eq!(partial.current_amount, 120.5);
        assert!(!partial.is_completed);

        let done = contribute(&repo, &goal.id, 179.5).await?;
        assert!(done.is_completed);
        assert_eq!(done.sync_status(), SyncStatus::Synced);

        assert!(matches!(
            contribute(&repo, &goal.id, 0.0).await,
            Err(Error::InvalidAmount { .. })
        ));
        Ok(())
    }

    #[tokio::test]
    async fn test_create_goal_validation() -> Result<()> {
        let (db, remote) = setup_test_env().await?;
        let repo = SavingsGoalRepository::new(db, remote);
        assert!(matches!(
            create_goal(&repo, new_goal(0.0, None)).await,
            Err(Error::InvalidAmount { .. })
        ));
        let mut blank = new_goal(100.0, None);
        blank.name = "  ".to_string();
        assert!(matches!(
            create_goal(&repo, blank).await,
            Err(Error::Validation { .. })
        ));
        Ok(())
    }

    #[tokio::test]
    async fn test_mark_milestone_only_moves_forward() -> Result<()> {
        let (db, remote) = setup_test_env().await?;
        let repo = SavingsGoalRepository::new(db, remote);
        let goal = create_goal(&repo, new_goal(100.0, None)).await?;

        let marked = mark_milestone(&repo, &goal.id, 50).await?;
        assert_eq!(marked.last_milestone, 50);
        let unchanged = mark_milestone(&repo, &goal.id, 25).await?;
        assert_eq!(unchanged.last_milestone, 50);

        delete_goal(&repo, &goal.id).await?;
        assert!(matches!(
            mark_milestone(&repo, &goal.id, 75).await,
            Err(Error::NotFound { .. })
        ));
        assert!(list_goals(&repo, "u1").await?.is_empty());
        Ok(())
    }
}
