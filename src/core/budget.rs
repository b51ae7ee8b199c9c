//! Budget business logic - monthly allocations, templates and overviews.
//!
//! A budget assigns an amount to each category for one month. Templates hold a
//! reusable set of allocations that can be stamped onto any month. The overview
//! compares allocations with the month's expenses.

use super::transaction::month_bounds;
use crate::{
    entities::{
        budget::{self, CategoryAllocation, encode_allocations},
        enums::{SyncStatus, TransactionCategory, TransactionType},
        transaction,
    },
    errors::{Error, Result},
    repository::{BudgetRepository, TransactionRepository},
};
use chrono::Utc;
use std::collections::{HashMap, HashSet};

/// Input for [`create_budget`]
#[derive(Debug, Clone)]
pub struct NewBudget {
    /// Owner
    pub user_id: String,
    /// Calendar month, 1-12
    pub month: i32,
    /// Calendar year
    pub year: i32,
    /// Per-category allocations
    pub allocations: Vec<CategoryAllocation>,
    /// Store as a reusable template
    pub is_template: bool,
}

fn validate_period(month: i32, year: i32) -> Result<()> {
    if !(1..=12).contains(&month) {
        return Err(Error::validation(format!("month must be 1-12, got {month}")));
    }
    if !(1970..=9999).contains(&year) {
        return Err(Error::validation(format!("year out of range: {year}")));
    }
    Ok(())
}

/// Checks amounts and rejects a category listed twice.
pub fn validate_allocations(allocations: &[CategoryAllocation]) -> Result<()> {
    let mut seen = HashSet::new();
    for allocation in allocations {
        super::ensure_non_negative(allocation.amount)?;
        if !seen.insert(&allocation.category) {
            return Err(Error::validation(format!(
                "category {} allocated twice",
                allocation.category
            )));
        }
    }
    Ok(())
}

/// Creates a budget; only one regular budget may exist per user and month.
pub async fn create_budget(repo: &BudgetRepository, input: NewBudget) -> Result<budget::Model> {
    validate_period(input.month, input.year)?;
    validate_allocations(&input.allocations)?;

    if !input.is_template
        && repo
            .find_for_month(&input.user_id, input.month, input.year)
            .await?
            .is_some()
    {
        return Err(Error::validation(format!(
            "a budget for {}-{:02} already exists",
            input.year, input.month
        )));
    }

    repo.insert(budget::Model {
        id: super::new_id(),
        user_id: input.user_id,
        month: input.month,
        year: input.year,
        allocations: encode_allocations(&input.allocations)?,
        is_template: input.is_template,
        is_deleted: false,
        sync_status: SyncStatus::Pending.to_string(),
        updated_at: Utc::now(),
    })
    .await
}

async fn find_active(repo: &BudgetRepository, budget_id: &str) -> Result<budget::Model> {
    repo.find_by_id(budget_id)
        .await?
        .filter(|b| !b.is_deleted)
        .ok_or_else(|| Error::not_found("budget", budget_id))
}

/// Replaces a budget's allocations.
pub async fn update_allocations(
    repo: &BudgetRepository,
    budget_id: &str,
    allocations: &[CategoryAllocation],
) -> Result<budget::Model> {
    validate_allocations(allocations)?;
    let mut budget = find_active(repo, budget_id).await?;
    budget.allocations = encode_allocations(allocations)?;
    repo.update(budget).await
}

/// Flags or unflags a budget as a template.
pub async fn set_template(
    repo: &BudgetRepository,
    budget_id: &str,
    is_template: bool,
) -> Result<budget::Model> {
    let mut budget = find_active(repo, budget_id).await?;
    budget.is_template = is_template;
    repo.update(budget).await
}

/// Soft-deletes a budget.
pub async fn delete_budget(repo: &BudgetRepository, budget_id: &str) -> Result<()> {
    repo.soft_delete(budget_id).await?;
    Ok(())
}

/// Copies a template's allocations onto a month.
///
/// Overwrites the allocations of an existing budget for that month, or creates one.
pub async fn apply_template(
    repo: &BudgetRepository,
    template_id: &str,
    month: i32,
    year: i32,
) -> Result<budget::Model> {
    validate_period(month, year)?;
    let template = find_active(repo, template_id).await?;
    if !template.is_template {
        return Err(Error::validation("budget is not a template"));
    }
    let allocations = template.allocations()?;

    if let Some(existing) = repo.find_for_month(&template.user_id, month, year).await? {
        return update_allocations(repo, &existing.id, &allocations).await;
    }
    create_budget(
        repo,
        NewBudget {
            user_id: template.user_id,
            month,
            year,
            allocations,
            is_template: false,
        },
    )
    .await
}

/// Budget-vs-actual for one category
#[derive(Debug, Clone, PartialEq)]
pub struct CategoryStatus {
    /// Category
    pub category: TransactionCategory,
    /// Amount allocated
    pub allocated: f64,
    /// Expenses recorded in the month
    pub spent: f64,
    /// `allocated - spent`; negative when over budget
    pub remaining: f64,
    /// Whether spending exceeded the allocation
    pub over_budget: bool,
    /// Spending as a percentage of the allocation (0 when nothing is allocated)
    pub percent_used: f64,
}

/// Budget-vs-actual for a whole month
#[derive(Debug, Clone, PartialEq)]
pub struct BudgetOverview {
    /// Budget the overview was built from
    pub budget_id: String,
    /// Calendar month
    pub month: i32,
    /// Calendar year
    pub year: i32,
    /// One entry per allocation, in allocation order
    pub categories: Vec<CategoryStatus>,
    /// Sum of allocations
    pub total_allocated: f64,
    /// Sum of expenses in budgeted categories
    pub total_spent: f64,
    /// Expenses in categories without an allocation
    pub unbudgeted_spent: f64,
}

impl BudgetOverview {
    /// Categories whose spending exceeded the allocation
    pub fn over_budget(&self) -> impl Iterator<Item = &CategoryStatus> {
        self.categories.iter().filter(|c| c.over_budget)
    }
}

/// Compares allocations with expenses. Income rows are ignored.
#[must_use]
pub fn summarize(
    budget: &budget::Model,
    allocations: &[CategoryAllocation],
    transactions: &[transaction::Model],
) -> BudgetOverview {
    let mut spent_by_category: HashMap<TransactionCategory, f64> = HashMap::new();
    for t in transactions {
        if t.transaction_type() == TransactionType::Expense && !t.is_deleted {
            *spent_by_category.entry(t.category()).or_default() += t.amount;
        }
    }

    let categories: Vec<CategoryStatus> = allocations
        .iter()
        .map(|allocation| {
            let spent = spent_by_category
                .remove(&allocation.category)
                .unwrap_or_default();
            let percent_used = if allocation.amount > 0.0 {
                spent / allocation.amount * 100.0
            } else {
                0.0
            };
            CategoryStatus {
                category: allocation.category.clone(),
                allocated: allocation.amount,
                spent,
                remaining: allocation.amount - spent,
                over_budget: spent > allocation.amount,
                percent_used,
            }
        })
        .collect();

    BudgetOverview {
        budget_id: budget.id.clone(),
        month: budget.month,
        year: budget.year,
        total_allocated: categories.iter().map(|c| c.allocated).sum(),
        total_spent: categories.iter().map(|c| c.spent).sum(),
        unbudgeted_spent: spent_by_category.values().sum(),
        categories,
    }
}

/// Budget-vs-actual for a user's month, or `None` when no budget exists.
pub async fn budget_overview(
    budgets: &BudgetRepository,
    transactions: &TransactionRepository,
    user_id: &str,
    month: i32,
    year: i32,
) -> Result<Option<BudgetOverview>> {
    validate_period(month, year)?;
    let Some(budget) = budgets.find_for_month(user_id, month, year).await? else {
        return Ok(None);
    };
    let allocations = budget.allocations()?;

    let month_number = u32::try_from(month)
        .map_err(|_| Error::validation(format!("month must be 1-12, got {month}")))?;
    let (start, end) = month_bounds(year, month_number)?;
    let spending = transactions.list_between(user_id, start, end).await?;

    Ok(Some(summarize(&budget, &allocations, &spending)))
}
