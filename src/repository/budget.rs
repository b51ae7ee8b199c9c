//! Budget repository - local `budgets` table mirrored to the `budgets` collection.

use super::{SyncReport, mirror, remote_wins};
use crate::entities::{Budget, budget, enums::SyncStatus};
use crate::errors::{Error, Result};
use crate::remote::{Collection, RemoteStore, from_document};
use chrono::Utc;
use sea_orm::sea_query::Expr;
use sea_orm::{ActiveModelTrait, Condition, QueryOrder, prelude::*};
use std::sync::Arc;
use tracing::instrument;

/// Local-first store for budgets
#[derive(Clone)]
pub struct BudgetRepository {
    db: DatabaseConnection,
    remote: Arc<dyn RemoteStore>,
}

impl BudgetRepository {
    /// Creates a repository over `db`, mirroring to `remote`
    #[must_use]
    pub fn new(db: DatabaseConnection, remote: Arc<dyn RemoteStore>) -> Self {
        Self { db, remote }
    }

    /// Inserts a new budget and mirrors it.
    #[instrument(skip(self, model), fields(id = %model.id))]
    pub async fn insert(&self, mut model: budget::Model) -> Result<budget::Model> {
        model.sync_status = SyncStatus::Pending.to_string();
        model.updated_at = Utc::now();
        let inserted = budget::ActiveModel::from(model)
            .reset_all()
            .insert(&self.db)
            .await?;
        self.push(inserted).await
    }

    /// Replaces an existing budget and mirrors it.
    #[instrument(skip(self, model), fields(id = %model.id))]
    pub async fn update(&self, mut model: budget::Model) -> Result<budget::Model> {
        model.sync_status = SyncStatus::Pending.to_string();
        model.updated_at = Utc::now();
        let updated = budget::ActiveModel::from(model)
            .reset_all()
            .update(&self.db)
            .await?;
        self.push(updated).await
    }

    /// Marks a budget deleted and mirrors the deletion.
    pub async fn soft_delete(&self, id: &str) -> Result<budget::Model> {
        let mut model = self
            .find_by_id(id)
            .await?
            .ok_or_else(|| Error::not_found("budget", id))?;
        model.is_deleted = true;
        self.update(model).await
    }

    /// Fetches a budget by id, including soft-deleted ones.
    pub async fn find_by_id(&self, id: &str) -> Result<Option<budget::Model>> {
        Budget::find_by_id(id.to_string())
            .one(&self.db)
            .await
            .map_err(Into::into)
    }

    /// The active, non-template budget for a month.
    pub async fn find_for_month(
        &self,
        user_id: &str,
        month: i32,
        year: i32,
    ) -> Result<Option<budget::Model>> {
        Budget::find()
            .filter(budget::Column::UserId.eq(user_id))
            .filter(budget::Column::Month.eq(month))
            .filter(budget::Column::Year.eq(year))
            .filter(budget::Column::IsTemplate.eq(false))
            .filter(budget::Column::IsDeleted.eq(false))
            .one(&self.db)
            .await
            .map_err(Into::into)
    }

    /// Active budgets for a user, most recent month first.
    pub async fn list_for_user(&self, user_id: &str) -> Result<Vec<budget::Model>> {
        Budget::find()
            .filter(budget::Column::UserId.eq(user_id))
            .filter(budget::Column::IsDeleted.eq(false))
            .order_by_desc(budget::Column::Year)
            .order_by_desc(budget::Column::Month)
            .all(&self.db)
            .await
            .map_err(Into::into)
    }

    /// Active templates for a user.
    pub async fn list_templates(&self, user_id: &str) -> Result<Vec<budget::Model>> {
        Budget::find()
            .filter(budget::Column::UserId.eq(user_id))
            .filter(budget::Column::IsTemplate.eq(true))
            .filter(budget::Column::IsDeleted.eq(false))
            .all(&self.db)
            .await
            .map_err(Into::into)
    }

    /// Retries the remote write for every `PENDING` or `FAILED` row.
    pub async fn sync_pending(&self) -> Result<SyncReport> {
        let unsynced = Budget::find()
            .filter(
                Condition::any()
                    .add(budget::Column::SyncStatus.eq(SyncStatus::Pending.as_str()))
                    .add(budget::Column::SyncStatus.eq(SyncStatus::Failed.as_str())),
            )
            .all(&self.db)
            .await?;

        let mut report = SyncReport::default();
        for model in unsynced {
            let pushed = self.push(model).await?;
            report.record(&pushed.sync_status());
        }
        Ok(report)
    }

    /// Applies the remote copies of a user's budgets; returns rows changed.
    pub async fn pull(&self, user_id: &str) -> Result<usize> {
        let documents = self
            .remote
            .query_by_user(Collection::Budgets, user_id, true)
            .await?;

        let mut changed = 0;
        for document in documents {
            let mut incoming: budget::Model = from_document(document)?;
            incoming.sync_status = SyncStatus::Synced.to_string();

            match self.find_by_id(&incoming.id).await? {
                None => {
                    budget::ActiveModel::from(incoming)
                        .reset_all()
                        .insert(&self.db)
                        .await?;
                    changed += 1;
                }
                Some(local)
                    if remote_wins(&local.sync_status(), local.updated_at, incoming.updated_at) =>
                {
                    budget::ActiveModel::from(incoming)
                        .reset_all()
                        .update(&self.db)
                        .await?;
                    changed += 1;
                }
                Some(_) => {}
            }
        }
        Ok(changed)
    }

    async fn push(&self, mut model: budget::Model) -> Result<budget::Model> {
        let status = mirror(self.remote.as_ref(), Collection::Budgets, &model.id, &model).await;
        Budget::update_many()
            .col_expr(budget::Column::SyncStatus, Expr::value(status.as_str()))
            .filter(budget::Column::Id.eq(model.id.as_str()))
            .exec(&self.db)
            .await?;
        model.sync_status = status.to_string();
        Ok(model)
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::test_utils::*;

    #[tokio::test]
    async fn test_find_for_month_skips_templates_and_deleted() -> Result<()> {
        let (db, remote) = setup_test_env().await?;
        let repo = BudgetRepository::new(db, remote);

        let mut template = sample_budget("u1", 5, 2024);
        template.is_template = true;
        repo.insert(template).await?;
        assert!(repo.find_for_month("u1", 5, 2024).await?.is_none());

        let real = repo.insert(sample_budget("u1", 5, 2024)).await?;
        assert_eq!(
            repo.find_for_month("u1", 5, 2024).await?.unwrap().id,
            real.id
        );

        repo.soft_delete(&real.id).await?;
        assert!(repo.find_for_month("u1", 5, 2024).await?.is_none());
        assert_eq!(repo.list_templates("u1").await?.len(), 1);
        Ok(())
    }

    #[tokio::test]
    async fn test_budget_document_carries_allocations_text() -> Result<()> {
        let (db, remote) = setup_test_env().await?;
        let repo = BudgetRepository::new(db, remote.clone());
        let stored = repo.insert(sample_budget("u1", 1, 2025)).await?;

        let doc = remote.get(Collection::Budgets, &stored.id).await?.unwrap();
        assert_eq!(doc["month"], 1);
        assert!(doc["allocations"].as_str().unwrap().contains("FOOD"));
        Ok(())
    }
}
