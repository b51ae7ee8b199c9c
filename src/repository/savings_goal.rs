//! Savings goal repository - local `savings_goals` table mirrored to `savingsGoals`.

use super::{SyncReport, mirror, remote_wins};
use crate::entities::{SavingsGoal, enums::SyncStatus, savings_goal};
use crate::errors::{Error, Result};
use crate::remote::{Collection, RemoteStore, from_document};
use chrono::Utc;
use sea_orm::sea_query::Expr;
use sea_orm::{ActiveModelTrait, Condition, QueryOrder, prelude::*};
use std::sync::Arc;
use tracing::instrument;

/// Local-first store for savings goals
#[derive(Clone)]
pub struct SavingsGoalRepository {
    db: DatabaseConnection,
    remote: Arc<dyn RemoteStore>,
}

impl SavingsGoalRepository {
    /// Creates a repository over `db`, mirroring to `remote`
    #[must_use]
    pub fn new(db: DatabaseConnection, remote: Arc<dyn RemoteStore>) -> Self {
        Self { db, remote }
    }

    /// Inserts a new goal and mirrors it.
    #[instrument(skip(self, model), fields(id = %model.id))]
    pub async fn insert(&self, mut model: savings_goal::Model) -> Result<savings_goal::Model> {
        model.sync_status = SyncStatus::Pending.to_string();
        model.updated_at = Utc::now();
        let inserted = savings_goal::ActiveModel::from(model)
            .reset_all()
            .insert(&self.db)
            .await?;
        self.push(inserted).await
    }

    /// Replaces an existing goal and mirrors it.
    #[instrument(skip(self, model), fields(id = %model.id))]
    pub async fn update(&self, mut model: savings_goal::Model) -> Result<savings_goal::Model> {
        model.sync_status = SyncStatus::Pending.to_string();
        model.updated_at = Utc::now();
        let updated = savings_goal::ActiveModel::from(model)
            .reset_all()
            .update(&self.db)
            .await?;
        self.push(updated).await
    }

    /// Marks a goal deleted and mirrors the deletion.
    pub async fn soft_delete(&self, id: &str) -> Result<savings_goal::Model> {
        let mut model = self
            .find_by_id(id)
            .await?
            .ok_or_else(|| Error::not_found("savings goal", id))?;
        model.is_deleted = true;
        self.update(model).await
    }

    /// Fetches a goal by id, including soft-deleted ones.
    pub async fn find_by_id(&self, id: &str) -> Result<Option<savings_goal::Model>> {
        SavingsGoal::find_by_id(id.to_string())
            .one(&self.db)
            .await
            .map_err(Into::into)
    }

    /// Active goals for a user, nearest deadline first.
    pub async fn list_for_user(&self, user_id: &str) -> Result<Vec<savings_goal::Model>> {
        SavingsGoal::find()
            .filter(savings_goal::Column::UserId.eq(user_id))
            .filter(savings_goal::Column::IsDeleted.eq(false))
            .order_by_asc(savings_goal::Column::Deadline)
            .order_by_asc(savings_goal::Column::Name)
            .all(&self.db)
            .await
            .map_err(Into::into)
    }

    /// Retries the remote write for every `PENDING` or `FAILED` row.
    pub async fn sync_pending(&self) -> Result<SyncReport> {
        let unsynced = SavingsGoal::find()
            .filter(
                Condition::any()
                    .add(savings_goal::Column::SyncStatus.eq(SyncStatus::Pending.as_str()))
                    .add(savings_goal::Column::SyncStatus.eq(SyncStatus::Failed.as_str())),
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

    /// Applies the remote copies of a user's goals; returns rows changed.
    pub async fn pull(&self, user_id: &str) -> Result<usize> {
        let documents = self
            .remote
            .query_by_user(Collection::SavingsGoals, user_id, true)
            .await?;

        let mut changed = 0;
        for document in documents {
            let mut incoming: savings_goal::Model = from_document(document)?;
            incoming.sync_status = SyncStatus::Synced.to_string();

            match self.find_by_id(&incoming.id).await? {
                None => {
                    savings_goal::ActiveModel::from(incoming)
                        .reset_all()
                        .insert(&self.db)
                        .await?;
                    changed += 1;
                }
                Some(local)
                    if remote_wins(&local.sync_status(), local.updated_at, incoming.updated_at) =>
                {
                    savings_goal::ActiveModel::from(incoming)
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

    async fn push(&self, mut model: savings_goal::Model) -> Result<savings_goal::Model> {
        let status = mirror(
            self.remote.as_ref(),
            Collection::SavingsGoals,
            &model.id,
            &model,
        )
        .await;
        SavingsGoal::update_many()
            .col_expr(savings_goal::Column::SyncStatus, Expr::value(status.as_str()))
            .filter(savings_goal::Column::Id.eq(model.id.as_str()))
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
    async fn test_local_pending_edit_is_not_overwritten_by_pull() -> Result<()> {
        let (db, remote) = setup_test_env().await?;
        let repo = SavingsGoalRepository::new(db, remote.clone());
        let goal = repo.insert(sample_goal("u1", "Bike", 800.0)).await?;

        // Offline edit stays FAILED locally
        remote.set_offline(true);
        let mut edited = goal.clone();
        edited.name = "Road bike".to_string();
        let edited = repo.update(edited).await?;
        assert_eq!(edited.sync_status(), SyncStatus::Failed);

        remote.set_offline(false);
        assert_eq!(repo.pull("u1").await?, 0);
        assert_eq!(repo.find_by_id(&goal.id).await?.unwrap().name, "Road bike");
        Ok(())
    }
}
