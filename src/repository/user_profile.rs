//! User profile repository - local `user_profiles` table mirrored to `users`.

use super::{SyncReport, mirror, remote_wins};
use crate::entities::{UserProfile, enums::SyncStatus, user_profile};
use crate::errors::Result;
use crate::remote::{Collection, RemoteStore, from_document};
use chrono::Utc;
use sea_orm::sea_query::Expr;
use sea_orm::{ActiveModelTrait, Condition, prelude::*};
use std::sync::Arc;

/// Local-first store for user profiles
#[derive(Clone)]
pub struct UserProfileRepository {
    db: DatabaseConnection,
    remote: Arc<dyn RemoteStore>,
}

impl UserProfileRepository {
    /// Creates a repository over `db`, mirroring to `remote`
    #[must_use]
    pub fn new(db: DatabaseConnection, remote: Arc<dyn RemoteStore>) -> Self {
        Self { db, remote }
    }

    /// Inserts or replaces a profile and mirrors it.
    pub async fn save(&self, mut model: user_profile::Model) -> Result<user_profile::Model> {
        model.sync_status = SyncStatus::Pending.to_string();
        model.updated_at = Utc::now();
        let exists = self.find_by_id(&model.id).await?.is_some();
        let active = user_profile::ActiveModel::from(model).reset_all();
        let saved = if exists {
            active.update(&self.db).await?
        } else {
            active.insert(&self.db).await?
        };
        self.push(saved).await
    }

    /// Fetches a profile by user id.
    pub async fn find_by_id(&self, id: &str) -> Result<Option<user_profile::Model>> {
        UserProfile::find_by_id(id.to_string())
            .one(&self.db)
            .await
            .map_err(Into::into)
    }

    /// Retries the remote write for every `PENDING` or `FAILED` row.
    pub async fn sync_pending(&self) -> Result<SyncReport> {
        let unsynced = UserProfile::find()
            .filter(
                Condition::any()
                    .add(user_profile::Column::SyncStatus.eq(SyncStatus::Pending.as_str()))
                    .add(user_profile::Column::SyncStatus.eq(SyncStatus::Failed.as_str())),
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

    /// Applies the remote copy of the profile; returns rows changed.
    pub async fn pull(&self, user_id: &str) -> Result<usize> {
        let Some(document) = self.remote.get(Collection::Users, user_id).await? else {
            return Ok(0);
        };
        let mut incoming: user_profile::Model = from_document(document)?;
        incoming.sync_status = SyncStatus::Synced.to_string();

        let changed = match self.find_by_id(user_id).await? {
            None => {
                user_profile::ActiveModel::from(incoming)
                    .reset_all()
                    .insert(&self.db)
                    .await?;
                1
            }
            Some(local)
                if remote_wins(&local.sync_status(), local.updated_at, incoming.updated_at) =>
            {
                user_profile::ActiveModel::from(incoming)
                    .reset_all()
                    .update(&self.db)
                    .await?;
                1
            }
            Some(_) => 0,
        };
        Ok(changed)
    }

    async fn push(&self, mut model: user_profile::Model) -> Result<user_profile::Model> {
        let status = mirror(self.remote.as_ref(), Collection::Users, &model.id, &model).await;
        UserProfile::update_many()
            .col_expr(user_profile::Column::SyncStatus, Expr::value(status.as_str()))
            .filter(user_profile::Column::Id.eq(model.id.as_str()))
            .exec(&self.db)
            .await?;
        model.sync_status = status.to_string();
        Ok(model)
    }
}
