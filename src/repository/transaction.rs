//! Transaction repository - local `transactions` table mirrored to the `transactions` collection.

use super::{SyncReport, mirror, remote_wins};
use crate::entities::{Transaction, enums::SyncStatus, transaction};
use crate::errors::{Error, Result};
use crate::remote::{Collection, RemoteStore, from_document};
use chrono::{DateTime, Utc};
use sea_orm::sea_query::Expr;
use sea_orm::{ActiveModelTrait, Condition, QueryOrder, prelude::*};
use std::sync::Arc;
use tracing::{debug, instrument};

/// Local-first store for transactions
#[derive(Clone)]
pub struct TransactionRepository {
    db: DatabaseConnection,
    remote: Arc<dyn RemoteStore>,
}

impl TransactionRepository {
    /// Creates a repository over `db`, mirroring to `remote`
    #[must_use]
    pub fn new(db: DatabaseConnection, remote: Arc<dyn RemoteStore>) -> Self {
        Self { db, remote }
    }

    /// Inserts a new transaction and mirrors it.
    #[instrument(skip(self, model), fields(id = %model.id))]
    pub async fn insert(&self, mut model: transaction::Model) -> Result<transaction::Model> {
        model.sync_status = SyncStatus::Pending.to_string();
        model.updated_at = Utc::now();

        let inserted = transaction::ActiveModel::from(model)
            .reset_all()
            .insert(&self.db)
            .await?;
        debug!("Transaction stored locally");
        self.push(inserted).await
    }

    /// Replaces an existing transaction and mirrors it.
    #[instrument(skip(self, model), fields(id = %model.id))]
    pub async fn update(&self, mut model: transaction::Model) -> Result<transaction::Model> {
        model.sync_status = SyncStatus::Pending.to_string();
        model.updated_at = Utc::now();

        let updated = transaction::ActiveModel::from(model)
            .reset_all()
            .update(&self.db)
            .await?;
        self.push(updated).await
    }

    /// Marks a transaction deleted and mirrors the deletion.
    pub async fn soft_delete(&self, id: &str) -> Result<transaction::Model> {
        let mut model = self
            .find_by_id(id)
            .await?
            .ok_or_else(|| Error::not_found("transaction", id))?;
        model.is_deleted = true;
        self.update(model).await
    }

    /// Fetches a transaction by id, including soft-deleted ones.
    pub async fn find_by_id(&self, id: &str) -> Result<Option<transaction::Model>> {
        Transaction::find_by_id(id.to_string())
            .one(&self.db)
            .await
            .map_err(Into::into)
    }

    /// Active transactions for a user, newest first.
    pub async fn list_for_user(&self, user_id: &str) -> Result<Vec<transaction::Model>> {
        Transaction::find()
            .filter(transaction::Column::UserId.eq(user_id))
            .filter(transaction::Column::IsDeleted.eq(false))
            .order_by_desc(transaction::Column::Date)
            .all(&self.db)
            .await
            .map_err(Into::into)
    }

    /// Active transactions for a user dated in `[from, to)`, oldest first.
    pub async fn list_between(
        &self,
        user_id: &str,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<transaction::Model>> {
        Transaction::find()
            .filter(transaction::Column::UserId.eq(user_id))
            .filter(transaction::Column::IsDeleted.eq(false))
            .filter(transaction::Column::Date.gte(from))
            .filter(transaction::Column::Date.lt(to))
            .order_by_asc(transaction::Column::Date)
            .all(&self.db)
            .await
            .map_err(Into::into)
    }

    /// Retries the remote write for every `PENDING` or `FAILED` row.
    pub async fn sync_pending(&self) -> Result<SyncReport> {
        let unsynced = Transaction::find()
            .filter(
                Condition::any()
                    .add(transaction::Column::SyncStatus.eq(SyncStatus::Pending.as_str()))
                    .add(transaction::Column::SyncStatus.eq(SyncStatus::Failed.as_str())),
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

    /// Applies the remote copies of a user's transactions; returns rows changed.
    pub async fn pull(&self, user_id: &str) -> Result<usize> {
        let documents = self
            .remote
            .query_by_user(Collection::Transactions, user_id, true)
            .await?;

        let mut changed = 0;
        for document in documents {
            let mut incoming: transaction::Model = from_document(document)?;
            incoming.sync_status = SyncStatus::Synced.to_string();

            match self.find_by_id(&incoming.id).await? {
                None => {
                    transaction::ActiveModel::from(incoming)
                        .reset_all()
                        .insert(&self.db)
                        .await?;
                    changed += 1;
                }
                Some(local)
                    if remote_wins(&local.sync_status(), local.updated_at, incoming.updated_at) =>
                {
                    transaction::ActiveModel::from(incoming)
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

    async fn push(&self, mut model: transaction::Model) -> Result<transaction::Model> {
        let status = mirror(
            self.remote.as_ref(),
            Collection::Transactions,
            &model.id,
            &model,
        )
        .await;

        Transaction::update_many()
            .col_expr(
                transaction::Column::SyncStatus,
                Expr::value(status.as_str()),
            )
            .filter(transaction::Column::Id.eq(model.id.as_str()))
            .exec(&self.db)
            .await?;

        model.sync_status = status.to_string();
        Ok(model)
    }
}
