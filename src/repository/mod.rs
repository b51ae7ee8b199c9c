//! Repositories for the entities mirrored to the remote document store.
//!
//! Every write follows the same policy: write the local row as `PENDING`, attempt the
//! remote upsert, then mark the row `SYNCED` or `FAILED`. A failed remote write never
//! fails the operation; the local copy is kept and [`sync_pending`](TransactionRepository::sync_pending)
//! retries it later. Pulls apply remote documents with last-write-wins on `updated_at`,
//! skipping local rows that still have unsynced changes.

pub mod budget;
pub mod savings_goal;
pub mod transaction;
pub mod user_profile;

pub use budget::BudgetRepository;
pub use savings_goal::SavingsGoalRepository;
pub use transaction::TransactionRepository;
pub use user_profile::UserProfileRepository;

use crate::entities::enums::SyncStatus;
use crate::remote::{Collection, RemoteStore, to_document};
use sea_orm::DatabaseConnection;
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, warn};

/// Outcome of a `sync_pending` pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncReport {
    /// Rows that needed a remote write
    pub attempted: usize,
    /// Rows now `SYNCED`
    pub synced: usize,
    /// Rows still `FAILED`
    pub failed: usize,
}

impl SyncReport {
    fn record(&mut self, status: &SyncStatus) {
        self.attempted += 1;
        if *status == SyncStatus::Synced {
            self.synced += 1;
        } else {
            self.failed += 1;
        }
    }

    /// Adds another report's counts to this one
    pub fn merge(&mut self, other: Self) {
        self.attempted += other.attempted;
        self.synced += other.synced;
        self.failed += other.failed;
    }
}

/// Writes `entity` to the remote store and reports the resulting sync status.
///
/// Remote and serialization failures are logged and turned into `FAILED`.
pub(crate) async fn mirror<T>(
    remote: &dyn RemoteStore,
    collection: Collection,
    id: &str,
    entity: &T,
) -> SyncStatus
where
    T: Serialize + Sync,
{
    let document = match to_document(entity) {
        Ok(document) => document,
        Err(e) => {
            warn!(%collection, id, error = %e, "Could not encode document");
            return SyncStatus::Failed;
        }
    };

    match remote.put(collection, id, document).await {
        Ok(()) => {
            debug!(%collection, id, "Mirrored to remote store");
            SyncStatus::Synced
        }
        Err(e) => {
            warn!(%collection, id, error = %e, "Remote write failed, keeping local copy");
            SyncStatus::Failed
        }
    }
}

/// Whether a local row may be overwritten by a remote copy.
pub(crate) fn remote_wins(
    local_status: &SyncStatus,
    local_updated: chrono::DateTime<chrono::Utc>,
    remote_updated: chrono::DateTime<chrono::Utc>,
) -> bool {
    *local_status == SyncStatus::Synced && remote_updated > local_updated
}

/// All synced repositories over one database and one remote store.
#[derive(Clone)]
pub struct Repositories {
    /// Transactions
    pub transactions: TransactionRepository,
    /// Budgets
    pub budgets: BudgetRepository,
    /// Savings goals
    pub goals: SavingsGoalRepository,
    /// User profiles
    pub users: UserProfileRepository,
}

impl Repositories {
    /// Builds every repository over the same connection and remote store
    #[must_use]
    pub fn new(db: &DatabaseConnection, remote: &Arc<dyn RemoteStore>) -> Self {
        Self {
            transactions: TransactionRepository::new(db.clone(), Arc::clone(remote)),
            budgets: BudgetRepository::new(db.clone(), Arc::clone(remote)),
            goals: SavingsGoalRepository::new(db.clone(), Arc::clone(remote)),
            users: UserProfileRepository::new(db.clone(), Arc::clone(remote)),
        }
    }

    /// Retries every `PENDING`/`FAILED` row in every synced table
    pub async fn sync_pending(&self) -> crate::errors::Result<SyncReport> {
        let mut report = self.transactions.sync_pending().await?;
        report.merge(self.budgets.sync_pending().await?);
        report.merge(self.goals.sync_pending().await?);
        report.merge(self.users.sync_pending().await?);
        Ok(report)
    }

    /// Pulls every collection for `user_id`; returns how many local rows changed
    pub async fn pull_all(&self, user_id: &str) -> crate::errors::Result<usize> {
        Ok(self.transactions.pull(user_id).await?
            + self.budgets.pull(user_id).await?
            + self.goals.pull(user_id).await?
            + self.users.pull(user_id).await?)
    }
}
