//! Parsed transaction import with duplicate detection.
//!
//! Transactions parsed from bank messages or statements often arrive more than once.
//! [`ImportBuffer`] holds the candidates of one import session and drops a candidate
//! when an entry with the same description and amount is already buffered within
//! 24 hours of it, and refuses entries that could never be stored (blank description,
//! non-positive amount, unknown type). [`import_parsed`] then stores the survivors,
//! applying the same rule against transactions already saved for the user.

use super::transaction::{NewTransaction, add_transaction, validate_fields};
use crate::{
    entities::enums::{TransactionCategory, TransactionType},
    errors::Result,
    repository::TransactionRepository,
};
use chrono::{DateTime, TimeDelta, Utc};
use tracing::{debug, info, warn};

/// Two entries closer than this (inclusive) can be duplicates.
pub const DUPLICATE_WINDOW: TimeDelta = TimeDelta::hours(24);

/// A transaction extracted from an external source, not yet stored
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedTransaction {
    /// Description as parsed
    pub description: String,
    /// Positive amount
    pub amount: f64,
    /// Income or expense
    pub transaction_type: TransactionType,
    /// Best-guess category
    pub category: TransactionCategory,
    /// When the money moved
    pub date: DateTime<Utc>,
}

fn same_cents(a: f64, b: f64) -> bool {
    (a - b).abs() < 0.005
}

/// Whether two entries describe the same money movement.
#[must_use]
pub fn is_duplicate(
    description_a: &str,
    amount_a: f64,
    date_a: DateTime<Utc>,
    description_b: &str,
    amount_b: f64,
    date_b: DateTime<Utc>,
) -> bool {
    description_a == description_b
        && same_cents(amount_a, amount_b)
        && (date_a - date_b).abs() <= DUPLICATE_WINDOW
}

/// Candidates of one import session.
///
/// Owned by whoever runs the import; nothing here is global.
#[derive(Debug, Default)]
pub struct ImportBuffer {
    entries: Vec<ParsedTransaction>,
}

impl ImportBuffer {
    /// Empty buffer
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `candidate` unless it is invalid or duplicates a buffered entry; returns
    /// whether it was added.
    pub fn try_add(&mut self, candidate: ParsedTransaction) -> bool {
        if let Err(e) = validate_fields(
            candidate.amount,
            &candidate.description,
            &candidate.transaction_type,
        ) {
            debug!(description = %candidate.description, error = %e, "Dropping invalid parsed transaction");
            return false;
        }
        let duplicate = self.entries.iter().any(|existing| {
            is_duplicate(
                &existing.description,
                existing.amount,
                existing.date,
                &candidate.description,
                candidate.amount,
                candidate.date,
            )
        });
        if duplicate {
            debug!(description = %candidate.description, "Dropping duplicate parsed transaction");
            return false;
        }
        self.entries.push(candidate);
        true
    }

    /// Buffered entries in arrival order
    #[must_use]
    pub fn entries(&self) -> &[ParsedTransaction] {
        &self.entries
    }

    /// Number of buffered entries
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether nothing is buffered
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Empties the buffer, returning its entries
    pub fn drain(&mut self) -> Vec<ParsedTransaction> {
        std::mem::take(&mut self.entries)
    }
}

/// Outcome of [`import_parsed`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ImportSummary {
    /// Entries stored as new transactions
    pub imported: usize,
    /// Entries skipped as duplicates of stored transactions
    pub skipped: usize,
    /// Entries refused by validation
    pub rejected: usize,
}

/// Stores `parsed` unless an equivalent transaction is already saved; returns whether
/// it was stored.
async fn store_parsed(
    repo: &TransactionRepository,
    user_id: &str,
    parsed: &ParsedTransaction,
) -> Result<bool> {
    let window_end = parsed.date + DUPLICATE_WINDOW + TimeDelta::seconds(1);
    let nearby = repo
        .list_between(user_id, parsed.date - DUPLICATE_WINDOW, window_end)
        .await?;
    let already_stored = nearby.iter().any(|t| {
        is_duplicate(
            &t.description,
            t.amount,
            t.date,
            &parsed.description,
            parsed.amount,
            parsed.date,
        )
    });
    if already_stored {
        return Ok(false);
    }

    add_transaction(
        repo,
        NewTransaction {
            user_id: user_id.to_string(),
            amount: parsed.amount,
            category: parsed.category.clone(),
            transaction_type: parsed.transaction_type.clone(),
            description: parsed.description.clone(),
            date: parsed.date,
            recurring_period: None,
            notes: None,
        },
    )
    .await?;
    Ok(true)
}

/// Stores every buffered entry that is not already saved for `user_id`.
///
/// An entry the use case refuses is counted as rejected and the import goes on.
/// Any other failure stops the import and puts the unprocessed entries back into
/// `buffer`, so a later call picks them up.
pub async fn import_parsed(
    repo: &TransactionRepository,
    user_id: &str,
    buffer: &mut ImportBuffer,
) -> Result<ImportSummary> {
    let mut summary = ImportSummary::default();
    let mut pending = buffer.drain().into_iter();

    while let Some(parsed) = pending.next() {
        match store_parsed(repo, user_id, &parsed).await {
            Ok(true) => summary.imported += 1,
            Ok(false) => summary.skipped += 1,
            Err(e) if e.is_invalid_input() => {
                warn!(user_id, description = %parsed.description, error = %e, "Rejected parsed transaction");
                summary.rejected += 1;
            }
            Err(e) => {
                buffer.entries = std::iter::once(parsed).chain(pending).collect();
                return Err(e);
            }
        }
    }

    info!(
        user_id,
        imported = summary.imported,
        skipped = summary.skipped,
        rejected = summary.rejected,
        "Parsed transactions imported"
    );
    Ok(summary)
}
