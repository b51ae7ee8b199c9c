//! Unified error type for fintrack.
//!
//! Every fallible operation in the crate returns [`Result`]. Validation failures are
//! ordinary values of [`Error`] so callers can show the message instead of crashing.

use thiserror::Error;

/// All errors produced by the crate.
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration could not be read or parsed
    #[error("Configuration error: {message}")]
    Config {
        /// What went wrong
        message: String,
    },

    /// The embedded database rejected an operation
    #[error("Database error: {0}")]
    Database(#[from] sea_orm::DbErr),

    /// An amount was zero, negative, NaN or infinite where that is not allowed
    #[error("Invalid amount: {amount}")]
    InvalidAmount {
        /// The offending amount
        amount: f64,
    },

    /// Use-case input validation failed
    #[error("Validation failed: {message}")]
    Validation {
        /// Human-readable reason
        message: String,
    },

    /// A record referenced by id does not exist (or is soft-deleted)
    #[error("{entity} not found: {id}")]
    NotFound {
        /// Kind of record, e.g. `"transaction"`
        entity: &'static str,
        /// The id that was looked up
        id: String,
    },

    /// A loan payment whose principal and interest do not add up to its amount
    #[error(
        "Payment split mismatch: principal {principal:.2} + interest {interest:.2} != amount {amount:.2}"
    )]
    PaymentMismatch {
        /// Total payment amount
        amount: f64,
        /// Principal component
        principal: f64,
        /// Interest component
        interest: f64,
    },

    /// The remote document store failed or is unreachable
    #[error("Remote store error: {message}")]
    Remote {
        /// Description from the remote side
        message: String,
    },

    /// JSON (de)serialization of a document or list column failed
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Filesystem error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Shorthand for a [`Error::Validation`] with the given message.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    /// Whether the error rejects the caller's input rather than reporting a failure
    /// of storage or the remote side.
    #[must_use]
    pub const fn is_invalid_input(&self) -> bool {
        matches!(
            self,
            Self::InvalidAmount { .. } | Self::Validation { .. } | Self::PaymentMismatch { .. }
        )
    }

    /// Shorthand for a [`Error::NotFound`].
    pub fn not_found(entity: &'static str, id: impl Into<String>) -> Self {
        Self::NotFound {
            entity,
            id: id.into(),
        }
    }
}

/// Convenience `Result` type
pub type Result<T> = std::result::Result<T, Error>;
