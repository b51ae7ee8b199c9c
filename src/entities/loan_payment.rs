//! Loan payment entity - One payment against a loan, split into principal and interest.
//!
//! The split must add up to `amount`; the loan use-cases reject anything else.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Loan payment database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "loan_payments")]
pub struct Model {
    /// UUID of the payment
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    /// Loan this payment belongs to
    pub loan_id: String,
    /// Total paid
    pub amount: f64,
    /// Portion that reduced the balance
    pub principal_amount: f64,
    /// Portion that paid interest
    pub interest_amount: f64,
    /// When the payment was made
    pub payment_date: Date,
    /// Payment on top of the scheduled monthly payment
    pub is_extra_payment: bool,
    /// Rate used when paid from another currency (1.0 otherwise)
    pub exchange_rate: f64,
    /// Optional note
    pub notes: Option<String>,
}

/// Defines relationships between `LoanPayment` and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each payment belongs to one loan
    #[sea_orm(
        belongs_to = "super::loan::Entity",
        from = "Column::LoanId",
        to = "super::loan::Column::Id"
    )]
    Loan,
}

impl Related<super::loan::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Loan.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
