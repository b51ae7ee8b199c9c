//! Loan entity - A loan being paid off, with its payment history in `loan_payments`.

use super::enums::LoanType;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Loan database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "loans")]
pub struct Model {
    /// UUID of the loan
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    /// Owner of the loan
    pub user_id: String,
    /// Display name, e.g. the lender
    pub name: String,
    /// Principal at the start of the loan
    pub original_amount: f64,
    /// Principal still owed
    pub remaining_amount: f64,
    /// Annual interest rate in percent (6.66 means 6.66%)
    pub interest_rate: f64,
    /// Scheduled monthly payment
    pub monthly_payment: f64,
    /// ISO currency code of the loan
    pub currency: String,
    /// First day of the loan
    pub start_date: Date,
    /// Set when the remaining amount reaches zero
    pub payoff_date: Option<Date>,
    /// [`LoanType`] name
    pub loan_type: String,
}

/// Defines relationships between Loan and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// One loan has many payments
    #[sea_orm(has_many = "super::loan_payment::Entity")]
    Payments,
}

impl Related<super::loan_payment::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Payments.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    /// Parsed loan type
    #[must_use]
    pub fn loan_type(&self) -> LoanType {
        self.loan_type.as_str().into()
    }
}
