//! Employment settings entity - Income details used for planning.

use super::enums::EmploymentType;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Employment settings database model, one row per user
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "employment_settings")]
pub struct Model {
    /// Owner
    #[sea_orm(primary_key, auto_increment = false)]
    pub user_id: String,
    /// [`EmploymentType`] name
    pub employment_type: String,
    /// Employer name, if any
    pub employer: Option<String>,
    /// Expected monthly income
    pub monthly_income: f64,
    /// Day of month income arrives (1-31)
    pub pay_day: Option<i32>,
}

/// Employment settings have no relations
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    /// Parsed employment type
    #[must_use]
    pub fn employment_type(&self) -> EmploymentType {
        self.employment_type.as_str().into()
    }
}
