//! Entity module - Contains all SeaORM entity definitions for the database.
//! These entities represent the local tables; the synced ones also serialize
//! (camelCase) into the documents stored in the remote collections.

pub mod bill_reminder;
pub mod budget;
pub mod custom_category;
pub mod employment_settings;
pub mod enums;
pub mod loan;
pub mod loan_payment;
pub mod savings_goal;
pub mod subscription;
pub mod transaction;
pub mod user_profile;
pub mod user_settings;

// Re-export specific types to avoid conflicts
pub use bill_reminder::{
    Column as BillReminderColumn, Entity as BillReminder, Model as BillReminderModel,
};
pub use budget::{Column as BudgetColumn, Entity as Budget, Model as BudgetModel};
pub use custom_category::{
    Column as CustomCategoryColumn, Entity as CustomCategory, Model as CustomCategoryModel,
};
pub use employment_settings::{
    Column as EmploymentSettingsColumn, Entity as EmploymentSettings,
    Model as EmploymentSettingsModel,
};
pub use loan::{Column as LoanColumn, Entity as Loan, Model as LoanModel};
pub use loan_payment::{
    Column as LoanPaymentColumn, Entity as LoanPayment, Model as LoanPaymentModel,
};
pub use savings_goal::{
    Column as SavingsGoalColumn, Entity as SavingsGoal, Model as SavingsGoalModel,
};
pub use subscription::{
    Column as SubscriptionColumn, Entity as Subscription, Model as SubscriptionModel,
};
pub use transaction::{
    Column as TransactionColumn, Entity as Transaction, Model as TransactionModel,
};
pub use user_profile::{
    Column as UserProfileColumn, Entity as UserProfile, Model as UserProfileModel,
};
pub use user_settings::{
    Column as UserSettingsColumn, Entity as UserSettings, Model as UserSettingsModel,
};
