//! String-backed enums stored in text columns and remote documents.
//!
//! Each enum is persisted as its SCREAMING_SNAKE name. A name this build does not
//! recognize decodes to `Unknown(raw)` and is written back unchanged, so newer data
//! is never silently rewritten to some default.

use chrono::{Months, NaiveDate};
use serde::{Deserialize, Serialize};

macro_rules! string_enum {
    (
        $(#[$meta:meta])*
        pub enum $name:ident {
            $($(#[$vmeta:meta])* $variant:ident => $text:literal),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(from = "String", into = "String")]
        pub enum $name {
            $($(#[$vmeta])* $variant,)+
            /// A stored name this build does not recognize, kept verbatim
            Unknown(String),
        }

        impl $name {
            /// Name as persisted in the database and in remote documents
            #[must_use]
            pub fn as_str(&self) -> &str {
                match self {
                    $(Self::$variant => $text,)+
                    Self::Unknown(raw) => raw,
                }
            }

            /// Whether this value came from an unrecognized stored name
            #[must_use]
            pub const fn is_unknown(&self) -> bool {
                matches!(self, Self::Unknown(_))
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                match value {
                    $($text => Self::$variant,)+
                    other => Self::Unknown(other.to_string()),
                }
            }
        }

        impl From<String> for $name {
            fn from(value: String) -> Self {
                Self::from(value.as_str())
            }
        }

        impl From<$name> for String {
            fn from(value: $name) -> Self {
                value.as_str().to_string()
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

string_enum! {
    /// Direction of money movement
    pub enum TransactionType {
        /// Money in
        Income => "INCOME",
        /// Money out
        Expense => "EXPENSE",
    }
}

string_enum! {
    /// Built-in transaction categories
    pub enum TransactionCategory {
        /// Groceries and eating out
        Food => "FOOD",
        /// Fuel, fares, parking
        Transport => "TRANSPORT",
        /// Rent, mortgage, repairs
        Housing => "HOUSING",
        /// Power, water, internet, phone
        Utilities => "UTILITIES",
        /// Leisure
        Entertainment => "ENTERTAINMENT",
        /// Medical
        Healthcare => "HEALTHCARE",
        /// General purchases
        Shopping => "SHOPPING",
        /// Tuition, courses, books
        Education => "EDUCATION",
        /// Trips
        Travel => "TRAVEL",
        /// Employment income
        Salary => "SALARY",
        /// Contract income
        Freelance => "FREELANCE",
        /// Dividends, interest, gains
        Investment => "INVESTMENT",
        /// Gifts given or received
        Gift => "GIFT",
        /// Anything else
        Other => "OTHER",
    }
}

string_enum! {
    /// Repeat interval for recurring transactions and bills
    pub enum RecurringPeriod {
        /// Every day
        Daily => "DAILY",
        /// Every 7 days
        Weekly => "WEEKLY",
        /// Every calendar month
        Monthly => "MONTHLY",
        /// Every calendar year
        Yearly => "YEARLY",
    }
}

impl RecurringPeriod {
    /// The next occurrence after `date`, or `None` for an unknown period.
    #[must_use]
    pub fn advance(&self, date: NaiveDate) -> Option<NaiveDate> {
        match self {
            Self::Daily => date.succ_opt(),
            Self::Weekly => date.checked_add_days(chrono::Days::new(7)),
            Self::Monthly => date.checked_add_months(Months::new(1)),
            Self::Yearly => date.checked_add_months(Months::new(12)),
            Self::Unknown(_) => None,
        }
    }
}

string_enum! {
    /// Whether a local write has been mirrored to the remote store
    pub enum SyncStatus {
        /// Written locally, remote attempt not finished
        Pending => "PENDING",
        /// Mirrored to the remote store
        Synced => "SYNCED",
        /// Remote attempt failed; retried later
        Failed => "FAILED",
    }
}

string_enum! {
    /// Savings goal priority
    pub enum GoalPriority {
        /// Nice to have
        Low => "LOW",
        /// Default
        Medium => "MEDIUM",
        /// Fund first
        High => "HIGH",
    }
}

string_enum! {
    /// What a savings goal is for
    pub enum GoalCategory {
        /// Rainy-day fund
        Emergency => "EMERGENCY",
        /// Holidays
        Vacation => "VACATION",
        /// Deposit or renovation
        Home => "HOME",
        /// Car or bike
        Vehicle => "VEHICLE",
        /// Study
        Education => "EDUCATION",
        /// Pension top-up
        Retirement => "RETIREMENT",
        /// Anything else
        Other => "OTHER",
    }
}

string_enum! {
    /// Kind of loan
    pub enum LoanType {
        /// Unsecured personal loan
        Personal => "PERSONAL",
        /// Student loan
        Student => "STUDENT",
        /// Home loan
        Mortgage => "MORTGAGE",
        /// Vehicle finance
        Auto => "AUTO",
        /// Anything else
        Other => "OTHER",
    }
}

string_enum! {
    /// Subscription billing interval
    pub enum BillingCycle {
        /// Every 7 days
        Weekly => "WEEKLY",
        /// Every month
        Monthly => "MONTHLY",
        /// Every 3 months
        Quarterly => "QUARTERLY",
        /// Every year
        Yearly => "YEARLY",
    }
}

impl BillingCycle {
    /// The billing date following `date`, or `None` for an unknown cycle.
    #[must_use]
    pub fn advance(&self, date: NaiveDate) -> Option<NaiveDate> {
        match self {
            Self::Weekly => date.checked_add_days(chrono::Days::new(7)),
            Self::Monthly => date.checked_add_months(Months::new(1)),
            Self::Quarterly => date.checked_add_months(Months::new(3)),
            Self::Yearly => date.checked_add_months(Months::new(12)),
            Self::Unknown(_) => None,
        }
    }

    /// Multiplier turning one charge into an average monthly cost.
    #[must_use]
    pub fn monthly_factor(&self) -> Option<f64> {
        match self {
            Self::Weekly => Some(52.0 / 12.0),
            Self::Monthly => Some(1.0),
            Self::Quarterly => Some(1.0 / 3.0),
            Self::Yearly => Some(1.0 / 12.0),
            Self::Unknown(_) => None,
        }
    }
}

string_enum! {
    /// Employment situation used for income projections
    pub enum EmploymentType {
        /// Salaried full time
        FullTime => "FULL_TIME",
        /// Salaried part time
        PartTime => "PART_TIME",
        /// Own business
        SelfEmployed => "SELF_EMPLOYED",
        /// Fixed-term contracts
        Contractor => "CONTRACTOR",
        /// No employment income
        Unemployed => "UNEMPLOYED",
        /// In education
        Student => "STUDENT",
        /// Pension income
        Retired => "RETIRED",
    }
}

string_enum! {
    /// Kind of push or local notification; selects channel, icon and deep link
    pub enum NotificationType {
        /// Balance fell below the user's threshold
        LowBalance => "LOW_BALANCE",
        /// A savings goal crossed a progress milestone
        GoalMilestone => "GOAL_MILESTONE",
        /// A bill is due soon
        BillReminder => "BILL_REMINDER",
        /// A subscription charge is due soon
        SubscriptionReminder => "SUBSCRIPTION_REMINDER",
        /// Spending went over a budget allocation
        BudgetAlert => "BUDGET_ALERT",
        /// Anything else
        General => "GENERAL",
    }
}
