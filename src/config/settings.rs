//! Application configuration loading from config.toml
//!
//! The file configures the database location, the background worker cadence,
//! alert defaults, and the loans whose payment schedules are seeded on startup.
//! Every section is optional; missing values fall back to the defaults below.

use crate::errors::{Error, Result};
use chrono::NaiveDate;
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

/// Environment variable that overrides the config file location
pub const CONFIG_PATH_ENV: &str = "FINTRACK_CONFIG";

/// Configuration structure representing the entire config.toml file
#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    /// Local database settings
    pub database: DatabaseConfig,
    /// Background job settings
    pub worker: WorkerConfig,
    /// Alert defaults
    pub alerts: AlertConfig,
    /// Users the background checks run for
    pub users: Vec<String>,
    /// Loans seeded with a fixed payment schedule
    pub loans: Vec<LoanSeed>,
}

/// `[database]` section
#[derive(Debug, Deserialize, Default, Clone)]
#[serde(default)]
pub struct DatabaseConfig {
    /// `SQLite` URL; `DATABASE_URL` overrides it
    pub url: Option<String>,
}

/// `[worker]` section
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct WorkerConfig {
    /// Seconds between periodic check runs
    pub check_interval_secs: u64,
    /// First retry delay after a failed run
    pub initial_backoff_secs: u64,
    /// Upper bound for the retry delay
    pub max_backoff_secs: u64,
    /// Retries per tick before waiting for the next tick
    pub max_retries: u32,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            check_interval_secs: 6 * 60 * 60,
            initial_backoff_secs: 30,
            max_backoff_secs: 60 * 60,
            max_retries: 5,
        }
    }
}

impl WorkerConfig {
    /// Interval between periodic runs
    #[must_use]
    pub const fn check_interval(&self) -> Duration {
        Duration::from_secs(self.check_interval_secs)
    }

    /// First retry delay
    #[must_use]
    pub const fn initial_backoff(&self) -> Duration {
        Duration::from_secs(self.initial_backoff_secs)
    }

    /// Retry delay cap
    #[must_use]
    pub const fn max_backoff(&self) -> Duration {
        Duration::from_secs(self.max_backoff_secs)
    }
}

/// `[alerts]` section
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct AlertConfig {
    /// Threshold used when a user has no settings row yet
    pub default_low_balance_threshold: f64,
    /// Goal progress percentages that trigger a notification
    pub goal_milestones: Vec<i32>,
}

impl Default for AlertConfig {
    fn default() -> Self {
        Self {
            default_low_balance_threshold: 100.0,
            goal_milestones: vec![25, 50, 75, 100],
        }
    }
}

/// A loan and its literal payment schedule, seeded once.
#[derive(Debug, Deserialize, Clone)]
pub struct LoanSeed {
    /// Fixed id so seeding is idempotent
    pub id: String,
    /// Owner
    pub user_id: String,
    /// Display name
    pub name: String,
    /// Principal at the start
    pub original_amount: f64,
    /// Balance before the first scheduled payment
    pub opening_balance: f64,
    /// Annual rate in percent
    pub interest_rate: f64,
    /// Scheduled monthly payment
    pub monthly_payment: f64,
    /// ISO currency code
    #[serde(default = "default_currency")]
    pub currency: String,
    /// First day of the loan
    pub start_date: NaiveDate,
    /// `LoanType` name
    #[serde(default = "default_loan_type")]
    pub loan_type: String,
    /// Payment rows, in month order
    #[serde(default)]
    pub schedule: Vec<ScheduleRow>,
}

/// One row of a seeded schedule
#[derive(Debug, Deserialize, Clone, Copy)]
pub struct ScheduleRow {
    /// Month number, starting at 1
    pub month: u32,
    /// Total paid
    pub payment: f64,
    /// Interest portion
    pub interest: f64,
    /// Principal portion
    pub principal: f64,
}

fn default_currency() -> String {
    "USD".to_string()
}

fn default_loan_type() -> String {
    "PERSONAL".to_string()
}

/// Loads configuration from a TOML file
///
/// # Errors
/// Returns an error if:
/// - The file cannot be read
/// - The TOML syntax is invalid
/// - A field has the wrong type
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<AppConfig> {
    let path_ref = path.as_ref();
    tracing::debug!("Attempting to load configuration from: {:?}", path_ref);
    let contents = std::fs::read_to_string(path_ref).map_err(|e| Error::Config {
        message: format!("Failed to read config file {}: {e}", path_ref.display()),
    })?;

    parse_config(&contents)
}

/// Parses configuration from TOML text.
pub fn parse_config(contents: &str) -> Result<AppConfig> {
    toml::from_str(contents).map_err(|e| Error::Config {
        message: format!("Failed to parse config.toml: {e}"),
    })
}

/// Loads configuration from `FINTRACK_CONFIG`, or ./config.toml.
///
/// A missing default file is not an error; the defaults are used instead.
pub fn load_default_config() -> Result<AppConfig> {
    if let Ok(path) = std::env::var(CONFIG_PATH_ENV) {
        return load_config(path);
    }
    let default_path = Path::new("config.toml");
    if default_path.exists() {
        load_config(default_path)
    } else {
        tracing::info!("No config.toml found, using defaults");
        Ok(AppConfig::default())
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    #![allow(clippy::float_cmp)]
    use super::*;
    use std::io::Write;

    #[test]
    fn test_parse_full_config() {
        let toml_str = r#"
            users = ["user-1"]

            [database]
            url = "sqlite::memory:"

            [worker]
            check_interval_secs = 60
            max_retries = 2

            [alerts]
            default_low_balance_threshold = 250.0
            goal_milestones = [50, 100]

            [[loans]]
            id = "loan-1"
            user_id = "user-1"
            name = "Car loan"
            original_amount = 15000.0
            opening_balance = 10317.64
            interest_rate = 6.66
            monthly_payment = 900.0
            start_date = "2024-01-01"

            [[loans.schedule]]
            month = 1
            payment = 900.0
            interest = 57.26
            principal = 842.74
        "#;

        let config = parse_config(toml_str).unwrap();
        assert_eq!(config.users, vec!["user-1".to_string()]);
        assert_eq!(config.database.url.as_deref(), Some("sqlite::memory:"));
        assert_eq!(config.worker.check_interval_secs, 60);
        assert_eq!(config.worker.max_retries, 2);
        // Unset worker fields keep their defaults
        assert_eq!(config.worker.initial_backoff_secs, 30);
        assert_eq!(config.alerts.default_low_balance_threshold, 250.0);
        assert_eq!(config.alerts.goal_milestones, vec![50, 100]);

        let loan = &config.loans[0];
        assert_eq!(loan.currency, "USD");
        assert_eq!(loan.loan_type, "PERSONAL");
        assert_eq!(loan.schedule.len(), 1);
        assert_eq!(loan.schedule[0].principal, 842.74);
    }

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = parse_config("").unwrap();
        assert!(config.loans.is_empty());
        assert_eq!(config.alerts.goal_milestones, vec![25, 50, 75, 100]);
        assert_eq!(config.worker.check_interval(), Duration::from_secs(21_600));
    }

    #[test]
    fn test_invalid_toml_is_config_error() {
        let result = parse_config("[worker\ncheck_interval_secs = 1");
        assert!(matches!(result, Err(Error::Config { .. })));
    }

    #[test]
    fn test_load_config_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "users = [\"a\", \"b\"]").unwrap();

        let config = load_config(file.path()).unwrap();
        assert_eq!(config.users.len(), 2);
    }

    #[test]
    fn test_load_config_missing_file() {
        let result = load_config("/definitely/not/here/config.toml");
        assert!(matches!(result, Err(Error::Config { .. })));
    }
}
