/// Database connection and table creation
pub mod database;

/// Application configuration loading from config.toml
pub mod settings;

pub use settings::{AlertConfig, AppConfig, LoanSeed, ScheduleRow, WorkerConfig};
