//! XP, level and leaderboard computation over student score records.

pub mod config;
pub mod db;
pub mod error;
pub mod level;
pub mod metric;
pub mod models;
pub mod profile;
pub mod progress;
pub mod ranking;
pub mod report;
pub mod store;
pub mod xp;

pub use config::Settings;
pub use error::ConfigurationError;
pub use level::{LevelOverride, LevelTable, LevelThreshold, XpRange};
pub use metric::{Metric, MetricPolicy, SortDirection};
pub use models::{MonthRecord, RankingEntry, Student};
pub use ranking::{available_months, RankingEngine, RankingQuery};
pub use xp::{aggregate_xp, Scope};
