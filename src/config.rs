use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{ConfigurationError, Result};
use crate::level::{LevelOverride, LevelTable, LevelThreshold};
use crate::metric::MetricPolicy;
use crate::ranking::RankingEngine;

const DEFAULT_LEVELS: [(&str, i64); 18] = [
    ("Yalqov", -100),
    ("Maymuncha", -1),
    ("Beginner", 0),
    ("Novice", 10),
    ("Junior", 20),
    ("Intermediate", 40),
    ("Adept", 60),
    ("Senior", 90),
    ("Advanced", 120),
    ("Professional", 160),
    ("Elite", 200),
    ("Expert", 250),
    ("Guru", 300),
    ("Master", 360),
    ("Grandmaster", 430),
    ("Legend3", 500),
    ("Legend2", 750),
    ("Legend1", 1000),
];

/// Every field has a default, so an empty file yields the stock table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub levels: Vec<LevelThreshold>,
    pub overrides: Vec<LevelOverride>,
    pub ranking: MetricPolicy,
    pub scoring: ScoringSettings,
    pub market: MarketSettings,
    /// Lessons held per month key.
    pub months: BTreeMap<String, MonthDetail>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringSettings {
    pub attendance_points_per_lesson: u32,
    pub homework_points_per_lesson: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MarketSettings {
    pub legend_threshold: i64,
    pub xp_per_coin: i64,
    /// Largest amount of XP a single conversion quote covers.
    pub max_conversion_xp: i64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonthDetail {
    #[serde(default)]
    pub total_lessons: u32,
    #[serde(default)]
    pub homework_lessons: u32,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            levels: DEFAULT_LEVELS
                .iter()
                .map(|(name, min_xp)| LevelThreshold::new(*name, *min_xp))
                .collect(),
            overrides: Vec::new(),
            ranking: MetricPolicy::default(),
            scoring: ScoringSettings::default(),
            market: MarketSettings::default(),
            months: BTreeMap::from([
                ("2025-08".to_string(), MonthDetail::new(0, 0)),
                ("2025-09".to_string(), MonthDetail::new(16, 7)),
                ("2025-10".to_string(), MonthDetail::new(1, 0)),
            ]),
        }
    }
}

impl Default for ScoringSettings {
    fn default() -> Self {
        Self {
            attendance_points_per_lesson: 10,
            homework_points_per_lesson: 10,
        }
    }
}

impl Default for MarketSettings {
    fn default() -> Self {
        Self {
            legend_threshold: 1000,
            xp_per_coin: 100,
            max_conversion_xp: 1000,
        }
    }
}

impl MonthDetail {
    pub fn new(total_lessons: u32, homework_lessons: u32) -> Self {
        Self {
            total_lessons,
            homework_lessons,
        }
    }
}

impl Settings {
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigurationError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Load from `path` when given, otherwise use the defaults.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::from_file(path),
            None => Ok(Self::default()),
        }
    }

    pub fn level_table(&self) -> Result<LevelTable> {
        LevelTable::new(self.levels.clone())?.with_overrides(self.overrides.clone())
    }

    pub fn engine(&self) -> Result<RankingEngine> {
        Ok(RankingEngine::new(self.level_table()?, self.ranking.clone()))
    }
}
