use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Deserializer, Serialize};

/// One calendar month of raw scores for one student.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonthRecord {
    #[serde(default, alias = "davomat", deserialize_with = "score_or_zero")]
    pub attendance: u32,
    #[serde(default, alias = "uy_vazifa", deserialize_with = "score_or_zero")]
    pub homework: u32,
    #[serde(default, deserialize_with = "score_or_zero")]
    pub tasks: u32,
    #[serde(default, alias = "jarima", deserialize_with = "score_or_zero")]
    pub penalty: u32,
}

/// Reads a score field, treating `null` and blank CSV cells as 0.
pub(crate) fn score_or_zero<'de, D>(deserializer: D) -> Result<u32, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<u32>::deserialize(deserializer)?.unwrap_or_default())
}

impl MonthRecord {
    pub fn new(attendance: u32, homework: u32, tasks: u32, penalty: u32) -> Self {
        Self {
            attendance,
            homework,
            tasks,
            penalty,
        }
    }

    /// `attendance + homework + tasks - penalty`; negative when penalties win.
    pub fn total(&self) -> i64 {
        i64::from(self.attendance) + i64::from(self.homework) + i64::from(self.tasks)
            - i64::from(self.penalty)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Student {
    pub id: i64,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub months: BTreeMap<String, MonthRecord>,
    #[serde(default)]
    pub excluded_months: BTreeSet<String>,
    #[serde(default)]
    pub coins: u32,
    #[serde(default, rename = "convertedXP", alias = "convertedXp")]
    pub converted_xp: i64,
}

impl Student {
    pub fn new(id: i64, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn with_month(mut self, key: impl Into<String>, record: MonthRecord) -> Self {
        self.months.insert(key.into(), record);
        self
    }

    pub fn excluding(mut self, key: impl Into<String>) -> Self {
        self.excluded_months.insert(key.into());
        self
    }

    pub fn month(&self, key: &str) -> Option<&MonthRecord> {
        self.months.get(key)
    }

    /// Month records that are not excluded. Unknown exclusion keys match nothing.
    pub fn included_months(&self) -> impl Iterator<Item = (&String, &MonthRecord)> {
        self.months
            .iter()
            .filter(|(key, _)| !self.excluded_months.contains(*key))
    }

    pub fn display_name(&self) -> &str {
        if self.name.is_empty() {
            &self.username
        } else {
            &self.name
        }
    }
}

/// One line of a leaderboard. Borrows the student it ranks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RankingEntry<'a> {
    pub student: &'a Student,
    pub total_xp: i64,
    pub metric_value: i64,
    pub rank: usize,
    pub level: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MonthlyBreakdown {
    pub month_key: String,
    pub label: String,
    pub attendance: u32,
    pub homework: u32,
    pub tasks: u32,
    pub penalty: u32,
    pub total_xp: i64,
    pub level: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LevelSummary {
    pub level: String,
    pub count: usize,
    pub avg_xp: i64,
}
