use std::collections::BTreeSet;

use tracing::debug;

use crate::error::Result;
use crate::level::LevelTable;
use crate::metric::{aggregate_metric, Metric, MetricPolicy, SortDirection};
use crate::models::{RankingEntry, Student};
use crate::xp::{aggregate_xp, Scope};

/// What a leaderboard is sorted by and which months it covers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RankingQuery {
    pub metric: Metric,
    pub month: Option<String>,
    pub honor_exclusions: bool,
}

impl Default for RankingQuery {
    fn default() -> Self {
        Self {
            metric: Metric::Total,
            month: None,
            honor_exclusions: true,
        }
    }
}

impl RankingQuery {
    pub fn new(metric: Metric) -> Self {
        Self {
            metric,
            ..Self::default()
        }
    }

    /// Build a query from a metric name; unknown names are rejected.
    pub fn parse(metric: &str, month: Option<&str>, honor_exclusions: bool) -> Result<Self> {
        Ok(Self {
            metric: metric.parse()?,
            month: month.map(str::to_string),
            honor_exclusions,
        })
    }

    pub fn for_month(mut self, month: impl Into<String>) -> Self {
        self.month = Some(month.into());
        self
    }

    pub fn all_months(mut self) -> Self {
        self.honor_exclusions = false;
        self
    }

    pub fn scope(&self) -> Scope<'_> {
        Scope::for_filter(self.month.as_deref(), self.honor_exclusions)
    }
}

/// Level table plus sort policy. Holds no per-roster state.
#[derive(Debug, Clone)]
pub struct RankingEngine {
    levels: LevelTable,
    policy: MetricPolicy,
}

impl RankingEngine {
    pub fn new(levels: LevelTable, policy: MetricPolicy) -> Self {
        Self { levels, policy }
    }

    pub fn levels(&self) -> &LevelTable {
        &self.levels
    }

    pub fn policy(&self) -> &MetricPolicy {
        &self.policy
    }

    pub fn build_ranking<'a>(
        &self,
        roster: &'a [Student],
        query: &RankingQuery,
    ) -> Vec<RankingEntry<'a>> {
        let scope = query.scope();
        let direction = self.policy.direction(query.metric);

        let mut entries: Vec<RankingEntry<'a>> = roster
            .iter()
            .map(|student| {
                let total_xp = aggregate_xp(student, scope);
                RankingEntry {
                    student,
                    total_xp,
                    metric_value: aggregate_metric(student, query.metric, scope),
                    rank: 0,
                    level: self.levels.classify(total_xp).to_string(),
                }
            })
            .collect();

        // stable: equal values keep roster order
        entries.sort_by(|a, b| match direction {
            SortDirection::Descending => b.metric_value.cmp(&a.metric_value),
            SortDirection::Ascending => a.metric_value.cmp(&b.metric_value),
        });

        for (index, entry) in entries.iter_mut().enumerate() {
            entry.rank = index + 1;
        }

        debug!(
            students = entries.len(),
            metric = %query.metric,
            month = query.month.as_deref().unwrap_or("all"),
            honor_exclusions = query.honor_exclusions,
            "built ranking"
        );

        entries
    }

    /// Rank of `student_id` on the total-XP leaderboard.
    pub fn rank_position(
        &self,
        roster: &[Student],
        student_id: i64,
        honor_exclusions: bool,
    ) -> Option<usize> {
        let query = RankingQuery {
            honor_exclusions,
            ..RankingQuery::default()
        };
        self.build_ranking(roster, &query)
            .iter()
            .find(|entry| entry.student.id == student_id)
            .map(|entry| entry.rank)
    }
}

/// Sorted union of month keys across the roster.
pub fn available_months(roster: &[Student]) -> Vec<String> {
    roster
        .iter()
        .flat_map(|student| student.months.keys().cloned())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}
