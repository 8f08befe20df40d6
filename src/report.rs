use std::fmt::Write;

use chrono::NaiveDate;
use serde::Serialize;

use crate::models::{LevelSummary, RankingEntry};

/// Flat, serializable view of a [`RankingEntry`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LeaderboardRow {
    pub rank: usize,
    pub id: i64,
    pub name: String,
    pub total_xp: i64,
    pub metric_value: i64,
    pub level: String,
}

impl From<&RankingEntry<'_>> for LeaderboardRow {
    fn from(entry: &RankingEntry<'_>) -> Self {
        Self {
            rank: entry.rank,
            id: entry.student.id,
            name: entry.student.display_name().to_string(),
            total_xp: entry.total_xp,
            metric_value: entry.metric_value,
            level: entry.level.clone(),
        }
    }
}

pub fn leaderboard_rows(entries: &[RankingEntry<'_>]) -> Vec<LeaderboardRow> {
    entries.iter().map(LeaderboardRow::from).collect()
}

pub fn summarize_levels(entries: &[RankingEntry<'_>]) -> Vec<LevelSummary> {
    let mut map: std::collections::HashMap<&str, (usize, i64)> =
        std::collections::HashMap::new();

    for entry in entries {
        let slot = map.entry(entry.level.as_str()).or_insert((0, 0));
        slot.0 += 1;
        slot.1 += entry.total_xp;
    }

    let mut summaries: Vec<LevelSummary> = map
        .into_iter()
        .map(|(level, (count, total_xp))| LevelSummary {
            level: level.to_string(),
            count,
            avg_xp: if count == 0 {
                0
            } else {
                total_xp / count as i64
            },
        })
        .collect();

    summaries.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.level.cmp(&b.level)));
    summaries
}

pub fn build_report(
    scope: Option<&str>,
    generated_on: NaiveDate,
    entries: &[RankingEntry<'_>],
) -> String {
    let summaries = summarize_levels(entries);

    let mut output = String::new();
    let scope_label = scope.unwrap_or("all months");

    let _ = writeln!(output, "# XP Leaderboard Report");
    let _ = writeln!(
        output,
        "Generated for {} on {}",
        scope_label, generated_on
    );
    let _ = writeln!(output);
    let _ = writeln!(output, "## Level Mix");

    if summaries.is_empty() {
        let _ = writeln!(output, "No students on the roster.");
    } else {
        for summary in summaries.iter() {
            let _ = writeln!(
                output,
                "- {}: {} students (avg {} XP)",
                summary.level, summary.count, summary.avg_xp
            );
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Top Students");

    if entries.is_empty() {
        let _ = writeln!(output, "No students on the roster.");
    } else {
        for entry in entries.iter().take(10) {
            let _ = writeln!(
                output,
                "{}. {}: {} XP ({})",
                entry.rank,
                entry.student.display_name(),
                entry.total_xp,
                entry.level
            );
        }
    }

    output
}
