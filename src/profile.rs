use chrono::NaiveDate;

use crate::config::{MarketSettings, MonthDetail, ScoringSettings, Settings};
use crate::level::LevelTable;
use crate::models::{MonthRecord, MonthlyBreakdown, Student};
use crate::xp::{aggregate_xp, Scope};

/// Read-only profile figures. Months missing from the calendar contribute
/// nothing to the lesson-based rates.
pub struct ProfileStats<'a> {
    settings: &'a Settings,
}

impl<'a> ProfileStats<'a> {
    pub fn new(settings: &'a Settings) -> Self {
        Self { settings }
    }

    fn scoring(&self) -> &ScoringSettings {
        &self.settings.scoring
    }

    fn market(&self) -> &MarketSettings {
        &self.settings.market
    }

    fn calendar(&self, key: &str) -> Option<&MonthDetail> {
        self.settings.months.get(key)
    }

    fn attended_lessons(&self, record: &MonthRecord) -> u32 {
        match self.scoring().attendance_points_per_lesson {
            0 => 0,
            points => record.attendance / points,
        }
    }

    pub fn attendance_percentage(&self, student: &Student) -> u8 {
        let mut attended = 0u64;
        let mut possible = 0u64;

        for (key, record) in &student.months {
            if let Some(detail) = self.calendar(key) {
                attended += u64::from(self.attended_lessons(record).min(detail.total_lessons));
                possible += u64::from(detail.total_lessons);
            }
        }

        capped_percent(attended as f64, possible as f64)
    }

    pub fn month_attendance_percentage(&self, student: &Student, key: &str) -> u8 {
        let (Some(record), Some(detail)) = (student.month(key), self.calendar(key)) else {
            return 0;
        };
        capped_percent(
            f64::from(self.attended_lessons(record)),
            f64::from(detail.total_lessons),
        )
    }

    pub fn homework_percentage(&self, student: &Student) -> u8 {
        let mut score = 0u64;
        let mut max_score = 0u64;

        for (key, record) in &student.months {
            if let Some(detail) = self.calendar(key) {
                score += u64::from(record.homework);
                max_score += self.max_homework_score(detail);
            }
        }

        capped_percent(score as f64, max_score as f64)
    }

    pub fn month_homework_percentage(&self, student: &Student, key: &str) -> u8 {
        let (Some(record), Some(detail)) = (student.month(key), self.calendar(key)) else {
            return 0;
        };
        capped_percent(
            f64::from(record.homework),
            self.max_homework_score(detail) as f64,
        )
    }

    fn max_homework_score(&self, detail: &MonthDetail) -> u64 {
        u64::from(detail.homework_lessons) * u64::from(self.scoring().homework_points_per_lesson)
    }

    /// Mean points per homework lesson across calendar months that set
    /// homework, to one decimal place.
    pub fn average_homework_score(&self, student: &Student) -> f64 {
        let averages: Vec<f64> = student
            .months
            .iter()
            .filter_map(|(key, record)| {
                let detail = self.calendar(key)?;
                (detail.homework_lessons > 0)
                    .then(|| f64::from(record.homework) / f64::from(detail.homework_lessons))
            })
            .collect();

        if averages.is_empty() {
            return 0.0;
        }

        let mean = averages.iter().sum::<f64>() / averages.len() as f64;
        (mean * 10.0).round() / 10.0
    }

    pub fn monthly_breakdown(&self, student: &Student, levels: &LevelTable) -> Vec<MonthlyBreakdown> {
        student
            .months
            .iter()
            .map(|(key, record)| {
                let total_xp = record.total();
                MonthlyBreakdown {
                    month_key: key.clone(),
                    label: month_label(key),
                    attendance: record.attendance,
                    homework: record.homework,
                    tasks: record.tasks,
                    penalty: record.penalty,
                    total_xp,
                    level: levels.threshold_for(total_xp).name.clone(),
                }
            })
            .collect()
    }

    pub fn is_legend(&self, student: &Student) -> bool {
        aggregate_xp(student, Scope::IncludedMonths) >= self.market().legend_threshold
    }

    /// Included-months XP past the legend threshold that has not been
    /// converted yet.
    pub fn convertible_xp(&self, student: &Student) -> i64 {
        let xp = aggregate_xp(student, Scope::IncludedMonths);
        let threshold = self.market().legend_threshold;
        if xp < threshold {
            return 0;
        }
        (xp - threshold - student.converted_xp).max(0)
    }

    /// XP and coins for one conversion, capped at `max_conversion_xp`.
    pub fn conversion_quote(&self, student: &Student) -> (i64, i64) {
        let xp = self
            .convertible_xp(student)
            .min(self.market().max_conversion_xp.max(0));
        (xp, self.coins_for(xp))
    }

    pub fn coins_for(&self, xp: i64) -> i64 {
        match self.market().xp_per_coin {
            per_coin if per_coin > 0 => xp.max(0) / per_coin,
            _ => 0,
        }
    }
}

fn capped_percent(part: f64, whole: f64) -> u8 {
    if whole <= 0.0 {
        return 0;
    }
    (part / whole * 100.0).round().min(100.0) as u8
}

/// `2025-09` (or the legacy `2025-M09`) as "September 2025"; other keys are
/// returned unchanged.
pub fn month_label(key: &str) -> String {
    let normalized = key.replacen("-M", "-", 1);
    NaiveDate::parse_from_str(&format!("{normalized}-01"), "%Y-%m-%d")
        .map(|date| date.format("%B %Y").to_string())
        .unwrap_or_else(|_| key.to_string())
}
