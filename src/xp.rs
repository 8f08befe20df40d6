use crate::models::{MonthRecord, Student};

/// Which months contribute to an aggregate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope<'a> {
    /// Every month present, exclusions ignored.
    AllMonths,
    /// Every month present minus the student's `excluded_months`.
    IncludedMonths,
    /// A single month; absent months count as zero.
    SingleMonth(&'a str),
}

impl<'a> Scope<'a> {
    /// Resolve the scope a leaderboard uses for a month filter.
    pub fn for_filter(month: Option<&'a str>, honor_exclusions: bool) -> Self {
        match month {
            Some(key) => Scope::SingleMonth(key),
            None if honor_exclusions => Scope::IncludedMonths,
            None => Scope::AllMonths,
        }
    }

    /// Sum `value` over the month records of `student` selected by this scope.
    pub fn sum<F>(self, student: &Student, value: F) -> i64
    where
        F: Fn(&MonthRecord) -> i64,
    {
        let mut total = 0;
        match self {
            Scope::AllMonths => {
                for record in student.months.values() {
                    total += value(record);
                }
            }
            Scope::IncludedMonths => {
                for (_, record) in student.included_months() {
                    total += value(record);
                }
            }
            Scope::SingleMonth(key) => {
                if let Some(record) = student.month(key) {
                    total += value(record);
                }
            }
        }
        total
    }
}

pub fn aggregate_xp(student: &Student, scope: Scope<'_>) -> i64 {
    scope.sum(student, MonthRecord::total)
}

pub fn month_total(student: &Student, key: &str) -> i64 {
    aggregate_xp(student, Scope::SingleMonth(key))
}
