use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ConfigurationError;
use crate::models::{MonthRecord, Student};
use crate::xp::Scope;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Metric {
    Attendance,
    Homework,
    Tasks,
    Penalty,
    Total,
}

impl Metric {
    pub const ALL: [Metric; 5] = [
        Metric::Total,
        Metric::Attendance,
        Metric::Homework,
        Metric::Tasks,
        Metric::Penalty,
    ];

    /// Penalties rank lowest-first; every other metric highest-first.
    pub fn default_direction(self) -> SortDirection {
        match self {
            Metric::Penalty => SortDirection::Ascending,
            _ => SortDirection::Descending,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Metric::Attendance => "attendance",
            Metric::Homework => "homework",
            Metric::Tasks => "tasks",
            Metric::Penalty => "penalty",
            Metric::Total => "total",
        }
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Metric {
    type Err = ConfigurationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "attendance" | "davomat" => Ok(Metric::Attendance),
            "homework" | "uy_vazifa" => Ok(Metric::Homework),
            "tasks" => Ok(Metric::Tasks),
            "penalty" | "jarima" => Ok(Metric::Penalty),
            "total" => Ok(Metric::Total),
            _ => Err(ConfigurationError::UnknownMetric(s.to_string())),
        }
    }
}

pub fn metric_value(record: &MonthRecord, metric: Metric) -> i64 {
    match metric {
        Metric::Attendance => i64::from(record.attendance),
        Metric::Homework => i64::from(record.homework),
        Metric::Tasks => i64::from(record.tasks),
        Metric::Penalty => i64::from(record.penalty),
        Metric::Total => record.total(),
    }
}

pub fn aggregate_metric(student: &Student, metric: Metric, scope: Scope<'_>) -> i64 {
    scope.sum(student, |record| metric_value(record, metric))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    /// Higher values rank first.
    Descending,
    /// Lower values rank first.
    Ascending,
}

/// Sort direction per metric. Metrics without an explicit entry use
/// [`Metric::default_direction`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetricPolicy {
    #[serde(default)]
    pub directions: BTreeMap<Metric, SortDirection>,
}

impl MetricPolicy {
    pub fn direction(&self, metric: Metric) -> SortDirection {
        self.directions
            .get(&metric)
            .copied()
            .unwrap_or_else(|| metric.default_direction())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_names_and_legacy_aliases() {
        assert_eq!("total".parse::<Metric>().unwrap(), Metric::Total);
        assert_eq!("Penalty".parse::<Metric>().unwrap(), Metric::Penalty);
        assert_eq!("davomat".parse::<Metric>().unwrap(), Metric::Attendance);
        assert_eq!("uy_vazifa".parse::<Metric>().unwrap(), Metric::Homework);
        assert_eq!("jarima".parse::<Metric>().unwrap(), Metric::Penalty);
    }

    #[test]
    fn unknown_metric_is_a_configuration_error() {
        let err = "stars".parse::<Metric>().unwrap_err();
        assert!(matches!(err, ConfigurationError::UnknownMetric(name) if name == "stars"));
    }

    #[test]
    fn extracts_each_metric_from_a_month() {
        let record = MonthRecord::new(100, 15, 54, 58);
        assert_eq!(metric_value(&record, Metric::Attendance), 100);
        assert_eq!(metric_value(&record, Metric::Homework), 15);
        assert_eq!(metric_value(&record, Metric::Tasks), 54);
        assert_eq!(metric_value(&record, Metric::Penalty), 58);
        assert_eq!(metric_value(&record, Metric::Total), 111);
    }

    #[test]
    fn missing_penalty_reads_as_zero() {
        let record: MonthRecord =
            serde_json::from_str(r#"{"davomat": 10, "uy_vazifa": 5, "tasks": 2}"#).unwrap();
        assert_eq!(metric_value(&record, Metric::Penalty), 0);
        assert_eq!(metric_value(&record, Metric::Total), 17);
    }

    #[test]
    fn aggregates_follow_scope() {
        let student = Student::new(1, "Avery")
            .with_month("2025-08", MonthRecord::new(6, 0, 78, 78))
            .with_month("2025-09", MonthRecord::new(100, 15, 54, 58))
            .excluding("2025-08");

        assert_eq!(aggregate_metric(&student, Metric::Penalty, Scope::AllMonths), 136);
        assert_eq!(aggregate_metric(&student, Metric::Penalty, Scope::IncludedMonths), 58);
        assert_eq!(
            aggregate_metric(&student, Metric::Tasks, Scope::SingleMonth("2025-08")),
            78
        );
        assert_eq!(
            aggregate_metric(&student, Metric::Tasks, Scope::SingleMonth("2025-12")),
            0
        );
    }

    #[test]
    fn default_policy_inverts_penalty_only() {
        let policy = MetricPolicy::default();
        assert_eq!(policy.direction(Metric::Penalty), SortDirection::Ascending);
        for metric in [Metric::Attendance, Metric::Homework, Metric::Tasks, Metric::Total] {
            assert_eq!(policy.direction(metric), SortDirection::Descending);
        }
    }

    #[test]
    fn explicit_directions_override_defaults() {
        let policy = MetricPolicy {
            directions: BTreeMap::from([(Metric::Tasks, SortDirection::Ascending)]),
        };
        assert_eq!(policy.direction(Metric::Tasks), SortDirection::Ascending);
        assert_eq!(policy.direction(Metric::Penalty), SortDirection::Ascending);
        assert_eq!(policy.direction(Metric::Total), SortDirection::Descending);
    }
}
