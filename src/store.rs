use std::collections::{HashMap, HashSet};
use std::io::Read;
use std::path::Path;

use anyhow::{bail, Context};
use serde::Deserialize;
use tracing::{info, warn};

use crate::models::{score_or_zero, MonthRecord, Student};

/// One student-month row of a roster CSV.
#[derive(Debug, Clone, Deserialize)]
pub struct CsvRow {
    pub student_id: i64,
    pub name: String,
    #[serde(default)]
    pub username: String,
    pub month: String,
    #[serde(default, deserialize_with = "score_or_zero")]
    pub attendance: u32,
    #[serde(default, deserialize_with = "score_or_zero")]
    pub homework: u32,
    #[serde(default, deserialize_with = "score_or_zero")]
    pub tasks: u32,
    #[serde(default, deserialize_with = "score_or_zero")]
    pub penalty: u32,
    #[serde(default)]
    pub excluded: Option<bool>,
}

impl CsvRow {
    pub fn record(&self) -> MonthRecord {
        MonthRecord::new(self.attendance, self.homework, self.tasks, self.penalty)
    }
}

#[derive(Deserialize)]
struct WrappedRoster {
    students: Vec<Student>,
}

pub fn load_roster(path: &Path) -> anyhow::Result<Vec<Student>> {
    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase);

    let roster = match extension.as_deref() {
        Some("json") => {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("failed to read roster {}", path.display()))?;
            parse_json_roster(&content)
                .with_context(|| format!("invalid roster JSON in {}", path.display()))?
        }
        Some("csv") => {
            let file = std::fs::File::open(path)
                .with_context(|| format!("failed to open roster {}", path.display()))?;
            parse_csv_roster(file)
                .with_context(|| format!("invalid roster CSV in {}", path.display()))?
        }
        _ => bail!(
            "unsupported roster format for {} (expected .json or .csv)",
            path.display()
        ),
    };

    info!(path = %path.display(), students = roster.len(), "loaded roster");
    Ok(roster)
}

/// Accepts either a bare array of students or an object with a `students`
/// array.
pub fn parse_json_roster(content: &str) -> anyhow::Result<Vec<Student>> {
    let roster = if content.trim_start().starts_with('{') {
        serde_json::from_str::<WrappedRoster>(content)?.students
    } else {
        serde_json::from_str::<Vec<Student>>(content)?
    };
    validate_roster(&roster)?;
    Ok(roster)
}

/// Rows of the same student merge into one record, in first-seen order.
pub fn parse_csv_roster(reader: impl Read) -> anyhow::Result<Vec<Student>> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader);
    let mut roster: Vec<Student> = Vec::new();
    let mut positions: HashMap<i64, usize> = HashMap::new();

    for result in reader.deserialize::<CsvRow>() {
        let row = result?;
        let index = *positions.entry(row.student_id).or_insert_with(|| {
            roster.push(Student {
                id: row.student_id,
                name: row.name.clone(),
                username: row.username.clone(),
                ..Student::default()
            });
            roster.len() - 1
        });

        let student = &mut roster[index];
        if student.months.insert(row.month.clone(), row.record()).is_some() {
            warn!(student = row.student_id, month = %row.month, "duplicate month row, keeping the last");
        }
        if row.excluded.unwrap_or(false) {
            student.excluded_months.insert(row.month);
        }
    }

    Ok(roster)
}

fn validate_roster(roster: &[Student]) -> anyhow::Result<()> {
    let mut seen = HashSet::new();
    for student in roster {
        if !seen.insert(student.id) {
            bail!("student id {} appears more than once", student.id);
        }
        for key in &student.excluded_months {
            if !student.months.contains_key(key) {
                warn!(student = student.id, month = %key, "excluded month has no scores");
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const LEGACY_JSON: &str = r#"[
        {
            "id": 3,
            "name": "Ibrohimjon",
            "username": "ibrohimjon",
            "password": "ignored",
            "image": "avatar.png",
            "level": "OK",
            "coins": 4,
            "convertedXP": 120,
            "excludedMonths": ["2025-08"],
            "months": {
                "2025-08": { "davomat": 6, "uy_vazifa": 0, "tasks": 78, "jarima": 78 },
                "2025-09": { "davomat": 100, "uy_vazifa": 15, "tasks": 54 }
            }
        },
        { "id": 5, "name": "Elnurbek" }
    ]"#;

    #[test]
    fn reads_legacy_student_json() {
        let roster = parse_json_roster(LEGACY_JSON).unwrap();
        assert_eq!(roster.len(), 2);

        let student = &roster[0];
        assert_eq!(student.username, "ibrohimjon");
        assert_eq!(student.coins, 4);
        assert_eq!(student.converted_xp, 120);
        assert!(student.excluded_months.contains("2025-08"));
        assert_eq!(student.months["2025-08"], MonthRecord::new(6, 0, 78, 78));
        assert_eq!(student.months["2025-09"].penalty, 0);

        assert!(roster[1].months.is_empty());
        assert!(roster[1].excluded_months.is_empty());
    }

    #[test]
    fn reads_wrapped_json() {
        let json = r#"{ "students": [ { "id": 1, "name": "Avery" } ], "xpValues": {} }"#;
        let roster = parse_json_roster(json).unwrap();
        assert_eq!(roster[0].name, "Avery");
    }

    #[test]
    fn duplicate_ids_are_rejected() {
        let json = r#"[ { "id": 1, "name": "Avery" }, { "id": 1, "name": "Jules" } ]"#;
        let err = parse_json_roster(json).unwrap_err();
        assert!(err.to_string().contains("appears more than once"));
    }

    #[test]
    fn csv_rows_merge_by_student() {
        let csv = "\
student_id,name,username,month,attendance,homework,tasks,penalty,excluded
3,Ibrohimjon,ibrohimjon,2025-08,6,0,78,78,true
5,Elnurbek,elnurbek,2025-09,120,35,85,508,
3,Ibrohimjon,ibrohimjon,2025-09,100,15,54,58,false
";
        let roster = parse_csv_roster(csv.as_bytes()).unwrap();
        assert_eq!(roster.len(), 2);
        assert_eq!(roster[0].id, 3);
        assert_eq!(roster[0].months.len(), 2);
        assert!(roster[0].excluded_months.contains("2025-08"));
        assert_eq!(roster[1].id, 5);
        assert!(roster[1].excluded_months.is_empty());
    }

    #[test]
    fn null_scores_read_as_zero() {
        let json = r#"[{"id":1,"name":"A","months":{"2025-09":{"davomat":10,"uy_vazifa":5,"tasks":2,"jarima":null}}}]"#;
        let roster = parse_json_roster(json).unwrap();
        assert_eq!(roster[0].months["2025-09"], MonthRecord::new(10, 5, 2, 0));
        assert_eq!(roster[0].months["2025-09"].total(), 17);
    }

    #[test]
    fn blank_csv_scores_read_as_zero() {
        let csv = "\
student_id,name,username,month,attendance,homework,tasks,penalty
1,A,a,2025-09,10,5,2,
2,B,b,2025-09,,,4,1
";
        let roster = parse_csv_roster(csv.as_bytes()).unwrap();
        assert_eq!(roster[0].months["2025-09"], MonthRecord::new(10, 5, 2, 0));
        assert_eq!(roster[1].months["2025-09"], MonthRecord::new(0, 0, 4, 1));
    }

    #[test]
    fn json_errors_point_at_the_bad_field() {
        let json = r#"[{"id":1,"name":"A","months":{"2025-09":{"tasks":"many"}}}]"#;
        let err = parse_json_roster(json).unwrap_err().to_string();
        assert!(err.contains("line 1"), "{err}");
        assert!(!err.contains("untagged"), "{err}");

        let wrapped = r#"  {"students": [{"id": "x"}]}"#;
        let err = parse_json_roster(wrapped).unwrap_err().to_string();
        assert!(err.contains("line 1"), "{err}");
    }

    #[test]
    fn loads_by_extension() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("students.json");
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(LEGACY_JSON.as_bytes()).unwrap();

        let roster = load_roster(&path).unwrap();
        assert_eq!(roster.len(), 2);

        let unsupported = dir.path().join("students.xml");
        std::fs::write(&unsupported, "<students/>").unwrap();
        assert!(load_roster(&unsupported).is_err());
    }
}
