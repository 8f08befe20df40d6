use std::collections::HashMap;

use anyhow::Context;
use sqlx::{PgPool, Row};
use tracing::info;

use crate::models::{MonthRecord, Student};
use crate::store::CsvRow;

pub async fn init_db(pool: &PgPool) -> anyhow::Result<()> {
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}

pub async fn seed(pool: &PgPool) -> anyhow::Result<()> {
    let students = vec![
        (1_i64, "Student 1", "student1"),
        (2, "Student 2", "student2"),
        (3, "Ibrohimjon", "ibrohimjon"),
        (5, "Elnurbek", "elnurbek"),
    ];

    for (id, name, username) in students {
        upsert_student(pool, id, name, username).await?;
    }

    let scores = vec![
        (3_i64, "2025-08", MonthRecord::new(6, 0, 78, 78)),
        (3, "2025-09", MonthRecord::new(100, 15, 54, 58)),
        (5, "2025-08", MonthRecord::new(6, 0, 88, 51)),
        (5, "2025-09", MonthRecord::new(120, 35, 85, 508)),
    ];

    for (student_id, month, record) in scores {
        upsert_month(pool, student_id, month, &record).await?;
    }

    Ok(())
}

pub async fn fetch_roster(pool: &PgPool) -> anyhow::Result<Vec<Student>> {
    let rows = sqlx::query(
        "SELECT id, full_name, username, coins, converted_xp \
         FROM xp_leaderboard.students ORDER BY id",
    )
    .fetch_all(pool)
    .await?;

    let mut roster = Vec::with_capacity(rows.len());
    let mut positions = HashMap::new();

    for row in rows {
        let coins: i32 = row.get("coins");
        let student = Student {
            id: row.get("id"),
            name: row.get("full_name"),
            username: row.get("username"),
            coins: u32::try_from(coins).context("negative coin balance")?,
            converted_xp: row.get("converted_xp"),
            ..Student::default()
        };
        positions.insert(student.id, roster.len());
        roster.push(student);
    }

    let scores = sqlx::query(
        "SELECT student_id, month_key, attendance, homework, tasks, penalty \
         FROM xp_leaderboard.month_scores",
    )
    .fetch_all(pool)
    .await?;

    for row in scores {
        let student_id: i64 = row.get("student_id");
        let Some(&index) = positions.get(&student_id) else {
            continue;
        };
        let record = MonthRecord::new(
            score_column(&row, "attendance")?,
            score_column(&row, "homework")?,
            score_column(&row, "tasks")?,
            score_column(&row, "penalty")?,
        );
        roster[index].months.insert(row.get("month_key"), record);
    }

    let exclusions = sqlx::query(
        "SELECT student_id, month_key FROM xp_leaderboard.excluded_months",
    )
    .fetch_all(pool)
    .await?;

    for row in exclusions {
        let student_id: i64 = row.get("student_id");
        if let Some(&index) = positions.get(&student_id) {
            roster[index].excluded_months.insert(row.get("month_key"));
        }
    }

    info!(students = roster.len(), "loaded roster from postgres");
    Ok(roster)
}

pub async fn import_csv(pool: &PgPool, csv_path: &std::path::Path) -> anyhow::Result<usize> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_path(csv_path)?;
    let mut imported = 0usize;

    for result in reader.deserialize::<CsvRow>() {
        let row = result?;
        upsert_student(pool, row.student_id, &row.name, &row.username).await?;

        let result = upsert_month(pool, row.student_id, &row.month, &row.record()).await?;
        if result > 0 {
            imported += 1;
        }

        if row.excluded.unwrap_or(false) {
            sqlx::query(
                r#"
                INSERT INTO xp_leaderboard.excluded_months (student_id, month_key)
                VALUES ($1, $2)
                ON CONFLICT DO NOTHING
                "#,
            )
            .bind(row.student_id)
            .bind(&row.month)
            .execute(pool)
            .await?;
        }
    }

    Ok(imported)
}

async fn upsert_student(pool: &PgPool, id: i64, name: &str, username: &str) -> anyhow::Result<()> {
    sqlx::query(
        r#"
        INSERT INTO xp_leaderboard.students (id, full_name, username)
        VALUES ($1, $2, $3)
        ON CONFLICT (id) DO UPDATE
        SET full_name = EXCLUDED.full_name, username = EXCLUDED.username
        "#,
    )
    .bind(id)
    .bind(name)
    .bind(username)
    .execute(pool)
    .await?;
    Ok(())
}

async fn upsert_month(
    pool: &PgPool,
    student_id: i64,
    month: &str,
    record: &MonthRecord,
) -> anyhow::Result<u64> {
    let result = sqlx::query(
        r#"
        INSERT INTO xp_leaderboard.month_scores
        (student_id, month_key, attendance, homework, tasks, penalty)
        VALUES ($1, $2, $3, $4, $5, $6)
        ON CONFLICT (student_id, month_key) DO UPDATE
        SET attendance = EXCLUDED.attendance,
            homework = EXCLUDED.homework,
            tasks = EXCLUDED.tasks,
            penalty = EXCLUDED.penalty
        "#,
    )
    .bind(student_id)
    .bind(month)
    .bind(i64::from(record.attendance))
    .bind(i64::from(record.homework))
    .bind(i64::from(record.tasks))
    .bind(i64::from(record.penalty))
    .execute(pool)
    .await?;
    Ok(result.rows_affected())
}

fn score_column(row: &sqlx::postgres::PgRow, column: &str) -> anyhow::Result<u32> {
    let value: i64 = row.get(column);
    u32::try_from(value).with_context(|| format!("{column} out of range: {value}"))
}
