use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;

use xp_leaderboard::profile::ProfileStats;
use xp_leaderboard::{available_months, db, progress, report, store, xp};
use xp_leaderboard::{RankingQuery, Settings, Student};

mod logging;

#[derive(Parser)]
#[command(name = "xp-leaderboard")]
#[command(about = "Student XP, level and leaderboard tracker", long_about = None)]
struct Cli {
    /// Roster file (.json or .csv); reads from DATABASE_URL when omitted
    #[arg(long, global = true)]
    roster: Option<PathBuf>,
    /// Settings file (TOML) with levels, overrides and the month calendar
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// Increase log verbosity (-v, -vv, -vvv)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    verbose: u8,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create or upgrade the database schema
    InitDb,
    /// Load a sample roster into the database
    Seed,
    /// Import student-month scores from a CSV file into the database
    Import {
        #[arg(long)]
        csv: PathBuf,
    },
    /// Print the leaderboard
    Rank {
        /// total, attendance, homework, tasks or penalty
        #[arg(long, default_value = "total")]
        metric: String,
        /// Only score this month key (e.g. 2025-09)
        #[arg(long)]
        month: Option<String>,
        /// Count excluded months as well
        #[arg(long)]
        all_months: bool,
        #[arg(long, default_value_t = 10)]
        limit: usize,
        #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
    },
    /// Show one student's level, progress and monthly breakdown
    Profile {
        #[arg(long)]
        id: i64,
    },
    /// List every month key present in the roster
    Months,
    /// Print the configured level table
    Levels,
    /// Generate a markdown report
    Report {
        #[arg(long)]
        month: Option<String>,
        #[arg(long)]
        all_months: bool,
        #[arg(long, default_value = "report.md")]
        out: PathBuf,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

async fn connect() -> anyhow::Result<PgPool> {
    let database_url = std::env::var("DATABASE_URL")
        .context("DATABASE_URL must be set when no --roster file is given")?;

    PgPoolOptions::new()
        .max_connections(5)
        .connect(&database_url)
        .await
        .context("failed to connect to Postgres")
}

async fn load_roster(path: Option<&Path>) -> anyhow::Result<Vec<Student>> {
    match path {
        Some(path) => store::load_roster(path),
        None => db::fetch_roster(&connect().await?).await,
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    logging::init(cli.verbose)?;

    let settings = Settings::load(cli.config.as_deref())?;
    let engine = settings.engine()?;

    match cli.command {
        Commands::InitDb => {
            db::init_db(&connect().await?).await?;
            println!("Schema ready.");
        }
        Commands::Seed => {
            db::seed(&connect().await?).await?;
            println!("Seed data inserted.");
        }
        Commands::Import { csv } => {
            let imported = db::import_csv(&connect().await?, &csv).await?;
            println!("Imported {imported} month records from {}.", csv.display());
        }
        Commands::Rank {
            metric,
            month,
            all_months,
            limit,
            format,
        } => {
            let query = RankingQuery::parse(&metric, month.as_deref(), !all_months)?;
            let roster = load_roster(cli.roster.as_deref()).await?;
            let ranking = engine.build_ranking(&roster, &query);

            match format {
                OutputFormat::Json => {
                    let rows = report::leaderboard_rows(&ranking);
                    println!("{}", serde_json::to_string_pretty(&rows)?);
                }
                OutputFormat::Text => {
                    if ranking.is_empty() {
                        println!("No students on the roster.");
                        return Ok(());
                    }

                    println!(
                        "Leaderboard by {} ({}):",
                        query.metric,
                        query.month.as_deref().unwrap_or("all months")
                    );
                    for entry in ranking.iter().take(limit) {
                        println!(
                            "{:>3}. {:<20} {}={:<6} {:>6} XP  {}",
                            entry.rank,
                            entry.student.display_name(),
                            query.metric,
                            entry.metric_value,
                            entry.total_xp,
                            entry.level
                        );
                    }
                }
            }
        }
        Commands::Profile { id } => {
            let roster = load_roster(cli.roster.as_deref()).await?;
            let student = roster
                .iter()
                .find(|student| student.id == id)
                .with_context(|| format!("no student with id {id}"))?;
            print_profile(&settings, &engine, &roster, student);
        }
        Commands::Months => {
            let roster = load_roster(cli.roster.as_deref()).await?;
            for month in available_months(&roster) {
                println!("{month}");
            }
        }
        Commands::Levels => {
            for band in engine.levels().overrides() {
                let min = band.range.min.map_or("..".to_string(), |v| v.to_string());
                let max = band.range.max.map_or("..".to_string(), |v| v.to_string());
                println!("{:<14} {min} to {max} (override)", band.name);
            }
            for threshold in engine.levels().thresholds() {
                println!("{:<14} {} XP", threshold.name, threshold.min_xp);
            }
        }
        Commands::Report {
            month,
            all_months,
            out,
        } => {
            let query = RankingQuery {
                month,
                honor_exclusions: !all_months,
                ..RankingQuery::default()
            };
            let roster = load_roster(cli.roster.as_deref()).await?;
            let ranking = engine.build_ranking(&roster, &query);
            let report = report::build_report(
                query.month.as_deref(),
                chrono::Utc::now().date_naive(),
                &ranking,
            );
            std::fs::write(&out, report)?;
            println!("Report written to {}.", out.display());
        }
    }

    Ok(())
}

fn print_profile(
    settings: &Settings,
    engine: &xp_leaderboard::RankingEngine,
    roster: &[Student],
    student: &Student,
) {
    let stats = ProfileStats::new(settings);
    let levels = engine.levels();
    let total_xp = xp::aggregate_xp(student, xp::Scope::IncludedMonths);
    let snapshot = progress::progress(total_xp, levels);

    println!("{} (@{})", student.display_name(), student.username);
    println!("Level: {} with {} XP", levels.classify(total_xp), total_xp);
    match engine.rank_position(roster, student.id, true) {
        Some(rank) => println!("Rank: {rank} of {}", roster.len()),
        None => println!("Rank: unranked"),
    }
    match &snapshot.next {
        Some(next) => println!(
            "Progress: {}% toward {} ({} XP to go, at {} XP)",
            snapshot.percent, next.name, snapshot.remaining, next.min_xp
        ),
        None => println!("Progress: max level reached"),
    }
    println!(
        "Attendance: {}%  Homework: {}% (avg {:.1} per lesson)",
        stats.attendance_percentage(student),
        stats.homework_percentage(student),
        stats.average_homework_score(student)
    );

    println!();
    for row in stats.monthly_breakdown(student, levels) {
        let marker = if student.excluded_months.contains(&row.month_key) {
            " (excluded)"
        } else {
            ""
        };
        println!(
            "{:<16} attendance {:>4}  homework {:>4}  tasks {:>4}  penalty {:>4}  = {:>5} XP, {}{}",
            row.label,
            row.attendance,
            row.homework,
            row.tasks,
            row.penalty,
            row.total_xp,
            row.level,
            marker
        );
    }

    if stats.is_legend(student) {
        let (xp, coins) = stats.conversion_quote(student);
        println!();
        println!(
            "Convertible XP: {} (next conversion: {} XP for {} coins, balance {})",
            stats.convertible_xp(student),
            xp,
            coins,
            student.coins
        );
    }
}
