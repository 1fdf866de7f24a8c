use std::path::PathBuf;

use anyhow::Context;
use chrono::Utc;
use clap::{Parser, Subcommand};
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use uuid::Uuid;

mod db;
mod models;
mod report;
mod risk;

use models::{AlertStatus, ReportRecord, Severity};

#[derive(Parser)]
#[command(name = "wellness-self-report")]
#[command(about = "Student wellness self-reporting and risk alerting", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create or upgrade the database schema
    InitDb,
    /// Load realistic seed data and evaluate it
    Seed,
    /// Submit a self-report for a student
    Submit {
        #[arg(long)]
        email: String,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        stress_level: i32,
        #[arg(long)]
        mood: String,
        #[arg(long)]
        sleep_hours: f64,
        #[arg(long, default_value = "")]
        comment: String,
    },
    /// Import self-reports from a CSV file
    Import {
        #[arg(long)]
        csv: PathBuf,
    },
    /// List alerts, newest first
    Alerts {
        #[arg(long)]
        status: Option<String>,
        #[arg(long, default_value_t = 20, value_parser = clap::value_parser!(i64).range(0..))]
        limit: i64,
        #[arg(long)]
        json: bool,
    },
    /// Set an alert's status (open, ack, or resolved)
    SetAlertStatus {
        #[arg(long)]
        alert: Uuid,
        #[arg(long)]
        status: String,
    },
    /// List a student's notifications, newest first
    Notifications {
        #[arg(long)]
        email: String,
        #[arg(long)]
        unread_only: bool,
        #[arg(long)]
        json: bool,
    },
    /// Mark a notification as read
    MarkRead {
        #[arg(long)]
        notification: Uuid,
    },
    /// Send a manual notification to a student
    Notify {
        #[arg(long)]
        email: String,
        #[arg(long)]
        title: String,
        #[arg(long)]
        message: String,
    },
    /// Generate a markdown wellness trend report
    Report {
        #[arg(long)]
        email: Option<String>,
        #[arg(long, default_value_t = 30)]
        since_days: i64,
        #[arg(long, default_value = "report.md")]
        out: PathBuf,
    },
}

/// Runs the risk evaluator against a freshly persisted report and, on
/// trigger, creates the alert and notification pair.
async fn evaluate_report(
    pool: &PgPool,
    report: &ReportRecord,
) -> anyhow::Result<Option<(Uuid, Severity)>> {
    let evaluation = match risk::evaluate(report.stress_level, &report.mood, report.sleep_hours) {
        Some(evaluation) => evaluation,
        None => return Ok(None),
    };

    let student_name = db::student_display_name(pool, report.student_id).await?;
    let created_at = Utc::now();
    let message = risk::notification_message(student_name.as_deref(), &evaluation, created_at);

    let alert = db::NewAlert {
        student_id: report.student_id,
        risk_score: evaluation.risk_score,
        severity: evaluation.severity,
        condition: evaluation.condition,
        created_at,
    };

    let alert_id =
        db::create_alert_with_notification(pool, &alert, risk::ALERT_NOTIFICATION_TITLE, &message)
            .await?;

    Ok(Some((alert_id, evaluation.severity)))
}

fn parse_status(value: &str) -> anyhow::Result<AlertStatus> {
    AlertStatus::parse(value)
        .with_context(|| format!("unknown status '{value}' (expected open, ack, or resolved)"))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let database_url = std::env::var("DATABASE_URL")
        .context("DATABASE_URL must be set to a production Postgres instance")?;

    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&database_url)
        .await
        .context("failed to connect to Postgres")?;

    match cli.command {
        Commands::InitDb => {
            db::init_db(&pool).await?;
            println!("Schema ready.");
        }
        Commands::Seed => {
            let reports = db::seed(&pool).await?;
            let mut alerts_raised = 0usize;
            for report in &reports {
                if evaluate_report(&pool, report).await?.is_some() {
                    alerts_raised += 1;
                }
            }
            println!(
                "Seed data inserted: {} reports, {} alerts raised.",
                reports.len(),
                alerts_raised
            );
        }
        Commands::Submit {
            email,
            name,
            stress_level,
            mood,
            sleep_hours,
            comment,
        } => {
            let student_id = db::upsert_student(&pool, &email, name.as_deref()).await?;
            let report = db::insert_report(
                &pool,
                student_id,
                stress_level,
                &mood,
                sleep_hours,
                &comment,
                None,
                None,
            )
            .await?
            .context("report insert returned no row")?;

            println!("Report {} submitted for {email}.", report.id);

            match evaluate_report(&pool, &report).await? {
                Some((alert_id, severity)) => {
                    println!("Alert {} raised with severity {}.", alert_id, severity.label());
                }
                None => println!("No alert triggered."),
            }
        }
        Commands::Import { csv } => {
            let reports = db::import_csv(&pool, &csv).await?;
            let mut alerts_raised = 0usize;
            for report in &reports {
                if evaluate_report(&pool, report).await?.is_some() {
                    alerts_raised += 1;
                }
            }
            println!(
                "Inserted {} reports from {} ({} alerts raised).",
                reports.len(),
                csv.display(),
                alerts_raised
            );
        }
        Commands::Alerts { status, limit, json } => {
            let status = status.as_deref().map(parse_status).transpose()?;
            let alerts = db::list_alerts(&pool, status, limit).await?;

            if json {
                println!("{}", serde_json::to_string_pretty(&alerts)?);
            } else if alerts.is_empty() {
                println!("No alerts found.");
            } else {
                for alert in &alerts {
                    let name = alert.student_name.as_deref().unwrap_or("Unknown Student");
                    println!(
                        "- {} [{}] {} score {:.2} for {} ({}) on \"{}\" at {}",
                        alert.id,
                        alert.status.label(),
                        alert.severity.label(),
                        alert.risk_score,
                        name,
                        alert.student_email,
                        alert.condition,
                        alert.created_at.format("%Y-%m-%d %H:%M UTC")
                    );
                }
            }
        }
        Commands::SetAlertStatus { alert, status } => {
            let status = parse_status(&status)?;
            if db::set_alert_status(&pool, alert, status).await? {
                println!("Alert {alert} set to {}.", status.label());
            } else {
                println!("No alert found with id {alert}.");
            }
        }
        Commands::Notifications {
            email,
            unread_only,
            json,
        } => {
            let student = db::find_student(&pool, &email)
                .await?
                .with_context(|| format!("no student found with email {email}"))?;
            let notifications = db::list_notifications(&pool, student.id, unread_only).await?;

            if json {
                println!("{}", serde_json::to_string_pretty(&notifications)?);
            } else if notifications.is_empty() {
                println!("No notifications for {email}.");
            } else {
                let display = student.full_name.as_deref().unwrap_or("Unknown Student");
                println!("Notifications for {display} ({}):", student.email);
                for notification in &notifications {
                    let marker = if notification.is_read { " " } else { "*" };
                    println!(
                        "{marker} {} [{}] {}: {}",
                        notification.id,
                        notification.created_at.format("%Y-%m-%d %H:%M UTC"),
                        notification.title,
                        notification.message
                    );
                }
            }
        }
        Commands::MarkRead { notification } => {
            if db::mark_notification_read(&pool, notification).await? {
                println!("Notification {notification} marked as read.");
            } else {
                println!("No notification found with id {notification}.");
            }
        }
        Commands::Notify {
            email,
            title,
            message,
        } => {
            let student = db::find_student(&pool, &email)
                .await?
                .with_context(|| format!("no student found with email {email}"))?;
            let id = db::create_notification(&pool, student.id, &title, &message).await?;
            println!("Notification {id} sent to {email}.");
        }
        Commands::Report {
            email,
            since_days,
            out,
        } => {
            let cutoff = db::cutoff(since_days);
            let reports = db::fetch_reports(&pool, cutoff, email.as_deref()).await?;
            let alert_counts = db::fetch_alert_counts(&pool, cutoff, email.as_deref()).await?;
            let output = report::build_report(
                email.as_deref(),
                since_days,
                cutoff,
                &reports,
                &alert_counts,
            );
            std::fs::write(&out, output)
                .with_context(|| format!("failed to write {}", out.display()))?;
            println!("Report written to {}.", out.display());
        }
    }

    Ok(())
}
