use anyhow::Context;
use chrono::{DateTime, Duration, Utc};
use sqlx::{PgPool, Row};
use uuid::Uuid;

use crate::models::{
    AlertRow, AlertStatus, NotificationRow, ReportRecord, ReportView, Severity, SeverityCount,
    StudentRecord,
};

pub async fn init_db(pool: &PgPool) -> anyhow::Result<()> {
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}

pub async fn seed(pool: &PgPool) -> anyhow::Result<Vec<ReportRecord>> {
    let students = vec![
        (
            Uuid::parse_str("6f1c2a9e-3b51-4f0c-9a37-52c1d35a6f10")?,
            "Maya Chen",
            "maya.chen@student.example.edu",
        ),
        (
            Uuid::parse_str("b2a7c4d1-08e9-4a6f-b513-9f4e2d8c7a01")?,
            "Leo Park",
            "leo.park@student.example.edu",
        ),
        (
            Uuid::parse_str("e90d3f22-71b6-4c84-a0d5-1c6b8e24f3b7")?,
            "Sofia Reyes",
            "sofia.reyes@student.example.edu",
        ),
    ];

    for (id, name, email) in students {
        sqlx::query(
            r#"
            INSERT INTO wellness.students (id, email, full_name)
            VALUES ($1, $2, $3)
            ON CONFLICT (email) DO UPDATE
            SET full_name = EXCLUDED.full_name
            "#,
        )
        .bind(id)
        .bind(email)
        .bind(name)
        .execute(pool)
        .await?;
    }

    let reports = vec![
        (
            "seed-001",
            "maya.chen@student.example.edu",
            2,
            "happy",
            8.0,
            "Good week so far",
        ),
        (
            "seed-002",
            "leo.park@student.example.edu",
            4,
            "sad",
            5.0,
            "Trouble sleeping before exams",
        ),
        (
            "seed-003",
            "sofia.reyes@student.example.edu",
            9,
            "sad",
            3.0,
            "Overwhelmed by deadlines",
        ),
    ];

    let mut inserted = Vec::new();

    for (source_key, email, stress_level, mood, sleep_hours, comment) in reports {
        let student = find_student(pool, email)
            .await?
            .context("seed student missing")?;

        if let Some(record) = insert_report(
            pool,
            student.id,
            stress_level,
            mood,
            sleep_hours,
            comment,
            None,
            Some(source_key),
        )
        .await?
        {
            inserted.push(record);
        }
    }

    Ok(inserted)
}

pub async fn upsert_student(
    pool: &PgPool,
    email: &str,
    full_name: Option<&str>,
) -> anyhow::Result<Uuid> {
    let row = sqlx::query(
        r#"
        INSERT INTO wellness.students (id, email, full_name)
        VALUES ($1, $2, $3)
        ON CONFLICT (email) DO UPDATE
        SET full_name = COALESCE(EXCLUDED.full_name, wellness.students.full_name)
        RETURNING id
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(email)
    .bind(full_name)
    .fetch_one(pool)
    .await?;

    Ok(row.get("id"))
}

pub async fn find_student(pool: &PgPool, email: &str) -> anyhow::Result<Option<StudentRecord>> {
    let row = sqlx::query(
        "SELECT id, email, full_name FROM wellness.students WHERE email = $1",
    )
    .bind(email)
    .fetch_optional(pool)
    .await?;

    Ok(row.map(|row| StudentRecord {
        id: row.get("id"),
        email: row.get("email"),
        full_name: row.get("full_name"),
    }))
}

/// Display-name lookup for notification messages. A missing student or a
/// student without a recorded name both come back as None; the caller falls
/// back to a placeholder rather than failing.
pub async fn student_display_name(pool: &PgPool, id: Uuid) -> anyhow::Result<Option<String>> {
    let row = sqlx::query("SELECT full_name FROM wellness.students WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await?;

    Ok(row.and_then(|row| row.get::<Option<String>, _>("full_name")))
}

/// Inserts a self-report. Returns None when a source key collides with an
/// already imported report. Reports are never updated or deleted.
#[allow(clippy::too_many_arguments)]
pub async fn insert_report(
    pool: &PgPool,
    student_id: Uuid,
    stress_level: i32,
    mood: &str,
    sleep_hours: f64,
    comment: &str,
    submitted_at: Option<DateTime<Utc>>,
    source_key: Option<&str>,
) -> anyhow::Result<Option<ReportRecord>> {
    let row = sqlx::query(
        r#"
        INSERT INTO wellness.self_reports
        (id, student_id, stress_level, mood, sleep_hours, comment, submitted_at, source_key)
        VALUES ($1, $2, $3, $4, $5, $6, COALESCE($7, now()), $8)
        ON CONFLICT (source_key) DO NOTHING
        RETURNING id, submitted_at
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(student_id)
    .bind(stress_level)
    .bind(mood)
    .bind(sleep_hours)
    .bind(comment)
    .bind(submitted_at)
    .bind(source_key)
    .fetch_optional(pool)
    .await?;

    Ok(row.map(|row| ReportRecord {
        id: row.get("id"),
        student_id,
        stress_level,
        mood: mood.to_string(),
        sleep_hours,
        submitted_at: row.get("submitted_at"),
    }))
}

pub struct NewAlert<'a> {
    pub student_id: Uuid,
    pub risk_score: f64,
    pub severity: Severity,
    pub condition: &'a str,
    pub created_at: DateTime<Utc>,
}

/// Creates the alert and its notification in one transaction, so no alert
/// row can exist without its notification.
pub async fn create_alert_with_notification(
    pool: &PgPool,
    alert: &NewAlert<'_>,
    title: &str,
    message: &str,
) -> anyhow::Result<Uuid> {
    let alert_id = Uuid::new_v4();
    let mut tx = pool.begin().await?;

    sqlx::query(
        r#"
        INSERT INTO wellness.alerts
        (id, student_id, risk_score, severity, condition, status, created_at)
        VALUES ($1, $2, $3, $4, $5, 'OPEN', $6)
        "#,
    )
    .bind(alert_id)
    .bind(alert.student_id)
    .bind(alert.risk_score)
    .bind(alert.severity.label())
    .bind(alert.condition)
    .bind(alert.created_at)
    .execute(&mut *tx)
    .await?;

    sqlx::query(
        r#"
        INSERT INTO wellness.notifications
        (id, student_id, alert_id, title, message, created_at)
        VALUES ($1, $2, $3, $4, $5, $6)
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(alert.student_id)
    .bind(alert_id)
    .bind(title)
    .bind(message)
    .bind(alert.created_at)
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;
    Ok(alert_id)
}

pub async fn list_alerts(
    pool: &PgPool,
    status: Option<AlertStatus>,
    limit: i64,
) -> anyhow::Result<Vec<AlertRow>> {
    let mut query = String::from(
        "SELECT a.id, s.full_name, s.email, a.risk_score, a.severity, a.condition, \
         a.status, a.created_at, a.ack_at, a.resolved_at \
         FROM wellness.alerts a \
         JOIN wellness.students s ON s.id = a.student_id",
    );

    if status.is_some() {
        query.push_str(" WHERE a.status = $2");
    }

    query.push_str(" ORDER BY a.created_at DESC LIMIT $1");

    let mut rows = sqlx::query(&query).bind(limit);
    if let Some(status) = status {
        rows = rows.bind(status.label());
    }

    let records = rows.fetch_all(pool).await?;
    let mut alerts = Vec::new();

    for row in records {
        let severity: String = row.get("severity");
        let status: String = row.get("status");
        alerts.push(AlertRow {
            id: row.get("id"),
            student_name: row.get("full_name"),
            student_email: row.get("email"),
            risk_score: row.get("risk_score"),
            severity: Severity::parse(&severity)
                .with_context(|| format!("unknown severity stored on alert: {severity}"))?,
            condition: row.get("condition"),
            status: AlertStatus::parse(&status)
                .with_context(|| format!("unknown status stored on alert: {status}"))?,
            created_at: row.get("created_at"),
            ack_at: row.get("ack_at"),
            resolved_at: row.get("resolved_at"),
        });
    }

    Ok(alerts)
}

/// Stamping rule for status transitions: entering ACK stamps ack_at and
/// entering RESOLVED stamps resolved_at; earlier stamps are preserved, so
/// re-entering a state never rewrites history.
pub fn status_stamps(
    status: AlertStatus,
    ack_at: Option<DateTime<Utc>>,
    resolved_at: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
) -> (Option<DateTime<Utc>>, Option<DateTime<Utc>>) {
    match status {
        AlertStatus::Open => (ack_at, resolved_at),
        AlertStatus::Ack => (ack_at.or(Some(now)), resolved_at),
        AlertStatus::Resolved => (ack_at, resolved_at.or(Some(now))),
    }
}

/// Writes the requested status unconditionally; the timestamps follow
/// `status_stamps`. Returns false when no alert has the given id.
pub async fn set_alert_status(
    pool: &PgPool,
    alert_id: Uuid,
    status: AlertStatus,
) -> anyhow::Result<bool> {
    let mut tx = pool.begin().await?;

    let row = sqlx::query(
        "SELECT ack_at, resolved_at FROM wellness.alerts WHERE id = $1 FOR UPDATE",
    )
    .bind(alert_id)
    .fetch_optional(&mut *tx)
    .await?;

    let row = match row {
        Some(row) => row,
        None => return Ok(false),
    };

    let (ack_at, resolved_at) = status_stamps(
        status,
        row.get("ack_at"),
        row.get("resolved_at"),
        Utc::now(),
    );

    sqlx::query(
        "UPDATE wellness.alerts SET status = $2, ack_at = $3, resolved_at = $4 WHERE id = $1",
    )
    .bind(alert_id)
    .bind(status.label())
    .bind(ack_at)
    .bind(resolved_at)
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;
    Ok(true)
}

pub async fn create_notification(
    pool: &PgPool,
    student_id: Uuid,
    title: &str,
    message: &str,
) -> anyhow::Result<Uuid> {
    let id = Uuid::new_v4();
    sqlx::query(
        r#"
        INSERT INTO wellness.notifications (id, student_id, title, message)
        VALUES ($1, $2, $3, $4)
        "#,
    )
    .bind(id)
    .bind(student_id)
    .bind(title)
    .bind(message)
    .execute(pool)
    .await?;

    Ok(id)
}

pub async fn list_notifications(
    pool: &PgPool,
    student_id: Uuid,
    unread_only: bool,
) -> anyhow::Result<Vec<NotificationRow>> {
    let mut query = String::from(
        "SELECT id, alert_id, title, message, is_read, created_at \
         FROM wellness.notifications WHERE student_id = $1",
    );

    if unread_only {
        query.push_str(" AND is_read = FALSE");
    }

    query.push_str(" ORDER BY created_at DESC");

    let records = sqlx::query(&query).bind(student_id).fetch_all(pool).await?;

    Ok(records
        .into_iter()
        .map(|row| NotificationRow {
            id: row.get("id"),
            alert_id: row.get("alert_id"),
            title: row.get("title"),
            message: row.get("message"),
            is_read: row.get("is_read"),
            created_at: row.get("created_at"),
        })
        .collect())
}

pub async fn mark_notification_read(pool: &PgPool, id: Uuid) -> anyhow::Result<bool> {
    let result = sqlx::query("UPDATE wellness.notifications SET is_read = TRUE WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?;

    Ok(result.rows_affected() > 0)
}

pub async fn fetch_reports(
    pool: &PgPool,
    since: DateTime<Utc>,
    email: Option<&str>,
) -> anyhow::Result<Vec<ReportView>> {
    let mut query = String::from(
        "SELECT s.full_name, s.email, r.stress_level, r.mood, r.sleep_hours, \
         r.comment, r.submitted_at \
         FROM wellness.self_reports r \
         JOIN wellness.students s ON s.id = r.student_id \
         WHERE r.submitted_at >= $1",
    );

    if email.is_some() {
        query.push_str(" AND s.email = $2");
    }

    query.push_str(" ORDER BY r.submitted_at DESC");

    let mut rows = sqlx::query(&query).bind(since);
    if let Some(value) = email {
        rows = rows.bind(value);
    }

    let records = rows.fetch_all(pool).await?;

    Ok(records
        .into_iter()
        .map(|row| ReportView {
            student_name: row.get("full_name"),
            student_email: row.get("email"),
            stress_level: row.get("stress_level"),
            mood: row.get("mood"),
            sleep_hours: row.get("sleep_hours"),
            comment: row.get("comment"),
            submitted_at: row.get("submitted_at"),
        })
        .collect())
}

pub async fn fetch_alert_counts(
    pool: &PgPool,
    since: DateTime<Utc>,
    email: Option<&str>,
) -> anyhow::Result<Vec<SeverityCount>> {
    let mut query = String::from(
        "SELECT a.severity, COUNT(*) AS count \
         FROM wellness.alerts a \
         JOIN wellness.students s ON s.id = a.student_id \
         WHERE a.created_at >= $1",
    );

    if email.is_some() {
        query.push_str(" AND s.email = $2");
    }

    query.push_str(" GROUP BY a.severity");

    let mut rows = sqlx::query(&query).bind(since);
    if let Some(value) = email {
        rows = rows.bind(value);
    }

    let records = rows.fetch_all(pool).await?;
    let mut counts = Vec::new();

    for row in records {
        let severity: String = row.get("severity");
        counts.push(SeverityCount {
            severity: Severity::parse(&severity)
                .with_context(|| format!("unknown severity stored on alert: {severity}"))?,
            count: row.get("count"),
        });
    }

    counts.sort_by(|a, b| b.severity.cmp(&a.severity));
    Ok(counts)
}

pub fn cutoff(since_days: i64) -> DateTime<Utc> {
    Utc::now() - Duration::days(since_days.max(1))
}

pub async fn import_csv(
    pool: &PgPool,
    csv_path: &std::path::Path,
) -> anyhow::Result<Vec<ReportRecord>> {
    #[derive(serde::Deserialize)]
    struct CsvRow {
        full_name: String,
        email: String,
        stress_level: i32,
        mood: String,
        sleep_hours: f64,
        #[serde(default)]
        comment: String,
        #[serde(default)]
        submitted_at: Option<DateTime<Utc>>,
        #[serde(default)]
        source_key: Option<String>,
    }

    let mut reader = csv::Reader::from_path(csv_path)
        .with_context(|| format!("failed to open {}", csv_path.display()))?;
    let mut inserted = Vec::new();

    for result in reader.deserialize::<CsvRow>() {
        let row = result?;
        let student_id = upsert_student(pool, &row.email, Some(&row.full_name)).await?;

        let source_key = row
            .source_key
            .unwrap_or_else(|| format!("import-{}", Uuid::new_v4()));

        if let Some(record) = insert_report(
            pool,
            student_id,
            row.stress_level,
            &row.mood,
            row.sleep_hours,
            &row.comment,
            row.submitted_at,
            Some(&source_key),
        )
        .await?
        {
            inserted.push(record);
        }
    }

    Ok(inserted)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 14, hour, 0, 0).unwrap()
    }

    #[test]
    fn entering_ack_stamps_ack_timestamp() {
        let (ack_at, resolved_at) = status_stamps(AlertStatus::Ack, None, None, at(9));
        assert_eq!(ack_at, Some(at(9)));
        assert_eq!(resolved_at, None);
    }

    #[test]
    fn entering_resolved_stamps_resolved_timestamp() {
        let (ack_at, resolved_at) =
            status_stamps(AlertStatus::Resolved, Some(at(9)), None, at(11));
        assert_eq!(ack_at, Some(at(9)));
        assert_eq!(resolved_at, Some(at(11)));
    }

    #[test]
    fn re_entering_a_state_preserves_the_earlier_stamp() {
        let (ack_at, _) = status_stamps(AlertStatus::Ack, Some(at(9)), None, at(15));
        assert_eq!(ack_at, Some(at(9)));

        let (_, resolved_at) =
            status_stamps(AlertStatus::Resolved, Some(at(9)), Some(at(11)), at(15));
        assert_eq!(resolved_at, Some(at(11)));
    }

    #[test]
    fn reopening_keeps_existing_stamps() {
        let (ack_at, resolved_at) =
            status_stamps(AlertStatus::Open, Some(at(9)), Some(at(11)), at(15));
        assert_eq!(ack_at, Some(at(9)));
        assert_eq!(resolved_at, Some(at(11)));
    }
}
