use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

/// Alert severity bucket derived from the risk score. Ordering matters:
/// the derived `Ord` gives Low < Medium < High < Critical.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

impl Severity {
    pub fn label(&self) -> &'static str {
        match self {
            Severity::Low => "LOW",
            Severity::Medium => "MEDIUM",
            Severity::High => "HIGH",
            Severity::Critical => "CRITICAL",
        }
    }

    pub fn parse(value: &str) -> Option<Severity> {
        match value.to_ascii_uppercase().as_str() {
            "LOW" => Some(Severity::Low),
            "MEDIUM" => Some(Severity::Medium),
            "HIGH" => Some(Severity::High),
            "CRITICAL" => Some(Severity::Critical),
            _ => None,
        }
    }
}

/// Alert lifecycle status. Transitions are an administrator action and are
/// deliberately unguarded: any status may be written at any time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum AlertStatus {
    Open,
    Ack,
    Resolved,
}

impl AlertStatus {
    pub fn label(&self) -> &'static str {
        match self {
            AlertStatus::Open => "OPEN",
            AlertStatus::Ack => "ACK",
            AlertStatus::Resolved => "RESOLVED",
        }
    }

    pub fn parse(value: &str) -> Option<AlertStatus> {
        match value.to_ascii_uppercase().as_str() {
            "OPEN" => Some(AlertStatus::Open),
            "ACK" => Some(AlertStatus::Ack),
            "RESOLVED" => Some(AlertStatus::Resolved),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct StudentRecord {
    pub id: Uuid,
    pub email: String,
    pub full_name: Option<String>,
}

/// A persisted self-report. Immutable once created.
#[derive(Debug, Clone)]
pub struct ReportRecord {
    pub id: Uuid,
    pub student_id: Uuid,
    pub stress_level: i32,
    pub mood: String,
    pub sleep_hours: f64,
    pub submitted_at: DateTime<Utc>,
}

/// Self-report joined with its student, for trend reporting.
#[derive(Debug, Clone)]
pub struct ReportView {
    pub student_name: Option<String>,
    pub student_email: String,
    pub stress_level: i32,
    pub mood: String,
    pub sleep_hours: f64,
    pub comment: String,
    pub submitted_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct AlertRow {
    pub id: Uuid,
    pub student_name: Option<String>,
    pub student_email: String,
    pub risk_score: f64,
    pub severity: Severity,
    pub condition: String,
    pub status: AlertStatus,
    pub created_at: DateTime<Utc>,
    pub ack_at: Option<DateTime<Utc>>,
    pub resolved_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct NotificationRow {
    pub id: Uuid,
    pub alert_id: Option<Uuid>,
    pub title: String,
    pub message: String,
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct SeverityCount {
    pub severity: Severity,
    pub count: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn severity_ordering_matches_labels() {
        assert!(Severity::Low < Severity::Medium);
        assert!(Severity::Medium < Severity::High);
        assert!(Severity::High < Severity::Critical);
        assert_eq!(Severity::Critical.label(), "CRITICAL");
    }

    #[test]
    fn severity_parse_round_trips() {
        for severity in [
            Severity::Low,
            Severity::Medium,
            Severity::High,
            Severity::Critical,
        ] {
            assert_eq!(Severity::parse(severity.label()), Some(severity));
        }
        assert_eq!(Severity::parse("urgent"), None);
    }

    #[test]
    fn status_parse_is_case_insensitive() {
        assert_eq!(AlertStatus::parse("open"), Some(AlertStatus::Open));
        assert_eq!(AlertStatus::parse("Ack"), Some(AlertStatus::Ack));
        assert_eq!(AlertStatus::parse("RESOLVED"), Some(AlertStatus::Resolved));
        assert_eq!(AlertStatus::parse("closed"), None);
    }
}
