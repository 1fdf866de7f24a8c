use std::fmt::Write;

use chrono::{DateTime, Utc};

use crate::models::{ReportView, SeverityCount};

#[derive(Debug, Clone)]
pub struct TrendSummary {
    pub report_count: usize,
    pub avg_stress: f64,
    pub avg_sleep: f64,
    pub mood_mix: Vec<(String, usize)>,
}

pub fn summarize(reports: &[ReportView]) -> TrendSummary {
    let mut moods: std::collections::HashMap<String, usize> = std::collections::HashMap::new();
    let mut total_stress = 0i64;
    let mut total_sleep = 0.0f64;

    for report in reports {
        total_stress += report.stress_level as i64;
        total_sleep += report.sleep_hours;
        *moods.entry(report.mood.clone()).or_insert(0) += 1;
    }

    let mut mood_mix: Vec<(String, usize)> = moods.into_iter().collect();
    mood_mix.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));

    let count = reports.len();
    TrendSummary {
        report_count: count,
        avg_stress: if count == 0 {
            0.0
        } else {
            total_stress as f64 / count as f64
        },
        avg_sleep: if count == 0 {
            0.0
        } else {
            total_sleep / count as f64
        },
        mood_mix,
    }
}

pub fn build_report(
    scope: Option<&str>,
    since_days: i64,
    cutoff: DateTime<Utc>,
    reports: &[ReportView],
    alert_counts: &[SeverityCount],
) -> String {
    let summary = summarize(reports);

    let mut output = String::new();
    let scope_label = scope.unwrap_or("all students");

    let _ = writeln!(output, "# Wellness Trend Report");
    let _ = writeln!(
        output,
        "Generated for {} (reports from the last {} days, since {})",
        scope_label,
        since_days,
        cutoff.format("%Y-%m-%d")
    );
    let _ = writeln!(output);
    let _ = writeln!(output, "## Reporting Volume");

    if summary.report_count == 0 {
        let _ = writeln!(output, "No reports submitted in this window.");
    } else {
        let _ = writeln!(
            output,
            "- {} reports, average stress {:.1}/10, average sleep {:.1}h",
            summary.report_count, summary.avg_stress, summary.avg_sleep
        );
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Mood Mix");

    if summary.mood_mix.is_empty() {
        let _ = writeln!(output, "No moods recorded for this window.");
    } else {
        for (mood, count) in summary.mood_mix.iter() {
            let _ = writeln!(output, "- {mood}: {count} reports");
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Alerts by Severity");

    if alert_counts.is_empty() {
        let _ = writeln!(output, "No alerts raised in this window.");
    } else {
        for entry in alert_counts.iter() {
            let _ = writeln!(output, "- {}: {} alerts", entry.severity.label(), entry.count);
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Recent Comments");

    let mut commented: Vec<&ReportView> = reports
        .iter()
        .filter(|report| !report.comment.trim().is_empty())
        .collect();
    commented.sort_by(|a, b| b.submitted_at.cmp(&a.submitted_at));

    if commented.is_empty() {
        let _ = writeln!(output, "No comments recorded for this window.");
    } else {
        for report in commented.iter().take(5) {
            let name = report.student_name.as_deref().unwrap_or("Unknown Student");
            let _ = writeln!(
                output,
                "- {} ({}) on {}: {}",
                name,
                report.student_email,
                report.submitted_at.format("%Y-%m-%d"),
                report.comment
            );
        }
    }

    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Severity;
    use chrono::Duration;

    fn sample_report(stress: i32, mood: &str, sleep: f64, comment: &str) -> ReportView {
        ReportView {
            student_name: Some("Maya Chen".to_string()),
            student_email: "maya.chen@student.example.edu".to_string(),
            stress_level: stress,
            mood: mood.to_string(),
            sleep_hours: sleep,
            comment: comment.to_string(),
            submitted_at: Utc::now() - Duration::days(1),
        }
    }

    #[test]
    fn summary_averages_over_reports() {
        let reports = vec![
            sample_report(2, "happy", 8.0, ""),
            sample_report(8, "sad", 4.0, "rough week"),
        ];

        let summary = summarize(&reports);
        assert_eq!(summary.report_count, 2);
        assert!((summary.avg_stress - 5.0).abs() < 0.001);
        assert!((summary.avg_sleep - 6.0).abs() < 0.001);
    }

    #[test]
    fn mood_mix_sorts_by_count_then_name() {
        let reports = vec![
            sample_report(3, "sad", 6.0, ""),
            sample_report(3, "sad", 6.0, ""),
            sample_report(3, "happy", 6.0, ""),
            sample_report(3, "neutral", 6.0, ""),
        ];

        let summary = summarize(&reports);
        assert_eq!(summary.mood_mix[0], ("sad".to_string(), 2));
        assert_eq!(summary.mood_mix[1], ("happy".to_string(), 1));
        assert_eq!(summary.mood_mix[2], ("neutral".to_string(), 1));
    }

    #[test]
    fn empty_window_renders_placeholders() {
        let output = build_report(None, 30, Utc::now() - Duration::days(30), &[], &[]);
        assert!(output.contains("No reports submitted in this window."));
        assert!(output.contains("No alerts raised in this window."));
        assert!(output.contains("No comments recorded for this window."));
    }

    #[test]
    fn report_lists_alert_tally_and_comments() {
        let reports = vec![
            sample_report(9, "sad", 3.0, "Overwhelmed by deadlines"),
            sample_report(2, "happy", 8.0, ""),
        ];
        let counts = vec![SeverityCount {
            severity: Severity::High,
            count: 1,
        }];

        let output = build_report(
            Some("maya.chen@student.example.edu"),
            30,
            Utc::now() - Duration::days(30),
            &reports,
            &counts,
        );

        assert!(output.contains("2 reports"));
        assert!(output.contains("HIGH: 1 alerts"));
        assert!(output.contains("Overwhelmed by deadlines"));
        assert!(!output.contains("No comments recorded"));
    }
}
