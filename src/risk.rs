use chrono::{DateTime, Utc};

use crate::models::Severity;

const STRESS_WEIGHT: f64 = 0.4;
const SLEEP_WEIGHT: f64 = 0.35;
const MOOD_WEIGHT: f64 = 0.25;

pub const ALERT_NOTIFICATION_TITLE: &str = "Wellness Alert";

/// Outcome of evaluating a self-report that crossed a trigger rule.
#[derive(Debug, Clone, PartialEq)]
pub struct Evaluation {
    pub risk_score: f64,
    pub severity: Severity,
    pub condition: &'static str,
}

/// Weighted composite score over the three normalized signals. Inputs are
/// taken as stored: out-of-range stress or negative sleep hours flow
/// straight through the arithmetic, so the score is only nominally [0, 1].
pub fn risk_score(stress_level: i32, mood: &str, sleep_hours: f64) -> f64 {
    let stress_norm = stress_level as f64 / 10.0;
    let mood_norm = mood_norm(mood);
    let sleep_norm = 1.0 - (sleep_hours / 8.0).min(1.0);
    STRESS_WEIGHT * stress_norm + SLEEP_WEIGHT * sleep_norm + MOOD_WEIGHT * mood_norm
}

fn mood_norm(mood: &str) -> f64 {
    match mood {
        "sad" => 1.0,
        "neutral" => 0.5,
        _ => 0.0,
    }
}

/// Runs the trigger rules in priority order. The score is computed
/// regardless of which rule fires; the first matching rule names the
/// recorded condition.
pub fn evaluate(stress_level: i32, mood: &str, sleep_hours: f64) -> Option<Evaluation> {
    let score = risk_score(stress_level, mood, sleep_hours);

    let condition = if score >= 0.75 {
        "risk_score >= 0.75"
    } else if stress_level >= 8 && sleep_hours < 5.0 {
        "stress >= 8 and sleep_hours < 5"
    } else if mood == "sad" && sleep_hours < 6.0 {
        "mood == 'sad' and sleep_hours < 6"
    } else {
        return None;
    };

    Some(Evaluation {
        risk_score: score,
        severity: severity_for(score),
        condition,
    })
}

/// Severity thresholds are inclusive, so a score of exactly 0.75 lands in
/// High with no gap above Medium.
pub fn severity_for(score: f64) -> Severity {
    if score >= 0.9 {
        Severity::Critical
    } else if score >= 0.75 {
        Severity::High
    } else if score >= 0.5 {
        Severity::Medium
    } else {
        Severity::Low
    }
}

pub fn notification_message(
    student_name: Option<&str>,
    evaluation: &Evaluation,
    created_at: DateTime<Utc>,
) -> String {
    let name = student_name.unwrap_or("Unknown Student");
    format!(
        "{} triggered a {} wellness alert at {}: risk score {:.2} ({})",
        name,
        evaluation.severity.label(),
        created_at.format("%Y-%m-%d %H:%M UTC"),
        evaluation.risk_score,
        evaluation.condition
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-6
    }

    #[test]
    fn high_stress_sad_short_sleep_scores_as_expected() {
        let score = risk_score(9, "sad", 3.0);
        assert!(close(score, 0.82875));

        let evaluation = evaluate(9, "sad", 3.0).expect("should trigger");
        assert_eq!(evaluation.condition, "risk_score >= 0.75");
        assert_eq!(evaluation.severity, Severity::High);
    }

    #[test]
    fn calm_report_does_not_trigger() {
        let score = risk_score(2, "happy", 8.0);
        assert!(close(score, 0.08));
        assert!(evaluate(2, "happy", 8.0).is_none());
    }

    #[test]
    fn score_rule_outranks_stress_rule() {
        // Both rule 1 and rule 2 match; the recorded condition is rule 1's.
        let evaluation = evaluate(8, "neutral", 4.0).expect("should trigger");
        assert!(close(evaluation.risk_score, 0.795));
        assert_eq!(evaluation.condition, "risk_score >= 0.75");
        assert_eq!(evaluation.severity, Severity::High);
    }

    #[test]
    fn stress_rule_fires_below_score_threshold() {
        let evaluation = evaluate(9, "happy", 4.0).expect("should trigger");
        assert!(close(evaluation.risk_score, 0.535));
        assert_eq!(evaluation.condition, "stress >= 8 and sleep_hours < 5");
        assert_eq!(evaluation.severity, Severity::Medium);
    }

    #[test]
    fn mood_rule_fires_below_other_thresholds() {
        let evaluation = evaluate(3, "sad", 5.5).expect("should trigger");
        assert!(close(evaluation.risk_score, 0.479375));
        assert_eq!(evaluation.condition, "mood == 'sad' and sleep_hours < 6");
        assert_eq!(evaluation.severity, Severity::Low);
    }

    #[test]
    fn score_stays_in_unit_range_for_valid_inputs() {
        for stress in 0..=10 {
            for mood in ["sad", "neutral", "happy"] {
                for tenths in 0..=120 {
                    let sleep = tenths as f64 / 10.0;
                    let score = risk_score(stress, mood, sleep);
                    assert!(
                        (0.0..=1.0).contains(&score),
                        "score {score} out of range for stress={stress} mood={mood} sleep={sleep}"
                    );
                }
            }
        }
    }

    #[test]
    fn severity_is_monotonic_in_score() {
        let mut previous = Severity::Low;
        for step in 0..=1000 {
            let score = step as f64 / 1000.0;
            let severity = severity_for(score);
            assert!(severity >= previous, "severity dropped at score {score}");
            previous = severity;
        }
    }

    #[test]
    fn severity_boundaries_are_inclusive() {
        assert_eq!(severity_for(0.9), Severity::Critical);
        assert_eq!(severity_for(0.75), Severity::High);
        assert_eq!(severity_for(0.7499999), Severity::Medium);
        assert_eq!(severity_for(0.5), Severity::Medium);
        assert_eq!(severity_for(0.4999999), Severity::Low);
    }

    #[test]
    fn score_of_exactly_threshold_triggers_as_high() {
        // 0.4 * 1.0 + 0.35 * 1.0 + 0.25 * 0.0 lands exactly on 0.75.
        let evaluation = evaluate(10, "happy", 0.0).expect("should trigger");
        assert_eq!(evaluation.condition, "risk_score >= 0.75");
        assert_eq!(evaluation.severity, Severity::High);
    }

    #[test]
    fn evaluation_is_deterministic() {
        let first = evaluate(7, "sad", 4.5).expect("should trigger");
        let second = evaluate(7, "sad", 4.5).expect("should trigger");
        assert_eq!(first, second);
    }

    #[test]
    fn message_embeds_name_score_condition_and_severity() {
        let evaluation = evaluate(9, "sad", 3.0).expect("should trigger");
        let created_at = Utc.with_ymd_and_hms(2026, 3, 14, 9, 30, 0).unwrap();
        let message = notification_message(Some("Maya Chen"), &evaluation, created_at);
        assert!(message.contains("Maya Chen"));
        assert!(message.contains("0.83"));
        assert!(message.contains("risk_score >= 0.75"));
        assert!(message.contains("HIGH"));
        assert!(message.contains("2026-03-14 09:30 UTC"));
    }

    #[test]
    fn message_falls_back_for_missing_student() {
        let evaluation = evaluate(9, "sad", 3.0).expect("should trigger");
        let message = notification_message(None, &evaluation, Utc::now());
        assert!(message.contains("Unknown Student"));
    }
}
