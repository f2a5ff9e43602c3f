//! Mood-pattern analysis: prompt, reply extraction and the local risk floor.

use std::fmt::Write as _;

use crate::models::mood_entry::MoodEntry;
use crate::models::mood_insight::{InsightAnalysis, MoodTrend, RiskLevel};

/// Minimum entries before an analysis is attempted.
pub const MIN_ENTRIES: usize = 3;
/// Most recent entries sent for analysis.
pub const ANALYSIS_WINDOW: i64 = 14;
pub const ANALYSIS_TEMPERATURE: f64 = 0.3;

/// Scores at or below this count as a low day.
const LOW_SCORE: i32 = 2;
const LOW_RUN_FOR_HIGH_RISK: usize = 3;

/// `entries` are expected newest first.
pub fn analysis_prompt(entries: &[MoodEntry]) -> String {
    let mut lines = String::new();
    for entry in entries {
        let _ = write!(
            lines,
            "- Score: {}/5, Date: {}",
            entry.mood_score,
            entry.logged_at.to_rfc3339()
        );
        if let Some(note) = entry.note.as_deref() {
            let _ = write!(lines, ", Note: \"{}\"", note);
        }
        lines.push('\n');
    }

    format!(
        r#"Analyze these mood entries from a mental health app user. Each entry has a mood_score (1=awful, 5=great), optional note, and timestamp.

Entries (most recent first):
{}
Respond with ONLY a JSON object (no markdown, no code blocks):
{{
  "trend": "improving" | "stable" | "declining",
  "risk_level": "low" | "medium" | "high",
  "summary": "A warm, empathetic 1-2 sentence summary of their mood pattern. Be specific about dates/days.",
  "suggestions": ["3 personalized, actionable suggestions based on their data"]
}}

Rules:
- risk_level is "high" if 3+ consecutive entries have score <= 2
- risk_level is "medium" if average score is below 3
- Be culturally sensitive (user may be from Pakistan)
- Keep suggestions practical and specific to their patterns"#,
        lines
    )
}

/// Decode the model's reply, tolerating markdown fences and surrounding prose.
pub fn extract_analysis(reply: &str) -> Option<InsightAnalysis> {
    let candidate = match (reply.find('{'), reply.rfind('}')) {
        (Some(start), Some(end)) if start < end => &reply[start..=end],
        _ => reply,
    };

    match serde_json::from_str::<InsightAnalysis>(candidate) {
        Ok(analysis) => Some(analysis),
        Err(e) => {
            tracing::warn!(error = %e, "Mood analysis reply did not match the expected shape");
            None
        }
    }
}

pub fn fallback_analysis() -> InsightAnalysis {
    InsightAnalysis {
        trend: MoodTrend::Stable,
        risk_level: RiskLevel::Low,
        summary: "We're still learning your patterns. Keep logging daily!".into(),
        suggestions: vec![
            "Continue logging your mood daily".into(),
            "Try to note what affects your mood".into(),
            "Consider speaking with a counselor".into(),
        ],
    }
}

/// Risk implied by the scores alone, using the same rules given to the model.
pub fn baseline_risk(entries: &[MoodEntry]) -> RiskLevel {
    if entries.is_empty() {
        return RiskLevel::Low;
    }

    let mut run = 0;
    let mut longest_run = 0;
    for entry in entries {
        if entry.mood_score <= LOW_SCORE {
            run += 1;
            longest_run = longest_run.max(run);
        } else {
            run = 0;
        }
    }
    if longest_run >= LOW_RUN_FOR_HIGH_RISK {
        return RiskLevel::High;
    }

    let sum: i64 = entries.iter().map(|e| e.mood_score as i64).sum();
    if (sum as f64 / entries.len() as f64) < 3.0 {
        RiskLevel::Medium
    } else {
        RiskLevel::Low
    }
}

/// Never report less risk than the scores themselves show.
pub fn apply_risk_floor(mut analysis: InsightAnalysis, entries: &[MoodEntry]) -> InsightAnalysis {
    let floor = baseline_risk(entries);
    if floor > analysis.risk_level {
        tracing::info!(
            model_risk = ?analysis.risk_level,
            baseline_risk = ?floor,
            "Raising mood risk level to baseline"
        );
        analysis.risk_level = floor;
    }
    analysis
}
