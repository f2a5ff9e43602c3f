use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::Serialize;

use crate::models::mood_entry::MoodEntry;
use crate::services::mood_trends::average_score;

pub const REPORT_WINDOW_DAYS: i64 = 14;
pub const NARRATIVE_TEMPERATURE: f64 = 0.4;
pub const DEFAULT_NARRATIVE: &str = "Progress report generated successfully.";

#[derive(Debug, Serialize, PartialEq)]
pub struct ReportPeriod {
    pub from: NaiveDate,
    pub to: NaiveDate,
}

#[derive(Debug, Serialize, PartialEq)]
pub struct ScorePoint {
    pub score: i32,
    pub date: DateTime<Utc>,
}

#[derive(Debug, Serialize, PartialEq)]
pub struct MoodSection {
    pub entries: usize,
    pub average: Option<f64>,
    pub scores: Vec<ScorePoint>,
}

#[derive(Debug, Serialize, PartialEq)]
pub struct SessionSection {
    pub count: usize,
}

#[derive(Debug, Serialize, PartialEq)]
pub struct TaskSection {
    pub completed: usize,
    pub rate: u32,
}

#[derive(Debug, Serialize)]
pub struct ProgressReport {
    pub period: ReportPeriod,
    pub mood: MoodSection,
    pub sessions: SessionSection,
    pub tasks: TaskSection,
    pub narrative: String,
}

/// First instant of the reporting window.
pub fn window_start(now: DateTime<Utc>) -> DateTime<Utc> {
    now - Duration::days(REPORT_WINDOW_DAYS)
}

/// Share of possible task check-offs over the window, as a whole percentage.
pub fn task_completion_rate(completed: usize, tasks_in_plan: usize) -> u32 {
    if tasks_in_plan == 0 {
        return 0;
    }
    let possible = tasks_in_plan as f64 * REPORT_WINDOW_DAYS as f64;
    ((completed as f64 / possible) * 100.0).round() as u32
}

/// `moods` are expected oldest first.
pub fn mood_section(moods: &[MoodEntry]) -> MoodSection {
    MoodSection {
        entries: moods.len(),
        average: average_score(moods),
        scores: moods
            .iter()
            .map(|m| ScorePoint { score: m.mood_score, date: m.logged_at })
            .collect(),
    }
}

pub fn narrative_prompt(mood: &MoodSection, session_count: usize, completed_tasks: usize) -> String {
    let average = mood
        .average
        .map(|a| format!("{:.1}", a))
        .unwrap_or_else(|| "N/A".into());
    let scores: Vec<String> = mood.scores.iter().map(|s| s.score.to_string()).collect();

    format!(
        "Write a brief, warm 3-4 sentence progress summary for a therapy patient to share with their therapist. Data:\n\
         - {} mood entries over 2 weeks, average score: {}/5\n\
         - {} therapy sessions logged\n\
         - {} care tasks completed\n\
         - Mood scores: {}\n\
         Be encouraging but honest. Do not use markdown.",
        mood.entries,
        average,
        session_count,
        completed_tasks,
        scores.join(", ")
    )
}
