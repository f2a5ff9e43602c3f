use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct MoodEntry {
    pub id: Uuid,
    pub user_id: Uuid,
    pub mood_score: i32,
    pub note: Option<String>,
    pub logged_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct LogMoodRequest {
    #[validate(range(min = 1, max = 5, message = "Mood score must be between 1 and 5"))]
    pub mood_score: i32,

    #[validate(length(max = 2000, message = "Note must be under 2000 characters"))]
    pub note: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct MoodEntryQuery {
    pub limit: Option<i64>,
}

/// Average score for one calendar day, as plotted on the weekly chart.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct DailyMood {
    pub date: chrono::NaiveDate,
    pub average: f64,
    pub entries: usize,
}

#[derive(Debug, Serialize)]
pub struct MoodStats {
    pub total_check_ins: i64,
    pub average_score: Option<f64>,
    pub streak: u32,
    pub streak_message: &'static str,
    pub task_completion_rate: Option<u32>,
    pub trend: Vec<DailyMood>,
}
