use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, sqlx::Type, PartialEq, Eq)]
#[sqlx(type_name = "reminder_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum ReminderStatus {
    Pending,
    Sent,
    Failed,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Reminder {
    pub id: Uuid,
    pub user_id: Uuid,
    pub care_plan_id: Option<Uuid>,
    pub title: String,
    pub message: Option<String>,
    pub channel: String,
    pub scheduled_at: DateTime<Utc>,
    pub sent_at: Option<DateTime<Utc>>,
    pub status: ReminderStatus,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ReminderKind {
    MoodCheckin,
    CareTasks,
    Custom,
}

#[derive(Debug, Deserialize, Validate)]
pub struct SendReminderRequest {
    pub kind: ReminderKind,

    #[validate(length(max = 1000, message = "Message must be under 1000 characters"))]
    pub custom_message: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct SendReminderResponse {
    pub success: bool,
    pub email_id: Option<String>,
}
