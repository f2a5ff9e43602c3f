use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TaskCategory {
    Medication,
    Exercise,
    Mindfulness,
    Social,
    Therapy,
}

impl TaskCategory {
    pub const ALL: [TaskCategory; 5] = [
        TaskCategory::Medication,
        TaskCategory::Exercise,
        TaskCategory::Mindfulness,
        TaskCategory::Social,
        TaskCategory::Therapy,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            TaskCategory::Medication => "medication",
            TaskCategory::Exercise => "exercise",
            TaskCategory::Mindfulness => "mindfulness",
            TaskCategory::Social => "social",
            TaskCategory::Therapy => "therapy",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CareTask {
    pub id: String,
    pub title: String,
    pub description: String,
    pub category: TaskCategory,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct CarePlan {
    pub id: Uuid,
    pub user_id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub tasks: Json<Vec<CareTask>>,
    pub is_active: bool,
    pub generated_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl CarePlan {
    pub fn has_task(&self, task_id: &str) -> bool {
        self.tasks.0.iter().any(|t| t.id == task_id)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct TaskCompletion {
    pub id: Uuid,
    pub user_id: Uuid,
    pub care_plan_id: Uuid,
    pub task_id: String,
    pub completed_on: NaiveDate,
    pub completed_at: DateTime<Utc>,
}

#[derive(Debug, Default, Deserialize)]
pub struct GenerateCarePlanRequest {
    pub session_notes: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct GenerateCarePlanResponse {
    pub success: bool,
    pub care_plan: CarePlan,
}

#[derive(Debug, Default, Deserialize)]
pub struct ToggleTaskRequest {
    pub date: Option<NaiveDate>,
}

#[derive(Debug, Serialize)]
pub struct ToggleTaskResponse {
    pub task_id: String,
    pub date: NaiveDate,
    pub completed: bool,
}

#[derive(Debug, Serialize)]
pub struct ActiveCarePlan {
    #[serde(flatten)]
    pub plan: CarePlan,
    pub completions: Vec<TaskCompletion>,
}

/// Percentage of the plan's tasks completed, `None` for an empty plan.
pub fn completion_rate(task_count: usize, completed: usize) -> Option<u32> {
    if task_count == 0 {
        return None;
    }
    Some(((completed as f64 / task_count as f64) * 100.0).round() as u32)
}
