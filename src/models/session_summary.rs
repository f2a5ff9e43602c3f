use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct SessionSummary {
    pub id: Uuid,
    pub user_id: Uuid,
    pub session_date: NaiveDate,
    pub summary: String,
    pub key_takeaways: Option<Vec<String>>,
    pub provider_name: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateSessionRequest {
    pub session_date: Option<NaiveDate>,

    #[validate(length(max = 10000, message = "Summary must be under 10000 characters"))]
    pub summary: String,

    pub key_takeaways: Option<Vec<String>>,

    #[validate(length(max = 200, message = "Provider name must be under 200 characters"))]
    pub provider_name: Option<String>,
}

impl CreateSessionRequest {
    pub fn trimmed_summary(&self) -> Option<String> {
        let summary = self.summary.trim();
        (!summary.is_empty()).then(|| summary.to_string())
    }

    /// Trimmed, non-empty takeaways; `None` when nothing is left.
    pub fn normalized_takeaways(&self) -> Option<Vec<String>> {
        let takeaways: Vec<String> = self
            .key_takeaways
            .iter()
            .flatten()
            .map(|t| t.trim())
            .filter(|t| !t.is_empty())
            .map(String::from)
            .collect();
        (!takeaways.is_empty()).then_some(takeaways)
    }

    pub fn normalized_provider(&self) -> Option<String> {
        self.provider_name
            .as_deref()
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .map(String::from)
    }
}
