use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, sqlx::Type, PartialEq, Eq)]
#[sqlx(type_name = "mood_trend", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum MoodTrend {
    Improving,
    Stable,
    Declining,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, sqlx::Type, PartialEq, Eq, PartialOrd, Ord)]
#[sqlx(type_name = "risk_level", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

/// Cached daily analysis row.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct MoodInsight {
    pub id: Uuid,
    pub user_id: Uuid,
    pub analyzed_on: NaiveDate,
    pub trend: MoodTrend,
    pub risk_level: RiskLevel,
    pub summary: String,
    pub suggestions: Json<Vec<String>>,
    pub analyzed_at: DateTime<Utc>,
}

/// Shape the model is asked to answer with.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct InsightAnalysis {
    pub trend: MoodTrend,
    pub risk_level: RiskLevel,
    pub summary: String,
    pub suggestions: Vec<String>,
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum InsightSource {
    Ai,
    Cache,
    Fallback,
}

#[derive(Debug, Serialize)]
pub struct MoodInsightResponse {
    #[serde(flatten)]
    pub analysis: InsightAnalysis,
    pub analyzed_at: DateTime<Utc>,
    pub source: InsightSource,
}

impl From<MoodInsight> for MoodInsightResponse {
    fn from(row: MoodInsight) -> Self {
        Self {
            analysis: InsightAnalysis {
                trend: row.trend,
                risk_level: row.risk_level,
                summary: row.summary,
                suggestions: row.suggestions.0,
            },
            analyzed_at: row.analyzed_at,
            source: InsightSource::Cache,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct MoodInsightQuery {
    #[serde(default)]
    pub refresh: bool,
}
