use axum::{
    extract::{Query, State},
    Extension, Json,
};
use chrono::Utc;
use sqlx::types::Json as SqlJson;
use uuid::Uuid;

use crate::auth::middleware::AuthUser;
use crate::error::{AppError, AppResult};
use crate::models::mood_entry::MoodEntry;
use crate::models::mood_insight::{
    InsightSource, MoodInsight, MoodInsightQuery, MoodInsightResponse,
};
use crate::services::ai_gateway::ChatMessage;
use crate::services::mood_analysis::{
    analysis_prompt, apply_risk_floor, extract_analysis, fallback_analysis, ANALYSIS_TEMPERATURE,
    ANALYSIS_WINDOW, MIN_ENTRIES,
};
use crate::AppState;

pub async fn get_mood_insight(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Query(query): Query<MoodInsightQuery>,
) -> AppResult<Json<MoodInsightResponse>> {
    let today = Utc::now().date_naive();

    if !query.refresh {
        let cached = sqlx::query_as::<_, MoodInsight>(
            "SELECT * FROM mood_insights WHERE user_id = $1 AND analyzed_on = $2",
        )
        .bind(auth_user.id)
        .bind(today)
        .fetch_optional(&state.db)
        .await?;

        if let Some(row) = cached {
            tracing::debug!(user_id = %auth_user.id, "Serving cached mood insight");
            return Ok(Json(row.into()));
        }
    }

    let entries = sqlx::query_as::<_, MoodEntry>(
        r#"
        SELECT * FROM mood_entries
        WHERE user_id = $1
        ORDER BY logged_at DESC
        LIMIT $2
        "#,
    )
    .bind(auth_user.id)
    .bind(ANALYSIS_WINDOW)
    .fetch_all(&state.db)
    .await?;

    if entries.len() < MIN_ENTRIES {
        return Err(AppError::BadRequest("Need at least 3 entries".into()));
    }

    let messages = [ChatMessage::user(analysis_prompt(&entries))];
    let analysis = match state.ai.complete(&messages, Some(ANALYSIS_TEMPERATURE)).await {
        Ok(reply) => extract_analysis(&reply),
        // Undecodable gateway body; transport and status failures propagate.
        Err(AppError::MalformedUpstream(detail)) => {
            tracing::warn!(user_id = %auth_user.id, error = %detail, "Mood analysis body undecodable");
            None
        }
        Err(e) => return Err(e),
    };

    let Some(analysis) = analysis else {
        tracing::info!(user_id = %auth_user.id, "Using fallback mood insight");
        let analysis = apply_risk_floor(fallback_analysis(), &entries);
        return Ok(Json(MoodInsightResponse {
            analysis,
            analyzed_at: Utc::now(),
            source: InsightSource::Fallback,
        }));
    };

    let analysis = apply_risk_floor(analysis, &entries);

    let row = sqlx::query_as::<_, MoodInsight>(
        r#"
        INSERT INTO mood_insights (id, user_id, analyzed_on, trend, risk_level, summary, suggestions, analyzed_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7, NOW())
        ON CONFLICT (user_id, analyzed_on) DO UPDATE
            SET trend = EXCLUDED.trend,
                risk_level = EXCLUDED.risk_level,
                summary = EXCLUDED.summary,
                suggestions = EXCLUDED.suggestions,
                analyzed_at = EXCLUDED.analyzed_at
        RETURNING *
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(auth_user.id)
    .bind(today)
    .bind(analysis.trend)
    .bind(analysis.risk_level)
    .bind(&analysis.summary)
    .bind(SqlJson(&analysis.suggestions))
    .fetch_one(&state.db)
    .await?;

    tracing::info!(
        user_id = %auth_user.id,
        trend = ?row.trend,
        risk_level = ?row.risk_level,
        entries = entries.len(),
        "Mood insight generated"
    );

    let mut response = MoodInsightResponse::from(row);
    response.source = InsightSource::Ai;
    Ok(Json(response))
}
