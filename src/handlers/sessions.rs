use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};
use chrono::Utc;
use uuid::Uuid;
use validator::Validate;

use crate::auth::middleware::AuthUser;
use crate::error::{AppError, AppResult};
use crate::models::session_summary::{CreateSessionRequest, SessionSummary};
use crate::AppState;

pub async fn create_session(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Json(body): Json<CreateSessionRequest>,
) -> AppResult<(StatusCode, Json<SessionSummary>)> {
    body.validate()?;

    let summary = body
        .trimmed_summary()
        .ok_or_else(|| AppError::Validation("Summary is required".into()))?;
    let session_date = body.session_date.unwrap_or_else(|| Utc::now().date_naive());

    let session = sqlx::query_as::<_, SessionSummary>(
        r#"
        INSERT INTO session_summaries (id, user_id, session_date, summary, key_takeaways, provider_name)
        VALUES ($1, $2, $3, $4, $5, $6)
        RETURNING *
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(auth_user.id)
    .bind(session_date)
    .bind(&summary)
    .bind(body.normalized_takeaways())
    .bind(body.normalized_provider())
    .fetch_one(&state.db)
    .await?;

    tracing::info!(user_id = %auth_user.id, session_id = %session.id, "Session summary saved");

    Ok((StatusCode::CREATED, Json(session)))
}

pub async fn list_sessions(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
) -> AppResult<Json<Vec<SessionSummary>>> {
    let sessions = sqlx::query_as::<_, SessionSummary>(
        r#"
        SELECT * FROM session_summaries
        WHERE user_id = $1
        ORDER BY session_date DESC, created_at DESC
        "#,
    )
    .bind(auth_user.id)
    .fetch_all(&state.db)
    .await?;

    Ok(Json(sessions))
}

pub async fn delete_session(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Path(id): Path<Uuid>,
) -> AppResult<StatusCode> {
    let result = sqlx::query("DELETE FROM session_summaries WHERE id = $1 AND user_id = $2")
        .bind(id)
        .bind(auth_user.id)
        .execute(&state.db)
        .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("Session not found".into()));
    }

    Ok(StatusCode::NO_CONTENT)
}
