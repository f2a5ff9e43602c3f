use axum::{
    extract::{Query, State},
    Extension, Json,
};
use chrono::{Duration, Utc};
use uuid::Uuid;
use validator::Validate;

use crate::auth::middleware::AuthUser;
use crate::error::AppResult;
use crate::handlers::care_plans::fetch_active_plan;
use crate::models::care_plan::completion_rate;
use crate::models::mood_entry::{LogMoodRequest, MoodEntry, MoodEntryQuery, MoodStats};
use crate::services::mood_trends::{
    average_score, current_streak, daily_averages, logged_days, streak_message,
    STREAK_WINDOW_DAYS, TREND_DAYS,
};
use crate::AppState;

const DEFAULT_LIST_LIMIT: i64 = 30;
const MAX_LIST_LIMIT: i64 = 365;
/// Entries averaged for the headline score.
const AVERAGE_WINDOW: i64 = 30;

pub async fn log_mood(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Json(body): Json<LogMoodRequest>,
) -> AppResult<Json<MoodEntry>> {
    body.validate()?;

    let note = body
        .note
        .as_deref()
        .map(str::trim)
        .filter(|n| !n.is_empty());

    let entry = sqlx::query_as::<_, MoodEntry>(
        r#"
        INSERT INTO mood_entries (id, user_id, mood_score, note, logged_at)
        VALUES ($1, $2, $3, $4, NOW())
        RETURNING *
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(auth_user.id)
    .bind(body.mood_score)
    .bind(note)
    .fetch_one(&state.db)
    .await?;

    tracing::info!(user_id = %auth_user.id, mood_score = entry.mood_score, "Mood logged");

    Ok(Json(entry))
}

pub async fn list_moods(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Query(query): Query<MoodEntryQuery>,
) -> AppResult<Json<Vec<MoodEntry>>> {
    let limit = query
        .limit
        .unwrap_or(DEFAULT_LIST_LIMIT)
        .clamp(1, MAX_LIST_LIMIT);

    let entries = sqlx::query_as::<_, MoodEntry>(
        r#"
        SELECT * FROM mood_entries
        WHERE user_id = $1
        ORDER BY logged_at DESC
        LIMIT $2
        "#,
    )
    .bind(auth_user.id)
    .bind(limit)
    .fetch_all(&state.db)
    .await?;

    Ok(Json(entries))
}

pub async fn mood_stats(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
) -> AppResult<Json<MoodStats>> {
    let now = Utc::now();
    let today = now.date_naive();

    let total_check_ins: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM mood_entries WHERE user_id = $1")
            .bind(auth_user.id)
            .fetch_one(&state.db)
            .await?;

    // Entries inside the streak window, newest first.
    let recent = sqlx::query_as::<_, MoodEntry>(
        r#"
        SELECT * FROM mood_entries
        WHERE user_id = $1 AND logged_at >= $2
        ORDER BY logged_at DESC
        "#,
    )
    .bind(auth_user.id)
    .bind(now - Duration::days(STREAK_WINDOW_DAYS))
    .fetch_all(&state.db)
    .await?;

    let latest = sqlx::query_as::<_, MoodEntry>(
        r#"
        SELECT * FROM mood_entries
        WHERE user_id = $1
        ORDER BY logged_at DESC
        LIMIT $2
        "#,
    )
    .bind(auth_user.id)
    .bind(AVERAGE_WINDOW)
    .fetch_all(&state.db)
    .await?;

    let streak = current_streak(&logged_days(&recent), today);

    let active_plan = fetch_active_plan(&state, auth_user.id).await?;

    let task_completion_rate = match active_plan {
        Some(plan) => {
            let done: i64 = sqlx::query_scalar(
                r#"
                SELECT COUNT(*) FROM care_task_completions
                WHERE care_plan_id = $1 AND user_id = $2 AND completed_on = $3
                "#,
            )
            .bind(plan.id)
            .bind(auth_user.id)
            .bind(today)
            .fetch_one(&state.db)
            .await?;
            completion_rate(plan.tasks.0.len(), done as usize)
        }
        None => None,
    };

    Ok(Json(MoodStats {
        total_check_ins,
        average_score: average_score(&latest),
        streak,
        streak_message: streak_message(streak),
        task_completion_rate,
        trend: daily_averages(&recent, TREND_DAYS),
    }))
}
