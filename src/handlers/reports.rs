use axum::{extract::State, Extension, Json};
use chrono::Utc;

use crate::auth::middleware::AuthUser;
use crate::error::AppResult;
use crate::handlers::care_plans::fetch_active_plan;
use crate::models::mood_entry::MoodEntry;
use crate::services::ai_gateway::ChatMessage;
use crate::services::progress_report::{
    mood_section, narrative_prompt, task_completion_rate, window_start, ProgressReport,
    ReportPeriod, SessionSection, TaskSection, DEFAULT_NARRATIVE, NARRATIVE_TEMPERATURE,
};
use crate::AppState;

pub async fn progress_report(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
) -> AppResult<Json<ProgressReport>> {
    let now = Utc::now();
    let since = window_start(now);

    let moods = sqlx::query_as::<_, MoodEntry>(
        r#"
        SELECT * FROM mood_entries
        WHERE user_id = $1 AND logged_at >= $2
        ORDER BY logged_at ASC
        "#,
    )
    .bind(auth_user.id)
    .bind(since)
    .fetch_all(&state.db)
    .await?;

    let session_count: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM session_summaries WHERE user_id = $1 AND session_date >= $2",
    )
    .bind(auth_user.id)
    .bind(since.date_naive())
    .fetch_one(&state.db)
    .await?;

    let completed: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM care_task_completions WHERE user_id = $1 AND completed_at >= $2",
    )
    .bind(auth_user.id)
    .bind(since)
    .fetch_one(&state.db)
    .await?;

    let tasks_in_plan = fetch_active_plan(&state, auth_user.id)
        .await?
        .map(|plan| plan.tasks.0.len())
        .unwrap_or(0);

    let mood = mood_section(&moods);
    let session_count = session_count as usize;
    let completed = completed as usize;

    let mut narrative = DEFAULT_NARRATIVE.to_string();
    if state.ai.is_configured() && !moods.is_empty() {
        let messages = [ChatMessage::user(narrative_prompt(&mood, session_count, completed))];
        match state.ai.complete(&messages, Some(NARRATIVE_TEMPERATURE)).await {
            Ok(text) if !text.trim().is_empty() => narrative = text.trim().to_string(),
            Ok(_) => {}
            Err(e) => {
                tracing::warn!(user_id = %auth_user.id, error = %e, "Progress narrative unavailable");
            }
        }
    }

    tracing::info!(
        user_id = %auth_user.id,
        mood_entries = mood.entries,
        sessions = session_count,
        tasks_completed = completed,
        "Progress report built"
    );

    Ok(Json(ProgressReport {
        period: ReportPeriod { from: since.date_naive(), to: now.date_naive() },
        mood,
        sessions: SessionSection { count: session_count },
        tasks: TaskSection {
            completed,
            rate: task_completion_rate(completed, tasks_in_plan),
        },
        narrative,
    }))
}
