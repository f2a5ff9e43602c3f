use axum::{extract::State, Extension, Json};
use uuid::Uuid;
use validator::Validate;

use crate::auth::middleware::AuthUser;
use crate::error::{AppError, AppResult};
use crate::handlers::care_plans::fetch_active_plan;
use crate::models::profile::Profile;
use crate::models::reminder::{
    Reminder, ReminderKind, ReminderStatus, SendReminderRequest, SendReminderResponse,
};
use crate::services::reminder_email::{render, PlanDigest};
use crate::AppState;

const LIST_LIMIT: i64 = 50;

pub async fn send_reminder(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Json(body): Json<SendReminderRequest>,
) -> AppResult<Json<SendReminderResponse>> {
    body.validate()?;

    let profile = sqlx::query_as::<_, Profile>("SELECT * FROM profiles WHERE id = $1")
        .bind(auth_user.id)
        .fetch_optional(&state.db)
        .await?
        .ok_or(AppError::NotFound("Profile not found".into()))?;

    let to = profile
        .email
        .as_deref()
        .map(str::trim)
        .filter(|e| !e.is_empty())
        .ok_or(AppError::NotFound("No email address on profile".into()))?;

    let plan = match body.kind {
        ReminderKind::CareTasks => fetch_active_plan(&state, auth_user.id).await?,
        _ => None,
    };
    let digest = plan.as_ref().map(|p| PlanDigest { title: &p.title, tasks: &p.tasks.0 });

    let email = render(
        body.kind,
        profile.greeting_name(),
        digest,
        body.custom_message.as_deref(),
    );

    let email_id = state.mailer.send(to, &email.subject, &email.html).await?;

    sqlx::query(
        r#"
        INSERT INTO reminders (id, user_id, care_plan_id, title, message, channel, scheduled_at, sent_at, status)
        VALUES ($1, $2, $3, $4, $5, 'email', NOW(), NOW(), $6)
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(auth_user.id)
    .bind(plan.as_ref().map(|p| p.id))
    .bind(&email.subject)
    .bind(body.custom_message.as_deref().map(str::trim).filter(|m| !m.is_empty()))
    .bind(ReminderStatus::Sent)
    .execute(&state.db)
    .await?;

    tracing::info!(user_id = %auth_user.id, kind = ?body.kind, email_id = ?email_id, "Reminder sent");

    Ok(Json(SendReminderResponse { success: true, email_id }))
}

pub async fn list_reminders(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
) -> AppResult<Json<Vec<Reminder>>> {
    let reminders = sqlx::query_as::<_, Reminder>(
        r#"
        SELECT * FROM reminders
        WHERE user_id = $1
        ORDER BY created_at DESC
        LIMIT $2
        "#,
    )
    .bind(auth_user.id)
    .bind(LIST_LIMIT)
    .fetch_all(&state.db)
    .await?;

    Ok(Json(reminders))
}
