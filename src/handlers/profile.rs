use axum::{extract::State, Extension, Json};
use validator::Validate;

use crate::auth::middleware::AuthUser;
use crate::error::{AppError, AppResult};
use crate::models::profile::{Profile, UpsertProfileRequest};
use crate::AppState;

pub async fn get_profile(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
) -> AppResult<Json<Profile>> {
    let profile = sqlx::query_as::<_, Profile>("SELECT * FROM profiles WHERE id = $1")
        .bind(auth_user.id)
        .fetch_optional(&state.db)
        .await?
        .ok_or(AppError::NotFound("Profile not found".into()))?;

    Ok(Json(profile))
}

/// Create or update the caller's profile. The email always comes from the token.
pub async fn upsert_profile(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Json(body): Json<UpsertProfileRequest>,
) -> AppResult<Json<Profile>> {
    body.validate()?;

    let full_name = body.full_name.as_deref().map(str::trim).filter(|n| !n.is_empty());
    let phone = body.phone.as_deref().map(str::trim).filter(|p| !p.is_empty());

    let profile = sqlx::query_as::<_, Profile>(
        r#"
        INSERT INTO profiles (id, email, full_name, phone, notification_preferences)
        VALUES ($1, $2, $3, $4, $5)
        ON CONFLICT (id) DO UPDATE
            SET email = COALESCE(EXCLUDED.email, profiles.email),
                full_name = EXCLUDED.full_name,
                phone = EXCLUDED.phone,
                notification_preferences = COALESCE(EXCLUDED.notification_preferences, profiles.notification_preferences),
                updated_at = NOW()
        RETURNING *
        "#,
    )
    .bind(auth_user.id)
    .bind(auth_user.email.as_deref())
    .bind(full_name)
    .bind(phone)
    .bind(&body.notification_preferences)
    .fetch_one(&state.db)
    .await?;

    tracing::info!(user_id = %auth_user.id, "Profile saved");

    Ok(Json(profile))
}
