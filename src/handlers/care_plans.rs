use axum::{
    extract::{Path, State},
    Extension, Json,
};
use chrono::Utc;
use sqlx::types::Json as SqlJson;
use uuid::Uuid;

use crate::auth::middleware::AuthUser;
use crate::error::{AppError, AppResult};
use crate::handlers::extract::JsonOrDefault;
use crate::models::care_plan::{
    ActiveCarePlan, CarePlan, GenerateCarePlanRequest, GenerateCarePlanResponse, TaskCompletion,
    ToggleTaskRequest, ToggleTaskResponse,
};
use crate::models::mood_entry::MoodEntry;
use crate::models::session_summary::SessionSummary;
use crate::services::care_plan::{
    care_plan_tool, CarePlanContext, CarePlanDraft, CONTEXT_MOOD_ENTRIES, CONTEXT_SESSIONS,
};
use crate::AppState;

const HISTORY_LIMIT: i64 = 20;

pub async fn generate_care_plan(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    JsonOrDefault(body): JsonOrDefault<GenerateCarePlanRequest>,
) -> AppResult<Json<GenerateCarePlanResponse>> {
    let moods = sqlx::query_as::<_, MoodEntry>(
        r#"
        SELECT * FROM mood_entries
        WHERE user_id = $1
        ORDER BY logged_at DESC
        LIMIT $2
        "#,
    )
    .bind(auth_user.id)
    .bind(CONTEXT_MOOD_ENTRIES)
    .fetch_all(&state.db)
    .await?;

    let sessions = sqlx::query_as::<_, SessionSummary>(
        r#"
        SELECT * FROM session_summaries
        WHERE user_id = $1
        ORDER BY session_date DESC, created_at DESC
        LIMIT $2
        "#,
    )
    .bind(auth_user.id)
    .bind(CONTEXT_SESSIONS)
    .fetch_all(&state.db)
    .await?;

    let context = CarePlanContext {
        moods: &moods,
        sessions: &sessions,
        session_notes: body.session_notes.as_deref(),
    };

    let draft: CarePlanDraft = state
        .ai
        .call_tool(&context.messages(), &care_plan_tool())
        .await?;
    let draft = draft.validate()?;

    // Only one active plan per user; a concurrent generate fails on the unique index.
    let mut tx = state.db.begin().await?;

    sqlx::query("UPDATE care_plans SET is_active = FALSE WHERE user_id = $1 AND is_active = TRUE")
        .bind(auth_user.id)
        .execute(&mut *tx)
        .await?;

    let plan = sqlx::query_as::<_, CarePlan>(
        r#"
        INSERT INTO care_plans (id, user_id, title, description, tasks, is_active, generated_at)
        VALUES ($1, $2, $3, $4, $5, TRUE, NOW())
        RETURNING *
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(auth_user.id)
    .bind(draft.title.trim())
    .bind(Some(draft.description.trim()).filter(|d| !d.is_empty()))
    .bind(SqlJson(&draft.tasks))
    .fetch_one(&mut *tx)
    .await?;

    tx.commit().await?;

    tracing::info!(
        user_id = %auth_user.id,
        care_plan_id = %plan.id,
        tasks = plan.tasks.0.len(),
        mood_entries = moods.len(),
        sessions = sessions.len(),
        "Care plan generated"
    );

    Ok(Json(GenerateCarePlanResponse { success: true, care_plan: plan }))
}

pub async fn get_active_care_plan(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
) -> AppResult<Json<Option<ActiveCarePlan>>> {
    let Some(plan) = fetch_active_plan(&state, auth_user.id).await? else {
        return Ok(Json(None));
    };

    let completions = sqlx::query_as::<_, TaskCompletion>(
        r#"
        SELECT * FROM care_task_completions
        WHERE care_plan_id = $1 AND user_id = $2 AND completed_on = $3
        ORDER BY completed_at
        "#,
    )
    .bind(plan.id)
    .bind(auth_user.id)
    .bind(Utc::now().date_naive())
    .fetch_all(&state.db)
    .await?;

    Ok(Json(Some(ActiveCarePlan { plan, completions })))
}

pub async fn toggle_task(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Path(task_id): Path<String>,
    JsonOrDefault(body): JsonOrDefault<ToggleTaskRequest>,
) -> AppResult<Json<ToggleTaskResponse>> {
    let today = Utc::now().date_naive();
    let date = body.date.unwrap_or(today);
    if (date - today).num_days().abs() > 1 {
        return Err(AppError::Validation(
            "date must be within ±1 day of today".into(),
        ));
    }

    let plan = fetch_active_plan(&state, auth_user.id)
        .await?
        .ok_or(AppError::NotFound("No active care plan".into()))?;

    if !plan.has_task(&task_id) {
        return Err(AppError::NotFound("Task not found in care plan".into()));
    }

    let removed = sqlx::query(
        r#"
        DELETE FROM care_task_completions
        WHERE care_plan_id = $1 AND task_id = $2 AND completed_on = $3 AND user_id = $4
        "#,
    )
    .bind(plan.id)
    .bind(&task_id)
    .bind(date)
    .bind(auth_user.id)
    .execute(&state.db)
    .await?;

    let completed = if removed.rows_affected() > 0 {
        false
    } else {
        sqlx::query(
            r#"
            INSERT INTO care_task_completions (id, user_id, care_plan_id, task_id, completed_on, completed_at)
            VALUES ($1, $2, $3, $4, $5, NOW())
            ON CONFLICT (care_plan_id, task_id, completed_on) DO NOTHING
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(auth_user.id)
        .bind(plan.id)
        .bind(&task_id)
        .bind(date)
        .execute(&state.db)
        .await?;
        true
    };

    tracing::debug!(
        user_id = %auth_user.id,
        care_plan_id = %plan.id,
        task_id = %task_id,
        date = %date,
        completed = completed,
        "Care task toggled"
    );

    Ok(Json(ToggleTaskResponse { task_id, date, completed }))
}

pub async fn care_plan_history(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
) -> AppResult<Json<Vec<CarePlan>>> {
    let plans = sqlx::query_as::<_, CarePlan>(
        r#"
        SELECT * FROM care_plans
        WHERE user_id = $1 AND is_active = FALSE
        ORDER BY generated_at DESC
        LIMIT $2
        "#,
    )
    .bind(auth_user.id)
    .bind(HISTORY_LIMIT)
    .fetch_all(&state.db)
    .await?;

    Ok(Json(plans))
}

pub(crate) async fn fetch_active_plan(
    state: &AppState,
    user_id: Uuid,
) -> Result<Option<CarePlan>, sqlx::Error> {
    sqlx::query_as::<_, CarePlan>(
        r#"
        SELECT * FROM care_plans
        WHERE user_id = $1 AND is_active = TRUE
        ORDER BY generated_at DESC
        LIMIT 1
        "#,
    )
    .bind(user_id)
    .fetch_optional(&state.db)
    .await
}

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;
    use serde_json::{json, Value};
    use sqlx::PgPool;
    use tower::ServiceExt;
    use uuid::Uuid;
    use wiremock::matchers::method;
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use crate::build_router;
    use crate::config::Config;
    use crate::test_support::{
        authed, config_with_gateway, json_body, state_with_pool, token_for, tool_call_reply,
    };

    fn plan_arguments(title: &str) -> Value {
        json!({
            "title": title,
            "description": "Small steps for today",
            "tasks": [
                { "id": "walk", "title": "Walk", "description": "Ten minutes outside", "category": "exercise", "time": "8:00 AM" },
                { "id": "breathe", "title": "Breathe", "description": "Box breathing", "category": "mindfulness" },
            ],
        })
    }

    async fn gateway_with_plan(arguments: &Value) -> MockServer {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(tool_call_reply("create_care_plan", arguments)),
            )
            .mount(&server)
            .await;
        server
    }

    async fn count_plans(pool: &PgPool, user_id: Uuid, active_only: bool) -> i64 {
        sqlx::query_scalar(
            "SELECT COUNT(*) FROM care_plans WHERE user_id = $1 AND (is_active OR NOT $2)",
        )
        .bind(user_id)
        .bind(active_only)
        .fetch_one(pool)
        .await
        .unwrap()
    }

    async fn insert_active_plan(pool: &PgPool, user_id: Uuid) -> Uuid {
        let id = Uuid::new_v4();
        sqlx::query(
            "INSERT INTO care_plans (id, user_id, title, tasks, is_active) VALUES ($1, $2, 'Today', $3, TRUE)",
        )
        .bind(id)
        .bind(user_id)
        .bind(json!([
            { "id": "walk", "title": "Walk", "description": "Ten minutes outside", "category": "exercise" },
        ]))
        .execute(pool)
        .await
        .unwrap();
        id
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn test_generate_leaves_exactly_one_active_plan(pool: PgPool) {
        let user_id = Uuid::new_v4();
        let server = gateway_with_plan(&plan_arguments("Gentle start")).await;
        let app = build_router(state_with_pool(pool.clone(), config_with_gateway(&server)));
        let token = token_for(user_id);

        for _ in 0..2 {
            let response = app
                .clone()
                .oneshot(authed("POST", "/api/care-plan/generate", &token, None))
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::OK);
            let body = json_body(response).await;
            assert_eq!(body["success"], true);
            assert_eq!(body["care_plan"]["tasks"].as_array().unwrap().len(), 2);
        }

        assert_eq!(count_plans(&pool, user_id, true).await, 1);
        assert_eq!(count_plans(&pool, user_id, false).await, 2);

        let history = app
            .oneshot(authed("GET", "/api/care-plan/history", &token, None))
            .await
            .unwrap();
        let history = json_body(history).await;
        assert_eq!(history.as_array().unwrap().len(), 1);
        assert_eq!(history[0]["is_active"], false);
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn test_generate_prompt_reflects_available_context(pool: PgPool) {
        let user_id = Uuid::new_v4();
        let server = gateway_with_plan(&plan_arguments("Gentle start")).await;
        let app = build_router(state_with_pool(pool, config_with_gateway(&server)));

        let response = app
            .oneshot(authed(
                "POST",
                "/api/care-plan/generate",
                &token_for(user_id),
                Some(json!({ "session_notes": "Sleep has been rough" })),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let requests = server.received_requests().await.unwrap();
        assert_eq!(requests.len(), 1);
        let sent: Value = serde_json::from_slice(&requests[0].body).unwrap();
        let prompt = sent["messages"][1]["content"].as_str().unwrap();
        assert!(!prompt.contains("Recent mood average"));
        assert!(prompt.contains("Additional notes from user: Sleep has been rough"));
        assert_eq!(sent["tool_choice"]["function"]["name"], "create_care_plan");
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn test_malformed_plan_is_a_server_error_and_stores_nothing(pool: PgPool) {
        let user_id = Uuid::new_v4();
        let mut arguments = plan_arguments("Gentle start");
        arguments["tasks"][1]["id"] = json!("walk");
        let server = gateway_with_plan(&arguments).await;
        let app = build_router(state_with_pool(pool.clone(), config_with_gateway(&server)));
        let token = token_for(user_id);

        let duplicate = app
            .clone()
            .oneshot(authed("POST", "/api/care-plan/generate", &token, None))
            .await
            .unwrap();
        assert_eq!(duplicate.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let no_tool_call = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "choices": [{ "message": { "role": "assistant", "content": "Here is a plan" } }]
            })))
            .mount(&no_tool_call)
            .await;
        let app = build_router(state_with_pool(pool.clone(), config_with_gateway(&no_tool_call)));
        let missing = app
            .oneshot(authed("POST", "/api/care-plan/generate", &token, None))
            .await
            .unwrap();
        assert_eq!(missing.status(), StatusCode::INTERNAL_SERVER_ERROR);

        assert_eq!(count_plans(&pool, user_id, false).await, 0);
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn test_generate_passes_gateway_limits_through(pool: PgPool) {
        let user_id = Uuid::new_v4();
        for (upstream, expected) in [
            (429, StatusCode::TOO_MANY_REQUESTS),
            (402, StatusCode::PAYMENT_REQUIRED),
        ] {
            let server = MockServer::start().await;
            Mock::given(method("POST"))
                .respond_with(ResponseTemplate::new(upstream))
                .mount(&server)
                .await;
            let app = build_router(state_with_pool(pool.clone(), config_with_gateway(&server)));

            let response = app
                .oneshot(authed("POST", "/api/care-plan/generate", &token_for(user_id), None))
                .await
                .unwrap();
            assert_eq!(response.status(), expected);
        }
        assert_eq!(count_plans(&pool, user_id, false).await, 0);
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn test_toggle_twice_restores_original_state(pool: PgPool) {
        let user_id = Uuid::new_v4();
        let plan_id = insert_active_plan(&pool, user_id).await;
        let app = build_router(state_with_pool(pool.clone(), Config::for_tests()));
        let token = token_for(user_id);

        let first = app
            .clone()
            .oneshot(authed("POST", "/api/care-plan/tasks/walk/toggle", &token, None))
            .await
            .unwrap();
        let first = json_body(first).await;
        assert_eq!(first["completed"], true);
        assert_eq!(first["task_id"], "walk");

        let active = app
            .clone()
            .oneshot(authed("GET", "/api/care-plan", &token, None))
            .await
            .unwrap();
        let active = json_body(active).await;
        assert_eq!(active["id"], plan_id.to_string());
        assert_eq!(active["completions"].as_array().unwrap().len(), 1);

        let second = app
            .oneshot(authed("POST", "/api/care-plan/tasks/walk/toggle", &token, None))
            .await
            .unwrap();
        assert_eq!(json_body(second).await["completed"], false);

        let remaining: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM care_task_completions WHERE care_plan_id = $1")
                .bind(plan_id)
                .fetch_one(&pool)
                .await
                .unwrap();
        assert_eq!(remaining, 0);
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn test_toggle_unknown_task_or_missing_plan_is_not_found(pool: PgPool) {
        let user_id = Uuid::new_v4();
        let app = build_router(state_with_pool(pool.clone(), Config::for_tests()));
        let token = token_for(user_id);

        let no_plan = app
            .clone()
            .oneshot(authed("POST", "/api/care-plan/tasks/walk/toggle", &token, None))
            .await
            .unwrap();
        assert_eq!(no_plan.status(), StatusCode::NOT_FOUND);

        insert_active_plan(&pool, user_id).await;
        let unknown = app
            .oneshot(authed("POST", "/api/care-plan/tasks/swim/toggle", &token, None))
            .await
            .unwrap();
        assert_eq!(unknown.status(), StatusCode::NOT_FOUND);
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn test_no_active_plan_is_null(pool: PgPool) {
        let app = build_router(state_with_pool(pool, Config::for_tests()));

        let response = app
            .oneshot(authed("GET", "/api/care-plan", &token_for(Uuid::new_v4()), None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json_body(response).await, Value::Null);
    }
}
