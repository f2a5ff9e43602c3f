use anyhow::Context;
use axum::{
    http::{header, HeaderName, HeaderValue, Method},
    middleware,
    routing::{delete, get, post},
    Router,
};
use sqlx::PgPool;
use std::sync::Arc;
use tower_http::compression::CompressionLayer;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

mod auth;
mod config;
mod db;
mod error;
mod handlers;
mod models;
mod services;
#[cfg(test)]
mod test_support;

use auth::rate_limit::RateLimitState;
use config::Config;
use services::ai_gateway::AiGateway;
use services::crisis::CRISIS_HEADER;
use services::mailer::Mailer;

#[derive(Clone)]
pub struct AppState {
    pub db: PgPool,
    pub config: Arc<Config>,
    pub ai: Arc<AiGateway>,
    pub mailer: Arc<Mailer>,
    pub rate_limiter: RateLimitState,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "mindfulcare_api=debug,tower_http=debug".into()),
        )
        .json()
        .init();

    let config = Arc::new(Config::from_env()?);

    let db = db::create_pool(&config.database_url)
        .await
        .context("Failed to connect to database")?;

    sqlx::migrate!("./migrations")
        .run(&db)
        .await
        .context("Failed to run database migrations")?;

    tracing::info!("Database migrations applied");

    let ai = AiGateway::from_config(&config)?;
    if !ai.is_configured() {
        tracing::warn!("AI_GATEWAY_API_KEY is not set; AI-backed routes will fail");
    }
    let mailer = Mailer::from_config(&config)?;
    if !mailer.is_configured() {
        tracing::warn!("EMAIL_API_KEY is not set; reminders are disabled");
    }

    let rate_limiter = RateLimitState::new();
    rate_limiter.spawn_cleanup_worker();

    let state = AppState {
        db,
        config: config.clone(),
        ai: Arc::new(ai),
        mailer: Arc::new(mailer),
        rate_limiter,
    };

    let app = build_router(state);

    let addr = config.listen_addr();
    tracing::info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    axum::serve(listener, app).await?;

    Ok(())
}

fn build_router(state: AppState) -> Router {
    let public_routes = Router::new()
        .route("/health", get(handlers::health::health_check))
        .route("/readyz", get(handlers::health::readyz))
        .route("/api/resources/crisis", get(handlers::resources::crisis_resources))
        .route("/api/resources/breathing", get(handlers::resources::breathing_exercise));

    // Routes that call the AI gateway get a per-user budget on top of auth.
    let ai_routes = Router::new()
        .route("/api/chat", post(handlers::chat::chat))
        .route("/api/care-plan/generate", post(handlers::care_plans::generate_care_plan))
        .route("/api/insights/mood", get(handlers::insights::get_mood_insight))
        .route("/api/reports/progress", get(handlers::reports::progress_report))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth::rate_limit::rate_limit_ai,
        ));

    let protected_routes = Router::new()
        .route(
            "/api/me",
            get(handlers::profile::get_profile).put(handlers::profile::upsert_profile),
        )
        // Mood
        .route(
            "/api/mood-entries",
            get(handlers::mood_entries::list_moods).post(handlers::mood_entries::log_mood),
        )
        .route("/api/mood-entries/stats", get(handlers::mood_entries::mood_stats))
        // Care plans
        .route("/api/care-plan", get(handlers::care_plans::get_active_care_plan))
        .route("/api/care-plan/history", get(handlers::care_plans::care_plan_history))
        .route(
            "/api/care-plan/tasks/:task_id/toggle",
            post(handlers::care_plans::toggle_task),
        )
        // Sessions
        .route(
            "/api/sessions",
            get(handlers::sessions::list_sessions).post(handlers::sessions::create_session),
        )
        .route("/api/sessions/:id", delete(handlers::sessions::delete_session))
        // Reminders
        .route(
            "/api/reminders",
            get(handlers::reminders::list_reminders).post(handlers::reminders::send_reminder),
        )
        .merge(ai_routes)
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth::middleware::require_auth,
        ));

    let mut allowed_origins = Vec::new();
    for origin in state.config.allowed_origins() {
        match origin.parse::<HeaderValue>() {
            Ok(value) => allowed_origins.push(value),
            Err(_) => tracing::warn!(origin = %origin, "Ignoring invalid CORS origin"),
        }
    }

    let cors = CorsLayer::new()
        .allow_origin(allowed_origins)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE, header::ACCEPT])
        .expose_headers([HeaderName::from_static(CRISIS_HEADER)])
        .allow_credentials(true);

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .layer(cors)
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
