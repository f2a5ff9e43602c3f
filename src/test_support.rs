//! Shared helpers for router-level tests.

use std::sync::Arc;

use axum::body::Body;
use axum::http::Request;
use axum::response::Response;
use http_body_util::BodyExt;
use serde_json::{json, Value};
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use uuid::Uuid;
use wiremock::MockServer;

use crate::auth::jwt::mint_test_token;
use crate::auth::rate_limit::RateLimitState;
use crate::config::Config;
use crate::services::ai_gateway::AiGateway;
use crate::services::mailer::Mailer;
use crate::AppState;

pub fn state_with_pool(db: PgPool, config: Config) -> AppState {
    AppState {
        db,
        ai: Arc::new(AiGateway::from_config(&config).unwrap()),
        mailer: Arc::new(Mailer::from_config(&config).unwrap()),
        config: Arc::new(config),
        rate_limiter: RateLimitState::new(),
    }
}

/// State over a pool that never connects; fine for paths that stop before SQL.
pub fn lazy_state(config: Config) -> AppState {
    let db = PgPoolOptions::new()
        .connect_lazy(&config.database_url)
        .unwrap();
    state_with_pool(db, config)
}

pub fn config_with_gateway(server: &MockServer) -> Config {
    let mut config = Config::for_tests();
    config.ai_gateway_url = format!("{}/v1/chat/completions", server.uri());
    config
}

pub fn token_for(user_id: Uuid) -> String {
    mint_test_token(user_id, Some("user@example.com"), &Config::for_tests())
}

pub fn authed(method: &str, uri: &str, token: &str, body: Option<Value>) -> Request<Body> {
    let builder = Request::builder()
        .method(method)
        .uri(uri)
        .header("authorization", format!("Bearer {}", token));
    match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

pub async fn json_body(response: Response) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

/// Gateway reply carrying a forced function call.
pub fn tool_call_reply(name: &str, arguments: &Value) -> Value {
    json!({
        "choices": [{
            "message": {
                "role": "assistant",
                "tool_calls": [{
                    "id": "call_1",
                    "type": "function",
                    "function": { "name": name, "arguments": arguments.to_string() }
                }]
            }
        }]
    })
}

/// Gateway reply carrying plain assistant text.
pub fn text_reply(content: &str) -> Value {
    json!({
        "choices": [{ "message": { "role": "assistant", "content": content } }]
    })
}
