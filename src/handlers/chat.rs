use axum::{
    extract::State,
    response::{
        sse::{KeepAlive, Sse},
        IntoResponse, Response,
    },
    Extension, Json,
};
use serde::Deserialize;

use crate::auth::middleware::AuthUser;
use crate::error::{AppError, AppResult};
use crate::services::ai_gateway::{ChatMessage, Role};
use crate::services::crisis::{
    detect_crisis, latest_user_message, COMPANION_SYSTEM_PROMPT, CRISIS_HEADER,
};
use crate::services::sse::relay;
use crate::AppState;

const MAX_MESSAGES: usize = 100;

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub messages: Vec<ChatMessage>,
}

impl ChatRequest {
    fn check(&self) -> AppResult<()> {
        if self.messages.is_empty() {
            return Err(AppError::Validation("messages must not be empty".into()));
        }
        if self.messages.len() > MAX_MESSAGES {
            return Err(AppError::Validation(format!(
                "at most {} messages are allowed",
                MAX_MESSAGES
            )));
        }
        if self.messages.iter().any(|m| m.role == Role::System) {
            return Err(AppError::Validation("system messages are not accepted".into()));
        }
        Ok(())
    }
}

pub async fn chat(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Json(body): Json<ChatRequest>,
) -> AppResult<Response> {
    body.check()?;

    let crisis = latest_user_message(&body.messages)
        .map(|m| detect_crisis(&m.content))
        .unwrap_or(false);
    if crisis {
        tracing::warn!(user_id = %auth_user.id, "Crisis keywords detected in chat message");
    }

    let mut messages = Vec::with_capacity(body.messages.len() + 1);
    messages.push(ChatMessage::system(COMPANION_SYSTEM_PROMPT));
    messages.extend(body.messages);

    let upstream = state.ai.stream(&messages).await?;

    tracing::debug!(user_id = %auth_user.id, turns = messages.len() - 1, "Chat stream opened");

    let sse = Sse::new(relay(upstream, auth_user.id)).keep_alive(KeepAlive::default());
    let flag = if crisis { "true" } else { "false" };

    Ok(([(CRISIS_HEADER, flag)], sse).into_response())
}
