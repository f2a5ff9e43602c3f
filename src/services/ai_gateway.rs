//! Client for the OpenAI-compatible chat-completion gateway.
//!
//! Three call shapes are used: plain completions, forced function calls and
//! streaming. Gateway 429 and 402 replies are surfaced as their own errors so
//! handlers can pass them straight to the caller.

use std::time::Duration;

use bytes::Bytes;
use futures_util::stream::BoxStream;
use futures_util::StreamExt;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::config::Config;
use crate::error::{AppError, AppResult};

const REQUEST_TIMEOUT_SECS: u64 = 30;
const CONNECT_TIMEOUT_SECS: u64 = 10;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self { role: Role::System, content: content.into() }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self { role: Role::User, content: content.into() }
    }
}

/// A function tool the model is forced to call.
#[derive(Debug, Clone)]
pub struct ToolSpec {
    pub name: &'static str,
    pub description: &'static str,
    pub parameters: Value,
}

pub struct AiGateway {
    client: reqwest::Client,
    url: String,
    api_key: Option<String>,
    model: String,
}

impl AiGateway {
    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS))
            .build()?;

        Ok(Self {
            client,
            url: config.ai_gateway_url.clone(),
            api_key: config.ai_gateway_api_key.clone(),
            model: config.ai_model.clone(),
        })
    }

    pub fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }

    /// Plain completion; returns the first choice's message content.
    pub async fn complete(
        &self,
        messages: &[ChatMessage],
        temperature: Option<f64>,
    ) -> AppResult<String> {
        let mut body = json!({
            "model": self.model,
            "messages": messages,
        });
        if let Some(t) = temperature {
            body["temperature"] = json!(t);
        }

        let response = self.send(&body, true).await?;
        let value: Value = response
            .json()
            .await
            .map_err(|e| AppError::MalformedUpstream(format!("invalid JSON body: {}", e)))?;

        Ok(value["choices"][0]["message"]["content"]
            .as_str()
            .unwrap_or_default()
            .to_string())
    }

    /// Forced function call; decodes the first tool call's arguments into `T`.
    pub async fn call_tool<T: DeserializeOwned>(
        &self,
        messages: &[ChatMessage],
        tool: &ToolSpec,
    ) -> AppResult<T> {
        let body = json!({
            "model": self.model,
            "messages": messages,
            "tools": [{
                "type": "function",
                "function": {
                    "name": tool.name,
                    "description": tool.description,
                    "parameters": tool.parameters,
                }
            }],
            "tool_choice": { "type": "function", "function": { "name": tool.name } },
        });

        let response = self.send(&body, true).await?;
        let value: Value = response
            .json()
            .await
            .map_err(|e| AppError::MalformedUpstream(format!("invalid JSON body: {}", e)))?;

        parse_tool_arguments(&value)
    }

    /// Streaming completion; returns the raw SSE byte stream.
    pub async fn stream(
        &self,
        messages: &[ChatMessage],
    ) -> AppResult<BoxStream<'static, Result<Bytes, reqwest::Error>>> {
        let body = json!({
            "model": self.model,
            "messages": messages,
            "stream": true,
        });

        let response = self.send(&body, false).await?;
        Ok(response.bytes_stream().boxed())
    }

    async fn send(&self, body: &Value, bounded: bool) -> AppResult<reqwest::Response> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or_else(|| AppError::Upstream("AI gateway API key is not configured".into()))?;

        let mut request = self.client.post(&self.url).bearer_auth(api_key).json(body);
        if bounded {
            request = request.timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS));
        }

        let response = request.send().await.map_err(|e| {
            tracing::error!(error = %e, "AI gateway request failed");
            AppError::Upstream("AI gateway request failed".into())
        })?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let text = response.text().await.unwrap_or_default();
        tracing::error!(status = status.as_u16(), body = %text, "AI gateway error");
        Err(map_gateway_status(status.as_u16()))
    }
}

fn map_gateway_status(status: u16) -> AppError {
    match status {
        429 => AppError::UpstreamRateLimited,
        402 => AppError::UpstreamQuotaExhausted,
        other => AppError::Upstream(format!("AI API error: {}", other)),
    }
}

fn parse_tool_arguments<T: DeserializeOwned>(value: &Value) -> AppResult<T> {
    let arguments = value["choices"][0]["message"]["tool_calls"][0]["function"]["arguments"]
        .as_str()
        .ok_or_else(|| AppError::MalformedUpstream("No tool call in AI response".into()))?;

    serde_json::from_str(arguments)
        .map_err(|e| AppError::MalformedUpstream(format!("tool arguments do not match schema: {}", e)))
}
