use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::config::Config;
use crate::error::{AppError, AppResult};

#[derive(Debug, Serialize)]
struct OutgoingEmail<'a> {
    from: &'a str,
    to: [&'a str; 1],
    subject: &'a str,
    html: &'a str,
}

#[derive(Debug, Deserialize)]
struct SendReply {
    id: Option<String>,
    message: Option<String>,
}

/// Transactional email API client (Resend-compatible).
pub struct Mailer {
    client: reqwest::Client,
    url: String,
    api_key: Option<String>,
    from: String,
}

impl Mailer {
    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()?;

        Ok(Self {
            client,
            url: config.email_api_url.clone(),
            api_key: config.email_api_key.clone(),
            from: config.email_from.clone(),
        })
    }

    pub fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }

    /// Send one HTML email; returns the provider's message id when it reports one.
    pub async fn send(&self, to: &str, subject: &str, html: &str) -> AppResult<Option<String>> {
        let api_key = self.api_key.as_deref().ok_or_else(|| {
            AppError::Upstream(
                "EMAIL_API_KEY is not configured. Please add it to enable email reminders.".into(),
            )
        })?;

        let response = self
            .client
            .post(&self.url)
            .bearer_auth(api_key)
            .json(&OutgoingEmail { from: &self.from, to: [to], subject, html })
            .send()
            .await
            .map_err(|e| {
                tracing::error!(error = %e, "Email API request failed");
                AppError::Upstream("Failed to send email".into())
            })?;

        let status = response.status();
        let reply: SendReply = response.json().await.unwrap_or(SendReply { id: None, message: None });

        if !status.is_success() {
            tracing::error!(status = status.as_u16(), message = ?reply.message, "Email send error");
            return Err(AppError::Upstream(
                reply.message.unwrap_or_else(|| "Failed to send email".into()),
            ));
        }

        if reply.id.is_none() {
            tracing::warn!(status = status.as_u16(), "Email accepted without a message id");
        }
        Ok(reply.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, header, method};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn mailer(server: &MockServer) -> Mailer {
        let mut config = Config::for_tests();
        config.email_api_url = format!("{}/emails", server.uri());
        config.email_api_key = Some("re_test".into());
        Mailer::from_config(&config).unwrap()
    }

    #[tokio::test]
    async fn test_send_returns_email_id() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(header("authorization", "Bearer re_test"))
            .and(body_partial_json(json!({
                "from": "MindfulCare <test@example.com>",
                "to": ["a@b.com"],
                "subject": "Hello",
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "id": "email_123" })))
            .mount(&server)
            .await;

        let id = mailer(&server).send("a@b.com", "Hello", "<p>Hi</p>").await.unwrap();
        assert_eq!(id.as_deref(), Some("email_123"));
    }

    #[tokio::test]
    async fn test_accepted_send_without_id_still_succeeds() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
            .mount(&server)
            .await;

        let id = mailer(&server).send("a@b.com", "Hello", "<p>Hi</p>").await.unwrap();
        assert_eq!(id, None);
    }

    #[tokio::test]
    async fn test_provider_error_message_is_surfaced() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(422).set_body_json(json!({ "message": "Invalid `to` field" })),
            )
            .mount(&server)
            .await;

        match mailer(&server).send("nope", "Hello", "<p>Hi</p>").await {
            Err(AppError::Upstream(msg)) => assert_eq!(msg, "Invalid `to` field"),
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_missing_key_is_reported() {
        let mailer = Mailer::from_config(&Config::for_tests()).unwrap();
        assert!(matches!(
            mailer.send("a@b.com", "s", "h").await,
            Err(AppError::Upstream(_))
        ));
    }
}
