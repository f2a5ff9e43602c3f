use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
    Extension,
};
use std::{
    collections::HashMap,
    sync::Arc,
    time::{Duration, Instant},
};
use tokio::sync::Mutex;

use crate::auth::middleware::AuthUser;
use crate::error::AppError;
use crate::AppState;

/// Window used for per-user AI request budgets.
pub const AI_WINDOW_SECS: u64 = 60;

/// How often expired windows are swept.
pub const CLEANUP_INTERVAL_SECS: u64 = 300;

/// In-memory fixed-window limiter (single-instance deployments).
#[derive(Clone, Default)]
pub struct RateLimitState {
    entries: Arc<Mutex<HashMap<String, RateLimitEntry>>>,
}

struct RateLimitEntry {
    count: u32,
    window_start: Instant,
}

impl RateLimitState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns Ok(remaining) or Err(retry_after) once the key is over its budget.
    pub async fn check_with_limits(
        &self,
        key: &str,
        max_requests: u32,
        window_secs: u64,
    ) -> Result<u32, Duration> {
        let mut entries = self.entries.lock().await;
        let now = Instant::now();
        let window = Duration::from_secs(window_secs);

        let entry = entries.entry(key.to_string()).or_insert(RateLimitEntry {
            count: 0,
            window_start: now,
        });

        if now.duration_since(entry.window_start) > window {
            entry.count = 0;
            entry.window_start = now;
        }

        if entry.count >= max_requests {
            let retry_after = window.saturating_sub(now.duration_since(entry.window_start));
            return Err(retry_after);
        }

        entry.count += 1;
        Ok(max_requests - entry.count)
    }

    /// Drop entries whose window ended more than one window ago.
    pub async fn cleanup(&self, window_secs: u64) {
        let mut entries = self.entries.lock().await;
        let now = Instant::now();
        let keep_for = Duration::from_secs(window_secs * 2);

        entries.retain(|_, entry| now.duration_since(entry.window_start) < keep_for);
    }

    pub async fn len(&self) -> usize {
        self.entries.lock().await.len()
    }

    pub fn spawn_cleanup_worker(&self) {
        let limiter = self.clone();
        tokio::spawn(async move {
            let mut interval =
                tokio::time::interval(Duration::from_secs(CLEANUP_INTERVAL_SECS));
            loop {
                interval.tick().await;
                limiter.cleanup(AI_WINDOW_SECS).await;
                let tracked = limiter.len().await;
                tracing::debug!(tracked_keys = tracked, "Rate limiter swept");
            }
        });
    }
}

/// Per-user budget for routes that call the AI gateway. Runs after `require_auth`.
pub async fn rate_limit_ai(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let path = req.uri().path().to_string();
    let key = format!("ai:{}", auth_user.id);

    match state
        .rate_limiter
        .check_with_limits(&key, state.config.ai_requests_per_minute, AI_WINDOW_SECS)
        .await
    {
        Ok(remaining) => {
            tracing::debug!(user_id = %auth_user.id, path = %path, remaining = remaining, "AI rate limit check passed");
            Ok(next.run(req).await)
        }
        Err(retry_after) => {
            tracing::warn!(
                user_id = %auth_user.id,
                path = %path,
                retry_after_secs = retry_after.as_secs(),
                "AI rate limit exceeded"
            );
            Err(AppError::RateLimited)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MAX: u32 = 3;

    #[tokio::test]
    async fn test_rate_limit_allows_under_limit() {
        let limiter = RateLimitState::new();

        for i in 0..MAX {
            let result = limiter.check_with_limits("ai:user", MAX, AI_WINDOW_SECS).await;
            assert!(result.is_ok(), "Request {} should be allowed", i + 1);
        }
    }

    #[tokio::test]
    async fn test_rate_limit_blocks_over_limit() {
        let limiter = RateLimitState::new();

        for _ in 0..MAX {
            let _ = limiter.check_with_limits("ai:user", MAX, AI_WINDOW_SECS).await;
        }

        let result = limiter.check_with_limits("ai:user", MAX, AI_WINDOW_SECS).await;
        assert!(result.is_err(), "Request over limit should be blocked");
    }

    #[tokio::test]
    async fn test_remaining_counts_down() {
        let limiter = RateLimitState::new();
        assert_eq!(limiter.check_with_limits("k", MAX, AI_WINDOW_SECS).await, Ok(2));
        assert_eq!(limiter.check_with_limits("k", MAX, AI_WINDOW_SECS).await, Ok(1));
        assert_eq!(limiter.check_with_limits("k", MAX, AI_WINDOW_SECS).await, Ok(0));
    }

    #[tokio::test]
    async fn test_different_users_have_separate_limits() {
        let limiter = RateLimitState::new();

        for _ in 0..MAX {
            let _ = limiter.check_with_limits("ai:user-1", MAX, AI_WINDOW_SECS).await;
        }

        let result = limiter.check_with_limits("ai:user-2", MAX, AI_WINDOW_SECS).await;
        assert!(result.is_ok(), "Different user should have separate limit");
    }

    #[tokio::test]
    async fn test_cleanup_keeps_fresh_entries() {
        let limiter = RateLimitState::new();
        let _ = limiter.check_with_limits("ai:user", MAX, AI_WINDOW_SECS).await;

        limiter.cleanup(AI_WINDOW_SECS).await;
        assert_eq!(limiter.len().await, 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_cleanup_worker_sweeps_on_another_thread() {
        let limiter = RateLimitState::new();
        let _ = limiter.check_with_limits("ai:user", MAX, AI_WINDOW_SECS).await;

        limiter.spawn_cleanup_worker();
        // The first interval tick fires immediately; fresh windows survive it.
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(limiter.len().await, 1);
    }
}
