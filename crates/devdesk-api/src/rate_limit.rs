//! Per-second request throttling for the authenticated routes.
//!
//! A single fixed window covers the whole service: requests past the
//! configured budget within the current second get a 429 through
//! [`ApiError`]. The budget comes from `general.rate_limit_per_sec`.

use std::sync::{Arc, Mutex};
use std::time::{SystemTime, UNIX_EPOCH};

use axum::extract::{Extension, Request};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};

use crate::error::ApiError;

#[derive(Debug, Default)]
struct Window {
    /// Epoch second this window covers.
    second: u64,
    /// Requests admitted within it.
    used: u64,
}

/// Service-wide fixed-window request limiter.
#[derive(Clone)]
pub struct RateLimiter {
    limit: u64,
    window: Arc<Mutex<Window>>,
}

impl RateLimiter {
    pub fn new(limit: u64) -> Self {
        Self {
            limit,
            window: Arc::new(Mutex::new(Window::default())),
        }
    }

    /// Admit a request if the current second still has budget.
    fn allow(&self) -> bool {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs();

        let Ok(mut window) = self.window.lock() else {
            // A poisoned limiter must not take the API down with it.
            return true;
        };

        if window.second != now {
            window.second = now;
            window.used = 0;
        }
        if window.used < self.limit {
            window.used += 1;
            true
        } else {
            false
        }
    }
}

/// Axum middleware enforcing the request budget.
pub async fn rate_limit_middleware(
    Extension(limiter): Extension<RateLimiter>,
    req: Request,
    next: Next,
) -> Response {
    if limiter.allow() {
        next.run(req).await
    } else {
        ApiError::TooManyRequests("Rate limit exceeded".to_string()).into_response()
    }
}
