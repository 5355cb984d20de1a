//! API Middleware (Auth, Rate Limiting, Logging)

use axum::{
    extract::Request,
    http::{HeaderMap, HeaderValue, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use dashmap::DashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

use super::types::{ApiError, ApiResponse};

/// Rate limiter configuration
pub struct RateLimitConfig {
    /// Requests per window
    pub requests_per_window: u32,
    /// Window duration
    pub window_duration: Duration,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            requests_per_window: 100,
            window_duration: Duration::from_secs(60),
        }
    }
}

/// In-memory fixed-window rate limiter keyed by API key or client IP
pub struct RateLimiter {
    requests: DashMap<String, (u32, Instant)>,
    config: RateLimitConfig,
}

impl RateLimiter {
    pub fn new(config: RateLimitConfig) -> Self {
        Self {
            requests: DashMap::new(),
            config,
        }
    }

    /// Check if request is allowed, returns (allowed, remaining, reset_seconds)
    pub fn check(&self, key: &str) -> (bool, u32, u64) {
        let now = Instant::now();

        let mut entry = self.requests.entry(key.to_string()).or_insert((0, now));

        // Reset window if expired
        if now.duration_since(entry.1) > self.config.window_duration {
            entry.0 = 0;
            entry.1 = now;
        }

        let reset_secs = self
            .config
            .window_duration
            .saturating_sub(now.duration_since(entry.1))
            .as_secs();

        if entry.0 >= self.config.requests_per_window {
            return (false, 0, reset_secs);
        }

        entry.0 += 1;
        (
            true,
            self.config.requests_per_window.saturating_sub(entry.0),
            reset_secs,
        )
    }

    /// Drop windows idle for two full periods; returns how many were removed
    pub fn cleanup(&self) -> usize {
        let now = Instant::now();
        let before = self.requests.len();
        self.requests.retain(|_, (_, timestamp)| {
            now.duration_since(*timestamp) < self.config.window_duration * 2
        });
        before.saturating_sub(self.requests.len())
    }

    pub fn tracked_keys(&self) -> usize {
        self.requests.len()
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new(RateLimitConfig::default())
    }
}

// Global rate limiter instance
lazy_static::lazy_static! {
    pub static ref RATE_LIMITER: Arc<RateLimiter> = Arc::new(RateLimiter::default());
}

/// Periodically evict stale rate-limit windows
pub fn start_cleanup_task() {
    tokio::spawn(async {
        let mut interval = tokio::time::interval(Duration::from_secs(60));
        loop {
            interval.tick().await;
            let removed = RATE_LIMITER.cleanup();
            if removed > 0 {
                debug!("🧹 Rate limiter cleanup: {} idle keys removed", removed);
            }
        }
    });
}

fn is_health_check(request: &Request) -> bool {
    matches!(request.uri().path(), "/health" | "/v1/health")
}

fn api_key(headers: &HeaderMap) -> Option<&str> {
    headers
        .get("X-API-Key")
        .or_else(|| headers.get("x-api-key"))
        .and_then(|v| v.to_str().ok())
}

fn reject(status: StatusCode, code: &str, message: &str) -> Response {
    let error = ApiError {
        code: code.to_string(),
        message: message.to_string(),
        details: None,
    };
    (status, Json(ApiResponse::error(error, 0.0))).into_response()
}

/// API Key authentication middleware
pub async fn auth_middleware(headers: HeaderMap, request: Request, next: Next) -> Response {
    if is_health_check(&request) {
        return next.run(request).await;
    }

    match api_key(&headers) {
        Some(key) if validate_api_key(key) => next.run(request).await,
        Some(_) => {
            warn!("Invalid API key attempted");
            reject(
                StatusCode::UNAUTHORIZED,
                "API_UNAUTHORIZED",
                "Invalid or missing API key",
            )
        }
        // Anonymous callers are allowed but rate limited by IP
        None => next.run(request).await,
    }
}

/// Accepts `sk_`/`pk_` prefixed keys and the `demo` key
fn validate_api_key(key: &str) -> bool {
    key.starts_with("sk_") || key.starts_with("pk_") || key == "demo"
}

/// Rate limiting middleware
pub async fn rate_limit_middleware(headers: HeaderMap, request: Request, next: Next) -> Response {
    if is_health_check(&request) {
        return next.run(request).await;
    }

    let rate_key = api_key(&headers).map(str::to_string).unwrap_or_else(|| {
        headers
            .get("X-Forwarded-For")
            .or_else(|| headers.get("x-real-ip"))
            .and_then(|v| v.to_str().ok())
            .unwrap_or("unknown")
            .to_string()
    });

    let (allowed, remaining, reset) = RATE_LIMITER.check(&rate_key);

    if !allowed {
        warn!(key = %rate_key, "Rate limit exceeded");
        let mut response = reject(
            StatusCode::TOO_MANY_REQUESTS,
            "API_RATE_LIMITED",
            &format!("Rate limit exceeded. Retry after {} seconds", reset),
        );
        response.headers_mut().insert("Retry-After", reset.into());
        return response;
    }

    let mut response = next.run(request).await;

    let headers = response.headers_mut();
    headers.insert("X-RateLimit-Remaining", remaining.into());
    headers.insert("X-RateLimit-Reset", reset.into());

    response
}

/// Request logging middleware; tags every response with `X-Request-Id`
pub async fn logging_middleware(request: Request, next: Next) -> Response {
    let start = Instant::now();
    let method = request.method().clone();
    let uri = request.uri().clone();
    let request_id = request
        .headers()
        .get("X-Request-Id")
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
        .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());

    let mut response = next.run(request).await;

    info!(
        request_id = %request_id,
        method = %method,
        uri = %uri,
        status = %response.status().as_u16(),
        latency_ms = %start.elapsed().as_millis(),
        "Request completed"
    );

    if let Ok(value) = HeaderValue::from_str(&request_id) {
        response.headers_mut().insert("X-Request-Id", value);
    }
    response
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rate_limiter_blocks_after_window_quota() {
        let limiter = RateLimiter::new(RateLimitConfig {
            requests_per_window: 2,
            window_duration: Duration::from_secs(60),
        });

        assert!(limiter.check("k").0);
        let (allowed, remaining, _) = limiter.check("k");
        assert!(allowed);
        assert_eq!(remaining, 0);
        assert!(!limiter.check("k").0);
        // Separate key has its own window
        assert!(limiter.check("other").0);
    }

    #[test]
    fn test_cleanup_keeps_fresh_windows() {
        let limiter = RateLimiter::default();
        limiter.check("a");
        limiter.check("b");
        assert_eq!(limiter.cleanup(), 0);
        assert_eq!(limiter.tracked_keys(), 2);
    }

    #[test]
    fn test_api_key_format() {
        assert!(validate_api_key("sk_live_123"));
        assert!(validate_api_key("pk_test"));
        assert!(validate_api_key("demo"));
        assert!(!validate_api_key("letmein"));
    }
}
