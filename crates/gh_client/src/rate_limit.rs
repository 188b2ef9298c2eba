use std::time::Duration;

use chrono::{DateTime, Utc};
use http::{header, HeaderMap};

/// Quota state owned by one client instance. Updated only on successful
/// responses; read back when a refusal arrives without usable headers.
#[derive(Debug, Clone)]
pub struct RateLimitState {
    pub remaining: i64,
    pub reset_at: DateTime<Utc>,
}

impl Default for RateLimitState {
    fn default() -> Self {
        Self::new()
    }
}

impl RateLimitState {
    pub fn new() -> Self {
        Self {
            remaining: 5000,
            reset_at: Utc::now(),
        }
    }

    pub fn update(&mut self, update: RateLimitUpdate) {
        self.remaining = update.remaining;
        self.reset_at = update.reset;
    }
}

#[derive(Debug, Clone)]
pub struct RateLimitUpdate {
    pub remaining: i64,
    pub reset: DateTime<Utc>,
}

pub fn parse_rate_limit(headers: &HeaderMap) -> Option<RateLimitUpdate> {
    let remaining = headers
        .get("x-ratelimit-remaining")
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.parse::<i64>().ok())?;
    let reset_ts = headers
        .get("x-ratelimit-reset")
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.parse::<i64>().ok())?;
    let reset = DateTime::from_timestamp(reset_ts, 0)?;
    Some(RateLimitUpdate { remaining, reset })
}

/// `true` when the response explicitly reports an empty quota, which is what
/// distinguishes throttling from an ordinary 403.
pub fn remaining_is_zero(headers: &HeaderMap) -> bool {
    headers
        .get("x-ratelimit-remaining")
        .and_then(|v| v.to_str().ok())
        .map(|s| s.trim() == "0")
        .unwrap_or(false)
}

pub fn parse_retry_after(headers: &HeaderMap) -> Option<Duration> {
    let value = headers.get(header::RETRY_AFTER)?.to_str().ok()?;
    if let Ok(seconds) = value.parse::<u64>() {
        return Some(Duration::from_secs(seconds));
    }
    let date = httpdate::parse_http_date(value).ok()?;
    date.duration_since(std::time::SystemTime::now()).ok()
}
