use crate::github::models::RateLimit;
use chrono::Utc;
use reqwest::header::HeaderMap;
use std::collections::HashMap;
use std::time::Duration;
use tracing::debug;

pub const RATELIMIT_LIMIT_HEADER: &str = "x-ratelimit-limit";
pub const RATELIMIT_REMAINING_HEADER: &str = "x-ratelimit-remaining";
pub const RATELIMIT_RESET_HEADER: &str = "x-ratelimit-reset";

/// Added to every computed wait so the quota has actually been reset
pub const RESET_MARGIN: Duration = Duration::from_secs(2);

/// Default pause used after abuse signals and connection failures
pub const DEFAULT_SLEEP_PERIOD: Duration = Duration::from_secs(1);

/// Bucket under which GitHub tracks quota independently
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Resource {
    Core,
    Search,
}

impl Resource {
    pub fn as_str(&self) -> &'static str {
        match self {
            Resource::Core => "core",
            Resource::Search => "search",
        }
    }

    /// Resource a request path is accounted to: `search` if the first path
    /// segment is `search`, `core` otherwise
    pub fn from_path(path: &str) -> Self {
        match path.trim_start_matches('/').split('/').next() {
            Some("search") => Resource::Search,
            _ => Resource::Core,
        }
    }
}

/// Rate limit cache for the GitHub API
///
/// Owned by a single client. Values are taken from response headers and,
/// when missing or stale, refreshed by the client from `/rate_limit`.
#[derive(Debug)]
pub struct RateLimiter {
    cache: HashMap<Resource, RateLimit>,
    suggested_spacing: Duration,
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new()
    }
}

impl RateLimiter {
    pub fn new() -> Self {
        Self {
            cache: HashMap::new(),
            suggested_spacing: DEFAULT_SLEEP_PERIOD,
        }
    }

    pub fn get(&self, resource: Resource) -> Option<RateLimit> {
        self.cache.get(&resource).copied()
    }

    pub fn set(&mut self, resource: Resource, limit: RateLimit) {
        self.cache.insert(resource, limit);
    }

    /// Replace cached values with the `resources` map of `/rate_limit`
    pub fn fill(&mut self, resources: &HashMap<String, RateLimit>) {
        for resource in [Resource::Core, Resource::Search] {
            if let Some(limit) = resources.get(resource.as_str()) {
                self.cache.insert(resource, *limit);
            }
        }
    }

    /// True if there is no cached record or the record is past its reset
    pub fn needs_refresh(&self, resource: Resource, now: i64) -> bool {
        match self.cache.get(&resource) {
            Some(limit) => limit.remaining < 1 && limit.reset <= now,
            None => true,
        }
    }

    /// Update rate limit from GitHub API response headers
    ///
    /// The cache is only touched if all three headers are present.
    pub fn record_response(&mut self, resource: Resource, headers: &HeaderMap) {
        let header = |name: &str| {
            headers
                .get(name)
                .and_then(|v| v.to_str().ok())
                .map(str::trim)
                .map(String::from)
        };

        let (Some(limit), Some(remaining), Some(reset)) = (
            header(RATELIMIT_LIMIT_HEADER).and_then(|s| s.parse::<u32>().ok()),
            header(RATELIMIT_REMAINING_HEADER).and_then(|s| s.parse::<u32>().ok()),
            header(RATELIMIT_RESET_HEADER).and_then(|s| s.parse::<i64>().ok()),
        ) else {
            return;
        };

        self.cache.insert(
            resource,
            RateLimit {
                limit,
                remaining,
                reset,
            },
        );

        debug!(
            "Rate limit updated for {}: {}/{} (resets at {})",
            resource.as_str(),
            remaining,
            limit,
            reset
        );
    }

    /// How long to wait before the next request for `resource`
    ///
    /// Returns `None` if quota is left or nothing is cached.
    pub fn wait_duration(&self, resource: Resource, now: i64) -> Option<Duration> {
        let limit = self.cache.get(&resource)?;
        if limit.remaining >= 1 {
            return None;
        }

        let wait_secs = limit
            .reset
            .saturating_sub(now)
            .saturating_add(RESET_MARGIN.as_secs() as i64);
        if wait_secs > 0 {
            Some(Duration::from_secs(wait_secs as u64))
        } else {
            None
        }
    }

    /// Convenience for `wait_duration` at the current wall clock time
    pub fn wait_duration_now(&self, resource: Resource) -> Option<Duration> {
        self.wait_duration(resource, Utc::now().timestamp())
    }

    /// Spacing callers may sleep between requests to avoid abuse detection
    pub fn suggested_spacing(&self) -> Duration {
        self.suggested_spacing
    }

    /// Called whenever an abuse signal with `Retry-After` was received
    pub fn double_spacing(&mut self) {
        self.suggested_spacing *= 2;
    }
}
