//! Runtime configuration for the resolver and the interactive search session.

use std::time::Duration;

pub const DEFAULT_ENDPOINT: &str = "https://geocoding-api.open-meteo.com/v1/search";

/// Settings for talking to the geocoding source.
#[derive(Debug, Clone)]
pub struct ResolverConfig {
    pub endpoint: String,
    /// Upper bound on records requested per query.
    pub count: usize,
    pub language: String,
    pub timeout: Duration,
    pub user_agent: String,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            count: 10,
            language: "en".to_string(),
            timeout: Duration::from_secs(10),
            user_agent: format!("placefinder/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

impl ResolverConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    /// Clamped to 1..=100, the range the upstream accepts.
    pub fn count(mut self, count: usize) -> Self {
        self.count = count.clamp(1, 100);
        self
    }

    pub fn language(mut self, language: impl Into<String>) -> Self {
        self.language = language.into();
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// Settings for the keystroke-driven search session.
#[derive(Debug, Clone)]
pub struct SearchConfig {
    pub debounce: Duration,
    pub max_suggestions: usize,
    /// Events queued for the host before new ones are dropped.
    pub event_capacity: usize,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            debounce: Duration::from_millis(300),
            max_suggestions: 8,
            event_capacity: 64,
        }
    }
}

impl SearchConfig {
    pub fn debounce(mut self, debounce: Duration) -> Self {
        self.debounce = debounce;
        self
    }

    pub fn max_suggestions(mut self, max: usize) -> Self {
        self.max_suggestions = max;
        self
    }

    /// At least 1.
    pub fn event_capacity(mut self, capacity: usize) -> Self {
        self.event_capacity = capacity.max(1);
        self
    }
}
