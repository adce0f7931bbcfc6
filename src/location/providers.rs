//! Geocoding providers: the source trait and the Open-Meteo implementation.

use super::types::{LocationError, RawPlace};
use crate::config::ResolverConfig;
use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, warn};

/// Anything that can turn a query into raw place records.
///
/// Implementations must not retry; an empty `Vec` means "no match".
#[async_trait]
pub trait GeocodingSource: Send + Sync {
    async fn search(&self, query: &str) -> Result<Vec<RawPlace>, LocationError>;
}

// ─── Open-Meteo provider ────────────────────────────────────────

/// Open-Meteo geocoding search API.
#[derive(Debug, Clone)]
pub struct OpenMeteoProvider {
    config: ResolverConfig,
}

impl OpenMeteoProvider {
    pub fn new(config: ResolverConfig) -> Self {
        Self { config }
    }

    pub fn search_url(&self, query: &str) -> String {
        format!(
            "{}?name={}&count={}&language={}&format=json",
            self.config.endpoint,
            urlencod(query),
            self.config.count,
            urlencod(&self.config.language),
        )
    }

    /// Blocking request; run it off the async executor.
    fn fetch(url: &str, config: &ResolverConfig) -> Result<Vec<RawPlace>, LocationError> {
        let response = ureq::get(url)
            .set("User-Agent", &config.user_agent)
            .timeout(config.timeout)
            .call()
            .map_err(|e| match e {
                ureq::Error::Status(code, _) => LocationError::UpstreamStatus(code),
                ureq::Error::Transport(t) => LocationError::Network(t.to_string()),
            })?;

        let body = response
            .into_string()
            .map_err(|e| LocationError::Network(e.to_string()))?;

        parse_search_response(&body)
    }
}

impl Default for OpenMeteoProvider {
    fn default() -> Self {
        Self::new(ResolverConfig::default())
    }
}

#[async_trait]
impl GeocodingSource for OpenMeteoProvider {
    async fn search(&self, query: &str) -> Result<Vec<RawPlace>, LocationError> {
        let url = self.search_url(query);
        let config = self.config.clone();
        debug!(%url, "geocoding request");

        let result = tokio::task::spawn_blocking(move || Self::fetch(&url, &config))
            .await
            .map_err(|e| LocationError::Network(format!("geocoding task failed: {}", e)))?;

        match &result {
            Ok(places) => debug!(query, count = places.len(), "geocoding response"),
            Err(e) => warn!(query, error = %e, "geocoding request failed"),
        }
        result
    }
}

// ─── Wire format ────────────────────────────────────────────────

#[derive(Deserialize, Debug)]
struct SearchResponse {
    #[serde(default)]
    results: Option<Vec<WirePlace>>,
}

/// One element of `results`, before validation. Nothing is trusted to be present.
#[derive(Deserialize, Debug, Default)]
struct WirePlace {
    id: Option<i64>,
    name: Option<String>,
    latitude: Option<f64>,
    longitude: Option<f64>,
    elevation: Option<f64>,
    feature_code: Option<String>,
    country_code: Option<String>,
    admin1: Option<String>,
    admin2: Option<String>,
    admin3: Option<String>,
    admin4: Option<String>,
    timezone: Option<String>,
    population: Option<u64>,
    country: Option<String>,
    country_id: Option<i64>,
}

impl TryFrom<WirePlace> for RawPlace {
    type Error = LocationError;

    fn try_from(w: WirePlace) -> Result<Self, Self::Error> {
        let missing = |field: &str| LocationError::InvalidResponse(format!("result without {}", field));

        let id = w.id.ok_or_else(|| missing("id"))?;
        let name = w.name.filter(|n| !n.trim().is_empty()).ok_or_else(|| missing("name"))?;
        let latitude = w.latitude.ok_or_else(|| missing("latitude"))?;
        let longitude = w.longitude.ok_or_else(|| missing("longitude"))?;

        if !latitude.is_finite() || !(-90.0..=90.0).contains(&latitude) {
            return Err(LocationError::InvalidResponse(format!(
                "latitude {} out of range for id {}",
                latitude, id
            )));
        }
        if !longitude.is_finite() || !(-180.0..=180.0).contains(&longitude) {
            return Err(LocationError::InvalidResponse(format!(
                "longitude {} out of range for id {}",
                longitude, id
            )));
        }

        Ok(RawPlace {
            id,
            name,
            latitude,
            longitude,
            elevation: w.elevation.unwrap_or(0.0),
            feature_code: w
                .feature_code
                .filter(|c| !c.is_empty())
                .unwrap_or_else(|| "UNKNOWN".to_string()),
            country_code: w.country_code.unwrap_or_default(),
            admin1: w.admin1,
            admin2: w.admin2,
            admin3: w.admin3,
            admin4: w.admin4,
            timezone: w.timezone.unwrap_or_default(),
            population: w.population,
            country: w.country,
            country_id: w.country_id,
        })
    }
}

/// Parse and validate a search payload. Missing or empty `results` is a valid
/// empty answer; any malformed record rejects the whole payload.
pub fn parse_search_response(body: &str) -> Result<Vec<RawPlace>, LocationError> {
    let response: SearchResponse =
        serde_json::from_str(body).map_err(|e| LocationError::InvalidResponse(e.to_string()))?;

    response
        .results
        .unwrap_or_default()
        .into_iter()
        .map(RawPlace::try_from)
        .collect()
}

// ─── URL encoding (minimal, no extra dep) ───────────────────────

fn urlencod(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for b in s.bytes() {
        match b {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => out.push(b as char),
            _ => out.push_str(&format!("%{:02X}", b)),
        }
    }
    out
}
