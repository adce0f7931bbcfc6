//! Core types for the location subsystem.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Shortest query (in characters, after trimming) that is sent upstream.
pub const MIN_QUERY_LEN: usize = 2;

pub const MSG_TOO_SHORT: &str = "Location name must be at least 2 characters long";
pub const MSG_UPSTREAM_FAILURE: &str =
    "An error occurred while searching for locations. Please try again.";
pub const MSG_FOUND: &str = "Location found successfully";

/// A place record as returned by the geocoding source, after boundary validation.
///
/// Field names follow the upstream wire format so the record can be echoed
/// back to HTTP clients unchanged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawPlace {
    pub id: i64,
    pub name: String,
    pub latitude: f64,
    pub longitude: f64,
    pub elevation: f64,
    pub feature_code: String,
    pub country_code: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub admin1: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub admin2: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub admin3: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub admin4: Option<String>,
    pub timezone: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub population: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub country_id: Option<i64>,
}

/// A display-ready choice derived from one [`RawPlace`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Candidate {
    pub id: i64,
    pub name: String,
    /// e.g. "Springfield, Illinois, United States (114k)"
    pub label: String,
    /// Canonical name stored by the host application.
    pub short_name: String,
    /// Country display name, or the ISO code when the source has no name.
    pub country: String,
    pub admin1: Option<String>,
    pub latitude: f64,
    pub longitude: f64,
}

/// The normalized result of one successful upstream call.
#[derive(Debug, Clone, Serialize)]
pub struct LocationLookup {
    pub query: String,
    pub results: Vec<RawPlace>,
    /// A name equals the query, or the only result contains it (case-insensitive).
    pub exact_match: bool,
}

/// Outcome of resolving one query.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ResolutionOutcome {
    NotFound {
        query: String,
        message: String,
    },
    Resolved {
        query: String,
        place: Candidate,
        automatic: bool,
    },
    Ambiguous {
        query: String,
        candidates: Vec<Candidate>,
    },
    Failed {
        query: String,
        reason: String,
    },
}

impl ResolutionOutcome {
    pub fn query(&self) -> &str {
        match self {
            Self::NotFound { query, .. }
            | Self::Resolved { query, .. }
            | Self::Ambiguous { query, .. }
            | Self::Failed { query, .. } => query,
        }
    }
}

impl fmt::Display for ResolutionOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound { message, .. } => write!(f, "{}", message),
            Self::Failed { reason, .. } => write!(f, "{}", reason),
            Self::Resolved { place, .. } => write!(
                f,
                "\u{1F4CD} {}\n  \u{1F4D0} {}",
                place.label,
                super::format::format_coords(place.latitude, place.longitude)
            ),
            Self::Ambiguous { query, candidates } => {
                writeln!(f, "Multiple locations found for \"{}\":", query)?;
                for (i, c) in candidates.iter().enumerate() {
                    writeln!(f, "    {}. \u{1F4CD} {}", i + 1, c.label)?;
                    writeln!(
                        f,
                        "       \u{1F4D0} {}",
                        super::format::format_coords(c.latitude, c.longitude)
                    )?;
                }
                let hint = candidates
                    .first()
                    .map(|c| c.short_name.as_str())
                    .unwrap_or(query);
                write!(f, "  Hint: refine the query, e.g. \"{}\"", hint)
            }
        }
    }
}

/// Location resolution errors.
///
/// The `Display` text carries diagnostic detail for logs; use
/// [`LocationError::user_message`] for anything shown to an end user.
#[derive(Debug, Error)]
pub enum LocationError {
    #[error("invalid query: {0}")]
    Validation(String),
    #[error("no locations found for '{0}'")]
    NotFound(String),
    #[error("geocoding service responded with status {0}")]
    UpstreamStatus(u16),
    #[error("network error: {0}")]
    Network(String),
    #[error("invalid geocoding response: {0}")]
    InvalidResponse(String),
}

impl LocationError {
    /// Text that is safe to display verbatim.
    pub fn user_message(&self) -> String {
        match self {
            Self::Validation(msg) => msg.clone(),
            Self::NotFound(query) => not_found_message(query),
            Self::UpstreamStatus(_) | Self::Network(_) | Self::InvalidResponse(_) => {
                MSG_UPSTREAM_FAILURE.to_string()
            }
        }
    }

    /// Transport-class failures: the caller may retry.
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            Self::UpstreamStatus(_) | Self::Network(_) | Self::InvalidResponse(_)
        )
    }
}

pub fn not_found_message(query: &str) -> String {
    format!(
        "No locations found for \"{}\". Please try a different search term.",
        query
    )
}

pub fn ambiguous_message(query: &str, count: usize) -> String {
    format!(
        "Found {} possible locations for \"{}\". Please select the correct one.",
        count, query
    )
}
