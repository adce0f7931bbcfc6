//! Place-name resolution.
//!
//! Provides the geocoding source abstraction, the resolver that classifies a
//! query's results, and the pure candidate formatting rules.

pub mod format;
pub mod providers;
pub mod resolver;
pub mod types;

pub use format::{best_match, format_candidates, format_coords, needs_disambiguation, short_name};
pub use providers::{GeocodingSource, OpenMeteoProvider};
pub use resolver::{classify, LocationResolver};
pub use types::{Candidate, LocationError, LocationLookup, RawPlace, ResolutionOutcome};
