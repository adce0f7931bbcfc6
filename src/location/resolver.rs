//! Location resolver: validates the query, calls the geocoding source once and
//! classifies the answer.
//!
//! Flow:  trim → length check → source.search → exact/close match → outcome

use super::format::{format_candidates, to_candidate};
use super::providers::GeocodingSource;
use super::types::{
    LocationError, LocationLookup, RawPlace, ResolutionOutcome, MIN_QUERY_LEN, MSG_TOO_SHORT,
};
use tracing::debug;

/// Stateless resolver over a geocoding source.
pub struct LocationResolver<S> {
    source: S,
}

impl<S: GeocodingSource> LocationResolver<S> {
    pub fn new(source: S) -> Self {
        Self { source }
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    /// Resolve a free-text query. Never fails: every error path becomes an outcome.
    pub async fn resolve(&self, query: &str) -> ResolutionOutcome {
        let trimmed = query.trim();
        match self.lookup(trimmed).await {
            Ok(lookup) => classify(&lookup),
            Err(e) => outcome_for_error(trimmed, &e),
        }
    }

    /// Validate the query and fetch its normalized results.
    ///
    /// An empty result set is `Err(NotFound)`; a too-short query is
    /// `Err(Validation)` and never reaches the source.
    pub async fn lookup(&self, query: &str) -> Result<LocationLookup, LocationError> {
        let query = validate_query(query)?;
        let results = self.source.search(query).await?;

        if results.is_empty() {
            return Err(LocationError::NotFound(query.to_string()));
        }

        let exact_match = has_exact_match(query, &results) || is_close_match(query, &results);
        debug!(query, count = results.len(), exact_match, "lookup complete");

        Ok(LocationLookup {
            query: query.to_string(),
            results,
            exact_match,
        })
    }
}

/// Trim and enforce the minimum length.
pub fn validate_query(query: &str) -> Result<&str, LocationError> {
    let trimmed = query.trim();
    if trimmed.chars().count() < MIN_QUERY_LEN {
        return Err(LocationError::Validation(MSG_TOO_SHORT.to_string()));
    }
    Ok(trimmed)
}

/// Classify a lookup into an outcome. Pure.
pub fn classify(lookup: &LocationLookup) -> ResolutionOutcome {
    let query = lookup.query.clone();

    match lookup.results.as_slice() {
        [] => ResolutionOutcome::NotFound {
            message: super::types::not_found_message(&query),
            query,
        },
        [only] => ResolutionOutcome::Resolved {
            query,
            place: to_candidate(only),
            automatic: true,
        },
        results => match first_exact_match(&query, results) {
            Some(place) => ResolutionOutcome::Resolved {
                query,
                place: to_candidate(place),
                automatic: true,
            },
            None => ResolutionOutcome::Ambiguous {
                query,
                candidates: format_candidates(results),
            },
        },
    }
}

/// Map a lookup failure to the outcome shown to the user.
pub fn outcome_for_error(query: &str, err: &LocationError) -> ResolutionOutcome {
    if err.is_transport() {
        ResolutionOutcome::Failed {
            query: query.to_string(),
            reason: err.user_message(),
        }
    } else {
        ResolutionOutcome::NotFound {
            query: query.to_string(),
            message: err.user_message(),
        }
    }
}

fn first_exact_match<'a>(query: &str, results: &'a [RawPlace]) -> Option<&'a RawPlace> {
    let q = query.to_lowercase();
    results.iter().find(|p| p.name.to_lowercase() == q)
}

fn has_exact_match(query: &str, results: &[RawPlace]) -> bool {
    first_exact_match(query, results).is_some()
}

/// The sole result's name contains the query.
fn is_close_match(query: &str, results: &[RawPlace]) -> bool {
    match results {
        [only] => only.name.to_lowercase().contains(&query.to_lowercase()),
        _ => false,
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::location::format::tests::place;
    use crate::location::types::MSG_UPSTREAM_FAILURE;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use std::time::Duration;

    /// In-memory source. Unknown queries return no results.
    #[derive(Default)]
    pub(crate) struct StaticSource {
        answers: Mutex<HashMap<String, (Duration, Result<Vec<RawPlace>, u16>)>>,
        pub(crate) calls: AtomicUsize,
        pub(crate) seen: Mutex<Vec<String>>,
    }

    impl StaticSource {
        pub(crate) fn with(self, query: &str, places: Vec<RawPlace>) -> Self {
            self.with_delay(query, Duration::ZERO, places)
        }

        pub(crate) fn with_delay(self, query: &str, delay: Duration, places: Vec<RawPlace>) -> Self {
            self.answers
                .lock()
                .unwrap()
                .insert(query.to_string(), (delay, Ok(places)));
            self
        }

        pub(crate) fn failing(self, query: &str, status: u16) -> Self {
            self.answers
                .lock()
                .unwrap()
                .insert(query.to_string(), (Duration::ZERO, Err(status)));
            self
        }

        pub(crate) fn call_count(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl GeocodingSource for StaticSource {
        async fn search(&self, query: &str) -> Result<Vec<RawPlace>, LocationError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.seen.lock().unwrap().push(query.to_string());
            let answer = self.answers.lock().unwrap().get(query).cloned();
            match answer {
                Some((delay, result)) => {
                    if !delay.is_zero() {
                        tokio::time::sleep(delay).await;
                    }
                    result.map_err(LocationError::UpstreamStatus)
                }
                None => Ok(vec![]),
            }
        }
    }

    fn springfields() -> Vec<RawPlace> {
        vec![
            place(1, "Springfield", Some("Illinois"), Some("United States")),
            place(2, "Springfield", Some("Missouri"), Some("United States")),
            place(3, "Springfield", Some("Massachusetts"), Some("United States")),
        ]
    }

    #[tokio::test]
    async fn test_ambiguous_keeps_source_order() {
        let resolver = LocationResolver::new(StaticSource::default().with("Springfiel", springfields()));
        match resolver.resolve("Springfiel").await {
            ResolutionOutcome::Ambiguous { query, candidates } => {
                assert_eq!(query, "Springfiel");
                assert_eq!(candidates.len(), 3);
                let names: Vec<_> = candidates.iter().map(|c| c.short_name.as_str()).collect();
                assert_eq!(
                    names,
                    vec![
                        "Springfield, Illinois",
                        "Springfield, Missouri",
                        "Springfield, Massachusetts"
                    ]
                );
            }
            other => panic!("expected ambiguous, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_exact_match_picks_first_equal_name() {
        let mut places = springfields();
        places.insert(0, place(9, "Springfield Gardens", Some("New York"), Some("United States")));
        let resolver = LocationResolver::new(StaticSource::default().with("springfield", places));

        let lookup = resolver.lookup("springfield").await.unwrap();
        assert!(lookup.exact_match);

        match resolver.resolve("springfield").await {
            ResolutionOutcome::Resolved { place, automatic, .. } => {
                assert!(automatic);
                assert_eq!(place.id, 1);
                assert_eq!(place.short_name, "Springfield, Illinois");
            }
            other => panic!("expected resolved, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_single_result_resolves_regardless_of_name() {
        let tokyo = place(1850147, "Tokyo", Some("Tokyo"), Some("Japan"));
        let odd = place(42, "Edo Castle Ruins", None, Some("Japan"));
        let source = StaticSource::default()
            .with("Tokyo", vec![tokyo])
            .with("old capital", vec![odd]);
        let resolver = LocationResolver::new(source);

        match resolver.resolve("Tokyo").await {
            ResolutionOutcome::Resolved { place, automatic, .. } => {
                assert!(automatic);
                assert_eq!(place.short_name, "Tokyo, Japan");
            }
            other => panic!("expected resolved, got {:?}", other),
        }

        let lookup = resolver.lookup("old capital").await.unwrap();
        assert!(!lookup.exact_match);
        assert!(matches!(
            resolver.resolve("old capital").await,
            ResolutionOutcome::Resolved { automatic: true, .. }
        ));
    }

    #[tokio::test]
    async fn test_close_match_on_single_result() {
        let source = StaticSource::default().with("york", vec![place(5, "New York", Some("New York"), None)]);
        let resolver = LocationResolver::new(source);
        assert!(resolver.lookup("york").await.unwrap().exact_match);
    }

    #[tokio::test]
    async fn test_not_found_echoes_query() {
        let resolver = LocationResolver::new(StaticSource::default());
        match resolver.resolve("  xx ").await {
            ResolutionOutcome::NotFound { query, message } => {
                assert_eq!(query, "xx");
                assert!(message.contains("\"xx\""));
            }
            other => panic!("expected not found, got {:?}", other),
        }
        assert_eq!(resolver.source().call_count(), 1);
    }

    #[tokio::test]
    async fn test_short_query_never_reaches_source() {
        let resolver = LocationResolver::new(StaticSource::default());
        for q in ["a", " a ", "", "   ", "é"] {
            match resolver.resolve(q).await {
                ResolutionOutcome::NotFound { message, .. } => {
                    assert!(message.contains("at least 2 characters"));
                }
                other => panic!("expected not found, got {:?}", other),
            }
            assert!(matches!(
                resolver.lookup(q).await,
                Err(LocationError::Validation(_))
            ));
        }
        assert_eq!(resolver.source().call_count(), 0);
    }

    #[tokio::test]
    async fn test_upstream_failure_is_generic() {
        let resolver = LocationResolver::new(StaticSource::default().failing("Paris", 503));
        match resolver.resolve("Paris").await {
            ResolutionOutcome::Failed { query, reason } => {
                assert_eq!(query, "Paris");
                assert_eq!(reason, MSG_UPSTREAM_FAILURE);
                assert!(!reason.contains("503"));
            }
            other => panic!("expected failed, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_source_receives_trimmed_query() {
        let resolver = LocationResolver::new(StaticSource::default());
        resolver.resolve("  Oslo  ").await;
        assert_eq!(*resolver.source().seen.lock().unwrap(), vec!["Oslo".to_string()]);
    }

    #[test]
    fn test_classify_is_pure() {
        let lookup = LocationLookup {
            query: "Springfiel".into(),
            results: springfields(),
            exact_match: false,
        };
        assert_eq!(classify(&lookup), classify(&lookup));
    }

    #[test]
    fn test_validate_query() {
        assert_eq!(validate_query("  ab ").unwrap(), "ab");
        assert!(validate_query(" a").is_err());
    }
}
