//! Interactive search session: debounced keystrokes in, UI events out.
//!
//! The session owns its debounce timer. Every keystroke replaces the timer;
//! only a timer that runs to completion dispatches a lookup. Dispatched lookups
//! are tagged with a request id and a response is dropped unless its id is
//! still the latest one, so a slow answer for an old prefix can't overwrite a
//! newer list.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::config::SearchConfig;
use crate::location::format::{candidate_short_name, format_candidates};
use crate::location::resolver::validate_query;
use crate::location::{Candidate, GeocodingSource, LocationResolver, ResolutionOutcome};

/// Host-side persistence of a chosen location.
pub trait LocationStore: Send + Sync {
    fn add_location(&self, name: &str, latitude: f64, longitude: f64);
}

/// What the host UI should do next.
#[derive(Debug, Clone, PartialEq)]
pub enum SearchEvent {
    /// Hide the suggestion list.
    ClearSuggestions,
    /// Replace the suggestion list.
    Suggestions(Vec<Candidate>),
    /// An explicit add matched several places; ask the user to pick one.
    ChooseLocation {
        query: String,
        candidates: Vec<Candidate>,
    },
    /// A location was handed to the store.
    Added {
        name: String,
        latitude: f64,
        longitude: f64,
    },
    /// Show a message (not found, upstream failure).
    Message(String),
}

/// In-memory store, for the CLI session and tests.
#[derive(Debug, Default)]
pub struct MemoryStore {
    added: Mutex<Vec<(String, f64, f64)>>,
}

impl MemoryStore {
    pub fn locations(&self) -> Vec<(String, f64, f64)> {
        self.added
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl LocationStore for MemoryStore {
    fn add_location(&self, name: &str, latitude: f64, longitude: f64) {
        self.added
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((name.to_string(), latitude, longitude));
    }
}

/// Shared between the session and the lookups it spawns.
struct Shared<S> {
    resolver: Arc<LocationResolver<S>>,
    /// Id of the most recently dispatched lookup. Bumping it invalidates
    /// everything in flight.
    latest: AtomicU64,
    suggestions: Mutex<Vec<Candidate>>,
    events: mpsc::Sender<SearchEvent>,
    max_suggestions: usize,
}

impl<S> Shared<S> {
    /// Never blocks. A host that stops draining loses events once the
    /// queue is full; the suggestion list itself stays readable through
    /// [`SearchSession::suggestions`].
    fn emit(&self, event: SearchEvent) {
        match self.events.try_send(event) {
            Ok(()) => {}
            Err(mpsc::error::TrySendError::Full(event)) => {
                warn!(?event, "search event queue full, dropping event");
            }
            // The host has gone away; nothing to do.
            Err(mpsc::error::TrySendError::Closed(_)) => {}
        }
    }

    fn set_suggestions(&self, list: Vec<Candidate>) {
        *self
            .suggestions
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = list.clone();
        if list.is_empty() {
            self.emit(SearchEvent::ClearSuggestions);
        } else {
            self.emit(SearchEvent::Suggestions(list));
        }
    }

    fn invalidate(&self) -> u64 {
        self.latest.fetch_add(1, Ordering::SeqCst) + 1
    }

    fn is_latest(&self, id: u64) -> bool {
        self.latest.load(Ordering::SeqCst) == id
    }
}

/// One user's search box.
pub struct SearchSession<S, H> {
    shared: Arc<Shared<S>>,
    store: Arc<H>,
    debounce: std::time::Duration,
    timer: Option<JoinHandle<()>>,
}

impl<S, H> SearchSession<S, H>
where
    S: GeocodingSource + 'static,
    H: LocationStore + 'static,
{
    pub fn new(
        resolver: Arc<LocationResolver<S>>,
        store: Arc<H>,
        config: &SearchConfig,
    ) -> (Self, mpsc::Receiver<SearchEvent>) {
        let (tx, rx) = mpsc::channel(config.event_capacity.max(1));
        let shared = Arc::new(Shared {
            resolver,
            latest: AtomicU64::new(0),
            suggestions: Mutex::new(Vec::new()),
            events: tx,
            max_suggestions: config.max_suggestions,
        });
        let session = Self {
            shared,
            store,
            debounce: config.debounce,
            timer: None,
        };
        (session, rx)
    }

    pub fn resolver(&self) -> &LocationResolver<S> {
        &self.shared.resolver
    }

    pub fn store(&self) -> &H {
        &self.store
    }

    /// Current suggestion list.
    pub fn suggestions(&self) -> Vec<Candidate> {
        self.shared
            .suggestions
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Keystroke entry point. Must be called from within a tokio runtime.
    pub fn on_query_change(&mut self, text: &str) {
        self.cancel_timer();

        let query = match validate_query(text) {
            Ok(q) => q.to_string(),
            Err(_) => {
                self.shared.invalidate();
                self.shared.set_suggestions(Vec::new());
                return;
            }
        };

        let shared = Arc::clone(&self.shared);
        let debounce = self.debounce;
        self.timer = Some(tokio::spawn(async move {
            tokio::time::sleep(debounce).await;
            let id = shared.invalidate();
            debug!(%query, id, "dispatching suggestion lookup");
            // Detached: replacing the timer must not cancel a dispatched lookup.
            tokio::spawn(live_search(shared, query, id));
        }));
    }

    /// Drop the pending keystroke timer, if any. In-flight lookups are left alone.
    pub fn cancel_timer(&mut self) {
        if let Some(timer) = self.timer.take() {
            timer.abort();
        }
    }

    /// Explicit "add" of the typed text. Pending and in-flight suggestion
    /// lookups are invalidated first.
    pub async fn add(&mut self, text: &str) -> ResolutionOutcome {
        self.cancel_timer();
        self.shared.invalidate();
        let outcome = self.shared.resolver.resolve(text).await;

        match &outcome {
            ResolutionOutcome::Resolved { place, .. } => self.select(place),
            ResolutionOutcome::Ambiguous { query, candidates } => {
                self.shared.emit(SearchEvent::ChooseLocation {
                    query: query.clone(),
                    candidates: candidates.clone(),
                });
            }
            ResolutionOutcome::NotFound { message, .. } => {
                self.shared.emit(SearchEvent::Message(message.clone()));
            }
            ResolutionOutcome::Failed { reason, .. } => {
                self.shared.emit(SearchEvent::Message(reason.clone()));
            }
        }
        outcome
    }

    /// Commit a suggestion or disambiguation choice.
    pub fn select(&mut self, candidate: &Candidate) {
        self.cancel_timer();
        let name = candidate_short_name(candidate);
        self.store
            .add_location(&name, candidate.latitude, candidate.longitude);

        self.shared.invalidate();
        self.shared.set_suggestions(Vec::new());
        self.shared.emit(SearchEvent::Added {
            name,
            latitude: candidate.latitude,
            longitude: candidate.longitude,
        });
    }
}

impl<S, H> Drop for SearchSession<S, H> {
    fn drop(&mut self) {
        if let Some(timer) = self.timer.take() {
            timer.abort();
        }
    }
}

async fn live_search<S: GeocodingSource>(shared: Arc<Shared<S>>, query: String, id: u64) {
    let result = shared.resolver.lookup(&query).await;

    if !shared.is_latest(id) {
        debug!(%query, id, "discarding stale suggestion response");
        return;
    }

    let list = match result {
        Ok(lookup) => {
            let mut list = format_candidates(&lookup.results);
            list.truncate(shared.max_suggestions);
            list
        }
        Err(e) => {
            debug!(%query, error = %e, "no suggestions");
            Vec::new()
        }
    };
    shared.set_suggestions(list);
}
