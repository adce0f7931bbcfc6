//! placefinder: resolve free-text place names into coordinates.
//!
//! A query goes through the [`location::LocationResolver`], which calls a
//! geocoding source once and classifies the answer as not found, resolved, or
//! ambiguous. The [`search::SearchSession`] wraps the resolver for
//! keystroke-driven suggestion lists, and [`server`] exposes it over HTTP.
//!
//! ```no_run
//! use placefinder::location::{LocationResolver, OpenMeteoProvider, ResolutionOutcome};
//!
//! # async fn demo() {
//! let resolver = LocationResolver::new(OpenMeteoProvider::default());
//! match resolver.resolve("Springfield").await {
//!     ResolutionOutcome::Resolved { place, .. } => println!("{}", place.short_name),
//!     ResolutionOutcome::Ambiguous { candidates, .. } => {
//!         for c in candidates {
//!             println!("{}", c.label);
//!         }
//!     }
//!     other => eprintln!("{}", other),
//! }
//! # }
//! ```

use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

pub mod config;
pub mod error;
pub mod location;
pub mod search;
pub mod server;

pub use config::{ResolverConfig, SearchConfig};
pub use error::AppError;

/// Install the global `tracing` subscriber, writing to stderr.
///
/// `RUST_LOG` takes precedence over `level` when set.
pub fn init_logging(level: impl Into<LevelFilter>) -> error::Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level.into().to_string()))?;

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init()
        .map_err(|e| AppError::LoggingInstalled(e.to_string()))
}
