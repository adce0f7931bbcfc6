use clap::{Parser, Subcommand};
use placefinder::location::format::to_candidate;
use placefinder::location::resolver::outcome_for_error;
use placefinder::location::{
    best_match, classify, needs_disambiguation, Candidate, LocationResolver, OpenMeteoProvider,
    ResolutionOutcome,
};
use placefinder::search::{MemoryStore, SearchEvent, SearchSession};
use placefinder::{init_logging, server, ResolverConfig, SearchConfig};
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::level_filters::LevelFilter;

/// placefinder: resolve a place name into coordinates.
///
/// Examples:
///   placefinder resolve Tokyo
///   placefinder resolve Springfield --best
///   placefinder serve --port 8080
///   placefinder interactive
#[derive(Parser)]
#[command(name = "placefinder", version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Geocoding search endpoint.
    #[arg(long, global = true, env = "PLACEFINDER_GEOCODING_URL",
          default_value = placefinder::config::DEFAULT_ENDPOINT)]
    endpoint: String,

    /// Upstream request timeout in seconds.
    #[arg(long, global = true, env = "PLACEFINDER_TIMEOUT_SECS", default_value_t = 10)]
    timeout_secs: u64,

    /// Log level (overridden by RUST_LOG).
    #[arg(long, global = true, default_value = "warn")]
    log_level: LevelFilter,
}

#[derive(Subcommand)]
enum Command {
    /// Resolve one query and print the outcome as JSON.
    Resolve {
        query: String,

        /// Pick the best populated place instead of listing candidates.
        #[arg(long)]
        best: bool,
    },
    /// Serve the location validation API.
    Serve {
        #[arg(long, env = "PLACEFINDER_HOST", default_value = "127.0.0.1")]
        host: String,

        #[arg(long, short = 'p', env = "PLACEFINDER_PORT", default_value_t = 3000)]
        port: u16,
    },
    /// Type to get suggestions; "+" adds the typed text, a number picks a listed place.
    Interactive {
        /// Debounce delay in milliseconds.
        #[arg(long, default_value_t = 300)]
        debounce_ms: u64,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Err(e) = init_logging(cli.log_level) {
        eprintln!("Error: {}", e);
        return ExitCode::FAILURE;
    }

    let config = ResolverConfig::new()
        .endpoint(cli.endpoint.clone())
        .timeout(Duration::from_secs(cli.timeout_secs));
    let resolver = LocationResolver::new(OpenMeteoProvider::new(config));

    match cli.command {
        Command::Resolve { query, best } => run_resolve(&resolver, &query, best).await,
        Command::Serve { host, port } => match server::start(&host, port, resolver).await {
            Ok(()) => ExitCode::SUCCESS,
            Err(e) => {
                eprintln!("Error: {}", e);
                ExitCode::FAILURE
            }
        },
        Command::Interactive { debounce_ms } => {
            let config = SearchConfig::default().debounce(Duration::from_millis(debounce_ms));
            match run_interactive(resolver, &config).await {
                Ok(()) => ExitCode::SUCCESS,
                Err(e) => {
                    eprintln!("Error: {}", e);
                    ExitCode::FAILURE
                }
            }
        }
    }
}

async fn run_resolve(
    resolver: &LocationResolver<OpenMeteoProvider>,
    query: &str,
    best: bool,
) -> ExitCode {
    let outcome = match resolver.lookup(query).await {
        Ok(lookup) if best && needs_disambiguation(&lookup) => match best_match(&lookup.results) {
            Some(place) => ResolutionOutcome::Resolved {
                query: lookup.query.clone(),
                place: to_candidate(place),
                automatic: true,
            },
            None => classify(&lookup),
        },
        Ok(lookup) => classify(&lookup),
        Err(e) => outcome_for_error(query.trim(), &e),
    };

    // Human summary to stderr, JSON to stdout
    eprintln!("  {}", outcome);
    match serde_json::to_string_pretty(&outcome) {
        Ok(json) => println!("{}", json),
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::FAILURE;
        }
    }

    match outcome {
        ResolutionOutcome::Resolved { .. } | ResolutionOutcome::Ambiguous { .. } => ExitCode::SUCCESS,
        ResolutionOutcome::NotFound { .. } | ResolutionOutcome::Failed { .. } => ExitCode::FAILURE,
    }
}

async fn run_interactive(
    resolver: LocationResolver<OpenMeteoProvider>,
    config: &SearchConfig,
) -> std::io::Result<()> {
    let store = Arc::new(MemoryStore::default());
    let (mut session, mut events) = SearchSession::new(Arc::new(resolver), Arc::clone(&store), config);
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut typed = String::new();
    let mut choices: Vec<Candidate> = Vec::new();

    eprintln!("  Type a place name. \"+\" adds it, a number picks a listed place, \"q\" quits.");

    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line? else { break };
                let line = line.trim_end().to_string();
                match line.as_str() {
                    "q" | "quit" => break,
                    "+" => {
                        session.add(&typed).await;
                    }
                    n if !n.is_empty() && n.chars().all(|c| c.is_ascii_digit()) => {
                        match n.parse::<usize>().ok().and_then(|i| choices.get(i.wrapping_sub(1))) {
                            Some(c) => session.select(c),
                            None => eprintln!("  No choice {}", n),
                        }
                    }
                    _ => {
                        typed = line.clone();
                        session.on_query_change(&typed);
                    }
                }
            }
            Some(event) = events.recv() => match event {
                SearchEvent::ClearSuggestions => choices.clear(),
                SearchEvent::Suggestions(list) | SearchEvent::ChooseLocation { candidates: list, .. } => {
                    for (i, c) in list.iter().enumerate() {
                        eprintln!("    {}. \u{1F4CD} {}", i + 1, c.label);
                    }
                    choices = list;
                }
                SearchEvent::Added { name, latitude, longitude } => {
                    eprintln!("  Added {} ({})", name, placefinder::location::format_coords(latitude, longitude));
                    typed.clear();
                }
                SearchEvent::Message(msg) => eprintln!("  {}", msg),
            },
        }
    }

    for (name, lat, lon) in store.locations() {
        println!("{}\t{}\t{}", name, lat, lon);
    }
    Ok(())
}
