//! Classroom trace replay
//!
//! Replays a JSON-lines trace of collaborator events against the real leave
//! coordinator and prints which rule ended the session.
//!
//! ```text
//! classroom-replay <trace.jsonl>
//! ```
//!
//! Policy (grace windows, roster heuristics) is read from the same
//! `CLASSROOM_*` environment variables as the library.

#![warn(clippy::pedantic)]

use classroom_client::config::Config;
use classroom_client::replay::{parse_trace, run_replay, ReplayError};
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "classroom_client=debug,classroom=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let Some(path) = std::env::args().nth(1) else {
        error!("Usage: classroom-replay <trace.jsonl>");
        return Err("missing trace path".into());
    };

    let config = Config::from_env().map_err(|e| {
        error!("Failed to load configuration: {}", e);
        e
    })?;

    info!(
        trace = %path,
        no_peers_grace = ?config.policy.no_peers_grace,
        host_left_grace = ?config.policy.host_left_grace,
        host_absent_grace = ?config.policy.host_absent_grace,
        roster_rules_require_disconnect = config.policy.roster_rules_require_disconnect,
        "Starting trace replay"
    );

    let input = tokio::fs::read_to_string(&path)
        .await
        .map_err(|e| ReplayError::Io(format!("{path}: {e}")))?;
    let steps = parse_trace(&input)?;

    let report = run_replay(&config, steps).await?;

    match &report.outcome {
        Some(outcome) => info!(
            events = report.events_replayed,
            trigger = outcome.trigger.as_str(),
            message = %outcome.message,
            redirected_to = report.redirected_to.as_deref().unwrap_or("none"),
            "Session ended"
        ),
        None => info!(
            events = report.events_replayed,
            "Trace ended without any end condition firing"
        ),
    }

    Ok(())
}
