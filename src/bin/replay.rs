//! Replays the latest user turn of a stored conversation and prints the
//! events the processor would append, one JSON object per line.
//!
//! Usage: `flowstack-replay [FLOWS_JSON] [TRACKER_JSON]`

use flowstack::config::ReplayConfig;
use flowstack::{execute_commands, flows_updated_by, FlowsList, Tracker};
use std::io::Write;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Logs go to stderr so stdout stays a clean event stream
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "flowstack=info,flowstack_replay=info".into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_current_span(false)
                .with_span_list(false)
                .with_writer(std::io::stderr),
        )
        .init();

    let config = ReplayConfig::from_env()?;

    let flows = FlowsList::load(&config.flows_path)?;
    let tracker = Tracker::load(&config.tracker_path, config.sender_id.clone())?;
    tracing::info!(
        flows = flows.len(),
        events = tracker.events().len(),
        sender_id = %tracker.sender_id(),
        "Replaying latest turn"
    );

    let events = execute_commands(&tracker, &flows)?;
    let updated = flows_updated_by(&tracker, &events)?;
    tracing::info!(updated_flows = ?updated, "Flows changed by this turn");

    let mut out = std::io::stdout().lock();
    for event in &events {
        serde_json::to_writer(&mut out, event)?;
        writeln!(out)?;
    }
    Ok(())
}
