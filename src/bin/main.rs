// Main entry point: replay a betslip scenario through the bet builder engine

use anyhow::{Context, Result};
use bet_builder_engine::api::HttpBetBuilderBackend;
use bet_builder_engine::backend::{BetBuilderBackend, SimulatedBetBuilderBackend};
use bet_builder_engine::config::CliConfig;
use bet_builder_engine::processor::BetBuilderProcessor;
use bet_builder_engine::transformer::BetBuilderTransformer;
use bet_builder_engine::types::{BetBuilderState, BettingTicket};
use bet_builder_engine::{init_history_file, log_betslip_event, log_println};
use serde::Deserialize;
use std::fs::{self, OpenOptions};
use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

/// Scenario file: the betslip the user starts with and each later version of it
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Scenario {
    #[serde(default)]
    initial_tickets: Vec<BettingTicket>,
    #[serde(default)]
    steps: Vec<Vec<BettingTicket>>,
    /// Outcome id pairs the simulated backend refuses to combine
    #[serde(default)]
    incompatible_outcomes: Vec<(String, String)>,
}

fn load_scenario(config: &CliConfig) -> Result<Scenario> {
    let content = fs::read_to_string(&config.scenario)
        .with_context(|| format!("Failed to read scenario file {}", config.scenario.display()))?;
    serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse scenario file {}", config.scenario.display()))
}

/// Mirror the published state into the processor's valid/invalid bookkeeping
fn track_state(processor: &mut BetBuilderProcessor, state: &BetBuilderState) {
    let valid: Vec<BettingTicket> = state.valid_tickets().cloned().collect();
    let invalid: Vec<BettingTicket> = state.invalid_tickets().cloned().collect();
    processor.process_valid_tickets(&valid);
    processor.process_invalid_tickets(&invalid);
    processor.update_calculated_odd(state.odd().unwrap_or(0.0));
}

fn print_state(step: usize, state: &BetBuilderState) {
    println!("Step {:>3}     : {} tickets", step, state.tickets.len());
    for ticket_state in &state.tickets {
        let ticket = ticket_state.ticket();
        println!(
            "   {} {:<12} {:>8}  {}",
            if ticket_state.is_valid() { "✅" } else { "❌" },
            ticket.id,
            ticket.odd.to_string(),
            ticket.outcome_description
        );
    }
    match (state.odd(), state.potential_return()) {
        (Some(odd), Some(potential_return)) => {
            println!("   Odd        : {:.2}", odd);
            println!("   Return     : {}", potential_return);
        }
        _ => println!("   Odd        : -"),
    }
    println!("   Message    : {}", state.message_key().unwrap_or("-"));
    println!("   Bet allowed: {}", state.is_bet_allowed());
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging (tracing to stderr)
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    // Parse CLI arguments
    let config = <CliConfig as clap::Parser>::parse();

    // Validate configuration
    if let Err(e) = config.validate() {
        error!("❌ Configuration error: {}", e);
        std::process::exit(1);
    }

    let log_file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&config.history)
        .with_context(|| format!("Failed to open history file {}", config.history.display()))?;
    init_history_file(log_file);

    let engine_config = config.get_engine_config()?;
    let simulation_config = config.get_simulation_config()?;
    let scenario = load_scenario(&config)?;

    println!("🚀 Starting bet builder replay");
    println!("Scenario     : {}", config.scenario.display());
    println!("Steps        : {}", scenario.steps.len());
    println!("Discard stale: {}", engine_config.discard_stale_responses);
    log_println!("---");
    log_betslip_event(&format!(
        "REPLAY START | scenario={} | steps={} | preview_stake={}",
        config.scenario.display(),
        scenario.steps.len(),
        simulation_config.preview_stake
    ));
    info!("Simulation config: {:?}", simulation_config);

    let backend: Arc<dyn BetBuilderBackend> = match &config.backend_url {
        Some(url) => {
            println!("Backend      : {}", url);
            if !scenario.incompatible_outcomes.is_empty() {
                warn!("incompatibleOutcomes only apply to the simulated backend, ignoring them");
            }
            Arc::new(HttpBetBuilderBackend::new(url.clone(), config.api_key.clone())?)
        }
        None => {
            println!("Backend      : simulated");
            Arc::new(
                scenario
                    .incompatible_outcomes
                    .iter()
                    .fold(SimulatedBetBuilderBackend::new(simulation_config), |backend, (a, b)| {
                        backend.with_incompatible_pair(a, b)
                    }),
            )
        }
    };

    let transformer = BetBuilderTransformer::new(
        BetBuilderState::default(),
        scenario.initial_tickets,
        backend,
        engine_config,
    )
    .await;
    let mut processor = BetBuilderProcessor::new();
    let state = transformer.current_state();
    track_state(&mut processor, &state);
    print_state(0, &state);

    for (index, tickets) in scenario.steps.into_iter().enumerate() {
        if tickets.is_empty() {
            processor.reset_processor();
        }
        transformer.update_betting_tickets(tickets).await;
        let state = transformer.current_state();
        track_state(&mut processor, &state);
        print_state(index + 1, &state);
    }

    let ignored: Vec<&str> = processor.ignored_tickets().iter().map(|t| t.id.as_str()).collect();
    println!("Ignored      : {:?}", ignored);
    log_betslip_event(&format!("PROCESSOR | {}", serde_json::to_string(&processor)?));

    let invalid = transformer.invalid_ticket_ids().await;
    info!("✅ Replay finished | flagged invalid: {:?}", invalid);
    log_betslip_event(&format!("REPLAY END | invalid={:?}", invalid));

    Ok(())
}
