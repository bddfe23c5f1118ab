// Bet builder state machine: reconciles the betslip with server-side compatibility checks

use std::cmp::Ordering;
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::{watch, Mutex};
use tracing::{debug, info, warn};

use crate::backend::BetBuilderBackend;
use crate::config::EngineConfig;
use crate::errors::BetslipError;
use crate::log_betslip_event;
use crate::types::{
    BetBuilderMessage, BetBuilderPotentialReturn, BetBuilderState, BetBuilderTicketState, BetSelection,
    BettingTicket, MIX_MATCH_COMPATIBLE_SELECTIONS_WARNING, MIX_MATCH_MIN_COMPATIBLE_SELECTIONS,
    MIX_MATCH_SELECTIONS_DIFFERENT_EVENTS_ERROR, MIX_MATCH_SOME_SELECTIONS_NOT_CUSTOM_AVAILABLE,
    MULTIPLE_MIN_SELECTION_TOTAL_ERROR, SOME_SELECTIONS_UNAVAILABLE,
};

/// State owned by one transformer, only touched through its methods
struct EngineState {
    tickets: Vec<BettingTicket>,
    /// Ids the backend is believed to reject when combined with the rest
    invalid_ticket_ids: HashSet<String>,
    /// Bumped on every ticket update, used to spot stale responses
    generation: u64,
}

/// Reactive bet builder engine.
///
/// Every ticket update is evaluated by comparing the new ticket count with the
/// previous one (not the content):
/// - more tickets: price only the tickets not already known to be invalid,
///   and blame the last ticket if the backend rejects the combination;
/// - fewer tickets: price everything, falling back once to the first strategy
///   if the combination is still rejected;
/// - same count: nothing is evaluated.
///
/// Failures never escape; they end up as a [`BetBuilderState`] without odd
/// and potential return plus a message key.
pub struct BetBuilderTransformer {
    backend: Arc<dyn BetBuilderBackend>,
    config: EngineConfig,
    state: Mutex<EngineState>,
    state_tx: watch::Sender<BetBuilderState>,
}

impl BetBuilderTransformer {
    /// Publishes `initial_state`, then evaluates `initial_tickets` as an
    /// addition to an empty betslip.
    pub async fn new(
        initial_state: BetBuilderState,
        initial_tickets: Vec<BettingTicket>,
        backend: Arc<dyn BetBuilderBackend>,
        config: EngineConfig,
    ) -> Self {
        let (state_tx, _state_rx) = watch::channel(initial_state);
        let transformer = Self {
            backend,
            config,
            state: Mutex::new(EngineState {
                tickets: initial_tickets.clone(),
                invalid_ticket_ids: HashSet::new(),
                generation: 0,
            }),
            state_tx,
        };

        if initial_tickets.is_empty() {
            let state = transformer.state.lock().await;
            transformer.publish_state(&state, &initial_tickets, None);
            drop(state);
        } else {
            transformer.evaluate(0, initial_tickets, 0).await;
        }
        transformer
    }

    /// Receiver that always holds the latest published state
    pub fn subscribe(&self) -> watch::Receiver<BetBuilderState> {
        self.state_tx.subscribe()
    }

    pub fn current_state(&self) -> BetBuilderState {
        self.state_tx.borrow().clone()
    }

    pub async fn betting_tickets(&self) -> Vec<BettingTicket> {
        self.state.lock().await.tickets.clone()
    }

    /// Ids currently flagged invalid, sorted
    pub async fn invalid_ticket_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.state.lock().await.invalid_ticket_ids.iter().cloned().collect();
        ids.sort();
        ids
    }

    /// Replace the betslip and re-evaluate it
    pub async fn update_betting_tickets(&self, tickets: Vec<BettingTicket>) {
        let (previous_count, generation) = {
            let mut state = self.state.lock().await;
            let previous_count = state.tickets.len();
            state.tickets = tickets.clone();
            state.generation += 1;
            if tickets.is_empty() {
                state.invalid_ticket_ids.clear();
            }
            (previous_count, state.generation)
        };

        self.evaluate(previous_count, tickets, generation).await;
    }

    async fn evaluate(&self, previous_count: usize, tickets: Vec<BettingTicket>, generation: u64) {
        match tickets.len().cmp(&previous_count) {
            Ordering::Greater => {
                debug!("Betslip grew {} -> {}, pricing known-valid tickets", previous_count, tickets.len());
                self.request_return_for_valid_tickets(&tickets, generation).await;
            }
            Ordering::Less => {
                debug!("Betslip shrank {} -> {}, pricing all tickets", previous_count, tickets.len());
                self.request_return_for_all_tickets(&tickets, generation).await;
            }
            Ordering::Equal => {
                debug!("Betslip size unchanged ({}), skipping evaluation", tickets.len());
            }
        }
    }

    /// Price the tickets not flagged invalid; on rejection blame the last ticket
    async fn request_return_for_valid_tickets(&self, tickets: &[BettingTicket], generation: u64) {
        let valid_tickets: Vec<BettingTicket> = {
            let state = self.state.lock().await;
            tickets
                .iter()
                .filter(|t| !state.invalid_ticket_ids.contains(&t.id))
                .cloned()
                .collect()
        };

        let result = self.calculate_potential_return(&valid_tickets).await;

        let mut state = self.state.lock().await;
        if self.is_stale(&state, generation) {
            return;
        }

        match result {
            Ok(calculation) => {
                for ticket in &valid_tickets {
                    state.invalid_ticket_ids.remove(&ticket.id);
                }
                self.publish_state(&state, tickets, Some(&calculation));
            }
            Err(BetslipError::InvalidBetBuilderSelections) => {
                if let Some(last) = tickets.last() {
                    info!("Bet builder rejected selections, flagging last ticket {}", last.id);
                    state.invalid_ticket_ids.insert(last.id.clone());
                }
                self.publish_state(&state, tickets, None);
            }
            Err(error) => {
                if !error.is_structural() {
                    warn!("Bet builder potential return failed: {}", error);
                }
                self.publish_state(&state, tickets, None);
            }
        }
    }

    /// Price every ticket; a rejection falls back once to the valid-tickets path
    async fn request_return_for_all_tickets(&self, tickets: &[BettingTicket], generation: u64) {
        let result = self.calculate_potential_return(tickets).await;

        match result {
            Ok(calculation) => {
                let mut state = self.state.lock().await;
                if self.is_stale(&state, generation) {
                    return;
                }
                for ticket in tickets {
                    state.invalid_ticket_ids.remove(&ticket.id);
                }
                self.publish_state(&state, tickets, Some(&calculation));
            }
            Err(BetslipError::InvalidBetBuilderSelections) => {
                let stale = {
                    let state = self.state.lock().await;
                    self.is_stale(&state, generation)
                };
                if stale {
                    return;
                }
                debug!("Full betslip rejected, retrying with known-valid tickets");
                self.request_return_for_valid_tickets(tickets, generation).await;
            }
            Err(error) => {
                let state = self.state.lock().await;
                if self.is_stale(&state, generation) {
                    return;
                }
                if !error.is_structural() {
                    warn!("Bet builder potential return failed: {}", error);
                }
                self.publish_state(&state, tickets, None);
            }
        }
    }

    async fn calculate_potential_return(
        &self,
        tickets: &[BettingTicket],
    ) -> Result<BetBuilderPotentialReturn, BetslipError> {
        if tickets.is_empty() {
            return Err(BetslipError::EmptyBetslip);
        }
        if tickets.len() < 2 {
            return Err(BetslipError::InsufficientSelections);
        }

        let stake = self.config.preview_stake;
        let selections: Vec<BetSelection> = tickets.iter().map(|t| BetSelection::from_ticket(t, stake)).collect();
        self.backend.calculate_bet_builder_potential_return(&selections, stake).await
    }

    fn is_stale(&self, state: &EngineState, generation: u64) -> bool {
        if self.config.discard_stale_responses && generation != state.generation {
            debug!(
                "Discarding stale bet builder response (generation {} < {})",
                generation, state.generation
            );
            return true;
        }
        false
    }

    fn publish_state(
        &self,
        state: &EngineState,
        tickets: &[BettingTicket],
        calculation: Option<&BetBuilderPotentialReturn>,
    ) {
        let ticket_states: Vec<BetBuilderTicketState> = tickets
            .iter()
            .map(|ticket| {
                if state.invalid_ticket_ids.contains(&ticket.id) {
                    BetBuilderTicketState::Invalid(ticket.clone())
                } else {
                    BetBuilderTicketState::Valid(ticket.clone())
                }
            })
            .collect();
        let message = message_for_tickets(tickets, &state.invalid_ticket_ids);
        let new_state = BetBuilderState::new(ticket_states, calculation, message);

        log_betslip_event(&format!(
            "STATE | tickets={} | invalid={} | odd={:?} | return={:?} | message={}",
            tickets.len(),
            new_state.invalid_tickets().count(),
            new_state.odd(),
            new_state.potential_return(),
            new_state.message_key().unwrap_or("-")
        ));
        self.state_tx.send_replace(new_state);
    }
}

/// Message for the current betslip; the first matching rule wins.
pub fn message_for_tickets(
    tickets: &[BettingTicket],
    invalid_ticket_ids: &HashSet<String>,
) -> Option<BetBuilderMessage> {
    if tickets.len() < 2 {
        return Some(BetBuilderMessage::error(MULTIPLE_MIN_SELECTION_TOTAL_ERROR));
    }

    let unavailable = tickets.iter().filter(|t| !t.is_available).count();
    if unavailable > 1 {
        return Some(BetBuilderMessage::error(SOME_SELECTIONS_UNAVAILABLE));
    }

    let bettable = tickets.iter().filter(|t| !invalid_ticket_ids.contains(&t.id)).count();
    if bettable < 2 {
        return Some(BetBuilderMessage::error(MIX_MATCH_MIN_COMPATIBLE_SELECTIONS));
    }
    if bettable < tickets.len() {
        return Some(BetBuilderMessage::warning(MIX_MATCH_COMPATIBLE_SELECTIONS_WARNING));
    }

    let match_id = &tickets[0].match_id;
    if tickets.iter().any(|t| &t.match_id != match_id) {
        return Some(BetBuilderMessage::error(MIX_MATCH_SELECTIONS_DIFFERENT_EVENTS_ERROR));
    }
    if !tickets.iter().all(|t| t.is_from_bet_builder_market) {
        return Some(BetBuilderMessage::error(MIX_MATCH_SOME_SELECTIONS_NOT_CUSTOM_AVAILABLE));
    }

    None
}
