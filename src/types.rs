// Core types shared by the bet builder engine

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::hash::{Hash, Hasher};

use crate::odds::OddFormat;

/// A single selection on the betslip.
///
/// Identity is the `id` alone: two tickets with the same id compare equal even
/// if the price or availability changed in between.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BettingTicket {
    pub id: String,
    pub outcome_id: String,
    pub market_id: String,
    pub match_id: String,
    pub odd: OddFormat,
    #[serde(default = "default_true")]
    pub is_available: bool,
    #[serde(default)]
    pub is_from_bet_builder_market: bool,
    #[serde(default)]
    pub sport_id_code: Option<String>,
    #[serde(default)]
    pub match_description: String,
    #[serde(default)]
    pub market_description: String,
    #[serde(default)]
    pub outcome_description: String,
    #[serde(default)]
    pub home_participant_name: Option<String>,
    #[serde(default)]
    pub away_participant_name: Option<String>,
}

fn default_true() -> bool {
    true
}

impl BettingTicket {
    pub fn new(id: &str, market_id: &str, match_id: &str, odd: OddFormat) -> Self {
        Self {
            id: id.to_string(),
            outcome_id: id.to_string(),
            market_id: market_id.to_string(),
            match_id: match_id.to_string(),
            odd,
            is_available: true,
            is_from_bet_builder_market: true,
            sport_id_code: None,
            match_description: String::new(),
            market_description: String::new(),
            outcome_description: String::new(),
            home_participant_name: None,
            away_participant_name: None,
        }
    }

    pub fn decimal_odd(&self) -> f64 {
        self.odd.decimal_value()
    }
}

impl PartialEq for BettingTicket {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for BettingTicket {}

impl Hash for BettingTicket {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

/// Ticket tagged with the engine's current verdict on it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", tag = "state", content = "ticket")]
pub enum BetBuilderTicketState {
    Valid(BettingTicket),
    Invalid(BettingTicket),
}

impl BetBuilderTicketState {
    pub fn ticket(&self) -> &BettingTicket {
        match self {
            BetBuilderTicketState::Valid(ticket) | BetBuilderTicketState::Invalid(ticket) => ticket,
        }
    }

    pub fn is_valid(&self) -> bool {
        matches!(self, BetBuilderTicketState::Valid(_))
    }
}

pub const MULTIPLE_MIN_SELECTION_TOTAL_ERROR: &str = "multiple_min_selection_total_error";
pub const SOME_SELECTIONS_UNAVAILABLE: &str = "some_selections_unavailable";
pub const MIX_MATCH_MIN_COMPATIBLE_SELECTIONS: &str = "mix_match_min_compatible_selections";
pub const MIX_MATCH_COMPATIBLE_SELECTIONS_WARNING: &str = "mix_match_compatible_selections_warning";
pub const MIX_MATCH_SELECTIONS_DIFFERENT_EVENTS_ERROR: &str = "mix_match_selections_different_events_error";
pub const MIX_MATCH_SOME_SELECTIONS_NOT_CUSTOM_AVAILABLE: &str = "mix_match_some_selections_not_custom_available";

/// User-facing message, carried as a localization key
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", tag = "kind", content = "key")]
pub enum BetBuilderMessage {
    Error(String),
    Warning(String),
}

impl BetBuilderMessage {
    pub fn error(key: &str) -> Self {
        BetBuilderMessage::Error(key.to_string())
    }

    pub fn warning(key: &str) -> Self {
        BetBuilderMessage::Warning(key.to_string())
    }

    pub fn key(&self) -> &str {
        match self {
            BetBuilderMessage::Error(key) | BetBuilderMessage::Warning(key) => key,
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, BetBuilderMessage::Error(_))
    }

    pub fn is_warning(&self) -> bool {
        matches!(self, BetBuilderMessage::Warning(_))
    }
}

/// Snapshot published by the transformer after every evaluation.
///
/// `odd` and `potential_return` are only ever set together, so
/// [`BetBuilderState::is_bet_allowed`] can be derived instead of stored.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", try_from = "StateSnapshot")]
pub struct BetBuilderState {
    pub tickets: Vec<BetBuilderTicketState>,
    odd: Option<f64>,
    potential_return: Option<Decimal>,
    pub message: Option<BetBuilderMessage>,
}

impl BetBuilderState {
    pub fn new(
        tickets: Vec<BetBuilderTicketState>,
        calculation: Option<&BetBuilderPotentialReturn>,
        message: Option<BetBuilderMessage>,
    ) -> Self {
        Self {
            tickets,
            odd: calculation.map(|c| c.calculated_odds),
            potential_return: calculation.map(|c| c.potential_return),
            message,
        }
    }

    pub fn odd(&self) -> Option<f64> {
        self.odd
    }

    pub fn potential_return(&self) -> Option<Decimal> {
        self.potential_return
    }

    pub fn is_bet_allowed(&self) -> bool {
        self.odd.is_some() && self.potential_return.is_some()
    }

    pub fn message_key(&self) -> Option<&str> {
        self.message.as_ref().map(BetBuilderMessage::key)
    }

    pub fn valid_tickets(&self) -> impl Iterator<Item = &BettingTicket> {
        self.tickets.iter().filter(|t| t.is_valid()).map(BetBuilderTicketState::ticket)
    }

    pub fn invalid_tickets(&self) -> impl Iterator<Item = &BettingTicket> {
        self.tickets.iter().filter(|t| !t.is_valid()).map(BetBuilderTicketState::ticket)
    }
}

/// Wire shape of [`BetBuilderState`], checked before it becomes a state
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct StateSnapshot {
    #[serde(default)]
    tickets: Vec<BetBuilderTicketState>,
    #[serde(default)]
    odd: Option<f64>,
    #[serde(default)]
    potential_return: Option<Decimal>,
    #[serde(default)]
    message: Option<BetBuilderMessage>,
}

impl TryFrom<StateSnapshot> for BetBuilderState {
    type Error = String;

    fn try_from(snapshot: StateSnapshot) -> Result<Self, Self::Error> {
        if snapshot.odd.is_some() != snapshot.potential_return.is_some() {
            return Err("odd and potentialReturn must be both set or both absent".to_string());
        }
        Ok(Self {
            tickets: snapshot.tickets,
            odd: snapshot.odd,
            potential_return: snapshot.potential_return,
            message: snapshot.message,
        })
    }
}

/// One selection as sent to the potential-return endpoint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BetSelection {
    pub event_id: String,
    pub outcome_id: String,
    pub odd: OddFormat,
    pub stake: Decimal,
    pub sport_id_code: Option<String>,
}

impl BetSelection {
    pub fn from_ticket(ticket: &BettingTicket, stake: Decimal) -> Self {
        Self {
            event_id: ticket.match_id.clone(),
            outcome_id: ticket.outcome_id.clone(),
            odd: ticket.odd,
            stake,
            sport_id_code: ticket.sport_id_code.clone(),
        }
    }
}

/// Result of a successful potential-return calculation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BetBuilderPotentialReturn {
    pub potential_return: Decimal,
    pub calculated_odds: f64,
}
