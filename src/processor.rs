// Bookkeeping of tickets flagged invalid by the server vs tickets known to be valid

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::HashSet;
use tokio::sync::watch;
use tracing::debug;

use crate::types::BettingTicket;

/// Tracks which betslip tickets are valid, which the server rejected, and the
/// resulting "ignored" set (invalid minus valid, ordered by id).
///
/// Persisted with serde; decoding rebuilds the invalid-ticket stream seeded
/// with the stored value.
pub struct BetBuilderProcessor {
    calculated_odd: f64,
    valid_tickets: Vec<BettingTicket>,
    invalid_tickets: watch::Sender<Vec<BettingTicket>>,
    ignored_tickets: Vec<BettingTicket>,
}

impl BetBuilderProcessor {
    pub fn new() -> Self {
        Self::from_parts(0.0, Vec::new(), Vec::new(), Vec::new())
    }

    fn from_parts(
        calculated_odd: f64,
        valid_tickets: Vec<BettingTicket>,
        invalid_tickets: Vec<BettingTicket>,
        ignored_tickets: Vec<BettingTicket>,
    ) -> Self {
        let (invalid_tx, _invalid_rx) = watch::channel(invalid_tickets);
        Self {
            calculated_odd,
            valid_tickets,
            invalid_tickets: invalid_tx,
            ignored_tickets,
        }
    }

    pub fn calculated_odd(&self) -> f64 {
        self.calculated_odd
    }

    pub fn update_calculated_odd(&mut self, odd: f64) {
        self.calculated_odd = odd;
    }

    pub fn valid_tickets(&self) -> &[BettingTicket] {
        &self.valid_tickets
    }

    pub fn invalid_tickets(&self) -> Vec<BettingTicket> {
        self.invalid_tickets.borrow().clone()
    }

    pub fn ignored_tickets(&self) -> &[BettingTicket] {
        &self.ignored_tickets
    }

    /// Stream of the invalid tickets; the receiver starts at the current value
    pub fn subscribe_invalid_tickets(&self) -> watch::Receiver<Vec<BettingTicket>> {
        self.invalid_tickets.subscribe()
    }

    pub fn process_valid_tickets(&mut self, tickets: &[BettingTicket]) {
        self.valid_tickets = unique_by_id(tickets.iter());
        self.recompute_ignored_tickets();
    }

    /// Tickets that are also in the valid set are dropped: valid wins.
    pub fn process_invalid_tickets(&mut self, tickets: &[BettingTicket]) {
        let valid_ids: HashSet<&str> = self.valid_tickets.iter().map(|t| t.id.as_str()).collect();
        let invalid = unique_by_id(tickets.iter().filter(|t| !valid_ids.contains(t.id.as_str())));
        self.invalid_tickets.send_replace(invalid);
        self.recompute_ignored_tickets();
    }

    pub fn reset_processor(&mut self) {
        self.calculated_odd = 0.0;
        self.valid_tickets.clear();
        self.invalid_tickets.send_replace(Vec::new());
        self.ignored_tickets.clear();
    }

    fn recompute_ignored_tickets(&mut self) {
        let valid_ids: HashSet<&str> = self.valid_tickets.iter().map(|t| t.id.as_str()).collect();
        let mut ignored: Vec<BettingTicket> = self
            .invalid_tickets
            .borrow()
            .iter()
            .filter(|t| !valid_ids.contains(t.id.as_str()))
            .cloned()
            .collect();
        // Plain string order ("10" < "9"), the UI relies on it
        ignored.sort_by(|a, b| a.id.cmp(&b.id));

        debug!(
            "Bet builder processor: {} valid | {} ignored",
            self.valid_tickets.len(),
            ignored.len()
        );
        self.ignored_tickets = ignored;
    }
}

impl Default for BetBuilderProcessor {
    fn default() -> Self {
        Self::new()
    }
}

fn unique_by_id<'a, I>(tickets: I) -> Vec<BettingTicket>
where
    I: Iterator<Item = &'a BettingTicket>,
{
    let mut seen = HashSet::new();
    tickets.filter(|t| seen.insert(t.id.clone())).cloned().collect()
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ProcessorSnapshot {
    calculated_odd: f64,
    valid_tickets: Vec<BettingTicket>,
    ignored_tickets: Vec<BettingTicket>,
    invalid_tickets: Vec<BettingTicket>,
}

impl Serialize for BetBuilderProcessor {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        ProcessorSnapshot {
            calculated_odd: self.calculated_odd,
            valid_tickets: self.valid_tickets.clone(),
            ignored_tickets: self.ignored_tickets.clone(),
            invalid_tickets: self.invalid_tickets(),
        }
        .serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for BetBuilderProcessor {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let snapshot = ProcessorSnapshot::deserialize(deserializer)?;
        Ok(Self::from_parts(
            snapshot.calculated_odd,
            snapshot.valid_tickets,
            snapshot.invalid_tickets,
            snapshot.ignored_tickets,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::odds::OddFormat;

    fn ticket(id: &str) -> BettingTicket {
        BettingTicket::new(id, "m1", "e1", OddFormat::from_decimal(1.5))
    }

    fn ids(tickets: &[BettingTicket]) -> Vec<&str> {
        tickets.iter().map(|t| t.id.as_str()).collect()
    }

    #[test]
    fn test_ignored_is_invalid_minus_valid_sorted() {
        let mut processor = BetBuilderProcessor::new();
        processor.process_invalid_tickets(&[ticket("9"), ticket("10"), ticket("2"), ticket("5")]);
        processor.process_valid_tickets(&[ticket("5"), ticket("7")]);

        assert_eq!(ids(processor.ignored_tickets()), vec!["10", "2", "9"]);
        assert!(processor
            .ignored_tickets()
            .windows(2)
            .all(|w| w[0].id < w[1].id));
    }

    #[test]
    fn test_valid_wins_on_conflict() {
        let mut processor = BetBuilderProcessor::new();
        processor.process_valid_tickets(&[ticket("a")]);
        processor.process_invalid_tickets(&[ticket("a"), ticket("b")]);

        assert_eq!(ids(&processor.invalid_tickets()), vec!["b"]);
        assert_eq!(ids(processor.ignored_tickets()), vec!["b"]);
    }

    #[test]
    fn test_duplicates_are_collapsed() {
        let mut processor = BetBuilderProcessor::new();
        processor.process_invalid_tickets(&[ticket("b"), ticket("b"), ticket("a")]);
        assert_eq!(ids(processor.ignored_tickets()), vec!["a", "b"]);
    }

    #[test]
    fn test_reset_clears_everything() {
        let mut processor = BetBuilderProcessor::new();
        processor.update_calculated_odd(4.2);
        processor.process_invalid_tickets(&[ticket("a")]);
        processor.process_valid_tickets(&[ticket("b")]);

        processor.reset_processor();
        assert_eq!(processor.calculated_odd(), 0.0);
        assert!(processor.valid_tickets().is_empty());
        assert!(processor.invalid_tickets().is_empty());
        assert!(processor.ignored_tickets().is_empty());
    }

    #[test]
    fn test_invalid_stream_follows_updates() {
        let mut processor = BetBuilderProcessor::new();
        let mut rx = processor.subscribe_invalid_tickets();
        assert!(rx.borrow().is_empty());

        processor.process_invalid_tickets(&[ticket("x")]);
        assert!(rx.has_changed().unwrap());
        assert_eq!(ids(&rx.borrow_and_update()), vec!["x"]);
    }

    #[test]
    fn test_serde_round_trip_restores_live_processor() {
        let mut processor = BetBuilderProcessor::new();
        processor.update_calculated_odd(3.5);
        processor.process_invalid_tickets(&[ticket("c"), ticket("a")]);
        processor.process_valid_tickets(&[ticket("b")]);

        let json = serde_json::to_string(&processor).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert!(value.get("calculatedOdd").is_some());
        assert!(value.get("validTickets").is_some());
        assert!(value.get("ignoredTickets").is_some());
        assert!(value.get("invalidTickets").is_some());

        let mut restored: BetBuilderProcessor = serde_json::from_str(&json).unwrap();
        assert_eq!(restored.calculated_odd(), 3.5);
        assert_eq!(ids(restored.valid_tickets()), vec!["b"]);
        assert_eq!(ids(restored.ignored_tickets()), vec!["a", "c"]);

        let rx = restored.subscribe_invalid_tickets();
        assert_eq!(ids(&rx.borrow()), vec!["c", "a"]);

        restored.process_valid_tickets(&[ticket("a")]);
        assert_eq!(ids(restored.ignored_tickets()), vec!["c"]);
    }
}
