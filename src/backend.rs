// Betting backend used by the bet builder to price combined selections

use async_trait::async_trait;
use rust_decimal::Decimal;
use std::collections::HashSet;
use tracing::debug;

use crate::config::SimulationConfig;
use crate::errors::BetslipError;
use crate::odds::combined_decimal_odd;
use crate::types::{BetBuilderPotentialReturn, BetSelection};

/// The single call the bet builder makes to the outside world
#[async_trait]
pub trait BetBuilderBackend: Send + Sync + 'static {
    async fn calculate_bet_builder_potential_return(
        &self,
        selections: &[BetSelection],
        stake: Decimal,
    ) -> Result<BetBuilderPotentialReturn, BetslipError>;
}

/// Offline backend that prices bet builder combos locally.
///
/// Combined odd is the product of the selection odds. Selections from
/// different events, pairs listed as incompatible, or more selections than
/// `max_selections` are rejected as invalid bet builder selections.
pub struct SimulatedBetBuilderBackend {
    config: SimulationConfig,
    incompatible_outcomes: HashSet<(String, String)>,
}

impl SimulatedBetBuilderBackend {
    pub fn new(config: SimulationConfig) -> Self {
        Self {
            config,
            incompatible_outcomes: HashSet::new(),
        }
    }

    /// Mark two outcomes as not combinable (order does not matter)
    pub fn with_incompatible_pair(mut self, first: &str, second: &str) -> Self {
        self.incompatible_outcomes.insert(Self::pair_key(first, second));
        self
    }

    fn pair_key(first: &str, second: &str) -> (String, String) {
        if first <= second {
            (first.to_string(), second.to_string())
        } else {
            (second.to_string(), first.to_string())
        }
    }

    fn has_incompatible_pair(&self, selections: &[BetSelection]) -> bool {
        selections.iter().enumerate().any(|(i, a)| {
            selections[i + 1..]
                .iter()
                .any(|b| self.incompatible_outcomes.contains(&Self::pair_key(&a.outcome_id, &b.outcome_id)))
        })
    }
}

#[async_trait]
impl BetBuilderBackend for SimulatedBetBuilderBackend {
    async fn calculate_bet_builder_potential_return(
        &self,
        selections: &[BetSelection],
        stake: Decimal,
    ) -> Result<BetBuilderPotentialReturn, BetslipError> {
        if selections.is_empty() {
            return Err(BetslipError::EmptyBetslip);
        }
        if selections.len() < 2 {
            return Err(BetslipError::InsufficientSelections);
        }
        if selections.len() > self.config.max_selections {
            return Err(BetslipError::InvalidBetBuilderSelections);
        }

        let event_id = &selections[0].event_id;
        if selections.iter().any(|s| &s.event_id != event_id) || self.has_incompatible_pair(selections) {
            return Err(BetslipError::InvalidBetBuilderSelections);
        }

        let calculated_odds = (combined_decimal_odd(selections.iter().map(|s| &s.odd)) * 100.0).round() / 100.0;
        let effective_stake = if stake > Decimal::ZERO { stake } else { self.config.preview_stake };
        let potential_return = Decimal::try_from(calculated_odds)
            .map(|odd| (odd * effective_stake).round_dp(2))
            .map_err(|_| BetslipError::BetPlacementError)?;

        debug!(
            "Simulated bet builder price: {} selections | odd={:.2} | return={}",
            selections.len(),
            calculated_odds,
            potential_return
        );

        Ok(BetBuilderPotentialReturn {
            potential_return,
            calculated_odds,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::odds::OddFormat;
    use rust_decimal_macros::dec;

    fn selection(event: &str, outcome: &str, odd: f64) -> BetSelection {
        BetSelection {
            event_id: event.to_string(),
            outcome_id: outcome.to_string(),
            odd: OddFormat::from_decimal(odd),
            stake: Decimal::ZERO,
            sport_id_code: None,
        }
    }

    fn backend() -> SimulatedBetBuilderBackend {
        SimulatedBetBuilderBackend::new(SimulationConfig {
            preview_stake: dec!(10),
            max_selections: 4,
        })
    }

    #[tokio::test]
    async fn test_prices_same_event_selections() {
        let result = backend()
            .calculate_bet_builder_potential_return(&[selection("e1", "a", 1.75), selection("e1", "b", 2.0)], Decimal::ZERO)
            .await
            .unwrap();
        assert!((result.calculated_odds - 3.5).abs() < 1e-9);
        assert_eq!(result.potential_return, dec!(35.00));
    }

    #[tokio::test]
    async fn test_explicit_stake_wins_over_preview_stake() {
        let result = backend()
            .calculate_bet_builder_potential_return(&[selection("e1", "a", 2.0), selection("e1", "b", 2.0)], dec!(5))
            .await
            .unwrap();
        assert_eq!(result.potential_return, dec!(20.00));
    }

    #[tokio::test]
    async fn test_preconditions() {
        let b = backend();
        assert_eq!(
            b.calculate_bet_builder_potential_return(&[], Decimal::ZERO).await,
            Err(BetslipError::EmptyBetslip)
        );
        assert_eq!(
            b.calculate_bet_builder_potential_return(&[selection("e1", "a", 2.0)], Decimal::ZERO).await,
            Err(BetslipError::InsufficientSelections)
        );
    }

    #[tokio::test]
    async fn test_rejects_incompatible_combinations() {
        let b = backend().with_incompatible_pair("b", "a");
        assert_eq!(
            b.calculate_bet_builder_potential_return(&[selection("e1", "a", 2.0), selection("e1", "b", 2.0)], Decimal::ZERO)
                .await,
            Err(BetslipError::InvalidBetBuilderSelections)
        );
        assert_eq!(
            b.calculate_bet_builder_potential_return(&[selection("e1", "a", 2.0), selection("e2", "c", 2.0)], Decimal::ZERO)
                .await,
            Err(BetslipError::InvalidBetBuilderSelections)
        );
    }

    #[tokio::test]
    async fn test_rejects_too_many_selections() {
        let selections: Vec<BetSelection> =
            ["a", "b", "c", "d", "e"].iter().map(|o| selection("e1", o, 1.2)).collect();
        assert_eq!(
            backend().calculate_bet_builder_potential_return(&selections, Decimal::ZERO).await,
            Err(BetslipError::InvalidBetBuilderSelections)
        );
    }
}
