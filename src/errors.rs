// Error taxonomy for betslip calculations and its mapping from transport errors

use thiserror::Error;

/// Errors the bet builder engine switches on
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BetslipError {
    #[error("betslip is empty")]
    EmptyBetslip,
    #[error("not enough selections for a bet builder bet")]
    InsufficientSelections,
    #[error("selections cannot be combined in a bet builder bet")]
    InvalidBetBuilderSelections,
    #[error("request forbidden")]
    ForbiddenRequest,
    #[error("bet placement error: {message}")]
    BetPlacementDetailedError { message: String },
    #[error("bet needs user confirmation: {details}")]
    BetNeedsUserConfirmation { details: String },
    #[error("bet placement error")]
    BetPlacementError,
}

impl BetslipError {
    /// Structural errors say nothing about which selection is at fault
    pub fn is_structural(&self) -> bool {
        matches!(self, BetslipError::EmptyBetslip | BetslipError::InsufficientSelections)
    }
}

/// Errors reported by the betting service layer
#[derive(Debug, Error)]
pub enum ServiceProviderError {
    #[error("forbidden")]
    Forbidden,
    #[error("error message: {0}")]
    ErrorMessage(String),
    #[error("bet not placed: {0}")]
    NotPlacedBet(String),
    #[error("bet needs user confirmation: {0}")]
    BetNeedsUserConfirmation(String),
    #[error("invalid bet builder selections")]
    InvalidBetBuilderSelections,
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("unknown error")]
    Unknown,
}

/// Error code the service uses when bet builder selections conflict
pub const INVALID_SELECTIONS_CODE: &str = "bet_builder_invalid_selections";

impl From<ServiceProviderError> for BetslipError {
    fn from(error: ServiceProviderError) -> Self {
        match error {
            ServiceProviderError::Forbidden => BetslipError::ForbiddenRequest,
            ServiceProviderError::ErrorMessage(message) | ServiceProviderError::NotPlacedBet(message) => {
                // Keyed messages ("bet_error_*", "no_funds") are localized by the caller
                if message.contains(INVALID_SELECTIONS_CODE) {
                    BetslipError::InvalidBetBuilderSelections
                } else {
                    BetslipError::BetPlacementDetailedError { message }
                }
            }
            ServiceProviderError::BetNeedsUserConfirmation(details) => {
                BetslipError::BetNeedsUserConfirmation { details }
            }
            ServiceProviderError::InvalidBetBuilderSelections => BetslipError::InvalidBetBuilderSelections,
            ServiceProviderError::Http(_) | ServiceProviderError::Json(_) | ServiceProviderError::Unknown => {
                BetslipError::BetPlacementError
            }
        }
    }
}
