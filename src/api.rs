// HTTP client for the bet builder potential-return endpoint

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use crate::backend::BetBuilderBackend;
use crate::errors::{BetslipError, ServiceProviderError, INVALID_SELECTIONS_CODE};
use crate::types::{BetBuilderPotentialReturn, BetSelection};

#[derive(Debug, Serialize)]
struct PotentialReturnRequest<'a> {
    selections: &'a [BetSelection],
    stake: Decimal,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PotentialReturnResponse {
    potential_return: Decimal,
    calculated_odds: f64,
}

/// Live backend; the `bet-builder` binary uses it when `--backend-url` is set
pub struct HttpBetBuilderBackend {
    client: Client,
    base_url: String,
    api_key: Option<String>,
}

impl HttpBetBuilderBackend {
    pub fn new(base_url: String, api_key: Option<String>) -> Result<Self, ServiceProviderError> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(10))
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
        })
    }

    pub fn endpoint(&self) -> String {
        format!("{}/betbuilder/potential-return", self.base_url)
    }

    /// POST the selections and decode the calculated odd / potential return
    pub async fn request_potential_return(
        &self,
        selections: &[BetSelection],
        stake: Decimal,
    ) -> Result<BetBuilderPotentialReturn, ServiceProviderError> {
        let url = self.endpoint();
        let mut request = self.client.post(&url).json(&PotentialReturnRequest { selections, stake });

        if let Some(api_key) = &self.api_key {
            request = request.header("Authorization", format!("Bearer {}", api_key));
        }

        let response = request.send().await?;
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            warn!("Potential return request failed (status: {})", status);
            return Err(classify_error_response(status, &body));
        }

        let parsed: PotentialReturnResponse = serde_json::from_str(&body)?;
        debug!(
            "Potential return for {} selections: odd={:.2} return={}",
            selections.len(),
            parsed.calculated_odds,
            parsed.potential_return
        );
        Ok(BetBuilderPotentialReturn {
            potential_return: parsed.potential_return,
            calculated_odds: parsed.calculated_odds,
        })
    }
}

#[async_trait]
impl BetBuilderBackend for HttpBetBuilderBackend {
    async fn calculate_bet_builder_potential_return(
        &self,
        selections: &[BetSelection],
        stake: Decimal,
    ) -> Result<BetBuilderPotentialReturn, BetslipError> {
        self.request_potential_return(selections, stake)
            .await
            .map_err(BetslipError::from)
    }
}

/// Map a non-success HTTP response to a service error.
///
/// 403 is always `Forbidden`. Otherwise the body's `message` (or `error`)
/// field decides: the invalid-selections code, a confirmation request, or a
/// plain error message. 400 bodies without a message become `NotPlacedBet`.
pub fn classify_error_response(status: StatusCode, body: &str) -> ServiceProviderError {
    if status == StatusCode::FORBIDDEN {
        return ServiceProviderError::Forbidden;
    }

    let json: Option<Value> = serde_json::from_str(body).ok();
    let message = json
        .as_ref()
        .and_then(|v| v.get("message").or_else(|| v.get("error")))
        .and_then(|m| m.as_str())
        .map(str::to_string);

    if let Some(details) = json
        .as_ref()
        .and_then(|v| v.get("confirmation"))
        .filter(|v| !v.is_null())
    {
        return ServiceProviderError::BetNeedsUserConfirmation(details.to_string());
    }

    match message {
        Some(message) if message.contains(INVALID_SELECTIONS_CODE) => {
            ServiceProviderError::InvalidBetBuilderSelections
        }
        Some(message) => ServiceProviderError::ErrorMessage(message),
        None if status == StatusCode::BAD_REQUEST => ServiceProviderError::NotPlacedBet(body.trim().to_string()),
        None => ServiceProviderError::Unknown,
    }
}
