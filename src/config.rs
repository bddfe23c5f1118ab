// Configuration for the engine, the simulated backend and the CLI

use anyhow::{Context, Result};
use clap::Parser;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

/// Transformer behaviour
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Drop backend responses that arrive after a newer ticket update.
    /// Off by default: late responses still update state.
    pub discard_stale_responses: bool,
    /// Stake sent with potential-return requests (0.0 = odds preview)
    pub preview_stake: Decimal,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            discard_stale_responses: false,
            preview_stake: Decimal::ZERO,
        }
    }
}

/// Simulated backend pricing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    /// Stake used to compute the potential return when the request stake is zero
    pub preview_stake: Decimal,
    pub max_selections: usize,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            preview_stake: dec!(10.0),
            max_selections: 12,
        }
    }
}

/// CLI Configuration
#[derive(Parser, Debug)]
#[command(name = "bet-builder")]
#[command(about = "Replay a betslip scenario through the bet builder engine")]
pub struct CliConfig {
    /// Scenario file (JSON) with the initial tickets and the betslip updates
    #[arg(long)]
    pub scenario: PathBuf,

    /// Configuration file path (JSON format)
    #[arg(long, default_value = "config.json")]
    pub config: PathBuf,

    /// Ignore backend responses that arrive after a newer update
    #[arg(long)]
    pub discard_stale: bool,

    /// Stake used by the simulated backend for previews
    #[arg(long)]
    pub preview_stake: Option<f64>,

    /// Price combinations against this bet builder API instead of the simulator
    #[arg(long)]
    pub backend_url: Option<String>,

    /// Bearer token sent to --backend-url
    #[arg(long, requires = "backend_url")]
    pub api_key: Option<String>,

    /// File the betslip history is appended to
    #[arg(long, default_value = "betslip_history.log")]
    pub history: PathBuf,
}

/// JSON configuration file structure
#[derive(Debug, Clone, Default, Deserialize)]
pub struct JsonConfig {
    pub engine: Option<EngineConfig>,
    pub simulation: Option<SimulationConfig>,
}

impl JsonConfig {
    pub fn parse(content: &str) -> Result<Self> {
        serde_json::from_str(content).context("Failed to parse configuration")
    }
}

impl CliConfig {
    /// Load configuration from JSON file; a missing file means defaults
    pub fn load_json_config(&self) -> Result<JsonConfig> {
        let config_path = &self.config;

        if !config_path.exists() {
            return Ok(JsonConfig::default());
        }

        let content = fs::read_to_string(config_path)
            .with_context(|| format!("Failed to read config file {}", config_path.display()))?;

        JsonConfig::parse(&content)
            .with_context(|| format!("Failed to parse config file {}", config_path.display()))
    }

    /// Engine config from config.json, with `--discard-stale` forcing the flag on
    pub fn get_engine_config(&self) -> Result<EngineConfig> {
        let mut config = self.load_json_config()?.engine.unwrap_or_default();
        if self.discard_stale {
            config.discard_stale_responses = true;
        }
        Ok(config)
    }

    /// Simulation config: CLI --preview-stake, then config.json, then defaults
    pub fn get_simulation_config(&self) -> Result<SimulationConfig> {
        let mut config = self.load_json_config()?.simulation.unwrap_or_default();
        if let Some(stake) = self.preview_stake {
            config.preview_stake = Decimal::try_from(stake)
                .with_context(|| format!("Invalid preview stake {}", stake))?;
        }
        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if !self.scenario.exists() {
            anyhow::bail!("Scenario file {} does not exist", self.scenario.display());
        }
        if let Some(url) = &self.backend_url {
            if !(url.starts_with("http://") || url.starts_with("https://")) {
                anyhow::bail!("Backend URL must start with http:// or https:// (got {})", url);
            }
        }
        if let Some(stake) = self.preview_stake {
            if stake < 0.0 {
                anyhow::bail!("Preview stake must not be negative (got {})", stake);
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cli(args: &[&str]) -> CliConfig {
        let mut argv = vec!["bet-builder"];
        argv.extend_from_slice(args);
        CliConfig::parse_from(argv)
    }

    #[test]
    fn test_defaults() {
        let engine = EngineConfig::default();
        assert!(!engine.discard_stale_responses);
        assert_eq!(engine.preview_stake, Decimal::ZERO);

        let sim = SimulationConfig::default();
        assert_eq!(sim.preview_stake, dec!(10));
        assert_eq!(sim.max_selections, 12);
    }

    #[test]
    fn test_json_config_partial_sections() {
        let json = r#"{ "engine": { "discard_stale_responses": true }, "simulation": { "max_selections": 3 } }"#;
        let cfg = JsonConfig::parse(json).unwrap();
        let engine = cfg.engine.unwrap();
        assert!(engine.discard_stale_responses);
        assert_eq!(engine.preview_stake, Decimal::ZERO);
        let sim = cfg.simulation.unwrap();
        assert_eq!(sim.max_selections, 3);
        assert_eq!(sim.preview_stake, dec!(10));
    }

    #[test]
    fn test_missing_config_file_uses_defaults() {
        let cli = cli(&["--scenario", "scenario.json", "--config", "/nonexistent/config.json"]);
        let engine = cli.get_engine_config().unwrap();
        assert_eq!(engine, EngineConfig::default());
    }

    #[test]
    fn test_cli_overrides() {
        let cli = cli(&[
            "--scenario",
            "scenario.json",
            "--config",
            "/nonexistent/config.json",
            "--discard-stale",
            "--preview-stake",
            "25",
        ]);
        assert!(cli.get_engine_config().unwrap().discard_stale_responses);
        assert_eq!(cli.get_simulation_config().unwrap().preview_stake, dec!(25));
    }

    #[test]
    fn test_backend_url_selection() {
        let scenario = std::env::temp_dir().join("bet_builder_backend_url_scenario.json");
        fs::write(&scenario, "{}").unwrap();
        let scenario = scenario.to_str().unwrap();

        let simulated = cli(&["--scenario", scenario]);
        assert!(simulated.backend_url.is_none());
        assert!(simulated.validate().is_ok());

        let live = cli(&["--scenario", scenario, "--backend-url", "https://api.example.com", "--api-key", "k"]);
        assert_eq!(live.backend_url.as_deref(), Some("https://api.example.com"));
        assert_eq!(live.api_key.as_deref(), Some("k"));
        assert!(live.validate().is_ok());

        let bad = cli(&["--scenario", scenario, "--backend-url", "api.example.com"]);
        assert!(bad.validate().is_err());

        let orphan_key = CliConfig::try_parse_from(["bet-builder", "--scenario", scenario, "--api-key", "k"]);
        assert!(orphan_key.is_err());
    }

    #[test]
    fn test_validate_rejects_missing_scenario() {
        let cli = cli(&["--scenario", "/nonexistent/scenario.json"]);
        assert!(cli.validate().is_err());
    }
}
