//! Configuration management
//!
//! JSON configuration for backtest runs. Strategy parameters stay a raw
//! `serde_json::Value` block and are resolved through the strategy
//! registry, so new strategies need no config changes here.

use anyhow::{Context, Result};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_strategy_name")]
    pub strategy_name: String,
    #[serde(default)]
    pub strategy: serde_json::Value,
    #[serde(default)]
    pub backtest: BacktestConfig,
    #[serde(default)]
    pub options_backtest: OptionsBacktestConfig,
}

fn default_strategy_name() -> String {
    "sma_crossover".to_string()
}

impl Config {
    /// Load configuration from a JSON file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let contents = fs::read_to_string(path.as_ref()).context("Failed to read config file")?;
        serde_json::from_str(&contents).context("Failed to parse config JSON")
    }

    /// Parse configuration from a JSON string
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).context("Failed to parse config JSON")
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            strategy_name: default_strategy_name(),
            strategy: serde_json::json!({}),
            backtest: BacktestConfig::default(),
            options_backtest: OptionsBacktestConfig::default(),
        }
    }
}

/// Equity backtest configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BacktestConfig {
    pub initial_capital: Decimal,
    /// Flat commission per order
    pub commission: Decimal,
}

impl Default for BacktestConfig {
    fn default() -> Self {
        BacktestConfig {
            initial_capital: dec!(100000),
            commission: dec!(5),
        }
    }
}

/// Options backtest configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OptionsBacktestConfig {
    pub initial_capital: Decimal,
    pub commission_per_contract: Decimal,
    pub risk_free_rate: Decimal,
    /// Trailing close window for volatility estimation
    pub volatility_lookback: usize,
}

impl Default for OptionsBacktestConfig {
    fn default() -> Self {
        OptionsBacktestConfig {
            initial_capital: dec!(100000),
            commission_per_contract: dec!(0.65),
            risk_free_rate: dec!(0.05),
            volatility_lookback: 20,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.strategy_name, "sma_crossover");
        assert_eq!(config.backtest.initial_capital, dec!(100000));
        assert_eq!(config.options_backtest.volatility_lookback, 20);
    }

    #[test]
    fn test_parse_with_strategy_params() {
        let config = Config::from_json(
            r#"{
                "strategy_name": "rsi",
                "strategy": {"period": 10, "oversold": "25"},
                "backtest": {"initial_capital": "50000", "commission": "1.50"}
            }"#,
        )
        .unwrap();

        assert_eq!(config.strategy_name, "rsi");
        assert_eq!(config.backtest.initial_capital, dec!(50000));
        assert_eq!(config.backtest.commission, dec!(1.50));
        assert_eq!(config.strategy["period"], 10);
    }

    #[test]
    fn test_missing_sections_fall_back_to_defaults() {
        let config = Config::from_json(r#"{"strategy_name": "macd"}"#).unwrap();
        assert_eq!(config.backtest.commission, dec!(5));
        assert_eq!(config.options_backtest.risk_free_rate, dec!(0.05));
    }
}
