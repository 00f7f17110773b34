//! Trading strategies
//!
//! Strategy framework with:
//! - Trait interfaces for equity and options signal generation
//! - Dynamic strategy registry (no hardcoded names at call sites)
//! - Factories building strategies from JSON parameter blocks

pub mod bollinger_rsi;
pub mod breakout;
pub mod confluence;
pub mod covered_call;
pub mod macd;
pub mod momentum;
pub mod protective_put;
pub mod rsi;
pub mod sma_crossover;

use anyhow::{Context, Result};
use rust_decimal::Decimal;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::{OnceLock, RwLock};

use crate::types::{OptionDirection, OptionSignal, OptionType, PriceBar, Signal};

// =============================================================================
// Strategy Traits - The contracts all strategies must implement
// =============================================================================

/// Equity trading strategy: a stateless pure function from a price history
/// prefix to a signal.
///
/// Below `warmup_period` bars of history a strategy must return `Hold`.
pub trait Strategy: std::fmt::Debug + Send + Sync {
    /// Strategy identifier (must match the registry key)
    fn name(&self) -> &'static str;

    /// Number of bars required before the strategy can signal
    fn warmup_period(&self) -> usize;

    /// Generate the signal for the bar at `index`
    fn evaluate(&self, bars: &[PriceBar], index: usize) -> Signal;
}

/// Options trading strategy: signals position open/close and supplies the
/// contract terms for the options engine.
pub trait OptionsStrategy: Send + Sync {
    /// Strategy identifier (must match the registry key)
    fn name(&self) -> &'static str;

    /// Number of bars required before the strategy can signal
    fn warmup_period(&self) -> usize;

    /// Generate the signal for the bar at `index`
    fn evaluate(&self, bars: &[PriceBar], index: usize) -> OptionSignal;

    /// Strike for a position opened at `index`
    fn strike_price(&self, bars: &[PriceBar], index: usize) -> Decimal;

    /// Target days to expiry for new positions
    fn days_to_expiry(&self) -> i64;

    /// Contract type this strategy trades
    fn option_type(&self) -> OptionType;

    /// Whether the strategy buys or writes the contract
    fn direction(&self) -> OptionDirection;
}

// =============================================================================
// Strategy Factories
// =============================================================================

/// Factory function type for creating equity strategies from JSON params
pub type StrategyFactory = fn(&Value) -> Result<Box<dyn Strategy>>;

/// Factory function type for creating options strategies from JSON params
pub type OptionsStrategyFactory = fn(&Value) -> Result<Box<dyn OptionsStrategy>>;

/// Deserialize a strategy parameter block, treating a missing block as `{}`
pub(crate) fn params_from_value<T: DeserializeOwned>(params: &Value) -> Result<T> {
    let value = if params.is_null() {
        Value::Object(serde_json::Map::new())
    } else {
        params.clone()
    };
    serde_json::from_value(value).context("Failed to parse strategy parameters")
}

// =============================================================================
// Strategy Registries
// =============================================================================

static REGISTRY: OnceLock<RwLock<HashMap<&'static str, StrategyFactory>>> = OnceLock::new();
static OPTIONS_REGISTRY: OnceLock<RwLock<HashMap<&'static str, OptionsStrategyFactory>>> =
    OnceLock::new();

fn get_registry() -> &'static RwLock<HashMap<&'static str, StrategyFactory>> {
    REGISTRY.get_or_init(|| {
        let mut map: HashMap<&'static str, StrategyFactory> = HashMap::new();
        map.insert("sma_crossover", sma_crossover::create);
        map.insert("rsi", rsi::create);
        map.insert("macd", macd::create);
        map.insert("bollinger_rsi", bollinger_rsi::create);
        map.insert("breakout", breakout::create);
        map.insert("momentum_confluence", momentum::create);
        map.insert("confluence", confluence::create);
        RwLock::new(map)
    })
}

fn get_options_registry() -> &'static RwLock<HashMap<&'static str, OptionsStrategyFactory>> {
    OPTIONS_REGISTRY.get_or_init(|| {
        let mut map: HashMap<&'static str, OptionsStrategyFactory> = HashMap::new();
        map.insert("covered_call", covered_call::create);
        map.insert("protective_put", protective_put::create);
        RwLock::new(map)
    })
}

/// Create an equity strategy by registry name
pub fn create_strategy(name: &str, params: &Value) -> Result<Box<dyn Strategy>> {
    let registry = get_registry().read().unwrap();
    let factory = registry.get(name).ok_or_else(|| {
        let mut available: Vec<_> = registry.keys().copied().collect();
        available.sort_unstable();
        anyhow::anyhow!("Unknown strategy: '{}'. Available: {}", name, available.join(", "))
    })?;
    factory(params)
}

/// Create an options strategy by registry name
pub fn create_options_strategy(name: &str, params: &Value) -> Result<Box<dyn OptionsStrategy>> {
    let registry = get_options_registry().read().unwrap();
    let factory = registry.get(name).ok_or_else(|| {
        let mut available: Vec<_> = registry.keys().copied().collect();
        available.sort_unstable();
        anyhow::anyhow!(
            "Unknown options strategy: '{}'. Available: {}",
            name,
            available.join(", ")
        )
    })?;
    factory(params)
}

/// Get the list of registered equity strategy names
pub fn available_strategies() -> Vec<&'static str> {
    let mut names: Vec<_> = get_registry().read().unwrap().keys().copied().collect();
    names.sort_unstable();
    names
}

/// Get the list of registered options strategy names
pub fn available_options_strategies() -> Vec<&'static str> {
    let mut names: Vec<_> = get_options_registry()
        .read()
        .unwrap()
        .keys()
        .copied()
        .collect();
    names.sort_unstable();
    names
}

/// Register a new equity strategy (for plugins or testing)
pub fn register_strategy(name: &'static str, factory: StrategyFactory) {
    get_registry().write().unwrap().insert(name, factory);
}

/// Register a new options strategy (for plugins or testing)
pub fn register_options_strategy(name: &'static str, factory: OptionsStrategyFactory) {
    get_options_registry().write().unwrap().insert(name, factory);
}
