//! Covered call options strategy
//!
//! Writes a call when price crosses above its moving average with momentum
//! behind it, and buys the call back when price falls through the average
//! by the exit threshold. The strike sits a configured percentage above
//! the moving average, rounded up to a whole dollar.

use anyhow::Result;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::indicators::{rsi, sma};
use crate::strategies::{params_from_value, OptionsStrategy};
use crate::types::{OptionDirection, OptionSignal, OptionType, PriceBar};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CoveredCallConfig {
    pub ma_period: usize,
    /// Strike offset above the moving average
    pub strike_offset: Decimal,
    /// Fractional drop through the MA that closes the position
    pub exit_threshold: Decimal,
    pub days_to_expiry: i64,
    pub rsi_period: usize,
}

impl Default for CoveredCallConfig {
    fn default() -> Self {
        Self {
            ma_period: 20,
            strike_offset: dec!(0.05),
            exit_threshold: dec!(0.02),
            days_to_expiry: 30,
            rsi_period: 14,
        }
    }
}

pub struct CoveredCallStrategy {
    config: CoveredCallConfig,
}

impl CoveredCallStrategy {
    pub fn new(config: CoveredCallConfig) -> Self {
        Self { config }
    }
}

impl OptionsStrategy for CoveredCallStrategy {
    fn name(&self) -> &'static str {
        "covered_call"
    }

    fn warmup_period(&self) -> usize {
        self.config.ma_period.max(self.config.rsi_period + 1) + 1
    }

    fn evaluate(&self, bars: &[PriceBar], index: usize) -> OptionSignal {
        if index + 1 < self.warmup_period() {
            return OptionSignal::Hold;
        }
        let c = &self.config;

        let (Some(ma_now), Some(ma_prev), Some(momentum)) = (
            sma(bars, index, c.ma_period),
            sma(bars, index - 1, c.ma_period),
            rsi(bars, index, c.rsi_period),
        ) else {
            return OptionSignal::Hold;
        };
        let close = bars[index].close;
        let prev_close = bars[index - 1].close;

        let crossed_above = prev_close <= ma_prev && close > ma_now;
        if crossed_above && momentum > dec!(50) {
            return OptionSignal::Open;
        }

        if close < ma_now * (Decimal::ONE - c.exit_threshold) {
            return OptionSignal::Close;
        }

        OptionSignal::Hold
    }

    fn strike_price(&self, bars: &[PriceBar], index: usize) -> Decimal {
        let c = &self.config;
        let anchor = sma(bars, index, c.ma_period).unwrap_or(bars[index].close);
        // Whole-dollar strike, rounded away from the underlying for a call
        (anchor * (Decimal::ONE + c.strike_offset)).ceil()
    }

    fn days_to_expiry(&self) -> i64 {
        self.config.days_to_expiry
    }

    fn option_type(&self) -> OptionType {
        OptionType::Call
    }

    fn direction(&self) -> OptionDirection {
        OptionDirection::Sell
    }
}

pub fn create(params: &Value) -> Result<Box<dyn OptionsStrategy>> {
    let config: CoveredCallConfig = params_from_value(params)?;
    Ok(Box::new(CoveredCallStrategy::new(config)))
}
