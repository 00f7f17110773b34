//! Protective put options strategy
//!
//! Buys a put when price breaks below its moving average and lifts the
//! hedge once price recovers above the average by the exit threshold.
//! The strike sits a configured percentage below the moving average,
//! rounded down to a whole dollar.

use anyhow::Result;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::indicators::sma;
use crate::strategies::{params_from_value, OptionsStrategy};
use crate::types::{OptionDirection, OptionSignal, OptionType, PriceBar};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProtectivePutConfig {
    pub ma_period: usize,
    /// Strike offset below the moving average
    pub strike_offset: Decimal,
    /// Fractional recovery above the MA that lifts the hedge
    pub exit_threshold: Decimal,
    pub days_to_expiry: i64,
}

impl Default for ProtectivePutConfig {
    fn default() -> Self {
        Self {
            ma_period: 20,
            strike_offset: dec!(0.05),
            exit_threshold: dec!(0.02),
            days_to_expiry: 30,
        }
    }
}

pub struct ProtectivePutStrategy {
    config: ProtectivePutConfig,
}

impl ProtectivePutStrategy {
    pub fn new(config: ProtectivePutConfig) -> Self {
        Self { config }
    }
}

impl OptionsStrategy for ProtectivePutStrategy {
    fn name(&self) -> &'static str {
        "protective_put"
    }

    fn warmup_period(&self) -> usize {
        self.config.ma_period + 1
    }

    fn evaluate(&self, bars: &[PriceBar], index: usize) -> OptionSignal {
        if index + 1 < self.warmup_period() {
            return OptionSignal::Hold;
        }
        let c = &self.config;

        let (Some(ma_now), Some(ma_prev)) = (
            sma(bars, index, c.ma_period),
            sma(bars, index - 1, c.ma_period),
        ) else {
            return OptionSignal::Hold;
        };
        let close = bars[index].close;
        let prev_close = bars[index - 1].close;

        let crossed_below = prev_close >= ma_prev && close < ma_now;
        if crossed_below {
            return OptionSignal::Open;
        }

        if close > ma_now * (Decimal::ONE + c.exit_threshold) {
            return OptionSignal::Close;
        }

        OptionSignal::Hold
    }

    fn strike_price(&self, bars: &[PriceBar], index: usize) -> Decimal {
        let c = &self.config;
        let anchor = sma(bars, index, c.ma_period).unwrap_or(bars[index].close);
        // Whole-dollar strike, rounded away from the underlying for a put
        (anchor * (Decimal::ONE - c.strike_offset)).floor()
    }

    fn days_to_expiry(&self) -> i64 {
        self.config.days_to_expiry
    }

    fn option_type(&self) -> OptionType {
        OptionType::Put
    }

    fn direction(&self) -> OptionDirection {
        OptionDirection::Buy
    }
}

pub fn create(params: &Value) -> Result<Box<dyn OptionsStrategy>> {
    let config: ProtectivePutConfig = params_from_value(params)?;
    Ok(Box::new(ProtectivePutStrategy::new(config)))
}
