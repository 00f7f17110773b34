//! SMA crossover strategy
//!
//! Buys on the golden cross (short SMA crossing above long SMA) and sells
//! on the death cross, comparing the current bar's ordering against the
//! previous bar's.

use anyhow::Result;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::indicators::sma;
use crate::strategies::{params_from_value, Strategy};
use crate::types::{PriceBar, Signal};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SmaCrossoverConfig {
    pub short_period: usize,
    pub long_period: usize,
}

impl Default for SmaCrossoverConfig {
    fn default() -> Self {
        Self {
            short_period: 20,
            long_period: 50,
        }
    }
}

#[derive(Debug)]
pub struct SmaCrossoverStrategy {
    config: SmaCrossoverConfig,
}

impl SmaCrossoverStrategy {
    pub fn new(config: SmaCrossoverConfig) -> Self {
        Self { config }
    }
}

impl Strategy for SmaCrossoverStrategy {
    fn name(&self) -> &'static str {
        "sma_crossover"
    }

    fn warmup_period(&self) -> usize {
        // One extra bar for the previous-bar comparison
        self.config.long_period + 1
    }

    fn evaluate(&self, bars: &[PriceBar], index: usize) -> Signal {
        if index + 1 < self.warmup_period() {
            return Signal::Hold;
        }

        let (Some(short_now), Some(long_now), Some(short_prev), Some(long_prev)) = (
            sma(bars, index, self.config.short_period),
            sma(bars, index, self.config.long_period),
            sma(bars, index - 1, self.config.short_period),
            sma(bars, index - 1, self.config.long_period),
        ) else {
            return Signal::Hold;
        };

        if short_prev <= long_prev && short_now > long_now {
            Signal::Buy
        } else if short_prev >= long_prev && short_now < long_now {
            Signal::Sell
        } else {
            Signal::Hold
        }
    }
}

pub fn create(params: &Value) -> Result<Box<dyn Strategy>> {
    let config: SmaCrossoverConfig = params_from_value(params)?;
    Ok(Box::new(SmaCrossoverStrategy::new(config)))
}
