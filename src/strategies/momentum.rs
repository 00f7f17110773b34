//! Momentum confluence strategy
//!
//! Buys only when trend, momentum, and volume line up at once: a MACD
//! bullish cross with a strong directional trend (ADX, +DI over -DI),
//! price above the long EMA, and rising OBV. Sells on a MACD bearish
//! cross or a trend failure.

use anyhow::Result;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::indicators::{adx, ema, is_obv_rising, macd};
use crate::strategies::{params_from_value, Strategy};
use crate::types::{PriceBar, Signal};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MomentumConfluenceConfig {
    pub macd_fast: usize,
    pub macd_slow: usize,
    pub macd_signal: usize,
    pub adx_period: usize,
    pub adx_entry: Decimal,
    pub adx_exit: Decimal,
    pub ema_period: usize,
    pub obv_lookback: usize,
}

impl Default for MomentumConfluenceConfig {
    fn default() -> Self {
        Self {
            macd_fast: 12,
            macd_slow: 26,
            macd_signal: 9,
            adx_period: 14,
            adx_entry: dec!(25),
            adx_exit: dec!(20),
            ema_period: 200,
            obv_lookback: 10,
        }
    }
}

#[derive(Debug)]
pub struct MomentumConfluenceStrategy {
    config: MomentumConfluenceConfig,
}

impl MomentumConfluenceStrategy {
    pub fn new(config: MomentumConfluenceConfig) -> Self {
        Self { config }
    }
}

impl Strategy for MomentumConfluenceStrategy {
    fn name(&self) -> &'static str {
        "momentum_confluence"
    }

    fn warmup_period(&self) -> usize {
        let c = &self.config;
        c.ema_period
            .max(c.macd_slow + c.macd_signal - 1)
            .max(2 * c.adx_period)
            + 1
    }

    fn evaluate(&self, bars: &[PriceBar], index: usize) -> Signal {
        if index + 1 < self.warmup_period() {
            return Signal::Hold;
        }
        let c = &self.config;

        let (Some(now), Some(prev), Some(trend), Some(long_ema)) = (
            macd(bars, index, c.macd_fast, c.macd_slow, c.macd_signal),
            macd(bars, index - 1, c.macd_fast, c.macd_slow, c.macd_signal),
            adx(bars, index, c.adx_period),
            ema(bars, index, c.ema_period),
        ) else {
            return Signal::Hold;
        };
        let close = bars[index].close;

        let bullish_cross = prev.line <= prev.signal && now.line > now.signal;
        let bearish_cross = prev.line >= prev.signal && now.line < now.signal;

        if bullish_cross
            && trend.adx > c.adx_entry
            && trend.plus_di > trend.minus_di
            && close > long_ema
            && is_obv_rising(bars, index, c.obv_lookback)
        {
            return Signal::Buy;
        }

        if bearish_cross || (trend.adx < c.adx_exit && close < long_ema) {
            return Signal::Sell;
        }

        Signal::Hold
    }
}

pub fn create(params: &Value) -> Result<Box<dyn Strategy>> {
    let config: MomentumConfluenceConfig = params_from_value(params)?;
    Ok(Box::new(MomentumConfluenceStrategy::new(config)))
}
