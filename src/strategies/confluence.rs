//! Multi-indicator confluence strategy
//!
//! Scores eight bullish and eight bearish conditions across trend,
//! momentum, and volume. A side must reach the configured score and
//! strictly beat the other side before the strategy trades.

use anyhow::Result;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::indicators::{cci, ichimoku, macd, obv, rsi, sma, stochastic};
use crate::strategies::{params_from_value, Strategy};
use crate::types::{PriceBar, Signal};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ConfluenceConfig {
    /// Minimum score (out of 8) a side needs to trade
    pub score_threshold: usize,
    pub obv_lookback: usize,
}

impl Default for ConfluenceConfig {
    fn default() -> Self {
        Self {
            score_threshold: 5,
            obv_lookback: 10,
        }
    }
}

#[derive(Debug)]
pub struct ConfluenceStrategy {
    config: ConfluenceConfig,
}

impl ConfluenceStrategy {
    pub fn new(config: ConfluenceConfig) -> Self {
        Self { config }
    }
}

impl Strategy for ConfluenceStrategy {
    fn name(&self) -> &'static str {
        "confluence"
    }

    fn warmup_period(&self) -> usize {
        // The Ichimoku cloud's 52-bar span is the longest window in the set
        53
    }

    fn evaluate(&self, bars: &[PriceBar], index: usize) -> Signal {
        if index + 1 < self.warmup_period() {
            return Signal::Hold;
        }

        let (
            Some(sma_20),
            Some(sma_50),
            Some(cloud),
            Some(rsi_14),
            Some(macd_out),
            Some(stoch),
            Some(cci_20),
            Some(obv_now),
        ) = (
            sma(bars, index, 20),
            sma(bars, index, 50),
            ichimoku(bars, index),
            rsi(bars, index, 14),
            macd(bars, index, 12, 26, 9),
            stochastic(bars, index, 14, 3),
            cci(bars, index, 20),
            obv(bars, index),
        )
        else {
            return Signal::Hold;
        };
        let Some(obv_past) = obv(bars, index - self.config.obv_lookback) else {
            return Signal::Hold;
        };

        let close = bars[index].close;
        let cloud_top = cloud.senkou_a.max(cloud.senkou_b);
        let cloud_bottom = cloud.senkou_a.min(cloud.senkou_b);
        let midline = dec!(50);

        let bullish = [
            // Trend
            close > sma_50,
            sma_20 > sma_50,
            close > cloud_top,
            // Momentum
            rsi_14 > midline,
            macd_out.histogram > Decimal::ZERO,
            stoch.k > stoch.d,
            cci_20 > Decimal::ZERO,
            // Volume
            obv_now > obv_past,
        ];
        let bearish = [
            close < sma_50,
            sma_20 < sma_50,
            close < cloud_bottom,
            rsi_14 < midline,
            macd_out.histogram < Decimal::ZERO,
            stoch.k < stoch.d,
            cci_20 < Decimal::ZERO,
            obv_now < obv_past,
        ];

        let bull_score = bullish.iter().filter(|c| **c).count();
        let bear_score = bearish.iter().filter(|c| **c).count();
        let threshold = self.config.score_threshold;

        if bull_score >= threshold && bull_score > bear_score {
            Signal::Buy
        } else if bear_score >= threshold && bear_score > bull_score {
            Signal::Sell
        } else {
            Signal::Hold
        }
    }
}

pub fn create(params: &Value) -> Result<Box<dyn Strategy>> {
    let config: ConfluenceConfig = params_from_value(params)?;
    Ok(Box::new(ConfluenceStrategy::new(config)))
}
