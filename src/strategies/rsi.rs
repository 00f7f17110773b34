//! RSI threshold-crossing strategy
//!
//! Buys when RSI crosses up through the oversold level and sells when it
//! crosses down through the overbought level.

use anyhow::Result;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::indicators::rsi;
use crate::strategies::{params_from_value, Strategy};
use crate::types::{PriceBar, Signal};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RsiConfig {
    pub period: usize,
    pub oversold: Decimal,
    pub overbought: Decimal,
}

impl Default for RsiConfig {
    fn default() -> Self {
        Self {
            period: 14,
            oversold: dec!(30),
            overbought: dec!(70),
        }
    }
}

#[derive(Debug)]
pub struct RsiStrategy {
    config: RsiConfig,
}

impl RsiStrategy {
    pub fn new(config: RsiConfig) -> Self {
        Self { config }
    }
}

impl Strategy for RsiStrategy {
    fn name(&self) -> &'static str {
        "rsi"
    }

    fn warmup_period(&self) -> usize {
        // period changes need period + 1 bars, plus the previous-bar value
        self.config.period + 2
    }

    fn evaluate(&self, bars: &[PriceBar], index: usize) -> Signal {
        if index + 1 < self.warmup_period() {
            return Signal::Hold;
        }

        let (Some(now), Some(prev)) = (
            rsi(bars, index, self.config.period),
            rsi(bars, index - 1, self.config.period),
        ) else {
            return Signal::Hold;
        };

        if prev <= self.config.oversold && now > self.config.oversold {
            Signal::Buy
        } else if prev >= self.config.overbought && now < self.config.overbought {
            Signal::Sell
        } else {
            Signal::Hold
        }
    }
}

pub fn create(params: &Value) -> Result<Box<dyn Strategy>> {
    let config: RsiConfig = params_from_value(params)?;
    Ok(Box::new(RsiStrategy::new(config)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn make_bars(closes: &[Decimal]) -> Vec<PriceBar> {
        closes
            .iter()
            .enumerate()
            .map(|(i, &close)| {
                let date =
                    NaiveDate::from_ymd_opt(2024, 1, 1).unwrap() + chrono::Days::new(i as u64);
                PriceBar::new_unchecked(
                    date,
                    close,
                    close + dec!(1),
                    close - dec!(1),
                    close,
                    close,
                    dec!(1000),
                )
            })
            .collect()
    }

    fn strategy() -> RsiStrategy {
        RsiStrategy::new(RsiConfig {
            period: 5,
            oversold: dec!(30),
            overbought: dec!(70),
        })
    }

    #[test]
    fn test_recovery_from_oversold_buys() {
        // Heavy selling drives RSI to 0, then a strong up bar lifts it
        // through the oversold line.
        let mut closes: Vec<Decimal> = (0..8).map(|i| dec!(100) - Decimal::from(i * 2)).collect();
        closes.push(dec!(96));
        let bars = make_bars(&closes);
        let strategy = strategy();

        // All-down window: RSI = 0, below oversold
        assert_eq!(strategy.evaluate(&bars, 7), Signal::Hold);
        // Recovery bar crosses above 30
        assert_eq!(strategy.evaluate(&bars, 8), Signal::Buy);
    }

    #[test]
    fn test_drop_from_overbought_sells() {
        let mut closes: Vec<Decimal> = (0..8).map(|i| dec!(100) + Decimal::from(i * 2)).collect();
        closes.push(dec!(104));
        let bars = make_bars(&closes);
        let strategy = strategy();

        assert_eq!(strategy.evaluate(&bars, 8), Signal::Sell);
    }

    #[test]
    fn test_hold_below_warmup() {
        let bars = make_bars(&[dec!(100), dec!(99), dec!(98)]);
        assert_eq!(strategy().evaluate(&bars, 2), Signal::Hold);
    }
}
