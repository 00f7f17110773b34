//! Bollinger + RSI mean-reversion strategy
//!
//! Trades only in range-bound conditions (ADX below threshold). Buys when
//! price touches the lower band while RSI turns up out of oversold and the
//! stochastic confirms the washout; the sell side mirrors at the upper band.

use anyhow::Result;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::indicators::{adx, bollinger_bands, rsi, stochastic};
use crate::strategies::{params_from_value, Strategy};
use crate::types::{PriceBar, Signal};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BollingerRsiConfig {
    pub bollinger_period: usize,
    pub std_dev_multiplier: Decimal,
    pub rsi_period: usize,
    pub rsi_oversold: Decimal,
    pub rsi_overbought: Decimal,
    pub adx_period: usize,
    pub adx_threshold: Decimal,
    pub stochastic_period: usize,
    pub stochastic_smoothing: usize,
}

impl Default for BollingerRsiConfig {
    fn default() -> Self {
        Self {
            bollinger_period: 20,
            std_dev_multiplier: dec!(2),
            rsi_period: 14,
            rsi_oversold: dec!(30),
            rsi_overbought: dec!(70),
            adx_period: 14,
            adx_threshold: dec!(25),
            stochastic_period: 14,
            stochastic_smoothing: 3,
        }
    }
}

#[derive(Debug)]
pub struct BollingerRsiStrategy {
    config: BollingerRsiConfig,
}

impl BollingerRsiStrategy {
    pub fn new(config: BollingerRsiConfig) -> Self {
        Self { config }
    }
}

impl Strategy for BollingerRsiStrategy {
    fn name(&self) -> &'static str {
        "bollinger_rsi"
    }

    fn warmup_period(&self) -> usize {
        let c = &self.config;
        let stochastic_warmup = c.stochastic_period + c.stochastic_smoothing - 1;
        (2 * c.adx_period)
            .max(c.bollinger_period)
            .max(c.rsi_period + 1)
            .max(stochastic_warmup)
            + 1
    }

    fn evaluate(&self, bars: &[PriceBar], index: usize) -> Signal {
        if index + 1 < self.warmup_period() {
            return Signal::Hold;
        }
        let c = &self.config;

        // Range-bound filter: skip trending markets entirely
        let Some(trend) = adx(bars, index, c.adx_period) else {
            return Signal::Hold;
        };
        if trend.adx >= c.adx_threshold {
            return Signal::Hold;
        }

        let (Some(bands), Some(rsi_now), Some(rsi_prev), Some(stoch)) = (
            bollinger_bands(bars, index, c.bollinger_period, c.std_dev_multiplier),
            rsi(bars, index, c.rsi_period),
            rsi(bars, index - 1, c.rsi_period),
            stochastic(bars, index, c.stochastic_period, c.stochastic_smoothing),
        ) else {
            return Signal::Hold;
        };
        let close = bars[index].close;

        let rsi_recovering = rsi_prev < c.rsi_oversold && rsi_now > rsi_prev;
        if close <= bands.lower && rsi_recovering && stoch.k < dec!(20) {
            return Signal::Buy;
        }

        let rsi_fading = rsi_prev > c.rsi_overbought && rsi_now < rsi_prev;
        if close >= bands.upper && rsi_fading && stoch.k > dec!(80) {
            return Signal::Sell;
        }

        Signal::Hold
    }
}

pub fn create(params: &Value) -> Result<Box<dyn Strategy>> {
    let config: BollingerRsiConfig = params_from_value(params)?;
    Ok(Box::new(BollingerRsiStrategy::new(config)))
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

    #[test]
    fn test_hold_below_warmup() {
        let bars = make_bars(&vec![dec!(100); 10]);
        let strategy = BollingerRsiStrategy::new(BollingerRsiConfig::default());
        assert_eq!(strategy.evaluate(&bars, 9), Signal::Hold);
    }

    #[test]
    fn test_flat_prices_never_signal() {
        let bars = make_bars(&vec![dec!(100); 60]);
        let strategy = BollingerRsiStrategy::new(BollingerRsiConfig::default());
        for i in 0..bars.len() {
            assert_eq!(strategy.evaluate(&bars, i), Signal::Hold);
        }
    }

    #[test]
    fn test_trending_market_is_filtered_out() {
        // A strong steady trend pushes ADX above the threshold, so even a
        // band touch may not trade.
        let closes: Vec<Decimal> = (0..60).map(|i| dec!(100) + Decimal::from(i * 3)).collect();
        let bars = make_bars(&closes);
        let strategy = BollingerRsiStrategy::new(BollingerRsiConfig::default());
        for i in 0..bars.len() {
            assert_eq!(strategy.evaluate(&bars, i), Signal::Hold);
        }
    }

    #[test]
    fn test_washout_bounce_buys_in_range() {
        // Long sideways chop keeps ADX low, then a sharp three-bar washout
        // below the lower band with an RSI uptick on the last bar.
        let mut closes = Vec::new();
        for i in 0..40 {
            closes.push(if i % 2 == 0 { dec!(100) } else { dec!(101) });
        }
        closes.extend([dec!(95), dec!(88), dec!(89)]);
        let bars = make_bars(&closes);
        let strategy = BollingerRsiStrategy::new(BollingerRsiConfig::default());

        let signals: Vec<Signal> = (40..bars.len())
            .map(|i| strategy.evaluate(&bars, i))
            .collect();
        assert!(signals.contains(&Signal::Buy));
    }
}
