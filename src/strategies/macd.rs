//! MACD signal-line crossover strategy

use anyhow::Result;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::indicators::macd;
use crate::strategies::{params_from_value, Strategy};
use crate::types::{PriceBar, Signal};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MacdConfig {
    pub fast_period: usize,
    pub slow_period: usize,
    pub signal_period: usize,
}

impl Default for MacdConfig {
    fn default() -> Self {
        Self {
            fast_period: 12,
            slow_period: 26,
            signal_period: 9,
        }
    }
}

#[derive(Debug)]
pub struct MacdStrategy {
    config: MacdConfig,
}

impl MacdStrategy {
    pub fn new(config: MacdConfig) -> Self {
        Self { config }
    }
}

impl Strategy for MacdStrategy {
    fn name(&self) -> &'static str {
        "macd"
    }

    fn warmup_period(&self) -> usize {
        // The signal line needs signal_period MACD points past the slow
        // warmup, plus one bar for the previous-bar comparison
        self.config.slow_period + self.config.signal_period
    }

    fn evaluate(&self, bars: &[PriceBar], index: usize) -> Signal {
        if index + 1 < self.warmup_period() {
            return Signal::Hold;
        }

        let c = &self.config;
        let (Some(now), Some(prev)) = (
            macd(bars, index, c.fast_period, c.slow_period, c.signal_period),
            macd(bars, index - 1, c.fast_period, c.slow_period, c.signal_period),
        ) else {
            return Signal::Hold;
        };

        if prev.line <= prev.signal && now.line > now.signal {
            Signal::Buy
        } else if prev.line >= prev.signal && now.line < now.signal {
            Signal::Sell
        } else {
            Signal::Hold
        }
    }
}

pub fn create(params: &Value) -> Result<Box<dyn Strategy>> {
    let config: MacdConfig = params_from_value(params)?;
    Ok(Box::new(MacdStrategy::new(config)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;

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
        let closes: Vec<Decimal> = (1..=30).map(Decimal::from).collect();
        let bars = make_bars(&closes);
        let strategy = MacdStrategy::new(MacdConfig::default());
        assert_eq!(strategy.evaluate(&bars, 29), Signal::Hold);
    }

    #[test]
    fn test_trend_reversal_produces_both_crossovers() {
        // A long decline followed by a long rally, then a decline again:
        // the MACD line must cross its signal line in both directions.
        let mut closes: Vec<Decimal> = (0..50).map(|i| dec!(200) - Decimal::from(i)).collect();
        closes.extend((0..50).map(|i| dec!(150) + Decimal::from(i * 2)));
        closes.extend((0..50).map(|i| dec!(250) - Decimal::from(i * 2)));
        let bars = make_bars(&closes);
        let strategy = MacdStrategy::new(MacdConfig::default());

        let signals: Vec<Signal> = (0..bars.len()).map(|i| strategy.evaluate(&bars, i)).collect();
        assert!(signals.contains(&Signal::Buy));
        assert!(signals.contains(&Signal::Sell));
    }

    #[test]
    fn test_flat_prices_never_signal() {
        let bars = make_bars(&vec![dec!(100); 60]);
        let strategy = MacdStrategy::new(MacdConfig::default());
        for i in 0..bars.len() {
            assert_eq!(strategy.evaluate(&bars, i), Signal::Hold);
        }
    }
}
