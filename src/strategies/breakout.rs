//! Volatility breakout strategy
//!
//! Waits for compression (band width near its lookback minimum) or an ATR
//! expansion, then buys a close above the upper band confirmed by volume.
//! Sells on a lower-band breakdown or a failed breakout that re-enters the
//! middle of the bands.

use anyhow::Result;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::indicators::{atr, average_volume, bollinger_bands};
use crate::strategies::{params_from_value, Strategy};
use crate::types::{PriceBar, Signal};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BreakoutConfig {
    pub bollinger_period: usize,
    pub std_dev_multiplier: Decimal,
    /// Bars scanned for the minimum band width
    pub squeeze_lookback: usize,
    /// Width within this factor of the minimum counts as a squeeze
    pub squeeze_tolerance: Decimal,
    pub atr_period: usize,
    /// Bars back for the ATR expansion comparison
    pub atr_lookback: usize,
    /// Current ATR must exceed this multiple of the past ATR
    pub atr_expansion: Decimal,
    pub volume_period: usize,
    pub volume_multiplier: Decimal,
    /// Bars scanned for a prior close above the upper band
    pub reentry_lookback: usize,
}

impl Default for BreakoutConfig {
    fn default() -> Self {
        Self {
            bollinger_period: 20,
            std_dev_multiplier: dec!(2),
            squeeze_lookback: 50,
            squeeze_tolerance: dec!(1.10),
            atr_period: 14,
            atr_lookback: 10,
            atr_expansion: dec!(1.25),
            volume_period: 20,
            volume_multiplier: dec!(1.5),
            reentry_lookback: 5,
        }
    }
}

#[derive(Debug)]
pub struct BreakoutStrategy {
    config: BreakoutConfig,
}

impl BreakoutStrategy {
    pub fn new(config: BreakoutConfig) -> Self {
        Self { config }
    }

    /// Band width within tolerance of its minimum over the lookback
    fn in_squeeze(&self, bars: &[PriceBar], index: usize) -> bool {
        let c = &self.config;
        let Some(current) = bollinger_bands(bars, index, c.bollinger_period, c.std_dev_multiplier)
        else {
            return false;
        };
        let mut min_width: Option<Decimal> = None;
        for i in (index + 1).saturating_sub(c.squeeze_lookback)..=index {
            if let Some(bands) = bollinger_bands(bars, i, c.bollinger_period, c.std_dev_multiplier)
            {
                min_width = Some(match min_width {
                    Some(w) => w.min(bands.width),
                    None => bands.width,
                });
            }
        }
        match min_width {
            Some(w) => current.width <= w * c.squeeze_tolerance,
            None => false,
        }
    }

    fn atr_expanding(&self, bars: &[PriceBar], index: usize) -> bool {
        let c = &self.config;
        if index < c.atr_lookback {
            return false;
        }
        let (Some(now), Some(past)) = (
            atr(bars, index, c.atr_period),
            atr(bars, index - c.atr_lookback, c.atr_period),
        ) else {
            return false;
        };
        past > Decimal::ZERO && now >= past * c.atr_expansion
    }

    /// Any close above its own upper band within the recent window
    fn was_above_upper_band(&self, bars: &[PriceBar], index: usize) -> bool {
        let c = &self.config;
        if index < c.reentry_lookback {
            return false;
        }
        for i in (index - c.reentry_lookback)..index {
            if let Some(bands) = bollinger_bands(bars, i, c.bollinger_period, c.std_dev_multiplier)
            {
                if bars[i].close > bands.upper {
                    return true;
                }
            }
        }
        false
    }
}

impl Strategy for BreakoutStrategy {
    fn name(&self) -> &'static str {
        "breakout"
    }

    fn warmup_period(&self) -> usize {
        let c = &self.config;
        (c.bollinger_period + c.squeeze_lookback - 1)
            .max(c.atr_period + c.atr_lookback)
            .max(c.volume_period)
    }

    fn evaluate(&self, bars: &[PriceBar], index: usize) -> Signal {
        if index + 1 < self.warmup_period() {
            return Signal::Hold;
        }
        let c = &self.config;

        let (Some(bands), Some(avg_volume)) = (
            bollinger_bands(bars, index, c.bollinger_period, c.std_dev_multiplier),
            average_volume(bars, index, c.volume_period),
        ) else {
            return Signal::Hold;
        };
        let bar = &bars[index];

        // The squeeze is a setup condition, so it is read off the bar
        // before the breakout; the breakout bar itself widens the bands.
        let primed = self.in_squeeze(bars, index - 1) || self.atr_expanding(bars, index);
        let volume_confirmed = bar.volume >= avg_volume * c.volume_multiplier;
        if primed && bar.close > bands.upper && volume_confirmed {
            return Signal::Buy;
        }

        if bar.close < bands.lower {
            return Signal::Sell;
        }
        // Failed breakout: price re-enters the middle of the bands after
        // recently closing above the upper band
        if bar.close < bands.middle && self.was_above_upper_band(bars, index) {
            return Signal::Sell;
        }

        Signal::Hold
    }
}

pub fn create(params: &Value) -> Result<Box<dyn Strategy>> {
    let config: BreakoutConfig = params_from_value(params)?;
    Ok(Box::new(BreakoutStrategy::new(config)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn make_bars(closes: &[(Decimal, Decimal)]) -> Vec<PriceBar> {
        closes
            .iter()
            .enumerate()
            .map(|(i, &(close, volume))| {
                let date =
                    NaiveDate::from_ymd_opt(2024, 1, 1).unwrap() + chrono::Days::new(i as u64);
                PriceBar::new_unchecked(
                    date,
                    close,
                    close + dec!(0.5),
                    close - dec!(0.5),
                    close,
                    close,
                    volume,
                )
            })
            .collect()
    }

    fn small_config() -> BreakoutConfig {
        BreakoutConfig {
            bollinger_period: 10,
            squeeze_lookback: 10,
            atr_period: 5,
            atr_lookback: 5,
            volume_period: 10,
            ..Default::default()
        }
    }

    #[test]
    fn test_flat_prices_never_signal() {
        let closes: Vec<(Decimal, Decimal)> = vec![(dec!(100), dec!(1000)); 40];
        let bars = make_bars(&closes);
        let strategy = BreakoutStrategy::new(small_config());
        for i in 0..bars.len() {
            assert_eq!(strategy.evaluate(&bars, i), Signal::Hold);
        }
    }

    #[test]
    fn test_squeeze_breakout_with_volume_buys() {
        // Tight chop compresses the bands, then a high-volume surge closes
        // above the upper band.
        let mut closes: Vec<(Decimal, Decimal)> = (0..30)
            .map(|i| {
                let close = if i % 2 == 0 { dec!(100) } else { dec!(100.2) };
                (close, dec!(1000))
            })
            .collect();
        closes.push((dec!(103), dec!(5000)));
        let bars = make_bars(&closes);
        let strategy = BreakoutStrategy::new(small_config());

        assert_eq!(strategy.evaluate(&bars, 30), Signal::Buy);
    }

    #[test]
    fn test_breakout_without_volume_holds() {
        let mut closes: Vec<(Decimal, Decimal)> = (0..30)
            .map(|i| {
                let close = if i % 2 == 0 { dec!(100) } else { dec!(100.2) };
                (close, dec!(1000))
            })
            .collect();
        closes.push((dec!(103), dec!(1000)));
        let bars = make_bars(&closes);
        let strategy = BreakoutStrategy::new(small_config());

        assert_eq!(strategy.evaluate(&bars, 30), Signal::Hold);
    }

    #[test]
    fn test_lower_band_breakdown_sells() {
        let mut closes: Vec<(Decimal, Decimal)> = (0..30)
            .map(|i| {
                let close = if i % 2 == 0 { dec!(100) } else { dec!(100.2) };
                (close, dec!(1000))
            })
            .collect();
        closes.push((dec!(95), dec!(3000)));
        let bars = make_bars(&closes);
        let strategy = BreakoutStrategy::new(small_config());

        assert_eq!(strategy.evaluate(&bars, 30), Signal::Sell);
    }

    #[test]
    fn test_failed_breakout_sells_on_reentry() {
        let mut closes: Vec<(Decimal, Decimal)> = (0..30)
            .map(|i| {
                let close = if i % 2 == 0 { dec!(100) } else { dec!(100.2) };
                (close, dec!(1000))
            })
            .collect();
        // Breakout bar, then a collapse back under the middle band
        closes.push((dec!(103), dec!(5000)));
        closes.push((dec!(99.5), dec!(2000)));
        let bars = make_bars(&closes);
        let strategy = BreakoutStrategy::new(small_config());

        assert_eq!(strategy.evaluate(&bars, 31), Signal::Sell);
    }
}
