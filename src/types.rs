//! Core data types used across the backtesting system

use chrono::NaiveDate;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Round half-up to a fixed number of decimal places.
///
/// All chained indicator recursions round intermediates to 10 places and
/// all reported values round to 2, so repeated runs are bit-identical.
pub fn round_half_up(value: Decimal, dp: u32) -> Decimal {
    value.round_dp_with_strategy(dp, RoundingStrategy::MidpointAwayFromZero)
}

/// Validation errors for price bar data
#[derive(Debug, Error)]
pub enum BarValidationError {
    #[error("high ({high}) must be >= low ({low})")]
    HighLessThanLow { high: Decimal, low: Decimal },

    #[error("volume ({0}) must be >= 0")]
    NegativeVolume(Decimal),

    #[error("open ({open}) must be between low ({low}) and high ({high})")]
    OpenOutOfRange {
        open: Decimal,
        low: Decimal,
        high: Decimal,
    },

    #[error("close ({close}) must be between low ({low}) and high ({high})")]
    CloseOutOfRange {
        close: Decimal,
        low: Decimal,
        high: Decimal,
    },

    #[error("prices must be positive: open={open}, high={high}, low={low}, close={close}")]
    NonPositivePrice {
        open: Decimal,
        high: Decimal,
        low: Decimal,
        close: Decimal,
    },
}

/// Validation errors for a whole price series
#[derive(Debug, Error)]
pub enum SeriesValidationError {
    #[error("bar {index}: {source}")]
    InvalidBar {
        index: usize,
        source: BarValidationError,
    },

    #[error("bar {index} ({date}) is not after the previous bar ({previous})")]
    NonAscendingDates {
        index: usize,
        date: NaiveDate,
        previous: NaiveDate,
    },
}

/// Daily OHLCV price bar
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceBar {
    pub date: NaiveDate,
    pub open: Decimal,
    pub high: Decimal,
    pub low: Decimal,
    pub close: Decimal,
    pub adj_close: Decimal,
    pub volume: Decimal,
}

impl PriceBar {
    /// Create a new bar with validation
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        date: NaiveDate,
        open: Decimal,
        high: Decimal,
        low: Decimal,
        close: Decimal,
        adj_close: Decimal,
        volume: Decimal,
    ) -> Result<Self, BarValidationError> {
        let bar = Self {
            date,
            open,
            high,
            low,
            close,
            adj_close,
            volume,
        };
        bar.validate()?;
        Ok(bar)
    }

    /// Create a bar without validation (for trusted sources or when validation is done separately)
    #[allow(clippy::too_many_arguments)]
    pub fn new_unchecked(
        date: NaiveDate,
        open: Decimal,
        high: Decimal,
        low: Decimal,
        close: Decimal,
        adj_close: Decimal,
        volume: Decimal,
    ) -> Self {
        Self {
            date,
            open,
            high,
            low,
            close,
            adj_close,
            volume,
        }
    }

    /// Validate the bar data
    pub fn validate(&self) -> Result<(), BarValidationError> {
        if self.open <= Decimal::ZERO
            || self.high <= Decimal::ZERO
            || self.low <= Decimal::ZERO
            || self.close <= Decimal::ZERO
        {
            return Err(BarValidationError::NonPositivePrice {
                open: self.open,
                high: self.high,
                low: self.low,
                close: self.close,
            });
        }

        if self.high < self.low {
            return Err(BarValidationError::HighLessThanLow {
                high: self.high,
                low: self.low,
            });
        }

        if self.volume < Decimal::ZERO {
            return Err(BarValidationError::NegativeVolume(self.volume));
        }

        if self.open < self.low || self.open > self.high {
            return Err(BarValidationError::OpenOutOfRange {
                open: self.open,
                low: self.low,
                high: self.high,
            });
        }

        if self.close < self.low || self.close > self.high {
            return Err(BarValidationError::CloseOutOfRange {
                close: self.close,
                low: self.low,
                high: self.high,
            });
        }

        Ok(())
    }

    /// Check if the bar is valid without returning detailed error
    pub fn is_valid(&self) -> bool {
        self.validate().is_ok()
    }

    /// Typical price (H + L + C) / 3, used by CCI, MFI, and VWAP
    pub fn typical_price(&self) -> Decimal {
        (self.high + self.low + self.close) / Decimal::from(3)
    }
}

/// Ordered, immutable series of price bars.
///
/// Built once by the data-loading side and handed read-only to the engines.
/// The constructor enforces per-bar OHLC consistency and strictly ascending
/// dates; the engines assume both and do not re-validate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PriceSeries {
    bars: Vec<PriceBar>,
}

impl PriceSeries {
    /// Create a validated series
    pub fn new(bars: Vec<PriceBar>) -> Result<Self, SeriesValidationError> {
        for (index, bar) in bars.iter().enumerate() {
            bar.validate()
                .map_err(|source| SeriesValidationError::InvalidBar { index, source })?;
            if index > 0 {
                let previous = bars[index - 1].date;
                if bar.date <= previous {
                    return Err(SeriesValidationError::NonAscendingDates {
                        index,
                        date: bar.date,
                        previous,
                    });
                }
            }
        }
        Ok(Self { bars })
    }

    /// Create a series without validation (for trusted sources)
    pub fn new_unchecked(bars: Vec<PriceBar>) -> Self {
        Self { bars }
    }

    pub fn bars(&self) -> &[PriceBar] {
        &self.bars
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&PriceBar> {
        self.bars.get(index)
    }
}

/// Equity trading signal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Signal {
    Buy,
    Sell,
    Hold,
}

/// Options trading signal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OptionSignal {
    Open,
    Close,
    Hold,
}

/// Equity trade direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Direction {
    Long,
    Short,
}

/// Option contract type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OptionType {
    Call,
    Put,
}

/// Options position direction (long or short premium)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OptionDirection {
    Buy,
    Sell,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn date(s: &str) -> NaiveDate {
        s.parse().unwrap()
    }

    fn bar(d: &str, close: Decimal) -> PriceBar {
        PriceBar::new_unchecked(
            date(d),
            close,
            close + dec!(1),
            close - dec!(1),
            close,
            close,
            dec!(1000),
        )
    }

    #[test]
    fn test_bar_validation() {
        let valid = PriceBar::new(
            date("2024-01-02"),
            dec!(100),
            dec!(105),
            dec!(95),
            dec!(102),
            dec!(102),
            dec!(1000),
        );
        assert!(valid.is_ok());

        let high_below_low = PriceBar::new(
            date("2024-01-02"),
            dec!(100),
            dec!(90),
            dec!(95),
            dec!(92),
            dec!(92),
            dec!(1000),
        );
        assert!(high_below_low.is_err());

        let negative_volume = PriceBar::new(
            date("2024-01-02"),
            dec!(100),
            dec!(105),
            dec!(95),
            dec!(102),
            dec!(102),
            dec!(-1),
        );
        assert!(negative_volume.is_err());
    }

    #[test]
    fn test_series_rejects_non_ascending_dates() {
        let bars = vec![bar("2024-01-03", dec!(100)), bar("2024-01-02", dec!(101))];
        let result = PriceSeries::new(bars);
        assert!(matches!(
            result,
            Err(SeriesValidationError::NonAscendingDates { index: 1, .. })
        ));
    }

    #[test]
    fn test_series_accepts_ascending_dates() {
        let bars = vec![bar("2024-01-02", dec!(100)), bar("2024-01-03", dec!(101))];
        let series = PriceSeries::new(bars).unwrap();
        assert_eq!(series.len(), 2);
    }

    #[test]
    fn test_typical_price() {
        let b = PriceBar::new_unchecked(
            date("2024-01-02"),
            dec!(10),
            dec!(12),
            dec!(8),
            dec!(10),
            dec!(10),
            dec!(100),
        );
        assert_eq!(b.typical_price(), dec!(10));
    }

    #[test]
    fn test_round_half_up() {
        assert_eq!(round_half_up(dec!(18.18181818), 2), dec!(18.18));
        assert_eq!(round_half_up(dec!(2.345), 2), dec!(2.35));
        assert_eq!(round_half_up(dec!(-2.345), 2), dec!(-2.35));
    }
}
