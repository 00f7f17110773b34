//! Stock Strategies Backtesting System
//!
//! Evaluates trading strategies against historical price series and
//! derives performance metrics, featuring a technical-indicator library,
//! equity and options simulation engines, and Black-Scholes pricing for
//! synthetic option premiums.
//!
//! All price, indicator, and accounting arithmetic runs on fixed-point
//! decimals (`rust_decimal`) with round-half-up rounding, so repeated runs
//! over the same series are bit-identical.
//!
//! ## Equity backtest example
//! ```
//! use rust_decimal_macros::dec;
//! use stock_strategies::backtest::BacktestEngine;
//! use stock_strategies::strategies::create_strategy;
//! use stock_strategies::{PriceBar, PriceSeries};
//!
//! # fn main() -> anyhow::Result<()> {
//! let bars: Vec<PriceBar> = (0..60)
//!     .map(|i| {
//!         let date = chrono::NaiveDate::from_ymd_opt(2024, 1, 1).unwrap()
//!             + chrono::Days::new(i);
//!         let close = dec!(100) + rust_decimal::Decimal::from(i);
//!         PriceBar::new_unchecked(date, close, close + dec!(1), close - dec!(1), close, close, dec!(1000))
//!     })
//!     .collect();
//! let series = PriceSeries::new(bars)?;
//!
//! let strategy = create_strategy("sma_crossover", &serde_json::json!({}))?;
//! let engine = BacktestEngine::new(dec!(100000), dec!(5));
//! let result = engine.run(strategy.as_ref(), &series)?;
//! println!("return: {}%", result.total_return());
//! # Ok(())
//! # }
//! ```

pub mod backtest;
pub mod config;
pub mod error;
pub mod indicators;
pub mod options_backtest;
pub mod pricing;
pub mod result;
pub mod strategies;
pub mod trade;
pub mod types;

pub use backtest::BacktestEngine;
pub use config::{BacktestConfig, Config, OptionsBacktestConfig};
pub use error::EngineError;
pub use indicators::IndicatorValues;
pub use options_backtest::OptionsBacktestEngine;
pub use result::{BacktestResult, OptionsBacktestResult};
pub use strategies::{OptionsStrategy, Strategy};
pub use trade::{OptionsTrade, OptionsTradeStatus, Trade, TradeStatus};
pub use types::{
    Direction, OptionDirection, OptionSignal, OptionType, PriceBar, PriceSeries, Signal,
};
