//! Equity backtesting engine
//!
//! Drives one strategy over one price series: evaluate the signal, mark
//! equity to market, then act. The engine owns the cash balance and at
//! most one open trade; a buy signal while a position is open is a no-op.
//! Fills happen at the bar's close with a flat commission per order.

use rust_decimal::Decimal;

use crate::error::EngineError;
use crate::result::BacktestResult;
use crate::strategies::Strategy;
use crate::trade::Trade;
use crate::types::{Direction, PriceSeries, Signal};

/// Backtest engine, one instance per run
pub struct BacktestEngine {
    initial_capital: Decimal,
    commission: Decimal,
}

impl BacktestEngine {
    pub fn new(initial_capital: Decimal, commission: Decimal) -> Self {
        Self {
            initial_capital,
            commission,
        }
    }

    /// Run the strategy over the full series.
    ///
    /// Fails before any bar is processed when the series is empty. A trade
    /// still open after the last bar is force-closed at that bar's close,
    /// with commission charged as usual.
    pub fn run(
        &self,
        strategy: &dyn Strategy,
        series: &PriceSeries,
    ) -> Result<BacktestResult, EngineError> {
        let bars = series.bars();
        if bars.is_empty() {
            return Err(EngineError::EmptySeries);
        }

        let mut cash = self.initial_capital;
        let mut current_trade: Option<Trade> = None;
        let mut result = BacktestResult::new(strategy.name(), self.initial_capital, bars[0].date);

        for (i, bar) in bars.iter().enumerate() {
            let signal = strategy.evaluate(bars, i);

            // Mark to market before acting on the signal
            let equity = match &current_trade {
                Some(trade) => cash + bar.close * trade.shares,
                None => cash,
            };
            result.record_equity(equity);

            match signal {
                Signal::Buy if current_trade.is_none() => {
                    let shares = ((cash - self.commission) / bar.close).floor();
                    if shares > Decimal::ZERO {
                        cash -= shares * bar.close + self.commission;
                        tracing::info!(
                            date = %bar.date,
                            price = %bar.close,
                            shares = %shares,
                            "BUY executed"
                        );
                        current_trade =
                            Some(Trade::open(Direction::Long, bar.date, bar.close, shares));
                    }
                }
                Signal::Sell => {
                    if let Some(mut trade) = current_trade.take() {
                        cash += bar.close * trade.shares - self.commission;
                        trade.close(bar.date, bar.close)?;
                        tracing::info!(
                            date = %bar.date,
                            price = %bar.close,
                            pnl = %trade.profit_loss,
                            "SELL executed"
                        );
                        result.add_trade(trade);
                    }
                }
                _ => {}
            }
        }

        // Force-close anything still open at the last bar
        if let Some(mut trade) = current_trade.take() {
            let last = &bars[bars.len() - 1];
            cash += last.close * trade.shares - self.commission;
            trade.close(last.date, last.close)?;
            tracing::info!(
                date = %last.date,
                price = %last.close,
                pnl = %trade.profit_loss,
                "Position closed at end of data"
            );
            result.add_trade(trade);
        }

        result.finalize(cash, bars[bars.len() - 1].date);
        Ok(result)
    }
}
