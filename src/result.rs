//! Backtest results and derived performance metrics
//!
//! Results are built incrementally by the engines: one `add_trade` per
//! closed position, one `record_equity` per bar, then `finalize`. Every
//! ratio metric is derived on demand from the trade list and equity curve;
//! nothing is stored redundantly.
//!
//! Numeric edge cases are defined fallbacks, not errors:
//! - no trades => win rate, profit factor, averages are all 0
//! - zero gross loss with positive gross profit => profit factor 999.99
//! - equity curve shorter than 2 points, or with zero variance => Sharpe 0

use chrono::NaiveDate;
use itertools::Itertools;
use rust_decimal::{Decimal, MathematicalOps};
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::trade::{OptionsTrade, Trade};
use crate::types::round_half_up;

/// Profit factor reported when there are winners and no losers
const PROFIT_FACTOR_CAP: Decimal = dec!(999.99);

/// Result of one equity backtest run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BacktestResult {
    pub strategy_name: String,
    pub initial_capital: Decimal,
    pub final_capital: Decimal,
    pub equity_curve: Vec<Decimal>,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub trades: Vec<Trade>,
}

impl BacktestResult {
    pub fn new(strategy_name: &str, initial_capital: Decimal, start_date: NaiveDate) -> Self {
        Self {
            strategy_name: strategy_name.to_string(),
            initial_capital,
            final_capital: initial_capital,
            equity_curve: Vec::new(),
            start_date,
            end_date: start_date,
            trades: Vec::new(),
        }
    }

    pub fn add_trade(&mut self, trade: Trade) {
        self.trades.push(trade);
    }

    pub fn record_equity(&mut self, equity: Decimal) {
        self.equity_curve.push(equity);
    }

    pub fn finalize(&mut self, final_capital: Decimal, end_date: NaiveDate) {
        self.final_capital = final_capital;
        self.end_date = end_date;
    }

    fn pnls(&self) -> Vec<Decimal> {
        self.trades.iter().map(|t| t.profit_loss).collect()
    }

    pub fn total_return(&self) -> Decimal {
        total_return_of(self.initial_capital, self.final_capital)
    }

    pub fn total_trades(&self) -> usize {
        self.trades.len()
    }

    pub fn winning_trades(&self) -> usize {
        self.pnls().iter().filter(|p| **p > Decimal::ZERO).count()
    }

    pub fn losing_trades(&self) -> usize {
        self.pnls().iter().filter(|p| **p <= Decimal::ZERO).count()
    }

    pub fn win_rate(&self) -> Decimal {
        win_rate_of(&self.pnls())
    }

    pub fn profit_factor(&self) -> Decimal {
        profit_factor_of(&self.pnls())
    }

    pub fn average_win(&self) -> Decimal {
        average_win_of(&self.pnls())
    }

    pub fn average_loss(&self) -> Decimal {
        average_loss_of(&self.pnls())
    }

    pub fn max_drawdown(&self) -> Decimal {
        max_drawdown_of(self.initial_capital, &self.equity_curve)
    }

    pub fn sharpe_ratio(&self) -> Decimal {
        sharpe_of(&self.equity_curve)
    }
}

/// Result of one options backtest run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OptionsBacktestResult {
    pub strategy_name: String,
    pub initial_capital: Decimal,
    pub final_capital: Decimal,
    pub equity_curve: Vec<Decimal>,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub trades: Vec<OptionsTrade>,
}

impl OptionsBacktestResult {
    pub fn new(strategy_name: &str, initial_capital: Decimal, start_date: NaiveDate) -> Self {
        Self {
            strategy_name: strategy_name.to_string(),
            initial_capital,
            final_capital: initial_capital,
            equity_curve: Vec::new(),
            start_date,
            end_date: start_date,
            trades: Vec::new(),
        }
    }

    pub fn add_trade(&mut self, trade: OptionsTrade) {
        self.trades.push(trade);
    }

    pub fn record_equity(&mut self, equity: Decimal) {
        self.equity_curve.push(equity);
    }

    pub fn finalize(&mut self, final_capital: Decimal, end_date: NaiveDate) {
        self.final_capital = final_capital;
        self.end_date = end_date;
    }

    fn pnls(&self) -> Vec<Decimal> {
        self.trades.iter().map(|t| t.profit_loss).collect()
    }

    pub fn total_return(&self) -> Decimal {
        total_return_of(self.initial_capital, self.final_capital)
    }

    pub fn total_trades(&self) -> usize {
        self.trades.len()
    }

    pub fn winning_trades(&self) -> usize {
        self.pnls().iter().filter(|p| **p > Decimal::ZERO).count()
    }

    pub fn losing_trades(&self) -> usize {
        self.pnls().iter().filter(|p| **p <= Decimal::ZERO).count()
    }

    pub fn win_rate(&self) -> Decimal {
        win_rate_of(&self.pnls())
    }

    pub fn profit_factor(&self) -> Decimal {
        profit_factor_of(&self.pnls())
    }

    pub fn average_win(&self) -> Decimal {
        average_win_of(&self.pnls())
    }

    pub fn average_loss(&self) -> Decimal {
        average_loss_of(&self.pnls())
    }

    pub fn max_drawdown(&self) -> Decimal {
        max_drawdown_of(self.initial_capital, &self.equity_curve)
    }

    pub fn sharpe_ratio(&self) -> Decimal {
        sharpe_of(&self.equity_curve)
    }
}

// =============================================================================
// Shared metric computations
// =============================================================================

fn total_return_of(initial: Decimal, final_capital: Decimal) -> Decimal {
    if initial.is_zero() {
        return Decimal::ZERO;
    }
    round_half_up((final_capital - initial) / initial * dec!(100), 2)
}

fn win_rate_of(pnls: &[Decimal]) -> Decimal {
    if pnls.is_empty() {
        return Decimal::ZERO;
    }
    let winners = pnls.iter().filter(|p| **p > Decimal::ZERO).count();
    round_half_up(
        Decimal::from(winners) / Decimal::from(pnls.len()) * dec!(100),
        2,
    )
}

fn profit_factor_of(pnls: &[Decimal]) -> Decimal {
    if pnls.is_empty() {
        return Decimal::ZERO;
    }
    let gross_profit: Decimal = pnls.iter().filter(|p| **p > Decimal::ZERO).sum();
    let gross_loss: Decimal = pnls
        .iter()
        .filter(|p| **p < Decimal::ZERO)
        .map(|p| p.abs())
        .sum();

    if gross_loss.is_zero() {
        if gross_profit > Decimal::ZERO {
            PROFIT_FACTOR_CAP
        } else {
            Decimal::ZERO
        }
    } else {
        round_half_up(gross_profit / gross_loss, 2)
    }
}

fn average_win_of(pnls: &[Decimal]) -> Decimal {
    let winners: Vec<Decimal> = pnls.iter().filter(|p| **p > Decimal::ZERO).copied().collect();
    if winners.is_empty() {
        return Decimal::ZERO;
    }
    round_half_up(
        winners.iter().sum::<Decimal>() / Decimal::from(winners.len()),
        2,
    )
}

/// Average losing trade, reported as a positive magnitude
fn average_loss_of(pnls: &[Decimal]) -> Decimal {
    let losers: Vec<Decimal> = pnls
        .iter()
        .filter(|p| **p < Decimal::ZERO)
        .map(|p| p.abs())
        .collect();
    if losers.is_empty() {
        return Decimal::ZERO;
    }
    round_half_up(
        losers.iter().sum::<Decimal>() / Decimal::from(losers.len()),
        2,
    )
}

fn max_drawdown_of(initial: Decimal, curve: &[Decimal]) -> Decimal {
    let mut peak = initial;
    let mut max_dd = Decimal::ZERO;
    for equity in curve {
        if *equity > peak {
            peak = *equity;
        }
        if peak > Decimal::ZERO {
            let dd = (peak - *equity) / peak;
            if dd > max_dd {
                max_dd = dd;
            }
        }
    }
    round_half_up(max_dd * dec!(100), 2)
}

fn sharpe_of(curve: &[Decimal]) -> Decimal {
    if curve.len() < 2 {
        return Decimal::ZERO;
    }
    let returns: Vec<Decimal> = curve
        .iter()
        .tuple_windows()
        .map(|(prev, next)| {
            if prev.is_zero() {
                Decimal::ZERO
            } else {
                (*next - *prev) / *prev
            }
        })
        .collect();
    if returns.len() < 2 {
        return Decimal::ZERO;
    }

    let n = Decimal::from(returns.len());
    let mean = returns.iter().sum::<Decimal>() / n;
    let variance = returns
        .iter()
        .map(|r| {
            let diff = *r - mean;
            diff * diff
        })
        .sum::<Decimal>()
        / (n - Decimal::ONE);
    let std_dev = variance.sqrt().unwrap_or(Decimal::ZERO);
    if std_dev.is_zero() {
        return Decimal::ZERO;
    }

    let annualization = dec!(252).sqrt().unwrap_or(Decimal::ZERO);
    round_half_up(mean / std_dev * annualization, 2)
}
