//! Options backtesting engine
//!
//! Same loop shape as the equity engine, but positions are priced with the
//! Black-Scholes model rather than raw spot: volatility is re-estimated
//! from the trailing close window for every pricing call, premiums are
//! booked in cents, and cash flows flip sign with the position direction
//! (buying debits, writing credits). Commission is charged per contract on
//! opening and closing orders; expiry settles at intrinsic value with no
//! order commission.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use crate::error::EngineError;
use crate::pricing::{estimate_volatility, intrinsic_value, price};
use crate::result::OptionsBacktestResult;
use crate::strategies::OptionsStrategy;
use crate::trade::{OptionsTrade, CONTRACT_MULTIPLIER};
use crate::types::{round_half_up, OptionDirection, OptionSignal, PriceBar, PriceSeries};

const DAYS_PER_YEAR: Decimal = dec!(365);
/// Fraction of capital one contract's notional is sized against
const CAPITAL_FRACTION: Decimal = dec!(0.10);
const MAX_CONTRACTS: Decimal = dec!(10);

/// Options backtest engine, one instance per run
pub struct OptionsBacktestEngine {
    initial_capital: Decimal,
    commission_per_contract: Decimal,
    risk_free_rate: Decimal,
    volatility_lookback: usize,
}

impl OptionsBacktestEngine {
    pub fn new(
        initial_capital: Decimal,
        commission_per_contract: Decimal,
        risk_free_rate: Decimal,
        volatility_lookback: usize,
    ) -> Self {
        Self {
            initial_capital,
            commission_per_contract,
            risk_free_rate,
            volatility_lookback,
        }
    }

    fn contract_size(&self, close: Decimal) -> u32 {
        let raw = (close * CONTRACT_MULTIPLIER / (self.initial_capital * CAPITAL_FRACTION)).floor();
        raw.min(MAX_CONTRACTS).max(Decimal::ONE).to_u32().unwrap_or(1)
    }

    /// Premium for the open trade at the current bar, booked in cents
    fn mark_premium(&self, trade: &OptionsTrade, bar: &PriceBar, vol: Decimal) -> Decimal {
        let days_left = (trade.expiration_date - bar.date).num_days().max(0);
        let time_to_expiry = Decimal::from(days_left) / DAYS_PER_YEAR;
        round_half_up(
            price(
                trade.option_type,
                bar.close,
                trade.strike,
                time_to_expiry,
                self.risk_free_rate,
                vol,
            ),
            2,
        )
    }

    /// Run the strategy over the full series.
    pub fn run(
        &self,
        strategy: &dyn OptionsStrategy,
        series: &PriceSeries,
    ) -> Result<OptionsBacktestResult, EngineError> {
        let bars = series.bars();
        if bars.is_empty() {
            return Err(EngineError::EmptySeries);
        }

        let closes: Vec<Decimal> = bars.iter().map(|b| b.close).collect();
        let mut cash = self.initial_capital;
        let mut current_trade: Option<OptionsTrade> = None;
        let mut result =
            OptionsBacktestResult::new(strategy.name(), self.initial_capital, bars[0].date);

        for (i, bar) in bars.iter().enumerate() {
            let vol = estimate_volatility(&closes[..=i], self.volatility_lookback);
            let signal = strategy.evaluate(bars, i);

            // Settle an expired position before marking or acting
            let expired = current_trade
                .as_ref()
                .is_some_and(|t| bar.date >= t.expiration_date);
            if expired {
                if let Some(mut trade) = current_trade.take() {
                    let settlement = round_half_up(
                        intrinsic_value(trade.option_type, bar.close, trade.strike),
                        2,
                    );
                    let settlement_value =
                        settlement * Decimal::from(trade.contracts) * CONTRACT_MULTIPLIER;
                    match trade.direction {
                        OptionDirection::Buy => cash += settlement_value,
                        OptionDirection::Sell => cash -= settlement_value,
                    }
                    trade.expire(bar.date, settlement)?;
                    tracing::info!(
                        date = %bar.date,
                        settlement = %settlement,
                        pnl = %trade.profit_loss,
                        "Option expired"
                    );
                    result.add_trade(trade);
                }
            }

            // Mark to market before acting on the signal
            let equity = match &current_trade {
                Some(trade) => {
                    let mark = self.mark_premium(trade, bar, vol);
                    let mark_value = mark * Decimal::from(trade.contracts) * CONTRACT_MULTIPLIER;
                    match trade.direction {
                        OptionDirection::Buy => cash + mark_value,
                        OptionDirection::Sell => cash + trade.entry_cost() - mark_value,
                    }
                }
                None => cash,
            };
            result.record_equity(equity);

            match signal {
                OptionSignal::Open if current_trade.is_none() => {
                    let strike = strategy.strike_price(bars, i);
                    let dte = strategy.days_to_expiry();
                    let time_to_expiry = Decimal::from(dte) / DAYS_PER_YEAR;
                    let premium = round_half_up(
                        price(
                            strategy.option_type(),
                            bar.close,
                            strike,
                            time_to_expiry,
                            self.risk_free_rate,
                            vol,
                        ),
                        2,
                    );
                    // A worthless premium means there is nothing to trade
                    if premium > Decimal::ZERO {
                        let contracts = self.contract_size(bar.close);
                        let premium_value =
                            premium * Decimal::from(contracts) * CONTRACT_MULTIPLIER;
                        let commission = self.commission_per_contract * Decimal::from(contracts);
                        match strategy.direction() {
                            OptionDirection::Buy => cash -= premium_value + commission,
                            OptionDirection::Sell => cash += premium_value - commission,
                        }

                        let expiration_date = bar.date + chrono::Duration::days(dte);
                        tracing::info!(
                            date = %bar.date,
                            strike = %strike,
                            premium = %premium,
                            contracts,
                            "Option position opened"
                        );
                        current_trade = Some(OptionsTrade::open(
                            strategy.option_type(),
                            strategy.direction(),
                            strike,
                            expiration_date,
                            bar.date,
                            premium,
                            contracts,
                            bar.volume,
                        )?);
                    }
                }
                OptionSignal::Close => {
                    if let Some(mut trade) = current_trade.take() {
                        let premium = self.mark_premium(&trade, bar, vol);
                        let premium_value =
                            premium * Decimal::from(trade.contracts) * CONTRACT_MULTIPLIER;
                        let commission =
                            self.commission_per_contract * Decimal::from(trade.contracts);
                        match trade.direction {
                            OptionDirection::Buy => cash += premium_value - commission,
                            OptionDirection::Sell => cash -= premium_value + commission,
                        }
                        trade.close(bar.date, premium)?;
                        tracing::info!(
                            date = %bar.date,
                            premium = %premium,
                            pnl = %trade.profit_loss,
                            "Option position closed"
                        );
                        result.add_trade(trade);
                    }
                }
                _ => {}
            }
        }

        // Force-close anything still open, priced a day from expiry
        if let Some(mut trade) = current_trade.take() {
            let last = &bars[bars.len() - 1];
            let vol = estimate_volatility(&closes, self.volatility_lookback);
            let premium = round_half_up(
                price(
                    trade.option_type,
                    last.close,
                    trade.strike,
                    Decimal::ONE / DAYS_PER_YEAR,
                    self.risk_free_rate,
                    vol,
                ),
                2,
            );
            let premium_value = premium * Decimal::from(trade.contracts) * CONTRACT_MULTIPLIER;
            let commission = self.commission_per_contract * Decimal::from(trade.contracts);
            match trade.direction {
                OptionDirection::Buy => cash += premium_value - commission,
                OptionDirection::Sell => cash -= premium_value + commission,
            }
            trade.close(last.date, premium)?;
            tracing::info!(
                date = %last.date,
                premium = %premium,
                pnl = %trade.profit_loss,
                "Option position closed at end of data"
            );
            result.add_trade(trade);
        }

        result.finalize(cash, bars[bars.len() - 1].date);
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::trade::OptionsTradeStatus;
    use crate::types::OptionType;
    use chrono::NaiveDate;

    fn make_series(closes: &[Decimal]) -> PriceSeries {
        let bars = closes
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
            .collect();
        PriceSeries::new_unchecked(bars)
    }

    /// Scripted options strategy with fixed contract terms
    struct ScriptedOptions {
        signals: Vec<OptionSignal>,
        option_type: OptionType,
        direction: OptionDirection,
        strike: Decimal,
        dte: i64,
    }

    impl OptionsStrategy for ScriptedOptions {
        fn name(&self) -> &'static str {
            "scripted_options"
        }

        fn warmup_period(&self) -> usize {
            1
        }

        fn evaluate(&self, _bars: &[PriceBar], index: usize) -> OptionSignal {
            self.signals.get(index).copied().unwrap_or(OptionSignal::Hold)
        }

        fn strike_price(&self, _bars: &[PriceBar], _index: usize) -> Decimal {
            self.strike
        }

        fn days_to_expiry(&self) -> i64 {
            self.dte
        }

        fn option_type(&self) -> OptionType {
            self.option_type
        }

        fn direction(&self) -> OptionDirection {
            self.direction
        }
    }

    fn engine() -> OptionsBacktestEngine {
        OptionsBacktestEngine::new(dec!(100000), dec!(0.65), dec!(0.05), 20)
    }

    #[test]
    fn test_empty_series_fails() {
        let strategy = ScriptedOptions {
            signals: vec![],
            option_type: OptionType::Call,
            direction: OptionDirection::Buy,
            strike: dec!(100),
            dte: 30,
        };
        let result = engine().run(&strategy, &make_series(&[]));
        assert!(matches!(result, Err(EngineError::EmptySeries)));
    }

    #[test]
    fn test_long_call_round_trip_accounting() {
        let strategy = ScriptedOptions {
            signals: vec![
                OptionSignal::Open,
                OptionSignal::Hold,
                OptionSignal::Close,
                OptionSignal::Hold,
            ],
            option_type: OptionType::Call,
            direction: OptionDirection::Buy,
            strike: dec!(100),
            dte: 30,
        };
        let series = make_series(&[dec!(100), dec!(104), dec!(108), dec!(108)]);
        let result = engine().run(&strategy, &series).unwrap();

        assert_eq!(result.trades.len(), 1);
        let trade = &result.trades[0];
        assert_eq!(trade.status, OptionsTradeStatus::Closed);
        assert_eq!(trade.contracts, 1);
        assert!(trade.entry_premium > Decimal::ZERO);
        // Spot rallied well above the strike; the long call gained
        assert!(trade.profit_loss > Decimal::ZERO);

        // Round-trip identity: final = initial + pnl - commission both ways
        let commissions = dec!(0.65) * Decimal::from(trade.contracts) * dec!(2);
        assert_eq!(
            result.final_capital,
            dec!(100000) + trade.profit_loss - commissions
        );
    }

    #[test]
    fn test_short_call_round_trip_accounting() {
        let strategy = ScriptedOptions {
            signals: vec![
                OptionSignal::Open,
                OptionSignal::Hold,
                OptionSignal::Close,
                OptionSignal::Hold,
            ],
            option_type: OptionType::Call,
            direction: OptionDirection::Sell,
            strike: dec!(110),
            dte: 30,
        };
        let series = make_series(&[dec!(100), dec!(99), dec!(98), dec!(98)]);
        let result = engine().run(&strategy, &series).unwrap();

        assert_eq!(result.trades.len(), 1);
        let trade = &result.trades[0];
        // Premium decayed as spot fell; the writer keeps the difference
        let commissions = dec!(0.65) * Decimal::from(trade.contracts) * dec!(2);
        assert_eq!(
            result.final_capital,
            dec!(100000) + trade.profit_loss - commissions
        );
    }

    #[test]
    fn test_expiry_settles_at_intrinsic_without_commission() {
        let strategy = ScriptedOptions {
            signals: vec![OptionSignal::Open],
            option_type: OptionType::Call,
            direction: OptionDirection::Buy,
            strike: dec!(100),
            dte: 2,
        };
        let series = make_series(&[dec!(100), dec!(103), dec!(106), dec!(106)]);
        let result = engine().run(&strategy, &series).unwrap();

        assert_eq!(result.trades.len(), 1);
        let trade = &result.trades[0];
        assert_eq!(trade.status, OptionsTradeStatus::Expired);
        // Settled at intrinsic value on the expiry bar
        assert_eq!(trade.exit_premium, Some(dec!(6)));

        // Only the opening order paid commission
        let commission = dec!(0.65) * Decimal::from(trade.contracts);
        assert_eq!(
            result.final_capital,
            dec!(100000) + trade.profit_loss - commission
        );
    }

    #[test]
    fn test_open_skipped_when_premium_is_worthless() {
        // Deep out-of-the-money put on a flat series prices at zero cents
        let strategy = ScriptedOptions {
            signals: vec![OptionSignal::Open, OptionSignal::Hold, OptionSignal::Hold],
            option_type: OptionType::Put,
            direction: OptionDirection::Buy,
            strike: dec!(10),
            dte: 5,
        };
        let series = make_series(&[dec!(100), dec!(100), dec!(100)]);
        let result = engine().run(&strategy, &series).unwrap();

        assert!(result.trades.is_empty());
        assert_eq!(result.final_capital, dec!(100000));
    }

    #[test]
    fn test_open_while_open_is_a_no_op() {
        let strategy = ScriptedOptions {
            signals: vec![OptionSignal::Open, OptionSignal::Open, OptionSignal::Open],
            option_type: OptionType::Call,
            direction: OptionDirection::Buy,
            strike: dec!(100),
            dte: 30,
        };
        let series = make_series(&[dec!(100), dec!(101), dec!(102)]);
        let result = engine().run(&strategy, &series).unwrap();

        // One open, force-closed at end of data
        assert_eq!(result.trades.len(), 1);
    }

    #[test]
    fn test_end_of_series_force_close() {
        let strategy = ScriptedOptions {
            signals: vec![OptionSignal::Open, OptionSignal::Hold],
            option_type: OptionType::Call,
            direction: OptionDirection::Buy,
            strike: dec!(95),
            dte: 30,
        };
        let series = make_series(&[dec!(100), dec!(102)]);
        let result = engine().run(&strategy, &series).unwrap();

        assert_eq!(result.trades.len(), 1);
        let trade = &result.trades[0];
        assert_eq!(trade.status, OptionsTradeStatus::Closed);
        // Repriced a day from expiry: still worth at least intrinsic
        assert!(trade.exit_premium.unwrap() >= dec!(7));
    }

    #[test]
    fn test_determinism_across_runs() {
        let strategy = ScriptedOptions {
            signals: vec![
                OptionSignal::Open,
                OptionSignal::Hold,
                OptionSignal::Close,
                OptionSignal::Open,
                OptionSignal::Hold,
            ],
            option_type: OptionType::Put,
            direction: OptionDirection::Buy,
            strike: dec!(100),
            dte: 30,
        };
        let series = make_series(&[dec!(100), dec!(97), dec!(95), dec!(96), dec!(94)]);

        let first = engine().run(&strategy, &series).unwrap();
        let second = engine().run(&strategy, &series).unwrap();

        assert_eq!(first.final_capital, second.final_capital);
        assert_eq!(first.equity_curve, second.equity_curve);
        assert_eq!(first.trades.len(), second.trades.len());
    }
}
