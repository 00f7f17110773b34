//! Trade lifecycle records
//!
//! A `Trade` is created by the equity engine when it accepts an entry signal
//! and mutated exactly once by `close`. An `OptionsTrade` additionally may
//! terminate by expiry; `close` and `expire` are mutually exclusive.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::error::EngineError;
use crate::types::{round_half_up, Direction, OptionDirection, OptionType};

/// Shares per option contract
pub const CONTRACT_MULTIPLIER: Decimal = dec!(100);

/// Equity trade status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TradeStatus {
    Open,
    Closed,
}

/// Options trade status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OptionsTradeStatus {
    Open,
    Closed,
    Expired,
}

/// Single-position equity trade record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Trade {
    pub direction: Direction,
    pub entry_date: NaiveDate,
    pub entry_price: Decimal,
    pub shares: Decimal,
    pub status: TradeStatus,
    pub exit_date: Option<NaiveDate>,
    pub exit_price: Option<Decimal>,
    pub profit_loss: Decimal,
    pub return_pct: Decimal,
}

impl Trade {
    /// Open a new trade
    pub fn open(
        direction: Direction,
        entry_date: NaiveDate,
        entry_price: Decimal,
        shares: Decimal,
    ) -> Self {
        Self {
            direction,
            entry_date,
            entry_price,
            shares,
            status: TradeStatus::Open,
            exit_date: None,
            exit_price: None,
            profit_loss: Decimal::ZERO,
            return_pct: Decimal::ZERO,
        }
    }

    pub fn is_open(&self) -> bool {
        self.status == TradeStatus::Open
    }

    /// Close the trade and compute P/L.
    ///
    /// Closing an already-closed trade is a caller bug and fails.
    pub fn close(&mut self, exit_date: NaiveDate, exit_price: Decimal) -> Result<(), EngineError> {
        if self.status == TradeStatus::Closed {
            return Err(EngineError::TradeAlreadyClosed);
        }

        let per_share = match self.direction {
            Direction::Long => exit_price - self.entry_price,
            Direction::Short => self.entry_price - exit_price,
        };

        self.status = TradeStatus::Closed;
        self.exit_date = Some(exit_date);
        self.exit_price = Some(exit_price);
        self.profit_loss = per_share * self.shares;
        self.return_pct = if self.entry_price.is_zero() {
            Decimal::ZERO
        } else {
            round_half_up(per_share / self.entry_price * dec!(100), 2)
        };
        Ok(())
    }
}

/// Single-position options trade record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OptionsTrade {
    pub option_type: OptionType,
    pub direction: OptionDirection,
    pub strike: Decimal,
    pub expiration_date: NaiveDate,
    pub entry_date: NaiveDate,
    pub entry_premium: Decimal,
    pub contracts: u32,
    pub entry_volume: Decimal,
    pub status: OptionsTradeStatus,
    pub exit_date: Option<NaiveDate>,
    pub exit_premium: Option<Decimal>,
    pub profit_loss: Decimal,
    pub return_pct: Decimal,
}

impl OptionsTrade {
    /// Open a new options trade; `contracts` must be positive.
    #[allow(clippy::too_many_arguments)]
    pub fn open(
        option_type: OptionType,
        direction: OptionDirection,
        strike: Decimal,
        expiration_date: NaiveDate,
        entry_date: NaiveDate,
        entry_premium: Decimal,
        contracts: u32,
        entry_volume: Decimal,
    ) -> Result<Self, EngineError> {
        if contracts == 0 {
            return Err(EngineError::InvalidContracts(contracts));
        }
        Ok(Self {
            option_type,
            direction,
            strike,
            expiration_date,
            entry_date,
            entry_premium,
            contracts,
            entry_volume,
            status: OptionsTradeStatus::Open,
            exit_date: None,
            exit_premium: None,
            profit_loss: Decimal::ZERO,
            return_pct: Decimal::ZERO,
        })
    }

    pub fn is_open(&self) -> bool {
        self.status == OptionsTradeStatus::Open
    }

    /// Total premium paid or received at entry
    pub fn entry_cost(&self) -> Decimal {
        self.entry_premium * Decimal::from(self.contracts) * CONTRACT_MULTIPLIER
    }

    /// Close the trade at a premium
    pub fn close(&mut self, exit_date: NaiveDate, exit_premium: Decimal) -> Result<(), EngineError> {
        self.settle(OptionsTradeStatus::Closed, exit_date, exit_premium)
    }

    /// Expire the trade at a settlement premium (intrinsic value at expiry)
    pub fn expire(
        &mut self,
        exit_date: NaiveDate,
        settlement_premium: Decimal,
    ) -> Result<(), EngineError> {
        self.settle(OptionsTradeStatus::Expired, exit_date, settlement_premium)
    }

    fn settle(
        &mut self,
        status: OptionsTradeStatus,
        exit_date: NaiveDate,
        exit_premium: Decimal,
    ) -> Result<(), EngineError> {
        match self.status {
            OptionsTradeStatus::Open => {}
            OptionsTradeStatus::Closed => {
                return Err(EngineError::TradeAlreadySettled { status: "closed" })
            }
            OptionsTradeStatus::Expired => {
                return Err(EngineError::TradeAlreadySettled { status: "expired" })
            }
        }

        let per_contract = match self.direction {
            OptionDirection::Buy => exit_premium - self.entry_premium,
            OptionDirection::Sell => self.entry_premium - exit_premium,
        };

        self.status = status;
        self.exit_date = Some(exit_date);
        self.exit_premium = Some(exit_premium);
        self.profit_loss = per_contract * Decimal::from(self.contracts) * CONTRACT_MULTIPLIER;
        self.return_pct = if self.entry_premium.is_zero() {
            Decimal::ZERO
        } else {
            round_half_up(self.profit_loss / self.entry_cost() * dec!(100), 2)
        };
        Ok(())
    }
}
