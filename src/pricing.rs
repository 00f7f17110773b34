//! Black-Scholes option pricing
//!
//! Values synthetic option premiums when no real options-market data is
//! available. The API speaks `Decimal` like the rest of the crate; the
//! transcendental math runs in f64 and every result is rounded half-up to
//! 10 fractional digits, so all call sites observe one defined scale.
//!
//! The cumulative standard normal comes from `statrs` and is used at every
//! call site; no polynomial approximation is mixed in anywhere.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use statrs::distribution::{ContinuousCDF, Normal};
use std::f64::consts::PI;

use crate::types::{round_half_up, OptionType};

/// Trading days per year used to annualize historical volatility
const TRADING_DAYS_PER_YEAR: f64 = 252.0;

/// Volatility floor and fallback for degenerate estimation windows
const MIN_VOLATILITY: Decimal = dec!(0.01);
const DEFAULT_VOLATILITY: Decimal = dec!(0.20);

fn to_f64(value: Decimal) -> f64 {
    value.to_f64().unwrap_or(0.0)
}

fn to_decimal(value: f64) -> Decimal {
    Decimal::from_f64_retain(value)
        .map(|d| round_half_up(d, 10))
        .unwrap_or(Decimal::ZERO)
}

/// Standard normal CDF
fn norm_cdf(x: f64) -> f64 {
    let normal = Normal::new(0.0, 1.0).unwrap();
    normal.cdf(x)
}

/// Standard normal PDF
fn norm_pdf(x: f64) -> f64 {
    (-0.5 * x * x).exp() / (2.0 * PI).sqrt()
}

fn d1(spot: f64, strike: f64, time: f64, rate: f64, vol: f64) -> f64 {
    ((spot / strike).ln() + (rate + 0.5 * vol * vol) * time) / (vol * time.sqrt())
}

fn d2(spot: f64, strike: f64, time: f64, rate: f64, vol: f64) -> f64 {
    d1(spot, strike, time, rate, vol) - vol * time.sqrt()
}

/// Exercise value of the option at a spot price
pub fn intrinsic_value(option_type: OptionType, spot: Decimal, strike: Decimal) -> Decimal {
    match option_type {
        OptionType::Call => (spot - strike).max(Decimal::ZERO),
        OptionType::Put => (strike - spot).max(Decimal::ZERO),
    }
}

/// Black-Scholes premium; collapses to intrinsic value when the option has
/// expired or volatility is zero. Never negative.
pub fn price(
    option_type: OptionType,
    spot: Decimal,
    strike: Decimal,
    time_to_expiry: Decimal,
    risk_free_rate: Decimal,
    vol: Decimal,
) -> Decimal {
    if time_to_expiry <= Decimal::ZERO || vol <= Decimal::ZERO {
        return intrinsic_value(option_type, spot, strike);
    }

    let s = to_f64(spot);
    let k = to_f64(strike);
    let t = to_f64(time_to_expiry);
    let r = to_f64(risk_free_rate);
    let v = to_f64(vol);

    let d1 = d1(s, k, t, r, v);
    let d2 = d2(s, k, t, r, v);

    let value = match option_type {
        OptionType::Call => s * norm_cdf(d1) - k * (-r * t).exp() * norm_cdf(d2),
        OptionType::Put => k * (-r * t).exp() * norm_cdf(-d2) - s * norm_cdf(-d1),
    };

    to_decimal(value.max(0.0))
}

/// Option delta; at expiry or zero volatility it snaps to the moneyness
/// boundary (1/0 for calls, -1/0 for puts).
pub fn delta(
    option_type: OptionType,
    spot: Decimal,
    strike: Decimal,
    time_to_expiry: Decimal,
    risk_free_rate: Decimal,
    vol: Decimal,
) -> Decimal {
    if time_to_expiry <= Decimal::ZERO || vol <= Decimal::ZERO {
        return match option_type {
            OptionType::Call => {
                if spot > strike {
                    Decimal::ONE
                } else {
                    Decimal::ZERO
                }
            }
            OptionType::Put => {
                if spot < strike {
                    Decimal::NEGATIVE_ONE
                } else {
                    Decimal::ZERO
                }
            }
        };
    }

    let d1 = d1(
        to_f64(spot),
        to_f64(strike),
        to_f64(time_to_expiry),
        to_f64(risk_free_rate),
        to_f64(vol),
    );

    match option_type {
        OptionType::Call => to_decimal(norm_cdf(d1)),
        OptionType::Put => to_decimal(norm_cdf(d1) - 1.0),
    }
}

/// Option theta per calendar day; zero at expiry or zero volatility.
pub fn theta(
    option_type: OptionType,
    spot: Decimal,
    strike: Decimal,
    time_to_expiry: Decimal,
    risk_free_rate: Decimal,
    vol: Decimal,
) -> Decimal {
    if time_to_expiry <= Decimal::ZERO || vol <= Decimal::ZERO {
        return Decimal::ZERO;
    }

    let s = to_f64(spot);
    let k = to_f64(strike);
    let t = to_f64(time_to_expiry);
    let r = to_f64(risk_free_rate);
    let v = to_f64(vol);

    let d1 = d1(s, k, t, r, v);
    let d2 = d2(s, k, t, r, v);
    let decay = -s * norm_pdf(d1) * v / (2.0 * t.sqrt());

    let annual = match option_type {
        OptionType::Call => decay - r * k * (-r * t).exp() * norm_cdf(d2),
        OptionType::Put => decay + r * k * (-r * t).exp() * norm_cdf(-d2),
    };

    to_decimal(annual / 365.0)
}

/// Annualized historical volatility from the trailing `lookback` closes.
///
/// Standard deviation of log returns scaled by sqrt(252), floored at 0.01.
/// With fewer than 2 usable (positive) prices the estimate defaults to 0.20.
pub fn estimate_volatility(closes: &[Decimal], lookback: usize) -> Decimal {
    let start = closes.len().saturating_sub(lookback);
    let usable: Vec<f64> = closes[start..]
        .iter()
        .filter(|c| **c > Decimal::ZERO)
        .map(|c| to_f64(*c))
        .collect();

    if usable.len() < 2 {
        return DEFAULT_VOLATILITY;
    }

    let returns: Vec<f64> = usable.windows(2).map(|w| (w[1] / w[0]).ln()).collect();
    let n = returns.len() as f64;
    let mean = returns.iter().sum::<f64>() / n;
    let std_dev = if returns.len() < 2 {
        0.0
    } else {
        let variance = returns.iter().map(|r| (r - mean).powi(2)).sum::<f64>() / (n - 1.0);
        variance.sqrt()
    };

    let annualized = to_decimal(std_dev * TRADING_DAYS_PER_YEAR.sqrt());
    annualized.max(MIN_VOLATILITY)
}
