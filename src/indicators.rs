//! Technical indicator library
//!
//! Every indicator is a pure function over a bar slice and an end index:
//! `f(bars, end_index, params...) -> Option<...>`. A function returns `None`
//! until `end_index` has enough preceding history for its warmup window.
//!
//! Recursive indicators (EMA, Wilder smoothing, parabolic SAR) replay their
//! full recursion from the seed on every call, so results are identical
//! regardless of which index is queried first. Each recursion step is
//! rounded half-up to 10 fractional digits, which fixes the scale of
//! chained intermediates and keeps repeated runs bit-identical.
//!
//! Available indicators:
//! - Moving averages: SMA, EMA
//! - Momentum: RSI, MACD, Stochastic, Williams %R, CCI
//! - Volatility: True Range, ATR, Bollinger Bands
//! - Trend: ADX/+DI/-DI, Parabolic SAR, Ichimoku Cloud
//! - Volume: OBV, MFI, VWAP, average volume
//! - Levels: Fibonacci retracement, support/resistance

use rust_decimal::{Decimal, MathematicalOps};
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::types::{round_half_up, PriceBar};

const HUNDRED: Decimal = dec!(100);

/// Scale applied to every chained recursion step
fn chain(value: Decimal) -> Decimal {
    round_half_up(value, 10)
}

fn window_start(end_index: usize, period: usize) -> usize {
    end_index + 1 - period
}

fn has_window(bars: &[PriceBar], end_index: usize, period: usize) -> bool {
    period > 0 && end_index < bars.len() && end_index + 1 >= period
}

// =============================================================================
// Moving Averages
// =============================================================================

/// Simple moving average of closes over the trailing `period` bars
pub fn sma(bars: &[PriceBar], end_index: usize, period: usize) -> Option<Decimal> {
    if !has_window(bars, end_index, period) {
        return None;
    }
    let sum: Decimal = bars[window_start(end_index, period)..=end_index]
        .iter()
        .map(|b| b.close)
        .sum();
    Some(chain(sum / Decimal::from(period)))
}

/// Exponential moving average over an arbitrary value series.
///
/// Seeded with the simple average of the first `period` values, then the
/// `k = 2 / (period + 1)` recursion runs forward to `end_index`.
pub fn ema_series(values: &[Decimal], end_index: usize, period: usize) -> Option<Decimal> {
    if period == 0 || end_index >= values.len() || end_index + 1 < period {
        return None;
    }
    let k = chain(Decimal::from(2) / Decimal::from(period + 1));
    let seed: Decimal = values[..period].iter().sum::<Decimal>() / Decimal::from(period);
    let mut ema = chain(seed);
    for value in &values[period..=end_index] {
        ema = chain(*value * k + ema * (Decimal::ONE - k));
    }
    Some(ema)
}

/// Exponential moving average of closes
pub fn ema(bars: &[PriceBar], end_index: usize, period: usize) -> Option<Decimal> {
    if end_index >= bars.len() {
        return None;
    }
    let closes: Vec<Decimal> = bars[..=end_index].iter().map(|b| b.close).collect();
    ema_series(&closes, end_index, period)
}

// =============================================================================
// Momentum Indicators
// =============================================================================

/// Relative strength index over the trailing `period` close-to-close changes.
///
/// Uses a simple trailing average of gains and losses (not Wilder's
/// smoothing). When the window has no losses the value is 100.
pub fn rsi(bars: &[PriceBar], end_index: usize, period: usize) -> Option<Decimal> {
    if !has_window(bars, end_index, period + 1) {
        return None;
    }
    let mut gains = Decimal::ZERO;
    let mut losses = Decimal::ZERO;
    for i in window_start(end_index, period)..=end_index {
        let change = bars[i].close - bars[i - 1].close;
        if change > Decimal::ZERO {
            gains += change;
        } else {
            losses += -change;
        }
    }
    let avg_gain = gains / Decimal::from(period);
    let avg_loss = losses / Decimal::from(period);
    if avg_loss.is_zero() {
        return Some(HUNDRED);
    }
    let rs = avg_gain / avg_loss;
    Some(chain(HUNDRED - HUNDRED / (Decimal::ONE + rs)))
}

/// MACD line, signal line, and histogram
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MacdOutput {
    pub line: Decimal,
    pub signal: Decimal,
    pub histogram: Decimal,
}

/// Moving average convergence/divergence.
///
/// The MACD line is `EMA(fast) - EMA(slow)`; the signal line is an EMA of
/// the MACD-line series itself, seeded with the simple average of its first
/// `signal_period` points.
pub fn macd(
    bars: &[PriceBar],
    end_index: usize,
    fast_period: usize,
    slow_period: usize,
    signal_period: usize,
) -> Option<MacdOutput> {
    if fast_period == 0 || slow_period == 0 || signal_period == 0 || fast_period >= slow_period {
        return None;
    }
    if end_index >= bars.len() || end_index + 1 < slow_period + signal_period - 1 {
        return None;
    }

    let closes: Vec<Decimal> = bars[..=end_index].iter().map(|b| b.close).collect();

    // The MACD-line series starts where the slow EMA becomes defined.
    let mut line_values = Vec::with_capacity(end_index + 2 - slow_period);
    for i in (slow_period - 1)..=end_index {
        let fast = ema_series(&closes, i, fast_period)?;
        let slow = ema_series(&closes, i, slow_period)?;
        line_values.push(chain(fast - slow));
    }

    let line = *line_values.last()?;
    let signal = ema_series(&line_values, line_values.len() - 1, signal_period)?;
    Some(MacdOutput {
        line,
        signal,
        histogram: chain(line - signal),
    })
}

/// Stochastic oscillator output
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StochasticOutput {
    pub k: Decimal,
    pub d: Decimal,
}

fn stochastic_k(bars: &[PriceBar], end_index: usize, period: usize) -> Option<Decimal> {
    if !has_window(bars, end_index, period) {
        return None;
    }
    let window = &bars[window_start(end_index, period)..=end_index];
    let highest = window.iter().map(|b| b.high).max()?;
    let lowest = window.iter().map(|b| b.low).min()?;
    let range = highest - lowest;
    if range.is_zero() {
        return Some(dec!(50));
    }
    Some(chain(
        HUNDRED * (bars[end_index].close - lowest) / range,
    ))
}

/// Stochastic oscillator: %K over `period` bars, %D = SMA(%K, `smoothing`)
pub fn stochastic(
    bars: &[PriceBar],
    end_index: usize,
    period: usize,
    smoothing: usize,
) -> Option<StochasticOutput> {
    if smoothing == 0 || !has_window(bars, end_index, period + smoothing - 1) {
        return None;
    }
    let k = stochastic_k(bars, end_index, period)?;
    let mut sum = Decimal::ZERO;
    for i in (end_index + 1 - smoothing)..=end_index {
        sum += stochastic_k(bars, i, period)?;
    }
    Some(StochasticOutput {
        k,
        d: chain(sum / Decimal::from(smoothing)),
    })
}

/// Williams %R over the trailing `period` bars, in [-100, 0]
pub fn williams_r(bars: &[PriceBar], end_index: usize, period: usize) -> Option<Decimal> {
    if !has_window(bars, end_index, period) {
        return None;
    }
    let window = &bars[window_start(end_index, period)..=end_index];
    let highest = window.iter().map(|b| b.high).max()?;
    let lowest = window.iter().map(|b| b.low).min()?;
    let range = highest - lowest;
    if range.is_zero() {
        return Some(dec!(-50));
    }
    Some(chain(
        -HUNDRED * (highest - bars[end_index].close) / range,
    ))
}

/// Commodity channel index: typical price against its mean deviation
pub fn cci(bars: &[PriceBar], end_index: usize, period: usize) -> Option<Decimal> {
    if !has_window(bars, end_index, period) {
        return None;
    }
    let window = &bars[window_start(end_index, period)..=end_index];
    let typical: Vec<Decimal> = window.iter().map(|b| b.typical_price()).collect();
    let mean: Decimal = typical.iter().sum::<Decimal>() / Decimal::from(period);
    let mean_deviation: Decimal = typical
        .iter()
        .map(|tp| (*tp - mean).abs())
        .sum::<Decimal>()
        / Decimal::from(period);
    if mean_deviation.is_zero() {
        return Some(Decimal::ZERO);
    }
    let current = bars[end_index].typical_price();
    Some(chain((current - mean) / (dec!(0.015) * mean_deviation)))
}

// =============================================================================
// Volatility Indicators
// =============================================================================

/// True range of the bar at `index`
pub fn true_range(bars: &[PriceBar], index: usize) -> Option<Decimal> {
    if index >= bars.len() {
        return None;
    }
    let bar = &bars[index];
    if index == 0 {
        return Some(bar.high - bar.low);
    }
    let prev_close = bars[index - 1].close;
    let hl = bar.high - bar.low;
    let hc = (bar.high - prev_close).abs();
    let lc = (bar.low - prev_close).abs();
    Some(hl.max(hc).max(lc))
}

/// Average true range: trailing simple average of TR over `period` bars
pub fn atr(bars: &[PriceBar], end_index: usize, period: usize) -> Option<Decimal> {
    if !has_window(bars, end_index, period) {
        return None;
    }
    let mut sum = Decimal::ZERO;
    for i in window_start(end_index, period)..=end_index {
        sum += true_range(bars, i)?;
    }
    Some(chain(sum / Decimal::from(period)))
}

/// Bollinger band output
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BollingerOutput {
    pub upper: Decimal,
    pub middle: Decimal,
    pub lower: Decimal,
    pub width: Decimal,
    pub percent_b: Decimal,
}

/// Bollinger bands around SMA(`period`) with a population standard deviation
pub fn bollinger_bands(
    bars: &[PriceBar],
    end_index: usize,
    period: usize,
    std_dev_multiplier: Decimal,
) -> Option<BollingerOutput> {
    let middle = sma(bars, end_index, period)?;
    let window = &bars[window_start(end_index, period)..=end_index];
    let variance: Decimal = window
        .iter()
        .map(|b| {
            let diff = b.close - middle;
            diff * diff
        })
        .sum::<Decimal>()
        / Decimal::from(period);
    let std_dev = chain(variance.sqrt()?);
    let upper = chain(middle + std_dev_multiplier * std_dev);
    let lower = chain(middle - std_dev_multiplier * std_dev);
    let width = upper - lower;
    let percent_b = if width.is_zero() {
        // Degenerate band: price sits on every band at once
        dec!(0.5)
    } else {
        chain((bars[end_index].close - lower) / width)
    };
    Some(BollingerOutput {
        upper,
        middle,
        lower,
        width,
        percent_b,
    })
}

// =============================================================================
// Trend Indicators
// =============================================================================

/// ADX with its directional components
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdxOutput {
    pub adx: Decimal,
    pub plus_di: Decimal,
    pub minus_di: Decimal,
}

/// Wilder running average over a value series: seed with the SMA of the
/// first `period` values, then `(prev * (period - 1) + current) / period`.
fn wilder_smooth_at(values: &[Decimal], end_index: usize, period: usize) -> Option<Decimal> {
    if period == 0 || end_index >= values.len() || end_index + 1 < period {
        return None;
    }
    let seed: Decimal = values[..period].iter().sum::<Decimal>() / Decimal::from(period);
    let mut smoothed = chain(seed);
    for value in &values[period..=end_index] {
        smoothed = chain((smoothed * Decimal::from(period - 1) + *value) / Decimal::from(period));
    }
    Some(smoothed)
}

/// Average directional index with +DI/-DI.
///
/// Directional movement and TR are Wilder-smoothed; DX values are then
/// Wilder-smoothed again into ADX, so the full warmup is `2 * period` bars.
pub fn adx(bars: &[PriceBar], end_index: usize, period: usize) -> Option<AdxOutput> {
    if period == 0 || end_index >= bars.len() || end_index + 1 < 2 * period {
        return None;
    }

    // DM and TR series start at bar 1 (they need a previous bar).
    let n = end_index;
    let mut plus_dm = Vec::with_capacity(n);
    let mut minus_dm = Vec::with_capacity(n);
    let mut tr = Vec::with_capacity(n);
    for i in 1..=end_index {
        let up_move = bars[i].high - bars[i - 1].high;
        let down_move = bars[i - 1].low - bars[i].low;
        plus_dm.push(if up_move > down_move && up_move > Decimal::ZERO {
            up_move
        } else {
            Decimal::ZERO
        });
        minus_dm.push(if down_move > up_move && down_move > Decimal::ZERO {
            down_move
        } else {
            Decimal::ZERO
        });
        tr.push(true_range(bars, i)?);
    }

    let di_at = |j: usize| -> Option<(Decimal, Decimal)> {
        let smoothed_tr = wilder_smooth_at(&tr, j, period)?;
        if smoothed_tr.is_zero() {
            return Some((Decimal::ZERO, Decimal::ZERO));
        }
        let pdi = chain(HUNDRED * wilder_smooth_at(&plus_dm, j, period)? / smoothed_tr);
        let mdi = chain(HUNDRED * wilder_smooth_at(&minus_dm, j, period)? / smoothed_tr);
        Some((pdi, mdi))
    };

    // DX becomes defined once DI does, at element period - 1 of the DM series.
    let mut dx = Vec::with_capacity(n);
    for j in (period - 1)..n {
        let (pdi, mdi) = di_at(j)?;
        let sum = pdi + mdi;
        dx.push(if sum.is_zero() {
            Decimal::ZERO
        } else {
            chain(HUNDRED * (pdi - mdi).abs() / sum)
        });
    }

    let (plus_di, minus_di) = di_at(n - 1)?;
    let adx = wilder_smooth_at(&dx, dx.len() - 1, period)?;
    Some(AdxOutput {
        adx,
        plus_di,
        minus_di,
    })
}

const SAR_AF_START: Decimal = dec!(0.02);
const SAR_AF_STEP: Decimal = dec!(0.02);
const SAR_AF_MAX: Decimal = dec!(0.2);

/// Parabolic SAR, replayed from the start of the series.
///
/// The stop accelerates toward price while the trend holds and flips to the
/// extreme point when price crosses it, resetting the acceleration factor.
pub fn parabolic_sar(bars: &[PriceBar], end_index: usize) -> Option<Decimal> {
    if end_index >= bars.len() || end_index < 1 {
        return None;
    }

    let mut uptrend = bars[1].close >= bars[0].close;
    let mut sar = if uptrend { bars[0].low } else { bars[0].high };
    let mut extreme = if uptrend { bars[1].high } else { bars[1].low };
    let mut af = SAR_AF_START;

    for i in 2..=end_index {
        sar = chain(sar + af * (extreme - sar));
        if uptrend {
            // The stop may never rise above the prior two lows
            sar = sar.min(bars[i - 1].low).min(bars[i - 2].low);
            if bars[i].low < sar {
                uptrend = false;
                sar = extreme;
                extreme = bars[i].low;
                af = SAR_AF_START;
            } else if bars[i].high > extreme {
                extreme = bars[i].high;
                af = (af + SAR_AF_STEP).min(SAR_AF_MAX);
            }
        } else {
            sar = sar.max(bars[i - 1].high).max(bars[i - 2].high);
            if bars[i].high > sar {
                uptrend = true;
                sar = extreme;
                extreme = bars[i].high;
                af = SAR_AF_START;
            } else if bars[i].low < extreme {
                extreme = bars[i].low;
                af = (af + SAR_AF_STEP).min(SAR_AF_MAX);
            }
        }
    }

    Some(sar)
}

/// True when the current SAR sits below price
pub fn is_sar_bullish(bars: &[PriceBar], end_index: usize) -> bool {
    match parabolic_sar(bars, end_index) {
        Some(sar) => sar < bars[end_index].close,
        None => false,
    }
}

/// Ichimoku cloud lines
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct IchimokuOutput {
    pub tenkan: Decimal,
    pub kijun: Decimal,
    pub senkou_a: Decimal,
    pub senkou_b: Decimal,
    pub price_above_cloud: bool,
}

fn midpoint(bars: &[PriceBar], end_index: usize, period: usize) -> Option<Decimal> {
    if !has_window(bars, end_index, period) {
        return None;
    }
    let window = &bars[window_start(end_index, period)..=end_index];
    let highest = window.iter().map(|b| b.high).max()?;
    let lowest = window.iter().map(|b| b.low).min()?;
    Some(chain((highest + lowest) / Decimal::from(2)))
}

/// Ichimoku cloud with the standard 9/26/52 periods, spans evaluated at the
/// current bar (no forward displacement)
pub fn ichimoku(bars: &[PriceBar], end_index: usize) -> Option<IchimokuOutput> {
    let tenkan = midpoint(bars, end_index, 9)?;
    let kijun = midpoint(bars, end_index, 26)?;
    let senkou_a = chain((tenkan + kijun) / Decimal::from(2));
    let senkou_b = midpoint(bars, end_index, 52)?;
    let close = bars[end_index].close;
    Some(IchimokuOutput {
        tenkan,
        kijun,
        senkou_a,
        senkou_b,
        price_above_cloud: close > senkou_a.max(senkou_b),
    })
}

// =============================================================================
// Volume Indicators
// =============================================================================

/// On-balance volume accumulated from the start of the series
pub fn obv(bars: &[PriceBar], end_index: usize) -> Option<Decimal> {
    if end_index >= bars.len() {
        return None;
    }
    let mut value = Decimal::ZERO;
    for i in 1..=end_index {
        if bars[i].close > bars[i - 1].close {
            value += bars[i].volume;
        } else if bars[i].close < bars[i - 1].close {
            value -= bars[i].volume;
        }
    }
    Some(value)
}

/// True when OBV now exceeds OBV `lookback` bars ago
pub fn is_obv_rising(bars: &[PriceBar], end_index: usize, lookback: usize) -> bool {
    if end_index < lookback {
        return false;
    }
    match (obv(bars, end_index), obv(bars, end_index - lookback)) {
        (Some(current), Some(past)) => current > past,
        _ => false,
    }
}

/// Money flow index over `period` typical-price changes
pub fn mfi(bars: &[PriceBar], end_index: usize, period: usize) -> Option<Decimal> {
    if !has_window(bars, end_index, period + 1) {
        return None;
    }
    let mut positive = Decimal::ZERO;
    let mut negative = Decimal::ZERO;
    for i in window_start(end_index, period)..=end_index {
        let tp = bars[i].typical_price();
        let prev_tp = bars[i - 1].typical_price();
        let flow = tp * bars[i].volume;
        if tp > prev_tp {
            positive += flow;
        } else if tp < prev_tp {
            negative += flow;
        }
    }
    if negative.is_zero() {
        return Some(HUNDRED);
    }
    let ratio = positive / negative;
    Some(chain(HUNDRED - HUNDRED / (Decimal::ONE + ratio)))
}

/// Volume-weighted average price, cumulative from the start of the series
pub fn vwap(bars: &[PriceBar], end_index: usize) -> Option<Decimal> {
    if end_index >= bars.len() {
        return None;
    }
    let mut tp_volume = Decimal::ZERO;
    let mut volume = Decimal::ZERO;
    for bar in &bars[..=end_index] {
        tp_volume += bar.typical_price() * bar.volume;
        volume += bar.volume;
    }
    if volume.is_zero() {
        return Some(bars[end_index].close);
    }
    Some(chain(tp_volume / volume))
}

/// Simple average of volume over the trailing `period` bars
pub fn average_volume(bars: &[PriceBar], end_index: usize, period: usize) -> Option<Decimal> {
    if !has_window(bars, end_index, period) {
        return None;
    }
    let sum: Decimal = bars[window_start(end_index, period)..=end_index]
        .iter()
        .map(|b| b.volume)
        .sum();
    Some(chain(sum / Decimal::from(period)))
}

// =============================================================================
// Price Levels
// =============================================================================

/// Fibonacci retracement levels of the lookback high-low range
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FibonacciLevels {
    pub high: Decimal,
    pub low: Decimal,
    pub level_236: Decimal,
    pub level_382: Decimal,
    pub level_500: Decimal,
    pub level_618: Decimal,
    pub level_786: Decimal,
}

/// Retracement levels measured down from the lookback high
pub fn fibonacci_retracement(
    bars: &[PriceBar],
    end_index: usize,
    lookback: usize,
) -> Option<FibonacciLevels> {
    if !has_window(bars, end_index, lookback) {
        return None;
    }
    let window = &bars[window_start(end_index, lookback)..=end_index];
    let high = window.iter().map(|b| b.high).max()?;
    let low = window.iter().map(|b| b.low).min()?;
    let range = high - low;
    let level = |ratio: Decimal| chain(high - range * ratio);
    Some(FibonacciLevels {
        high,
        low,
        level_236: level(dec!(0.236)),
        level_382: level(dec!(0.382)),
        level_500: level(dec!(0.5)),
        level_618: level(dec!(0.618)),
        level_786: level(dec!(0.786)),
    })
}

/// Most recent local low over the lookback, confirmed by `window` bars on
/// each side
pub fn support(
    bars: &[PriceBar],
    end_index: usize,
    lookback: usize,
    window: usize,
) -> Option<Decimal> {
    local_extremum(bars, end_index, lookback, window, false)
}

/// Most recent local high over the lookback, confirmed by `window` bars on
/// each side
pub fn resistance(
    bars: &[PriceBar],
    end_index: usize,
    lookback: usize,
    window: usize,
) -> Option<Decimal> {
    local_extremum(bars, end_index, lookback, window, true)
}

fn local_extremum(
    bars: &[PriceBar],
    end_index: usize,
    lookback: usize,
    window: usize,
    high: bool,
) -> Option<Decimal> {
    if window == 0 || !has_window(bars, end_index, lookback) || end_index < window {
        return None;
    }
    let first = window_start(end_index, lookback).max(window);
    let last = end_index - window;
    for i in (first..=last).rev() {
        let value = if high { bars[i].high } else { bars[i].low };
        let confirmed = (i - window..=i + window).all(|j| {
            if high {
                bars[j].high <= value
            } else {
                bars[j].low >= value
            }
        });
        if confirmed {
            return Some(value);
        }
    }
    None
}

// =============================================================================
// Snapshot
// =============================================================================

/// Immutable snapshot of the indicator set at one bar index.
///
/// Purely derived and recomputed per query. Fields whose warmup is not met
/// fall back to defined neutral defaults instead of failing: oscillators
/// sit at their midpoints (RSI 50, stochastic 50, Williams %R -50, CCI 0,
/// MFI 50, ADX 0) and price overlays anchor to the current close.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndicatorValues {
    pub close: Decimal,
    pub sma_20: Decimal,
    pub sma_50: Decimal,
    pub sma_200: Decimal,
    pub ema_12: Decimal,
    pub ema_26: Decimal,
    pub rsi_14: Decimal,
    pub macd_line: Decimal,
    pub macd_signal: Decimal,
    pub macd_histogram: Decimal,
    pub bollinger_upper: Decimal,
    pub bollinger_middle: Decimal,
    pub bollinger_lower: Decimal,
    pub bollinger_width: Decimal,
    pub percent_b: Decimal,
    pub stochastic_k: Decimal,
    pub stochastic_d: Decimal,
    pub atr_14: Decimal,
    pub obv: Decimal,
    pub obv_rising: bool,
    pub adx_14: Decimal,
    pub plus_di: Decimal,
    pub minus_di: Decimal,
    pub sar: Decimal,
    pub sar_bullish: bool,
    pub williams_r: Decimal,
    pub cci_20: Decimal,
    pub mfi_14: Decimal,
    pub vwap: Decimal,
    pub average_volume_20: Decimal,
    pub fibonacci: FibonacciLevels,
    pub ichimoku: IchimokuOutput,
    pub support: Decimal,
    pub resistance: Decimal,
}

impl IndicatorValues {
    /// Compute the snapshot at `end_index`; `end_index` must address a bar.
    pub fn snapshot(bars: &[PriceBar], end_index: usize) -> Self {
        let close = bars[end_index].close;
        let macd_out = macd(bars, end_index, 12, 26, 9);
        let bb = bollinger_bands(bars, end_index, 20, dec!(2));
        let stoch = stochastic(bars, end_index, 14, 3);
        let adx_out = adx(bars, end_index, 14);
        let fib = fibonacci_retracement(bars, end_index, 50).unwrap_or(FibonacciLevels {
            high: close,
            low: close,
            level_236: close,
            level_382: close,
            level_500: close,
            level_618: close,
            level_786: close,
        });
        let cloud = ichimoku(bars, end_index).unwrap_or(IchimokuOutput {
            tenkan: close,
            kijun: close,
            senkou_a: close,
            senkou_b: close,
            price_above_cloud: false,
        });

        Self {
            close,
            sma_20: sma(bars, end_index, 20).unwrap_or(close),
            sma_50: sma(bars, end_index, 50).unwrap_or(close),
            sma_200: sma(bars, end_index, 200).unwrap_or(close),
            ema_12: ema(bars, end_index, 12).unwrap_or(close),
            ema_26: ema(bars, end_index, 26).unwrap_or(close),
            rsi_14: rsi(bars, end_index, 14).unwrap_or(dec!(50)),
            macd_line: macd_out.map(|m| m.line).unwrap_or(Decimal::ZERO),
            macd_signal: macd_out.map(|m| m.signal).unwrap_or(Decimal::ZERO),
            macd_histogram: macd_out.map(|m| m.histogram).unwrap_or(Decimal::ZERO),
            bollinger_upper: bb.map(|b| b.upper).unwrap_or(close),
            bollinger_middle: bb.map(|b| b.middle).unwrap_or(close),
            bollinger_lower: bb.map(|b| b.lower).unwrap_or(close),
            bollinger_width: bb.map(|b| b.width).unwrap_or(Decimal::ZERO),
            percent_b: bb.map(|b| b.percent_b).unwrap_or(dec!(0.5)),
            stochastic_k: stoch.map(|s| s.k).unwrap_or(dec!(50)),
            stochastic_d: stoch.map(|s| s.d).unwrap_or(dec!(50)),
            atr_14: atr(bars, end_index, 14).unwrap_or(Decimal::ZERO),
            obv: obv(bars, end_index).unwrap_or(Decimal::ZERO),
            obv_rising: is_obv_rising(bars, end_index, 10),
            adx_14: adx_out.map(|a| a.adx).unwrap_or(Decimal::ZERO),
            plus_di: adx_out.map(|a| a.plus_di).unwrap_or(Decimal::ZERO),
            minus_di: adx_out.map(|a| a.minus_di).unwrap_or(Decimal::ZERO),
            sar: parabolic_sar(bars, end_index).unwrap_or(close),
            sar_bullish: is_sar_bullish(bars, end_index),
            williams_r: williams_r(bars, end_index, 14).unwrap_or(dec!(-50)),
            cci_20: cci(bars, end_index, 20).unwrap_or(Decimal::ZERO),
            mfi_14: mfi(bars, end_index, 14).unwrap_or(dec!(50)),
            vwap: vwap(bars, end_index).unwrap_or(close),
            average_volume_20: average_volume(bars, end_index, 20).unwrap_or(Decimal::ZERO),
            fibonacci: fib,
            ichimoku: cloud,
            support: support(bars, end_index, 50, 2).unwrap_or(close),
            resistance: resistance(bars, end_index, 50, 2).unwrap_or(close),
        }
    }
}

// =============================================================================
// Tests
// =============================================================================

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
    fn test_sma() {
        let bars = make_bars(&[dec!(1), dec!(2), dec!(3), dec!(4), dec!(5)]);

        assert_eq!(sma(&bars, 1, 3), None);
        assert_eq!(sma(&bars, 2, 3), Some(dec!(2)));
        assert_eq!(sma(&bars, 3, 3), Some(dec!(3)));
        assert_eq!(sma(&bars, 4, 3), Some(dec!(4)));
    }

    #[test]
    fn test_ema_seeded_with_sma() {
        let bars = make_bars(&[dec!(1), dec!(2), dec!(3), dec!(4), dec!(5)]);

        // At the seed index the EMA equals the SMA of the first 3 closes.
        assert_eq!(ema(&bars, 2, 3), Some(dec!(2)));
        // k = 0.5: ema(3) = 4*0.5 + 2*0.5 = 3; ema(4) = 5*0.5 + 3*0.5 = 4
        assert_eq!(ema(&bars, 3, 3), Some(dec!(3)));
        assert_eq!(ema(&bars, 4, 3), Some(dec!(4)));
    }

    #[test]
    fn test_ema_replay_is_query_order_independent() {
        let closes: Vec<Decimal> = (1..=60).map(Decimal::from).collect();
        let bars = make_bars(&closes);

        let late_first = ema(&bars, 59, 12);
        let early = ema(&bars, 20, 12);
        let late_again = ema(&bars, 59, 12);

        assert_eq!(late_first, late_again);
        assert!(early.is_some());
    }

    #[test]
    fn test_rsi_all_gains_is_100() {
        let closes: Vec<Decimal> = (1..=20).map(Decimal::from).collect();
        let bars = make_bars(&closes);
        assert_eq!(rsi(&bars, 19, 14), Some(dec!(100)));
    }

    #[test]
    fn test_rsi_balanced_series() {
        // Alternating +1/-1 changes: avg gain == avg loss, RSI = 50
        let mut closes = Vec::new();
        for i in 0..20 {
            closes.push(if i % 2 == 0 { dec!(100) } else { dec!(101) });
        }
        let bars = make_bars(&closes);
        let value = rsi(&bars, 19, 14).unwrap();
        assert_eq!(value, dec!(50));
    }

    #[test]
    fn test_rsi_warmup() {
        let bars = make_bars(&[dec!(1), dec!(2), dec!(3)]);
        assert_eq!(rsi(&bars, 2, 14), None);
    }

    #[test]
    fn test_macd_on_linear_ramp() {
        let closes: Vec<Decimal> = (1..=60).map(Decimal::from).collect();
        let bars = make_bars(&closes);

        let out = macd(&bars, 59, 12, 26, 9).unwrap();
        // On a steady ramp the fast EMA tracks price more closely than the
        // slow EMA, so the line is positive.
        assert!(out.line > Decimal::ZERO);
        assert_eq!(out.histogram, out.line - out.signal);
    }

    #[test]
    fn test_macd_warmup() {
        let closes: Vec<Decimal> = (1..=30).map(Decimal::from).collect();
        let bars = make_bars(&closes);
        // Needs slow + signal - 1 = 34 bars
        assert!(macd(&bars, 29, 12, 26, 9).is_none());
    }

    #[test]
    fn test_bollinger_bands_order_and_width() {
        let closes = vec![
            dec!(20),
            dec!(21),
            dec!(22),
            dec!(21),
            dec!(20),
            dec!(21),
            dec!(22),
            dec!(23),
            dec!(22),
            dec!(21),
        ];
        let bars = make_bars(&closes);
        let bb = bollinger_bands(&bars, 9, 5, dec!(2)).unwrap();

        assert!(bb.upper > bb.middle);
        assert!(bb.middle > bb.lower);
        assert_eq!(bb.width, bb.upper - bb.lower);
        assert!(bb.percent_b >= Decimal::ZERO && bb.percent_b <= Decimal::ONE);
    }

    #[test]
    fn test_bollinger_flat_series_has_zero_width() {
        let bars = make_bars(&vec![dec!(50); 25]);
        let bb = bollinger_bands(&bars, 24, 20, dec!(2)).unwrap();
        assert_eq!(bb.width, Decimal::ZERO);
        assert_eq!(bb.percent_b, dec!(0.5));
    }

    #[test]
    fn test_stochastic_range() {
        let closes: Vec<Decimal> = (1..=30).map(Decimal::from).collect();
        let bars = make_bars(&closes);
        let out = stochastic(&bars, 29, 14, 3).unwrap();
        assert!(out.k >= Decimal::ZERO && out.k <= HUNDRED);
        assert!(out.d >= Decimal::ZERO && out.d <= HUNDRED);
    }

    #[test]
    fn test_atr_positive() {
        let closes: Vec<Decimal> = (10..30).map(Decimal::from).collect();
        let bars = make_bars(&closes);
        let value = atr(&bars, 19, 14).unwrap();
        assert!(value > Decimal::ZERO);
    }

    #[test]
    fn test_obv_accumulates_by_direction() {
        let bars = make_bars(&[dec!(10), dec!(11), dec!(10.5), dec!(11.5), dec!(11.5)]);
        // +1000 - 1000 + 1000 + 0
        assert_eq!(obv(&bars, 4), Some(dec!(1000)));
        assert!(is_obv_rising(&bars, 4, 3));
    }

    #[test]
    fn test_adx_bounds() {
        let closes: Vec<Decimal> = (1..=60).map(|i| Decimal::from(i * 2)).collect();
        let bars = make_bars(&closes);
        let out = adx(&bars, 59, 14).unwrap();

        assert!(out.adx >= Decimal::ZERO && out.adx <= HUNDRED);
        // Steady uptrend: positive directional movement dominates
        assert!(out.plus_di > out.minus_di);
    }

    #[test]
    fn test_sar_bullish_in_uptrend() {
        let closes: Vec<Decimal> = (1..=30).map(|i| Decimal::from(100 + i)).collect();
        let bars = make_bars(&closes);
        let sar = parabolic_sar(&bars, 29).unwrap();
        assert!(sar < bars[29].close);
        assert!(is_sar_bullish(&bars, 29));
    }

    #[test]
    fn test_williams_r_range() {
        let closes: Vec<Decimal> = (1..=20).map(Decimal::from).collect();
        let bars = make_bars(&closes);
        let value = williams_r(&bars, 19, 14).unwrap();
        assert!(value <= Decimal::ZERO && value >= dec!(-100));
    }

    #[test]
    fn test_cci_flat_series_is_zero() {
        let bars = make_bars(&vec![dec!(50); 25]);
        assert_eq!(cci(&bars, 24, 20), Some(Decimal::ZERO));
    }

    #[test]
    fn test_mfi_all_rising_is_100() {
        let closes: Vec<Decimal> = (1..=20).map(Decimal::from).collect();
        let bars = make_bars(&closes);
        assert_eq!(mfi(&bars, 19, 14), Some(dec!(100)));
    }

    #[test]
    fn test_vwap_between_extremes() {
        let closes: Vec<Decimal> = (10..20).map(Decimal::from).collect();
        let bars = make_bars(&closes);
        let value = vwap(&bars, 9).unwrap();
        assert!(value > dec!(9) && value < dec!(20));
    }

    #[test]
    fn test_fibonacci_levels_ordered() {
        let closes: Vec<Decimal> = (1..=30).map(Decimal::from).collect();
        let bars = make_bars(&closes);
        let fib = fibonacci_retracement(&bars, 29, 20).unwrap();

        assert!(fib.high > fib.low);
        assert!(fib.level_236 > fib.level_382);
        assert!(fib.level_382 > fib.level_500);
        assert!(fib.level_500 > fib.level_618);
        assert!(fib.level_618 > fib.level_786);
    }

    #[test]
    fn test_ichimoku_needs_52_bars() {
        let closes: Vec<Decimal> = (1..=51).map(Decimal::from).collect();
        let bars = make_bars(&closes);
        assert!(ichimoku(&bars, 50).is_none());

        let closes: Vec<Decimal> = (1..=60).map(Decimal::from).collect();
        let bars = make_bars(&closes);
        let cloud = ichimoku(&bars, 59).unwrap();
        // Recent-window midpoints exceed the 52-bar midpoint in an uptrend
        assert!(cloud.tenkan > cloud.senkou_b);
        assert!(cloud.price_above_cloud);
    }

    #[test]
    fn test_support_and_resistance_find_extrema() {
        let mut closes: Vec<Decimal> = Vec::new();
        for i in 0..40 {
            // A valley at i=20
            let base = if i < 20 { 100 - i } else { 60 + i };
            closes.push(Decimal::from(base));
        }
        let bars = make_bars(&closes);
        let sup = support(&bars, 39, 35, 2).unwrap();
        assert_eq!(sup, bars[20].low);
    }

    #[test]
    fn test_snapshot_defaults_with_short_history() {
        let bars = make_bars(&[dec!(100), dec!(101), dec!(102)]);
        let values = IndicatorValues::snapshot(&bars, 2);

        assert_eq!(values.rsi_14, dec!(50));
        assert_eq!(values.stochastic_k, dec!(50));
        assert_eq!(values.williams_r, dec!(-50));
        assert_eq!(values.cci_20, Decimal::ZERO);
        assert_eq!(values.mfi_14, dec!(50));
        assert_eq!(values.adx_14, Decimal::ZERO);
        assert_eq!(values.sma_200, values.close);
    }

    #[test]
    fn test_snapshot_with_full_history() {
        let closes: Vec<Decimal> = (1..=250).map(|i| Decimal::from(100 + i % 17)).collect();
        let bars = make_bars(&closes);
        let values = IndicatorValues::snapshot(&bars, 249);

        assert!(values.rsi_14 >= Decimal::ZERO && values.rsi_14 <= dec!(100));
        assert!(values.bollinger_upper >= values.bollinger_lower);
        assert!(values.average_volume_20 > Decimal::ZERO);
    }
}
