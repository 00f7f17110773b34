//! Engine precondition errors
//!
//! These all indicate caller bugs and are never silently recovered.
//! Numeric edge cases (zero variance, zero gross loss) are not errors;
//! the result metrics define fallback values for those instead.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("price series is empty")]
    EmptySeries,

    #[error("trade is already closed")]
    TradeAlreadyClosed,

    #[error("options trade is already settled as {status}")]
    TradeAlreadySettled { status: &'static str },

    #[error("contracts must be positive, got {0}")]
    InvalidContracts(u32),
}
