//! Error types for fee pool operations

use crate::types::{CurrencyKey, PeriodId, Section};
use thiserror::Error;

/// Result type alias for fee pool operations
pub type Result<T> = std::result::Result<T, FeePoolError>;

/// Errors surfaced by fee pool entry points.
///
/// Every error leaves ledger state exactly as it was before the call.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FeePoolError {
    // === Gate failures ===
    /// A suspension flag is set for the section
    #[error("Operation prohibited: {section} is suspended")]
    OperationProhibited { section: Section },

    /// A rate needed to value the claim is stale or invalid
    #[error("Invalid rate: {key}")]
    InvalidRate { key: CurrencyKey },

    /// Collateralization ratio is past the penalty threshold
    #[error("C-Ratio below penalty threshold: ratio {ratio} exceeds {threshold}")]
    BelowPenaltyThreshold { ratio: u128, threshold: u128 },

    // === Period lifecycle ===
    /// Fee period duration has not elapsed yet
    #[error("Too early to close fee period: {remaining_secs}s remaining")]
    TooEarly { remaining_secs: i64 },

    /// Fee period duration is zero
    #[error("Fee period duration not set")]
    DurationNotConfigured,

    /// Period id is outside the rolling window
    #[error("Fee period {period_id} is outside the window")]
    PeriodOutOfRange { period_id: PeriodId },

    /// Historical import attempted after normal operation started
    #[error("Fee period import is closed")]
    ImportClosed,

    // === Claims ===
    /// No fees or rewards available, or already claimed
    #[error("No fees or rewards available for period, or fees already claimed")]
    NothingToClaim,

    /// Caller lacks the required role or approval
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    // === Collaborators ===
    /// Value transfer or burn failed
    #[error("Transfer failed: {0}")]
    TransferFailed(String),

    // === General ===
    /// Arithmetic overflow
    #[error("Arithmetic overflow")]
    Overflow,

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Invalid configuration
    #[error("Configuration error: {0}")]
    Config(String),
}

impl FeePoolError {
    /// Stable numeric code for API responses
    pub fn code(&self) -> u32 {
        match self {
            Self::OperationProhibited { .. } => 2001,
            Self::InvalidRate { .. } => 2002,
            Self::BelowPenaltyThreshold { .. } => 2003,
            Self::TooEarly { .. } => 2004,
            Self::NothingToClaim => 2005,
            Self::Unauthorized(_) => 2006,
            Self::DurationNotConfigured => 2007,
            Self::PeriodOutOfRange { .. } => 2008,
            Self::ImportClosed => 2009,
            _ => 9999,
        }
    }

    /// Failures caused by external conditions that may clear on their own.
    /// A caller can retry the same operation later without changing inputs.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::OperationProhibited { .. }
                | Self::InvalidRate { .. }
                | Self::BelowPenaltyThreshold { .. }
                | Self::TooEarly { .. }
                | Self::TransferFailed(_)
        )
    }
}
