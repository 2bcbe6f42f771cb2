//! # Fee Pool Economics
//!
//! Accounting engine for a staking system that collects fees, distributes
//! them pro rata to debt share holders over rolling fee periods, and streams
//! liquidation rewards through a reward-per-share accumulator.
//!
//! ## Components
//!
//! - **FeePeriodLedger**: rolling window of fee periods, deposits, claim
//!   watermarks, rollover of expired remainders, historical import
//! - **RewardAccumulator**: continuous pro-rata rewards with a pre-stake-change hook
//! - **ClaimGate**: suspension, rate staleness and penalty threshold checks
//! - **PeriodCloser**: time-gated and relayed period rollover
//! - **FeePool**: facade owning the above plus delegate approvals and events
//!
//! ## Fee Period Window
//!
//! ```text
//!   recent index:   0        1        2        3        4        5
//!                ┌───────┬────────┬────────┬────────┬────────┬────────┐
//!                │ open  │ closed │ closed │ closed │ closed │ oldest │
//!                │ id 13 │ id 12  │ id 11  │ id 10  │ id 9   │ id 8   │
//!                └───────┴────────┴────────┴────────┴────────┴────────┘
//!   close:  oldest unclaimed ──► index 4, then a new open period at index 0
//! ```
//!
//! ## Entitlement
//!
//! | Quantity | Formula |
//! |----------|---------|
//! | Fees from period P | `min(share(a, P) * fees_to_distribute, unclaimed fees)` |
//! | Rewards from period P | `min(share(a, P) * rewards_to_distribute, unclaimed rewards)` |
//! | Penalty threshold | `issuance_ratio * (1 + target_threshold)` |
//! | Accumulator step | `acc += (amount * 1e36 + dust) / total_supply` |

pub mod accumulator;
pub mod approvals;
pub mod closer;
pub mod config;
pub mod events;
pub mod gate;
pub mod ledger;
pub mod period;
pub mod pool;
pub mod testing;

// Re-exports
pub use accumulator::{
    Notified, RewardAccumulator, RewardEntry, StakeChangeHook, REWARD_PRECISION,
};
pub use approvals::DelegateApprovals;
pub use closer::PeriodCloser;
pub use config::{ConfigError, FeePoolConfig, GateConfig};
pub use events::{EventLog, FeePoolEvent};
pub use gate::{ClaimGate, GateContext, Precondition};
pub use ledger::{ClaimPlan, ClosePlan, CloseOutcome, FeePeriodLedger, PeriodEntitlement};
pub use period::{FeePeriod, FeePeriodWindow, PeriodStatus};
pub use pool::{ClaimReceipt, Collaborators, FeePool};

/// Fee pool constants
pub mod constants {
    /// Slots in the rolling window
    pub const FEE_PERIOD_LENGTH: usize = 6;

    /// Largest window accepted from configuration
    pub const MAX_FEE_PERIOD_LENGTH: usize = 64;

    /// Default period duration: one week
    pub const DEFAULT_FEE_PERIOD_DURATION: u64 = 7 * 24 * 3600;

    pub const MIN_FEE_PERIOD_DURATION: u64 = 24 * 3600;

    pub const MAX_FEE_PERIOD_DURATION: u64 = 60 * 24 * 3600;

    /// Target debt-to-collateral ratio: 0.2 (500% c-ratio)
    pub const DEFAULT_ISSUANCE_RATIO: u64 = 200_000_000_000_000_000;

    /// Highest issuance ratio the owner may set: 1.0
    pub const MAX_ISSUANCE_RATIO: u64 = 1_000_000_000_000_000_000;

    /// Buffer above the issuance ratio: 10%
    pub const DEFAULT_TARGET_THRESHOLD: u64 = 100_000_000_000_000_000;

    /// Highest buffer the owner may set: 50%
    pub const MAX_TARGET_THRESHOLD: u64 = 500_000_000_000_000_000;

    /// Rates older than this (25 hours) block claims and closes
    pub const DEFAULT_RATE_STALE_PERIOD: u64 = 90_000;

    /// Longest stale period the owner may set: 30 days
    pub const MAX_RATE_STALE_PERIOD: u64 = 30 * 24 * 3600;

    /// Events buffered before the oldest are dropped
    pub const DEFAULT_EVENT_BUFFER: usize = 10_000;

    /// Collateral rate that must be fresh by default
    pub const COLLATERAL_CURRENCY: &str = "SNX";
}

pub use constants::*;
