//! External collaborators consumed by the accounting engine
//!
//! The engine never owns debt, prices, pause flags or balances. It reads
//! them through these traits and moves value through `ValueTransfer`.

use crate::error::Result;
use crate::types::{AccountId, Amount, CurrencyKey, Payout, PeriodId, Section, Timestamp};

/// Source of debt shares and collateralization ratios.
///
/// Shares and ratios are 18-decimal fractions (`UNIT` = 100%).
pub trait DebtShareOracle: Send + Sync {
    /// Account's share of total debt as snapshotted for a closed period.
    /// Only queried for periods still inside the rolling window.
    fn share_percent_on_period(&self, account: &AccountId, period_id: PeriodId) -> u128;

    /// Account's live share of total debt
    fn share_percent(&self, account: &AccountId) -> u128;

    /// Live debt share balance, the stake used by the reward accumulator
    fn balance_of(&self, account: &AccountId) -> Amount;

    /// Total debt shares outstanding
    fn total_supply(&self) -> Amount;

    /// Debt-to-collateral ratio and whether any rate used to compute it is invalid
    fn collateralisation_ratio(&self, account: &AccountId) -> (u128, bool);

    /// Record share balances for a newly opened period
    fn take_snapshot(&self, _period_id: PeriodId) {}
}

/// System-wide suspension flags
pub trait StatusFlags: Send + Sync {
    fn is_suspended(&self, section: Section) -> bool;
}

/// Price feed freshness
pub trait ExchangeRates: Send + Sync {
    /// When the rate for `key` was last updated, `None` if never
    fn last_updated(&self, key: &CurrencyKey) -> Option<Timestamp>;
}

/// Moves settled value. Calls are all-or-nothing: either every payout in
/// the batch lands or none does.
pub trait ValueTransfer: Send + Sync {
    fn pay(&self, account: &AccountId, payouts: &[Payout]) -> Result<()>;

    /// Burn a closing period's fee pool
    fn burn_fees(&self, amount: Amount) -> Result<()>;
}
