//! # Reward Accumulator
//!
//! Reward-per-share accounting for a continuous reward stream (liquidation
//! rewards) distributed pro rata to live debt share balances.
//!
//! ```text
//! notify(r):        acc += (r * 1e36 + dust) / total_supply
//!                   dust  = (r * 1e36 + dust) % total_supply
//! earned(a):        claimable[a] + (b * (acc - entry[a]) + b - 1) / 1e36
//!                   where b = balance(a)
//! update_entry(a):  claimable[a] = earned(a); entry[a] = acc
//! ```
//!
//! The ratio is kept at 36 decimals in 256 bits. The division remainder is
//! carried into the next notify, and the `b - 1` bias rounds each accrual up
//! by less than one base unit of stake, so a sole staker with constant stake
//! receives exactly the sum of the notified amounts. Payouts are capped at
//! what has been distributed and not yet paid.
//!
//! `update_entry` must run before any change to `balance(a)`, so the old
//! balance prices everything accrued up to that instant and the new balance
//! only applies to later inflow.

use feepool_core::decimal::{checked_add, to_amount, U256};
use feepool_core::{
    AccountId, Amount, Asset, DebtShareOracle, FeePoolError, Payout, Result, ValueTransfer, UNIT,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::{debug, info, warn};

/// Fixed-point scale of the per-share ratio
pub const REWARD_PRECISION: u128 = UNIT * UNIT;

/// Called by the debt share ledger before it changes a balance
pub trait StakeChangeHook {
    fn before_stake_change(&mut self, account: &AccountId) -> Result<()>;
}

/// Per-account checkpoint
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RewardEntry {
    /// Accumulator value at the last checkpoint
    pub entry_accumulated_rewards: U256,
    /// Accrued but unpaid rewards
    pub claimable: Amount,
}

/// What happened to a notified amount
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Notified {
    /// Folded into the per-share ratio, including any pending inflow
    Distributed { amount: Amount },
    /// Held until total stake is non-zero
    Pending { pending: Amount },
}

/// Reward-per-share accumulator
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct RewardAccumulator {
    accumulated_rewards_per_share: U256,

    /// Remainder of the last per-share division, in `REWARD_PRECISION` units
    #[serde(default)]
    dust: u128,

    /// Inflow received while total stake was zero
    pending: Amount,

    entries: HashMap<AccountId, RewardEntry>,

    total_notified: Amount,
    total_paid: Amount,
}

impl RewardAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn accumulated_rewards_per_share(&self) -> U256 {
        self.accumulated_rewards_per_share
    }

    pub fn dust(&self) -> u128 {
        self.dust
    }

    pub fn pending(&self) -> Amount {
        self.pending
    }

    pub fn total_notified(&self) -> Amount {
        self.total_notified
    }

    pub fn total_paid(&self) -> Amount {
        self.total_paid
    }

    pub fn entry(&self, account: &AccountId) -> RewardEntry {
        self.entries.get(account).copied().unwrap_or_default()
    }

    /// Add reward inflow
    pub fn notify(&mut self, amount: Amount, oracle: &dyn DebtShareOracle) -> Result<Notified> {
        if amount == 0 {
            return Err(FeePoolError::InvalidInput(
                "reward amount must be non-zero".into(),
            ));
        }
        let total = checked_add(self.pending, amount)?;
        let total_notified = checked_add(self.total_notified, amount)?;
        let notified = self.distribute(total, oracle)?;
        self.total_notified = total_notified;
        debug!(amount, ?notified, "rewards notified");
        Ok(notified)
    }

    /// Fold pending inflow into the ratio once stake exists
    pub fn distribute_pending(&mut self, oracle: &dyn DebtShareOracle) -> Result<Notified> {
        if self.pending == 0 {
            return Ok(Notified::Distributed { amount: 0 });
        }
        self.distribute(self.pending, oracle)
    }

    fn distribute(&mut self, amount: Amount, oracle: &dyn DebtShareOracle) -> Result<Notified> {
        let supply = oracle.total_supply();
        if supply == 0 {
            self.pending = amount;
            return Ok(Notified::Pending { pending: amount });
        }
        let supply = U256::from(supply);
        let numerator =
            U256::from(amount) * U256::from(REWARD_PRECISION) + U256::from(self.dust);
        let delta = numerator / supply;
        // remainder is below supply, so it fits
        let dust = (numerator % supply).as_u128();

        self.accumulated_rewards_per_share = self
            .accumulated_rewards_per_share
            .checked_add(delta)
            .ok_or(FeePoolError::Overflow)?;
        self.dust = dust;
        self.pending = 0;
        Ok(Notified::Distributed { amount })
    }

    /// Accrued rewards at the account's current balance
    pub fn earned(&self, account: &AccountId, oracle: &dyn DebtShareOracle) -> Result<Amount> {
        let entry = self.entry(account);
        let delta = self
            .accumulated_rewards_per_share
            .checked_sub(entry.entry_accumulated_rewards)
            .ok_or(FeePoolError::Overflow)?;
        let balance = oracle.balance_of(account);
        if balance == 0 || delta.is_zero() {
            return Ok(entry.claimable);
        }
        let scaled = U256::from(balance)
            .checked_mul(delta)
            .and_then(|v| v.checked_add(U256::from(balance - 1)))
            .ok_or(FeePoolError::Overflow)?;
        let accrued = to_amount(scaled / U256::from(REWARD_PRECISION))?;
        checked_add(entry.claimable, accrued)
    }

    /// Stake-change hook: checkpoint the account at its current balance.
    /// Returns the claimable total.
    pub fn update_entry(
        &mut self,
        account: &AccountId,
        oracle: &dyn DebtShareOracle,
    ) -> Result<Amount> {
        let claimable = self.earned(account, oracle)?;
        self.entries.insert(
            *account,
            RewardEntry {
                entry_accumulated_rewards: self.accumulated_rewards_per_share,
                claimable,
            },
        );
        Ok(claimable)
    }

    /// Distributed inflow not yet paid out
    pub fn unpaid(&self) -> Amount {
        self.total_notified
            .saturating_sub(self.pending)
            .saturating_sub(self.total_paid)
    }

    /// Checkpoint and pay everything claimable, up to what has been
    /// distributed and not yet paid. Pays zero when nothing has accrued
    /// since the last settle.
    pub fn settle(
        &mut self,
        account: &AccountId,
        oracle: &dyn DebtShareOracle,
        transfer: &dyn ValueTransfer,
    ) -> Result<Amount> {
        let reward = self.update_entry(account, oracle)?;
        let payout = reward.min(self.unpaid());
        if payout == 0 {
            return Ok(0);
        }
        if payout < reward {
            warn!(%account, reward, payout, "reward capped at unpaid inflow");
        }
        let total_paid = checked_add(self.total_paid, payout)?;

        if let Some(entry) = self.entries.get_mut(account) {
            entry.claimable = reward - payout;
        }
        if let Err(err) = transfer.pay(account, &[Payout::new(Asset::LiquidationRewards, payout)]) {
            if let Some(entry) = self.entries.get_mut(account) {
                entry.claimable = reward;
            }
            return Err(err);
        }
        self.total_paid = total_paid;
        info!(%account, reward = payout, "reward paid");
        Ok(payout)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{InMemoryDebtShares, RecordingTransfer};
    use feepool_core::decimal::units;
    use proptest::prelude::*;

    fn alice() -> AccountId {
        AccountId::new([1u8; 32])
    }

    fn bob() -> AccountId {
        AccountId::new([2u8; 32])
    }

    #[test]
    fn test_notify_zero_rejected() {
        let oracle = InMemoryDebtShares::new();
        let mut acc = RewardAccumulator::new();
        assert!(matches!(
            acc.notify(0, &oracle),
            Err(FeePoolError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_single_staker_receives_all() {
        let oracle = InMemoryDebtShares::new();
        oracle.set_balance(alice(), units(100));
        let transfer = RecordingTransfer::new();
        let mut acc = RewardAccumulator::new();

        acc.notify(units(10), &oracle).unwrap();
        acc.notify(units(5), &oracle).unwrap();
        assert_eq!(acc.earned(&alice(), &oracle).unwrap(), units(15));

        assert_eq!(acc.settle(&alice(), &oracle, &transfer).unwrap(), units(15));
        assert_eq!(transfer.paid_to(&alice(), Asset::LiquidationRewards), units(15));
        assert_eq!(acc.settle(&alice(), &oracle, &transfer).unwrap(), 0);
    }

    #[test]
    fn test_zero_supply_holds_pending() {
        let oracle = InMemoryDebtShares::new();
        let mut acc = RewardAccumulator::new();

        assert_eq!(
            acc.notify(units(7), &oracle).unwrap(),
            Notified::Pending { pending: units(7) }
        );
        assert!(acc.accumulated_rewards_per_share().is_zero());

        oracle.set_balance(alice(), units(7));
        assert_eq!(
            acc.notify(units(7), &oracle).unwrap(),
            Notified::Distributed { amount: units(14) }
        );
        assert_eq!(acc.pending(), 0);
        assert_eq!(acc.earned(&alice(), &oracle).unwrap(), units(14));
    }

    #[test]
    fn test_distribute_pending() {
        let oracle = InMemoryDebtShares::new();
        let mut acc = RewardAccumulator::new();
        acc.notify(units(3), &oracle).unwrap();

        oracle.set_balance(alice(), units(1));
        assert_eq!(
            acc.distribute_pending(&oracle).unwrap(),
            Notified::Distributed { amount: units(3) }
        );
        assert_eq!(acc.earned(&alice(), &oracle).unwrap(), units(3));
    }

    #[test]
    fn test_stake_change_hook_prices_old_balance() {
        let oracle = InMemoryDebtShares::new();
        oracle.set_balance(alice(), units(50));
        oracle.set_balance(bob(), units(50));
        let mut acc = RewardAccumulator::new();

        acc.notify(units(100), &oracle).unwrap();

        // bob doubles his stake; checkpoint first
        acc.update_entry(&bob(), &oracle).unwrap();
        oracle.set_balance(bob(), units(150));

        acc.notify(units(200), &oracle).unwrap();

        // alice: 50 + 200 * 50/200 = 100; bob: 50 + 200 * 150/200 = 200
        assert_eq!(acc.earned(&alice(), &oracle).unwrap(), units(100));
        assert_eq!(acc.earned(&bob(), &oracle).unwrap(), units(200));
    }

    #[test]
    fn test_late_staker_gets_nothing_retroactive() {
        let oracle = InMemoryDebtShares::new();
        oracle.set_balance(alice(), units(10));
        let mut acc = RewardAccumulator::new();
        acc.notify(units(10), &oracle).unwrap();

        acc.update_entry(&bob(), &oracle).unwrap();
        oracle.set_balance(bob(), units(10));
        assert_eq!(acc.earned(&bob(), &oracle).unwrap(), 0);
    }

    #[test]
    fn test_failed_payment_keeps_claimable() {
        let oracle = InMemoryDebtShares::new();
        oracle.set_balance(alice(), units(1));
        let transfer = RecordingTransfer::new();
        let mut acc = RewardAccumulator::new();
        acc.notify(units(4), &oracle).unwrap();

        transfer.fail_next();
        assert!(acc.settle(&alice(), &oracle, &transfer).is_err());
        assert_eq!(acc.entry(&alice()).claimable, units(4));
        assert_eq!(acc.total_paid(), 0);

        assert_eq!(acc.settle(&alice(), &oracle, &transfer).unwrap(), units(4));
        assert_eq!(acc.total_paid(), units(4));
    }

    #[test]
    fn test_uneven_supply_pays_exact_total() {
        let oracle = InMemoryDebtShares::new();
        oracle.set_balance(alice(), units(3));
        let transfer = RecordingTransfer::new();
        let mut acc = RewardAccumulator::new();

        acc.notify(units(1), &oracle).unwrap();
        assert!(acc.dust() > 0);
        acc.notify(units(1), &oracle).unwrap();

        assert_eq!(acc.earned(&alice(), &oracle).unwrap(), units(2));
        assert_eq!(acc.settle(&alice(), &oracle, &transfer).unwrap(), units(2));
        assert_eq!(transfer.paid_to(&alice(), Asset::LiquidationRewards), units(2));
        assert_eq!(acc.unpaid(), 0);
    }

    #[test]
    fn test_zero_balance_earns_nothing() {
        let oracle = InMemoryDebtShares::new();
        oracle.set_balance(alice(), units(7));
        let mut acc = RewardAccumulator::new();
        acc.notify(units(1), &oracle).unwrap();
        assert_eq!(acc.earned(&bob(), &oracle).unwrap(), 0);
    }

    proptest! {
        #[test]
        fn prop_sole_staker_receives_every_notified_amount(
            stake in 1u128..1_000_000_000_000 * UNIT,
            rewards in proptest::collection::vec(1u128..1_000_000_000 * UNIT, 1..8),
        ) {
            let oracle = InMemoryDebtShares::new();
            oracle.set_balance(alice(), stake);
            let transfer = RecordingTransfer::new();
            let mut acc = RewardAccumulator::new();

            for reward in &rewards {
                acc.notify(*reward, &oracle).unwrap();
            }
            let total: u128 = rewards.iter().sum();
            prop_assert_eq!(acc.settle(&alice(), &oracle, &transfer).unwrap(), total);
        }

        #[test]
        fn prop_two_stakers_never_overpaid(
            a in 1u128..1_000_000 * UNIT,
            b in 1u128..1_000_000 * UNIT,
            rewards in proptest::collection::vec(1u128..1_000_000 * UNIT, 1..8),
        ) {
            let oracle = InMemoryDebtShares::new();
            oracle.set_balance(alice(), a);
            oracle.set_balance(bob(), b);
            let transfer = RecordingTransfer::new();
            let mut acc = RewardAccumulator::new();

            for reward in &rewards {
                acc.notify(*reward, &oracle).unwrap();
            }
            let paid = acc.settle(&alice(), &oracle, &transfer).unwrap()
                + acc.settle(&bob(), &oracle, &transfer).unwrap();
            let total: u128 = rewards.iter().sum();
            prop_assert!(paid <= total);
            prop_assert!(total - paid <= 1);
        }
    }
}
