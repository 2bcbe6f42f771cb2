//! # Fee Period Ledger
//!
//! Rolling window of fee periods plus per-account claim watermarks.
//!
//! ## Claims
//!
//! A claim takes every closed period in the window the account has not yet
//! claimed, so "claimed period P" is recorded as a single watermark per
//! account: `P <= last_fee_withdrawal[account]`.
//!
//! ## Rollover
//!
//! Closing evicts the oldest slot. Its unclaimed remainder is added to the
//! next-oldest period only, not spread across the window. Claimants of that
//! receiving period therefore get the remainder in proportion to their share
//! of the receiving period, regardless of their activity in the evicted one.

use crate::period::{FeePeriod, FeePeriodWindow, PeriodStatus};
use feepool_core::decimal::{checked_add, checked_sub, multiply_decimal};
use feepool_core::{
    AccountId, Amount, DebtShareOracle, FeePoolError, PeriodId, Result, Timestamp, UNIT,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::debug;

/// What one account is owed from one period
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeriodEntitlement {
    /// Recent index (0 = open)
    pub slot: usize,
    pub fee_period_id: PeriodId,
    pub fees: Amount,
    pub rewards: Amount,
}

/// Amounts a claim would pay, computed before any state changes
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ClaimPlan {
    pub account: AccountId,
    pub entitlements: Vec<PeriodEntitlement>,
    pub fees: Amount,
    pub rewards: Amount,
    /// Newest closed period; becomes the account's watermark
    pub claimed_through: PeriodId,
}

/// Result of closing the open period
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CloseOutcome {
    pub closed_period_id: PeriodId,
    pub new_period_id: PeriodId,
    /// Fee pool of the closed period handed to the burn primitive
    pub fees_burned: Amount,
    pub rolled_over_fees: Amount,
    pub rolled_over_rewards: Amount,
    /// Slot that fell out of the window
    pub evicted: FeePeriod,
}

/// A close computed before any state changes
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ClosePlan {
    pub closed_period_id: PeriodId,
    pub new_period_id: PeriodId,
    pub fees_burned: Amount,
    pub rolled_over_fees: Amount,
    pub rolled_over_rewards: Amount,
}

/// Fee period ledger
#[derive(Clone, Debug)]
pub struct FeePeriodLedger {
    window: FeePeriodWindow,

    /// Highest period id each account has claimed
    last_fee_withdrawal: HashMap<AccountId, PeriodId>,

    /// Historical import allowed until normal operation starts
    import_open: bool,
}

impl FeePeriodLedger {
    /// Ledger with `length` slots and period 1 open at `start_time`
    pub fn new(length: usize, start_time: Timestamp) -> Result<Self> {
        Ok(Self {
            window: FeePeriodWindow::new(length, 1, start_time)?,
            last_fee_withdrawal: HashMap::new(),
            import_open: true,
        })
    }

    pub fn window(&self) -> &FeePeriodWindow {
        &self.window
    }

    pub fn fee_period_length(&self) -> usize {
        self.window.len()
    }

    pub fn current_period(&self) -> &FeePeriod {
        self.window.current()
    }

    pub fn current_period_id(&self) -> PeriodId {
        self.window.current_id()
    }

    /// Period at a recent index; never-filled and out-of-range slots read as empty
    pub fn recent_fee_period(&self, slot: usize) -> FeePeriod {
        self.window.recent(slot).cloned().unwrap_or_default()
    }

    pub fn period_status(&self, period_id: PeriodId) -> Option<PeriodStatus> {
        self.window.status_of(period_id)
    }

    pub fn is_import_open(&self) -> bool {
        self.import_open
    }

    // === Deposits ===

    /// Add fee revenue to the open period
    pub fn record_fee_paid(&mut self, amount: Amount) -> Result<()> {
        if amount == 0 {
            return Ok(());
        }
        let current = self.window.current_mut();
        current.fees_to_distribute = checked_add(current.fees_to_distribute, amount)?;
        self.import_open = false;
        debug!(
            period = current.fee_period_id,
            amount,
            total = current.fees_to_distribute,
            "fee recorded"
        );
        Ok(())
    }

    /// Add emission rewards to the open period
    pub fn record_reward_deposit(&mut self, amount: Amount) -> Result<()> {
        if amount == 0 {
            return Ok(());
        }
        let current = self.window.current_mut();
        current.rewards_to_distribute = checked_add(current.rewards_to_distribute, amount)?;
        self.import_open = false;
        debug!(
            period = current.fee_period_id,
            amount,
            total = current.rewards_to_distribute,
            "rewards recorded"
        );
        Ok(())
    }

    // === Closing ===

    /// Compute a close without touching state: the burn amount and the
    /// remainder the evicted period carries into the next-oldest.
    pub fn plan_close(&self, new_period_id: PeriodId) -> Result<ClosePlan> {
        let closed_period_id = self.window.current_id();
        if new_period_id <= closed_period_id {
            return Err(FeePoolError::InvalidInput(format!(
                "new fee period {} must follow {}",
                new_period_id, closed_period_id
            )));
        }

        let n = self.window.len();
        let oldest = self.recent_fee_period(n - 1);
        let receiving = self.recent_fee_period(n - 2);
        let rolled_over_fees = oldest.unclaimed_fees();
        let rolled_over_rewards = oldest.unclaimed_rewards();
        // overflow surfaces here, before anything is paid or burned
        checked_add(receiving.fees_to_distribute, rolled_over_fees)?;
        checked_add(receiving.rewards_to_distribute, rolled_over_rewards)?;

        Ok(ClosePlan {
            closed_period_id,
            new_period_id,
            fees_burned: self.window.current().fees_to_distribute,
            rolled_over_fees,
            rolled_over_rewards,
        })
    }

    /// Roll the window per `plan`: evict the oldest period, carry its
    /// unclaimed remainder into the next-oldest, and open the new period.
    ///
    /// Touches at most two existing slots regardless of how late it runs.
    pub fn commit_close(
        &mut self,
        plan: ClosePlan,
        start_time: Timestamp,
    ) -> Result<CloseOutcome> {
        if self.plan_close(plan.new_period_id)? != plan {
            return Err(FeePoolError::InvalidInput("stale close plan".into()));
        }
        let n = self.window.len();
        let receiving = self.recent_fee_period(n - 2);
        let fees = checked_add(receiving.fees_to_distribute, plan.rolled_over_fees)?;
        let rewards = checked_add(receiving.rewards_to_distribute, plan.rolled_over_rewards)?;
        if let Some(period) = self.window.recent_mut(n - 2) {
            period.fees_to_distribute = fees;
            period.rewards_to_distribute = rewards;
        }
        let evicted = self.window.push(FeePeriod::new(plan.new_period_id, start_time));
        self.import_open = false;

        Ok(CloseOutcome {
            closed_period_id: plan.closed_period_id,
            new_period_id: plan.new_period_id,
            fees_burned: plan.fees_burned,
            rolled_over_fees: plan.rolled_over_fees,
            rolled_over_rewards: plan.rolled_over_rewards,
            evicted,
        })
    }

    /// `plan_close` then `commit_close`
    pub fn apply_close(
        &mut self,
        new_period_id: PeriodId,
        start_time: Timestamp,
    ) -> Result<CloseOutcome> {
        let plan = self.plan_close(new_period_id)?;
        self.commit_close(plan, start_time)
    }

    // === Claims ===

    /// Highest period id the account has claimed, zero if never
    pub fn last_fee_withdrawal(&self, account: &AccountId) -> PeriodId {
        self.last_fee_withdrawal.get(account).copied().unwrap_or(0)
    }

    pub fn has_claimed(&self, account: &AccountId, period_id: PeriodId) -> bool {
        period_id <= self.last_fee_withdrawal(account)
    }

    fn entitlement(
        &self,
        slot: usize,
        period: &FeePeriod,
        share: u128,
    ) -> Result<PeriodEntitlement> {
        let share = share.min(UNIT);
        Ok(PeriodEntitlement {
            slot,
            fee_period_id: period.fee_period_id,
            fees: multiply_decimal(share, period.fees_to_distribute)?.min(period.unclaimed_fees()),
            rewards: multiply_decimal(share, period.rewards_to_distribute)?
                .min(period.unclaimed_rewards()),
        })
    }

    /// Unclaimed entitlements across closed periods, newest first
    pub fn claimable_entitlements(
        &self,
        account: &AccountId,
        oracle: &dyn DebtShareOracle,
    ) -> Result<Vec<PeriodEntitlement>> {
        let watermark = self.last_fee_withdrawal(account);
        self.window
            .closed()
            .filter(|(_, p)| p.fee_period_id > watermark)
            .map(|(slot, p)| {
                let share = oracle.share_percent_on_period(account, p.fee_period_id);
                self.entitlement(slot, p, share)
            })
            .collect()
    }

    /// Per-slot breakdown. Slot 0 previews the open period at the live share;
    /// it is never claimable.
    pub fn fees_by_period(
        &self,
        account: &AccountId,
        oracle: &dyn DebtShareOracle,
    ) -> Result<Vec<PeriodEntitlement>> {
        let n = self.window.len();
        let mut results: Vec<PeriodEntitlement> = (0..n)
            .map(|slot| PeriodEntitlement {
                slot,
                fee_period_id: self.recent_fee_period(slot).fee_period_id,
                ..Default::default()
            })
            .collect();

        results[0] = self.entitlement(0, self.window.current(), oracle.share_percent(account))?;
        for e in self.claimable_entitlements(account, oracle)? {
            results[e.slot] = e;
        }
        Ok(results)
    }

    /// Unclaimed (fees, rewards) for the account across closed periods
    pub fn fees_available(
        &self,
        account: &AccountId,
        oracle: &dyn DebtShareOracle,
    ) -> Result<(Amount, Amount)> {
        self.claimable_entitlements(account, oracle)?
            .iter()
            .try_fold((0u128, 0u128), |(fees, rewards), e| {
                Ok((checked_add(fees, e.fees)?, checked_add(rewards, e.rewards)?))
            })
    }

    /// Work out a claim without mutating anything
    pub fn plan_claim(
        &self,
        account: &AccountId,
        oracle: &dyn DebtShareOracle,
    ) -> Result<ClaimPlan> {
        let newest_closed = self.recent_fee_period(1);
        if !newest_closed.is_filled() {
            return Err(FeePoolError::NothingToClaim);
        }
        let entitlements = self.claimable_entitlements(account, oracle)?;
        let (fees, rewards) = entitlements
            .iter()
            .try_fold((0u128, 0u128), |(f, r), e| {
                Ok::<_, FeePoolError>((checked_add(f, e.fees)?, checked_add(r, e.rewards)?))
            })?;
        if fees == 0 && rewards == 0 {
            return Err(FeePoolError::NothingToClaim);
        }
        Ok(ClaimPlan {
            account: *account,
            entitlements,
            fees,
            rewards,
            claimed_through: newest_closed.fee_period_id,
        })
    }

    /// Mark the planned periods claimed. Returns the previous watermark so
    /// the claim can be reverted if payment fails.
    pub fn commit_claim(&mut self, plan: &ClaimPlan) -> Result<PeriodId> {
        for e in &plan.entitlements {
            let period = self.window.recent(e.slot).ok_or(FeePoolError::PeriodOutOfRange {
                period_id: e.fee_period_id,
            })?;
            if period.fee_period_id != e.fee_period_id
                || period.unclaimed_fees() < e.fees
                || period.unclaimed_rewards() < e.rewards
            {
                return Err(FeePoolError::InvalidInput("stale claim plan".into()));
            }
        }

        let previous = self.last_fee_withdrawal(&plan.account);
        self.last_fee_withdrawal
            .insert(plan.account, previous.max(plan.claimed_through));
        for e in &plan.entitlements {
            if let Some(period) = self.window.recent_mut(e.slot) {
                period.fees_claimed += e.fees;
                period.rewards_claimed += e.rewards;
            }
        }
        self.import_open = false;
        Ok(previous)
    }

    /// Undo a committed claim
    pub fn revert_claim(&mut self, plan: &ClaimPlan, previous: PeriodId) {
        for e in &plan.entitlements {
            if let Some(period) = self.window.recent_mut(e.slot) {
                if period.fee_period_id == e.fee_period_id {
                    period.fees_claimed = period.fees_claimed.saturating_sub(e.fees);
                    period.rewards_claimed = period.rewards_claimed.saturating_sub(e.rewards);
                }
            }
        }
        if previous == 0 {
            self.last_fee_withdrawal.remove(&plan.account);
        } else {
            self.last_fee_withdrawal.insert(plan.account, previous);
        }
    }

    // === Queries ===

    /// Unclaimed fees across all closed periods
    pub fn total_fees_available(&self) -> Result<Amount> {
        self.window
            .closed()
            .try_fold(0u128, |acc, (_, p)| checked_add(acc, p.unclaimed_fees()))
    }

    /// Unclaimed rewards across all closed periods
    pub fn total_rewards_available(&self) -> Result<Amount> {
        self.window
            .closed()
            .try_fold(0u128, |acc, (_, p)| checked_add(acc, p.unclaimed_rewards()))
    }

    /// Account's debt share for the period at a recent index. Zero for the
    /// open period and for indices outside the window; the oracle is only
    /// asked about periods still in the window.
    pub fn effective_debt_ratio_for_period(
        &self,
        account: &AccountId,
        slot: usize,
        oracle: &dyn DebtShareOracle,
    ) -> u128 {
        if slot == 0 || slot >= self.window.len() {
            return 0;
        }
        match self.window.recent(slot) {
            Some(period) if period.is_filled() => {
                oracle.share_percent_on_period(account, period.fee_period_id)
            }
            _ => 0,
        }
    }

    // === Migration ===

    /// Overwrite a slot with historical data. Slots are imported from 0
    /// upward and ids must decrease with the slot index.
    pub fn import_fee_period(&mut self, slot: usize, period: FeePeriod) -> Result<()> {
        if !self.import_open {
            return Err(FeePoolError::ImportClosed);
        }
        if slot >= self.window.len() {
            return Err(FeePoolError::PeriodOutOfRange {
                period_id: period.fee_period_id,
            });
        }
        if !period.is_filled() {
            return Err(FeePoolError::InvalidInput("fee period id must be non-zero".into()));
        }
        period.validate()?;

        if slot > 0 {
            let newer = self.recent_fee_period(slot - 1);
            // filled slots must stay a contiguous run from the open period
            if !newer.is_filled() {
                return Err(FeePoolError::InvalidInput(format!(
                    "import slot {} before slot {}",
                    slot - 1,
                    slot
                )));
            }
            if newer.fee_period_id <= period.fee_period_id {
                return Err(FeePoolError::InvalidInput(format!(
                    "slot {} id {} must be below slot {} id {}",
                    slot,
                    period.fee_period_id,
                    slot - 1,
                    newer.fee_period_id
                )));
            }
        }
        let older = self.recent_fee_period(slot + 1);
        if older.is_filled() && older.fee_period_id >= period.fee_period_id {
            return Err(FeePoolError::InvalidInput(format!(
                "slot {} id {} must be above slot {} id {}",
                slot,
                period.fee_period_id,
                slot + 1,
                older.fee_period_id
            )));
        }

        self.window.replace(slot, period)?;
        Ok(())
    }

    /// Seed an account's claim watermark during migration
    pub fn import_fee_withdrawal(&mut self, account: AccountId, period_id: PeriodId) -> Result<()> {
        if !self.import_open {
            return Err(FeePoolError::ImportClosed);
        }
        self.last_fee_withdrawal.insert(account, period_id);
        Ok(())
    }

    /// End the import phase
    pub fn finish_import(&mut self) {
        self.import_open = false;
    }

    /// Sum of claimed totals never exceeds distributable totals in any slot
    pub fn check_conservation(&self) -> Result<()> {
        for slot in 0..self.window.len() {
            let period = self.recent_fee_period(slot);
            checked_sub(period.fees_to_distribute, period.fees_claimed)?;
            checked_sub(period.rewards_to_distribute, period.rewards_claimed)?;
        }
        Ok(())
    }
}
