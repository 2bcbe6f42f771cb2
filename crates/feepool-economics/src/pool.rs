//! # Fee Pool
//!
//! Facade owning the ledger, reward accumulator, delegate approvals and
//! collaborators. Every entry point checks first and mutates after; a
//! failure leaves state as it was.

use crate::accumulator::{Notified, RewardAccumulator, StakeChangeHook};
use crate::approvals::DelegateApprovals;
use crate::closer::PeriodCloser;
use crate::config::{
    validate_fee_period_duration, validate_rate_stale_period, FeePoolConfig, GateConfig,
};
use crate::constants::{MAX_ISSUANCE_RATIO, MAX_TARGET_THRESHOLD};
use crate::events::{EventLog, FeePoolEvent};
use crate::gate::{is_ratio_claimable, ClaimGate, GateContext};
use crate::ledger::{CloseOutcome, FeePeriodLedger, PeriodEntitlement};
use crate::period::{FeePeriod, PeriodStatus};
use feepool_core::{
    AccountId, Amount, Asset, DebtShareOracle, ExchangeRates, FeePoolError, Payout, PeriodId,
    Result, StatusFlags, Timestamp, ValueTransfer,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info};

/// External systems the pool reads from and pays through
#[derive(Clone)]
pub struct Collaborators {
    pub oracle: Arc<dyn DebtShareOracle>,
    pub status: Arc<dyn StatusFlags>,
    pub rates: Arc<dyn ExchangeRates>,
    pub transfer: Arc<dyn ValueTransfer>,
}

/// Amounts paid by a successful claim
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClaimReceipt {
    pub account: AccountId,
    pub fees_paid: Amount,
    pub rewards_paid: Amount,
    /// New claim watermark
    pub claimed_through: PeriodId,
    /// Periods that paid out, newest first
    pub periods: Vec<PeriodId>,
}

fn gate_context<'a>(
    collaborators: &'a Collaborators,
    params: &'a GateConfig,
    account: Option<&'a AccountId>,
    now: Timestamp,
) -> GateContext<'a> {
    GateContext {
        oracle: collaborators.oracle.as_ref(),
        status: collaborators.status.as_ref(),
        rates: collaborators.rates.as_ref(),
        params,
        account,
        now,
    }
}

/// Fee pool
///
/// Emitted events stay buffered until the embedder calls `drain_events`.
/// Beyond `FeePoolConfig::event_buffer` the oldest are dropped, so a caller
/// that publishes events should drain after every mutating call.
pub struct FeePool {
    config: FeePoolConfig,
    ledger: FeePeriodLedger,
    accumulator: RewardAccumulator,
    approvals: DelegateApprovals,
    closer: PeriodCloser,
    claim_gate: ClaimGate,
    collaborators: Collaborators,
    events: EventLog,
}

impl FeePool {
    /// Create a pool with period 1 open at `now`
    pub fn new(config: FeePoolConfig, collaborators: Collaborators, now: Timestamp) -> Result<Self> {
        config.validate()?;
        let ledger = FeePeriodLedger::new(config.fee_period_length, now)?;
        let events = EventLog::with_limit(config.event_buffer);
        info!(
            length = config.fee_period_length,
            duration = config.fee_period_duration,
            "fee pool initialized"
        );
        Ok(Self {
            config,
            ledger,
            accumulator: RewardAccumulator::new(),
            approvals: DelegateApprovals::new(),
            closer: PeriodCloser::default(),
            claim_gate: ClaimGate::for_claim(),
            collaborators,
            events,
        })
    }

    pub fn config(&self) -> &FeePoolConfig {
        &self.config
    }

    pub fn ledger(&self) -> &FeePeriodLedger {
        &self.ledger
    }

    pub fn accumulator(&self) -> &RewardAccumulator {
        &self.accumulator
    }

    fn only_owner(&self, caller: &AccountId) -> Result<()> {
        if self.config.owner.as_ref() != Some(caller) {
            return Err(FeePoolError::Unauthorized(format!("{} is not the owner", caller)));
        }
        Ok(())
    }

    // === Deposits ===

    pub fn record_fee_paid(&mut self, amount: Amount) -> Result<()> {
        self.ledger.record_fee_paid(amount)
    }

    pub fn record_reward_deposit(&mut self, amount: Amount) -> Result<()> {
        self.ledger.record_reward_deposit(amount)
    }

    // === Closing ===

    /// Seconds until the open period may close
    pub fn time_until_close(&self, now: Timestamp) -> i64 {
        PeriodCloser::time_until_close(&self.ledger, self.config.fee_period_duration, now)
    }

    /// Close the open period once its duration has elapsed
    pub fn close_current_fee_period(&mut self, now: Timestamp) -> Result<CloseOutcome> {
        let ctx = gate_context(&self.collaborators, &self.config.gate, None, now);
        let outcome = self.closer.close_current(
            &mut self.ledger,
            &ctx,
            self.collaborators.transfer.as_ref(),
            self.config.fee_period_duration,
        )?;
        self.events.emit(FeePoolEvent::FeePeriodClosed {
            fee_period_id: outcome.closed_period_id,
        });
        Ok(outcome)
    }

    /// Close using the wall clock
    pub fn close_current_fee_period_now(&mut self) -> Result<CloseOutcome> {
        self.close_current_fee_period(chrono::Utc::now().timestamp())
    }

    /// Relayer close carrying the counterpart's period id and start time
    pub fn close_secondary(
        &mut self,
        caller: &AccountId,
        new_period_id: PeriodId,
        start_time: Timestamp,
    ) -> Result<CloseOutcome> {
        let ctx = gate_context(&self.collaborators, &self.config.gate, None, start_time);
        let outcome = self.closer.close_secondary(
            &mut self.ledger,
            &ctx,
            self.collaborators.transfer.as_ref(),
            self.config.relayer.as_ref(),
            caller,
            new_period_id,
            start_time,
        )?;
        self.events.emit(FeePoolEvent::FeePeriodClosed {
            fee_period_id: outcome.closed_period_id,
        });
        Ok(outcome)
    }

    // === Claims ===

    /// Claim everything owed to `account` from closed periods
    pub fn claim_fees(&mut self, account: &AccountId, now: Timestamp) -> Result<ClaimReceipt> {
        self.claim_for(account, now)
    }

    pub fn claim_fees_now(&mut self, account: &AccountId) -> Result<ClaimReceipt> {
        self.claim_for(account, chrono::Utc::now().timestamp())
    }

    /// Claim for `account` as an approved delegate; proceeds go to `account`
    pub fn claim_on_behalf(
        &mut self,
        account: &AccountId,
        delegate: &AccountId,
        now: Timestamp,
    ) -> Result<ClaimReceipt> {
        if !self.approvals.can_claim_for(account, delegate) {
            return Err(FeePoolError::Unauthorized(format!(
                "{} may not claim for {}",
                delegate, account
            )));
        }
        self.claim_for(account, now)
    }

    fn claim_for(&mut self, account: &AccountId, now: Timestamp) -> Result<ClaimReceipt> {
        let ctx = gate_context(&self.collaborators, &self.config.gate, Some(account), now);
        self.claim_gate.evaluate(&ctx)?;

        let plan = self
            .ledger
            .plan_claim(account, self.collaborators.oracle.as_ref())?;
        let previous = self.ledger.commit_claim(&plan)?;

        let payouts: Vec<Payout> = [(Asset::Fees, plan.fees), (Asset::Rewards, plan.rewards)]
            .into_iter()
            .filter(|(_, amount)| *amount > 0)
            .map(|(asset, amount)| Payout::new(asset, amount))
            .collect();
        if let Err(err) = self.collaborators.transfer.pay(account, &payouts) {
            error!(%account, error = %err, "claim payment failed, claim reverted");
            self.ledger.revert_claim(&plan, previous);
            return Err(err);
        }

        info!(
            %account,
            fees = plan.fees,
            rewards = plan.rewards,
            through = plan.claimed_through,
            "fees claimed"
        );
        self.events.emit(FeePoolEvent::FeesClaimed {
            account: *account,
            fees_paid: plan.fees,
            rewards_paid: plan.rewards,
        });
        Ok(ClaimReceipt {
            account: *account,
            fees_paid: plan.fees,
            rewards_paid: plan.rewards,
            claimed_through: plan.claimed_through,
            periods: plan
                .entitlements
                .iter()
                .filter(|e| e.fees > 0 || e.rewards > 0)
                .map(|e| e.fee_period_id)
                .collect(),
        })
    }

    // === Delegation ===

    pub fn approve_claim_on_behalf(&mut self, owner: AccountId, delegate: AccountId) {
        if self.approvals.approve(owner, delegate) {
            self.events
                .emit(FeePoolEvent::ClaimDelegateApproved { owner, delegate });
        }
    }

    pub fn remove_claim_on_behalf(&mut self, owner: AccountId, delegate: AccountId) {
        if self.approvals.remove(&owner, &delegate) {
            self.events
                .emit(FeePoolEvent::ClaimDelegateRemoved { owner, delegate });
        }
    }

    pub fn can_claim_for(&self, owner: &AccountId, delegate: &AccountId) -> bool {
        self.approvals.can_claim_for(owner, delegate)
    }

    // === Queries ===

    pub fn fees_available(&self, account: &AccountId) -> Result<(Amount, Amount)> {
        self.ledger
            .fees_available(account, self.collaborators.oracle.as_ref())
    }

    pub fn fees_by_period(&self, account: &AccountId) -> Result<Vec<PeriodEntitlement>> {
        self.ledger
            .fees_by_period(account, self.collaborators.oracle.as_ref())
    }

    pub fn total_fees_available(&self) -> Result<Amount> {
        self.ledger.total_fees_available()
    }

    pub fn total_rewards_available(&self) -> Result<Amount> {
        self.ledger.total_rewards_available()
    }

    pub fn effective_debt_ratio_for_period(&self, account: &AccountId, slot: usize) -> u128 {
        self.ledger
            .effective_debt_ratio_for_period(account, slot, self.collaborators.oracle.as_ref())
    }

    pub fn recent_fee_periods(&self, slot: usize) -> FeePeriod {
        self.ledger.recent_fee_period(slot)
    }

    pub fn period_status(&self, period_id: PeriodId) -> Option<PeriodStatus> {
        self.ledger.period_status(period_id)
    }

    pub fn last_fee_withdrawal(&self, account: &AccountId) -> PeriodId {
        self.ledger.last_fee_withdrawal(account)
    }

    /// Whether the account's live ratio currently allows a claim
    pub fn is_fees_claimable(&self, account: &AccountId) -> Result<bool> {
        let (ratio, any_rate_invalid) = self.collaborators.oracle.collateralisation_ratio(account);
        if any_rate_invalid {
            return Ok(false);
        }
        is_ratio_claimable(ratio, &self.config.gate)
    }

    // === Migration ===

    pub fn import_fee_period(
        &mut self,
        caller: &AccountId,
        slot: usize,
        period: FeePeriod,
    ) -> Result<()> {
        self.only_owner(caller)?;
        let fee_period_id = period.fee_period_id;
        self.ledger.import_fee_period(slot, period)?;
        self.events
            .emit(FeePoolEvent::FeePeriodImported { slot, fee_period_id });
        Ok(())
    }

    pub fn import_fee_withdrawal(
        &mut self,
        caller: &AccountId,
        account: AccountId,
        period_id: PeriodId,
    ) -> Result<()> {
        self.only_owner(caller)?;
        self.ledger.import_fee_withdrawal(account, period_id)
    }

    pub fn finish_import(&mut self, caller: &AccountId) -> Result<()> {
        self.only_owner(caller)?;
        self.ledger.finish_import();
        Ok(())
    }

    // === Liquidation rewards ===

    pub fn notify_reward_amount(&mut self, amount: Amount) -> Result<Notified> {
        let notified = self
            .accumulator
            .notify(amount, self.collaborators.oracle.as_ref())?;
        self.events.emit(FeePoolEvent::RewardsNotified {
            amount,
            distributed: matches!(notified, Notified::Distributed { .. }),
        });
        Ok(notified)
    }

    pub fn distribute_pending_rewards(&mut self) -> Result<Notified> {
        self.accumulator
            .distribute_pending(self.collaborators.oracle.as_ref())
    }

    pub fn earned(&self, account: &AccountId) -> Result<Amount> {
        self.accumulator
            .earned(account, self.collaborators.oracle.as_ref())
    }

    /// Pay out accrued liquidation rewards
    pub fn settle_rewards(&mut self, account: &AccountId) -> Result<Amount> {
        let paid = self.accumulator.settle(
            account,
            self.collaborators.oracle.as_ref(),
            self.collaborators.transfer.as_ref(),
        )?;
        if paid > 0 {
            self.events.emit(FeePoolEvent::RewardPaid {
                account: *account,
                amount: paid,
            });
        }
        Ok(paid)
    }

    // === Owner settings ===

    pub fn set_fee_period_duration(&mut self, caller: &AccountId, secs: u64) -> Result<()> {
        self.only_owner(caller)?;
        validate_fee_period_duration(secs)?;
        self.config.fee_period_duration = secs;
        info!(secs, "fee period duration updated");
        Ok(())
    }

    pub fn set_issuance_ratio(&mut self, caller: &AccountId, ratio: u64) -> Result<()> {
        self.only_owner(caller)?;
        if ratio == 0 || ratio > MAX_ISSUANCE_RATIO {
            return Err(FeePoolError::InvalidInput(format!(
                "issuance ratio {} outside (0, {}]",
                ratio, MAX_ISSUANCE_RATIO
            )));
        }
        self.config.gate.issuance_ratio = ratio;
        info!(ratio, "issuance ratio updated");
        Ok(())
    }

    pub fn set_target_threshold(&mut self, caller: &AccountId, threshold: u64) -> Result<()> {
        self.only_owner(caller)?;
        if threshold > MAX_TARGET_THRESHOLD {
            return Err(FeePoolError::InvalidInput(format!(
                "target threshold {} above {}",
                threshold, MAX_TARGET_THRESHOLD
            )));
        }
        self.config.gate.target_threshold = threshold;
        info!(threshold, "target threshold updated");
        Ok(())
    }

    pub fn set_rate_stale_period(&mut self, caller: &AccountId, secs: u64) -> Result<()> {
        self.only_owner(caller)?;
        validate_rate_stale_period(secs)?;
        self.config.gate.rate_stale_period = secs;
        info!(secs, "rate stale period updated");
        Ok(())
    }

    pub fn set_relayer(&mut self, caller: &AccountId, relayer: Option<AccountId>) -> Result<()> {
        self.only_owner(caller)?;
        self.config.relayer = relayer;
        info!(?relayer, "relayer updated");
        Ok(())
    }

    // === Events ===

    pub fn events(&self) -> &[FeePoolEvent] {
        self.events.events()
    }

    /// Take all buffered events
    pub fn drain_events(&mut self) -> Vec<FeePoolEvent> {
        self.events.drain()
    }

    /// Events lost because the buffer was full
    pub fn dropped_events(&self) -> u64 {
        self.events.dropped()
    }
}

impl StakeChangeHook for FeePool {
    fn before_stake_change(&mut self, account: &AccountId) -> Result<()> {
        self.accumulator
            .update_entry(account, self.collaborators.oracle.as_ref())?;
        Ok(())
    }
}
