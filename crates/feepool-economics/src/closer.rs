//! # Period Closer
//!
//! Two entry points roll the window, sharing one `apply_close` routine:
//!
//! - **Primary**: anyone, once `fee_period_duration` has elapsed since the
//!   open period started. Requires a configured duration.
//! - **Relayed**: only the designated relayer, mirroring a close made on a
//!   counterpart deployment. Takes the new period id and start time as
//!   arguments, skips the time gate and the duration requirement.

use crate::gate::{ClaimGate, GateContext};
use crate::ledger::{CloseOutcome, FeePeriodLedger};
use feepool_core::{AccountId, FeePoolError, PeriodId, Result, Timestamp, ValueTransfer};
use tracing::{error, info};

/// Orchestrates period rollover
pub struct PeriodCloser {
    close_gate: ClaimGate,
    relayed_gate: ClaimGate,
}

impl Default for PeriodCloser {
    fn default() -> Self {
        Self {
            close_gate: ClaimGate::for_close(),
            relayed_gate: ClaimGate::for_relayed_close(),
        }
    }
}

impl PeriodCloser {
    pub fn new(close_gate: ClaimGate, relayed_gate: ClaimGate) -> Self {
        Self {
            close_gate,
            relayed_gate,
        }
    }

    /// Seconds until the open period may close; zero once it can
    pub fn time_until_close(
        ledger: &FeePeriodLedger,
        fee_period_duration: u64,
        now: Timestamp,
    ) -> i64 {
        let close_at = ledger
            .current_period()
            .start_time
            .saturating_add(fee_period_duration as i64);
        close_at.saturating_sub(now).max(0)
    }

    /// Time-gated close callable by anyone
    pub fn close_current(
        &self,
        ledger: &mut FeePeriodLedger,
        ctx: &GateContext<'_>,
        transfer: &dyn ValueTransfer,
        fee_period_duration: u64,
    ) -> Result<CloseOutcome> {
        if fee_period_duration == 0 {
            return Err(FeePoolError::DurationNotConfigured);
        }
        let remaining_secs = Self::time_until_close(ledger, fee_period_duration, ctx.now);
        if remaining_secs > 0 {
            return Err(FeePoolError::TooEarly { remaining_secs });
        }
        self.close_gate.evaluate(ctx)?;

        let new_period_id = ledger.current_period_id() + 1;
        Self::apply_close(ledger, ctx, transfer, new_period_id, ctx.now)
    }

    /// Relayer-only close mirroring a counterpart deployment
    #[allow(clippy::too_many_arguments)]
    pub fn close_secondary(
        &self,
        ledger: &mut FeePeriodLedger,
        ctx: &GateContext<'_>,
        transfer: &dyn ValueTransfer,
        relayer: Option<&AccountId>,
        caller: &AccountId,
        new_period_id: PeriodId,
        start_time: Timestamp,
    ) -> Result<CloseOutcome> {
        if relayer != Some(caller) {
            return Err(FeePoolError::Unauthorized(format!(
                "{} is not the relayer",
                caller
            )));
        }
        self.relayed_gate.evaluate(ctx)?;
        Self::apply_close(ledger, ctx, transfer, new_period_id, start_time)
    }

    fn apply_close(
        ledger: &mut FeePeriodLedger,
        ctx: &GateContext<'_>,
        transfer: &dyn ValueTransfer,
        new_period_id: PeriodId,
        start_time: Timestamp,
    ) -> Result<CloseOutcome> {
        let plan = ledger.plan_close(new_period_id)?;

        // burn before the window moves so a failure leaves nothing to undo
        if plan.fees_burned > 0 {
            if let Err(err) = transfer.burn_fees(plan.fees_burned) {
                error!(
                    period = plan.closed_period_id,
                    error = %err,
                    "fee burn failed, period left open"
                );
                return Err(err);
            }
        }
        let outcome = ledger.commit_close(plan, start_time)?;
        ctx.oracle.take_snapshot(new_period_id);

        info!(
            closed = outcome.closed_period_id,
            opened = outcome.new_period_id,
            burned = outcome.fees_burned,
            rolled_over_fees = outcome.rolled_over_fees,
            rolled_over_rewards = outcome.rolled_over_rewards,
            "fee period closed"
        );
        Ok(outcome)
    }
}
