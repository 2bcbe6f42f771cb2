//! Events emitted by fee pool state transitions

use feepool_core::{AccountId, Amount, PeriodId};
use serde::{Deserialize, Serialize};
use tracing::{trace, warn};

/// Fee pool event
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FeePoolEvent {
    /// A period closed; carries the just-closed period's id
    FeePeriodClosed { fee_period_id: PeriodId },

    FeesClaimed {
        account: AccountId,
        fees_paid: Amount,
        rewards_paid: Amount,
    },

    /// Accumulator payout
    RewardPaid { account: AccountId, amount: Amount },

    /// Reward inflow; `distributed` is false while total stake is zero
    RewardsNotified { amount: Amount, distributed: bool },

    FeePeriodImported {
        slot: usize,
        fee_period_id: PeriodId,
    },

    ClaimDelegateApproved {
        owner: AccountId,
        delegate: AccountId,
    },

    ClaimDelegateRemoved {
        owner: AccountId,
        delegate: AccountId,
    },
}

impl FeePoolEvent {
    pub fn name(&self) -> &'static str {
        match self {
            Self::FeePeriodClosed { .. } => "FeePeriodClosed",
            Self::FeesClaimed { .. } => "FeesClaimed",
            Self::RewardPaid { .. } => "RewardPaid",
            Self::RewardsNotified { .. } => "RewardsNotified",
            Self::FeePeriodImported { .. } => "FeePeriodImported",
            Self::ClaimDelegateApproved { .. } => "ClaimDelegateApproved",
            Self::ClaimDelegateRemoved { .. } => "ClaimDelegateRemoved",
        }
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

/// Buffer of emitted events, drained by the embedder.
///
/// With a limit set, a full buffer drops its oldest event for each new one
/// and counts the loss in `dropped`.
#[derive(Clone, Debug, Default)]
pub struct EventLog {
    events: Vec<FeePoolEvent>,
    limit: Option<usize>,
    dropped: u64,
}

impl EventLog {
    /// Unbounded log
    pub fn new() -> Self {
        Self::default()
    }

    /// Log holding at most `limit` events (at least one)
    pub fn with_limit(limit: usize) -> Self {
        Self {
            limit: Some(limit.max(1)),
            ..Self::default()
        }
    }

    pub fn emit(&mut self, event: FeePoolEvent) {
        trace!(event = event.name(), "fee pool event");
        if let Some(limit) = self.limit {
            if self.events.len() >= limit {
                let oldest = self.events.remove(0);
                self.dropped += 1;
                warn!(
                    dropped = oldest.name(),
                    total_dropped = self.dropped,
                    "event buffer full, oldest event dropped"
                );
            }
        }
        self.events.push(event);
    }

    /// Events lost to the limit since creation
    pub fn dropped(&self) -> u64 {
        self.dropped
    }

    pub fn events(&self) -> &[FeePoolEvent] {
        &self.events
    }

    /// Take all buffered events
    pub fn drain(&mut self) -> Vec<FeePoolEvent> {
        std::mem::take(&mut self.events)
    }
}
