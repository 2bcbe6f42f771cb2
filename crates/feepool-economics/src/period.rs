//! # Fee Periods
//!
//! A fixed-length rolling window of fee periods.
//!
//! ```text
//!  recent index:   0 (open)   1          2          ...   N-1 (oldest)
//!  period id:      k          k-1        k-2        ...   k-N+1
//! ```
//!
//! Slots live in a fixed array indexed by a local close sequence modulo `N`,
//! so closing a period overwrites exactly one slot and never shifts the
//! others. A slot whose stored id is zero has never been filled.

use feepool_core::decimal::checked_sub;
use feepool_core::{Amount, FeePoolError, PeriodId, Result, Timestamp};
use serde::{Deserialize, Serialize};

/// One slot of the rolling window
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeePeriod {
    /// Unique, increasing id; zero for a never-filled slot
    pub fee_period_id: PeriodId,

    /// When the period opened
    pub start_time: Timestamp,

    /// Fee revenue owed to debt holders of this period
    pub fees_to_distribute: Amount,

    /// Fee revenue already claimed
    pub fees_claimed: Amount,

    /// Emission rewards owed to debt holders of this period
    pub rewards_to_distribute: Amount,

    /// Emission rewards already claimed
    pub rewards_claimed: Amount,
}

impl FeePeriod {
    /// Fresh empty period
    pub fn new(fee_period_id: PeriodId, start_time: Timestamp) -> Self {
        Self {
            fee_period_id,
            start_time,
            ..Default::default()
        }
    }

    /// Whether the slot has ever held a period
    pub fn is_filled(&self) -> bool {
        self.fee_period_id != 0
    }

    pub fn unclaimed_fees(&self) -> Amount {
        self.fees_to_distribute.saturating_sub(self.fees_claimed)
    }

    pub fn unclaimed_rewards(&self) -> Amount {
        self.rewards_to_distribute.saturating_sub(self.rewards_claimed)
    }

    /// Claimed totals never exceed what was distributed
    pub fn validate(&self) -> Result<()> {
        checked_sub(self.fees_to_distribute, self.fees_claimed).map_err(|_| {
            FeePoolError::InvalidInput(format!(
                "period {}: fees claimed exceed fees to distribute",
                self.fee_period_id
            ))
        })?;
        checked_sub(self.rewards_to_distribute, self.rewards_claimed).map_err(|_| {
            FeePoolError::InvalidInput(format!(
                "period {}: rewards claimed exceed rewards to distribute",
                self.fee_period_id
            ))
        })?;
        Ok(())
    }
}

/// Lifecycle of a period, strictly forward
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum PeriodStatus {
    /// Accepting deposits
    Open,
    /// Closed, nothing claimed yet
    Closed,
    /// Closed, some value claimed
    PartiallyClaimed,
    /// Rolled out of the window
    Evicted,
}

/// Fixed-size circular buffer of fee periods
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeePeriodWindow {
    slots: Vec<FeePeriod>,

    /// Sequence number of the open period. Starts at `N - 1` so every recent
    /// index maps to a slot from the beginning.
    head: u64,
}

impl FeePeriodWindow {
    /// Window of `length` slots with period `first_id` open at `start_time`
    pub fn new(length: usize, first_id: PeriodId, start_time: Timestamp) -> Result<Self> {
        if length < 2 {
            return Err(FeePoolError::Config(format!(
                "fee period length must be at least 2, got {}",
                length
            )));
        }
        let mut window = Self {
            slots: vec![FeePeriod::default(); length],
            head: (length - 1) as u64,
        };
        let idx = window.slot_index(0);
        window.slots[idx] = FeePeriod::new(first_id, start_time);
        Ok(window)
    }

    /// Number of slots (`N`)
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    fn slot_index(&self, recent: usize) -> usize {
        ((self.head - recent as u64) % self.slots.len() as u64) as usize
    }

    /// Period at recent index (0 = open), including never-filled slots.
    /// `None` when the index is outside the window.
    pub fn recent(&self, recent: usize) -> Option<&FeePeriod> {
        if recent >= self.slots.len() {
            return None;
        }
        Some(&self.slots[self.slot_index(recent)])
    }

    pub fn recent_mut(&mut self, recent: usize) -> Option<&mut FeePeriod> {
        if recent >= self.slots.len() {
            return None;
        }
        let idx = self.slot_index(recent);
        Some(&mut self.slots[idx])
    }

    /// The open period
    pub fn current(&self) -> &FeePeriod {
        &self.slots[self.slot_index(0)]
    }

    pub fn current_mut(&mut self) -> &mut FeePeriod {
        let idx = self.slot_index(0);
        &mut self.slots[idx]
    }

    pub fn current_id(&self) -> PeriodId {
        self.current().fee_period_id
    }

    /// Oldest period id still inside the window
    pub fn oldest_valid_id(&self) -> PeriodId {
        (0..self.slots.len())
            .rev()
            .filter_map(|i| self.recent(i))
            .find(|p| p.is_filled())
            .map(|p| p.fee_period_id)
            .unwrap_or_else(|| self.current_id())
    }

    /// Recent index of a period id, if the id is still in the window
    pub fn position_of(&self, period_id: PeriodId) -> Option<usize> {
        if period_id == 0 || period_id < self.oldest_valid_id() || period_id > self.current_id() {
            return None;
        }
        (0..self.slots.len()).find(|&i| {
            self.recent(i)
                .map(|p| p.fee_period_id == period_id)
                .unwrap_or(false)
        })
    }

    /// Open a new period, returning the evicted oldest slot
    pub fn push(&mut self, period: FeePeriod) -> FeePeriod {
        self.head += 1;
        let idx = self.slot_index(0);
        std::mem::replace(&mut self.slots[idx], period)
    }

    /// Overwrite a recent slot wholesale
    pub fn replace(&mut self, recent: usize, period: FeePeriod) -> Result<FeePeriod> {
        let slot = self.recent_mut(recent).ok_or(FeePoolError::PeriodOutOfRange {
            period_id: period.fee_period_id,
        })?;
        Ok(std::mem::replace(slot, period))
    }

    /// Closed periods from newest to oldest, skipping never-filled slots
    pub fn closed(&self) -> impl Iterator<Item = (usize, &FeePeriod)> {
        (1..self.slots.len())
            .filter_map(move |i| self.recent(i).map(|p| (i, p)))
            .filter(|(_, p)| p.is_filled())
    }

    /// Lifecycle of a period id relative to the window
    pub fn status_of(&self, period_id: PeriodId) -> Option<PeriodStatus> {
        if period_id == 0 || period_id > self.current_id() {
            return None;
        }
        let Some(pos) = self.position_of(period_id) else {
            return Some(PeriodStatus::Evicted);
        };
        if pos == 0 {
            return Some(PeriodStatus::Open);
        }
        let period = self.recent(pos)?;
        if period.fees_claimed > 0 || period.rewards_claimed > 0 {
            Some(PeriodStatus::PartiallyClaimed)
        } else {
            Some(PeriodStatus::Closed)
        }
    }
}
