//! In-memory collaborators
//!
//! Thread-safe stand-ins for the debt oracle, status flags, rate feed and
//! value transfer, used by the test suites and for embedding the engine
//! without a chain behind it.

use crate::accumulator::StakeChangeHook;
use crate::pool::Collaborators;
use feepool_core::decimal::{checked_add, checked_sub, divide_decimal};
use feepool_core::{
    AccountId, Amount, Asset, CurrencyKey, DebtShareOracle, ExchangeRates, FeePoolError, Payout,
    PeriodId, Result, Section, StatusFlags, Timestamp, ValueTransfer,
};
use parking_lot::RwLock;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

#[derive(Default)]
struct DebtShareState {
    balances: HashMap<AccountId, Amount>,
    /// Balances frozen when each period closed
    snapshots: HashMap<PeriodId, HashMap<AccountId, Amount>>,
    /// Explicit per-period shares, taking precedence over snapshots
    period_shares: HashMap<(AccountId, PeriodId), u128>,
    ratios: HashMap<AccountId, u128>,
    rates_invalid: bool,
    current_period: PeriodId,
}

fn share_of(balances: &HashMap<AccountId, Amount>, account: &AccountId) -> u128 {
    let total: Amount = balances.values().sum();
    let balance = balances.get(account).copied().unwrap_or(0);
    if total == 0 {
        return 0;
    }
    divide_decimal(balance, total).unwrap_or(0)
}

/// Debt share ledger with per-period snapshots
pub struct InMemoryDebtShares {
    state: RwLock<DebtShareState>,
}

impl Default for InMemoryDebtShares {
    fn default() -> Self {
        Self {
            state: RwLock::new(DebtShareState {
                current_period: 1,
                ..Default::default()
            }),
        }
    }
}

impl InMemoryDebtShares {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a balance directly, bypassing the stake-change hook
    pub fn set_balance(&self, account: AccountId, balance: Amount) {
        self.state.write().balances.insert(account, balance);
    }

    /// Pin an account's share for a period
    pub fn set_share_on_period(&self, account: AccountId, period_id: PeriodId, share: u128) {
        self.state
            .write()
            .period_shares
            .insert((account, period_id), share);
    }

    pub fn set_collateralisation_ratio(&self, account: AccountId, ratio: u128) {
        self.state.write().ratios.insert(account, ratio);
    }

    pub fn set_rates_invalid(&self, invalid: bool) {
        self.state.write().rates_invalid = invalid;
    }

    pub fn current_snapshot_period(&self) -> PeriodId {
        self.state.read().current_period
    }

    /// Issue debt shares, checkpointing rewards first
    pub fn mint(
        &self,
        hook: &mut dyn StakeChangeHook,
        account: AccountId,
        amount: Amount,
    ) -> Result<()> {
        hook.before_stake_change(&account)?;
        let mut state = self.state.write();
        let balance = state.balances.entry(account).or_default();
        *balance = checked_add(*balance, amount)?;
        Ok(())
    }

    /// Burn debt shares, checkpointing rewards first
    pub fn burn(
        &self,
        hook: &mut dyn StakeChangeHook,
        account: AccountId,
        amount: Amount,
    ) -> Result<()> {
        let current = self.balance_of(&account);
        let remaining = checked_sub(current, amount)
            .map_err(|_| FeePoolError::InvalidInput("burn exceeds balance".into()))?;
        hook.before_stake_change(&account)?;
        self.state.write().balances.insert(account, remaining);
        Ok(())
    }
}

impl DebtShareOracle for InMemoryDebtShares {
    fn share_percent_on_period(&self, account: &AccountId, period_id: PeriodId) -> u128 {
        let state = self.state.read();
        if let Some(share) = state.period_shares.get(&(*account, period_id)) {
            return *share;
        }
        match state.snapshots.get(&period_id) {
            Some(balances) => share_of(balances, account),
            None => share_of(&state.balances, account),
        }
    }

    fn share_percent(&self, account: &AccountId) -> u128 {
        share_of(&self.state.read().balances, account)
    }

    fn balance_of(&self, account: &AccountId) -> Amount {
        self.state.read().balances.get(account).copied().unwrap_or(0)
    }

    fn total_supply(&self) -> Amount {
        self.state.read().balances.values().sum()
    }

    fn collateralisation_ratio(&self, account: &AccountId) -> (u128, bool) {
        let state = self.state.read();
        (
            state.ratios.get(account).copied().unwrap_or(0),
            state.rates_invalid,
        )
    }

    fn take_snapshot(&self, period_id: PeriodId) {
        let mut state = self.state.write();
        let closing = state.current_period;
        let frozen = state.balances.clone();
        state.snapshots.insert(closing, frozen);
        state.current_period = period_id;
    }
}

/// Suspension flags
#[derive(Default)]
pub struct InMemoryStatus {
    suspended: RwLock<HashSet<Section>>,
}

impl InMemoryStatus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn suspend(&self, section: Section) {
        self.suspended.write().insert(section);
    }

    pub fn resume(&self, section: Section) {
        self.suspended.write().remove(&section);
    }
}

impl StatusFlags for InMemoryStatus {
    fn is_suspended(&self, section: Section) -> bool {
        self.suspended.read().contains(&section)
    }
}

/// Rate update timestamps
#[derive(Default)]
pub struct InMemoryRates {
    updated: RwLock<HashMap<CurrencyKey, Timestamp>>,
}

impl InMemoryRates {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_last_updated(&self, key: impl Into<CurrencyKey>, at: Timestamp) {
        self.updated.write().insert(key.into(), at);
    }
}

impl ExchangeRates for InMemoryRates {
    fn last_updated(&self, key: &CurrencyKey) -> Option<Timestamp> {
        self.updated.read().get(key).copied()
    }
}

#[derive(Default)]
struct TransferState {
    payments: Vec<(AccountId, Payout)>,
    burned: Amount,
    fail_next: bool,
}

/// Records every payout and burn
#[derive(Default)]
pub struct RecordingTransfer {
    state: RwLock<TransferState>,
}

impl RecordingTransfer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next pay or burn fail
    pub fn fail_next(&self) {
        self.state.write().fail_next = true;
    }

    pub fn payments(&self) -> Vec<(AccountId, Payout)> {
        self.state.read().payments.clone()
    }

    pub fn paid_to(&self, account: &AccountId, asset: Asset) -> Amount {
        self.state
            .read()
            .payments
            .iter()
            .filter(|(a, p)| a == account && p.asset == asset)
            .map(|(_, p)| p.amount)
            .sum()
    }

    pub fn total_burned(&self) -> Amount {
        self.state.read().burned
    }

    fn take_failure(state: &mut TransferState) -> Result<()> {
        if std::mem::take(&mut state.fail_next) {
            return Err(FeePoolError::TransferFailed("injected failure".into()));
        }
        Ok(())
    }
}

impl ValueTransfer for RecordingTransfer {
    fn pay(&self, account: &AccountId, payouts: &[Payout]) -> Result<()> {
        let mut state = self.state.write();
        Self::take_failure(&mut state)?;
        state
            .payments
            .extend(payouts.iter().map(|p| (*account, *p)));
        Ok(())
    }

    fn burn_fees(&self, amount: Amount) -> Result<()> {
        let mut state = self.state.write();
        Self::take_failure(&mut state)?;
        state.burned = checked_add(state.burned, amount)?;
        Ok(())
    }
}

/// Full collaborator set with typed handles kept for driving and inspection
#[derive(Clone, Default)]
pub struct InMemoryCollaborators {
    pub shares: Arc<InMemoryDebtShares>,
    pub status: Arc<InMemoryStatus>,
    pub rates: Arc<InMemoryRates>,
    pub transfer: Arc<RecordingTransfer>,
}

impl InMemoryCollaborators {
    /// Collaborators with the collateral rate fresh at `now`
    pub fn new(now: Timestamp) -> Self {
        let env = Self::default();
        env.refresh_rates(now);
        env
    }

    /// Mark the collateral rate as updated at `now`
    pub fn refresh_rates(&self, now: Timestamp) {
        self.rates
            .set_last_updated(crate::constants::COLLATERAL_CURRENCY, now);
    }

    pub fn collaborators(&self) -> Collaborators {
        Collaborators {
            oracle: self.shares.clone(),
            status: self.status.clone(),
            rates: self.rates.clone(),
            transfer: self.transfer.clone(),
        }
    }
}
