//! # Claim Gate
//!
//! Composable preconditions evaluated before a close or claim mutates
//! anything. Each check maps to one distinct error so callers know what to
//! wait for before retrying.
//!
//! | Check | Close | Claim | Error |
//! |-------|-------|-------|-------|
//! | System suspended | yes | yes | `OperationProhibited` |
//! | Issuance suspended | yes | yes | `OperationProhibited` |
//! | Stale or invalid rates | yes | yes | `InvalidRate` |
//! | C-ratio past penalty threshold | no | yes | `BelowPenaltyThreshold` |

use crate::config::GateConfig;
use feepool_core::decimal::{checked_add, multiply_decimal};
use feepool_core::{
    AccountId, CurrencyKey, DebtShareOracle, ExchangeRates, FeePoolError, Result, Section,
    StatusFlags, Timestamp, UNIT,
};
use tracing::warn;

/// Key reported when the debt oracle flags its own inputs invalid
pub const DEBT_RATIO_KEY: &str = "debt-ratio";

/// Everything a precondition may read
pub struct GateContext<'a> {
    pub oracle: &'a dyn DebtShareOracle,
    pub status: &'a dyn StatusFlags,
    pub rates: &'a dyn ExchangeRates,
    pub params: &'a GateConfig,
    /// Claimant, `None` for closes
    pub account: Option<&'a AccountId>,
    pub now: Timestamp,
}

/// A single gate condition
pub trait Precondition: Send + Sync {
    fn name(&self) -> &'static str;

    fn check(&self, ctx: &GateContext<'_>) -> Result<()>;
}

/// Fails while a section is suspended
pub struct SuspensionCheck {
    pub section: Section,
}

impl Precondition for SuspensionCheck {
    fn name(&self) -> &'static str {
        match self.section {
            Section::System => "system-active",
            Section::Issuance => "issuance-active",
        }
    }

    fn check(&self, ctx: &GateContext<'_>) -> Result<()> {
        if ctx.status.is_suspended(self.section) {
            return Err(FeePoolError::OperationProhibited {
                section: self.section,
            });
        }
        Ok(())
    }
}

/// Fails when a required rate is missing or older than the stale period,
/// or when the debt oracle reports an invalid input for the claimant
pub struct StalenessCheck;

impl StalenessCheck {
    fn is_stale(updated_at: Option<Timestamp>, now: Timestamp, stale_period: u64) -> bool {
        match updated_at {
            None => true,
            Some(t) => now.saturating_sub(t) > i64::try_from(stale_period).unwrap_or(i64::MAX),
        }
    }
}

impl Precondition for StalenessCheck {
    fn name(&self) -> &'static str {
        "rates-fresh"
    }

    fn check(&self, ctx: &GateContext<'_>) -> Result<()> {
        for key in &ctx.params.required_rates {
            let updated_at = ctx.rates.last_updated(key);
            if Self::is_stale(updated_at, ctx.now, ctx.params.rate_stale_period) {
                return Err(FeePoolError::InvalidRate { key: key.clone() });
            }
        }
        if let Some(account) = ctx.account {
            let (_, any_rate_invalid) = ctx.oracle.collateralisation_ratio(account);
            if any_rate_invalid {
                return Err(FeePoolError::InvalidRate {
                    key: CurrencyKey::new(DEBT_RATIO_KEY),
                });
            }
        }
        Ok(())
    }
}

/// Blocks claims while the claimant's live ratio exceeds
/// `issuance_ratio * (1 + target_threshold)`. Entitlement is untouched.
pub struct PenaltyThresholdCheck;

impl Precondition for PenaltyThresholdCheck {
    fn name(&self) -> &'static str {
        "penalty-threshold"
    }

    fn check(&self, ctx: &GateContext<'_>) -> Result<()> {
        let Some(account) = ctx.account else {
            return Ok(());
        };
        let (ratio, _) = ctx.oracle.collateralisation_ratio(account);
        let threshold = penalty_threshold(ctx.params)?;
        if ratio > threshold {
            return Err(FeePoolError::BelowPenaltyThreshold { ratio, threshold });
        }
        Ok(())
    }
}

/// `issuance_ratio * (1 + target_threshold)` in 18-decimal
pub fn penalty_threshold(params: &GateConfig) -> Result<u128> {
    let buffer = checked_add(UNIT, params.target_threshold as u128)?;
    multiply_decimal(params.issuance_ratio as u128, buffer)
}

/// Whether a ratio is inside the claimable band
pub fn is_ratio_claimable(ratio: u128, params: &GateConfig) -> Result<bool> {
    if ratio < params.issuance_ratio as u128 {
        return Ok(true);
    }
    Ok(ratio <= penalty_threshold(params)?)
}

/// Ordered chain of preconditions; the first failure wins
#[derive(Default)]
pub struct ClaimGate {
    checks: Vec<Box<dyn Precondition>>,
}

impl ClaimGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a precondition
    pub fn with(mut self, check: impl Precondition + 'static) -> Self {
        self.checks.push(Box::new(check));
        self
    }

    /// Chain used before closing a period
    pub fn for_close() -> Self {
        Self::new()
            .with(SuspensionCheck {
                section: Section::System,
            })
            .with(SuspensionCheck {
                section: Section::Issuance,
            })
            .with(StalenessCheck)
    }

    /// Chain used before a claim
    pub fn for_claim() -> Self {
        Self::for_close().with(PenaltyThresholdCheck)
    }

    /// Chain used by the relayer close: suspension only
    pub fn for_relayed_close() -> Self {
        Self::new()
            .with(SuspensionCheck {
                section: Section::System,
            })
            .with(SuspensionCheck {
                section: Section::Issuance,
            })
    }

    pub fn check_names(&self) -> Vec<&'static str> {
        self.checks.iter().map(|c| c.name()).collect()
    }

    pub fn evaluate(&self, ctx: &GateContext<'_>) -> Result<()> {
        for check in &self.checks {
            if let Err(err) = check.check(ctx) {
                warn!(
                    check = check.name(),
                    account = ?ctx.account,
                    error = %err,
                    "gate rejected"
                );
                return Err(err);
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{InMemoryDebtShares, InMemoryRates, InMemoryStatus};

    const NOW: Timestamp = 1_000_000;

    fn fixtures() -> (InMemoryDebtShares, InMemoryStatus, InMemoryRates, GateConfig) {
        let rates = InMemoryRates::new();
        rates.set_last_updated("SNX", NOW);
        (
            InMemoryDebtShares::new(),
            InMemoryStatus::new(),
            rates,
            GateConfig::default(),
        )
    }

    fn ctx<'a>(
        oracle: &'a InMemoryDebtShares,
        status: &'a InMemoryStatus,
        rates: &'a InMemoryRates,
        params: &'a GateConfig,
        account: Option<&'a AccountId>,
    ) -> GateContext<'a> {
        GateContext {
            oracle,
            status,
            rates,
            params,
            account,
            now: NOW,
        }
    }

    #[test]
    fn test_penalty_threshold_value() {
        let params = GateConfig::default();
        // 0.2 * 1.1
        assert_eq!(penalty_threshold(&params).unwrap(), 220_000_000_000_000_000);
        assert!(is_ratio_claimable(210_000_000_000_000_000, &params).unwrap());
        assert!(!is_ratio_claimable(230_000_000_000_000_000, &params).unwrap());
    }

    #[test]
    fn test_open_gate_passes() {
        let (oracle, status, rates, params) = fixtures();
        let account = AccountId::new([1u8; 32]);
        let gate = ClaimGate::for_claim();
        assert!(gate
            .evaluate(&ctx(&oracle, &status, &rates, &params, Some(&account)))
            .is_ok());
        assert_eq!(
            gate.check_names(),
            vec!["system-active", "issuance-active", "rates-fresh", "penalty-threshold"]
        );
    }

    #[test]
    fn test_suspension_blocks() {
        let (oracle, status, rates, params) = fixtures();
        status.suspend(Section::Issuance);
        let err = ClaimGate::for_close()
            .evaluate(&ctx(&oracle, &status, &rates, &params, None))
            .unwrap_err();
        assert_eq!(
            err,
            FeePoolError::OperationProhibited {
                section: Section::Issuance
            }
        );
    }

    #[test]
    fn test_stale_rate_blocks() {
        let (oracle, status, rates, params) = fixtures();
        rates.set_last_updated("SNX", NOW - params.rate_stale_period as i64 - 1);
        let err = ClaimGate::for_close()
            .evaluate(&ctx(&oracle, &status, &rates, &params, None))
            .unwrap_err();
        assert!(matches!(err, FeePoolError::InvalidRate { .. }));
    }

    #[test]
    fn test_rate_exactly_at_stale_period_passes() {
        let (oracle, status, rates, params) = fixtures();
        rates.set_last_updated("SNX", NOW - params.rate_stale_period as i64);
        assert!(ClaimGate::for_close()
            .evaluate(&ctx(&oracle, &status, &rates, &params, None))
            .is_ok());
    }

    #[test]
    fn test_unbounded_stale_period_accepts_fresh_rate() {
        let (oracle, status, rates, mut params) = fixtures();
        params.rate_stale_period = u64::MAX;
        assert!(ClaimGate::for_close()
            .evaluate(&ctx(&oracle, &status, &rates, &params, None))
            .is_ok());

        rates.set_last_updated("SNX", i64::MIN);
        assert!(ClaimGate::for_close()
            .evaluate(&ctx(&oracle, &status, &rates, &params, None))
            .is_ok());
    }

    #[test]
    fn test_missing_rate_blocks() {
        let (oracle, status, _, params) = fixtures();
        let empty = InMemoryRates::new();
        assert!(matches!(
            ClaimGate::for_close().evaluate(&ctx(&oracle, &status, &empty, &params, None)),
            Err(FeePoolError::InvalidRate { .. })
        ));
    }

    #[test]
    fn test_invalid_debt_inputs_block_claim() {
        let (oracle, status, rates, params) = fixtures();
        let account = AccountId::new([1u8; 32]);
        oracle.set_rates_invalid(true);
        let err = ClaimGate::for_claim()
            .evaluate(&ctx(&oracle, &status, &rates, &params, Some(&account)))
            .unwrap_err();
        assert_eq!(
            err,
            FeePoolError::InvalidRate {
                key: CurrencyKey::new(DEBT_RATIO_KEY)
            }
        );
    }

    #[test]
    fn test_penalty_threshold_blocks_claim_only() {
        let (oracle, status, rates, params) = fixtures();
        let account = AccountId::new([1u8; 32]);
        oracle.set_collateralisation_ratio(account, 300_000_000_000_000_000);

        let claim = ClaimGate::for_claim()
            .evaluate(&ctx(&oracle, &status, &rates, &params, Some(&account)));
        assert!(matches!(
            claim,
            Err(FeePoolError::BelowPenaltyThreshold { .. })
        ));

        let close = ClaimGate::for_close()
            .evaluate(&ctx(&oracle, &status, &rates, &params, Some(&account)));
        assert!(close.is_ok());
    }

    #[test]
    fn test_first_failure_wins() {
        let (oracle, status, rates, params) = fixtures();
        let account = AccountId::new([1u8; 32]);
        status.suspend(Section::System);
        oracle.set_collateralisation_ratio(account, UNIT);
        let err = ClaimGate::for_claim()
            .evaluate(&ctx(&oracle, &status, &rates, &params, Some(&account)))
            .unwrap_err();
        assert_eq!(
            err,
            FeePoolError::OperationProhibited {
                section: Section::System
            }
        );
    }
}
