//! # Fee Pool Core
//!
//! Shared building blocks for the fee pool accounting engine:
//! - `AccountId`, `PeriodId`, `Timestamp` - identifiers used across the ledger
//! - `decimal` - 18-decimal fixed-point arithmetic on `u128` amounts
//! - `FeePoolError` - the error taxonomy surfaced by every entry point
//! - `traits` - the external collaborators the engine consumes
//!
//! ## Collaborators
//!
//! ```text
//!   ┌──────────────────┐   shares / c-ratio   ┌──────────────────────┐
//!   │ DebtShareOracle  │ ───────────────────► │                      │
//!   ├──────────────────┤   suspension flags   │                      │
//!   │ StatusFlags      │ ───────────────────► │   feepool-economics  │
//!   ├──────────────────┤   rate freshness     │                      │
//!   │ ExchangeRates    │ ───────────────────► │                      │
//!   ├──────────────────┤   pay / burn         │                      │
//!   │ ValueTransfer    │ ◄─────────────────── │                      │
//!   └──────────────────┘                      └──────────────────────┘
//! ```

pub mod decimal;
pub mod error;
pub mod traits;
pub mod types;

pub use decimal::{divide_decimal, mul_div, multiply_decimal, UNIT};
pub use error::*;
pub use traits::*;
pub use types::*;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::decimal::{self, UNIT};
    pub use crate::error::{FeePoolError, Result};
    pub use crate::traits::{DebtShareOracle, ExchangeRates, StatusFlags, ValueTransfer};
    pub use crate::types::*;
}
