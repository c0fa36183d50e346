//! Human-readable rendering of token amounts.
//!
//! Requirements state prices in the asset's smallest unit. For display the
//! buyer converts those into whole tokens, e.g. `10000` USDC units render as
//! `0.01`. Settlement never uses this value.
//!
//! ```rust
//! use alloy_primitives::U256;
//! use x402_types::util::money_amount::MoneyAmount;
//!
//! let amount = MoneyAmount::from_token_units(U256::from(1_250_000u64), 6).unwrap();
//! assert_eq!(amount.to_string(), "1.25");
//! ```

use alloy_primitives::U256;
use rust_decimal::Decimal;
use serde::{Serialize, Serializer};
use std::fmt;
use std::fmt::Display;

/// A non-negative decimal amount of whole tokens.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MoneyAmount(pub Decimal);

impl MoneyAmount {
    /// Converts `units` of a token with `decimals` decimals into whole tokens.
    ///
    /// Returns `None` when the value does not fit a 96-bit decimal mantissa or
    /// `decimals` exceeds the decimal scale limit of 28.
    pub fn from_token_units(units: U256, decimals: u32) -> Option<Self> {
        let units: u128 = units.try_into().ok()?;
        let units = i128::try_from(units).ok()?;
        let decimal = Decimal::try_from_i128_with_scale(units, decimals).ok()?;
        Some(MoneyAmount(decimal.normalize()))
    }

    /// Returns the number of decimal places after normalization.
    pub fn scale(&self) -> u32 {
        self.0.scale()
    }

    pub fn inner(&self) -> Decimal {
        self.0
    }
}

impl Display for MoneyAmount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Serialize for MoneyAmount {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0.to_string())
    }
}
