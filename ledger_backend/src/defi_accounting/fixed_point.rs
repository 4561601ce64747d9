//! Signed Q64.64 fixed-point accumulator.
//!
//! A [`Q64`] is a real number stored as an `i128` scaled by 2^64. It carries
//! the house's cumulative profit per liquidity share: small per-wager
//! increments add up exactly, and a position's share of the profit is
//! recovered as `shares * (acc - entry) >> 64`.

use candid::CandidType;
use serde::{Deserialize, Serialize};
use std::fmt;

use super::nat_helpers;
use crate::error::LedgerError;

pub const FRACTIONAL_BITS: u32 = 64;

#[derive(CandidType, Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Q64(i128);

impl Q64 {
    pub const ZERO: Q64 = Q64(0);
    pub const ONE: Q64 = Q64(1 << FRACTIONAL_BITS);

    pub const fn from_raw(raw: i128) -> Self {
        Q64(raw)
    }

    pub const fn raw(self) -> i128 {
        self.0
    }

    pub fn from_int(value: i64) -> Self {
        Q64(i128::from(value) << FRACTIONAL_BITS)
    }

    pub fn is_negative(self) -> bool {
        self.0 < 0
    }

    pub fn checked_add(self, rhs: Q64) -> Result<Q64, LedgerError> {
        self.0.checked_add(rhs.0).map(Q64).ok_or(LedgerError::Overflow)
    }

    pub fn checked_sub(self, rhs: Q64) -> Result<Q64, LedgerError> {
        self.0.checked_sub(rhs.0).map(Q64).ok_or(LedgerError::Overflow)
    }

    /// `amount / shares` as Q64.64, rounded toward negative infinity.
    ///
    /// Rounding down means the sum over all shares never exceeds `amount`
    /// for a profit, and never understates a loss.
    pub fn per_share(amount: i128, shares: u128) -> Result<Q64, LedgerError> {
        nat_helpers::shift_div_floor(amount, FRACTIONAL_BITS, shares)
            .map(Q64)
            .ok_or(LedgerError::Overflow)
    }

    /// `shares * self`, shifted back to whole units and rounded toward
    /// negative infinity. The product is formed in 256-bit space so share
    /// counts far beyond 10^20 cannot overflow it.
    pub fn mul_shares(self, shares: u128) -> Result<i128, LedgerError> {
        nat_helpers::mul_shift_floor(shares, self.0, FRACTIONAL_BITS).ok_or(LedgerError::Overflow)
    }

    /// Lossy, for display only.
    pub fn to_f64(self) -> f64 {
        self.0 as f64 / (1u128 << FRACTIONAL_BITS) as f64
    }
}

impl fmt::Display for Q64 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.12}", self.to_f64())
    }
}
