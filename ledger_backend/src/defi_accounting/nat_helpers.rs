// Wide integer helpers backed by num-bigint.
// Products are formed exactly before any division or shift, so only the final
// narrowing back to a machine integer can fail. Every quotient rounds DOWN
// (toward negative infinity), which always favours the vault.
use num_bigint::{BigInt, BigUint};
use num_traits::{One, Signed, ToPrimitive, Zero};

pub fn big_zero() -> BigInt {
    BigInt::zero()
}

// Floor division for a strictly positive denominator.
// BigInt `/` truncates toward zero, so negative numerators need one step down.
pub fn div_floor(numerator: &BigInt, denominator: &BigInt) -> Option<BigInt> {
    if !denominator.is_positive() {
        return None;
    }
    let quotient = numerator / denominator;
    if numerator.is_negative() && &(&quotient * denominator) != numerator {
        Some(quotient - BigInt::one())
    } else {
        Some(quotient)
    }
}

// (a * b) / c, rounded down. None on c == 0 or if the result exceeds u128.
pub fn mul_div_floor(a: u128, b: u128, c: u128) -> Option<u128> {
    if c == 0 {
        return None;
    }
    let product = BigUint::from(a) * BigUint::from(b);
    (product / BigUint::from(c)).to_u128()
}

// (a * q) >> shift for an unsigned count and a signed fixed-point value,
// rounded down. None if the result does not fit in i128.
pub fn mul_shift_floor(a: u128, q: i128, shift: u32) -> Option<i128> {
    let product = BigInt::from(a) * BigInt::from(q);
    let scale = BigInt::one() << shift;
    div_floor(&product, &scale)?.to_i128()
}

// (amount << shift) / divisor, rounded down. None on a zero divisor or if
// the result does not fit in i128.
pub fn shift_div_floor(amount: i128, shift: u32, divisor: u128) -> Option<i128> {
    let numerator = BigInt::from(amount) << shift;
    div_floor(&numerator, &BigInt::from(divisor))?.to_i128()
}

// Checkpoint for a merged position: the value `e` such that
// `new_shares * (acc - e)` never exceeds `old_shares * (acc - old_entry)`.
// The pending profit of the old shares carries over, rounded toward the vault.
pub fn merged_entry(acc: i128, old_entry: i128, old_shares: u128, new_shares: u128) -> Option<i128> {
    if new_shares == 0 {
        return None;
    }
    let pending = BigInt::from(old_shares) * (BigInt::from(acc) - BigInt::from(old_entry));
    let pending_per_share = div_floor(&pending, &BigInt::from(new_shares))?;
    (BigInt::from(acc) - pending_per_share).to_i128()
}

// Signed sum of u64 amounts that can never overflow i128
pub fn signed_delta(now: u64, before: u64) -> i128 {
    i128::from(now) - i128::from(before)
}
