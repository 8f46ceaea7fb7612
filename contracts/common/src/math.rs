//! Integer square roots and overflow-checked fixed-point helpers for the
//! quadratic matching formula.
//!
//! Matching weight is "sum of square roots, squared". Square roots of token
//! amounts are irrational in general, so the engine works on amounts scaled by
//! `SQRT_PRECISION^2` before taking the root. The root then carries
//! `SQRT_PRECISION` fixed-point digits: for a perfect square `a`,
//! `scaled_sqrt(a) == isqrt(a) * SQRT_PRECISION` exactly. Squaring a scaled
//! root and dividing by `SQRT_PRECISION^2` recovers token-native precision.
//!
//! All helpers are overflow-checked; callers map `None` to their own
//! arithmetic-overflow error. This is financial code and must never wrap.

/// Fixed-point factor carried by scaled square roots.
pub const SQRT_PRECISION: i128 = 1_000_000_000;

/// Floor of the square root of a non-negative integer.
///
/// Newton's method on integers; converges to the exact floor root, never an
/// approximation. Panics on negative input (ledger amounts are never negative
/// by the time they reach this function).
pub fn isqrt(value: i128) -> i128 {
    assert!(value >= 0, "isqrt of negative value");
    if value < 2 {
        return value;
    }
    let mut x = value;
    let mut y = (x + 1) / 2;
    while y < x {
        x = y;
        y = (x + value / x) / 2;
    }
    x
}

/// Square root of `amount` carrying `SQRT_PRECISION` fixed-point digits.
///
/// Returns `None` if scaling `amount` by `SQRT_PRECISION^2` overflows `i128`.
pub fn scaled_sqrt(amount: i128) -> Option<i128> {
    let scaled = amount
        .checked_mul(SQRT_PRECISION)?
        .checked_mul(SQRT_PRECISION)?;
    Some(isqrt(scaled))
}

/// Floor of `a * b / d`, or `None` on overflow or `d == 0`.
pub fn mul_div_floor(a: i128, b: i128, d: i128) -> Option<i128> {
    if d == 0 {
        return None;
    }
    a.checked_mul(b)?.checked_div(d)
}
