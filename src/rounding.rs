//! Two-decimal rounding compatible with the ledger values already stored
//! by the backend.
//!
//! Historical accrual entries were produced by formatting a binary double
//! with two fraction digits and parsing it back. The exact binary value is
//! what gets rounded, so `1.005` (stored as `1.00499999...`) becomes `1.0`,
//! while values that are exact ties in binary (`0.125`, `2.375`, ...) round
//! away from zero.

/// Round `x` to two decimal places.
pub fn round2(x: f64) -> f64 {
    if !x.is_finite() {
        return x;
    }
    let scaled = x * 100.0;
    // `mul_add` yields the exact residual of the multiplication, so a zero
    // here means `scaled` is the true product and the half is a real tie.
    let exact = x.mul_add(100.0, -scaled) == 0.0;
    if exact && (scaled - scaled.trunc()).abs() == 0.5 {
        return (scaled.trunc() + scaled.signum()) / 100.0;
    }
    format!("{x:.2}").parse().unwrap_or(x)
}
