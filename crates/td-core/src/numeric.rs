use crate::{TdError, TdResult};

/// Floating point type used throughout system
pub type Real = f64;

pub fn ensure_finite(v: Real, what: &'static str) -> TdResult<Real> {
    if v.is_finite() {
        Ok(v)
    } else {
        Err(TdError::NonFinite { what, value: v })
    }
}

/// Clamp `v` into `[-limit, limit]`. A negative limit is treated as its magnitude.
pub fn clamp_symmetric(v: Real, limit: Real) -> Real {
    let limit = limit.abs();
    v.clamp(-limit, limit)
}

/// Linear interpolation between `a` and `b` at fraction `t` (not clamped).
pub fn lerp(a: Real, b: Real, t: Real) -> Real {
    a + (b - a) * t
}

/// Fraction of the way `x` lies between `a` and `b`, clamped to `[0, 1]`.
///
/// Degenerate spans (`a == b`) return 1.0 so the newer endpoint wins.
pub fn inverse_lerp(a: Real, b: Real, x: Real) -> Real {
    let span = b - a;
    if span.abs() <= Real::EPSILON {
        return 1.0;
    }
    ((x - a) / span).clamp(0.0, 1.0)
}
