//! Integer helpers for window and index arithmetic.

/// Converts a non-negative `isize` back to `usize`, saturating negatives to 0.
#[inline]
pub(crate) fn to_usize(value: isize) -> usize {
    if value < 0 {
        0
    } else {
        value as usize
    }
}

/// Rounds half away from zero and clamps into `[0, max]`.
#[inline]
pub(crate) fn round_clamp(value: f32, max: usize) -> usize {
    let rounded = value.round();
    if rounded.is_nan() || rounded <= 0.0 {
        return 0;
    }
    if rounded >= max as f32 {
        return max;
    }
    rounded as usize
}

/// Number of chunks of size `b` needed to cover `a` items.
#[inline]
pub(crate) fn div_up(a: usize, b: usize) -> usize {
    if a == 0 {
        0
    } else {
        (a - 1) / b + 1
    }
}
