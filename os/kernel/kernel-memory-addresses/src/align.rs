//! # Alignment Helpers
//!
//! Free functions over plain `u64` values. The alignment argument must be a
//! power of two; anything else is rejected with [`AlignmentError`].

/// Error returned when an alignment argument is not a power of two.
#[derive(Debug, Copy, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AlignmentError {
    #[error("alignment {0:#x} is not a power of two")]
    NotPowerOfTwo(u64),
}

/// Returns `true` if `n` is a power of two.
///
/// Zero is not a power of two.
#[inline]
#[must_use]
pub const fn is_power_of_two(n: u64) -> bool {
    n.is_power_of_two()
}

/// Returns whether `n` is a multiple of `alignment`.
///
/// # Errors
/// [`AlignmentError::NotPowerOfTwo`] if `alignment` is not a power of two.
#[inline]
pub const fn is_aligned(n: u64, alignment: u64) -> Result<bool, AlignmentError> {
    if !is_power_of_two(alignment) {
        return Err(AlignmentError::NotPowerOfTwo(alignment));
    }

    Ok(n & (alignment - 1) == 0)
}

/// Rounds `n` up to the next multiple of `alignment`.
///
/// Values that are already aligned are returned unchanged. Wraps on overflow
/// past `u64::MAX`; callers work with addresses well below that.
///
/// # Errors
/// [`AlignmentError::NotPowerOfTwo`] if `alignment` is not a power of two.
#[inline]
pub const fn align_up(n: u64, alignment: u64) -> Result<u64, AlignmentError> {
    if !is_power_of_two(alignment) {
        return Err(AlignmentError::NotPowerOfTwo(alignment));
    }

    Ok(n.wrapping_add(alignment - 1) & !(alignment - 1))
}
