//! # Underscore-Grouped Hex
//!
//! Renders values the way they are written in Rust source and linker scripts:
//! `0x4000_0000`, or zero-padded to 64 bits as `0x0000_0000_4000_0000`.

use core::fmt;

/// [`Display`](fmt::Display) adapter printing a value as underscore-grouped hex.
///
/// ```rust
/// # use kernel_memory_addresses::HexUnderscore;
/// assert_eq!(HexUnderscore::new(0x1_0000).to_string(), "0x1_0000");
/// assert_eq!(
///     HexUnderscore::with_leading_zeros(0x4000_0000).to_string(),
///     "0x0000_0000_4000_0000"
/// );
/// ```
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct HexUnderscore {
    value: u64,
    leading_zeros: bool,
}

impl HexUnderscore {
    #[inline]
    #[must_use]
    pub const fn new(value: u64) -> Self {
        Self {
            value,
            leading_zeros: false,
        }
    }

    #[inline]
    #[must_use]
    pub const fn with_leading_zeros(value: u64) -> Self {
        Self {
            value,
            leading_zeros: true,
        }
    }

    const fn digits(self) -> usize {
        if self.leading_zeros {
            return 16;
        }

        let significant_bits = 64 - self.value.leading_zeros() as usize;
        if significant_bits == 0 {
            1
        } else {
            significant_bits.div_ceil(4)
        }
    }
}

impl fmt::Display for HexUnderscore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        const DIGITS: &[u8; 16] = b"0123456789abcdef";

        let n = self.digits();
        f.write_str("0x")?;
        for i in 0..n {
            if i != 0 && (n - i) % 4 == 0 {
                f.write_str("_")?;
            }

            let shift = (n - 1 - i) * 4;
            let nibble = ((self.value >> shift) & 0xF) as usize;
            fmt::Write::write_char(f, char::from(DIGITS[nibble]))?;
        }

        Ok(())
    }
}
