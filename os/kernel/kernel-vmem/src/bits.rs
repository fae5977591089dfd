//! # Bitfield Range Checks
//!
//! Descriptor fields are declared with [`bitfield_struct`], whose
//! `set_<field>_checked` setters refuse values wider than the field but only
//! report `Err(())`. This module names the field and value instead.

/// A value does not fit the bit width of the descriptor field it was written to.
#[derive(Debug, Copy, Clone, PartialEq, Eq, thiserror::Error)]
#[error("input out of range: {field} = {value:#x}")]
pub struct BitfieldOutOfRange {
    /// Name of the descriptor field.
    pub field: &'static str,
    /// The rejected value.
    pub value: u64,
}

/// Attach field context to the result of a checked bitfield setter.
pub(crate) trait OrOutOfRange {
    fn or_out_of_range(self, field: &'static str, value: u64) -> Result<(), BitfieldOutOfRange>;
}

impl OrOutOfRange for Result<(), ()> {
    #[inline]
    fn or_out_of_range(self, field: &'static str, value: u64) -> Result<(), BitfieldOutOfRange> {
        self.map_err(|()| BitfieldOutOfRange { field, value })
    }
}
