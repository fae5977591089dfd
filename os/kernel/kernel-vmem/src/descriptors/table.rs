//! # Level 2 Table Descriptor
//!
//! A valid level 2 entry with `type = 1` points at a level 3 table. With a
//! 64 KiB granule each such entry covers 512 MiB of the address space.

use crate::bits::{BitfieldOutOfRange, OrOutOfRange};
use bitfield_struct::bitfield;
use kernel_memory_addresses::{PageSize, PhysicalAddress, PhysicalPage, Size64K};

/// Descriptor type bit (bit 1) at level 2.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
#[repr(u8)]
pub enum TableKind {
    /// Maps a 512 MiB block directly. Not used by the kernel tables.
    Block = 0,
    /// Points at a level 3 table.
    Table = 1,
}

impl TableKind {
    #[inline]
    pub const fn into_bits(self) -> u8 {
        self as u8
    }

    #[inline]
    pub const fn from_bits(v: u8) -> Self {
        match v & 0b1 {
            0 => Self::Block,
            _ => Self::Table,
        }
    }
}

/// Level 2 table descriptor.
///
/// - Bit 0: valid
/// - Bit 1: [`TableKind`]
/// - Bits 16..48: next level table address `>> 16`
#[bitfield(u64)]
#[derive(PartialEq, Eq, Hash)]
pub struct TableDescriptor {
    /// Valid (bit 0).
    pub valid: bool,
    /// Descriptor type (bit 1).
    #[bits(1)]
    pub kind: TableKind,
    #[bits(14)]
    __: u16,
    /// Next level table address, bits `[47:16]` (private; use the typed
    /// accessors).
    #[bits(32)]
    next_level_table_addr_bits: u64,
    #[bits(16)]
    __: u16,
}

impl TableDescriptor {
    /// A valid descriptor pointing at the level 3 table at `table`.
    ///
    /// # Errors
    /// [`BitfieldOutOfRange`] if `table` lies above the 48-bit output range.
    pub fn make_table(table: PhysicalPage<Size64K>) -> Result<Self, BitfieldOutOfRange> {
        let mut desc = Self::new();
        desc.set_next_level_table_addr(table)?;
        desc.set_kind(TableKind::Table);
        desc.set_valid(true);
        Ok(desc)
    }

    /// Physical address of the next level table.
    #[inline]
    #[must_use]
    pub const fn next_level_table_addr(&self) -> PhysicalAddress {
        PhysicalAddress::new(self.next_level_table_addr_bits() << Size64K::SHIFT)
    }

    /// Store the address of the next level table.
    ///
    /// # Errors
    /// [`BitfieldOutOfRange`] if the page number does not fit 32 bits.
    pub fn set_next_level_table_addr(
        &mut self,
        table: PhysicalPage<Size64K>,
    ) -> Result<(), BitfieldOutOfRange> {
        let bits = table.number();
        self.set_next_level_table_addr_bits_checked(bits)
            .or_out_of_range("next_level_table_addr", bits)
    }
}
