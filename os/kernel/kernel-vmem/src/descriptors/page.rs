//! # Level 3 Page Descriptor
//!
//! Maps one 64 KiB page. Besides the output address it carries the memory
//! type (as an index into `MAIR_EL1`), shareability, access permissions, the
//! access flag and the two execute-never bits.
//!
//! ## Notes
//!
//! - The access flag must be set; otherwise the first access faults.
//! - `UXN` is always set for kernel mappings: EL0 never executes from the
//!   kernel's half of the address space.

use crate::attributes::{AccessPermissions, AttributeFields, MemoryAttributes};
use crate::bits::{BitfieldOutOfRange, OrOutOfRange};
use crate::descriptors::{DescriptorError, mair};
use bitfield_struct::bitfield;
use kernel_memory_addresses::{PageSize, PhysicalAddress, PhysicalPage, Size64K};

/// Descriptor type bit (bit 1) at level 3.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
#[repr(u8)]
pub enum PageKind {
    /// Behaves like an invalid descriptor.
    Reserved = 0,
    Page = 1,
}

impl PageKind {
    #[inline]
    pub const fn into_bits(self) -> u8 {
        self as u8
    }

    #[inline]
    pub const fn from_bits(v: u8) -> Self {
        match v & 0b1 {
            0 => Self::Reserved,
            _ => Self::Page,
        }
    }
}

/// Data access permissions, `AP[2:1]` (bits 6..8).
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
#[repr(u8)]
pub enum AccessPermission {
    RwEl1 = 0b00,
    RwEl1El0 = 0b01,
    RoEl1 = 0b10,
    RoEl1El0 = 0b11,
}

impl AccessPermission {
    #[inline]
    pub const fn into_bits(self) -> u8 {
        self as u8
    }

    #[inline]
    pub const fn from_bits(v: u8) -> Self {
        match v & 0b11 {
            0b00 => Self::RwEl1,
            0b01 => Self::RwEl1El0,
            0b10 => Self::RoEl1,
            _ => Self::RoEl1El0,
        }
    }
}

/// Shareability, `SH[1:0]` (bits 8..10).
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
#[repr(u8)]
pub enum Shareability {
    NonShareable = 0b00,
    /// Reserved encoding; behaves as non-shareable on most cores.
    Unpredictable = 0b01,
    OuterShareable = 0b10,
    InnerShareable = 0b11,
}

impl Shareability {
    #[inline]
    pub const fn into_bits(self) -> u8 {
        self as u8
    }

    #[inline]
    pub const fn from_bits(v: u8) -> Self {
        match v & 0b11 {
            0b00 => Self::NonShareable,
            0b01 => Self::Unpredictable,
            0b10 => Self::OuterShareable,
            _ => Self::InnerShareable,
        }
    }
}

/// Level 3 page descriptor (64 KiB granule).
#[bitfield(u64)]
#[derive(PartialEq, Eq, Hash)]
pub struct PageDescriptor {
    /// Valid (bit 0).
    pub valid: bool,
    /// Descriptor type (bit 1): must be [`PageKind::Page`] for a mapping.
    #[bits(1)]
    pub kind: PageKind,
    /// `AttrIndx[2:0]` (bits 2..5), selects a `MAIR_EL1` slot.
    #[bits(3)]
    attr_indx_bits: u8,
    /// Non-secure (bit 5).
    pub ns: bool,
    /// `AP[2:1]` (bits 6..8).
    #[bits(2)]
    pub access_permission: AccessPermission,
    /// `SH[1:0]` (bits 8..10).
    #[bits(2)]
    pub shareability: Shareability,
    /// Access flag (bit 10).
    pub access_flag: bool,
    /// Not global (bit 11).
    pub not_global: bool,
    #[bits(4)]
    __: u8,
    /// Output address, bits `[47:16]`.
    #[bits(32)]
    output_addr_bits: u64,
    #[bits(5)]
    __: u8,
    /// Privileged execute-never (bit 53).
    pub pxn: bool,
    /// Unprivileged execute-never (bit 54).
    pub uxn: bool,
    #[bits(9)]
    __: u16,
}

impl PageDescriptor {
    /// A valid, accessed page descriptor mapping `page` with `attributes`.
    ///
    /// # Errors
    /// - [`DescriptorError::OutOfRange`] if `page` lies above the 48-bit
    ///   output range.
    /// - [`DescriptorError::InvalidAttribute`] if the memory type has no
    ///   encoding (see [`set_attributes`](Self::set_attributes)).
    pub fn make_page(
        page: PhysicalPage<Size64K>,
        attributes: &AttributeFields,
    ) -> Result<Self, DescriptorError> {
        let mut desc = Self::new();
        desc.set_output_addr(page)?;
        desc.set_access_flag(true);
        desc.set_kind(PageKind::Page);
        desc.set_valid(true);
        desc.set_attributes(attributes)?;
        Ok(desc)
    }

    /// `MAIR_EL1` slot this page uses.
    #[inline]
    #[must_use]
    pub const fn attr_indx(&self) -> u8 {
        self.attr_indx_bits()
    }

    /// # Errors
    /// [`BitfieldOutOfRange`] if `index` does not fit 3 bits.
    pub fn set_attr_indx(&mut self, index: u8) -> Result<(), BitfieldOutOfRange> {
        self.set_attr_indx_bits_checked(index)
            .or_out_of_range("attr_indx", u64::from(index))
    }

    /// Physical address of the mapped page.
    #[inline]
    #[must_use]
    pub const fn output_addr(&self) -> PhysicalAddress {
        PhysicalAddress::new(self.output_addr_bits() << Size64K::SHIFT)
    }

    /// # Errors
    /// [`BitfieldOutOfRange`] if the page number does not fit 32 bits.
    pub fn set_output_addr(&mut self, page: PhysicalPage<Size64K>) -> Result<(), BitfieldOutOfRange> {
        let bits = page.number();
        self.set_output_addr_bits_checked(bits)
            .or_out_of_range("output_addr", bits)
    }

    /// Translate mapping attributes into descriptor fields.
    ///
    /// Cacheable DRAM becomes inner shareable, [`mair::NORMAL`]. `PXN` follows
    /// `execute_never`; `UXN` is always set.
    ///
    /// # Errors
    /// [`DescriptorError::InvalidAttribute`] for [`MemoryAttributes::Device`].
    pub fn set_attributes(&mut self, attributes: &AttributeFields) -> Result<(), DescriptorError> {
        match attributes.mem_attributes {
            MemoryAttributes::CacheableDram => {
                self.set_shareability(Shareability::InnerShareable);
                self.set_attr_indx(mair::NORMAL)?;
            }
            other @ MemoryAttributes::Device => {
                return Err(DescriptorError::InvalidAttribute(other));
            }
        }

        self.set_access_permission(match attributes.acc_perms {
            AccessPermissions::ReadOnly => AccessPermission::RoEl1,
            AccessPermissions::ReadWrite => AccessPermission::RwEl1,
        });
        self.set_pxn(attributes.execute_never);
        self.set_uxn(true);
        Ok(())
    }
}
