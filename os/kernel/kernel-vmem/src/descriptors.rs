//! # Stage 1 Descriptors (64 KiB granule)
//!
//! The two descriptor formats the kernel's tables use:
//!
//! - [`TableDescriptor`]: a level 2 entry pointing at a level 3 table.
//! - [`PageDescriptor`]: a level 3 entry mapping one 64 KiB page.
//!
//! Both are `u64` bitfields. Address fields hold the address shifted right by
//! the granule shift; the typed setters take a [`PhysicalPage`] and do the
//! shift themselves, so callers never handle raw field values.
//!
//! [`PhysicalPage`]: kernel_memory_addresses::PhysicalPage

mod page;
mod table;

use crate::attributes::MemoryAttributes;
use crate::bits::BitfieldOutOfRange;

pub use page::{AccessPermission, PageDescriptor, PageKind, Shareability};
pub use table::{TableDescriptor, TableKind};

/// `MAIR_EL1` attribute slots as programmed by the kernel's MMU setup.
/// Slot 0 holds device memory, which the tables never map.
pub mod mair {
    /// Normal memory, write-back read/write-allocate.
    pub const NORMAL: u8 = 1;
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DescriptorError {
    #[error(transparent)]
    OutOfRange(#[from] BitfieldOutOfRange),
    #[error("memory attributes {0:?} cannot be encoded in a kernel page descriptor")]
    InvalidAttribute(MemoryAttributes),
}
