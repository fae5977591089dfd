//! # Kernel Address Types
//!
//! Zero-cost wrappers that keep virtual and physical addresses apart, plus the
//! translation sizes and integer helpers the AArch64 table code is built on.
//!
//! | Item | Description |
//! |------|-------------|
//! | [`VirtualAddress`] | Link address in the kernel's half of the address space. |
//! | [`PhysicalAddress`] | Load address, DRAM or MMIO. |
//! | [`PhysicalPage<S>`] | Page-aligned physical base for a [`PageSize`] `S`. |
//! | [`HexUnderscore`] | `0x0000_0000_0008_0000` style formatting for reports. |
//!
//! ## Translation Sizes
//!
//! The kernel runs a 64 KiB granule with two translation levels in use:
//!
//! - [`Size64K`]: one level 3 page
//! - [`Size512M`]: the span of one level 2 entry
//!
//! ```rust
//! # use kernel_memory_addresses::*;
//! assert_eq!(align_up(0x1_2345, Size64K::SIZE), Ok(0x2_0000));
//! let pp = PhysicalPage::<Size64K>::from_addr(PhysicalAddress::new(0x8_1234));
//! assert_eq!(pp.base(), PhysicalAddress::new(0x8_0000));
//! ```

#![cfg_attr(not(any(test, doctest)), no_std)]

mod address;
pub mod align;
mod hex;
mod page;
mod page_size;

pub use crate::address::{PhysicalAddress, VirtualAddress};
pub use crate::align::{AlignmentError, align_up, is_aligned, is_power_of_two};
pub use crate::hex::HexUnderscore;
pub use crate::page::PhysicalPage;
pub use crate::page_size::{PageSize, Size512M, Size64K};
