//! # Precomputed Kernel Translation Tables
//!
//! AArch64 stage 1 translation tables for the kernel's high address space,
//! built on the host and serialized into the kernel image before it boots.
//!
//! ## What you get
//! - [`TableDescriptor`] / [`PageDescriptor`]: the two 64-bit descriptor
//!   formats in use, as typed bitfields.
//! - [`AttributeFields`]: memory type, access permission and execute-never
//!   for a mapping.
//! - [`MemoryRegion`]: a contiguous run of granule-sized pages.
//! - [`MappingDescriptor`]: a named virtual region, its physical backing and
//!   attributes, plus the [`MappingReportFormat`] used to print them.
//! - [`TranslationTable`]: the level 2 table and its level 3 tables, with
//!   [`map_at`](TranslationTable::map_at) and
//!   [`serialize`](TranslationTable::serialize).
//!
//! ## AArch64 Virtual Address → Physical Address Walk (64 KiB granule)
//!
//! With a 64 KiB granule and `TTBR1_EL1` pointing at a level 2 table, a
//! kernel virtual address, taken relative to the start of the kernel's
//! address space, splits into:
//!
//! ```text
//! | 63‒29 | 28‒16 | 15‒0   |
//! |  L2   |  L3   | Offset |
//! ```
//!
//! ```text
//!  TTBR1_EL1 → L2 table → L3 table → 64 KiB page
//!                 │           │
//!                 │           └───► page descriptor (one per 64 KiB)
//!                 └───────────────► table descriptor (one per 512 MiB)
//! ```
//!
//! | Level | Entries | Span per entry | Entry |
//! |:------|:--------|:---------------|:------|
//! | 2 | one per 512 MiB of address space | 512 MiB | [`TableDescriptor`] |
//! | 3 | 8192 | 64 KiB | [`PageDescriptor`] |
//!
//! ## Serialized Layout
//!
//! ```text
//! tables_phys ─► ┌────────────────────────┐
//!                │ L3 table 0 (64 KiB)    │
//!                ├────────────────────────┤
//!                │ L3 table 1             │
//!                ├────────────────────────┤
//!                │ ...                    │
//!                ├────────────────────────┤ ◄── base address (TTBR1_EL1)
//!                │ L2 table (8 B / entry) │
//!                └────────────────────────┘
//! ```
//!
//! Every descriptor is written as a little-endian `u64`.

#![cfg_attr(not(any(test, doctest)), no_std)]
#![deny(unsafe_code)]

extern crate alloc;

mod attributes;
mod bits;
pub mod descriptors;
mod mapping;
mod region;
mod translation_table;

pub use crate::attributes::{AccessPermissions, AttributeFields, MemoryAttributes};
pub use crate::bits::BitfieldOutOfRange;
pub use crate::descriptors::{
    AccessPermission, DescriptorError, PageDescriptor, PageKind, Shareability, TableDescriptor,
    TableKind,
};
pub use crate::mapping::{
    MappingDescriptor, MappingDivider, MappingHeader, MappingReportFormat, MappingRow,
};
pub use crate::region::{MemoryRegion, Pages, RegionError};
pub use crate::translation_table::{LEVEL3_ENTRIES, TableError, TableLayout, TranslationTable};
