//! # Mapping Descriptors and the Mapping Report
//!
//! A [`MappingDescriptor`] ties a named virtual region to its physical backing
//! and attributes. While the tables are generated, one line per descriptor is
//! printed:
//!
//! ```text
//!                  Sections          Virt Start Addr         Phys Start Addr       Size      Attr
//!              -----------------------------------------------------------------------------------
//!   Generating .text .rodata | 0xffff_ffff_c000_0000 | 0x0000_0000_0008_0000 | 128 KiB | C RO X
//! ```
//!
//! Column widths depend on the longest name, so [`MappingReportFormat`] is
//! built from the full set of descriptors before any line is printed.

use crate::attributes::AttributeFields;
use crate::region::MemoryRegion;
use alloc::string::String;
use core::fmt;
use kernel_memory_addresses::{HexUnderscore, PhysicalAddress, VirtualAddress};

/// Indentation of every report line; lines up with a right-aligned
/// `Generating` status label.
const INDENT: usize = 13;
const ADDR_COLUMN: usize = 21;
const SHORT_COLUMN: usize = 7;
const NAME_HEADER: &str = "Sections";
/// Divider length after the name column.
const DIVIDER_TAIL: usize = 68;

/// A named mapping to be installed into the translation tables.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MappingDescriptor {
    /// Space-separated names of the sections covered by the mapping.
    pub name: String,
    pub virt_region: MemoryRegion<VirtualAddress>,
    pub phys_region: MemoryRegion<PhysicalAddress>,
    pub attributes: AttributeFields,
}

impl MappingDescriptor {
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        virt_region: MemoryRegion<VirtualAddress>,
        phys_region: MemoryRegion<PhysicalAddress>,
        attributes: AttributeFields,
    ) -> Self {
        Self {
            name: name.into(),
            virt_region,
            phys_region,
            attributes,
        }
    }

    /// Size of the mapping in KiB.
    #[inline]
    #[must_use]
    pub const fn size_kib(&self) -> u64 {
        self.virt_region.size() / 1024
    }
}

/// Column layout of the mapping report.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct MappingReportFormat {
    name_width: usize,
}

impl MappingReportFormat {
    /// Size the name column to fit every descriptor's name, and at least the
    /// `Sections` header.
    pub fn for_descriptors<'a, I>(descriptors: I) -> Self
    where
        I: IntoIterator<Item = &'a MappingDescriptor>,
    {
        let name_width = descriptors
            .into_iter()
            .map(|d| d.name.chars().count())
            .fold(NAME_HEADER.len(), usize::max);
        Self { name_width }
    }

    #[inline]
    #[must_use]
    pub const fn name_width(&self) -> usize {
        self.name_width
    }

    /// The column header line.
    #[must_use]
    pub const fn header(&self) -> MappingHeader {
        MappingHeader { format: *self }
    }

    /// The dashed line around the header.
    #[must_use]
    pub const fn divider(&self) -> MappingDivider {
        MappingDivider { format: *self }
    }

    /// The report line for one descriptor, without the status label.
    #[must_use]
    pub const fn row<'a>(&self, descriptor: &'a MappingDescriptor) -> MappingRow<'a> {
        MappingRow {
            format: *self,
            descriptor,
        }
    }
}

/// See [`MappingReportFormat::header`].
#[derive(Copy, Clone, Debug)]
pub struct MappingHeader {
    format: MappingReportFormat,
}

impl fmt::Display for MappingHeader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:INDENT$}{NAME_HEADER:^name$}   {:^ADDR_COLUMN$}   {:^ADDR_COLUMN$}   {:^SHORT_COLUMN$}   {:^SHORT_COLUMN$}",
            "",
            "Virt Start Addr",
            "Phys Start Addr",
            "Size",
            "Attr",
            name = self.format.name_width,
        )
    }
}

/// See [`MappingReportFormat::divider`].
#[derive(Copy, Clone, Debug)]
pub struct MappingDivider {
    format: MappingReportFormat,
}

impl fmt::Display for MappingDivider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:INDENT$}{:-<width$}",
            "",
            "",
            width = self.format.name_width + DIVIDER_TAIL
        )
    }
}

/// See [`MappingReportFormat::row`].
#[derive(Copy, Clone, Debug)]
pub struct MappingRow<'a> {
    format: MappingReportFormat,
    descriptor: &'a MappingDescriptor,
}

impl fmt::Display for MappingRow<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let d = self.descriptor;
        write!(
            f,
            "{:<name$} | {} | {} | {:>3} KiB | {}",
            d.name,
            HexUnderscore::with_leading_zeros(d.virt_region.start().as_u64()),
            HexUnderscore::with_leading_zeros(d.phys_region.start().as_u64()),
            d.size_kib(),
            d.attributes,
            name = self.format.name_width,
        )
    }
}
