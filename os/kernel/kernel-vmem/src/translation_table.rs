//! # Kernel Translation Table
//!
//! The level 2 table and its level 3 tables, held in host memory and laid out
//! exactly as they will sit at `tables_phys` once the kernel is loaded:
//!
//! - Level 3 table `i` starts at `tables_phys + i * 64 KiB`.
//! - The level 2 table follows the last level 3 table. Its address is the
//!   translation table base address the kernel loads into `TTBR1_EL1`.
//!
//! Entry `i` of the level 2 table always points at level 3 table `i`, so the
//! level 2 table is complete from construction on; mapping only touches
//! level 3 entries.
//!
//! ## Indexing
//!
//! For a page at `va`, with `offset = va - virt_start`:
//!
//! - level 2 index: `offset >> 29`
//! - level 3 index: `(offset & 0x1FFF_FFFF) >> 16`

use crate::attributes::AttributeFields;
use crate::descriptors::{DescriptorError, PageDescriptor, TableDescriptor};
use crate::mapping::MappingDescriptor;
use crate::region::MemoryRegion;
use alloc::boxed::Box;
use alloc::vec;
use alloc::vec::Vec;
use kernel_info::memory::KERNEL_GRANULE_SIZE;
use kernel_memory_addresses::{
    HexUnderscore, PageSize, PhysicalAddress, PhysicalPage, Size512M, Size64K, VirtualAddress,
};
use log::{debug, trace};

/// Entries per level 3 table: one 64 KiB table of 8-byte descriptors.
pub const LEVEL3_ENTRIES: usize = 8192;

/// Bytes per serialized descriptor.
const DESCRIPTOR_SIZE: usize = core::mem::size_of::<u64>();

const _: () = {
    assert!(LEVEL3_ENTRIES as u64 * Size64K::SIZE == Size512M::SIZE);
    assert!(LEVEL3_ENTRIES * DESCRIPTOR_SIZE == Size64K::SIZE as usize);
    assert!(KERNEL_GRANULE_SIZE == Size64K::SIZE);
};

/// Where the tables live and what they have to cover.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct TableLayout {
    /// Translation granule in bytes; must be 64 KiB.
    pub granule: u64,
    /// Size of the kernel's virtual address space; a non-zero multiple of 512 MiB.
    pub virt_addr_space_size: u64,
    /// First virtual address translated by the tables.
    pub virt_start: VirtualAddress,
    /// Physical address the tables are loaded at.
    pub tables_phys: PhysicalAddress,
    /// Highest physical page a mapping may reference.
    pub phys_addr_space_end_page: PhysicalAddress,
}

impl TableLayout {
    /// Number of level 2 entries, one per 512 MiB of address space.
    ///
    /// # Errors
    /// - [`TableError::UnsupportedGranule`] for anything but a 64 KiB granule.
    /// - [`TableError::UnalignedAddressSpace`] if the address space size is zero
    ///   or not a multiple of 512 MiB.
    pub fn level2_entries(&self) -> Result<usize, TableError> {
        if self.granule != Size64K::SIZE {
            return Err(TableError::UnsupportedGranule(self.granule));
        }
        let size = self.virt_addr_space_size;
        if size == 0 || size & Size512M::MASK != 0 {
            return Err(TableError::UnalignedAddressSpace(size));
        }
        usize::try_from(size >> Size512M::SHIFT)
            .map_err(|_| TableError::UnalignedAddressSpace(size))
    }

    /// Size in bytes of the serialized tables, known without allocating them.
    ///
    /// # Errors
    /// See [`level2_entries`](Self::level2_entries).
    pub fn serialized_size(&self) -> Result<u64, TableError> {
        let num_lvl2 = self.level2_entries()? as u64;
        Ok(num_lvl2 * (LEVEL3_ENTRIES as u64 + 1) * DESCRIPTOR_SIZE as u64)
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TableError {
    #[error("unsupported translation granule {0:#x}; only 64 KiB is supported")]
    UnsupportedGranule(u64),
    #[error("kernel virtual address space size {0:#x} is not a non-zero multiple of 512 MiB")]
    UnalignedAddressSpace(u64),
    #[error("translation tables at {0} are not 64 KiB aligned")]
    MisalignedTables(PhysicalAddress),
    #[error("region granule {0:#x} does not match the 64 KiB translation granule")]
    GranuleMismatch(u64),
    #[error("virtual region has {virt} pages but physical region has {phys}")]
    SizeMismatch { virt: usize, phys: usize },
    #[error("physical page {last} lies beyond the end of the physical address space at {end}")]
    OutOfPhysicalRange {
        last: PhysicalAddress,
        end: PhysicalAddress,
    },
    #[error("virtual address {0} is outside the kernel's translation tables")]
    VirtualAddressOutOfRange(VirtualAddress),
    #[error(transparent)]
    Descriptor(#[from] DescriptorError),
}

/// A level 3 table together with its physical load address.
struct Level3Table {
    phys_start: PhysicalPage<Size64K>,
    entries: Box<[PageDescriptor]>,
}

/// Precomputed kernel translation tables.
pub struct TranslationTable {
    layout: TableLayout,
    level3: Vec<Level3Table>,
    level2: Vec<TableDescriptor>,
    level2_phys_start: PhysicalAddress,
}

impl TranslationTable {
    /// Allocate the tables for `layout`, with every level 2 entry pointing at
    /// its level 3 table and every level 3 entry invalid.
    ///
    /// # Errors
    /// - [`TableError::UnsupportedGranule`] for anything but a 64 KiB granule.
    /// - [`TableError::UnalignedAddressSpace`] if the address space size is zero
    ///   or not a multiple of 512 MiB.
    /// - [`TableError::MisalignedTables`] if `tables_phys` is not 64 KiB aligned.
    /// - [`TableError::Descriptor`] if a table address exceeds the 48-bit
    ///   output range.
    pub fn new(layout: TableLayout) -> Result<Self, TableError> {
        let num_lvl2 = layout.level2_entries()?;
        let tables_phys = PhysicalPage::<Size64K>::try_from(layout.tables_phys)
            .map_err(|()| TableError::MisalignedTables(layout.tables_phys))?;

        let mut level3 = Vec::with_capacity(num_lvl2);
        let mut level2 = Vec::with_capacity(num_lvl2);
        for i in 0..num_lvl2 {
            let phys_start = PhysicalPage::from_addr(tables_phys.base() + i as u64 * Size64K::SIZE);
            level2.push(TableDescriptor::make_table(phys_start).map_err(DescriptorError::from)?);
            level3.push(Level3Table {
                phys_start,
                entries: vec![PageDescriptor::new(); LEVEL3_ENTRIES].into_boxed_slice(),
            });
        }
        let level2_phys_start = tables_phys.base() + num_lvl2 as u64 * Size64K::SIZE;

        debug!(
            "{num_lvl2} level 3 table(s) at {}, level 2 table at {}",
            HexUnderscore::new(tables_phys.base().as_u64()),
            HexUnderscore::new(level2_phys_start.as_u64()),
        );

        Ok(Self {
            layout,
            level3,
            level2,
            level2_phys_start,
        })
    }

    #[inline]
    #[must_use]
    pub const fn layout(&self) -> &TableLayout {
        &self.layout
    }

    /// Map every page of `virt` to the page at the same position in `phys`.
    ///
    /// Either all pages are mapped or, on error, the tables are left
    /// unchanged. Remapping a page overwrites its previous descriptor.
    ///
    /// # Errors
    /// - [`TableError::GranuleMismatch`] if a region does not use 64 KiB pages.
    /// - [`TableError::SizeMismatch`] if the regions differ in page count.
    /// - [`TableError::OutOfPhysicalRange`] if the last physical page lies
    ///   beyond the end of the physical address space.
    /// - [`TableError::VirtualAddressOutOfRange`] if a virtual page is not
    ///   covered by the tables.
    /// - [`TableError::Descriptor`] if the attributes cannot be encoded.
    pub fn map_at(
        &mut self,
        virt: &MemoryRegion<VirtualAddress>,
        phys: &MemoryRegion<PhysicalAddress>,
        attributes: &AttributeFields,
    ) -> Result<(), TableError> {
        if virt.is_empty() {
            return Ok(());
        }
        for granule in [virt.granule(), phys.granule()] {
            if granule != Size64K::SIZE {
                return Err(TableError::GranuleMismatch(granule));
            }
        }
        if virt.len() != phys.len() {
            return Err(TableError::SizeMismatch {
                virt: virt.len(),
                phys: phys.len(),
            });
        }
        let end = self.layout.phys_addr_space_end_page;
        if phys.last() > end {
            return Err(TableError::OutOfPhysicalRange {
                last: phys.last(),
                end,
            });
        }

        let mut updates = Vec::with_capacity(virt.len());
        for (va, pa) in virt.iter().zip(phys.iter()) {
            let (lvl2, lvl3) = self.indices(va)?;
            let desc = PageDescriptor::make_page(PhysicalPage::from_addr(pa), attributes)?;
            updates.push((lvl2, lvl3, desc));
        }

        for (lvl2, lvl3, desc) in updates {
            trace!(
                "L2[{lvl2}] L3[{lvl3}] -> {} ({:#018x})",
                desc.output_addr(),
                desc.into_bits()
            );
            self.level3[lvl2].entries[lvl3] = desc;
        }
        Ok(())
    }

    /// Install a [`MappingDescriptor`]; see [`map_at`](Self::map_at).
    ///
    /// # Errors
    /// See [`map_at`](Self::map_at).
    pub fn map(&mut self, mapping: &MappingDescriptor) -> Result<(), TableError> {
        self.map_at(
            &mapping.virt_region,
            &mapping.phys_region,
            &mapping.attributes,
        )
    }

    /// Level 2 and level 3 indices of the page containing `va`.
    fn indices(&self, va: VirtualAddress) -> Result<(usize, usize), TableError> {
        let offset = va
            .checked_offset_from(self.layout.virt_start)
            .ok_or(TableError::VirtualAddressOutOfRange(va))?;

        let lvl2 = usize::try_from(offset >> Size512M::SHIFT)
            .map_err(|_| TableError::VirtualAddressOutOfRange(va))?;
        if lvl2 >= self.level2.len() {
            return Err(TableError::VirtualAddressOutOfRange(va));
        }

        #[allow(clippy::cast_possible_truncation)]
        let lvl3 = ((offset & Size512M::MASK) >> Size64K::SHIFT) as usize;
        Ok((lvl2, lvl3))
    }

    /// The page descriptor currently translating `va`.
    ///
    /// # Errors
    /// [`TableError::VirtualAddressOutOfRange`] if `va` is not covered.
    pub fn page_descriptor(&self, va: VirtualAddress) -> Result<PageDescriptor, TableError> {
        let (lvl2, lvl3) = self.indices(va)?;
        Ok(self.level3[lvl2].entries[lvl3])
    }

    /// The level 2 table.
    #[inline]
    #[must_use]
    pub fn level2(&self) -> &[TableDescriptor] {
        &self.level2
    }

    /// Level 3 table `index`, if present.
    #[must_use]
    pub fn level3(&self, index: usize) -> Option<&[PageDescriptor]> {
        self.level3.get(index).map(|t| &*t.entries)
    }

    /// Physical load address of level 3 table `index`, if present.
    #[must_use]
    pub fn level3_phys_start(&self, index: usize) -> Option<PhysicalAddress> {
        self.level3.get(index).map(|t| t.phys_start.base())
    }

    /// Translation table base address: the physical address of the level 2 table.
    #[inline]
    #[must_use]
    pub const fn base_address(&self) -> PhysicalAddress {
        self.level2_phys_start
    }

    /// [`base_address`](Self::base_address) as the 8 little-endian bytes
    /// patched into the kernel.
    #[inline]
    #[must_use]
    pub const fn base_address_bytes(&self) -> [u8; 8] {
        self.level2_phys_start.to_le_bytes()
    }

    /// Size of [`serialize`](Self::serialize)'s output in bytes.
    #[must_use]
    pub fn size_in_bytes(&self) -> usize {
        (self.level3.len() * LEVEL3_ENTRIES + self.level2.len()) * DESCRIPTOR_SIZE
    }

    /// All level 3 tables in order, then the level 2 table; each descriptor
    /// as a little-endian `u64`.
    #[must_use]
    pub fn serialize(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.size_in_bytes());
        let level3 = self.level3.iter().flat_map(|t| t.entries.iter());
        for raw in level3
            .map(|d| d.into_bits())
            .chain(self.level2.iter().map(|d| d.into_bits()))
        {
            out.extend_from_slice(&raw.to_le_bytes());
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attributes::{AccessPermissions, MemoryAttributes};
    use crate::descriptors::{AccessPermission, PageKind, Shareability, TableKind, mair};

    const G: u64 = 0x1_0000;
    const VIRT_START: u64 = 0xFFFF_FFFF_8000_0000;

    fn layout() -> TableLayout {
        TableLayout {
            granule: G,
            virt_addr_space_size: 1 << 30,
            virt_start: VirtualAddress::new(VIRT_START),
            tables_phys: PhysicalAddress::new(0x9_0000),
            phys_addr_space_end_page: PhysicalAddress::new(0x4001_0000),
        }
    }

    fn virt(addr: u64, pages: u64) -> MemoryRegion<VirtualAddress> {
        MemoryRegion::new(VirtualAddress::new(addr), pages * G, G).unwrap()
    }

    fn phys(addr: u64, pages: u64) -> MemoryRegion<PhysicalAddress> {
        MemoryRegion::new(PhysicalAddress::new(addr), pages * G, G).unwrap()
    }

    #[test]
    fn geometry() {
        let table = TranslationTable::new(layout()).unwrap();
        assert_eq!(table.level2().len(), 2);
        assert_eq!(table.level3(0).map(<[_]>::len), Some(LEVEL3_ENTRIES));
        assert!(table.level3(2).is_none());
        assert_eq!(table.level3_phys_start(1), Some(PhysicalAddress::new(0xA_0000)));
        assert_eq!(table.base_address(), PhysicalAddress::new(0xB_0000));
        assert_eq!(table.base_address_bytes(), [0x00, 0x00, 0x0B, 0, 0, 0, 0, 0]);
        assert_eq!(table.size_in_bytes(), 2 * 64 * 1024 + 2 * 8);
        assert_eq!(table.serialize().len(), table.size_in_bytes());
        assert_eq!(
            layout().serialized_size(),
            Ok(table.size_in_bytes() as u64)
        );
    }

    #[test]
    fn serialized_size_without_allocating() {
        let huge = TableLayout {
            virt_addr_space_size: 1 << 46,
            ..layout()
        };
        assert_eq!(huge.level2_entries(), Ok(1 << 17));
        assert_eq!(huge.serialized_size(), Ok((1 << 17) * (8192 + 1) * 8));

        let ragged = TableLayout {
            virt_addr_space_size: 3 << 28,
            ..layout()
        };
        assert_eq!(
            ragged.serialized_size(),
            Err(TableError::UnalignedAddressSpace(3 << 28))
        );
    }

    #[test]
    fn level2_points_at_level3_tables() {
        let table = TranslationTable::new(layout()).unwrap();
        for (i, desc) in table.level2().iter().enumerate() {
            assert!(desc.valid());
            assert_eq!(desc.kind(), TableKind::Table);
            assert_eq!(
                desc.next_level_table_addr().as_u64(),
                0x9_0000 + i as u64 * G
            );
        }

        let bytes = table.serialize();
        let l2 = &bytes[2 * 64 * 1024..];
        assert_eq!(u64::from_le_bytes(l2[..8].try_into().unwrap()), 0x9_0000 | 0b11);
        assert_eq!(u64::from_le_bytes(l2[8..].try_into().unwrap()), 0xA_0000 | 0b11);
    }

    #[test]
    fn rejects_bad_layouts() {
        let granule = TableLayout {
            granule: 4096,
            ..layout()
        };
        assert_eq!(
            TranslationTable::new(granule).err(),
            Some(TableError::UnsupportedGranule(4096))
        );

        for size in [0, 3 << 28] {
            let space = TableLayout {
                virt_addr_space_size: size,
                ..layout()
            };
            assert_eq!(
                TranslationTable::new(space).err(),
                Some(TableError::UnalignedAddressSpace(size))
            );
        }

        let tables = TableLayout {
            tables_phys: PhysicalAddress::new(0x9_1000),
            ..layout()
        };
        assert_eq!(
            TranslationTable::new(tables).err(),
            Some(TableError::MisalignedTables(PhysicalAddress::new(0x9_1000)))
        );
    }

    #[test]
    fn maps_three_pages() {
        let mut table = TranslationTable::new(layout()).unwrap();
        table
            .map_at(
                &virt(VIRT_START, 3),
                &phys(0x8_0000, 3),
                &AttributeFields::code(),
            )
            .unwrap();

        let entries = table.level3(0).unwrap();
        for (i, desc) in entries[..3].iter().enumerate() {
            assert!(desc.valid());
            assert_eq!(desc.kind(), PageKind::Page);
            assert!(desc.access_flag());
            assert_eq!(desc.output_addr().as_u64(), 0x8_0000 + i as u64 * G);
            assert_eq!(desc.access_permission(), AccessPermission::RoEl1);
            assert!(!desc.pxn());
            assert!(desc.uxn());
        }
        assert_eq!(entries[3].into_bits(), 0);
    }

    #[test]
    fn maps_into_second_level3_table() {
        let mut table = TranslationTable::new(layout()).unwrap();
        let va = VIRT_START + (1 << 29) + 5 * G;
        table
            .map_at(&virt(va, 1), &phys(0x4000_0000, 1), &AttributeFields::data())
            .unwrap();

        let desc = table.level3(1).unwrap()[5];
        assert_eq!(desc.output_addr().as_u64(), 0x4000_0000);
        assert_eq!(desc.attr_indx(), mair::NORMAL);
        assert_eq!(desc.shareability(), Shareability::InnerShareable);
        assert_eq!(desc.access_permission(), AccessPermission::RwEl1);
        assert!(desc.pxn());
        assert_eq!(table.page_descriptor(VirtualAddress::new(va)).unwrap(), desc);

        let bytes = table.serialize();
        let at = (LEVEL3_ENTRIES + 5) * 8;
        assert_eq!(
            u64::from_le_bytes(bytes[at..at + 8].try_into().unwrap()),
            desc.into_bits()
        );
    }

    #[test]
    fn size_mismatch_leaves_table_unchanged() {
        let mut table = TranslationTable::new(layout()).unwrap();
        let before = table.serialize();
        assert_eq!(
            table.map_at(&virt(VIRT_START, 2), &phys(0x8_0000, 3), &AttributeFields::data()),
            Err(TableError::SizeMismatch { virt: 2, phys: 3 })
        );
        assert_eq!(table.serialize(), before);
    }

    #[test]
    fn rejects_physical_pages_past_the_end() {
        let mut table = TranslationTable::new(layout()).unwrap();
        assert_eq!(
            table.map_at(&virt(VIRT_START, 2), &phys(0x4001_0000, 2), &AttributeFields::data()),
            Err(TableError::OutOfPhysicalRange {
                last: PhysicalAddress::new(0x4002_0000),
                end: PhysicalAddress::new(0x4001_0000),
            })
        );
        assert!(
            table
                .map_at(&virt(VIRT_START, 1), &phys(0x4001_0000, 1), &AttributeFields::data())
                .is_ok()
        );
    }

    #[test]
    fn rejects_virtual_addresses_outside_the_tables() {
        let mut table = TranslationTable::new(layout()).unwrap();

        let below = VIRT_START - G;
        assert_eq!(
            table.map_at(&virt(below, 1), &phys(0, 1), &AttributeFields::data()),
            Err(TableError::VirtualAddressOutOfRange(VirtualAddress::new(below)))
        );

        // The second page runs past the 1 GiB covered by the tables; nothing
        // may be written for the first one either.
        let before = table.serialize();
        let last = VIRT_START + (1 << 30) - G;
        assert_eq!(
            table.map_at(&virt(last - G, 3), &phys(0, 3), &AttributeFields::data()),
            Err(TableError::VirtualAddressOutOfRange(VirtualAddress::new(last + G)))
        );
        assert_eq!(table.serialize(), before);
    }

    #[test]
    fn rejects_device_memory_and_foreign_granules() {
        let mut table = TranslationTable::new(layout()).unwrap();
        let mmio = AttributeFields::new(
            MemoryAttributes::Device,
            AccessPermissions::ReadWrite,
            true,
        );
        assert_eq!(
            table.map_at(&virt(VIRT_START, 1), &phys(0x3F20_0000, 1), &mmio),
            Err(TableError::Descriptor(DescriptorError::InvalidAttribute(
                MemoryAttributes::Device
            )))
        );

        let small = MemoryRegion::new(VirtualAddress::new(VIRT_START), 0x1000, 0x1000).unwrap();
        let small_phys = MemoryRegion::new(PhysicalAddress::new(0), 0x1000, 0x1000).unwrap();
        assert_eq!(
            table.map_at(&small, &small_phys, &AttributeFields::data()),
            Err(TableError::GranuleMismatch(0x1000))
        );
    }

    #[test]
    fn remapping_overwrites() {
        let mut table = TranslationTable::new(layout()).unwrap();
        let va = virt(VIRT_START, 1);
        table
            .map_at(&va, &phys(0x8_0000, 1), &AttributeFields::code())
            .unwrap();
        table
            .map_at(&va, &phys(0x10_0000, 1), &AttributeFields::data())
            .unwrap();
        let desc = table.page_descriptor(va.first()).unwrap();
        assert_eq!(desc.output_addr().as_u64(), 0x10_0000);
        assert_eq!(desc.access_permission(), AccessPermission::RwEl1);
    }
}
