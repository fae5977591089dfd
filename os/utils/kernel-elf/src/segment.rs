//! # Program Headers

use core::fmt;
use kernel_memory_addresses::{PhysicalAddress, VirtualAddress};

/// Bitfield wrapper for `Elf64_Phdr.p_flags` (32-bit).
///
/// Layout (LSB→MSB):
/// - bit 0: execute
/// - bit 1: write
/// - bit 2: read
/// - bits 3..31: OS/processor specific
#[bitfield_struct::bitfield(u32)]
#[derive(PartialEq, Eq)]
pub struct SegmentFlags {
    pub execute: bool,
    pub write: bool,
    pub read: bool,
    #[bits(29)]
    __: u32,
}

/// `R W X` style, with `-` for a missing permission.
impl fmt::Display for SegmentFlags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let flag = |set: bool, c: char| if set { c } else { '-' };
        write!(
            f,
            "{}{}{}",
            flag(self.read(), 'R'),
            flag(self.write(), 'W'),
            flag(self.execute(), 'X')
        )
    }
}

/// One program header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Segment {
    /// `p_type`.
    pub kind: u32,
    pub flags: SegmentFlags,
    /// File offset of the segment's first byte.
    pub offset: u64,
    pub vaddr: VirtualAddress,
    pub paddr: PhysicalAddress,
    /// Bytes backed by the file.
    pub file_size: u64,
    /// Bytes occupied in memory; the tail beyond `file_size` is zero-filled.
    pub mem_size: u64,
    pub align: u64,
}

impl Segment {
    #[inline]
    #[must_use]
    pub const fn is_load(&self) -> bool {
        self.kind == crate::raw::PT_LOAD
    }

    /// `vaddr <= va < vaddr + mem_size`.
    #[inline]
    #[must_use]
    pub const fn contains(&self, va: VirtualAddress) -> bool {
        match va.checked_offset_from(self.vaddr) {
            Some(off) => off < self.mem_size,
            None => false,
        }
    }

    /// Physical address of `va`, using this segment's virtual-to-physical offset.
    ///
    /// Wraps modulo 2⁶⁴ like the loader does; `va` is not checked against the
    /// segment bounds.
    #[inline]
    #[must_use]
    pub const fn virt_to_phys(&self, va: VirtualAddress) -> PhysicalAddress {
        let delta = self.vaddr.as_u64().wrapping_sub(self.paddr.as_u64());
        PhysicalAddress::new(va.as_u64().wrapping_sub(delta))
    }

    /// End of the file-backed part of the segment, as a file offset.
    #[inline]
    #[must_use]
    pub const fn file_end(&self) -> Option<u64> {
        self.offset.checked_add(self.file_size)
    }
}

/// A loadable segment as the table generator sees it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadSegment {
    pub virt_start: VirtualAddress,
    pub phys_start: PhysicalAddress,
    /// Size in memory, not rounded to any granule.
    pub mem_size: u64,
    pub flags: SegmentFlags,
    /// Allocated sections whose start address falls inside the segment, in
    /// section header order.
    pub section_names: Vec<String>,
}

impl LoadSegment {
    /// Section names joined by single spaces, e.g. `.text .rodata`.
    #[must_use]
    pub fn joined_section_names(&self) -> String {
        self.section_names.join(" ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn segment(vaddr: u64, paddr: u64, mem_size: u64) -> Segment {
        Segment {
            kind: crate::raw::PT_LOAD,
            flags: SegmentFlags::new().with_read(true),
            offset: 0x1_0000,
            vaddr: VirtualAddress::new(vaddr),
            paddr: PhysicalAddress::new(paddr),
            file_size: mem_size,
            mem_size,
            align: 0x1_0000,
        }
    }

    #[test]
    fn flag_bits() {
        let flags = SegmentFlags::from_bits(0b101);
        assert!(flags.read());
        assert!(!flags.write());
        assert!(flags.execute());
        assert_eq!(flags.to_string(), "R-X");
        assert_eq!(SegmentFlags::from_bits(0b110).to_string(), "RW-");
    }

    #[test]
    fn containment_is_half_open() {
        let seg = segment(0xFFFF_FFFF_C000_0000, 0x8_0000, 0x2_0000);
        assert!(seg.contains(VirtualAddress::new(0xFFFF_FFFF_C000_0000)));
        assert!(seg.contains(VirtualAddress::new(0xFFFF_FFFF_C001_FFFF)));
        assert!(!seg.contains(VirtualAddress::new(0xFFFF_FFFF_C002_0000)));
        assert!(!seg.contains(VirtualAddress::new(0xFFFF_FFFF_BFFF_FFFF)));
    }

    #[test]
    fn translates_with_segment_offset() {
        let seg = segment(0xFFFF_FFFF_C000_0000, 0x8_0000, 0x2_0000);
        assert_eq!(
            seg.virt_to_phys(VirtualAddress::new(0xFFFF_FFFF_C001_2340)),
            PhysicalAddress::new(0x9_2340)
        );

        // Physical above virtual: the offset wraps.
        let seg = segment(0x1000, 0x8000, 0x1000);
        assert_eq!(
            seg.virt_to_phys(VirtualAddress::new(0x1010)),
            PhysicalAddress::new(0x8010)
        );
    }
}
