//! A synthetic kernel image with the layout symbols the tool expects.
#![allow(dead_code)]

use kernel_elf::ElfBuilder;
use kernel_elf::SegmentFlags;
use kernel_elf::raw::{EM_AARCH64, SHF_ALLOC, SHF_EXECINSTR, SHF_WRITE, SHT_NOBITS, SHT_PROGBITS};
use std::path::{Path, PathBuf};

pub const VIRT_START: u64 = 0xFFFF_FFFF_C000_0000;
pub const VIRT_ADDR_SPACE_SIZE: u64 = 1 << 30;

pub const CODE: u64 = VIRT_START;
pub const CODE_PHYS: u64 = 0x8_0000;
pub const CODE_MEM_SIZE: u64 = 0x1_8000;

pub const DATA: u64 = 0xFFFF_FFFF_C002_0000;
pub const DATA_PHYS: u64 = 0xA_0000;
pub const DATA_MEM_SIZE: u64 = 0x2_8000;

pub const BSS: u64 = 0xFFFF_FFFF_C005_0000;
pub const BSS_PHYS: u64 = 0xD_0000;

/// Two level 3 tables and a level 2 table with two entries.
pub const TABLES_LEN: u64 = 2 * 0x1_0000 + 2 * 8;
pub const BASE_ADDR: u64 = DATA + TABLES_LEN;
/// Level 2 table right behind the level 3 tables at the start of `.data`.
pub const EXPECTED_BASE_ADDRESS: u64 = DATA_PHYS + 2 * 0x1_0000;

pub const FILL: u8 = 0xA5;

#[derive(Debug, Clone)]
pub struct FakeKernel {
    pub machine: u16,
    pub code_phys: u64,
    pub data_flags: SegmentFlags,
    /// File-backed bytes of the data segment.
    pub data_file_size: u64,
    /// `st_size` of `KERNEL_TABLES`.
    pub tables_size: u64,
    pub with_tables_symbol: bool,
    /// Value of `__kernel_virt_addr_space_size`.
    pub virt_addr_space_size: u64,
}

impl Default for FakeKernel {
    fn default() -> Self {
        Self {
            machine: EM_AARCH64,
            code_phys: CODE_PHYS,
            data_flags: SegmentFlags::new().with_read(true).with_write(true),
            data_file_size: TABLES_LEN + 8,
            tables_size: TABLES_LEN,
            with_tables_symbol: true,
            virt_addr_space_size: VIRT_ADDR_SPACE_SIZE,
        }
    }
}

impl FakeKernel {
    pub fn build(&self) -> Vec<u8> {
        let rx = SegmentFlags::new().with_read(true).with_execute(true);
        let rw = SegmentFlags::new().with_read(true).with_write(true);
        let data_len = usize::try_from(self.data_file_size).unwrap();

        let mut builder = ElfBuilder::new(self.machine)
            .segment(rx, CODE, self.code_phys, vec![0x11; 0x200], CODE_MEM_SIZE)
            .segment(self.data_flags, DATA, DATA_PHYS, vec![FILL; data_len], DATA_MEM_SIZE)
            .segment(rw, BSS, BSS_PHYS, Vec::new(), 0x1_0000)
            // Occupies no memory and has no usable permissions; never mapped.
            .segment(SegmentFlags::new(), 0, 0, Vec::new(), 0)
            .section(".text", SHT_PROGBITS, SHF_ALLOC | SHF_EXECINSTR, CODE, 0x200)
            .section(".data", SHT_PROGBITS, SHF_ALLOC | SHF_WRITE, DATA, self.data_file_size)
            .section(".bss", SHT_NOBITS, SHF_ALLOC | SHF_WRITE, BSS, 0x1_0000)
            .symbol("__kernel_virt_start_addr", VIRT_START, 0)
            .symbol("__kernel_virt_addr_space_size", self.virt_addr_space_size, 0)
            .symbol("PHYS_KERNEL_TABLES_BASE_ADDR", BASE_ADDR, 8);
        if self.with_tables_symbol {
            builder = builder.symbol("KERNEL_TABLES", DATA, self.tables_size);
        }
        builder.build()
    }

    /// Write the image to `dir/kernel.elf`.
    pub fn write_to(&self, dir: &Path) -> PathBuf {
        let path = dir.join("kernel.elf");
        std::fs::write(&path, self.build()).unwrap();
        path
    }
}

/// Overwrite field `field` (byte offset within the entry) of program header
/// `index` with `value`.
pub fn set_phdr_field(image: &mut [u8], index: usize, field: usize, value: u64) {
    let at = 64 + index * 56 + field;
    image[at..at + 8].copy_from_slice(&value.to_le_bytes());
}

/// The `index`-th little-endian `u64` starting at file offset `offset`.
pub fn u64_at(bytes: &[u8], offset: u64, index: usize) -> u64 {
    let at = usize::try_from(offset).unwrap() + index * 8;
    u64::from_le_bytes(bytes[at..at + 8].try_into().unwrap())
}
