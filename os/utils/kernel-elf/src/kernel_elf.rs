//! # Kernel ELF Introspection
//!
//! Parses the headers of a 64-bit little-endian kernel image once and answers
//! the questions the table generator asks: symbol values, which program header
//! covers an address, where that address lives physically and in the file.

use crate::error::ElfError;
use crate::raw::{
    self, EI_MAGIC_BYTES, ELFCLASS64, ELFDATA2LSB, EM_AARCH64, EV_CURRENT, Elf64Ehdr, Elf64Phdr,
    Elf64Shdr, Elf64Sym, SHN_UNDEF, SHT_SYMTAB,
};
use crate::section::{Section, Symbol};
use crate::segment::{LoadSegment, Segment, SegmentFlags};
use core::fmt;
use core::mem::size_of;
use kernel_memory_addresses::{PhysicalAddress, VirtualAddress};
use log::debug;
use std::path::Path;

/// `e_machine` of an image.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum Machine {
    AArch64,
    Other(u16),
}

impl From<u16> for Machine {
    fn from(value: u16) -> Self {
        match value {
            EM_AARCH64 => Self::AArch64,
            other => Self::Other(other),
        }
    }
}

impl fmt::Display for Machine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AArch64 => f.write_str("AArch64"),
            Self::Other(m) => write!(f, "e_machine {m}"),
        }
    }
}

/// A parsed kernel image: program headers, section headers and `.symtab`.
#[derive(Debug, Clone)]
pub struct KernelElf {
    machine: Machine,
    segments: Vec<Segment>,
    sections: Vec<Section>,
    symbols: Vec<Symbol>,
}

impl KernelElf {
    /// Read and parse the image at `path`.
    ///
    /// # Errors
    /// [`ElfError::Io`] if the file cannot be read, otherwise see
    /// [`parse`](Self::parse).
    pub fn open(path: impl AsRef<Path>) -> Result<Self, ElfError> {
        let path = path.as_ref();
        let bytes = std::fs::read(path).map_err(|source| ElfError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&bytes)
    }

    /// Parse an in-memory image.
    ///
    /// # Errors
    /// [`ElfError::Malformed`] if the identification bytes are wrong or any
    /// header table, string table or the symbol table is out of bounds, or a
    /// segment's file contents extend past the end of the image.
    pub fn parse(bytes: &[u8]) -> Result<Self, ElfError> {
        let ehdr: Elf64Ehdr = raw::read(bytes, 0, "file too small for ELF header")?;

        if ehdr.e_ident[0..4] != EI_MAGIC_BYTES {
            return Err(ElfError::Malformed("bad magic"));
        }
        if ehdr.e_ident[4] != ELFCLASS64 {
            return Err(ElfError::Malformed("not a 64-bit ELF file"));
        }
        if ehdr.e_ident[5] != ELFDATA2LSB {
            return Err(ElfError::Malformed("not a little-endian ELF file"));
        }
        if ehdr.e_ident[6] != EV_CURRENT {
            return Err(ElfError::Malformed("unknown ELF version"));
        }

        let segments = Self::parse_segments(bytes, &ehdr)?;
        let shdrs = Self::parse_section_headers(bytes, &ehdr)?;
        let sections = Self::resolve_sections(bytes, &ehdr, &shdrs)?;
        let symbols = Self::parse_symbols(bytes, &shdrs)?;

        debug!(
            "parsed ELF: {} program header(s), {} section(s), {} symbol(s)",
            segments.len(),
            sections.len(),
            symbols.len()
        );

        Ok(Self {
            machine: Machine::from(ehdr.e_machine),
            segments,
            sections,
            symbols,
        })
    }

    fn parse_segments(bytes: &[u8], ehdr: &Elf64Ehdr) -> Result<Vec<Segment>, ElfError> {
        if ehdr.e_phnum == 0 {
            return Ok(Vec::new());
        }
        if usize::from(ehdr.e_phentsize) != size_of::<Elf64Phdr>() {
            return Err(ElfError::Malformed("unexpected program header size"));
        }

        let entsize = u64::from(ehdr.e_phentsize);
        raw::slice(
            bytes,
            ehdr.e_phoff,
            entsize * u64::from(ehdr.e_phnum),
            "program header table out of bounds",
        )?;

        (0..u64::from(ehdr.e_phnum))
            .map(|i| {
                let ph: Elf64Phdr =
                    raw::read(bytes, ehdr.e_phoff + i * entsize, "program header out of bounds")?;
                if ph.p_filesz != 0 {
                    raw::slice(
                        bytes,
                        ph.p_offset,
                        ph.p_filesz,
                        "segment contents out of bounds",
                    )?;
                }
                Ok(Segment {
                    kind: ph.p_type,
                    flags: SegmentFlags::from_bits(ph.p_flags),
                    offset: ph.p_offset,
                    vaddr: VirtualAddress::new(ph.p_vaddr),
                    paddr: PhysicalAddress::new(ph.p_paddr),
                    file_size: ph.p_filesz,
                    mem_size: ph.p_memsz,
                    align: ph.p_align,
                })
            })
            .collect()
    }

    fn parse_section_headers(bytes: &[u8], ehdr: &Elf64Ehdr) -> Result<Vec<Elf64Shdr>, ElfError> {
        if ehdr.e_shnum == 0 {
            return Ok(Vec::new());
        }
        if usize::from(ehdr.e_shentsize) != size_of::<Elf64Shdr>() {
            return Err(ElfError::Malformed("unexpected section header size"));
        }

        let entsize = u64::from(ehdr.e_shentsize);
        raw::slice(
            bytes,
            ehdr.e_shoff,
            entsize * u64::from(ehdr.e_shnum),
            "section header table out of bounds",
        )?;

        (0..u64::from(ehdr.e_shnum))
            .map(|i| raw::read(bytes, ehdr.e_shoff + i * entsize, "section header out of bounds"))
            .collect()
    }

    fn resolve_sections(
        bytes: &[u8],
        ehdr: &Elf64Ehdr,
        shdrs: &[Elf64Shdr],
    ) -> Result<Vec<Section>, ElfError> {
        let names: &[u8] = if ehdr.e_shstrndx == SHN_UNDEF {
            &[]
        } else {
            let shstrtab = shdrs
                .get(usize::from(ehdr.e_shstrndx))
                .ok_or(ElfError::Malformed("section name table index out of range"))?;
            raw::slice(
                bytes,
                shstrtab.sh_offset,
                shstrtab.sh_size,
                "section name table out of bounds",
            )?
        };

        shdrs
            .iter()
            .map(|sh| {
                let name = if names.is_empty() {
                    String::new()
                } else {
                    String::from_utf8_lossy(raw::bytes_at(names, sh.sh_name)?).into_owned()
                };
                Ok(Section {
                    name,
                    kind: sh.sh_type,
                    flags: sh.sh_flags,
                    addr: VirtualAddress::new(sh.sh_addr),
                    offset: sh.sh_offset,
                    size: sh.sh_size,
                })
            })
            .collect()
    }

    fn parse_symbols(bytes: &[u8], shdrs: &[Elf64Shdr]) -> Result<Vec<Symbol>, ElfError> {
        let Some(symtab) = shdrs.iter().find(|sh| sh.sh_type == SHT_SYMTAB) else {
            return Ok(Vec::new());
        };
        if symtab.sh_entsize != size_of::<Elf64Sym>() as u64 {
            return Err(ElfError::Malformed("unexpected symbol table entry size"));
        }

        let strtab = shdrs
            .get(symtab.sh_link as usize)
            .ok_or(ElfError::Malformed("symbol string table index out of range"))?;
        let strings = raw::slice(
            bytes,
            strtab.sh_offset,
            strtab.sh_size,
            "symbol string table out of bounds",
        )?;
        let entries = raw::slice(
            bytes,
            symtab.sh_offset,
            symtab.sh_size,
            "symbol table out of bounds",
        )?;

        let mut symbols = Vec::with_capacity(entries.len() / size_of::<Elf64Sym>());
        for entry in entries.chunks_exact(size_of::<Elf64Sym>()) {
            let sym: Elf64Sym = raw::read(entry, 0, "symbol out of bounds")?;
            let Ok(name) = core::str::from_utf8(raw::bytes_at(strings, sym.st_name)?) else {
                debug!("skipping symbol with non-UTF-8 name at {:#x}", sym.st_value);
                continue;
            };
            symbols.push(Symbol {
                name: name.to_owned(),
                value: sym.st_value,
                size: sym.st_size,
            });
        }
        Ok(symbols)
    }

    /// `e_machine` of the image.
    #[inline]
    #[must_use]
    pub const fn machine_type(&self) -> Machine {
        self.machine
    }

    /// All program headers, in file order.
    #[inline]
    #[must_use]
    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// All section headers, in file order.
    #[inline]
    #[must_use]
    pub fn sections(&self) -> &[Section] {
        &self.sections
    }

    /// First `.symtab` entry named exactly `name`.
    ///
    /// # Errors
    /// [`ElfError::SymbolNotFound`] if there is none.
    pub fn symbol(&self, name: &str) -> Result<&Symbol, ElfError> {
        self.symbols
            .iter()
            .find(|s| s.name == name)
            .ok_or_else(|| ElfError::SymbolNotFound(name.to_owned()))
    }

    /// `st_value` of the symbol named `name`.
    ///
    /// # Errors
    /// [`ElfError::SymbolNotFound`] if there is no such symbol.
    pub fn symbol_value(&self, name: &str) -> Result<u64, ElfError> {
        self.symbol(name).map(|s| s.value)
    }

    /// First program header, of any type, whose memory range contains `va`.
    ///
    /// # Errors
    /// [`ElfError::AddressNotMapped`] if no program header covers `va`.
    pub fn segment_containing(&self, va: VirtualAddress) -> Result<&Segment, ElfError> {
        self.segments
            .iter()
            .find(|seg| seg.contains(va))
            .ok_or(ElfError::AddressNotMapped(va))
    }

    /// Physical address of `va` according to its segment's load address.
    ///
    /// # Errors
    /// [`ElfError::AddressNotMapped`] if no program header covers `va`.
    pub fn virt_to_phys(&self, va: VirtualAddress) -> Result<PhysicalAddress, ElfError> {
        Ok(self.segment_containing(va)?.virt_to_phys(va))
    }

    /// File offset of `va`: `va - p_vaddr + p_offset`.
    ///
    /// The result may point past the file-backed part of the segment when `va`
    /// lies in its zero-filled tail.
    ///
    /// # Errors
    /// - [`ElfError::AddressNotMapped`] if no program header covers `va`.
    /// - [`ElfError::Malformed`] if the offset overflows.
    pub fn virt_to_file_offset(&self, va: VirtualAddress) -> Result<u64, ElfError> {
        let seg = self.segment_containing(va)?;
        va.checked_offset_from(seg.vaddr)
            .and_then(|delta| seg.offset.checked_add(delta))
            .ok_or(ElfError::Malformed("segment file offset overflows"))
    }

    /// Names of allocated sections starting inside `segment`'s memory range.
    #[must_use]
    pub fn section_names_in(&self, segment: &Segment) -> Vec<&str> {
        self.sections
            .iter()
            .filter(|sh| sh.is_alloc() && segment.contains(sh.addr))
            .map(|sh| sh.name.as_str())
            .collect()
    }

    /// Every `PT_LOAD` segment in program header order.
    #[must_use]
    pub fn load_segments(&self) -> Vec<LoadSegment> {
        self.segments
            .iter()
            .filter(|seg| seg.is_load())
            .map(|seg| LoadSegment {
                virt_start: seg.vaddr,
                phys_start: seg.paddr,
                mem_size: seg.mem_size,
                flags: seg.flags,
                section_names: self
                    .section_names_in(seg)
                    .into_iter()
                    .map(str::to_owned)
                    .collect(),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::ElfBuilder;
    use crate::raw::{SHF_ALLOC, SHF_EXECINSTR, SHF_WRITE, SHT_NOBITS, SHT_PROGBITS};

    const CODE: u64 = 0xFFFF_FFFF_C000_0000;
    const DATA: u64 = 0xFFFF_FFFF_C002_0000;

    fn image() -> Vec<u8> {
        let rx = SegmentFlags::new().with_read(true).with_execute(true);
        let rw = SegmentFlags::new().with_read(true).with_write(true);
        ElfBuilder::new(EM_AARCH64)
            .segment(rx, CODE, 0x8_0000, vec![0x11; 0x100], 0x1_8000)
            .segment(rw, DATA, 0xA_0000, vec![0x22; 0x40], 0x2_0000)
            .section(".text", SHT_PROGBITS, SHF_ALLOC | SHF_EXECINSTR, CODE, 0x100)
            .section(".rodata", SHT_PROGBITS, SHF_ALLOC, CODE + 0x100, 0x20)
            .section(".comment", SHT_PROGBITS, 0, 0, 0x10)
            .section(".data", SHT_PROGBITS, SHF_ALLOC | SHF_WRITE, DATA, 0x40)
            .section(".bss", SHT_NOBITS, SHF_ALLOC | SHF_WRITE, DATA + 0x1_0000, 0x1_0000)
            .symbol("__kernel_virt_start_addr", CODE, 0)
            .symbol("__kernel_virt_addr_space_size", 1 << 30, 0)
            .symbol("COUNTER", DATA + 0x10, 8)
            .build()
    }

    #[test]
    fn machine_and_symbols() {
        let elf = KernelElf::parse(&image()).unwrap();
        assert_eq!(elf.machine_type(), Machine::AArch64);
        assert_eq!(elf.symbol_value("__kernel_virt_start_addr").unwrap(), CODE);
        assert_eq!(elf.symbol_value("__kernel_virt_addr_space_size").unwrap(), 1 << 30);
        assert_eq!(elf.symbol("COUNTER").unwrap().size, 8);
        assert!(matches!(
            elf.symbol_value("COUNTE"),
            Err(ElfError::SymbolNotFound(name)) if name == "COUNTE"
        ));
    }

    #[test]
    fn other_machines_are_reported() {
        let bytes = ElfBuilder::new(62).build();
        let elf = KernelElf::parse(&bytes).unwrap();
        assert_eq!(elf.machine_type(), Machine::Other(62));
        assert_eq!(elf.machine_type().to_string(), "e_machine 62");
    }

    #[test]
    fn address_translation() {
        let bytes = image();
        let elf = KernelElf::parse(&bytes).unwrap();

        let va = VirtualAddress::new(DATA + 0x10);
        assert_eq!(elf.segment_containing(va).unwrap().vaddr.as_u64(), DATA);
        assert_eq!(elf.virt_to_phys(va).unwrap(), PhysicalAddress::new(0xA_0010));

        let off = elf.virt_to_file_offset(va).unwrap();
        let off = usize::try_from(off).unwrap();
        assert_eq!(&bytes[off..off + 4], &[0x22; 4]);

        let code = elf.virt_to_file_offset(VirtualAddress::new(CODE)).unwrap();
        let code = usize::try_from(code).unwrap();
        assert_eq!(bytes[code], 0x11);
    }

    #[test]
    fn unmapped_addresses() {
        let elf = KernelElf::parse(&image()).unwrap();
        let gap = VirtualAddress::new(CODE + 0x1_8000);
        assert!(matches!(
            elf.segment_containing(gap),
            Err(ElfError::AddressNotMapped(va)) if va == gap
        ));
        assert!(elf.virt_to_phys(gap).is_err());
        assert!(elf.virt_to_file_offset(gap).is_err());
    }

    #[test]
    fn load_segments_with_sections() {
        let elf = KernelElf::parse(&image()).unwrap();
        let segments = elf.load_segments();
        assert_eq!(segments.len(), 2);

        assert_eq!(segments[0].virt_start.as_u64(), CODE);
        assert_eq!(segments[0].phys_start.as_u64(), 0x8_0000);
        assert_eq!(segments[0].mem_size, 0x1_8000);
        assert_eq!(segments[0].joined_section_names(), ".text .rodata");
        assert!(segments[0].flags.execute());

        assert_eq!(segments[1].joined_section_names(), ".data .bss");
        assert!(segments[1].flags.write());
    }

    #[test]
    fn rejects_garbage() {
        assert!(matches!(KernelElf::parse(b"\x7FELF"), Err(ElfError::Malformed(_))));

        let mut bytes = image();
        bytes[0] = 0;
        assert!(matches!(
            KernelElf::parse(&bytes),
            Err(ElfError::Malformed("bad magic"))
        ));

        let mut bytes = image();
        bytes[4] = 1;
        assert!(matches!(
            KernelElf::parse(&bytes),
            Err(ElfError::Malformed("not a 64-bit ELF file"))
        ));

        // Cut into the section header table at the end of the file.
        let bytes = image();
        assert!(matches!(
            KernelElf::parse(&bytes[..bytes.len() - 8]),
            Err(ElfError::Malformed("section header table out of bounds"))
        ));
    }

    #[test]
    fn segment_contents_past_end_of_file() {
        let mut bytes = image();
        let len = bytes.len() as u64;
        // p_offset of the second program header.
        let p_offset = 64 + 56 + 8;
        bytes[p_offset..p_offset + 8].copy_from_slice(&len.to_le_bytes());
        assert!(matches!(
            KernelElf::parse(&bytes),
            Err(ElfError::Malformed("segment contents out of bounds"))
        ));

        let mut bytes = image();
        let p_filesz = 64 + 56 + 32;
        bytes[p_filesz..p_filesz + 8].copy_from_slice(&len.to_le_bytes());
        assert!(matches!(
            KernelElf::parse(&bytes),
            Err(ElfError::Malformed("segment contents out of bounds"))
        ));
    }

    fn find(bytes: &[u8], needle: &[u8]) -> usize {
        bytes
            .windows(needle.len())
            .position(|w| w == needle)
            .unwrap()
    }

    #[test]
    fn names_that_are_not_utf8() {
        let mut bytes = image();
        let at = find(&bytes, b"COUNTER\0");
        bytes[at] = 0xFF;
        let at = find(&bytes, b".comment\0");
        bytes[at + 1] = 0xFF;

        let elf = KernelElf::parse(&bytes).unwrap();
        assert_eq!(elf.symbol_value("__kernel_virt_start_addr").unwrap(), CODE);
        assert_eq!(elf.symbol_value("__kernel_virt_addr_space_size").unwrap(), 1 << 30);
        assert!(matches!(
            elf.symbol("COUNTER"),
            Err(ElfError::SymbolNotFound(_))
        ));
        assert!(elf.sections().iter().any(|s| s.name == ".\u{FFFD}omment"));
        assert!(elf.sections().iter().any(|s| s.name == ".data"));
    }

    #[test]
    fn open_reads_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("kernel.elf");
        std::fs::write(&path, image()).unwrap();
        assert_eq!(KernelElf::open(&path).unwrap().machine_type(), Machine::AArch64);

        assert!(matches!(
            KernelElf::open(dir.path().join("missing.elf")),
            Err(ElfError::Io { .. })
        ));
    }
}
