//! # Synthetic ELF Images
//!
//! Writes small but well-formed ELF64 executables: program headers with file
//! contents, section headers, `.symtab`, `.strtab` and `.shstrtab`. Enough for
//! [`KernelElf`](crate::KernelElf) and the table generator to work on without a
//! cross-compiled kernel at hand.

#![allow(clippy::cast_possible_truncation)]

use crate::raw::{
    EI_MAGIC_BYTES, ELFCLASS64, ELFDATA2LSB, ET_EXEC, EV_CURRENT, Elf64Ehdr, Elf64Phdr,
    Elf64Shdr, Elf64Sym, PT_LOAD, SHN_ABS, SHT_NOBITS, SHT_STRTAB, SHT_SYMTAB, as_bytes,
};
use crate::segment::SegmentFlags;
use core::mem::size_of;

/// `STB_GLOBAL << 4 | STT_OBJECT`.
const GLOBAL_OBJECT: u8 = 0x11;

#[derive(Debug, Clone)]
struct SegmentSpec {
    flags: SegmentFlags,
    vaddr: u64,
    paddr: u64,
    data: Vec<u8>,
    mem_size: u64,
}

#[derive(Debug, Clone)]
struct SectionSpec {
    name: String,
    kind: u32,
    flags: u64,
    addr: u64,
    size: u64,
}

#[derive(Debug, Clone)]
struct SymbolSpec {
    name: String,
    value: u64,
    size: u64,
}

/// Builder for a synthetic ELF64 little-endian executable.
#[derive(Debug, Clone)]
pub struct ElfBuilder {
    machine: u16,
    segments: Vec<SegmentSpec>,
    sections: Vec<SectionSpec>,
    symbols: Vec<SymbolSpec>,
}

/// Keeps a string table and hands out offsets into it.
struct StringTable(Vec<u8>);

impl StringTable {
    fn new() -> Self {
        Self(vec![0])
    }

    fn add(&mut self, s: &str) -> u32 {
        let off = self.0.len() as u32;
        self.0.extend_from_slice(s.as_bytes());
        self.0.push(0);
        off
    }
}

fn pad_to(out: &mut Vec<u8>, align: usize) {
    while out.len() % align != 0 {
        out.push(0);
    }
}

impl ElfBuilder {
    #[must_use]
    pub const fn new(machine: u16) -> Self {
        Self {
            machine,
            segments: Vec::new(),
            sections: Vec::new(),
            symbols: Vec::new(),
        }
    }

    /// A `PT_LOAD` segment whose file contents are `data`; memory beyond
    /// `data.len()` up to `mem_size` is zero-filled.
    #[must_use]
    pub fn segment(
        mut self,
        flags: SegmentFlags,
        vaddr: u64,
        paddr: u64,
        data: Vec<u8>,
        mem_size: u64,
    ) -> Self {
        self.segments.push(SegmentSpec {
            flags,
            vaddr,
            paddr,
            data,
            mem_size,
        });
        self
    }

    /// A section header. Sections starting inside a segment's file contents
    /// point there; others get zeroed contents of their own.
    #[must_use]
    pub fn section(mut self, name: &str, kind: u32, flags: u64, addr: u64, size: u64) -> Self {
        self.sections.push(SectionSpec {
            name: name.to_owned(),
            kind,
            flags,
            addr,
            size,
        });
        self
    }

    /// A global absolute `.symtab` entry.
    #[must_use]
    pub fn symbol(mut self, name: &str, value: u64, size: u64) -> Self {
        self.symbols.push(SymbolSpec {
            name: name.to_owned(),
            value,
            size,
        });
        self
    }

    /// Serialize the image.
    #[must_use]
    pub fn build(&self) -> Vec<u8> {
        let ehsize = size_of::<Elf64Ehdr>();
        let phentsize = size_of::<Elf64Phdr>();
        let mut out = vec![0u8; ehsize + self.segments.len() * phentsize];

        // Segment contents and program headers.
        let mut file_offsets = Vec::with_capacity(self.segments.len());
        for (i, seg) in self.segments.iter().enumerate() {
            pad_to(&mut out, 16);
            let offset = out.len() as u64;
            out.extend_from_slice(&seg.data);
            file_offsets.push(offset);

            let ph = Elf64Phdr {
                p_type: PT_LOAD,
                p_flags: seg.flags.into_bits(),
                p_offset: offset,
                p_vaddr: seg.vaddr,
                p_paddr: seg.paddr,
                p_filesz: seg.data.len() as u64,
                p_memsz: seg.mem_size,
                p_align: 0x1_0000,
            };
            let at = ehsize + i * phentsize;
            out[at..at + phentsize].copy_from_slice(as_bytes(&ph));
        }

        let mut shstrtab = StringTable::new();
        let mut shdrs = vec![Elf64Shdr::default()];

        for sec in &self.sections {
            let backing = self.segments.iter().zip(&file_offsets).find(|(seg, _)| {
                sec.addr >= seg.vaddr && sec.addr - seg.vaddr < seg.data.len() as u64
            });
            let offset = if let Some((seg, &seg_offset)) = backing {
                seg_offset + (sec.addr - seg.vaddr)
            } else {
                let offset = out.len() as u64;
                if sec.kind != SHT_NOBITS {
                    out.resize(out.len() + sec.size as usize, 0);
                }
                offset
            };

            shdrs.push(Elf64Shdr {
                sh_name: shstrtab.add(&sec.name),
                sh_type: sec.kind,
                sh_flags: sec.flags,
                sh_addr: sec.addr,
                sh_offset: offset,
                sh_size: sec.size,
                sh_addralign: 1,
                ..Elf64Shdr::default()
            });
        }

        // .symtab / .strtab
        let mut strtab = StringTable::new();
        let mut symtab = Vec::new();
        symtab.extend_from_slice(as_bytes(&Elf64Sym::default()));
        for sym in &self.symbols {
            let entry = Elf64Sym {
                st_name: strtab.add(&sym.name),
                st_info: GLOBAL_OBJECT,
                st_other: 0,
                st_shndx: SHN_ABS,
                st_value: sym.value,
                st_size: sym.size,
            };
            symtab.extend_from_slice(as_bytes(&entry));
        }

        let symtab_index = shdrs.len();
        let strtab_index = symtab_index + 1;
        let shstrtab_index = strtab_index + 1;

        pad_to(&mut out, 8);
        let symtab_offset = out.len() as u64;
        out.extend_from_slice(&symtab);
        shdrs.push(Elf64Shdr {
            sh_name: shstrtab.add(".symtab"),
            sh_type: SHT_SYMTAB,
            sh_offset: symtab_offset,
            sh_size: symtab.len() as u64,
            sh_link: strtab_index as u32,
            sh_info: 1,
            sh_addralign: 8,
            sh_entsize: size_of::<Elf64Sym>() as u64,
            ..Elf64Shdr::default()
        });

        let strtab_offset = out.len() as u64;
        out.extend_from_slice(&strtab.0);
        shdrs.push(Elf64Shdr {
            sh_name: shstrtab.add(".strtab"),
            sh_type: SHT_STRTAB,
            sh_offset: strtab_offset,
            sh_size: strtab.0.len() as u64,
            sh_addralign: 1,
            ..Elf64Shdr::default()
        });

        let shstrtab_name = shstrtab.add(".shstrtab");
        let shstrtab_offset = out.len() as u64;
        out.extend_from_slice(&shstrtab.0);
        shdrs.push(Elf64Shdr {
            sh_name: shstrtab_name,
            sh_type: SHT_STRTAB,
            sh_offset: shstrtab_offset,
            sh_size: shstrtab.0.len() as u64,
            sh_addralign: 1,
            ..Elf64Shdr::default()
        });

        // Section header table last.
        pad_to(&mut out, 8);
        let shoff = out.len() as u64;
        for sh in &shdrs {
            out.extend_from_slice(as_bytes(sh));
        }

        let mut e_ident = [0u8; 16];
        e_ident[..4].copy_from_slice(&EI_MAGIC_BYTES);
        e_ident[4] = ELFCLASS64;
        e_ident[5] = ELFDATA2LSB;
        e_ident[6] = EV_CURRENT;

        let ehdr = Elf64Ehdr {
            e_ident,
            e_type: ET_EXEC,
            e_machine: self.machine,
            e_version: u32::from(EV_CURRENT),
            e_entry: self.segments.first().map_or(0, |s| s.vaddr),
            e_phoff: if self.segments.is_empty() { 0 } else { ehsize as u64 },
            e_shoff: shoff,
            e_flags: 0,
            e_ehsize: ehsize as u16,
            e_phentsize: phentsize as u16,
            e_phnum: self.segments.len() as u16,
            e_shentsize: size_of::<Elf64Shdr>() as u16,
            e_shnum: shdrs.len() as u16,
            e_shstrndx: shstrtab_index as u16,
        };
        out[..ehsize].copy_from_slice(as_bytes(&ehdr));
        out
    }
}
