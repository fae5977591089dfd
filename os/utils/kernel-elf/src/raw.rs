//! # ELF64 On-Disk Structures
//!
//! Minimal little-endian ELF64 definitions. All structures are `repr(C)` with
//! no interior padding, so they can be read from and written to byte buffers
//! directly.

use crate::error::ElfError;
use core::mem::size_of;
use core::ptr::read_unaligned;

#[cfg(target_endian = "big")]
compile_error!("kernel-elf reads ELF structures in host byte order and requires a little-endian host");

pub const EI_MAGIC_BYTES: [u8; 4] = [0x7F, b'E', b'L', b'F'];
pub const ELFCLASS64: u8 = 2;
pub const ELFDATA2LSB: u8 = 1;
pub const EV_CURRENT: u8 = 1;

pub const ET_EXEC: u16 = 2;
pub const EM_AARCH64: u16 = 183;

pub const PT_LOAD: u32 = 1;

pub const SHT_PROGBITS: u32 = 1;
pub const SHT_SYMTAB: u32 = 2;
pub const SHT_STRTAB: u32 = 3;
pub const SHT_NOBITS: u32 = 8;
pub const SHF_WRITE: u64 = 0x1;
pub const SHF_ALLOC: u64 = 0x2;
pub const SHF_EXECINSTR: u64 = 0x4;
pub const SHN_UNDEF: u16 = 0;
pub const SHN_ABS: u16 = 0xFFF1;

#[repr(C)]
#[derive(Clone, Copy, Default)]
#[allow(clippy::struct_field_names)]
pub struct Elf64Ehdr {
    pub e_ident: [u8; 16],
    pub e_type: u16,
    pub e_machine: u16,
    pub e_version: u32,
    pub e_entry: u64,
    pub e_phoff: u64,
    pub e_shoff: u64,
    pub e_flags: u32,
    pub e_ehsize: u16,
    pub e_phentsize: u16,
    pub e_phnum: u16,
    pub e_shentsize: u16,
    pub e_shnum: u16,
    pub e_shstrndx: u16,
}

#[repr(C)]
#[derive(Clone, Copy, Default)]
#[allow(clippy::struct_field_names)]
pub struct Elf64Phdr {
    pub p_type: u32,
    pub p_flags: u32,
    pub p_offset: u64,
    pub p_vaddr: u64,
    pub p_paddr: u64,
    pub p_filesz: u64,
    pub p_memsz: u64,
    pub p_align: u64,
}

#[repr(C)]
#[derive(Clone, Copy, Default)]
#[allow(clippy::struct_field_names)]
pub struct Elf64Shdr {
    pub sh_name: u32,
    pub sh_type: u32,
    pub sh_flags: u64,
    pub sh_addr: u64,
    pub sh_offset: u64,
    pub sh_size: u64,
    pub sh_link: u32,
    pub sh_info: u32,
    pub sh_addralign: u64,
    pub sh_entsize: u64,
}

#[repr(C)]
#[derive(Clone, Copy, Default)]
#[allow(clippy::struct_field_names)]
pub struct Elf64Sym {
    pub st_name: u32,
    pub st_info: u8,
    pub st_other: u8,
    pub st_shndx: u16,
    pub st_value: u64,
    pub st_size: u64,
}

const _: () = {
    assert!(size_of::<Elf64Ehdr>() == 64);
    assert!(size_of::<Elf64Phdr>() == 56);
    assert!(size_of::<Elf64Shdr>() == 64);
    assert!(size_of::<Elf64Sym>() == 24);
};

/// Plain-old-data ELF structures: `repr(C)`, no padding, every bit pattern valid.
pub trait Pod: Copy {}
impl Pod for Elf64Ehdr {}
impl Pod for Elf64Phdr {}
impl Pod for Elf64Shdr {}
impl Pod for Elf64Sym {}

/// Read a `T` at byte offset `off`.
///
/// # Errors
/// [`ElfError::Malformed`] with `what` if the structure does not fit `bytes`.
pub fn read<T: Pod>(bytes: &[u8], off: u64, what: &'static str) -> Result<T, ElfError> {
    let slice = slice(bytes, off, size_of::<T>() as u64, what)?;
    // SAFETY: `slice` holds exactly `size_of::<T>()` bytes and `T: Pod`;
    // `read_unaligned` makes no alignment assumptions.
    Ok(unsafe { read_unaligned(slice.as_ptr().cast::<T>()) })
}

/// `bytes[off..off + len]`, or [`ElfError::Malformed`] with `what`.
///
/// # Errors
/// If the range overflows or runs past the end of `bytes`.
pub fn slice<'a>(
    bytes: &'a [u8],
    off: u64,
    len: u64,
    what: &'static str,
) -> Result<&'a [u8], ElfError> {
    let start = usize::try_from(off).map_err(|_| ElfError::Malformed(what))?;
    let len = usize::try_from(len).map_err(|_| ElfError::Malformed(what))?;
    let end = start.checked_add(len).ok_or(ElfError::Malformed(what))?;
    bytes.get(start..end).ok_or(ElfError::Malformed(what))
}

/// The raw bytes of a [`Pod`] structure.
#[cfg(any(test, feature = "builder"))]
pub fn as_bytes<T: Pod>(value: &T) -> &[u8] {
    // SAFETY: `T: Pod` has no padding, so all `size_of::<T>()` bytes are initialized.
    unsafe {
        core::slice::from_raw_parts(core::ptr::from_ref(value).cast::<u8>(), size_of::<T>())
    }
}

/// Bytes of the NUL-terminated string at `off` inside the string table
/// `table`, without the terminator.
///
/// # Errors
/// [`ElfError::Malformed`] if `off` lies outside the table or the string is
/// not terminated.
pub fn bytes_at(table: &[u8], off: u32) -> Result<&[u8], ElfError> {
    let start = off as usize;
    let tail = table
        .get(start..)
        .ok_or(ElfError::Malformed("string offset outside string table"))?;
    let len = tail
        .iter()
        .position(|&b| b == 0)
        .ok_or(ElfError::Malformed("unterminated string in string table"))?;
    Ok(&tail[..len])
}
