//! # Mapping Attributes
//!
//! The attribute triple every kernel mapping carries: memory type, access
//! permission and whether instruction fetches are allowed.

use core::fmt;

/// Memory type of a mapping.
///
/// Only [`CacheableDram`](Self::CacheableDram) can be encoded into a page
/// descriptor today; the kernel's `MAIR_EL1` setup has no device slot that
/// precomputed mappings may use.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum MemoryAttributes {
    /// Normal memory, inner and outer write-back cacheable.
    CacheableDram,
    /// Device-nGnRE memory (MMIO).
    Device,
}

/// Who may read or write a mapping. EL0 never gets access.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum AccessPermissions {
    ReadOnly,
    ReadWrite,
}

/// Attributes of a single mapping.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub struct AttributeFields {
    pub mem_attributes: MemoryAttributes,
    pub acc_perms: AccessPermissions,
    /// Disallow instruction fetches at EL1.
    pub execute_never: bool,
}

impl AttributeFields {
    #[inline]
    #[must_use]
    pub const fn new(
        mem_attributes: MemoryAttributes,
        acc_perms: AccessPermissions,
        execute_never: bool,
    ) -> Self {
        Self {
            mem_attributes,
            acc_perms,
            execute_never,
        }
    }

    /// Cacheable, read-only and executable: kernel code.
    #[inline]
    #[must_use]
    pub const fn code() -> Self {
        Self::new(
            MemoryAttributes::CacheableDram,
            AccessPermissions::ReadOnly,
            false,
        )
    }

    /// Cacheable, read-write and never executable: kernel data.
    #[inline]
    #[must_use]
    pub const fn data() -> Self {
        Self::new(
            MemoryAttributes::CacheableDram,
            AccessPermissions::ReadWrite,
            true,
        )
    }
}

impl fmt::Display for MemoryAttributes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::CacheableDram => "C",
            Self::Device => "D",
        })
    }
}

impl fmt::Display for AccessPermissions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::ReadOnly => "RO",
            Self::ReadWrite => "RW",
        })
    }
}

/// Compact form used in mapping reports, e.g. `C RW XN` or `C RO X `.
impl fmt::Display for AttributeFields {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let xn = if self.execute_never { "XN" } else { "X " };
        write!(f, "{} {} {xn}", self.mem_attributes, self.acc_perms)
    }
}
