//! # Typed Addresses
//!
//! [`VirtualAddress`] and [`PhysicalAddress`] both wrap a raw `u64`. The kernel
//! image is linked at one and loaded at the other, so the two never convert
//! into each other implicitly.

use crate::PageSize;
use core::fmt;
use core::ops::Add;

macro_rules! address_type {
    ($(#[$meta:meta])* $name:ident, debug = $debug:literal) => {
        $(#[$meta])*
        #[repr(transparent)]
        #[derive(Copy, Clone, Default, Eq, PartialEq, Ord, PartialOrd, Hash)]
        pub struct $name(u64);

        impl $name {
            #[inline]
            #[must_use]
            pub const fn new(value: u64) -> Self {
                Self(value)
            }

            #[inline]
            #[must_use]
            pub const fn as_u64(self) -> u64 {
                self.0
            }

            /// Whether the address lies on an `S` boundary.
            #[inline]
            #[must_use]
            pub const fn is_aligned<S: PageSize>(self) -> bool {
                self.0 & S::MASK == 0
            }

            /// Byte distance from `base` up to this address, or `None` if
            /// `base` lies above.
            #[inline]
            #[must_use]
            pub const fn checked_offset_from(self, base: Self) -> Option<u64> {
                self.0.checked_sub(base.0)
            }

            /// Little-endian byte representation, as the MMU and the kernel
            /// read it.
            #[inline]
            #[must_use]
            pub const fn to_le_bytes(self) -> [u8; 8] {
                self.0.to_le_bytes()
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!($debug, "(0x{:016X})"), self.0)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "0x{:016X}", self.0)
            }
        }

        impl From<u64> for $name {
            #[inline]
            fn from(value: u64) -> Self {
                Self(value)
            }
        }

        impl From<$name> for u64 {
            #[inline]
            fn from(addr: $name) -> Self {
                addr.0
            }
        }

        impl Add<u64> for $name {
            type Output = Self;

            #[inline]
            fn add(self, rhs: u64) -> Self::Output {
                Self(self.0 + rhs)
            }
        }
    };
}

address_type!(
    /// An address in the kernel's virtual address space (a link address).
    ///
    /// ```rust
    /// # use kernel_memory_addresses::VirtualAddress;
    /// let base = VirtualAddress::new(0xFFFF_FFFF_C000_0000);
    /// assert_eq!((base + 0x1_0000).checked_offset_from(base), Some(0x1_0000));
    /// ```
    VirtualAddress,
    debug = "VA"
);

address_type!(
    /// A physical address: DRAM, MMIO, or where a segment is loaded.
    PhysicalAddress,
    debug = "PA"
);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Size512M, Size64K};

    #[test]
    fn formatting() {
        let pa = PhysicalAddress::new(0x8_0000);
        assert_eq!(format!("{pa}"), "0x0000000000080000");
        assert_eq!(format!("{pa:?}"), "PA(0x0000000000080000)");
        assert_eq!(
            format!("{:?}", VirtualAddress::new(0xFFFF_FFFF_C000_0000)),
            "VA(0xFFFFFFFFC0000000)"
        );
    }

    #[test]
    fn alignment() {
        assert!(VirtualAddress::new(0xFFFF_FFFF_C001_0000).is_aligned::<Size64K>());
        assert!(!VirtualAddress::new(0xFFFF_FFFF_C001_0000).is_aligned::<Size512M>());
        assert!(!PhysicalAddress::new(0x8_0010).is_aligned::<Size64K>());
    }

    #[test]
    fn offset_from_base() {
        let base = VirtualAddress::new(0xFFFF_FFFF_C000_0000);
        let va = VirtualAddress::new(0xFFFF_FFFF_E001_0000);
        assert_eq!(va.checked_offset_from(base), Some(0x2001_0000));
        assert_eq!(base.checked_offset_from(va), None);
    }

    #[test]
    fn le_bytes() {
        let pa = PhysicalAddress::new(0x0000_0000_0009_0000);
        assert_eq!(pa.to_le_bytes(), [0x00, 0x00, 0x09, 0x00, 0, 0, 0, 0]);
        assert_eq!(u64::from(pa + 0x1_0000), 0xA_0000);
    }
}
