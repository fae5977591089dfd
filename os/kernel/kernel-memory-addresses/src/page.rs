use crate::{PageSize, PhysicalAddress};
use core::fmt;
use core::marker::PhantomData;

/// Base of a physical page of size `S`. The low `S::SHIFT` bits are zero.
///
/// ```rust
/// # use kernel_memory_addresses::*;
/// let pp = PhysicalPage::<Size64K>::try_from(PhysicalAddress::new(0x4000_0000)).unwrap();
/// assert_eq!(pp.number(), 0x4000);
/// assert!(PhysicalPage::<Size64K>::try_from(PhysicalAddress::new(0x4000_0001)).is_err());
/// ```
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct PhysicalPage<S: PageSize> {
    base: u64,
    _size: PhantomData<S>,
}

impl<S: PageSize> PhysicalPage<S> {
    /// The page containing `addr`.
    #[inline]
    #[must_use]
    pub const fn from_addr(addr: PhysicalAddress) -> Self {
        Self {
            base: addr.as_u64() & !S::MASK,
            _size: PhantomData,
        }
    }

    #[inline]
    #[must_use]
    pub const fn base(self) -> PhysicalAddress {
        PhysicalAddress::new(self.base)
    }

    /// Page frame number (`base >> S::SHIFT`), the form descriptors store.
    #[inline]
    #[must_use]
    pub const fn number(self) -> u64 {
        self.base >> S::SHIFT
    }
}

impl<S: PageSize> TryFrom<PhysicalAddress> for PhysicalPage<S> {
    type Error = ();

    /// Fails unless `addr` is a page boundary.
    #[inline]
    fn try_from(addr: PhysicalAddress) -> Result<Self, ()> {
        if addr.is_aligned::<S>() {
            Ok(Self::from_addr(addr))
        } else {
            Err(())
        }
    }
}

impl<S: PageSize> fmt::Debug for PhysicalPage<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PhysicalPage<{}>(0x{:016X})", S::NAME, self.base)
    }
}

impl<S: PageSize> fmt::Display for PhysicalPage<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:016X}/{}", self.base, S::NAME)
    }
}
