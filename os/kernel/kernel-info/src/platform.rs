//! # Board Memory Maps
//!
//! Per-board physical memory facts. The end of the physical address space is
//! the end of the board's MMIO window, which sits above all of its DRAM.

use alloc::string::String;
use core::fmt;
use core::str::FromStr;
use kernel_memory_addresses::PhysicalAddress;

/// Physical memory map of the Raspberry Pi 3.
pub mod rpi3 {
    use kernel_memory_addresses::PhysicalAddress;

    pub const PL011_UART_START: PhysicalAddress = PhysicalAddress::new(0x3F20_1000);

    /// End of the MMIO window and of the physical address space.
    pub const END: PhysicalAddress = PhysicalAddress::new(0x4001_0000);
}

/// Physical memory map of the Raspberry Pi 4.
pub mod rpi4 {
    use kernel_memory_addresses::PhysicalAddress;

    pub const PL011_UART_START: PhysicalAddress = PhysicalAddress::new(0xFE20_1000);
    pub const GICC_START: PhysicalAddress = PhysicalAddress::new(0xFF84_2000);

    /// End of the MMIO window and of the physical address space.
    pub const END: PhysicalAddress = PhysicalAddress::new(0xFF85_0000);
}

/// A supported board.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum Platform {
    RaspberryPi3,
    RaspberryPi4,
}

/// The platform identifier is not one of the supported boards.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unsupported platform `{0}` (expected one of: rpi3, rpi4)")]
pub struct UnsupportedPlatform(pub String);

impl Platform {
    /// The identifier used on the command line.
    #[must_use]
    pub const fn id(self) -> &'static str {
        match self {
            Self::RaspberryPi3 => "rpi3",
            Self::RaspberryPi4 => "rpi4",
        }
    }

    /// Highest physical page any mapping may reference.
    #[must_use]
    pub const fn phys_addr_space_end_page(self) -> PhysicalAddress {
        match self {
            Self::RaspberryPi3 => rpi3::END,
            Self::RaspberryPi4 => rpi4::END,
        }
    }
}

impl FromStr for Platform {
    type Err = UnsupportedPlatform;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "rpi3" => Ok(Self::RaspberryPi3),
            "rpi4" => Ok(Self::RaspberryPi4),
            other => Err(UnsupportedPlatform(other.into())),
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

const _: () = {
    assert!(rpi3::END.as_u64() % crate::memory::KERNEL_GRANULE_SIZE == 0);
    assert!(rpi4::END.as_u64() % crate::memory::KERNEL_GRANULE_SIZE == 0);
    assert!(rpi3::PL011_UART_START.as_u64() < rpi3::END.as_u64());
    assert!(rpi4::GICC_START.as_u64() < rpi4::END.as_u64());
};
