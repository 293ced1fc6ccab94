//! SoC region and peripheral composition for socgen.
//!
//! A [`SocComposer`] seeds an [`AddressSpace`] from the CPU memory map,
//! attaches optional peripherals, accepts explicit regions (including linker
//! aliases such as a boot ROM inside SPI flash), and finalizes together with a
//! clock/reset graph into an immutable [`Soc`].

pub mod address_space;
pub mod composer;
pub mod cpu;
pub mod error;
pub mod peripheral;
pub mod region;
pub mod soc;

pub use address_space::{AddressSpace, IoWindow};
pub use composer::{SocComposer, BOOT_ROM};
pub use cpu::CpuSpec;
pub use error::{Result, SocError};
pub use peripheral::{
    csr_slot, LedChaserSpec, PcieSpec, PeripheralKind, SpiFlashModule, SpiFlashSpec, SpiMode,
    VideoTerminalSpec, CSR_BANK_SIZE, PCIE_CLK_HZ,
};
pub use region::{MemoryRegion, Placement, RegionKind};
pub use soc::{CsrBank, Soc};
