//! Error types for SoC composition.

use socgen_clock::ClockError;

/// Errors raised while composing an address space or attaching peripherals.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SocError {
    /// Two non-alias regions share addresses.
    #[error("regions '{first}' and '{second}' overlap at 0x{overlap_start:08x}")]
    RegionConflict {
        first: String,
        second: String,
        overlap_start: u64,
    },

    #[error("region '{0}' is already defined")]
    DuplicateRegion(String),

    #[error("region '{0}' has zero size")]
    EmptyRegion(String),

    #[error("region '{name}' origin 0x{origin:08x} is not aligned on 0x{alignment:x}")]
    MisalignedRegion {
        name: String,
        origin: u64,
        alignment: u64,
    },

    #[error("region '{name}' ends at 0x{end:x}, beyond the {address_width}-bit bus")]
    OutOfAddressSpace {
        name: String,
        end: u64,
        address_width: u32,
    },

    #[error("IO region '{0}' is not inside an IO window")]
    IoOutsideWindow(String),

    #[error("cached region '{0}' overlaps an IO window")]
    CachedIoRegion(String),

    #[error("unknown region: '{0}'")]
    UnknownRegion(String),

    /// A linker alias does not fit inside the region it maps.
    #[error(
        "alias '{name}' (offset 0x{offset:x}, size 0x{size:x}) does not fit in '{target}' (size 0x{target_size:x})"
    )]
    AliasOutOfBounds {
        name: String,
        target: String,
        offset: u64,
        size: u64,
        target_size: u64,
    },

    /// A linker alias lands on addresses owned by another region.
    #[error("alias '{alias}' collides with region '{region}'")]
    AliasCollision { alias: String, region: String },

    #[error("reset vector 0x{0:08x} is not inside any region")]
    ResetVectorUnmapped(u64),

    #[error("CPU memory map has no '{0}' entry")]
    MissingMemoryMap(String),

    #[error("peripheral '{0}' is already attached")]
    DuplicatePeripheral(String),

    #[error("peripheral '{peripheral}' uses unknown clock domain '{domain}'")]
    UnknownDomain { peripheral: String, domain: String },

    #[error("peripheral '{peripheral}' is misconfigured: {detail}")]
    InvalidPeripheral { peripheral: String, detail: String },

    #[error(transparent)]
    Clock(#[from] ClockError),
}

/// Result type for SoC composition.
pub type Result<T> = std::result::Result<T, SocError>;
