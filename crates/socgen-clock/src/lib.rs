//! Clock and reset domain composition for socgen.
//!
//! Turns raw board oscillators into synchronized clock domains:
//! - **Signals and sources:** opaque pin handles with an electrical polarity
//! - **PLLs:** feasibility search over a hardware family's multiply/divide ranges
//! - **Reset synchronizers:** async-assert, sync-deassert reset chains
//! - **Clock/reset graph:** write-once wiring that finalizes into an immutable [`ClockTree`]

pub mod crg;
pub mod domain;
pub mod error;
pub mod family;
pub mod pll;
pub mod reset;
pub mod signal;
pub mod source;

pub use crg::{ClockResetGraph, ClockTree, PeriodConstraint, PllInstance, TimingException, SYS_DOMAIN};
pub use domain::{ClockDomain, DomainDriver, DomainHandle, ResetSignal};
pub use error::{ClockError, Result};
pub use family::PllFamily;
pub use pll::{PllConfig, PllConstraints, PllModel, PllOutput, PllOutputConfig, PllSpec, ResetPolicy};
pub use reset::{ResetInput, ResetSynchronizer, ResetTerm};
pub use signal::{Polarity, Signal, SignalRef};
pub use source::{ClockOrigin, ClockSource, PeripheralClock};
