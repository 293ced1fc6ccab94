//! The composed, immutable SoC description.

use std::fmt;

use serde::{Deserialize, Serialize};
use socgen_clock::ClockTree;

use crate::address_space::AddressSpace;
use crate::cpu::CpuSpec;
use crate::peripheral::PeripheralKind;

/// One CSR bank at its fixed slot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct CsrBank {
    pub name: String,
    pub slot: u32,
    pub origin: u64,
}

/// A finalized SoC: clock tree, address map, CPU and peripherals.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Soc {
    pub ident: String,
    pub build_name: String,
    pub cpu: CpuSpec,
    pub clock: ClockTree,
    pub address_space: AddressSpace,
    pub peripherals: Vec<PeripheralKind>,
    pub csr_banks: Vec<CsrBank>,
}

impl Soc {
    pub fn sys_clk_freq(&self) -> u64 {
        self.clock.sys_frequency_hz()
    }

    pub fn reset_vector(&self) -> u64 {
        self.cpu.reset_vector()
    }

    /// Find an attached peripheral by instance name.
    pub fn peripheral(&self, name: &str) -> Option<&PeripheralKind> {
        self.peripherals.iter().find(|p| p.name() == name)
    }

    pub fn has_peripheral(&self, name: &str) -> bool {
        self.peripheral(name).is_some()
    }

    pub fn csr_bank(&self, name: &str) -> Option<&CsrBank> {
        self.csr_banks.iter().find(|b| b.name == name)
    }
}

impl fmt::Display for Soc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "=== {} ===", self.ident)?;
        writeln!(
            f,
            "CPU: {} ({}), reset vector 0x{:08x}",
            self.cpu.name,
            self.cpu.variant,
            self.reset_vector()
        )?;
        write!(f, "{}", self.clock)?;
        writeln!(f, "=== Regions ===")?;
        for region in self.address_space.regions() {
            writeln!(f, "  {region}")?;
        }
        writeln!(f, "=== CSR Banks ===")?;
        for bank in &self.csr_banks {
            writeln!(f, "  {:<16} slot {:>2} @ 0x{:08x}", bank.name, bank.slot, bank.origin)?;
        }
        if !self.peripherals.is_empty() {
            let names: Vec<_> = self.peripherals.iter().map(|p| p.name()).collect();
            writeln!(f, "Peripherals: {}", names.join(", "))?;
        }
        Ok(())
    }
}
