//! CPU core description: memory map, integrated memories and reset vector.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::address_space::IoWindow;
use crate::error::{Result, SocError};

const KIB: u64 = 1024;

/// CPU core and its base memory layout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct CpuSpec {
    /// Core name (e.g., "vexriscv").
    pub name: String,
    /// Core configuration (e.g., "standard", "minimal").
    pub variant: String,
    /// Bus address width in bits.
    pub address_width: u32,
    /// Named origins used by the base regions and by peripherals.
    pub mem_map: BTreeMap<String, u64>,
    /// Uncached IO windows.
    pub io_windows: Vec<IoWindow>,
    /// Integrated boot ROM size; 0 disables it.
    pub integrated_rom_size: u64,
    pub integrated_sram_size: u64,
    /// Integrated main RAM size; 0 disables it.
    #[serde(default)]
    pub integrated_main_ram_size: u64,
    /// Size of the CSR window.
    pub csr_size: u64,
    /// Address of the first fetched instruction. Defaults to the `rom` origin.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reset_address: Option<u64>,
}

impl CpuSpec {
    /// VexRiscv with the LiteX default memory map.
    pub fn vexriscv() -> Self {
        let mem_map = [
            ("rom", 0x0000_0000),
            ("sram", 0x1000_0000),
            ("spiflash", 0x2000_0000),
            ("main_ram", 0x4000_0000),
            ("pcie", 0x9000_0000),
            ("csr", 0xf000_0000),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v))
        .collect();
        Self {
            name: "vexriscv".into(),
            variant: "standard".into(),
            address_width: 32,
            mem_map,
            io_windows: vec![IoWindow {
                origin: 0x8000_0000,
                size: 0x8000_0000,
            }],
            integrated_rom_size: 128 * KIB,
            integrated_sram_size: 8 * KIB,
            integrated_main_ram_size: 0,
            csr_size: 64 * KIB,
            reset_address: None,
        }
    }

    /// Origin of a memory map entry.
    pub fn origin(&self, name: &str) -> Result<u64> {
        self.mem_map
            .get(name)
            .copied()
            .ok_or_else(|| SocError::MissingMemoryMap(name.to_string()))
    }

    /// Effective reset vector.
    pub fn reset_vector(&self) -> u64 {
        self.reset_address
            .or_else(|| self.mem_map.get("rom").copied())
            .unwrap_or(0)
    }

    pub fn set_reset_address(&mut self, address: u64) {
        self.reset_address = Some(address);
    }
}
