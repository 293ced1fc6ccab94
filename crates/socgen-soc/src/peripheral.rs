//! Optional peripherals and the bus resources they claim.
//!
//! Every peripheral takes its regions from named CPU memory map entries and
//! its CSR banks from a fixed slot table. Attaching or omitting one
//! peripheral therefore never moves another.

use serde::{Deserialize, Serialize};
use socgen_clock::{PeripheralClock, Signal, SYS_DOMAIN};

use crate::cpu::CpuSpec;
use crate::error::{Result, SocError};
use crate::region::{MemoryRegion, RegionKind};

/// Size of one CSR bank.
pub const CSR_BANK_SIZE: u64 = 0x800;

/// Frequency of the clock recovered by the PCIe PHY.
pub const PCIE_CLK_HZ: u64 = 125_000_000;

const MAX_DMAS: u32 = 8;

/// Fixed CSR slot of a bank, or `None` for unknown banks.
pub fn csr_slot(bank: &str) -> Option<u32> {
    let slot = match bank {
        "ctrl" => 0,
        "identifier_mem" => 1,
        "uart" => 2,
        "timer0" => 3,
        "leds" => 4,
        "spiflash_core" => 5,
        "spiflash_phy" => 6,
        "pcie_phy" => 8,
        "pcie_msi" => 9,
        "pcie_endpoint" => 10,
        _ => {
            let n: u32 = bank.strip_prefix("pcie_dma")?.parse().ok()?;
            return (n < MAX_DMAS).then_some(11 + n);
        }
    };
    Some(slot)
}

/// A known SPI NOR flash part.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct SpiFlashModule {
    pub name: String,
    /// Capacity in bytes.
    pub size: u64,
}

const SPI_FLASH_MODULES: &[(&str, u64)] = &[
    ("AT25SF081", 1 << 20),
    ("W25Q32JV", 4 << 20),
    ("W25Q64JV", 8 << 20),
    ("W25Q128JV", 16 << 20),
    ("S25FL128L", 16 << 20),
    ("MX25L12835F", 16 << 20),
    ("N25Q128A13", 16 << 20),
];

impl SpiFlashModule {
    /// Look up a part by name (case-insensitive).
    pub fn lookup(name: &str) -> Option<SpiFlashModule> {
        SPI_FLASH_MODULES
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(n, size)| SpiFlashModule {
                name: n.to_string(),
                size: *size,
            })
    }

    /// Names of every known part.
    pub fn names() -> impl Iterator<Item = &'static str> {
        SPI_FLASH_MODULES.iter().map(|(n, _)| *n)
    }
}

/// SPI data width.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SpiMode {
    #[serde(rename = "1x")]
    X1,
    #[serde(rename = "4x")]
    X4,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct PcieSpec {
    pub lanes: u8,
    pub data_width: u32,
    pub bar0_size: u64,
    pub ndmas: u32,
}

impl Default for PcieSpec {
    fn default() -> Self {
        Self {
            lanes: 4,
            data_width: 128,
            bar0_size: 0x20000,
            ndmas: 1,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct SpiFlashSpec {
    pub module: SpiFlashModule,
    pub mode: SpiMode,
    /// Expose a SPI master for direct flash access.
    pub with_master: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct LedChaserSpec {
    pub pads: Vec<Signal>,
    /// Full sweep period in milliseconds.
    pub period_ms: u32,
}

impl LedChaserSpec {
    pub fn new(pads: Vec<Signal>) -> Self {
        Self {
            pads,
            period_ms: 1000,
        }
    }

    /// `sys` cycles between two chaser steps.
    pub fn ticks_per_step(&self, sys_clk_hz: u64) -> u64 {
        let steps = (2 * self.pads.len() as u64).max(1);
        sys_clk_hz * self.period_ms as u64 / 1000 / steps
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct VideoTerminalSpec {
    pub clock_domain: String,
    pub timings: String,
}

impl Default for VideoTerminalSpec {
    fn default() -> Self {
        Self {
            clock_domain: "vga".into(),
            timings: "640x480@60Hz".into(),
        }
    }
}

impl VideoTerminalSpec {
    /// Nominal pixel clock of the selected timings.
    pub fn pixel_clock_hz(&self) -> Option<u64> {
        let hz = match self.timings.as_str() {
            "640x480@60Hz" => 25_175_000,
            "640x480@75Hz" => 31_500_000,
            "800x600@60Hz" => 40_000_000,
            "1024x768@60Hz" => 65_000_000,
            "1280x720@60Hz" => 74_250_000,
            _ => return None,
        };
        Some(hz)
    }
}

/// An optional peripheral request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", tag = "kind")]
pub enum PeripheralKind {
    Pcie(PcieSpec),
    SpiFlash(SpiFlashSpec),
    LedChaser(LedChaserSpec),
    VideoTerminal(VideoTerminalSpec),
}

impl PeripheralKind {
    /// Instance name, also the prefix of its CSR banks.
    pub fn name(&self) -> &'static str {
        match self {
            PeripheralKind::Pcie(_) => "pcie",
            PeripheralKind::SpiFlash(_) => "spiflash",
            PeripheralKind::LedChaser(_) => "leds",
            PeripheralKind::VideoTerminal(_) => "video_terminal",
        }
    }

    /// Attachment order used by [`SocComposer::attach_all`](crate::SocComposer::attach_all).
    pub fn rank(&self) -> u8 {
        match self {
            PeripheralKind::SpiFlash(_) => 0,
            PeripheralKind::Pcie(_) => 1,
            PeripheralKind::LedChaser(_) => 2,
            PeripheralKind::VideoTerminal(_) => 3,
        }
    }

    pub fn validate(&self) -> Result<()> {
        let invalid = |detail: String| SocError::InvalidPeripheral {
            peripheral: self.name().to_string(),
            detail,
        };
        match self {
            PeripheralKind::Pcie(p) => {
                if ![1, 2, 4, 8].contains(&p.lanes) {
                    return Err(invalid(format!("{} lanes", p.lanes)));
                }
                if ![64, 128, 256].contains(&p.data_width) {
                    return Err(invalid(format!("data width {}", p.data_width)));
                }
                if !p.bar0_size.is_power_of_two() {
                    return Err(invalid(format!("BAR0 size 0x{:x} is not a power of two", p.bar0_size)));
                }
                if p.ndmas == 0 || p.ndmas > MAX_DMAS {
                    return Err(invalid(format!("{} DMA channels (1..={MAX_DMAS})", p.ndmas)));
                }
            }
            PeripheralKind::SpiFlash(f) => {
                if !f.module.size.is_power_of_two() {
                    return Err(invalid(format!("{} size 0x{:x}", f.module.name, f.module.size)));
                }
            }
            PeripheralKind::LedChaser(l) => {
                if l.pads.is_empty() {
                    return Err(invalid("no LED pads".into()));
                }
            }
            PeripheralKind::VideoTerminal(v) => {
                if v.pixel_clock_hz().is_none() {
                    return Err(invalid(format!("unknown timings '{}'", v.timings)));
                }
            }
        }
        Ok(())
    }

    /// CSR banks, in slot order.
    pub fn csr_banks(&self) -> Vec<String> {
        match self {
            PeripheralKind::Pcie(p) => {
                let mut banks = vec!["pcie_phy".to_string(), "pcie_msi".into(), "pcie_endpoint".into()];
                banks.extend((0..p.ndmas).map(|n| format!("pcie_dma{n}")));
                banks
            }
            PeripheralKind::SpiFlash(_) => vec!["spiflash_core".into(), "spiflash_phy".into()],
            PeripheralKind::LedChaser(_) => vec!["leds".into()],
            PeripheralKind::VideoTerminal(_) => Vec::new(),
        }
    }

    /// Bus regions this peripheral occupies.
    pub fn regions(&self, cpu: &CpuSpec) -> Result<Vec<MemoryRegion>> {
        let regions = match self {
            PeripheralKind::Pcie(p) => vec![MemoryRegion::new(
                "pcie_bar0",
                cpu.origin("pcie")?,
                p.bar0_size,
                RegionKind::Io,
            )],
            PeripheralKind::SpiFlash(f) => vec![MemoryRegion::new(
                "spiflash",
                cpu.origin("spiflash")?,
                f.module.size,
                RegionKind::Rom,
            )],
            PeripheralKind::LedChaser(_) | PeripheralKind::VideoTerminal(_) => Vec::new(),
        };
        Ok(regions)
    }

    /// Clock this peripheral makes available to the clock graph.
    pub fn exported_clock(&self) -> Option<PeripheralClock> {
        match self {
            PeripheralKind::Pcie(_) => Some(PeripheralClock::new("pcie", PCIE_CLK_HZ)),
            _ => None,
        }
    }

    /// Clock domain the peripheral's logic runs in.
    pub fn clock_domain(&self) -> &str {
        match self {
            PeripheralKind::VideoTerminal(v) => &v.clock_domain,
            _ => SYS_DOMAIN,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn csr_slots_are_fixed() {
        assert_eq!(csr_slot("ctrl"), Some(0));
        assert_eq!(csr_slot("leds"), Some(4));
        assert_eq!(csr_slot("pcie_dma0"), Some(11));
        assert_eq!(csr_slot("pcie_dma7"), Some(18));
        assert_eq!(csr_slot("pcie_dma8"), None);
        assert_eq!(csr_slot("bogus"), None);
        let max = (0..MAX_DMAS).filter_map(|n| csr_slot(&format!("pcie_dma{n}"))).max();
        assert!(max.unwrap() as u64 * CSR_BANK_SIZE < CpuSpec::vexriscv().csr_size);
    }

    #[test]
    fn flash_catalogue() {
        let m = SpiFlashModule::lookup("at25sf081").unwrap();
        assert_eq!(m.name, "AT25SF081");
        assert_eq!(m.size, 1 << 20);
        assert!(SpiFlashModule::lookup("nope").is_none());
        assert!(SpiFlashModule::names().all(|n| SpiFlashModule::lookup(n).is_some()));
    }

    #[test]
    fn pcie_exports_clock_and_bar() {
        let cpu = CpuSpec::vexriscv();
        let pcie = PeripheralKind::Pcie(PcieSpec::default());
        pcie.validate().unwrap();
        assert_eq!(pcie.exported_clock().unwrap().frequency_hz, 125_000_000);
        let regions = pcie.regions(&cpu).unwrap();
        assert_eq!(regions[0].name, "pcie_bar0");
        assert_eq!(regions[0].kind, RegionKind::Io);
        assert_eq!(pcie.csr_banks().last().unwrap(), "pcie_dma0");
    }

    #[test]
    fn invalid_configs() {
        let pcie = PeripheralKind::Pcie(PcieSpec {
            lanes: 3,
            ..PcieSpec::default()
        });
        assert!(matches!(pcie.validate(), Err(SocError::InvalidPeripheral { .. })));
        let leds = PeripheralKind::LedChaser(LedChaserSpec::new(vec![]));
        assert!(leds.validate().is_err());
        let vt = PeripheralKind::VideoTerminal(VideoTerminalSpec {
            timings: "320x200@70Hz".into(),
            ..VideoTerminalSpec::default()
        });
        assert!(vt.validate().is_err());
    }

    #[test]
    fn led_chaser_ticks() {
        let pads = (0..4).map(|i| Signal::new("user_led", i, socgen_clock::Polarity::ActiveHigh));
        let leds = LedChaserSpec::new(pads.collect());
        assert_eq!(leds.ticks_per_step(16_000_000), 2_000_000);
    }

    #[test]
    fn spi_mode_serde() {
        let json = serde_json::to_string(&SpiMode::X4).unwrap();
        assert_eq!(json, "\"4x\"");
    }
}
